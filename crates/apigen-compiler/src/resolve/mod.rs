//! Type resolution: declaration graph types to canonical schema nodes.
//!
//! Object-like declarations, string-literal aliases and enums become named
//! definitions in a [`SchemaRegistry`]; everything else is inlined. Names are
//! reserved before bodies are resolved, so self- and mutually-referential
//! declarations terminate with a `Reference` back to the pending name.

mod builtins;
mod naming;
mod registry;

pub use builtins::{lookup as lookup_builtin, Builtin};
pub use naming::canonical_name;
pub use registry::{Reservation, SchemaRegistry};

use indexmap::IndexMap;

use crate::decl::{
    DeclId, DeclKind, DeclRef, Declaration, DeclarationSource, FormatHint, IndexSignature, Keyword,
    Literal, PropertyDecl, TypeExpr, TypeRef,
};
use crate::diagnostic::{CompilerError, Span};
use crate::ir::{
    AdditionalProperties, EnumValue, ObjectSchema, PrimitiveKind, PropertySchema, SchemaNode,
};

/// Where a type expression was written, for diagnostics.
#[derive(Debug, Clone)]
pub struct Origin {
    pub decl: String,
    pub span: Span,
}

impl Origin {
    pub fn new(decl: impl Into<String>, span: Span) -> Self {
        Self {
            decl: decl.into(),
            span,
        }
    }

    fn of(decl: &Declaration) -> Self {
        Self::new(decl.id.to_string(), decl.span.clone())
    }
}

/// Resolves types against a declaration source, writing named definitions
/// into a registry supplied by the caller.
pub struct TypeResolver<'a> {
    source: &'a dyn DeclarationSource,
    /// Declarations whose members are currently being flattened.
    inheritance: Vec<DeclId>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(source: &'a dyn DeclarationSource) -> Self {
        Self {
            source,
            inheritance: Vec::new(),
        }
    }

    /// Resolves a declaration reference to a `Reference` node, registering
    /// its definition on first use.
    pub fn resolve(&mut self, decl_ref: &DeclRef, registry: &mut SchemaRegistry) -> Result<SchemaNode, CompilerError> {
        let source = self.source;
        let decl = source
            .declaration(&decl_ref.id)
            .ok_or_else(|| CompilerError::UnresolvableReference {
                name: decl_ref.id.name.clone(),
                decl: decl_ref.id.to_string(),
                location: Span::synthetic(),
            })?;

        if decl.type_params.len() != decl_ref.args.len() {
            return Err(CompilerError::GenericArityMismatch {
                decl: decl.id.to_string(),
                expected: decl.type_params.len(),
                found: decl_ref.args.len(),
            });
        }

        let name = canonical_name(&decl.id.name, &decl_ref.args);
        match &decl.kind {
            DeclKind::Object { .. } => {
                if !decl_ref.args.is_empty() {
                    tracing::debug!(name = %name, generic = %decl_ref, "instantiating generic declaration");
                }
                registry.get_or_create(&name, decl_ref, |reg| {
                    let object = self.build_object(decl, &decl_ref.args, reg)?;
                    Ok((SchemaNode::Object(object), decl.description.clone()))
                })
            }
            DeclKind::Alias(target) => registry.get_or_create(&name, decl_ref, |_| {
                let values = string_literals(target).ok_or_else(|| CompilerError::UnsupportedTypeAlias {
                    decl: decl.id.to_string(),
                    location: decl.span.clone(),
                })?;
                let values = values.into_iter().map(EnumValue::String).collect();
                Ok((SchemaNode::Enum(values), decl.description.clone()))
            }),
            DeclKind::Enum(members) => registry.get_or_create(&name, decl_ref, |_| {
                let origin = Origin::of(decl);
                let mut values = Vec::with_capacity(members.len());
                for member in members {
                    match &member.value {
                        Literal::String(s) => values.push(EnumValue::String(s.clone())),
                        Literal::Number(n) => values.push(EnumValue::Number(*n)),
                        Literal::Boolean(_) => {
                            return Err(CompilerError::unsupported(
                                &origin.decl,
                                format!("boolean enum member '{}'", member.name),
                                origin.span.clone(),
                            ))
                        }
                    }
                }
                Ok((SchemaNode::Enum(values), decl.description.clone()))
            }),
        }
    }

    /// Resolves a type expression written at `origin`.
    pub fn resolve_type(
        &mut self,
        expr: &TypeExpr,
        origin: &Origin,
        registry: &mut SchemaRegistry,
    ) -> Result<SchemaNode, CompilerError> {
        match expr {
            TypeExpr::Keyword(k) => keyword(*k, origin),
            TypeExpr::Literal(lit) => Ok(literal(lit)),
            TypeExpr::Array(inner) => Ok(SchemaNode::array(self.resolve_type(inner, origin, registry)?)),
            TypeExpr::Union(members) => self.resolve_union(members, origin, registry),
            TypeExpr::Intersection(members) => self.resolve_intersection(members, origin, registry),
            TypeExpr::Object(shape) => {
                let mut properties = IndexMap::new();
                for prop in &shape.properties {
                    properties.insert(prop.name.clone(), self.resolve_property(prop, origin, registry)?);
                }
                let additional_properties = self.resolve_index(&shape.index, origin, registry)?;
                Ok(SchemaNode::Object(ObjectSchema {
                    properties,
                    additional_properties,
                }))
            }
            TypeExpr::Ref(r) => self.resolve_ref(r, origin, registry),
            TypeExpr::Param(param) => Err(CompilerError::UnboundTypeParameter {
                param: param.clone(),
                decl: origin.decl.clone(),
            }),
            TypeExpr::Unsupported(what) => {
                Err(CompilerError::unsupported(&origin.decl, what, origin.span.clone()))
            }
        }
    }

    /// Resolves a property: optionality comes from `?`, a default value, or
    /// `| undefined` in the declared type.
    pub fn resolve_property(
        &mut self,
        prop: &PropertyDecl,
        origin: &Origin,
        registry: &mut SchemaRegistry,
    ) -> Result<PropertySchema, CompilerError> {
        let (ty, undefined) = strip_undefined(&prop.ty);
        let mut schema = self.resolve_type(&ty, origin, registry)?;
        if let Some(hint) = prop.format {
            schema = apply_format(schema, hint);
        }
        Ok(PropertySchema {
            schema,
            required: !(prop.optional || undefined || prop.default.is_some()),
            default: prop.default.as_ref().and_then(|d| d.value.clone()),
            description: prop.description.clone(),
        })
    }

    fn resolve_ref(&mut self, r: &TypeRef, origin: &Origin, registry: &mut SchemaRegistry) -> Result<SchemaNode, CompilerError> {
        if r.module.is_none() {
            if let Some(builtin) = builtins::lookup(&r.name) {
                return self.resolve_builtin(builtin, r, origin, registry);
            }
        }
        let decl = self.lookup_decl(r, origin)?;
        let decl_ref = self.instantiate(decl, &r.args, origin)?;
        self.resolve(&decl_ref, registry)
    }

    fn resolve_builtin(
        &mut self,
        builtin: Builtin,
        r: &TypeRef,
        origin: &Origin,
        registry: &mut SchemaRegistry,
    ) -> Result<SchemaNode, CompilerError> {
        let expect_args = |n: usize| {
            if r.args.len() == n {
                Ok(())
            } else {
                Err(CompilerError::GenericArityMismatch {
                    decl: r.name.clone(),
                    expected: n,
                    found: r.args.len(),
                })
            }
        };

        match builtin {
            Builtin::Primitive(kind) => Ok(SchemaNode::primitive(kind)),
            Builtin::Array => {
                expect_args(1)?;
                Ok(SchemaNode::array(self.resolve_type(&r.args[0], origin, registry)?))
            }
            Builtin::Promise => {
                expect_args(1)?;
                self.resolve_type(&r.args[0], origin, registry)
            }
            Builtin::Record => {
                expect_args(2)?;
                let signature = IndexSignature {
                    key_name: "key".to_string(),
                    key: r.args[0].clone(),
                    value: r.args[1].clone(),
                };
                let additional_properties = self.resolve_index(std::slice::from_ref(&signature), origin, registry)?;
                Ok(SchemaNode::Object(ObjectSchema {
                    properties: IndexMap::new(),
                    additional_properties,
                }))
            }
            Builtin::Unsupported => Err(CompilerError::unsupported(
                &origin.decl,
                format!("utility type '{}'", r.name),
                origin.span.clone(),
            )),
        }
    }

    fn resolve_union(
        &mut self,
        members: &[TypeExpr],
        origin: &Origin,
        registry: &mut SchemaRegistry,
    ) -> Result<SchemaNode, CompilerError> {
        let mut nodes = Vec::with_capacity(members.len());
        for member in members.iter().filter(|m| !m.is_undefined()) {
            nodes.push(self.resolve_type(member, origin, registry)?);
        }
        if nodes.is_empty() {
            return Ok(SchemaNode::primitive(PrimitiveKind::Void));
        }
        Ok(SchemaNode::union(nodes))
    }

    /// Intersections of objects merge into one object; later members win on
    /// name clashes. Anything else stays an intersection node.
    fn resolve_intersection(
        &mut self,
        members: &[TypeExpr],
        origin: &Origin,
        registry: &mut SchemaRegistry,
    ) -> Result<SchemaNode, CompilerError> {
        let mut nodes = Vec::with_capacity(members.len());
        for member in members {
            nodes.push(self.resolve_type(member, origin, registry)?);
        }

        let objects: Option<Vec<ObjectSchema>> = nodes
            .iter()
            .map(|node| match node {
                SchemaNode::Object(object) => Some(object.clone()),
                SchemaNode::Reference(name) => match registry.defined(name) {
                    Some(SchemaNode::Object(object)) => Some(object.clone()),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        let Some(objects) = objects else {
            return Ok(SchemaNode::Intersection(nodes));
        };

        let mut merged = ObjectSchema::new();
        for object in &objects {
            for (name, prop) in &object.properties {
                let required = prop.required || merged.properties.get(name).map_or(false, |p| p.required);
                merged.properties.insert(
                    name.clone(),
                    PropertySchema {
                        required,
                        ..prop.clone()
                    },
                );
            }
            if object.additional_properties != AdditionalProperties::Implicit {
                merged.additional_properties = object.additional_properties.clone();
            }
        }
        Ok(SchemaNode::Object(merged))
    }

    fn resolve_index(
        &mut self,
        index: &[IndexSignature],
        origin: &Origin,
        registry: &mut SchemaRegistry,
    ) -> Result<AdditionalProperties, CompilerError> {
        match index {
            [] => Ok(AdditionalProperties::Implicit),
            [signature] => {
                if signature.key != TypeExpr::keyword(Keyword::String) {
                    return Err(CompilerError::unsupported(
                        &origin.decl,
                        format!("index signature with key type '{}'", signature.key),
                        origin.span.clone(),
                    ));
                }
                match &signature.value {
                    TypeExpr::Keyword(Keyword::Any | Keyword::Unknown) => Ok(AdditionalProperties::Any),
                    value => Ok(AdditionalProperties::Schema(Box::new(
                        self.resolve_type(value, origin, registry)?,
                    ))),
                }
            }
            _ => Err(CompilerError::unsupported(
                &origin.decl,
                "multiple index signatures",
                origin.span.clone(),
            )),
        }
    }

    /// Flattens own and inherited members of an object-like declaration.
    fn build_object(
        &mut self,
        decl: &'a Declaration,
        args: &[TypeExpr],
        registry: &mut SchemaRegistry,
    ) -> Result<ObjectSchema, CompilerError> {
        let mut object = ObjectSchema::new();
        self.collect_members(decl, args, &mut object, registry)?;
        Ok(object)
    }

    fn collect_members(
        &mut self,
        decl: &'a Declaration,
        args: &[TypeExpr],
        object: &mut ObjectSchema,
        registry: &mut SchemaRegistry,
    ) -> Result<(), CompilerError> {
        let DeclKind::Object { bases, shape, .. } = &decl.kind else {
            return Err(CompilerError::InvalidBaseType {
                decl: self
                    .inheritance
                    .last()
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                base: decl.id.to_string(),
            });
        };

        if self.inheritance.contains(&decl.id) {
            let mut cycle: Vec<String> = self.inheritance.iter().map(|id| id.to_string()).collect();
            cycle.push(decl.id.to_string());
            return Err(CompilerError::InheritanceCycle { cycle });
        }

        let origin = Origin::of(decl);
        let bind = |name: &str| {
            decl.type_params
                .iter()
                .position(|p| p.name == name)
                .and_then(|i| args.get(i).cloned())
        };

        self.inheritance.push(decl.id.clone());

        for base in bases {
            let bound = TypeExpr::Ref(base.clone()).substitute(&bind);
            let TypeExpr::Ref(base_ref) = bound else {
                continue;
            };
            if base_ref.module.is_none() && builtins::lookup(&base_ref.name).is_some() {
                return Err(CompilerError::InvalidBaseType {
                    decl: decl.id.to_string(),
                    base: base_ref.name.clone(),
                });
            }
            let base_decl = self.lookup_decl(&base_ref, &origin)?;
            if !matches!(base_decl.kind, DeclKind::Object { .. }) {
                return Err(CompilerError::InvalidBaseType {
                    decl: decl.id.to_string(),
                    base: base_decl.id.to_string(),
                });
            }
            let base_instance = self.instantiate(base_decl, &base_ref.args, &origin)?;
            self.collect_members(base_decl, &base_instance.args, object, registry)?;
        }

        for prop in &shape.properties {
            let bound = PropertyDecl {
                ty: prop.ty.substitute(&bind),
                ..prop.clone()
            };
            let resolved = self.resolve_property(&bound, &origin, registry)?;
            object.properties.insert(prop.name.clone(), resolved);
        }

        if !shape.index.is_empty() {
            let bound: Vec<IndexSignature> = shape
                .index
                .iter()
                .map(|sig| IndexSignature {
                    key_name: sig.key_name.clone(),
                    key: sig.key.substitute(&bind),
                    value: sig.value.substitute(&bind),
                })
                .collect();
            object.additional_properties = self.resolve_index(&bound, &origin, registry)?;
        }

        self.inheritance.pop();
        Ok(())
    }

    /// Finds the declaration a type reference points at.
    fn lookup_decl(&self, r: &TypeRef, origin: &Origin) -> Result<&'a Declaration, CompilerError> {
        let source = self.source;
        let unresolvable = || CompilerError::UnresolvableReference {
            name: r.name.clone(),
            decl: origin.decl.clone(),
            location: origin.span.clone(),
        };

        if let Some(module) = &r.module {
            return source
                .declaration(&DeclId::new(module.as_str(), r.name.as_str()))
                .ok_or_else(unresolvable);
        }

        let mut found = source.find_by_name(&r.name);
        match found.len() {
            0 => Err(unresolvable()),
            1 => Ok(found.remove(0)),
            _ => Err(CompilerError::AmbiguousReference {
                name: r.name.clone(),
                candidates: found.iter().map(|d| d.id.to_string()).collect(),
                location: origin.span.clone(),
            }),
        }
    }

    /// Binds written type arguments (plus parameter defaults) to a declaration.
    fn instantiate(&self, decl: &Declaration, args: &[TypeExpr], origin: &Origin) -> Result<DeclRef, CompilerError> {
        let params = &decl.type_params;
        let arity_error = || CompilerError::GenericArityMismatch {
            decl: decl.id.to_string(),
            expected: params.len(),
            found: args.len(),
        };
        if args.len() > params.len() {
            return Err(arity_error());
        }

        let mut concrete: Vec<TypeExpr> = Vec::with_capacity(params.len());
        for (i, param) in params.iter().enumerate() {
            let arg = match (args.get(i), &param.default) {
                (Some(arg), _) => arg.clone(),
                (None, Some(default)) => default.substitute(&|name: &str| {
                    params[..i]
                        .iter()
                        .position(|p| p.name == name)
                        .and_then(|j| concrete.get(j).cloned())
                }),
                (None, None) => return Err(arity_error()),
            };
            concrete.push(self.normalize(&arg, origin)?);
        }

        Ok(DeclRef {
            id: decl.id.clone(),
            args: concrete,
        })
    }

    /// Binds every named reference in a type argument to its module so equal
    /// instantiations compare equal regardless of where they were written.
    fn normalize(&self, expr: &TypeExpr, origin: &Origin) -> Result<TypeExpr, CompilerError> {
        Ok(match expr {
            TypeExpr::Ref(r) => {
                let mut args = Vec::with_capacity(r.args.len());
                for arg in &r.args {
                    args.push(self.normalize(arg, origin)?);
                }
                let module = match &r.module {
                    Some(module) => Some(module.clone()),
                    None if builtins::lookup(&r.name).is_some() => None,
                    None => Some(self.lookup_decl(r, origin)?.id.module.clone()),
                };
                TypeExpr::Ref(TypeRef {
                    name: r.name.clone(),
                    module,
                    args,
                })
            }
            TypeExpr::Array(inner) => TypeExpr::Array(Box::new(self.normalize(inner, origin)?)),
            TypeExpr::Union(members) => TypeExpr::Union(self.normalize_all(members, origin)?),
            TypeExpr::Intersection(members) => TypeExpr::Intersection(self.normalize_all(members, origin)?),
            TypeExpr::Param(param) => {
                return Err(CompilerError::UnboundTypeParameter {
                    param: param.clone(),
                    decl: origin.decl.clone(),
                })
            }
            other => other.clone(),
        })
    }

    fn normalize_all(&self, members: &[TypeExpr], origin: &Origin) -> Result<Vec<TypeExpr>, CompilerError> {
        members.iter().map(|m| self.normalize(m, origin)).collect()
    }
}

fn keyword(k: Keyword, origin: &Origin) -> Result<SchemaNode, CompilerError> {
    let kind = match k {
        Keyword::String => PrimitiveKind::String,
        Keyword::Number => PrimitiveKind::Number,
        Keyword::BigInt => PrimitiveKind::Integer,
        Keyword::Boolean => PrimitiveKind::Boolean,
        Keyword::Any | Keyword::Unknown => PrimitiveKind::Any,
        Keyword::Void | Keyword::Undefined | Keyword::Never => PrimitiveKind::Void,
        Keyword::Null => PrimitiveKind::Null,
        Keyword::Object => PrimitiveKind::Object,
        Keyword::Symbol => {
            return Err(CompilerError::unsupported(&origin.decl, "symbol type", origin.span.clone()))
        }
    };
    Ok(SchemaNode::primitive(kind))
}

fn literal(lit: &Literal) -> SchemaNode {
    match lit {
        Literal::String(s) => SchemaNode::Enum(vec![EnumValue::String(s.clone())]),
        Literal::Number(n) => SchemaNode::Enum(vec![EnumValue::Number(*n)]),
        // `true | false` collapses to boolean through union deduplication.
        Literal::Boolean(_) => SchemaNode::primitive(PrimitiveKind::Boolean),
    }
}

/// Removes `undefined` members from a union, reporting whether any were present.
pub fn strip_undefined(expr: &TypeExpr) -> (TypeExpr, bool) {
    let TypeExpr::Union(members) = expr else {
        return (expr.clone(), false);
    };
    let kept: Vec<TypeExpr> = members.iter().filter(|m| !m.is_undefined()).cloned().collect();
    if kept.len() == members.len() || kept.is_empty() {
        return (expr.clone(), false);
    }
    let stripped = if kept.len() == 1 {
        kept.into_iter().next().unwrap_or_else(|| TypeExpr::keyword(Keyword::Undefined))
    } else {
        TypeExpr::Union(kept)
    };
    (stripped, true)
}

/// Refines primitives with a format hint, looking through arrays and unions.
pub fn apply_format(node: SchemaNode, hint: FormatHint) -> SchemaNode {
    match (node, hint) {
        (SchemaNode::Primitive(PrimitiveKind::Number | PrimitiveKind::Integer), FormatHint::Integer) => {
            SchemaNode::primitive(PrimitiveKind::Integer)
        }
        (SchemaNode::Primitive(PrimitiveKind::Number | PrimitiveKind::Integer), FormatHint::Float) => {
            SchemaNode::primitive(PrimitiveKind::Number)
        }
        (SchemaNode::Primitive(PrimitiveKind::String | PrimitiveKind::DateTime | PrimitiveKind::Date), FormatHint::Date) => {
            SchemaNode::primitive(PrimitiveKind::Date)
        }
        (SchemaNode::Primitive(PrimitiveKind::String | PrimitiveKind::DateTime | PrimitiveKind::Date), FormatHint::DateTime) => {
            SchemaNode::primitive(PrimitiveKind::DateTime)
        }
        (SchemaNode::Array(inner), hint) => SchemaNode::array(apply_format(*inner, hint)),
        (SchemaNode::Union(members), hint) => {
            SchemaNode::Union(members.into_iter().map(|m| apply_format(m, hint)).collect())
        }
        (node, _) => node,
    }
}

/// The string values of a string-literal union (or a single string literal).
fn string_literals(expr: &TypeExpr) -> Option<Vec<String>> {
    match expr {
        TypeExpr::Literal(Literal::String(s)) => Some(vec![s.clone()]),
        TypeExpr::Union(members) => {
            let mut values: Vec<String> = Vec::with_capacity(members.len());
            for member in members {
                let TypeExpr::Literal(Literal::String(s)) = member else {
                    return None;
                };
                if !values.contains(s) {
                    values.push(s.clone());
                }
            }
            Some(values)
        }
        _ => None,
    }
}
