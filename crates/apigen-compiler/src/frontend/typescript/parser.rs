//! TypeScript parser using tree-sitter.

use std::path::Path;

use serde_json::{Map, Value};
use tree_sitter::{Node, Parser};

use super::ast::*;
use crate::decl::{
    DeclId, DeclKind, Declaration, EnumMember, IndexSignature, Initializer, Keyword, Literal,
    ObjectShape, PropertyDecl, TypeExpr, TypeParam, TypeRef,
};
use crate::diagnostic::{CompilerError, Span};

/// TypeScript parser.
pub struct TypeScriptParser {
    parser: Parser,
}

impl TypeScriptParser {
    /// Creates a new TypeScript parser.
    pub fn new() -> Result<Self, CompilerError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .map_err(|_| CompilerError::ParserInitFailed)?;
        Ok(Self { parser })
    }

    /// Parses one TypeScript source file belonging to `module`.
    pub fn parse(&mut self, source: &str, path: &Path, module: &str) -> Result<ParsedFile, CompilerError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| CompilerError::ParseFailed { path: path.to_path_buf() })?;

        let root = tree.root_node();
        let mut visitor = Visitor::new(source, path, module);

        if let Some(bad) = first_error(root) {
            let message = if bad.is_missing() {
                format!("missing '{}'", bad.kind())
            } else {
                format!("unexpected '{}'", visitor.node_text(bad).lines().next().unwrap_or(""))
            };
            return Err(CompilerError::SyntaxError {
                message,
                location: visitor.span(bad),
            });
        }

        visitor.visit_program(root)?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            module: module.to_string(),
            imports: visitor.imports,
            declarations: visitor.declarations,
            controllers: visitor.controllers,
            misplaced: visitor.misplaced,
        })
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

#[derive(Default)]
struct ClassMembers {
    fields: Vec<PropertyDecl>,
    methods: Vec<MethodSyntax>,
}

/// AST visitor that extracts declarations from tree-sitter nodes.
struct Visitor<'a> {
    source: &'a str,
    path: &'a Path,
    module: &'a str,
    /// Type parameters of the declaration being visited.
    type_params: Vec<String>,
    /// Name of the declaration being visited, for diagnostics.
    current: String,
    imports: Vec<ImportDecl>,
    declarations: Vec<Declaration>,
    controllers: Vec<ControllerSyntax>,
    misplaced: Vec<MisplacedDecorators>,
}

impl<'a> Visitor<'a> {
    fn new(source: &'a str, path: &'a Path, module: &'a str) -> Self {
        Self {
            source,
            path,
            module,
            type_params: Vec::new(),
            current: String::new(),
            imports: Vec::new(),
            declarations: Vec::new(),
            controllers: Vec::new(),
            misplaced: Vec::new(),
        }
    }

    fn span(&self, node: Node) -> Span {
        Span::new(
            self.path.to_path_buf(),
            node.start_position().row,
            node.start_position().column,
            node.end_position().row,
            node.end_position().column,
        )
    }

    fn node_text(&self, node: Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn decl_id(&self, name: &str) -> DeclId {
        DeclId::new(self.module, name)
    }

    fn qualified(&self) -> String {
        self.decl_id(&self.current).to_string()
    }

    fn visit_program(&mut self, node: Node) -> Result<(), CompilerError> {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "import_statement" => self.visit_import(child),
                "export_statement" => self.visit_export(child)?,
                _ => self.visit_declaration(child, Vec::new())?,
            }
        }
        Ok(())
    }

    fn visit_import(&mut self, node: Node) {
        let mut source = String::new();
        let mut specifiers = Vec::new();

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "import_clause" => specifiers = self.visit_import_clause(child),
                "string" => source = self.string_value(child),
                _ => {}
            }
        }

        self.imports.push(ImportDecl {
            specifiers,
            source,
            span: self.span(node),
        });
    }

    fn visit_import_clause(&self, node: Node) -> Vec<ImportSpecifier> {
        let mut specifiers = Vec::new();
        let mut cursor = node.walk();

        for child in node.children(&mut cursor) {
            match child.kind() {
                "identifier" => specifiers.push(ImportSpecifier {
                    name: self.node_text(child).to_string(),
                    alias: None,
                }),
                "named_imports" => {
                    let mut inner_cursor = child.walk();
                    for spec in child.children(&mut inner_cursor) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(name) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        specifiers.push(ImportSpecifier {
                            name: self.property_name(name),
                            alias: spec
                                .child_by_field_name("alias")
                                .map(|a| self.node_text(a).to_string()),
                        });
                    }
                }
                _ => {}
            }
        }

        specifiers
    }

    fn visit_export(&mut self, node: Node) -> Result<(), CompilerError> {
        let mut decorators = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "decorator" {
                decorators.push(self.visit_decorator(child)?);
            }
        }

        if let Some(declaration) = node.child_by_field_name("declaration") {
            self.visit_declaration(declaration, decorators)?;
        }
        Ok(())
    }

    fn visit_declaration(&mut self, node: Node, decorators: Vec<DecoratorSyntax>) -> Result<(), CompilerError> {
        match node.kind() {
            "interface_declaration" => self.visit_interface(node),
            "class_declaration" | "abstract_class_declaration" => self.visit_class(node, decorators),
            "enum_declaration" => self.visit_enum(node),
            "type_alias_declaration" => self.visit_type_alias(node),
            _ => Ok(()),
        }
    }

    /// The `/** */` comment directly above a declaration or member, looking
    /// past decorators and an enclosing `export`.
    fn doc_comment(&self, node: Node) -> Option<JsDoc> {
        let target = match node.parent() {
            Some(parent) if parent.kind() == "export_statement" => parent,
            _ => node,
        };
        let mut prev = target.prev_sibling();
        while let Some(sibling) = prev {
            match sibling.kind() {
                "decorator" => prev = sibling.prev_sibling(),
                "comment" => {
                    let text = self.node_text(sibling);
                    return text.starts_with("/**").then(|| JsDoc::parse(text));
                }
                _ => return None,
            }
        }
        None
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn visit_interface(&mut self, node: Node) -> Result<(), CompilerError> {
        let Some(name_node) = node.child_by_field_name("name") else {
            return Ok(());
        };
        self.current = self.node_text(name_node).to_string();
        let type_params = self.visit_type_parameters(node.child_by_field_name("type_parameters"))?;

        let mut bases = Vec::new();
        let mut shape = ObjectShape::default();

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "extends_type_clause" => bases = self.visit_extends_types(child)?,
                "interface_body" | "object_type" => shape = self.visit_object_members(child)?,
                _ => {}
            }
        }
        self.type_params.clear();

        self.declarations.push(Declaration {
            id: self.decl_id(&self.current),
            kind: DeclKind::Object {
                bases,
                shape,
                is_class: false,
            },
            type_params,
            description: self.doc_comment(node).and_then(|d| d.description),
            span: self.span(node),
        });
        Ok(())
    }

    fn visit_type_alias(&mut self, node: Node) -> Result<(), CompilerError> {
        let (Some(name_node), Some(value)) = (node.child_by_field_name("name"), node.child_by_field_name("value")) else {
            return Ok(());
        };
        self.current = self.node_text(name_node).to_string();
        let type_params = self.visit_type_parameters(node.child_by_field_name("type_parameters"))?;
        let target = self.visit_type(value)?;
        self.type_params.clear();

        self.declarations.push(Declaration {
            id: self.decl_id(&self.current),
            kind: DeclKind::Alias(target),
            type_params,
            description: self.doc_comment(node).and_then(|d| d.description),
            span: self.span(node),
        });
        Ok(())
    }

    fn visit_enum(&mut self, node: Node) -> Result<(), CompilerError> {
        let (Some(name_node), Some(body)) = (node.child_by_field_name("name"), node.child_by_field_name("body")) else {
            return Ok(());
        };
        self.current = self.node_text(name_node).to_string();

        let mut members = Vec::new();
        let mut next = 0.0;

        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            let (name, value) = match child.kind() {
                "property_identifier" | "string" => (self.property_name(child), None),
                "enum_assignment" => {
                    let Some(name) = child.child_by_field_name("name") else {
                        continue;
                    };
                    (self.property_name(name), child.child_by_field_name("value"))
                }
                _ => continue,
            };

            let value = match value {
                None => Literal::Number(next.into()),
                Some(expr) => match self.literal_value(expr) {
                    Some(Value::String(s)) => Literal::String(s),
                    Some(Value::Bool(b)) => Literal::Boolean(b),
                    Some(Value::Number(n)) => Literal::Number(n.as_f64().unwrap_or_default().into()),
                    _ => {
                        return Err(CompilerError::unsupported(
                            self.qualified(),
                            format!("computed enum member '{}'", name),
                            self.span(child),
                        ))
                    }
                },
            };
            if let Literal::Number(n) = &value {
                next = n.0 + 1.0;
            }
            members.push(EnumMember { name, value });
        }

        self.declarations.push(Declaration {
            id: self.decl_id(&self.current),
            kind: DeclKind::Enum(members),
            type_params: Vec::new(),
            description: self.doc_comment(node).and_then(|d| d.description),
            span: self.span(node),
        });
        Ok(())
    }

    fn visit_class(&mut self, node: Node, mut decorators: Vec<DecoratorSyntax>) -> Result<(), CompilerError> {
        let Some(name_node) = node.child_by_field_name("name") else {
            return Ok(());
        };
        self.current = self.node_text(name_node).to_string();

        let mut heritage = None;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "decorator" => decorators.push(self.visit_decorator(child)?),
                "class_heritage" => heritage = Some(child),
                _ => {}
            }
        }

        let type_params = self.visit_type_parameters(node.child_by_field_name("type_parameters"))?;
        let members = match node.child_by_field_name("body") {
            Some(body) => self.visit_class_body(body)?,
            None => ClassMembers::default(),
        };
        let doc = self.doc_comment(node);

        let is_controller = !decorators.is_empty() || members.methods.iter().any(|m| !m.decorators.is_empty());
        if is_controller {
            self.controllers.push(ControllerSyntax {
                name: self.current.clone(),
                decorators,
                methods: members.methods,
                doc,
                span: self.span(node),
            });
        } else {
            let bases = match heritage {
                Some(h) => self.visit_class_heritage(h)?,
                None => Vec::new(),
            };
            self.declarations.push(Declaration {
                id: self.decl_id(&self.current),
                kind: DeclKind::Object {
                    bases,
                    shape: ObjectShape::new(members.fields),
                    is_class: true,
                },
                type_params,
                description: doc.and_then(|d| d.description),
                span: self.span(node),
            });
        }
        self.type_params.clear();
        Ok(())
    }

    fn visit_class_heritage(&mut self, node: Node) -> Result<Vec<TypeRef>, CompilerError> {
        let mut bases: Vec<TypeRef> = Vec::new();
        let mut cursor = node.walk();
        for clause in node.children(&mut cursor) {
            if clause.kind() != "extends_clause" {
                continue;
            }
            let mut inner_cursor = clause.walk();
            for child in clause.children(&mut inner_cursor) {
                match child.kind() {
                    "identifier" => bases.push(TypeRef::named(self.node_text(child))),
                    "member_expression" => {
                        if let Some(property) = child.child_by_field_name("property") {
                            bases.push(TypeRef::named(self.node_text(property)));
                        }
                    }
                    "type_arguments" => {
                        let args = self.visit_type_arguments(child)?;
                        if let Some(base) = bases.last_mut() {
                            base.args = args;
                        }
                    }
                    "extends" | "," => {}
                    other => {
                        return Err(CompilerError::unsupported(
                            self.qualified(),
                            format!("'{}' in extends clause", other),
                            self.span(child),
                        ))
                    }
                }
            }
        }
        Ok(bases)
    }

    fn visit_class_body(&mut self, node: Node) -> Result<ClassMembers, CompilerError> {
        let mut members = ClassMembers::default();
        let mut pending = Vec::new();

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "decorator" => pending.push(self.visit_decorator(child)?),
                "method_definition" => {
                    let decorators = std::mem::take(&mut pending);
                    if let Some(method) = self.visit_method(child, decorators, &mut members.fields)? {
                        members.methods.push(method);
                    }
                }
                "public_field_definition" => {
                    let decorators = std::mem::take(&mut pending);
                    if let Some(field) = self.visit_field(child, decorators)? {
                        members.fields.push(field);
                    }
                }
                _ => {}
            }
        }

        Ok(members)
    }

    fn visit_field(
        &mut self,
        node: Node,
        mut decorators: Vec<DecoratorSyntax>,
    ) -> Result<Option<PropertyDecl>, CompilerError> {
        let mut optional = false;
        let mut skipped = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "decorator" => decorators.push(self.visit_decorator(child)?),
                "accessibility_modifier" => skipped |= self.node_text(child) != "public",
                "static" => skipped = true,
                "?" => optional = true,
                _ => {}
            }
        }
        self.misplace("property", decorators);

        let Some(name_node) = node.child_by_field_name("name") else {
            return Ok(None);
        };
        let name = self.property_name(name_node);
        if skipped {
            tracing::warn!(class = %self.current, field = %name, "ignoring non-public or static field");
            return Ok(None);
        }

        let initializer = node.child_by_field_name("value").map(|v| self.initializer(v));
        let ty = match node.child_by_field_name("type") {
            Some(annotation) => self.visit_type_annotation(annotation)?,
            None => infer_type(initializer.as_ref()),
        };

        let doc = self.doc_comment(node);
        Ok(Some(PropertyDecl {
            name,
            ty,
            optional,
            default: initializer.or_else(|| doc.as_ref().and_then(|d| d.default_value())),
            description: doc.as_ref().and_then(|d| d.description.clone()),
            format: doc.as_ref().and_then(|d| d.format()),
        }))
    }

    fn visit_method(
        &mut self,
        node: Node,
        mut decorators: Vec<DecoratorSyntax>,
        fields: &mut Vec<PropertyDecl>,
    ) -> Result<Option<MethodSyntax>, CompilerError> {
        let Some(name_node) = node.child_by_field_name("name") else {
            return Ok(None);
        };
        let name = self.property_name(name_node);

        let mut hidden = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "decorator" => decorators.push(self.visit_decorator(child)?),
                "accessibility_modifier" => hidden |= self.node_text(child) != "public",
                "static" | "get" | "set" => hidden = true,
                _ => {}
            }
        }

        if name == "constructor" {
            self.misplace("constructor", decorators);
            if let Some(params) = node.child_by_field_name("parameters") {
                fields.extend(self.visit_parameter_properties(params)?);
            }
            return Ok(None);
        }

        if hidden {
            self.misplace("non-public, static or accessor method", decorators);
            return Ok(None);
        }

        let parameters = match node.child_by_field_name("parameters") {
            Some(params) => self.visit_parameters(params)?,
            None => Vec::new(),
        };
        let return_type = match node.child_by_field_name("return_type") {
            Some(annotation) if annotation.kind() == "type_annotation" => Some(self.visit_type_annotation(annotation)?),
            _ => None,
        };

        Ok(Some(MethodSyntax {
            name,
            decorators,
            parameters,
            return_type,
            doc: self.doc_comment(node),
            span: self.span(node),
        }))
    }

    fn misplace(&mut self, target: &'static str, decorators: Vec<DecoratorSyntax>) {
        if !decorators.is_empty() {
            self.misplaced.push(MisplacedDecorators { target, decorators });
        }
    }

    fn visit_parameters(&mut self, node: Node) -> Result<Vec<ParameterSyntax>, CompilerError> {
        let mut params = Vec::new();
        let mut cursor = node.walk();

        for child in node.children(&mut cursor) {
            if child.kind() == "required_parameter" || child.kind() == "optional_parameter" {
                if let Some(param) = self.visit_parameter(child)? {
                    params.push(param);
                }
            }
        }

        Ok(params)
    }

    fn visit_parameter(&mut self, node: Node) -> Result<Option<ParameterSyntax>, CompilerError> {
        let Some(pattern) = node.child_by_field_name("pattern") else {
            return Ok(None);
        };
        if pattern.kind() == "this" {
            return Ok(None);
        }

        let mut decorators = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "decorator" {
                decorators.push(self.visit_decorator(child)?);
            }
        }

        let ty = match node.child_by_field_name("type") {
            Some(annotation) => Some(self.visit_type_annotation(annotation)?),
            None => None,
        };

        Ok(Some(ParameterSyntax {
            name: self.node_text(pattern).to_string(),
            decorators,
            ty,
            optional: node.kind() == "optional_parameter",
            default: node.child_by_field_name("value").map(|v| self.initializer(v)),
            span: self.span(node),
        }))
    }

    /// `constructor(public name: string)` declares a field.
    fn visit_parameter_properties(&mut self, node: Node) -> Result<Vec<PropertyDecl>, CompilerError> {
        let mut fields = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let mut inner = child.walk();
            let is_public = child
                .children(&mut inner)
                .any(|c| c.kind() == "accessibility_modifier" && self.node_text(c) == "public");
            if !is_public {
                continue;
            }
            if let Some(param) = self.visit_parameter(child)? {
                fields.push(PropertyDecl {
                    name: param.name,
                    ty: param.ty.unwrap_or(TypeExpr::Keyword(Keyword::Any)),
                    optional: param.optional,
                    default: param.default,
                    description: None,
                    format: None,
                });
            }
        }
        Ok(fields)
    }

    fn visit_decorator(&mut self, node: Node) -> Result<DecoratorSyntax, CompilerError> {
        let span = self.span(node);
        let Some(expr) = node.named_child(0) else {
            return Err(CompilerError::SyntaxError {
                message: "empty decorator".to_string(),
                location: span,
            });
        };

        let mut decorator = DecoratorSyntax {
            name: String::new(),
            type_args: Vec::new(),
            args: Vec::new(),
            span,
        };

        let callee = if expr.kind() == "call_expression" {
            if let Some(type_args) = expr.child_by_field_name("type_arguments") {
                decorator.type_args = self.visit_type_arguments(type_args)?;
            }
            if let Some(arguments) = expr.child_by_field_name("arguments") {
                let mut cursor = arguments.walk();
                for arg in arguments.named_children(&mut cursor) {
                    if arg.kind() == "comment" {
                        continue;
                    }
                    decorator.args.push(match self.literal_value(arg) {
                        Some(value) => ArgSyntax::Literal(value),
                        None => ArgSyntax::Expression(self.node_text(arg).to_string()),
                    });
                }
            }
            expr.child_by_field_name("function")
        } else {
            Some(expr)
        };

        decorator.name = match callee {
            Some(c) if c.kind() == "member_expression" => c
                .child_by_field_name("property")
                .map(|p| self.node_text(p).to_string())
                .unwrap_or_default(),
            Some(c) => self.node_text(c).to_string(),
            None => String::new(),
        };
        Ok(decorator)
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn visit_type_parameters(&mut self, node: Option<Node>) -> Result<Vec<TypeParam>, CompilerError> {
        self.type_params.clear();
        let Some(node) = node else {
            return Ok(Vec::new());
        };

        let mut cursor = node.walk();
        let params: Vec<Node> = node
            .named_children(&mut cursor)
            .filter(|p| p.kind() == "type_parameter")
            .collect();

        // Names first, so defaults can refer to earlier parameters.
        self.type_params = params
            .iter()
            .filter_map(|p| p.child_by_field_name("name"))
            .map(|n| self.node_text(n).to_string())
            .collect();

        let mut out = Vec::with_capacity(params.len());
        for param in params {
            let Some(name) = param.child_by_field_name("name") else {
                continue;
            };
            let default = match param.child_by_field_name("value").and_then(|v| v.named_child(0)) {
                Some(ty) => Some(self.visit_type(ty)?),
                None => None,
            };
            out.push(TypeParam {
                name: self.node_text(name).to_string(),
                default,
            });
        }
        Ok(out)
    }

    fn visit_extends_types(&mut self, node: Node) -> Result<Vec<TypeRef>, CompilerError> {
        let mut bases = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match self.visit_type(child)? {
                TypeExpr::Ref(base) => bases.push(base),
                other => {
                    return Err(CompilerError::unsupported(
                        self.qualified(),
                        format!("extending '{}'", other),
                        self.span(child),
                    ))
                }
            }
        }
        Ok(bases)
    }

    fn visit_object_members(&mut self, node: Node) -> Result<ObjectShape, CompilerError> {
        let mut shape = ObjectShape::default();
        let mut cursor = node.walk();

        for child in node.children(&mut cursor) {
            match child.kind() {
                "property_signature" => {
                    if let Some(prop) = self.visit_property_signature(child)? {
                        shape.properties.push(prop);
                    }
                }
                "index_signature" => shape.index.push(self.visit_index_signature(child)?),
                "method_signature" | "call_signature" | "construct_signature" => {
                    tracing::warn!(decl = %self.current, member = %self.node_text(child), "ignoring method signature");
                }
                _ => {}
            }
        }

        Ok(shape)
    }

    fn visit_property_signature(&mut self, node: Node) -> Result<Option<PropertyDecl>, CompilerError> {
        let Some(name_node) = node.child_by_field_name("name") else {
            return Ok(None);
        };

        let mut optional = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "?" {
                optional = true;
            }
        }

        let ty = match node.child_by_field_name("type") {
            Some(annotation) => self.visit_type_annotation(annotation)?,
            None => TypeExpr::Keyword(Keyword::Any),
        };

        let doc = self.doc_comment(node);
        Ok(Some(PropertyDecl {
            name: self.property_name(name_node),
            ty,
            optional,
            default: doc.as_ref().and_then(|d| d.default_value()),
            description: doc.as_ref().and_then(|d| d.description.clone()),
            format: doc.as_ref().and_then(|d| d.format()),
        }))
    }

    fn visit_index_signature(&mut self, node: Node) -> Result<IndexSignature, CompilerError> {
        let mut value = None;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "mapped_type_clause" => {
                    return Err(CompilerError::unsupported(self.qualified(), "mapped type", self.span(node)));
                }
                "type_annotation" | "omitting_type_annotation" | "adding_type_annotation" | "opting_type_annotation" => {
                    value = Some(self.visit_type_annotation(child)?);
                }
                _ => {}
            }
        }

        let key = match node.child_by_field_name("index_type") {
            Some(key) => self.visit_type(key)?,
            None => TypeExpr::Keyword(Keyword::String),
        };

        Ok(IndexSignature {
            key_name: node
                .child_by_field_name("name")
                .map(|n| self.node_text(n).to_string())
                .unwrap_or_else(|| "key".to_string()),
            key,
            value: value.unwrap_or(TypeExpr::Keyword(Keyword::Any)),
        })
    }

    fn visit_type_annotation(&mut self, node: Node) -> Result<TypeExpr, CompilerError> {
        match node.named_child(0) {
            Some(ty) => self.visit_type(ty),
            None => Ok(TypeExpr::Keyword(Keyword::Any)),
        }
    }

    fn visit_type_arguments(&mut self, node: Node) -> Result<Vec<TypeExpr>, CompilerError> {
        let mut args = Vec::new();
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            args.push(self.visit_type(child)?);
        }
        Ok(args)
    }

    fn visit_type(&mut self, node: Node) -> Result<TypeExpr, CompilerError> {
        let ty = match node.kind() {
            "predefined_type" => {
                let text = self.node_text(node);
                match Keyword::from_str(text) {
                    Some(keyword) => TypeExpr::Keyword(keyword),
                    None => TypeExpr::Unsupported(format!("type '{}'", text)),
                }
            }
            "type_identifier" => self.named_type(self.node_text(node)),
            "nested_type_identifier" => match node.child_by_field_name("name") {
                Some(name) => TypeExpr::Ref(TypeRef::named(self.node_text(name))),
                None => TypeExpr::Unsupported(self.node_text(node).to_string()),
            },
            "generic_type" => {
                let name = match node.child_by_field_name("name") {
                    Some(n) if n.kind() == "nested_type_identifier" => n
                        .child_by_field_name("name")
                        .map(|inner| self.node_text(inner).to_string())
                        .unwrap_or_default(),
                    Some(n) => self.node_text(n).to_string(),
                    None => String::new(),
                };
                let args = match node.child_by_field_name("type_arguments") {
                    Some(args) => self.visit_type_arguments(args)?,
                    None => Vec::new(),
                };
                TypeExpr::Ref(TypeRef::named(name).with_args(args))
            }
            "array_type" => match node.named_child(0) {
                Some(inner) => TypeExpr::array(self.visit_type(inner)?),
                None => TypeExpr::Unsupported("array type".to_string()),
            },
            "readonly_type" | "parenthesized_type" => match node.named_child(0) {
                Some(inner) => self.visit_type(inner)?,
                None => TypeExpr::Unsupported(node.kind().replace('_', " ")),
            },
            "union_type" => TypeExpr::Union(self.visit_type_list(node, |t| match t {
                TypeExpr::Union(members) => Ok(members),
                other => Err(other),
            })?),
            "intersection_type" => TypeExpr::Intersection(self.visit_type_list(node, |t| match t {
                TypeExpr::Intersection(members) => Ok(members),
                other => Err(other),
            })?),
            "literal_type" => self.visit_literal_type(node),
            "object_type" => TypeExpr::Object(self.visit_object_members(node)?),
            "tuple_type" => TypeExpr::Unsupported("tuple type".to_string()),
            "function_type" | "constructor_type" => TypeExpr::Unsupported("function type".to_string()),
            "conditional_type" => TypeExpr::Unsupported("conditional type".to_string()),
            "index_type_query" => TypeExpr::Unsupported("keyof query".to_string()),
            "type_query" => TypeExpr::Unsupported("typeof query".to_string()),
            "lookup_type" => TypeExpr::Unsupported("indexed access type".to_string()),
            "template_literal_type" => TypeExpr::Unsupported("template literal type".to_string()),
            other => TypeExpr::Unsupported(other.replace('_', " ")),
        };
        Ok(ty)
    }

    /// Members of a union or intersection, flattening nested ones of the
    /// same kind (the grammar nests them left-associatively).
    fn visit_type_list(
        &mut self,
        node: Node,
        flatten: impl Fn(TypeExpr) -> Result<Vec<TypeExpr>, TypeExpr>,
    ) -> Result<Vec<TypeExpr>, CompilerError> {
        let mut members = Vec::new();
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            match flatten(self.visit_type(child)?) {
                Ok(nested) => members.extend(nested),
                Err(single) => members.push(single),
            }
        }
        Ok(members)
    }

    fn visit_literal_type(&self, node: Node) -> TypeExpr {
        let Some(inner) = node.named_child(0) else {
            return TypeExpr::Unsupported("literal type".to_string());
        };
        match inner.kind() {
            "null" => TypeExpr::Keyword(Keyword::Null),
            "undefined" => TypeExpr::Keyword(Keyword::Undefined),
            _ => match self.literal_value(inner) {
                Some(Value::String(s)) => TypeExpr::Literal(Literal::String(s)),
                Some(Value::Bool(b)) => TypeExpr::Literal(Literal::Boolean(b)),
                Some(Value::Number(n)) => TypeExpr::Literal(Literal::Number(n.as_f64().unwrap_or_default().into())),
                _ => TypeExpr::Unsupported(format!("literal '{}'", self.node_text(inner))),
            },
        }
    }

    fn named_type(&self, name: &str) -> TypeExpr {
        if self.type_params.iter().any(|p| p == name) {
            return TypeExpr::Param(name.to_string());
        }
        match Keyword::from_str(name) {
            Some(keyword) => TypeExpr::Keyword(keyword),
            None => TypeExpr::Ref(TypeRef::named(name)),
        }
    }

    // =========================================================================
    // Literals
    // =========================================================================

    fn initializer(&self, node: Node) -> Initializer {
        Initializer {
            text: self.node_text(node).to_string(),
            value: self.literal_value(node),
        }
    }

    /// Property names may be identifiers or quoted strings.
    fn property_name(&self, node: Node) -> String {
        match node.kind() {
            "string" => self.string_value(node),
            _ => self.node_text(node).to_string(),
        }
    }

    fn string_value(&self, node: Node) -> String {
        let mut out = String::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "string_fragment" => out.push_str(self.node_text(child)),
                "escape_sequence" => out.push_str(&unescape(self.node_text(child))),
                _ => {}
            }
        }
        out
    }

    /// Converts a JSON-compatible literal expression into a value.
    fn literal_value(&self, node: Node) -> Option<Value> {
        match node.kind() {
            "string" => Some(Value::String(self.string_value(node))),
            "template_string" => {
                let mut cursor = node.walk();
                let has_substitution = node
                    .children(&mut cursor)
                    .any(|c| c.kind() == "template_substitution");
                (!has_substitution).then(|| Value::String(self.string_value(node)))
            }
            "number" => parse_number(self.node_text(node)).and_then(json_number),
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            "null" => Some(Value::Null),
            "unary_expression" => {
                let operator = node.child_by_field_name("operator").map(|o| self.node_text(o))?;
                let n = self.literal_value(node.child_by_field_name("argument")?)?.as_f64()?;
                match operator {
                    "-" => json_number(-n),
                    "+" => json_number(n),
                    _ => None,
                }
            }
            "array" => {
                let mut cursor = node.walk();
                let items: Option<Vec<Value>> = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() != "comment")
                    .map(|c| self.literal_value(c))
                    .collect();
                items.map(Value::Array)
            }
            "object" => {
                let mut map = Map::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "pair" => {
                            let key = self.property_name(child.child_by_field_name("key")?);
                            let value = self.literal_value(child.child_by_field_name("value")?)?;
                            map.insert(key, value);
                        }
                        "comment" => {}
                        _ => return None,
                    }
                }
                Some(Value::Object(map))
            }
            "parenthesized_expression" | "as_expression" | "satisfies_expression" => {
                self.literal_value(node.named_child(0)?)
            }
            _ => None,
        }
    }
}

fn unescape(sequence: &str) -> String {
    match sequence {
        "\\n" => "\n".to_string(),
        "\\t" => "\t".to_string(),
        "\\r" => "\r".to_string(),
        "\\0" => "\0".to_string(),
        other => other.trim_start_matches('\\').to_string(),
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let text = text.replace('_', "");
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok().map(|n| n as f64);
    }
    text.parse::<f64>().ok()
}

fn json_number(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Some(Value::from(n as i64))
    } else {
        serde_json::Number::from_f64(n).map(Value::Number)
    }
}

/// Type of an unannotated field, from its initializer.
fn infer_type(initializer: Option<&Initializer>) -> TypeExpr {
    match initializer.and_then(|i| i.value.as_ref()) {
        Some(Value::String(_)) => TypeExpr::Keyword(Keyword::String),
        Some(Value::Number(_)) => TypeExpr::Keyword(Keyword::Number),
        Some(Value::Bool(_)) => TypeExpr::Keyword(Keyword::Boolean),
        _ => TypeExpr::Keyword(Keyword::Any),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordered_float::OrderedFloat;
    use serde_json::json;

    fn parse(source: &str) -> ParsedFile {
        let mut parser = TypeScriptParser::new().unwrap();
        parser.parse(source, Path::new("models/user.ts"), "models/user").unwrap()
    }

    fn decl<'f>(file: &'f ParsedFile, name: &str) -> &'f Declaration {
        file.declarations.iter().find(|d| d.id.name == name).unwrap()
    }

    #[test]
    fn test_parse_interface() {
        let file = parse(
            r#"
/** A registered user. */
export interface User extends Entity {
    /** Display name */
    name: string;
    nick?: string;
    tags: string[];
    /** @isInt */
    age: number | undefined;
    'x-extra': boolean;
}
"#,
        );

        let user = decl(&file, "User");
        assert_eq!(user.id, DeclId::new("models/user", "User"));
        assert_eq!(user.description.as_deref(), Some("A registered user."));
        assert_eq!(user.bases(), &[TypeRef::named("Entity")]);

        let members = user.members();
        assert_eq!(members.len(), 5);
        assert_eq!(members[0].description.as_deref(), Some("Display name"));
        assert!(members[1].optional);
        assert_eq!(members[2].ty, TypeExpr::array(TypeExpr::Keyword(Keyword::String)));
        assert_eq!(
            members[3].ty,
            TypeExpr::Union(vec![TypeExpr::Keyword(Keyword::Number), TypeExpr::Keyword(Keyword::Undefined)])
        );
        assert_eq!(members[3].format, Some(crate::decl::FormatHint::Integer));
        assert_eq!(members[4].name, "x-extra");
    }

    #[test]
    fn test_parse_generics_and_aliases() {
        let file = parse(
            r#"
interface Paged<T, M = string> {
    items: T[];
    meta: M;
    total: number;
}
type Status = "open" | "closed" | "archived";
type Lookup = { [key: string]: number };
"#,
        );

        let paged = decl(&file, "Paged");
        assert_eq!(paged.type_params.len(), 2);
        assert_eq!(paged.type_params[1].default, Some(TypeExpr::Keyword(Keyword::String)));
        assert_eq!(paged.members()[0].ty, TypeExpr::array(TypeExpr::Param("T".into())));

        let status = decl(&file, "Status");
        match &status.kind {
            DeclKind::Alias(TypeExpr::Union(members)) => assert_eq!(members.len(), 3),
            other => panic!("unexpected {:?}", other),
        }

        match &decl(&file, "Lookup").kind {
            DeclKind::Alias(TypeExpr::Object(shape)) => {
                assert_eq!(shape.index.len(), 1);
                assert_eq!(shape.index[0].value, TypeExpr::Keyword(Keyword::Number));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_enums() {
        let file = parse(
            r#"
enum Color { Red, Green = 5, Blue }
export enum Kind { A = "a", B = "b" }
"#,
        );

        match &decl(&file, "Color").kind {
            DeclKind::Enum(members) => {
                let values: Vec<&Literal> = members.iter().map(|m| &m.value).collect();
                assert_eq!(
                    values,
                    vec![
                        &Literal::Number(OrderedFloat(0.0)),
                        &Literal::Number(OrderedFloat(5.0)),
                        &Literal::Number(OrderedFloat(6.0))
                    ]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
        match &decl(&file, "Kind").kind {
            DeclKind::Enum(members) => assert_eq!(members[1].value, Literal::String("b".into())),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_data_class() {
        let file = parse(
            r#"
export class Account extends Base<string> {
    public id: number;
    status = "active";
    private secret: string;
    static count = 0;
    constructor(public owner: string, other: number) {}
}
"#,
        );

        let account = decl(&file, "Account");
        assert_eq!(account.bases()[0].args, vec![TypeExpr::Keyword(Keyword::String)]);
        let names: Vec<&str> = account.members().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["id", "status", "owner"]);
        assert_eq!(account.members()[1].ty, TypeExpr::Keyword(Keyword::String));
        assert_eq!(account.members()[1].default.as_ref().unwrap().value, Some(json!("active")));
    }

    #[test]
    fn test_member_decorators_without_an_operation_are_recorded() {
        let file = parse(
            r#"
@Route("x")
class C {
    @Get("ghost") ghost: string;
    @Post() protected save(): void {}
    @Get() public list(): string { return ""; }
}
"#,
        );

        assert_eq!(file.controllers[0].methods.len(), 1);
        let targets: Vec<&str> = file.misplaced.iter().map(|m| m.target).collect();
        assert_eq!(targets, vec!["property", "non-public, static or accessor method"]);
        assert_eq!(file.misplaced[0].decorators[0].name, "Get");
        assert!(file.misplaced.iter().all(|m| m.decorators.len() == 1));
    }

    #[test]
    fn test_parse_controller() {
        let file = parse(
            r#"
import { Route, Get, Path, Query } from "tsoa";
import { User as Person } from "./user";

@Route("users")
@Security("api_key")
export class UsersController extends Controller {
    /**
     * Get one user.
     * @param id the id
     */
    @Get("{id}")
    @Response<ErrorBody>(404, "Not found")
    public async getUser(@Path() id: number, @Query("q") search?: string, limit = 10): Promise<Person> {
        return null as any;
    }

    private helper(): void {}
}
"#,
        );

        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[1].source, "./user");
        assert_eq!(file.imports[1].specifiers[0].local_name(), "Person");

        assert!(file.declarations.is_empty());
        let controller = &file.controllers[0];
        assert_eq!(controller.name, "UsersController");
        let names: Vec<&str> = controller.decorators.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Route", "Security"]);
        assert_eq!(controller.decorators[0].args, vec![ArgSyntax::Literal(json!("users"))]);

        assert_eq!(controller.methods.len(), 1);
        let method = &controller.methods[0];
        assert_eq!(method.name, "getUser");
        assert_eq!(method.decorators.len(), 2);
        assert_eq!(method.decorators[1].type_args, vec![TypeExpr::reference("ErrorBody")]);
        assert_eq!(method.decorators[1].args[0], ArgSyntax::Literal(json!(404)));
        assert_eq!(method.doc.as_ref().unwrap().description.as_deref(), Some("Get one user."));
        assert_eq!(
            method.return_type,
            Some(TypeExpr::Ref(TypeRef::named("Promise").with_args(vec![TypeExpr::reference("Person")])))
        );

        let params = &method.parameters;
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].decorators[0].name, "Path");
        assert!(params[1].optional);
        assert_eq!(params[1].decorators[0].args, vec![ArgSyntax::Literal(json!("q"))]);
        assert_eq!(params[2].ty, None);
        assert_eq!(params[2].default.as_ref().unwrap().value, Some(json!(10)));
    }

    #[test]
    fn test_non_literal_decorator_argument_is_kept_as_text() {
        let file = parse(
            r#"
@Route(PREFIX)
class C {}
"#,
        );
        assert_eq!(
            file.controllers[0].decorators[0].args,
            vec![ArgSyntax::Expression("PREFIX".into())]
        );
    }

    #[test]
    fn test_unsupported_types_are_marked() {
        let file = parse(
            r#"
interface Odd {
    pair: [string, number];
    callback: () => void;
    key: keyof User;
}
"#,
        );
        let kinds: Vec<String> = decl(&file, "Odd").members().iter().map(|m| m.ty.to_string()).collect();
        assert_eq!(kinds, vec!["<tuple type>", "<function type>", "<keyof query>"]);
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let mut parser = TypeScriptParser::new().unwrap();
        let err = parser
            .parse("interface { broken", Path::new("bad.ts"), "bad")
            .unwrap_err();
        assert!(matches!(err, CompilerError::SyntaxError { .. }));
    }
}
