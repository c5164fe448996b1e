//! Converts parsed TypeScript files into the declaration graph.
//!
//! Two things happen here that need every file at once: names used in type
//! expressions are bound to the module that declares them, and decorators
//! are checked and turned into annotation records.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use super::ast::*;
use crate::decl::{
    Annotation, AnnotationUse, ControllerDecl, DeclId, DeclKind, Declaration, DeclarationGraph, HttpVerb,
    MethodDecl, ObjectShape, ParameterDecl, ResponseStatus, TypeExpr, TypeRef,
};
use crate::diagnostic::CompilerError;

/// Builds the declaration graph from parsed files.
pub fn build_graph(files: &[ParsedFile]) -> Result<DeclarationGraph, CompilerError> {
    let modules: HashSet<&str> = files.iter().map(|f| f.module.as_str()).collect();
    let mut graph = DeclarationGraph::new();

    for file in files {
        let scope = FileScope::new(file, &modules);
        for misplaced in &file.misplaced {
            scope.reject_misplaced(misplaced)?;
        }
        for declaration in &file.declarations {
            graph.add_declaration(scope.declaration(declaration))?;
        }
        for controller in &file.controllers {
            graph.add_controller(scope.controller(controller)?);
        }
    }

    tracing::debug!(
        files = files.len(),
        declarations = graph.len(),
        "built declaration graph"
    );
    Ok(graph)
}

/// Name bindings visible inside one file.
struct FileScope<'a> {
    file: &'a ParsedFile,
    /// Local name -> (module, exported name).
    imports: HashMap<String, (String, String)>,
}

impl<'a> FileScope<'a> {
    fn new(file: &'a ParsedFile, modules: &HashSet<&str>) -> Self {
        let mut imports = HashMap::new();
        for import in &file.imports {
            let Some(target) = resolve_import(&file.module, &import.source, modules) else {
                continue;
            };
            for spec in &import.specifiers {
                imports.insert(spec.local_name().to_string(), (target.clone(), spec.name.clone()));
            }
        }
        Self { file, imports }
    }

    /// Local declarations shadow imports. Unbound names are left for the
    /// resolver's built-in and global lookup.
    fn lookup(&self, name: &str) -> Option<(String, String)> {
        if self.file.declares(name) {
            return Some((self.file.module.clone(), name.to_string()));
        }
        self.imports.get(name).cloned()
    }

    fn bind(&self, expr: &mut TypeExpr) {
        match expr {
            TypeExpr::Ref(r) => self.bind_ref(r),
            TypeExpr::Array(inner) => self.bind(inner),
            TypeExpr::Union(members) | TypeExpr::Intersection(members) => {
                members.iter_mut().for_each(|m| self.bind(m))
            }
            TypeExpr::Object(shape) => self.bind_shape(shape),
            TypeExpr::Keyword(_) | TypeExpr::Literal(_) | TypeExpr::Param(_) | TypeExpr::Unsupported(_) => {}
        }
    }

    fn bind_ref(&self, r: &mut TypeRef) {
        if r.module.is_none() {
            if let Some((module, name)) = self.lookup(&r.name) {
                r.module = Some(module);
                r.name = name;
            }
        }
        r.args.iter_mut().for_each(|a| self.bind(a));
    }

    fn bind_shape(&self, shape: &mut ObjectShape) {
        for prop in &mut shape.properties {
            self.bind(&mut prop.ty);
        }
        for index in &mut shape.index {
            self.bind(&mut index.key);
            self.bind(&mut index.value);
        }
    }

    fn bound(&self, expr: &TypeExpr) -> TypeExpr {
        let mut expr = expr.clone();
        self.bind(&mut expr);
        expr
    }

    fn declaration(&self, declaration: &Declaration) -> Declaration {
        let mut declaration = declaration.clone();
        match &mut declaration.kind {
            DeclKind::Object { bases, shape, .. } => {
                bases.iter_mut().for_each(|b| self.bind_ref(b));
                self.bind_shape(shape);
            }
            DeclKind::Alias(target) => self.bind(target),
            DeclKind::Enum(_) => {}
        }
        for param in &mut declaration.type_params {
            if let Some(default) = &mut param.default {
                self.bind(default);
            }
        }
        declaration
    }

    fn controller(&self, syntax: &ControllerSyntax) -> Result<ControllerDecl, CompilerError> {
        let mut controller = ControllerDecl::new(DeclId::new(&self.file.module, &syntax.name));
        controller.annotations = self.annotations(&syntax.decorators)?;
        controller.description = syntax.doc.as_ref().and_then(|d| d.description.clone());
        controller.span = syntax.span.clone();

        for method in &syntax.methods {
            controller.methods.push(self.method(method)?);
        }
        Ok(controller)
    }

    fn method(&self, syntax: &MethodSyntax) -> Result<MethodDecl, CompilerError> {
        let doc = syntax.doc.clone().unwrap_or_default();

        let mut annotations = self.annotations(&syntax.decorators)?;
        let flagged = annotations.iter().any(|a| a.annotation == Annotation::Deprecated);
        if !annotations.is_empty() && !flagged && doc.has_tag("deprecated") {
            annotations.push(AnnotationUse {
                annotation: Annotation::Deprecated,
                span: syntax.span.clone(),
            });
        }

        let mut parameters = Vec::with_capacity(syntax.parameters.len());
        for param in &syntax.parameters {
            parameters.push(ParameterDecl {
                name: param.name.clone(),
                ty: param.ty.as_ref().map(|t| self.bound(t)),
                optional: param.optional,
                default: param.default.clone(),
                annotations: self.annotations(&param.decorators)?,
                description: doc.param_description(&param.name),
                format: doc.param_format(&param.name),
                span: param.span.clone(),
            });
        }

        Ok(MethodDecl {
            name: syntax.name.clone(),
            annotations,
            parameters,
            return_type: syntax.return_type.as_ref().map(|t| self.bound(t)),
            description: doc.description.clone(),
            span: syntax.span.clone(),
        })
    }

    /// Decorators on a member that is not an operation. Each one must still
    /// name a known annotation; the first is then reported as misplaced.
    fn reject_misplaced(&self, misplaced: &MisplacedDecorators) -> Result<(), CompilerError> {
        let annotations = self.annotations(&misplaced.decorators)?;
        match annotations.first() {
            Some(first) => Err(CompilerError::MisplacedAnnotation {
                name: first.annotation.name().to_string(),
                target: misplaced.target.to_string(),
                location: first.span.clone(),
            }),
            None => Ok(()),
        }
    }

    fn annotations(&self, decorators: &[DecoratorSyntax]) -> Result<Vec<AnnotationUse>, CompilerError> {
        decorators.iter().map(|d| self.annotation(d)).collect()
    }

    /// Maps a decorator onto the annotation model. Unknown names are fatal.
    fn annotation(&self, decorator: &DecoratorSyntax) -> Result<AnnotationUse, CompilerError> {
        let args = Args { decorator };

        let annotation = if let Some(verb) = HttpVerb::from_decorator(&decorator.name) {
            args.at_most(1)?;
            Annotation::Verb {
                verb,
                path: args.optional_string(0)?.unwrap_or_default(),
            }
        } else {
            match decorator.name.as_str() {
                "Route" => {
                    args.at_most(1)?;
                    Annotation::Route(args.optional_string(0)?.unwrap_or_default())
                }
                "Path" => Annotation::Path(args.wire_name()?),
                "Query" => Annotation::Query(args.wire_name()?),
                "Header" => Annotation::Header(args.wire_name()?),
                "BodyProp" => Annotation::BodyProp(args.wire_name()?),
                "Body" => args.none(Annotation::Body)?,
                "Request" => args.none(Annotation::Request)?,
                "Inject" => args.none(Annotation::Inject)?,
                "NoSecurity" => args.none(Annotation::NoSecurity)?,
                "Hidden" => args.none(Annotation::Hidden)?,
                "Deprecated" => args.none(Annotation::Deprecated)?,
                "Security" => Annotation::Security(args.security()?),
                "Response" => {
                    args.at_most(3)?;
                    Annotation::Response {
                        status: args.status(0)?,
                        description: args.optional_string(1)?,
                        schema: decorator.type_args.first().map(|t| self.bound(t)),
                    }
                }
                "SuccessResponse" => {
                    args.at_most(3)?;
                    let status = match args.status(0)? {
                        ResponseStatus::Code(code) => code,
                        ResponseStatus::Default => return Err(args.invalid("success status must be a numeric code")),
                    };
                    Annotation::SuccessResponse {
                        status,
                        description: args.optional_string(1)?,
                    }
                }
                "Tags" => Annotation::Tags(args.strings()?),
                "OperationId" => {
                    args.at_most(1)?;
                    Annotation::OperationId(args.optional_string(0)?.ok_or_else(|| args.invalid("missing operation id"))?)
                }
                _ => {
                    return Err(CompilerError::UnrecognizedAnnotation {
                        name: decorator.name.clone(),
                        location: decorator.span.clone(),
                    })
                }
            }
        };

        Ok(AnnotationUse {
            annotation,
            span: decorator.span.clone(),
        })
    }
}

/// Argument checks for one decorator.
struct Args<'d> {
    decorator: &'d DecoratorSyntax,
}

impl Args<'_> {
    fn invalid(&self, message: impl Into<String>) -> CompilerError {
        CompilerError::InvalidAnnotation {
            name: self.decorator.name.clone(),
            message: message.into(),
            location: self.decorator.span.clone(),
        }
    }

    fn at_most(&self, count: usize) -> Result<(), CompilerError> {
        if self.decorator.args.len() > count {
            return Err(self.invalid(format!(
                "expected at most {} argument(s), found {}",
                count,
                self.decorator.args.len()
            )));
        }
        Ok(())
    }

    fn none(&self, annotation: Annotation) -> Result<Annotation, CompilerError> {
        self.at_most(0)?;
        Ok(annotation)
    }

    fn literal(&self, index: usize) -> Result<Option<&Value>, CompilerError> {
        match self.decorator.args.get(index) {
            None => Ok(None),
            Some(ArgSyntax::Literal(value)) => Ok(Some(value)),
            Some(ArgSyntax::Expression(text)) => Err(self.invalid(format!(
                "argument {} must be a literal, found '{}'",
                index + 1,
                text
            ))),
        }
    }

    fn optional_string(&self, index: usize) -> Result<Option<String>, CompilerError> {
        match self.literal(index)? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.invalid(format!("argument {} must be a string, found {}", index + 1, other))),
        }
    }

    /// Optional wire-name override of a binding decorator.
    fn wire_name(&self) -> Result<Option<String>, CompilerError> {
        self.at_most(1)?;
        self.optional_string(0)
    }

    fn strings(&self) -> Result<Vec<String>, CompilerError> {
        (0..self.decorator.args.len())
            .map(|i| self.optional_string(i).map(|s| s.unwrap_or_default()))
            .collect()
    }

    fn string_list(&self, value: &Value) -> Result<Vec<String>, CompilerError> {
        let Value::Array(items) = value else {
            return Err(self.invalid(format!("expected a list of scopes, found {}", value)));
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(self.invalid(format!("scope must be a string, found {}", other))),
            })
            .collect()
    }

    /// `"404"`, `404` or `"default"`.
    fn status(&self, index: usize) -> Result<ResponseStatus, CompilerError> {
        match self.literal(index)? {
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| u16::try_from(n).ok())
                .map(ResponseStatus::Code)
                .ok_or_else(|| self.invalid(format!("invalid status code {}", n))),
            Some(Value::String(s)) if s == "default" => Ok(ResponseStatus::Default),
            Some(Value::String(s)) => s
                .parse::<u16>()
                .map(ResponseStatus::Code)
                .map_err(|_| self.invalid(format!("invalid status code '{}'", s))),
            Some(other) => Err(self.invalid(format!("invalid status code {}", other))),
            None => Err(self.invalid("missing status code")),
        }
    }

    /// `@Security("name", ["scope"])` is one scheme; the object form
    /// `@Security({ a: [], b: ["x"] })` requires every listed scheme.
    fn security(&self) -> Result<Vec<(String, Vec<String>)>, CompilerError> {
        self.at_most(2)?;
        match self.literal(0)? {
            Some(Value::String(name)) => {
                let scopes = match self.literal(1)? {
                    Some(scopes) => self.string_list(scopes)?,
                    None => Vec::new(),
                };
                Ok(vec![(name.clone(), scopes)])
            }
            Some(Value::Object(schemes)) if self.decorator.args.len() == 1 && !schemes.is_empty() => schemes
                .iter()
                .map(|(name, scopes)| Ok((name.clone(), self.string_list(scopes)?)))
                .collect(),
            Some(other) => Err(self.invalid(format!("expected a scheme name or scheme map, found {}", other))),
            None => Err(self.invalid("missing security scheme")),
        }
    }
}

/// Maps a relative import onto a known module id (`./user`, `../models`,
/// `./models/index`). Package imports are not bound.
fn resolve_import(from: &str, source: &str, modules: &HashSet<&str>) -> Option<String> {
    if !source.starts_with('.') {
        return None;
    }

    let mut parts: Vec<&str> = from.split('/').collect();
    parts.pop();
    for segment in source.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    let candidate = [".ts", ".js"]
        .iter()
        .find_map(|ext| joined.strip_suffix(ext))
        .unwrap_or(&joined);

    if modules.contains(candidate) {
        return Some(candidate.to_string());
    }
    let index = format!("{}/index", candidate);
    modules.contains(index.as_str()).then_some(index)
}
