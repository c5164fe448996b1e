//! The declaration source interface and its in-memory implementation.

use indexmap::IndexMap;

use super::{ControllerDecl, DeclId, Declaration};
use crate::diagnostic::CompilerError;

/// Narrow, deterministic access to an already-loaded declaration graph.
///
/// The resolver and extractor depend only on this trait, so any frontend
/// (a live parser, a serialized AST, hand-built fixtures) can feed them.
pub trait DeclarationSource {
    /// Annotated controller declarations, in discovery order.
    fn controllers(&self) -> &[ControllerDecl];

    /// Looks up a declaration by identity.
    fn declaration(&self, id: &DeclId) -> Option<&Declaration>;

    /// All declarations with the given unqualified name, in discovery order.
    fn find_by_name(&self, name: &str) -> Vec<&Declaration>;
}

/// Declarations and controllers held in memory, keyed by identity.
#[derive(Debug, Default)]
pub struct DeclarationGraph {
    declarations: IndexMap<DeclId, Declaration>,
    controllers: Vec<ControllerDecl>,
}

impl DeclarationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declaration. A module cannot declare the same name twice.
    pub fn add_declaration(&mut self, declaration: Declaration) -> Result<(), CompilerError> {
        if let Some(existing) = self.declarations.get(&declaration.id) {
            return Err(CompilerError::NameCollision {
                name: declaration.id.to_string(),
                first: existing.span.to_string(),
                second: declaration.span.to_string(),
            });
        }
        self.declarations.insert(declaration.id.clone(), declaration);
        Ok(())
    }

    /// Builder-style variant of [`add_declaration`](Self::add_declaration) for fixtures.
    pub fn with_declaration(mut self, declaration: Declaration) -> Result<Self, CompilerError> {
        self.add_declaration(declaration)?;
        Ok(self)
    }

    pub fn add_controller(&mut self, controller: ControllerDecl) {
        self.controllers.push(controller);
    }

    pub fn with_controller(mut self, controller: ControllerDecl) -> Self {
        self.add_controller(controller);
        self
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty() && self.controllers.is_empty()
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.values()
    }
}

impl DeclarationSource for DeclarationGraph {
    fn controllers(&self) -> &[ControllerDecl] {
        &self.controllers
    }

    fn declaration(&self, id: &DeclId) -> Option<&Declaration> {
        self.declarations.get(id)
    }

    fn find_by_name(&self, name: &str) -> Vec<&Declaration> {
        self.declarations
            .values()
            .filter(|d| d.id.name == name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{Keyword, PropertyDecl, TypeExpr};

    fn user(module: &str) -> Declaration {
        Declaration::interface(
            DeclId::new(module, "User"),
            vec![PropertyDecl::new("id", TypeExpr::keyword(Keyword::Number))],
        )
    }

    #[test]
    fn test_lookup_by_identity_and_name() {
        let graph = DeclarationGraph::new()
            .with_declaration(user("a"))
            .unwrap()
            .with_declaration(user("b"))
            .unwrap();

        assert!(graph.declaration(&DeclId::new("a", "User")).is_some());
        assert!(graph.declaration(&DeclId::new("c", "User")).is_none());
        assert_eq!(graph.find_by_name("User").len(), 2);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_same_module_duplicate_rejected() {
        let result = DeclarationGraph::new()
            .with_declaration(user("a"))
            .unwrap()
            .with_declaration(user("a"));

        assert!(matches!(result, Err(CompilerError::NameCollision { .. })));
    }
}
