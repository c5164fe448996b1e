//! Schema registry: canonical name to definition, write-once per name.

use indexmap::IndexMap;

use crate::decl::DeclRef;
use crate::diagnostic::CompilerError;
use crate::ir::{Definition, SchemaDefinitions, SchemaNode};

#[derive(Debug)]
enum Slot {
    /// Name reserved; the body is still being resolved.
    Pending,
    Defined(SchemaNode, Option<String>),
}

#[derive(Debug)]
struct Entry {
    owner: DeclRef,
    slot: Slot,
}

/// Outcome of [`SchemaRegistry::reserve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The name was free and is now pending; the caller must define it.
    Fresh,
    /// The same declaration reference already holds the name.
    Existing,
}

/// Insertion-ordered registry populated by a single resolver during one run.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entries: IndexMap<String, Entry>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `name` for `owner`.
    ///
    /// A second claim by the same reference is a no-op; a claim by a
    /// different reference is a name collision.
    pub fn reserve(&mut self, name: &str, owner: &DeclRef) -> Result<Reservation, CompilerError> {
        if let Some(entry) = self.entries.get(name) {
            if &entry.owner != owner {
                return Err(CompilerError::NameCollision {
                    name: name.to_string(),
                    first: entry.owner.to_string(),
                    second: owner.to_string(),
                });
            }
            return Ok(Reservation::Existing);
        }

        tracing::debug!(name, owner = %owner, "registering schema placeholder");
        self.entries.insert(
            name.to_string(),
            Entry {
                owner: owner.clone(),
                slot: Slot::Pending,
            },
        );
        Ok(Reservation::Fresh)
    }

    /// Fills a reserved name. Defined entries are never overwritten.
    pub fn define(&mut self, name: &str, schema: SchemaNode, description: Option<String>) {
        if let Some(entry) = self.entries.get_mut(name) {
            if matches!(entry.slot, Slot::Pending) {
                entry.slot = Slot::Defined(schema, description);
            }
        }
    }

    /// Reserves `name`, builds its body with `build` and returns a reference.
    ///
    /// `build` only runs for a fresh name, so nested requests for the same
    /// reference (cycles) observe the placeholder and return immediately.
    pub fn get_or_create<F>(&mut self, name: &str, owner: &DeclRef, build: F) -> Result<SchemaNode, CompilerError>
    where
        F: FnOnce(&mut Self) -> Result<(SchemaNode, Option<String>), CompilerError>,
    {
        if self.reserve(name, owner)? == Reservation::Fresh {
            let (schema, description) = build(self)?;
            self.define(name, schema, description);
        }
        Ok(SchemaNode::reference(name))
    }

    /// The schema registered under `name`, if it has been fully defined.
    pub fn defined(&self, name: &str) -> Option<&SchemaNode> {
        match self.entries.get(name).map(|e| &e.slot) {
            Some(Slot::Defined(schema, _)) => Some(schema),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fails if `node` mentions a name the registry does not hold.
    pub fn check_references(&self, node: &SchemaNode) -> Result<(), CompilerError> {
        for name in node.references() {
            if !self.entries.contains_key(name) {
                return Err(CompilerError::DanglingReference {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Freezes the registry into a read-only snapshot.
    pub fn freeze(self) -> Result<SchemaDefinitions, CompilerError> {
        for (name, entry) in &self.entries {
            match &entry.slot {
                Slot::Pending => {
                    return Err(CompilerError::DanglingReference { name: name.clone() });
                }
                Slot::Defined(schema, _) => self.check_references(schema)?,
            }
        }

        let entries = self
            .entries
            .into_iter()
            .filter_map(|(name, entry)| match entry.slot {
                Slot::Defined(schema, description) => Some((
                    name,
                    Definition {
                        schema,
                        description,
                        origin: entry.owner.to_string(),
                    },
                )),
                Slot::Pending => None,
            })
            .collect();
        Ok(SchemaDefinitions::from_entries(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::DeclId;
    use crate::ir::PrimitiveKind;

    fn owner(module: &str, name: &str) -> DeclRef {
        DeclRef {
            id: DeclId::new(module, name),
            args: Vec::new(),
        }
    }

    #[test]
    fn test_get_or_create_builds_once() {
        let mut registry = SchemaRegistry::new();
        let mut calls = 0;
        let user = owner("models", "User");

        for _ in 0..2 {
            let node = registry
                .get_or_create("User", &user, |_| {
                    calls += 1;
                    Ok((SchemaNode::primitive(PrimitiveKind::String), None))
                })
                .unwrap();
            assert_eq!(node, SchemaNode::reference("User"));
        }

        assert_eq!(calls, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_nested_request_sees_placeholder() {
        let mut registry = SchemaRegistry::new();
        let node = owner("models", "Node");

        registry
            .get_or_create("Node", &node, |reg| {
                let inner = reg.get_or_create("Node", &node, |_| unreachable!())?;
                assert!(reg.defined("Node").is_none());
                Ok((SchemaNode::array(inner), None))
            })
            .unwrap();

        assert_eq!(
            registry.defined("Node"),
            Some(&SchemaNode::array(SchemaNode::reference("Node")))
        );
    }

    #[test]
    fn test_collision_between_distinct_declarations() {
        let mut registry = SchemaRegistry::new();
        registry.reserve("User", &owner("a", "User")).unwrap();
        let err = registry.reserve("User", &owner("b", "User")).unwrap_err();
        assert!(matches!(err, CompilerError::NameCollision { .. }));
    }

    #[test]
    fn test_freeze_rejects_dangling_reference() {
        let mut registry = SchemaRegistry::new();
        registry
            .get_or_create("A", &owner("m", "A"), |_| Ok((SchemaNode::reference("Missing"), None)))
            .unwrap();
        let err = registry.freeze().unwrap_err();
        assert!(matches!(err, CompilerError::DanglingReference { ref name } if name == "Missing"));
    }

    #[test]
    fn test_freeze_keeps_insertion_order() {
        let mut registry = SchemaRegistry::new();
        for name in ["Zeta", "Alpha", "Mid"] {
            registry
                .get_or_create(name, &owner("m", name), |_| {
                    Ok((SchemaNode::primitive(PrimitiveKind::Any), Some(format!("{} doc", name))))
                })
                .unwrap();
        }

        let snapshot = registry.freeze().unwrap();
        assert_eq!(snapshot.names().collect::<Vec<_>>(), vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(snapshot.get("Mid").unwrap().description.as_deref(), Some("Mid doc"));
        assert_eq!(snapshot.get("Alpha").unwrap().origin, "m::Alpha");
    }
}
