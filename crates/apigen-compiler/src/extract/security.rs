//! Security requirement collection.

use crate::config::SecurityCombination;
use crate::decl::{Annotation, AnnotationUse};
use crate::ir::SecurityRequirement;

/// Security declared directly on one controller or method.
///
/// Returns `None` when the construct says nothing about security, so the
/// caller can fall back to the enclosing level. `@NoSecurity` yields an
/// empty list.
pub fn declared(annotations: &[AnnotationUse], combination: SecurityCombination) -> Option<Vec<SecurityRequirement>> {
    let mut seen = false;
    let mut alternatives: Vec<SecurityRequirement> = Vec::new();

    for use_ in annotations {
        match &use_.annotation {
            Annotation::NoSecurity => return Some(Vec::new()),
            Annotation::Security(schemes) => {
                seen = true;
                let mut requirement = SecurityRequirement::default();
                for (scheme, scopes) in schemes {
                    requirement.merge(&SecurityRequirement::single(scheme.clone(), scopes.clone()));
                }
                alternatives.push(requirement);
            }
            _ => {}
        }
    }

    if !seen {
        return None;
    }

    Some(match combination {
        SecurityCombination::AnyOf => alternatives,
        SecurityCombination::AllOf => {
            let mut merged = SecurityRequirement::default();
            for requirement in &alternatives {
                merged.merge(requirement);
            }
            vec![merged]
        }
    })
}
