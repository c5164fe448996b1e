//! Canonical definition names.
//!
//! Generic instantiations get a stable encoding of their type arguments so
//! `Paged<User>` and `Paged<Order>` register separately:
//!
//! ```text
//! Paged<User>            -> Paged_User_
//! Paged<User[]>          -> Paged_Array_User__
//! Pair<string, number>   -> Pair_string.number_
//! Paged<"a" | "b">       -> Paged_a-or-b_
//! ```

use crate::decl::{Literal, TypeExpr};

/// Canonical registry name for a declaration instantiated with `args`.
pub fn canonical_name(name: &str, args: &[TypeExpr]) -> String {
    if args.is_empty() {
        return name.to_string();
    }
    let encoded: Vec<String> = args.iter().map(encode).collect();
    format!("{}_{}_", name, encoded.join("."))
}

fn encode(expr: &TypeExpr) -> String {
    match expr {
        TypeExpr::Keyword(k) => k.as_str().to_string(),
        TypeExpr::Literal(Literal::String(s)) => sanitize(s),
        TypeExpr::Literal(Literal::Number(n)) => sanitize(&n.to_string()),
        TypeExpr::Literal(Literal::Boolean(b)) => b.to_string(),
        TypeExpr::Array(inner) => format!("Array_{}_", encode(inner)),
        TypeExpr::Union(members) => join(members, "-or-"),
        TypeExpr::Intersection(members) => join(members, "-and-"),
        TypeExpr::Object(shape) => {
            let props: Vec<String> = shape
                .properties
                .iter()
                .map(|p| format!("{}-{}", sanitize(&p.name), encode(&p.ty)))
                .collect();
            format!("_{}_", props.join("."))
        }
        TypeExpr::Ref(r) => canonical_name(&r.name, &r.args),
        TypeExpr::Param(name) => name.clone(),
        TypeExpr::Unsupported(_) => "unknown".to_string(),
    }
}

fn join(members: &[TypeExpr], sep: &str) -> String {
    members.iter().map(encode).collect::<Vec<_>>().join(sep)
}

fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}
