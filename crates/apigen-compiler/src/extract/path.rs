//! Route path templates.

/// Joins a controller prefix and a method suffix into a normalized template.
///
/// Leading/trailing and repeated slashes are collapsed; the result always
/// starts with `/` and never ends with one (except the root itself).
pub fn join_path(prefix: &str, suffix: &str) -> String {
    let segments: Vec<&str> = prefix
        .split('/')
        .chain(suffix.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

/// Placeholder names (`{id}`) in order of appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = after[..end].trim();
        if !name.is_empty() && !out.iter().any(|p: &String| p == name) {
            out.push(name.to_string());
        }
        rest = &after[end + 1..];
    }
    out
}

/// Template with placeholder names erased, so `/users/{id}` and
/// `/users/{userId}` compare equal.
pub fn route_shape(template: &str) -> String {
    let mut shape = String::with_capacity(template.len());
    let mut in_placeholder = false;
    for c in template.chars() {
        match c {
            '{' => {
                in_placeholder = true;
                shape.push_str("{}");
            }
            '}' => in_placeholder = false,
            _ if in_placeholder => {}
            _ => shape.push(c),
        }
    }
    shape
}
