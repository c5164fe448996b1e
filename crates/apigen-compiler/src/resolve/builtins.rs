//! Well-known built-in type names.

use crate::ir::PrimitiveKind;

/// How a built-in type name resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Primitive(PrimitiveKind),
    /// `Array<T>`, `ReadonlyArray<T>`
    Array,
    /// `Record<string, T>`
    Record,
    /// `Promise<T>` unwraps to `T`.
    Promise,
    /// Recognized, but with no schema representation.
    Unsupported,
}

/// Looks up an unqualified type name in the built-in table.
pub fn lookup(name: &str) -> Option<Builtin> {
    let builtin = match name {
        "Date" => Builtin::Primitive(PrimitiveKind::DateTime),
        "Buffer" | "Uint8Array" | "Readable" | "ReadableStream" | "Blob" => {
            Builtin::Primitive(PrimitiveKind::Buffer)
        }
        "String" => Builtin::Primitive(PrimitiveKind::String),
        "Number" => Builtin::Primitive(PrimitiveKind::Number),
        "Boolean" => Builtin::Primitive(PrimitiveKind::Boolean),
        "Object" => Builtin::Primitive(PrimitiveKind::Object),
        "Array" | "ReadonlyArray" => Builtin::Array,
        "Record" => Builtin::Record,
        "Promise" => Builtin::Promise,
        "Partial" | "Required" | "Readonly" | "Pick" | "Omit" | "Exclude" | "Extract"
        | "NonNullable" | "ReturnType" | "Parameters" | "InstanceType" | "Awaited" | "Map"
        | "Set" | "WeakMap" | "WeakSet" | "Function" | "Symbol" => Builtin::Unsupported,
        _ => return None,
    };
    Some(builtin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("Date"), Some(Builtin::Primitive(PrimitiveKind::DateTime)));
        assert_eq!(lookup("Buffer"), Some(Builtin::Primitive(PrimitiveKind::Buffer)));
        assert_eq!(lookup("ReadonlyArray"), Some(Builtin::Array));
        assert_eq!(lookup("Partial"), Some(Builtin::Unsupported));
        assert_eq!(lookup("User"), None);
    }
}
