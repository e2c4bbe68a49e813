//! Utility functions for working with identifiers.

use heck::{ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};

/// Converts a `camelCase` or `SCREAMING_SNAKE_CASE` identifier to a
/// `lower_snake` case Rust field identifier.
pub fn to_snake(s: &str) -> String {
    let ident = s.to_snake_case();

    // Uses a raw identifier if the identifier matches a Rust keyword
    // (https://doc.rust-lang.org/reference/keywords.html).
    match ident.as_str() {
        "as" | "async" | "await" | "break" | "const" | "continue" | "dyn" | "else" | "enum"
        | "extern" | "false" | "fn" | "for" | "if" | "impl" | "in" | "let" | "loop" | "match"
        | "mod" | "move" | "mut" | "pub" | "ref" | "return" | "static" | "struct" | "trait"
        | "true" | "type" | "unsafe" | "use" | "where" | "while" | "abstract" | "become"
        | "box" | "do" | "final" | "macro" | "override" | "priv" | "typeof" | "unsized"
        | "virtual" | "yield" | "try" => format!("r#{}", ident),
        // These can't be raw identifiers; tack on an underscore instead.
        "self" | "super" | "crate" => format!("{}_", ident),
        _ => ident,
    }
}

/// Converts a `snake_case` identifier to an `UpperCamel` case Rust type
/// identifier.
pub fn to_upper_camel(s: &str) -> String {
    let ident = s.to_upper_camel_case();

    // `Self` can't be raw, so disambiguate with a trailing underscore.
    if ident == "Self" {
        format!("{}_", ident)
    } else {
        ident
    }
}

/// Converts a `snake_case` proto field name to the `lowerCamel` JSON name the
/// protocol compiler would derive for it.
pub fn to_lower_camel(s: &str) -> String {
    s.to_lower_camel_case()
}

/// Strips an enum's name from the prefix of one of its variant names.
///
/// The protoc convention prefixes every enumerator with the enum name;
/// generated Rust variants drop it. The prefix is only stripped when the
/// remainder starts a new word, so `Kind`/`KindOther` becomes `Other` but
/// `Kind`/`Kinder` stays `Kinder`.
pub fn strip_enum_prefix(prefix: &str, name: &str) -> String {
    match name.strip_prefix(prefix) {
        Some(stripped) if stripped.chars().next().is_some_and(char::is_uppercase) => {
            stripped.to_owned()
        }
        _ => name.to_owned(),
    }
}

/// Parses a generated identifier, raw form included, into a [`syn::Ident`].
pub fn to_syn_ident(s: &str) -> syn::Ident {
    syn::parse_str(s).unwrap_or_else(|_| panic!("unable to parse identifier {:?}", s))
}

/// Parses a generated type expression into a [`syn::Type`].
pub fn to_syn_type(s: &str) -> syn::Type {
    syn::parse_str(s).unwrap_or_else(|_| panic!("unable to parse type {:?}", s))
}
