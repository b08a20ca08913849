//! Id re-casing and reserved keyword escaping for the export targets.
//!
//! Android resource names are snake_case and must not collide with Java keywords
//! (they become `R.string.<name>` fields). Apple keys are lowerCamelCase; the
//! generated Swift accessors escape keywords with backticks.

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface",
    "long", "native", "new", "null", "package", "private", "protected", "public", "return",
    "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "true", "try", "void", "volatile", "while",
];

const SWIFT_KEYWORDS: &[&str] = &[
    "as", "associatedtype", "break", "case", "catch", "class", "continue", "default", "defer",
    "deinit", "do", "else", "enum", "extension", "fallthrough", "false", "fileprivate", "for",
    "func", "guard", "if", "import", "in", "init", "inout", "internal", "is", "let", "nil",
    "open", "operator", "private", "protocol", "public", "repeat", "rethrows", "return", "self",
    "Self", "static", "struct", "subscript", "super", "switch", "throw", "throws", "true", "try",
    "typealias", "var", "where", "while",
];

/// Splits an id into lowercase words at underscores and case boundaries.
fn words(id: &str) -> Vec<String> {
    let chars: Vec<char> = id.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // "fooBar" and the "S" of "HTTPServer" start a new word
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

pub fn to_snake_case(id: &str) -> String {
    words(id).join("_")
}

pub fn to_lower_camel_case(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for (i, word) in words(id).into_iter().enumerate() {
        if i == 0 {
            out.push_str(&word);
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Resource name written to Android XML.
pub fn android_name(id: &str) -> String {
    let name = to_snake_case(id);
    if JAVA_KEYWORDS.contains(&name.as_str()) {
        format!("{}_", name)
    } else {
        name
    }
}

/// Inverse of [`android_name`]: back to the internal lowerCamelCase id.
pub fn id_from_android_name(name: &str) -> String {
    let name = match name.strip_suffix('_') {
        Some(stripped) if JAVA_KEYWORDS.contains(&stripped) => stripped,
        _ => name,
    };
    to_lower_camel_case(name)
}

/// Key written to Apple `.strings`, `.stringsdict` and array property lists.
pub fn apple_key(id: &str) -> String {
    to_lower_camel_case(id)
}

/// Identifier usable as a Swift member name.
pub fn swift_identifier(id: &str) -> String {
    let name = to_lower_camel_case(id);
    if SWIFT_KEYWORDS.contains(&name.as_str()) {
        format!("`{}`", name)
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("greeting"), "greeting");
        assert_eq!(to_snake_case("welcomeMessage"), "welcome_message");
        assert_eq!(to_snake_case("welcome_message"), "welcome_message");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("item2Count"), "item2_count");
    }

    #[test]
    fn test_lower_camel_case() {
        assert_eq!(to_lower_camel_case("welcome_message"), "welcomeMessage");
        assert_eq!(to_lower_camel_case("welcomeMessage"), "welcomeMessage");
        assert_eq!(to_lower_camel_case("Title"), "title");
        assert_eq!(to_lower_camel_case("HTTPServer"), "httpServer");
    }

    #[test]
    fn test_android_keyword_escaping_round_trips() {
        assert_eq!(android_name("default"), "default_");
        assert_eq!(id_from_android_name("default_"), "default");
        assert_eq!(android_name("newItem"), "new_item");
        assert_eq!(id_from_android_name("new_item"), "newItem");
        assert_eq!(id_from_android_name("plain_"), "plain");
    }

    #[test]
    fn test_swift_identifier_escaping() {
        assert_eq!(swift_identifier("default"), "`default`");
        assert_eq!(swift_identifier("class_name"), "className");
        assert_eq!(apple_key("welcome_message"), "welcomeMessage");
    }
}
