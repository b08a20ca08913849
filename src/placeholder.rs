//! Placeholder utilities.
//!
//! - Extract placeholder tokens from authoring text, used to infer the arguments
//!   of generated accessors.
//! - Undo platform escaping on import, the inverse of the default
//!   [`crate::sanitizer::Formatter`] rules.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref ANDROID_POSITIONAL: Regex = Regex::new(r"%\d+\$([sdf])").unwrap();
    static ref IOS_OBJECT: Regex = Regex::new(r"%(?:\d+\$)?@").unwrap();
    static ref ESCAPE: Regex = Regex::new(r#"\\(.)"#).unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderToken {
    pub index: Option<usize>,
    pub kind: char, // canonical kind: s, d, f, etc.
}

/// Swift type of an accessor argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentType {
    String,
    Int,
    Double,
}

impl ArgumentType {
    pub fn swift_name(&self) -> &'static str {
        match self {
            ArgumentType::String => "String",
            ArgumentType::Int => "Int",
            ArgumentType::Double => "Double",
        }
    }
}

impl PlaceholderToken {
    pub fn argument_type(&self) -> ArgumentType {
        match self.kind {
            'd' | 'i' | 'u' | 'x' | 'o' | 'c' => ArgumentType::Int,
            'f' | 'e' | 'g' | 'a' => ArgumentType::Double,
            _ => ArgumentType::String,
        }
    }
}

/// Extracts placeholder tokens from a string in occurrence order.
/// Handles positional and `l`/`ll` forms and ignores escaped percent `%%`.
pub fn extract_placeholders(input: &str) -> Vec<PlaceholderToken> {
    let bytes = input.as_bytes();
    let mut i = 0;
    let mut out = Vec::new();

    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }
        if i + 1 < bytes.len() && bytes[i + 1] == b'%' {
            i += 2;
            continue;
        }

        let mut j = i + 1;

        // Optional positional index: digits followed by '$'
        let mut index = None;
        let start_digits = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j < bytes.len() && j > start_digits && bytes[j] == b'$' {
            index = input[start_digits..j].parse::<usize>().ok();
            j += 1;
        } else {
            j = i + 1;
        }

        // Optional length modifiers (l/ll)
        if j < bytes.len() && bytes[j] == b'l' {
            j += 1;
            if j < bytes.len() && bytes[j] == b'l' {
                j += 1;
            }
        }

        if j < bytes.len() {
            let ch = bytes[j] as char;
            if ch.is_ascii_alphabetic() || ch == '@' {
                out.push(PlaceholderToken {
                    index,
                    kind: canonical_kind_char(ch),
                });
                i = j + 1;
                continue;
            }
        }

        i += 1;
    }

    out
}

/// Accessor argument types for `text`, ordered by position.
pub fn argument_types(text: &str) -> Vec<ArgumentType> {
    let mut tokens = extract_placeholders(text);
    if tokens.iter().all(|t| t.index.is_some()) {
        tokens.sort_by_key(|t| t.index);
        tokens.dedup_by_key(|t| t.index);
    }
    tokens.iter().map(PlaceholderToken::argument_type).collect()
}

fn canonical_kind_char(ch: char) -> char {
    match ch {
        '@' => 's',
        c => c.to_ascii_lowercase(),
    }
}

fn unescape_chars(text: &str, escapable: &[char]) -> String {
    ESCAPE
        .replace_all(text, |caps: &Captures| {
            let escaped = &caps[1];
            match escaped {
                "n" => "\n".to_string(),
                c if c.chars().all(|c| escapable.contains(&c)) => c.to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Android text back to authoring text: `%1$s` → `%s`, `\'` → `'`,
/// `\"` → `"`, `\n` → newline.
pub fn unescape_android(text: &str) -> String {
    let text = ANDROID_POSITIONAL.replace_all(text, "%$1");
    unescape_chars(&text, &['\'', '"', '\\', '@', '?'])
}

/// Apple text back to authoring text: `%@` and `%1$@` → `%s`, `\"` → `"`,
/// `\n` → newline.
pub fn unescape_ios(text: &str) -> String {
    let text = IOS_OBJECT.replace_all(text, "%s");
    unescape_chars(&text, &['"', '\\'])
}
