use std::{
    fs::File,
    io::{BufRead, Read, Write},
    path::Path,
};

use indoc::indoc;
use lazy_static::lazy_static;
use regex::Regex;

use crate::{error::Error, traits::Parser};

lazy_static! {
    static ref ENTRY_REGEX: Regex = Regex::new(
        r#"(?s)/\*(.*?)\*/|//([^\n]*)|"((?:[^"\\]|\\.)*)"\s*=\s*"((?:[^"\\]|\\.)*)"\s*;"#
    )
    .unwrap();
}

const HEADER: &str = indoc! {"
    /*
     * Generated by locforge.
     * Do not edit it manually, your changes will be overwritten on the next export.
     */

"};

/// Apple's `.strings` format: `"key" = "value";` lines with C-style comments.
///
/// Values are kept exactly as they appear between the quotes, except that
/// `\"` is read back as `"`. On write, unescaped quotes are escaped.
/// Text outside comments and entries makes the whole file invalid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Comment(String),
    Pair { key: String, value: String },
}

impl Format {
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().filter_map(|item| match item {
            Item::Pair { key, value } => Some((key.as_str(), value.as_str())),
            Item::Comment(_) => None,
        })
    }
}

impl Parser for Format {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let content = content.trim_start_matches('\u{feff}');

        let mut items = Vec::new();
        let mut consumed = 0;
        for caps in ENTRY_REGEX.captures_iter(content) {
            let Some(entry) = caps.get(0) else { continue };
            ensure_blank(content, consumed, entry.start())?;
            consumed = entry.end();

            if let Some(comment) = caps.get(1).or_else(|| caps.get(2)) {
                let comment = comment.as_str().trim();
                if !comment.is_empty() {
                    items.push(Item::Comment(comment.to_string()));
                }
            } else if let (Some(key), Some(value)) = (caps.get(3), caps.get(4)) {
                items.push(Item::Pair {
                    key: unescape_quotes(key.as_str()),
                    value: unescape_quotes(value.as_str()),
                });
            }
        }
        ensure_blank(content, consumed, content.len())?;

        Ok(Format { items })
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut content = String::from(HEADER);

        for item in &self.items {
            match item {
                Item::Comment(comment) => {
                    if !content.ends_with(HEADER) {
                        content.push('\n');
                    }
                    content.push_str(&format!("/* {} */\n", comment.replace("*/", "* /")));
                }
                Item::Pair { key, value } => {
                    content.push_str(&format!(
                        "\"{}\" = \"{}\";\n",
                        escape_quotes(key),
                        escape_quotes(value)
                    ));
                }
            }
        }

        writer.write_all(content.as_bytes()).map_err(Error::Io)
    }

    /// Override default file reading to support BOM-aware decoding (e.g., UTF-16 Apple .strings)
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let file = File::open(path).map_err(Error::Io)?;
        let mut decoder = encoding_rs_io::DecodeReaderBytesBuilder::new()
            .bom_override(true)
            .build(file);

        let mut decoded = String::new();
        decoder.read_to_string(&mut decoded).map_err(Error::Io)?;

        Self::from_str(&decoded)
    }
}

/// Fails on anything but whitespace between two entries.
fn ensure_blank(content: &str, start: usize, end: usize) -> Result<(), Error> {
    let gap = &content[start..end];
    let Some(offset) = gap.find(|c: char| !c.is_whitespace()) else {
        return Ok(());
    };
    let line = content[..start + offset].matches('\n').count() + 1;
    let text: String = gap[offset..]
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(40)
        .collect();
    Err(Error::InvalidResource(format!(
        "unexpected text at line {}: `{}`",
        line, text
    )))
}

/// Escapes every `"` not already preceded by an odd run of backslashes.
fn escape_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut backslashes = 0usize;
    for c in text.chars() {
        if c == '"' && backslashes % 2 == 0 {
            out.push('\\');
        }
        backslashes = if c == '\\' { backslashes + 1 } else { 0 };
        out.push(c);
    }
    out
}

fn unescape_quotes(text: &str) -> String {
    text.replace("\\\"", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs_and_comments() {
        let content = r#"
/* Home */
"greeting" = "Hello %@";
// inline note
"quote" = "Say \"hi\"";
"multi"
    =
    "a\nb";
"#;
        let format = Format::from_str(content).unwrap();
        assert_eq!(
            format.items,
            vec![
                Item::Comment("Home".to_string()),
                Item::Pair {
                    key: "greeting".to_string(),
                    value: "Hello %@".to_string()
                },
                Item::Comment("inline note".to_string()),
                Item::Pair {
                    key: "quote".to_string(),
                    value: "Say \"hi\"".to_string()
                },
                Item::Pair {
                    key: "multi".to_string(),
                    value: "a\\nb".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_value_containing_comment_markers() {
        let content = r#""url" = "https://example.com/*path*/";"#;
        let format = Format::from_str(content).unwrap();
        assert_eq!(
            format.pairs().collect::<Vec<_>>(),
            vec![("url", "https://example.com/*path*/")]
        );
    }

    #[test]
    fn test_malformed_entries_are_errors() {
        let content = "\"ok\" = \"fine\";\n\"broken = \"oops\n garbage {{{";
        let err = Format::from_str(content).unwrap_err();
        assert!(matches!(err, Error::InvalidResource(_)));
        assert!(err.to_string().contains("line 2"), "{}", err);

        // an unescaped trailing backslash swallows the closing quote
        let content = "\"aPath\" = \"C:\\\";\n\"bTitle\" = \"Title\";\n";
        assert!(Format::from_str(content).is_err());

        assert!(Format::from_str("\"a\" = \"b\"\n").is_err());
    }

    #[test]
    fn test_escaped_backslashes_parse() {
        let content = r#""aPath" = "C:\\";
"bMixed" = "a\\b \"q\"";
"#;
        let format = Format::from_str(content).unwrap();
        assert_eq!(
            format.pairs().collect::<Vec<_>>(),
            vec![("aPath", r"C:\\"), ("bMixed", r#"a\\b "q""#)]
        );
    }

    #[test]
    fn test_write_escapes_quotes_once() {
        let format = Format {
            items: vec![
                Item::Comment("Home".to_string()),
                Item::Pair {
                    key: "greeting".to_string(),
                    value: "Hello %@".to_string(),
                },
                Item::Pair {
                    key: "quote".to_string(),
                    value: "Say \"hi\" and \\\"bye\\\"".to_string(),
                },
            ],
        };
        let out = format.to_string_lossy().unwrap();
        assert!(out.starts_with("/*\n * Generated by locforge."));
        assert!(out.contains("/* Home */\n\"greeting\" = \"Hello %@\";\n"));
        assert!(out.contains(r#""quote" = "Say \"hi\" and \"bye\"";"#));
    }

    #[test]
    fn test_read_utf16_file_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Localizable.strings");
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "\"k\" = \"välue\";\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        std::fs::write(&path, bytes).unwrap();

        let format = Format::read_from(&path).unwrap();
        assert_eq!(format.pairs().collect::<Vec<_>>(), vec![("k", "välue")]);
    }
}
