//! Apple `.stringsdict` plural documents.
//!
//! Each plural is one `NSStringLocalizedFormatKey` entry whose single
//! `%#@value@` variable carries the quantity forms.

use std::{
    io::{BufRead, Write},
    str::FromStr,
};

use log::warn;

use crate::{
    error::Error,
    formats::plist::{self, PlistWriter, Value},
    traits::Parser,
    types::Quantity,
};

const FORMAT_KEY: &str = "NSStringLocalizedFormatKey";
const SPEC_TYPE_KEY: &str = "NSStringFormatSpecTypeKey";
const VALUE_TYPE_KEY: &str = "NSStringFormatValueTypeKey";
const PLURAL_RULE_TYPE: &str = "NSStringPluralRuleType";
const VARIABLE: &str = "value";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Written as an XML comment; not read back.
    Comment(String),
    Plural {
        key: String,
        items: Vec<(Quantity, String)>,
    },
}

impl Format {
    pub fn plurals(&self) -> impl Iterator<Item = (&str, &[(Quantity, String)])> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Plural { key, items } => Some((key.as_str(), items.as_slice())),
            Node::Comment(_) => None,
        })
    }
}

impl Parser for Format {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let root = plist::read_document(reader)?;
        let entries = root.as_dict().ok_or_else(|| {
            Error::InvalidResource("stringsdict root must be a dict".to_string())
        })?;

        let mut nodes = Vec::new();
        for (key, entry) in entries {
            let Some(variable) = plural_variable(entry) else {
                warn!("skipping stringsdict entry `{}` without a plural rule", key);
                continue;
            };
            let mut items = Vec::new();
            for (name, value) in variable.iter() {
                let (Ok(quantity), Some(text)) = (Quantity::from_str(name), value.as_str()) else {
                    continue;
                };
                items.push((quantity, text.to_string()));
            }
            nodes.push(Node::Plural {
                key: key.clone(),
                items,
            });
        }
        Ok(Format { nodes })
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut plist = PlistWriter::new(&mut writer);
        plist.write_header()?;
        plist.start_dict()?;
        for node in &self.nodes {
            match node {
                Node::Comment(text) => plist.write_comment(text)?,
                Node::Plural { key, items } => {
                    plist.write_key(key)?;
                    plist.write_value(&plural_entry(items))?;
                }
            }
        }
        plist.end_dict()?;
        plist.write_footer()?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// The inner dict of an entry that declares a plural rule.
fn plural_variable(entry: &Value) -> Option<&[(String, Value)]> {
    entry
        .as_dict()?
        .iter()
        .filter_map(|(_, value)| value.as_dict())
        .find(|dict| {
            dict.iter()
                .any(|(k, v)| k == SPEC_TYPE_KEY && v.as_str() == Some(PLURAL_RULE_TYPE))
        })
}

fn plural_entry(items: &[(Quantity, String)]) -> Value {
    let mut variable = vec![
        (
            SPEC_TYPE_KEY.to_string(),
            Value::String(PLURAL_RULE_TYPE.to_string()),
        ),
        (VALUE_TYPE_KEY.to_string(), Value::String("d".to_string())),
    ];
    variable.extend(
        items
            .iter()
            .map(|(quantity, text)| (quantity.label().to_string(), Value::String(text.clone()))),
    );
    Value::Dict(vec![
        (
            FORMAT_KEY.to_string(),
            Value::String(format!("%#@{}@", VARIABLE)),
        ),
        (VARIABLE.to_string(), Value::Dict(variable)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read_plurals() {
        let format = Format {
            nodes: vec![
                Node::Comment("Shop".to_string()),
                Node::Plural {
                    key: "apples".to_string(),
                    items: vec![
                        (Quantity::One, "One apple".to_string()),
                        (Quantity::Other, "%d apples & more".to_string()),
                    ],
                },
            ],
        };
        let out = format.to_string_lossy().unwrap();
        assert!(out.contains("<!-- Shop -->"));
        assert!(out.contains("<string>%#@value@</string>"));
        assert!(out.contains("<string>NSStringPluralRuleType</string>"));
        assert!(out.contains("%d apples &amp; more"));

        let read = Format::from_str(&out).unwrap();
        assert_eq!(
            read.plurals().collect::<Vec<_>>(),
            vec![(
                "apples",
                &[
                    (Quantity::One, "One apple".to_string()),
                    (Quantity::Other, "%d apples & more".to_string()),
                ][..]
            )]
        );
    }

    #[test]
    fn test_read_hand_written_file() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
    <key>days</key>
    <dict>
        <key>NSStringLocalizedFormatKey</key>
        <string>%#@d@</string>
        <key>d</key>
        <dict>
            <key>NSStringFormatSpecTypeKey</key>
            <string>NSStringPluralRuleType</string>
            <key>NSStringFormatValueTypeKey</key>
            <string>d</string>
            <key>few</key>
            <string>%d dni</string>
            <key>several</key>
            <string>ignored</string>
        </dict>
    </dict>
    <key>broken</key>
    <string>not a plural</string>
</dict>
</plist>"#;
        let read = Format::from_str(xml).unwrap();
        assert_eq!(
            read.nodes,
            vec![Node::Plural {
                key: "days".to_string(),
                items: vec![(Quantity::Few, "%d dni".to_string())],
            }]
        );
    }

    #[test]
    fn test_root_must_be_dict() {
        let xml = r#"<plist version="1.0"><array/></plist>"#;
        assert!(Format::from_str(xml).is_err());
    }
}
