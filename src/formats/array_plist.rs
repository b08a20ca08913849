//! Apple property list holding string arrays: one `<key>` + `<array>` pair
//! per resource.

use std::io::{BufRead, Write};

use log::warn;

use crate::{
    error::Error,
    formats::plist::{self, PlistWriter, Value},
    traits::Parser,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Comment(String),
    Array { key: String, items: Vec<String> },
}

impl Format {
    pub fn arrays(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Array { key, items } => Some((key.as_str(), items.as_slice())),
            Node::Comment(_) => None,
        })
    }
}

impl Parser for Format {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let root = plist::read_document(reader)?;
        let entries = root.as_dict().ok_or_else(|| {
            Error::InvalidResource("array property list root must be a dict".to_string())
        })?;

        let mut nodes = Vec::new();
        for (key, value) in entries {
            let Some(values) = value.as_array() else {
                warn!("skipping `{}`: not an array", key);
                continue;
            };
            let items = values
                .iter()
                .map(|item| item.as_str().unwrap_or_default().to_string())
                .collect();
            nodes.push(Node::Array {
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
                Node::Array { key, items } => {
                    plist.write_key(key)?;
                    plist.write_value(&Value::Array(
                        items.iter().cloned().map(Value::String).collect(),
                    ))?;
                }
            }
        }
        plist.end_dict()?;
        plist.write_footer()?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}
