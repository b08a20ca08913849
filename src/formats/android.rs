//! Support for Android `strings.xml` resource documents.
//!
//! Reads and writes `<string>`, `<plurals>` and `<string-array>` elements.
//! Values are kept in Android escaping (`\'`, `%1$s`); only XML entities are
//! resolved here.

use std::{
    io::{BufRead, Write},
    str::FromStr,
};

use log::warn;
use quick_xml::{
    Reader, Writer,
    escape::partial_escape,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::{
    error::Error,
    formats::{comment_text, read_element_text, skip_element},
    traits::Parser,
    types::Quantity,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    pub nodes: Vec<Node>,
}

/// One child of `<resources>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Comment(String),
    String {
        name: String,
        value: String,
    },
    Plurals {
        name: String,
        items: Vec<(Quantity, String)>,
    },
    StringArray {
        name: String,
        items: Vec<String>,
    },
}

impl Parser for Format {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut xml_reader = Reader::from_reader(reader);
        let mut buf = Vec::new();
        let mut nodes = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => match e.name().as_ref() {
                    b"string" => {
                        let name = required_name(e, "string")?;
                        let value = read_element_text(&mut xml_reader)?;
                        nodes.push(Node::String { name, value });
                    }
                    b"plurals" => {
                        let name = required_name(e, "plurals")?;
                        let items = parse_plural_items(&mut xml_reader, &name)?;
                        nodes.push(Node::Plurals { name, items });
                    }
                    b"string-array" => {
                        let name = required_name(e, "string-array")?;
                        let items = parse_array_items(&mut xml_reader)?;
                        nodes.push(Node::StringArray { name, items });
                    }
                    _ => {}
                },
                Event::Empty(ref e) => match e.name().as_ref() {
                    b"string" => nodes.push(Node::String {
                        name: required_name(e, "string")?,
                        value: String::new(),
                    }),
                    b"plurals" => nodes.push(Node::Plurals {
                        name: required_name(e, "plurals")?,
                        items: Vec::new(),
                    }),
                    b"string-array" => nodes.push(Node::StringArray {
                        name: required_name(e, "string-array")?,
                        items: Vec::new(),
                    }),
                    _ => {}
                },
                Event::Comment(e) => {
                    // comment bodies are raw text, `&` is not an entity there
                    nodes.push(Node::Comment(String::from_utf8_lossy(&e).trim().to_string()));
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(Format { nodes })
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut xml_writer = Writer::new_with_indent(&mut writer, b' ', 4);

        xml_writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        xml_writer.write_event(Event::Start(BytesStart::new("resources")))?;

        for node in &self.nodes {
            match node {
                Node::Comment(text) => {
                    xml_writer
                        .write_event(Event::Comment(BytesText::from_escaped(comment_text(text))))?;
                }
                Node::String { name, value } => {
                    let mut elem = BytesStart::new("string");
                    elem.push_attribute(("name", name.as_str()));
                    write_text_element(&mut xml_writer, elem, value)?;
                }
                Node::Plurals { name, items } => {
                    let mut elem = BytesStart::new("plurals");
                    elem.push_attribute(("name", name.as_str()));
                    xml_writer.write_event(Event::Start(elem))?;
                    for (quantity, value) in items {
                        let mut item = BytesStart::new("item");
                        item.push_attribute(("quantity", quantity.label()));
                        write_text_element(&mut xml_writer, item, value)?;
                    }
                    xml_writer.write_event(Event::End(BytesEnd::new("plurals")))?;
                }
                Node::StringArray { name, items } => {
                    let mut elem = BytesStart::new("string-array");
                    elem.push_attribute(("name", name.as_str()));
                    xml_writer.write_event(Event::Start(elem))?;
                    for value in items {
                        write_text_element(&mut xml_writer, BytesStart::new("item"), value)?;
                    }
                    xml_writer.write_event(Event::End(BytesEnd::new("string-array")))?;
                }
            }
        }

        xml_writer.write_event(Event::End(BytesEnd::new("resources")))?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

fn write_text_element<W: Write>(
    xml_writer: &mut Writer<W>,
    start: BytesStart<'_>,
    value: &str,
) -> Result<(), Error> {
    let end = BytesEnd::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    xml_writer.write_event(Event::Start(start))?;
    xml_writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(value))))?;
    xml_writer.write_event(Event::End(end))?;
    Ok(())
}

fn attribute(e: &BytesStart, key: &[u8]) -> Result<Option<String>, Error> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| Error::DataMismatch(e.to_string()))?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.to_string()));
        }
    }
    Ok(None)
}

fn required_name(e: &BytesStart, tag: &str) -> Result<String, Error> {
    attribute(e, b"name")?
        .ok_or_else(|| Error::InvalidResource(format!("{} tag missing 'name'", tag)))
}

fn parse_plural_items<R: BufRead>(
    xml_reader: &mut Reader<R>,
    name: &str,
) -> Result<Vec<(Quantity, String)>, Error> {
    let mut buf = Vec::new();
    let mut items = Vec::new();

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.name().as_ref() == b"item" => {
                let quantity = attribute(e, b"quantity")?;
                let value = read_element_text(xml_reader)?;
                match quantity.as_deref().map(Quantity::from_str) {
                    Some(Ok(quantity)) => items.push((quantity, value)),
                    _ => warn!("skipping item of `{}` with quantity {:?}", name, quantity),
                }
            }
            Event::Start(_) => skip_element(xml_reader)?,
            Event::End(_) => break,
            Event::Eof => {
                return Err(Error::InvalidResource(format!(
                    "unexpected end of file inside plurals `{}`",
                    name
                )));
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(items)
}

fn parse_array_items<R: BufRead>(xml_reader: &mut Reader<R>) -> Result<Vec<String>, Error> {
    let mut buf = Vec::new();
    let mut items = Vec::new();

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.name().as_ref() == b"item" => {
                items.push(read_element_text(xml_reader)?);
            }
            Event::Empty(ref e) if e.name().as_ref() == b"item" => items.push(String::new()),
            Event::Start(_) => skip_element(xml_reader)?,
            Event::End(_) => break,
            Event::Eof => {
                return Err(Error::InvalidResource(
                    "unexpected end of file inside string-array".to_string(),
                ));
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(items)
}
