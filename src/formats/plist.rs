//! A small XML property list reader and writer.
//!
//! Only the shapes locforge emits are modelled: strings, dictionaries and
//! arrays. Other value elements are parsed as [`Value::Other`] and skipped
//! on write.

use std::io::{BufRead, Write};

use quick_xml::{
    Reader, Writer,
    escape::partial_escape,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::{
    error::Error,
    formats::{comment_text, read_element_text, skip_element},
};

const DOCTYPE: &str =
    r#"plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd""#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    /// Keys keep document order.
    Dict(Vec<(String, Value)>),
    Array(Vec<Value>),
    Other,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// First value stored under `key` when this is a dictionary.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_dict()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Reads the root value of a property list document.
pub fn read_document<R: BufRead>(reader: R) -> Result<Value, Error> {
    let mut xml_reader = Reader::from_reader(reader);
    let mut buf = Vec::new();

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.name().as_ref() == b"plist" => {}
            Event::Start(ref e) => {
                let name = e.name().as_ref().to_vec();
                return parse_value(&mut xml_reader, &name);
            }
            Event::Empty(ref e) if e.name().as_ref() != b"plist" => {
                return Ok(empty_value(e.name().as_ref()));
            }
            Event::End(_) | Event::Eof => {
                return Err(Error::InvalidResource(
                    "property list has no root value".to_string(),
                ));
            }
            _ => {}
        }
        buf.clear();
    }
}

fn empty_value(name: &[u8]) -> Value {
    match name {
        b"string" => Value::String(String::new()),
        b"dict" => Value::Dict(Vec::new()),
        b"array" => Value::Array(Vec::new()),
        _ => Value::Other,
    }
}

fn parse_value<R: BufRead>(reader: &mut Reader<R>, name: &[u8]) -> Result<Value, Error> {
    match name {
        b"string" => Ok(Value::String(read_element_text(reader)?)),
        b"dict" => parse_dict(reader),
        b"array" => parse_array(reader),
        _ => {
            skip_element(reader)?;
            Ok(Value::Other)
        }
    }
}

fn parse_dict<R: BufRead>(reader: &mut Reader<R>) -> Result<Value, Error> {
    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut pending_key: Option<String> = None;

    loop {
        let value = match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.name().as_ref() == b"key" => {
                pending_key = Some(read_element_text(reader)?);
                None
            }
            Event::Start(ref e) => {
                let name = e.name().as_ref().to_vec();
                Some(parse_value(reader, &name)?)
            }
            Event::Empty(ref e) if e.name().as_ref() == b"key" => {
                pending_key = Some(String::new());
                None
            }
            Event::Empty(ref e) => Some(empty_value(e.name().as_ref())),
            Event::End(_) => break,
            Event::Eof => {
                return Err(Error::InvalidResource(
                    "unexpected end of file inside dict".to_string(),
                ));
            }
            _ => None,
        };
        if let Some(value) = value {
            let key = pending_key.take().ok_or_else(|| {
                Error::InvalidResource("dict value without a preceding key".to_string())
            })?;
            entries.push((key, value));
        }
        buf.clear();
    }
    Ok(Value::Dict(entries))
}

fn parse_array<R: BufRead>(reader: &mut Reader<R>) -> Result<Value, Error> {
    let mut buf = Vec::new();
    let mut items = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let name = e.name().as_ref().to_vec();
                items.push(parse_value(reader, &name)?);
            }
            Event::Empty(ref e) => items.push(empty_value(e.name().as_ref())),
            Event::End(_) => break,
            Event::Eof => {
                return Err(Error::InvalidResource(
                    "unexpected end of file inside array".to_string(),
                ));
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(Value::Array(items))
}

/// Writes `root` as a complete property list document.
pub fn write_document<W: Write>(mut writer: W, root: &Value) -> Result<(), Error> {
    let mut plist = PlistWriter::new(&mut writer);
    plist.write_header()?;
    plist.write_value(root)?;
    plist.write_footer()?;
    writer.write_all(b"\n")?;
    Ok(())
}

pub struct PlistWriter<W: Write> {
    inner: Writer<W>,
}

impl<W: Write> PlistWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Writer::new_with_indent(writer, b'\t', 1),
        }
    }

    pub fn write_header(&mut self) -> Result<(), Error> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.inner
            .write_event(Event::DocType(BytesText::from_escaped(DOCTYPE)))?;
        let mut plist = BytesStart::new("plist");
        plist.push_attribute(("version", "1.0"));
        self.inner.write_event(Event::Start(plist))?;
        Ok(())
    }

    pub fn write_footer(&mut self) -> Result<(), Error> {
        self.inner.write_event(Event::End(BytesEnd::new("plist")))?;
        Ok(())
    }

    pub fn start_dict(&mut self) -> Result<(), Error> {
        self.inner.write_event(Event::Start(BytesStart::new("dict")))?;
        Ok(())
    }

    pub fn end_dict(&mut self) -> Result<(), Error> {
        self.inner.write_event(Event::End(BytesEnd::new("dict")))?;
        Ok(())
    }

    pub fn write_key(&mut self, key: &str) -> Result<(), Error> {
        self.write_text("key", key)
    }

    pub fn write_comment(&mut self, text: &str) -> Result<(), Error> {
        self.inner
            .write_event(Event::Comment(BytesText::from_escaped(comment_text(text))))?;
        Ok(())
    }

    pub fn write_value(&mut self, value: &Value) -> Result<(), Error> {
        match value {
            Value::String(text) => self.write_text("string", text),
            Value::Dict(entries) => {
                self.start_dict()?;
                for (key, value) in entries {
                    if matches!(value, Value::Other) {
                        continue;
                    }
                    self.write_key(key)?;
                    self.write_value(value)?;
                }
                self.end_dict()
            }
            Value::Array(items) => {
                self.inner.write_event(Event::Start(BytesStart::new("array")))?;
                for item in items {
                    self.write_value(item)?;
                }
                self.inner.write_event(Event::End(BytesEnd::new("array")))?;
                Ok(())
            }
            Value::Other => Ok(()),
        }
    }

    fn write_text(&mut self, tag: &str, text: &str) -> Result<(), Error> {
        self.inner.write_event(Event::Start(BytesStart::new(tag)))?;
        self.inner
            .write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
        self.inner.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }
}
