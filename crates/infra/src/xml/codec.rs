//! XML ↔ `serde_json::Value` codec for SII response documents
//!
//! Decoding rules:
//! - the root element becomes the single key of the returned object
//! - namespace prefixes are dropped (`SII:RESP_HDR` → `RESP_HDR`)
//! - an element with children becomes an object, a leaf becomes its text
//! - repeated sibling elements become an array
//! - attributes are ignored

use dtelink_core::XmlCodec;
use dtelink_domain::{DteLinkError, Result};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::errors::InfraError;

/// [`XmlCodec`] backed by `quick-xml`
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickXmlCodec;

impl QuickXmlCodec {
    pub fn new() -> Self {
        Self
    }
}

impl XmlCodec for QuickXmlCodec {
    fn decode(&self, xml: &str) -> Result<Value> {
        decode_document(xml).map_err(DteLinkError::from)
    }

    fn encode(&self, value: &Value) -> Result<String> {
        let Value::Object(root) = value else {
            return Err(DteLinkError::Codec("XML root must be an object".into()));
        };
        let mut entries = root.iter();
        let (Some((name, content)), None) = (entries.next(), entries.next()) else {
            return Err(DteLinkError::Codec("XML root must have exactly one element".into()));
        };

        let mut out = String::new();
        write_element(&mut out, name, content);
        Ok(out)
    }
}

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            children: Map::new(),
            text: String::new(),
        }
    }

    fn into_value(self) -> (String, Value) {
        let value = if self.children.is_empty() {
            Value::String(self.text)
        } else {
            Value::Object(self.children)
        };
        (self.name, value)
    }
}

fn insert_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        None => {
            children.insert(name, value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

fn decode_document(xml: &str) -> std::result::Result<Value, InfraError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) => stack.push(Frame::new(element.local_name().as_ref())),
            Event::Empty(element) => {
                let (name, value) = Frame::new(element.local_name().as_ref()).into_value();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None if root.is_none() => root = Some((name, value)),
                    None => {}
                }
            }
            Event::Text(content) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&content.unescape()?);
                }
            }
            Event::CData(content) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&content.into_inner()));
                }
            }
            Event::End(_) => {
                let Some(frame) = stack.pop() else {
                    return Err(DteLinkError::Codec("unbalanced closing tag".into()).into());
                };
                let (name, value) = frame.into_value();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None if root.is_none() => root = Some((name, value)),
                    None => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(DteLinkError::Codec("document ended inside an element".into()).into());
    }
    let (name, value) =
        root.ok_or_else(|| DteLinkError::Codec("document has no root element".into()))?;

    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

fn write_element(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                write_element(out, name, item);
            }
        }
        Value::Object(children) => {
            out.push_str(&format!("<{name}>"));
            for (child, content) in children {
                write_element(out, child, content);
            }
            out.push_str(&format!("</{name}>"));
        }
        Value::Null => out.push_str(&format!("<{name}/>")),
        Value::String(text) => out.push_str(&format!("<{name}>{}</{name}>", escape(text.as_str()))),
        other => out.push_str(&format!("<{name}>{other}</{name}>")),
    }
}
