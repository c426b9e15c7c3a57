//! Minimal XML tree shared by the document readers.
//!
//! Instance, message, solution and XML-RPC documents are all small, so they
//! are read into an owned tree first. Text is kept exactly as found (after
//! entity decoding) since file contents must survive a round trip unchanged.

use crate::errors::{CmplError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
	Element(XmlElement),
	Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
	pub name: String,
	pub attributes: Vec<(String, String)>,
	pub children: Vec<XmlNode>,
}

impl XmlElement {
	pub fn attr(&self, name: &str) -> Option<&str> {
		self.attributes
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.as_str())
	}

	/// First child element with the given name.
	pub fn child(&self, name: &str) -> Option<&XmlElement> {
		self.elements().find(|e| e.name == name)
	}

	pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
		self.elements().filter(move |e| e.name == name)
	}

	pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
		self.children.iter().filter_map(|node| match node {
			XmlNode::Element(e) => Some(e),
			XmlNode::Text(_) => None,
		})
	}

	/// Concatenated direct text content, untrimmed.
	pub fn text(&self) -> String {
		self.children
			.iter()
			.filter_map(|node| match node {
				XmlNode::Text(t) => Some(t.as_str()),
				XmlNode::Element(_) => None,
			})
			.collect()
	}

	/// Trimmed text of a named child, empty if the child is absent.
	pub fn child_text(&self, name: &str) -> String {
		self.child(name)
			.map(|c| c.text().trim().to_string())
			.unwrap_or_default()
	}
}

/// Parses a document and returns its root element.
pub fn parse(document: &str) -> Result<XmlElement> {
	let mut reader = Reader::from_str(document);
	let mut stack: Vec<XmlElement> = Vec::new();
	let mut root: Option<XmlElement> = None;

	loop {
		let event = reader.read_event().map_err(malformed)?;
		match event {
			Event::Start(start) => stack.push(open_element(&start)?),
			Event::Empty(start) => {
				let element = open_element(&start)?;
				attach(&mut stack, &mut root, element)?;
			}
			Event::End(_) => {
				let element = stack
					.pop()
					.ok_or_else(|| CmplError::MalformedDocument("unbalanced end tag".into()))?;
				attach(&mut stack, &mut root, element)?;
			}
			Event::Text(text) => {
				if let Some(parent) = stack.last_mut() {
					let value = text.unescape().map_err(malformed)?;
					push_text(parent, &value);
				}
			}
			Event::CData(data) => {
				if let Some(parent) = stack.last_mut() {
					let raw = data.into_inner();
					push_text(parent, &String::from_utf8_lossy(&raw));
				}
			}
			Event::Eof => break,
			_ => {}
		}
	}

	if !stack.is_empty() {
		return Err(CmplError::MalformedDocument(format!(
			"unclosed element <{}>",
			stack.last().map(|e| e.name.as_str()).unwrap_or_default()
		)));
	}
	root.ok_or_else(|| CmplError::MalformedDocument("document has no root element".into()))
}

/// Escapes text for element content or attribute values.
///
/// Carriage returns are written as character references so that line endings
/// survive parsers which normalise them.
pub fn escape_text(raw: &str) -> String {
	quick_xml::escape::escape(raw).replace('\r', "&#13;")
}

fn open_element(start: &BytesStart<'_>) -> Result<XmlElement> {
	let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
	let mut attributes = Vec::new();
	for attr in start.attributes() {
		let attr = attr.map_err(|e| CmplError::MalformedDocument(e.to_string()))?;
		let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
		let value = attr
			.unescape_value()
			.map_err(|e| CmplError::MalformedDocument(e.to_string()))?
			.into_owned();
		attributes.push((key, value));
	}
	Ok(XmlElement {
		name,
		attributes,
		children: Vec::new(),
	})
}

fn attach(
	stack: &mut [XmlElement],
	root: &mut Option<XmlElement>,
	element: XmlElement,
) -> Result<()> {
	match stack.last_mut() {
		Some(parent) => parent.children.push(XmlNode::Element(element)),
		None if root.is_none() => *root = Some(element),
		None => {
			return Err(CmplError::MalformedDocument(
				"document has more than one root element".into(),
			))
		}
	}
	Ok(())
}

fn push_text(parent: &mut XmlElement, value: &str) {
	if let Some(XmlNode::Text(existing)) = parent.children.last_mut() {
		existing.push_str(value);
	} else {
		parent.children.push(XmlNode::Text(value.to_string()));
	}
}

fn malformed(err: impl std::fmt::Display) -> CmplError {
	CmplError::MalformedDocument(err.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_nested_document() {
		let doc = r#"<?xml version="1.0"?>
<root a="1"><item name="x &amp; y">hello</item><item name="z"/></root>"#;
		let root = parse(doc).unwrap();

		assert_eq!(root.name, "root");
		assert_eq!(root.attr("a"), Some("1"));
		let items: Vec<_> = root.children_named("item").collect();
		assert_eq!(items.len(), 2);
		assert_eq!(items[0].attr("name"), Some("x & y"));
		assert_eq!(items[0].text(), "hello");
		assert_eq!(items[1].text(), "");
	}

	#[test]
	fn test_escaped_text_survives_parse() {
		let raw = "a < b && c > \"d\" 'e'\r\n\tnext line\n";
		let doc = format!("<f>{}</f>", escape_text(raw));
		let root = parse(&doc).unwrap();
		assert_eq!(root.text(), raw);
	}

	#[test]
	fn test_unbalanced_document_is_rejected() {
		assert!(matches!(
			parse("<a><b></a>"),
			Err(CmplError::MalformedDocument(_))
		));
		assert!(parse("").is_err());
	}
}
