//! Tree → XML encoding.
//!
//! Produces an indented XML fragment (no declaration, no enclosing root) with
//! one element per line. Element events are written through a quick-xml
//! [`Writer`]; indentation and line breaks are written to the underlying
//! sink between events.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use tracing::debug;

use crate::error::{CodecError, Result};
use crate::tree::{Mapping, Tree};
use crate::xml::utils::{INDENT_UNIT, is_valid_element_name};

/// Options controlling one encode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Prefix written before every top-level element.
    pub indent: String,
    /// Entity-escape text values (`&`, `<`, `>`, quotes).
    pub escape: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            indent: String::new(),
            escape: true,
        }
    }
}

impl EncodeOptions {
    pub fn indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    pub fn escape(mut self, escape: bool) -> Self {
        self.escape = escape;
        self
    }
}

/// Encodes a mapping tree as an XML fragment.
///
/// Each nesting level adds one tab to `indent`. With `escape` off, text values
/// are written verbatim and must already be valid markup.
///
/// # Examples
///
/// ```
/// use cmkit_codec::{Tree, encode};
///
/// let tree = Tree::from([("a", Tree::List(vec![Tree::from("1"), Tree::from("2")]))]);
/// assert_eq!(encode(&tree, "", true)?, "<a>1</a>\n<a>2</a>\n");
/// # Ok::<(), cmkit_codec::CodecError>(())
/// ```
pub fn encode(tree: &Tree, indent: &str, escape: bool) -> Result<String> {
    let options = EncodeOptions {
        indent: indent.to_string(),
        escape,
    };
    encode_with(tree, &options)
}

/// Encodes a mapping tree with explicit options.
pub fn encode_with(tree: &Tree, options: &EncodeOptions) -> Result<String> {
    let mut buffer = Vec::new();
    encode_to_writer(tree, options, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| CodecError::invalid_shape("/", format!("output is not UTF-8: {}", e)))
}

/// Encodes a mapping tree into `writer`.
pub fn encode_to_writer<W: Write>(tree: &Tree, options: &EncodeOptions, writer: W) -> Result<()> {
    let Tree::Mapping(map) = tree else {
        return Err(CodecError::invalid_shape(
            "/",
            "top-level value must be a mapping",
        ));
    };

    debug!(
        entries = map.len(),
        indent = ?options.indent,
        escape = options.escape,
        "Encoding tree as XML"
    );

    let mut encoder = XmlEncoder {
        writer: Writer::new(writer),
        escape: options.escape,
        path: Vec::new(),
    };
    encoder.write_mapping(map, &options.indent)?;
    encoder.writer.into_inner().flush()?;

    debug!("Encoded tree as XML");
    Ok(())
}

/// Recursive encoder over a quick-xml writer.
struct XmlEncoder<W: Write> {
    writer: Writer<W>,
    escape: bool,
    /// Keys and list indices leading to the value being written.
    path: Vec<String>,
}

impl<W: Write> XmlEncoder<W> {
    fn path_key(&self) -> String {
        if self.path.is_empty() {
            return "/".to_string();
        }
        let mut key = String::new();
        for segment in &self.path {
            key.push('/');
            key.push_str(segment);
        }
        key
    }

    fn shape_error(&self, reason: impl Into<String>) -> CodecError {
        CodecError::invalid_shape(self.path_key(), reason)
    }

    fn write_mapping(&mut self, map: &Mapping, indent: &str) -> Result<()> {
        for (name, value) in map {
            self.path.push(name.clone());
            if !is_valid_element_name(name) {
                return Err(self.shape_error(format!("{:?} is not a valid element name", name)));
            }

            match value {
                Tree::List(items) if !items.is_empty() => {
                    for (index, item) in items.iter().enumerate() {
                        self.path.push(index.to_string());
                        match item {
                            Tree::List(_) => {
                                return Err(self.shape_error("list nested directly in a list"));
                            }
                            item => self.write_element(name, item, indent)?,
                        }
                        self.path.pop();
                    }
                }
                value => self.write_element(name, value, indent)?,
            }

            self.path.pop();
        }
        Ok(())
    }

    /// Writes one `<name>` element. An empty list is written like an empty
    /// mapping.
    fn write_element(&mut self, name: &str, value: &Tree, indent: &str) -> Result<()> {
        self.raw(indent)?;
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))?;

        match value {
            Tree::Scalar(text) => {
                let text = if self.escape {
                    escape(text.as_str())
                } else {
                    text.as_str().into()
                };
                self.writer
                    .write_event(Event::Text(BytesText::from_escaped(text)))?;
            }
            Tree::Mapping(map) => {
                self.raw("\n")?;
                self.write_mapping(map, &format!("{}{}", indent, INDENT_UNIT))?;
                self.raw(indent)?;
            }
            Tree::List(_) => {
                self.raw("\n")?;
                self.raw(indent)?;
            }
        }

        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        self.raw("\n")
    }

    /// Writes layout text that bypasses the event layer.
    fn raw(&mut self, text: &str) -> Result<()> {
        self.writer.get_mut().write_all(text.as_bytes())?;
        Ok(())
    }
}
