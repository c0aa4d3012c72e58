//! Streaming XML → tree decoding.
//!
//! The decoder reads quick-xml events through a bounded window and keeps an
//! explicit state value (element stack, per-parent sibling counts, and the text
//! buffered for the open element) that lives only as long as one decode call.
//! Every time an element with non-blank text closes, its value is merged into
//! the result tree by the [builder](super::builder).
//!
//! Below the root scope, sibling counts are kept per parent element instance,
//! so the index of a repeated element always refers to its position among the
//! children of the parent it actually appears in. Elements directly under the
//! scope element (and the scope's own ancestors) are counted by path across
//! the whole document, so records from repeated scope elements land in their
//! own list slots.
//!
//! Byte content is decoded with the encoding named in the XML declaration, or
//! with [`DecodeOptions::encoding`] when the document declares none.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};

use encoding_rs::{Encoding, UTF_8};
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesDecl, Event};
use tracing::{debug, trace, warn};

use crate::error::{CodecError, Result};
use crate::tree::{Mapping, Tree};
use crate::xml::builder::{self, Segment};
use crate::xml::scope::RootScope;
use crate::xml::utils::{DEFAULT_WINDOW_SIZE, LineTracker, is_blank};

/// Options controlling one decode call.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Where decoded output begins.
    pub scope: RootScope,
    /// Size in bytes of the window the tokenizer reads through.
    pub window_size: usize,
    /// Character set of documents without an `encoding` declaration.
    pub encoding: &'static Encoding,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            scope: RootScope::document(),
            window_size: DEFAULT_WINDOW_SIZE,
            encoding: UTF_8,
        }
    }
}

impl DecodeOptions {
    /// Options decoding from the given `/`-separated scope path.
    pub fn with_scope(scope: &str) -> Result<Self> {
        Ok(Self {
            scope: RootScope::parse(scope)?,
            ..Default::default()
        })
    }

    /// Sets the streaming window size (at least one byte).
    pub fn window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(1);
        self
    }

    /// Sets the default character set by WHATWG label (`utf-8`, `iso-8859-1`,
    /// `windows-1252`, ...).
    pub fn charset(mut self, label: &str) -> Result<Self> {
        self.encoding = lookup_charset(label)?;
        Ok(self)
    }
}

/// UTF-16 labels resolve to UTF-8: the tokenizer only sees ASCII-compatible
/// bytes, so a UTF-16 declaration can only come from already transcoded text.
fn lookup_charset(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .map(Encoding::output_encoding)
        .ok_or_else(|| CodecError::UnknownCharset(label.to_string()))
}

/// Decodes an XML document, optionally starting output at `scope`.
///
/// # Examples
///
/// ```
/// use cmkit_codec::{Tree, decode};
///
/// let tree = decode("<r><a>1</a><a>2</a></r>", None)?;
/// let a = tree.get("r").and_then(|r| r.get("a")).unwrap();
/// assert_eq!(a, &Tree::List(vec![Tree::from("1"), Tree::from("2")]));
/// # Ok::<(), cmkit_codec::CodecError>(())
/// ```
pub fn decode(xml: &str, scope: Option<&str>) -> Result<Tree> {
    let options = match scope {
        Some(scope) => DecodeOptions::with_scope(scope)?,
        None => DecodeOptions::default(),
    };
    decode_str(xml, &options)
}

/// Decodes an XML string with explicit options.
pub fn decode_str(xml: &str, options: &DecodeOptions) -> Result<Tree> {
    decode_reader(xml.as_bytes(), options)
}

/// Decodes XML read from `source` through a window of `options.window_size`
/// bytes. Only the window, not the whole document, is buffered.
pub fn decode_reader<R: Read>(source: R, options: &DecodeOptions) -> Result<Tree> {
    debug!(
        scope = %options.scope,
        window_size = options.window_size,
        charset = options.encoding.name(),
        "Decoding XML document"
    );

    let window = BufReader::with_capacity(options.window_size.max(1), source);
    let mut reader = Reader::from_reader(LineTracker::new(window));
    reader.config_mut().check_end_names = true;

    let mut state = DecodeState::new(&options.scope);
    read_events(&mut reader, &mut state, options.encoding)?;
    let tree = state.finish(reader.get_ref())?;

    debug!(
        bytes = reader.get_ref().consumed(),
        entries = tree.as_mapping().map_or(0, |m| m.len()),
        "Decoded XML document"
    );
    Ok(tree)
}

/// Decodes many documents in parallel. Each document gets its own decoder
/// state; results are returned in input order.
#[cfg(feature = "parallel")]
pub fn decode_batch<S>(documents: &[S], options: &DecodeOptions) -> Vec<Result<Tree>>
where
    S: AsRef<str> + Sync,
{
    use rayon::prelude::*;

    documents
        .par_iter()
        .map(|doc| decode_str(doc.as_ref(), options))
        .collect()
}

/// Pumps tokenizer events into the decoder state until end of input.
fn read_events<R: BufRead>(
    reader: &mut Reader<LineTracker<R>>,
    state: &mut DecodeState<'_>,
    mut encoding: &'static Encoding,
) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(err) => {
                let line = reader.get_ref().line_at(reader.error_position() as u64);
                return Err(CodecError::malformed(line, err.to_string()));
            }
        };
        let line = current_line(reader);

        match event {
            Event::Decl(decl) => {
                if let Some(declared) = declared_encoding(&decl, line)? {
                    encoding = declared;
                }
            }
            Event::Start(start) => {
                let name = start.name();
                let name = decode_bytes(encoding, name.as_ref(), line)?;
                state.open(name.into_owned(), line)?;
            }
            Event::Empty(start) => {
                let name = start.name();
                let name = decode_bytes(encoding, name.as_ref(), line)?;
                state.open(name.into_owned(), line)?;
                state.close(line)?;
            }
            Event::End(_) => state.close(line)?,
            Event::Text(text) => {
                let raw = decode_bytes(encoding, &text, line)?;
                let text = unescape(&raw).map_err(|e| CodecError::malformed(line, e.to_string()))?;
                state.text(&text, line)?;
            }
            Event::CData(data) => {
                let text = decode_bytes(encoding, &data, line)?;
                state.text(&text, line)?;
            }
            Event::GeneralRef(reference) => {
                let name = decode_bytes(encoding, &reference, line)?;
                let entity = format!("&{};", name);
                let resolved = unescape(&entity).map_err(|_| {
                    CodecError::malformed(line, format!("undefined entity {}", entity))
                })?;
                state.text(&resolved, line)?;
            }
            Event::Eof => return Ok(()),
            // Comments, processing instructions and doctypes carry no data
            // for the tree.
            _ => {}
        }
    }
}

/// Line of the last byte the tokenizer has consumed.
fn current_line<R: BufRead>(reader: &Reader<LineTracker<R>>) -> u64 {
    let position = reader.buffer_position() as u64;
    reader.get_ref().line_at(position.saturating_sub(1))
}

/// Encoding named by the `<?xml ... encoding="..."?>` declaration, if any.
fn declared_encoding(decl: &BytesDecl<'_>, line: u64) -> Result<Option<&'static Encoding>> {
    let Some(label) = decl.encoding() else {
        return Ok(None);
    };
    let label = label.map_err(|e| CodecError::malformed(line, e.to_string()))?;
    let label = String::from_utf8_lossy(&label);
    lookup_charset(&label)
        .map(Some)
        .map_err(|_| CodecError::malformed(line, format!("unsupported encoding {:?}", label)))
}

fn decode_bytes<'b>(
    encoding: &'static Encoding,
    bytes: &'b [u8],
    line: u64,
) -> Result<Cow<'b, str>> {
    if encoding == UTF_8 {
        return std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|e| CodecError::malformed(line, format!("invalid UTF-8: {}", e)));
    }
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(|| {
            CodecError::malformed(line, format!("invalid {} byte sequence", encoding.name()))
        })
}

/// An open element.
#[derive(Debug)]
struct Frame {
    name: String,
    /// Index among same-named siblings under the parent.
    occurrence: usize,
    /// Sibling counts of this element's children, by name.
    child_counts: HashMap<String, usize>,
    /// Text buffered until the element closes.
    text: String,
    /// Set once a child element opens.
    has_children: bool,
    /// Line the element was opened on.
    line: u64,
}

impl AsRef<str> for Frame {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

/// Decoder state owned by a single decode call.
struct DecodeState<'s> {
    scope: &'s RootScope,
    stack: Vec<Frame>,
    /// Sibling counts by path for elements at or above the first level
    /// below the scope; these outlive any single scope element.
    scope_counts: HashMap<String, usize>,
    root_seen: bool,
    tree: Mapping,
}

impl<'s> DecodeState<'s> {
    fn new(scope: &'s RootScope) -> Self {
        Self {
            scope,
            stack: Vec::new(),
            scope_counts: HashMap::new(),
            root_seen: false,
            tree: Mapping::new(),
        }
    }

    /// Canonical `/`-joined form of the current element path.
    fn path_key(&self) -> String {
        let mut key = String::new();
        for frame in &self.stack {
            key.push('/');
            key.push_str(&frame.name);
        }
        key
    }

    fn open(&mut self, name: String, line: u64) -> Result<()> {
        if self.stack.is_empty() && self.root_seen {
            return Err(CodecError::malformed(
                line,
                format!("junk after document element: <{}>", name),
            ));
        }
        self.root_seen = true;

        let by_path = self.stack.len() <= self.scope.depth();
        let path_occurrence = if by_path {
            let key = format!("{}/{}", self.path_key(), name);
            next_occurrence(self.scope_counts.entry(key).or_insert(0))
        } else {
            0
        };

        let mut occurrence = path_occurrence;
        if let Some(parent) = self.stack.last_mut() {
            parent.has_children = true;
            let sibling = next_occurrence(parent.child_counts.entry(name.clone()).or_insert(0));
            if !by_path {
                occurrence = sibling;
            }
        }

        self.stack.push(Frame {
            name,
            occurrence,
            child_counts: HashMap::new(),
            text: String::new(),
            has_children: false,
            line,
        });
        Ok(())
    }

    fn text(&mut self, fragment: &str, line: u64) -> Result<()> {
        let in_scope = self.scope.contains(&self.stack);
        let Some(frame) = self.stack.last_mut() else {
            if is_blank(fragment.as_bytes()) {
                return Ok(());
            }
            return Err(CodecError::malformed(
                line,
                "text outside of the root element",
            ));
        };

        if !in_scope || (frame.text.is_empty() && is_blank(fragment.as_bytes())) {
            return Ok(());
        }
        frame.text.push_str(fragment);
        Ok(())
    }

    fn close(&mut self, line: u64) -> Result<()> {
        let Some(frame) = self.stack.last_mut() else {
            return Err(CodecError::malformed(line, "unmatched end tag"));
        };
        let text = std::mem::take(&mut frame.text);
        let value = text.trim();
        let mixed = frame.has_children;

        let depth = self.scope.depth();
        if !value.is_empty() && mixed {
            warn!(
                path = %self.path_key(),
                "Element mixes text and child elements; text value dropped"
            );
        } else if !value.is_empty() && self.stack.len() > depth {
            let path: Vec<Segment<'_>> = self.stack[depth..]
                .iter()
                .map(|frame| Segment {
                    name: &frame.name,
                    occurrence: frame.occurrence,
                })
                .collect();

            match builder::merge(&mut self.tree, &path, value.to_string()) {
                Ok(()) => trace!(path = %self.path_key(), "Merged leaf value"),
                Err(conflict) => warn!(
                    path = %self.path_key(),
                    element = %conflict.name,
                    "Text value conflicts with child elements; text value dropped"
                ),
            }
        }

        self.stack.pop();
        Ok(())
    }

    /// Validates end-of-input and hands over the finished tree.
    fn finish<R: BufRead>(self, source: &LineTracker<R>) -> Result<Tree> {
        if let Some(open) = self.stack.last() {
            return Err(CodecError::UnclosedElement {
                name: open.name.clone(),
                line: open.line,
            });
        }
        if !self.root_seen {
            return Err(CodecError::malformed(
                source.line_at(source.consumed()),
                "no element found",
            ));
        }
        Ok(Tree::Mapping(self.tree))
    }
}

/// Returns the current count as the new sibling's index and bumps it.
fn next_occurrence(count: &mut usize) -> usize {
    let occurrence = *count;
    *count += 1;
    occurrence
}
