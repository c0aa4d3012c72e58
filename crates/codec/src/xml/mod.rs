//! XML decoding and encoding for API payloads.
//!
//! ## Architecture
//!
//! - **Decoding**: quick-xml events are read through a bounded window. The
//!   decoder tracks the open element path and, per open element, how many
//!   children of each name it has seen. Children of the scope element are
//!   counted by path instead, so repeated scope elements fill one list. When
//!   an element with text closes, the text is merged into the result tree at
//!   that path. Bytes are decoded as declared by `<?xml encoding="..."?>`,
//!   falling back to [`DecodeOptions::encoding`] (UTF-8 by default).
//!
//! - **Encoding**: a recursive walk writes one element per tree entry with a
//!   tab of indentation per nesting level.
//!
//! ## XML ↔ Tree Mapping
//!
//! | XML | Tree |
//! |-----|------|
//! | `<a>1</a>` | `{a: "1"}` |
//! | `<a>1</a><a>2</a>` | `{a: ["1", "2"]}` |
//! | `<a><b>1</b></a><a><b>2</b></a>` | `{a: [{b: "1"}, {b: "2"}]}` |
//! | `<a>  </a>`, `<a/>` | nothing |
//!
//! Attributes, comments, processing instructions and the declaration are
//! discarded. Text inside an element that also has child elements cannot be
//! represented and is dropped with a warning.
//!
//! A single repeated element decodes as its bare value, not as a one-element
//! list, so callers that expect "one or many" should use [`Tree::items`].
//!
//! ## Examples
//!
//! ```
//! use cmkit_codec::xml::{decode, encode};
//!
//! let tree = decode("<r><a><b>1</b></a><a><b>2</b></a></r>", None)?;
//! let xml = encode(&tree, "", true)?;
//! assert_eq!(decode(&xml, None)?, tree);
//! # Ok::<(), cmkit_codec::CodecError>(())
//! ```
//!
//! [`Tree::items`]: crate::Tree::items
//! [`DecodeOptions::encoding`]: de::DecodeOptions::encoding

mod builder;
pub mod de;
pub mod scope;
pub mod ser;
mod utils;

pub use scope::RootScope;
pub use utils::{DEFAULT_WINDOW_SIZE, INDENT_UNIT, is_valid_element_name};

// Re-export decoding functions
pub use de::{DecodeOptions, decode, decode_reader, decode_str};

#[cfg(feature = "parallel")]
pub use de::decode_batch;

// Re-export encoding functions
pub use ser::{EncodeOptions, encode, encode_to_writer, encode_with};
