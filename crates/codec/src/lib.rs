//! # cmkit codec
//!
//! Converts between the XML payloads of a SOAP/XML email-marketing API and a
//! small in-memory tree of text leaves, lists and mappings.
//!
//! ## Features
//!
//! - **Streaming decoder**: reads quick-xml events through a bounded window,
//!   folds repeated sibling elements into lists, and can start output below a
//!   root scope such as `/soap:Envelope/soap:Body`.
//! - **Encoder**: writes a tree back as an indented XML fragment, ready to be
//!   placed inside a request envelope.
//! - **SOAP helpers**: request envelope construction and response unwrapping.
//! - **JSON bridge**: trees serialize to plain JSON, and JSON parameter objects
//!   convert into trees.
//!
//! ## Examples
//!
//! ```
//! use cmkit_codec::{Tree, decode, encode};
//!
//! let tree = decode("<r><a>1</a><a>2</a></r>", None)?;
//! assert_eq!(
//!     tree,
//!     Tree::from([("r", Tree::from([("a", Tree::List(vec![Tree::from("1"), Tree::from("2")]))]))])
//! );
//!
//! let xml = encode(&Tree::from([("a", Tree::from([("b", Tree::from("1"))]))]), "", true)?;
//! assert_eq!(xml, "<a>\n\t<b>1</b>\n</a>\n");
//! # Ok::<(), cmkit_codec::CodecError>(())
//! ```

pub mod error;
pub mod json;
pub mod soap;
pub mod tree;
pub mod xml;

// Re-export common types and functions
pub use error::{CodecError, Result};
pub use tree::{Mapping, Tree};

// Re-export XML functions at top level for convenience
pub use xml::{DecodeOptions, EncodeOptions, RootScope, decode, decode_str, encode, encode_with};

#[cfg(feature = "parallel")]
pub use xml::decode_batch;

pub use soap::{SOAP_BODY_SCOPE, SoapRequest, decode_soap_reader, decode_soap_response};
