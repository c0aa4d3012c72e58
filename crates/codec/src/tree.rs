//! The decoded/encoded value shape.
//!
//! A [`Tree`] is either a text leaf, an ordered list of repeated siblings, or a
//! mapping from element name to child value. The decoder only ever produces a
//! `List` when it has seen the same element name twice at one path; the
//! encoder only ever emits repeated siblings for a non-empty `List`.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Element name to child value, in document (insertion) order.
///
/// Equality ignores order, so two trees decoded from documents that only differ
/// in sibling order of distinct element names compare equal.
pub type Mapping = IndexMap<String, Tree>;

/// A decoded XML value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tree {
    /// Text content of a leaf element.
    Scalar(String),
    /// Repeated sibling elements, in document order.
    List(Vec<Tree>),
    /// Child elements keyed by qualified name.
    Mapping(Mapping),
}

impl Default for Tree {
    fn default() -> Self {
        Tree::Mapping(Mapping::new())
    }
}

impl Tree {
    /// Creates an empty mapping.
    pub fn mapping() -> Self {
        Tree::default()
    }

    /// Creates a text leaf.
    pub fn scalar(text: impl Into<String>) -> Self {
        Tree::Scalar(text.into())
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Tree::Scalar(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Tree::List(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Tree::Mapping(_))
    }

    /// Returns the text of a `Scalar`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::Scalar(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Tree]> {
        match self {
            Tree::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Tree>> {
        match self {
            Tree::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Tree::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Tree::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a child element of a `Mapping`.
    pub fn get(&self, key: &str) -> Option<&Tree> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Removes and returns a child element of a `Mapping`.
    pub fn take(&mut self, key: &str) -> Option<Tree> {
        self.as_mapping_mut().and_then(|map| map.shift_remove(key))
    }

    /// Iterates a value that may be either one element or a list of them.
    ///
    /// API responses carry a single `<List>` as a bare mapping and several as a
    /// `List`; this yields the elements uniformly in both cases.
    ///
    /// ```
    /// use cmkit_codec::Tree;
    ///
    /// let one = Tree::scalar("a");
    /// let many = Tree::List(vec![Tree::scalar("a"), Tree::scalar("b")]);
    /// assert_eq!(one.items().count(), 1);
    /// assert_eq!(many.items().count(), 2);
    /// ```
    pub fn items(&self) -> std::slice::Iter<'_, Tree> {
        match self {
            Tree::List(items) => items.iter(),
            single => std::slice::from_ref(single).iter(),
        }
    }

    /// Owned counterpart of [`Tree::items`].
    pub fn into_items(self) -> Vec<Tree> {
        match self {
            Tree::List(items) => items,
            single => vec![single],
        }
    }

    /// Turns this value into a `List`, wrapping the prior value as its first
    /// element unless it already is one.
    pub(crate) fn promote(&mut self) {
        let prior = std::mem::take(self);
        *self = Tree::List(prior.into_items());
    }
}

impl From<&str> for Tree {
    fn from(text: &str) -> Self {
        Tree::Scalar(text.to_string())
    }
}

impl From<String> for Tree {
    fn from(text: String) -> Self {
        Tree::Scalar(text)
    }
}

impl From<Vec<Tree>> for Tree {
    fn from(items: Vec<Tree>) -> Self {
        Tree::List(items)
    }
}

impl From<Mapping> for Tree {
    fn from(map: Mapping) -> Self {
        Tree::Mapping(map)
    }
}

impl<K: Into<String>, const N: usize> From<[(K, Tree); N]> for Tree {
    fn from(entries: [(K, Tree); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Tree)> for Tree {
    fn from_iter<I: IntoIterator<Item = (K, Tree)>>(iter: I) -> Self {
        Tree::Mapping(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Serialize for Tree {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Tree::Scalar(text) => serializer.serialize_str(text),
            Tree::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Tree::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}
