//! Merging decoded leaf values into the result tree.
//!
//! Each time an element with text closes, the decoder hands the builder the
//! element path below the root scope together with the sibling index of every
//! segment on that path. Walking the path decides, one segment at a time,
//! whether the existing entry is descended into directly, promoted to a list,
//! or created.

use indexmap::map::Entry;

use crate::tree::{Mapping, Tree};

/// One element on the path being merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    /// Qualified element name.
    pub name: &'a str,
    /// Zero-based index among same-named siblings under the same parent.
    pub occurrence: usize,
}

/// The merge walked into a text leaf where it needed a container.
///
/// The decoder drops text of elements that have children before merging, so
/// this only signals slots already holding text from an earlier value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MixedContent {
    pub name: String,
}

/// Merges `value` into `root` at the position described by `path`.
///
/// An empty path (text directly inside the scope element) is a no-op.
pub(crate) fn merge(
    root: &mut Mapping,
    path: &[Segment<'_>],
    value: String,
) -> Result<(), MixedContent> {
    let Some((leaf, ancestors)) = path.split_last() else {
        return Ok(());
    };

    let mut cursor = root;
    for segment in ancestors {
        cursor = descend(cursor, segment)?;
    }

    place_leaf(cursor, leaf.name, value);
    Ok(())
}

/// Steps from `map` into the child container for `segment`.
fn descend<'t>(
    map: &'t mut Mapping,
    segment: &Segment<'_>,
) -> Result<&'t mut Mapping, MixedContent> {
    let target = match map.entry(segment.name.to_string()) {
        Entry::Vacant(slot) => Some(slot.insert(Tree::mapping())),
        Entry::Occupied(slot) if segment.occurrence == 0 => Some(slot.into_mut()),
        Entry::Occupied(slot) => repeated_slot(slot.into_mut(), segment.occurrence),
    };

    target
        .and_then(Tree::as_mapping_mut)
        .ok_or_else(|| MixedContent {
            name: segment.name.to_string(),
        })
}

/// Returns the list slot for a repeated sibling, promoting the entry to a list
/// on the first repeat. Slots for earlier siblings that never produced a value
/// are filled with empty mappings so indices stay aligned with the document.
fn repeated_slot(entry: &mut Tree, occurrence: usize) -> Option<&mut Tree> {
    entry.promote();
    let items = entry.as_list_mut()?;
    if items.len() <= occurrence {
        items.resize_with(occurrence + 1, Tree::mapping);
    }
    items.get_mut(occurrence)
}

/// Stores a leaf value, appending to (and if needed creating) a list when the
/// name is already present.
fn place_leaf(map: &mut Mapping, name: &str, value: String) {
    match map.entry(name.to_string()) {
        Entry::Vacant(slot) => {
            slot.insert(Tree::Scalar(value));
        }
        Entry::Occupied(slot) => {
            let entry = slot.into_mut();
            entry.promote();
            if let Some(items) = entry.as_list_mut() {
                items.push(Tree::Scalar(value));
            }
        }
    }
}
