//! JSON conversion for trees.
//!
//! Trees serialize to plain JSON (strings, arrays, objects) through their
//! `Serialize` impl. The reverse direction accepts exactly those three shapes;
//! numbers, booleans and null have no XML text form the decoder would give back
//! and are rejected with the path of the offending value.
use serde_json::Value;

use crate::error::{CodecError, Result};
use crate::tree::{Mapping, Tree};
use crate::xml::{EncodeOptions, encode_with};

/// Converts a JSON value into a tree.
///
/// # Examples
///
/// ```
/// use cmkit_codec::{Tree, json::from_json_value};
///
/// let tree = from_json_value(serde_json::json!({"ListID": "abc"}))?;
/// assert_eq!(tree.get("ListID"), Some(&Tree::from("abc")));
/// # Ok::<(), cmkit_codec::CodecError>(())
/// ```
pub fn from_json_value(value: Value) -> Result<Tree> {
    convert(value, &mut Vec::new())
}

/// Parses a JSON document into a tree.
pub fn from_json_str(s: &str) -> Result<Tree> {
    from_json_value(serde_json::from_str(s)?)
}

/// Converts a tree into a JSON value.
pub fn to_json_value(tree: &Tree) -> Result<Value> {
    Ok(serde_json::to_value(tree)?)
}

/// Serializes a tree to a compact JSON string.
pub fn to_json_string(tree: &Tree) -> Result<String> {
    Ok(serde_json::to_string(tree)?)
}

/// Serializes a tree to a pretty-printed JSON string.
pub fn to_json_string_pretty(tree: &Tree) -> Result<String> {
    Ok(serde_json::to_string_pretty(tree)?)
}

/// Converts a JSON parameter object and encodes it as an XML fragment.
pub fn encode_json(value: Value, options: &EncodeOptions) -> Result<String> {
    encode_with(&from_json_value(value)?, options)
}

fn convert(value: Value, path: &mut Vec<String>) -> Result<Tree> {
    match value {
        Value::String(text) => Ok(Tree::Scalar(text)),
        Value::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                path.push(index.to_string());
                list.push(convert(item, path)?);
                path.pop();
            }
            Ok(Tree::List(list))
        }
        Value::Object(entries) => {
            let mut map = Mapping::with_capacity(entries.len());
            for (key, item) in entries {
                path.push(key.clone());
                let item = convert(item, path)?;
                path.pop();
                map.insert(key, item);
            }
            Ok(Tree::Mapping(map))
        }
        other => {
            let path = if path.is_empty() {
                "/".to_string()
            } else {
                format!("/{}", path.join("/"))
            };
            Err(CodecError::invalid_shape(
                path,
                format!("expected a string, array or object, found {}", kind(&other)),
            ))
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_value_shapes() {
        let tree = from_json_value(json!({
            "ListID": "abc",
            "Emails": ["a@example.com", "b@example.com"],
            "Subscriber": {"Name": "A"}
        }))
        .unwrap();

        let expected = Tree::from([
            ("ListID", Tree::from("abc")),
            (
                "Emails",
                Tree::List(vec![Tree::from("a@example.com"), Tree::from("b@example.com")]),
            ),
            ("Subscriber", Tree::from([("Name", Tree::from("A"))])),
        ]);
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_rejects_numbers_with_path() {
        let err = from_json_value(json!({"a": {"b": [ "x", 3 ]}})).unwrap_err();
        match err {
            CodecError::InvalidShape { path, reason } => {
                assert_eq!(path, "/a/b/1");
                assert!(reason.contains("number"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_top_level_null() {
        let err = from_json_value(Value::Null).unwrap_err();
        assert!(matches!(err, CodecError::InvalidShape { ref path, .. } if path == "/"));
    }

    #[test]
    fn test_json_round_trip() {
        let text = r#"{"r":{"a":["1","2"],"b":{"c":"x"}}}"#;
        let tree = from_json_str(text).unwrap();
        assert_eq!(to_json_string(&tree).unwrap(), text);
        assert_eq!(to_json_value(&tree).unwrap(), serde_json::from_str::<Value>(text).unwrap());
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let err = from_json_str("{not json").unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }

    #[test]
    fn test_encode_json() {
        let xml = encode_json(json!({"ListID": "abc"}), &EncodeOptions::default().indent("\t\t"))
            .unwrap();
        assert_eq!(xml, "\t\t<ListID>abc</ListID>\n");
    }
}
