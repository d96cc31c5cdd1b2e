//! Helpers over parsed documents
//!
//! A document is a JSON object with a single root key naming the element:
//!
//! ```json
//! { "CustomLabels": { "@xmlns": "urn:metadata", "labels": [ { "fullName": "Greeting" } ] } }
//! ```
//!
//! Keys starting with `@` are attributes. Together with the root name they
//! form the structural template of a document. A child collection is a key
//! under the root holding either one object or an array of objects.

use crate::error::ConvertError;
use crate::types::Identity;
use serde_json::{Map, Value};

const ATTRIBUTE_PREFIX: char = '@';

/// Parse raw content into a document
///
/// Tries simd-json first and falls back to serde_json, whose error message
/// is the one reported.
pub fn parse_document(raw: &str) -> Result<Value, String> {
    let mut buffer = raw.as_bytes().to_vec();
    let value = match simd_json::serde::from_slice::<Value>(&mut buffer) {
        Ok(value) => value,
        Err(_) => serde_json::from_str::<Value>(raw).map_err(|e| e.to_string())?,
    };

    match &value {
        Value::Object(obj) if obj.len() == 1 && obj.values().all(Value::is_object) => Ok(value),
        _ => Err(String::from(
            "expected a single root element holding an object",
        )),
    }
}

/// A document with no content under its root
pub fn empty_root(root_name: &str) -> Value {
    let mut doc = Map::new();
    doc.insert(root_name.to_string(), Value::Object(Map::new()));
    Value::Object(doc)
}

/// The root element name and body of a document
pub fn root(doc: &Value) -> Option<(&str, &Map<String, Value>)> {
    let obj = doc.as_object()?;
    let (name, body) = obj.iter().next()?;
    Some((name.as_str(), body.as_object()?))
}

/// Owned variant of [`root`]
pub fn into_root(doc: Value) -> Option<(String, Map<String, Value>)> {
    match doc {
        Value::Object(obj) => {
            let (name, body) = obj.into_iter().next()?;
            match body {
                Value::Object(body) => Some((name, body)),
                _ => None,
            }
        }
        _ => None,
    }
}

pub fn is_attribute(key: &str) -> bool {
    key.starts_with(ATTRIBUTE_PREFIX)
}

/// The attributes of a root body
pub fn attributes(body: &Map<String, Value>) -> Map<String, Value> {
    body.iter()
        .filter(|(key, _)| is_attribute(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Namespace declarations: the attributes a wrapping element supplies to
/// every document split out of it
pub fn is_template_attribute(key: &str) -> bool {
    key == "@xmlns" || key.starts_with("@xmlns:")
}

/// The namespace declarations of a root body
pub fn template_attributes(body: &Map<String, Value>) -> Map<String, Value> {
    body.iter()
        .filter(|(key, _)| is_template_attribute(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// A root body without its namespace declarations
///
/// Other attributes belong to the element itself and are kept.
pub fn strip_template_attributes(body: &Map<String, Value>) -> Map<String, Value> {
    body.iter()
        .filter(|(key, _)| !is_template_attribute(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// True when a body holds nothing but attributes
pub fn has_only_attributes(body: &Map<String, Value>) -> bool {
    body.keys().all(|key| is_attribute(key))
}

/// The elements under a child collection point
///
/// A missing key yields nothing; a single object is treated as a one-element array.
pub fn child_elements<'a>(body: &'a Map<String, Value>, element_name: &str) -> Vec<&'a Value> {
    match body.get(element_name) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    }
}

/// Replace a child collection; an empty collection removes the key
pub fn set_child_elements(body: &mut Map<String, Value>, element_name: &str, elements: Vec<Value>) {
    if elements.is_empty() {
        body.remove(element_name);
    } else {
        body.insert(element_name.to_string(), Value::Array(elements));
    }
}

/// The identifying field of an element, if it has a usable one
pub fn element_key(element: &Value, field: &str) -> Option<String> {
    element.as_object().and_then(|obj| match obj.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// The value of a child element's identifying field
///
/// Strings are used as-is and numbers are rendered; anything else, or a
/// missing field, is a data integrity error naming the element.
pub fn unique_key(
    element: &Value,
    field: &str,
    parent: &Identity,
    element_name: &str,
    index: usize,
) -> Result<String, ConvertError> {
    element_key(element, field).ok_or_else(|| ConvertError::DataIntegrity {
        parent: parent.clone(),
        element: format!("{}[{}]", element_name, index),
        field: field.to_string(),
    })
}

/// Build a document from a root name and body
pub fn wrap(root_name: &str, body: Map<String, Value>) -> Value {
    let mut doc = Map::new();
    doc.insert(root_name.to_string(), Value::Object(body));
    Value::Object(doc)
}

/// The content of a child document as an inline fragment
pub fn fragment(doc: &Value) -> Option<Map<String, Value>> {
    root(doc).map(|(_, body)| strip_template_attributes(body))
}

/// Like [`fragment`], with the identifying field filled from `fallback_key`
/// when the document lacks it
pub fn keyed_fragment(doc: &Value, field: &str, fallback_key: &str) -> Option<Map<String, Value>> {
    let mut fragment = fragment(doc)?;
    fragment
        .entry(field.to_string())
        .or_insert_with(|| Value::String(fallback_key.to_string()));
    Some(fragment)
}

pub fn serialize(doc: &Value, pretty: bool) -> Result<String, ConvertError> {
    let content = if pretty {
        serde_json::to_string_pretty(doc)?
    } else {
        serde_json::to_string(doc)?
    };
    Ok(content)
}
