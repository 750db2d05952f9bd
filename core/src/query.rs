//! Query-string and form encoding for webhook payloads.
//!
//! Nested objects and arrays are flattened recursively using bracket
//! notation (`address[city]=Leeds`, `tags[0]=a`). `null` values are skipped
//! and booleans encode as `1` / `0`. Keys and values are percent-encoded,
//! with spaces as `%20`.

use serde_json::{Map, Value};

/// Encode `payload` as `key=value` pairs joined by `&`.
pub fn build_query(payload: &Map<String, Value>) -> String {
    let mut pairs = Vec::new();
    for (key, value) in payload {
        flatten(key, value, &mut pairs);
    }
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Append `payload` to `url` as query parameters.
///
/// Existing parameters whose name matches a new top-level key are replaced.
/// A `#fragment` stays at the end of the URL.
pub fn add_query_args(url: &str, payload: &Map<String, Value>) -> String {
    if payload.is_empty() {
        return url.to_string();
    }

    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let (base, existing) = match without_fragment.split_once('?') {
        Some((base, query)) => (base, query),
        None => (without_fragment, ""),
    };

    let mut params: Vec<&str> = existing
        .split('&')
        .filter(|param| !param.is_empty())
        .filter(|param| {
            let name = param.split('=').next().unwrap_or_default();
            let name = urlencoding::decode(name).map(|n| n.into_owned()).unwrap_or_else(|_| name.to_string());
            let top_level = name.split('[').next().unwrap_or_default();
            !payload.contains_key(top_level)
        })
        .collect();

    let added = build_query(payload);
    if !added.is_empty() {
        params.push(&added);
    }

    let mut out = base.to_string();
    if !params.is_empty() {
        out.push('?');
        out.push_str(&params.join("&"));
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

fn flatten(prefix: &str, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => pairs.push((prefix.to_string(), if *flag { "1" } else { "0" }.to_string())),
        Value::Number(number) => pairs.push((prefix.to_string(), number.to_string())),
        Value::String(text) => pairs.push((prefix.to_string(), text.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(&format!("{prefix}[{index}]"), item, pairs);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten(&format!("{prefix}[{key}]"), item, pairs);
            }
        }
    }
}
