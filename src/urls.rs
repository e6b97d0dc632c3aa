//! URL list normalization.
//!
//! Users hand us URL lists in whatever shape their previous workflow step
//! produced: one URL, a pasted column, a CSV cell, a JSON array literal, a
//! native array, or an object with a `url` field. [`classify`] turns a raw
//! value into a [`UrlInput`] variant and [`normalize_urls`] flattens it into
//! a deduplicated, order-preserving list.
//!
//! Classification priority for strings (first match wins):
//!
//! 1. empty after trimming
//! 2. starts with `[` and parses as JSON
//! 3. contains a newline
//! 4. contains a comma
//! 5. contains `" http"` (whitespace-separated URLs)
//! 6. a single candidate
//!
//! Only one separator rule fires, so `"a,b\nc"` splits on newlines only.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::ValidationError;

/// Separator chosen for a delimited string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Newline,
    Comma,
    Whitespace,
}

impl Separator {
    fn split(self, s: &str) -> Vec<&str> {
        match self {
            Separator::Newline => s.split('\n').collect(),
            Separator::Comma => s.split(',').collect(),
            Separator::Whitespace => s.split_whitespace().collect(),
        }
    }
}

/// Shape of a raw URL field value.
#[derive(Debug, Clone, PartialEq)]
pub enum UrlInput<'a> {
    /// One trimmed candidate with no separators.
    SingleString(&'a str),
    /// A trimmed string to split on the given separator.
    DelimitedString(&'a str, Separator),
    /// A string that parsed as JSON; normalized recursively.
    JsonArrayString(Value),
    /// A native array; each element is normalized recursively.
    NativeArray(&'a [Value]),
    /// An object carrying a string `url` field.
    ObjectWithUrlField(&'a str),
    /// Anything else, including empty strings and null.
    Unrecognized,
}

/// Classify a raw value without extracting anything yet.
pub fn classify(value: &Value) -> UrlInput<'_> {
    match value {
        Value::Array(items) => UrlInput::NativeArray(items),
        Value::String(s) => classify_str(s),
        Value::Object(map) => match map.get("url") {
            Some(Value::String(url)) => UrlInput::ObjectWithUrlField(url),
            _ => UrlInput::Unrecognized,
        },
        _ => UrlInput::Unrecognized,
    }
}

fn classify_str(raw: &str) -> UrlInput<'_> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return UrlInput::Unrecognized;
    }

    // Malformed JSON falls through to the separator rules.
    if trimmed.starts_with('[')
        && let Ok(parsed) = serde_json::from_str::<Value>(trimmed)
    {
        return UrlInput::JsonArrayString(parsed);
    }

    if trimmed.contains('\n') {
        UrlInput::DelimitedString(trimmed, Separator::Newline)
    } else if trimmed.contains(',') {
        UrlInput::DelimitedString(trimmed, Separator::Comma)
    } else if trimmed.contains(" http") {
        UrlInput::DelimitedString(trimmed, Separator::Whitespace)
    } else {
        UrlInput::SingleString(trimmed)
    }
}

fn looks_like_url(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.starts_with("http")
}

fn extract(value: &Value, out: &mut Vec<String>) {
    match classify(value) {
        UrlInput::NativeArray(items) => {
            for item in items {
                extract(item, out);
            }
        }
        UrlInput::JsonArrayString(parsed) => extract(&parsed, out),
        UrlInput::DelimitedString(s, separator) => {
            out.extend(
                separator
                    .split(s)
                    .into_iter()
                    .map(str::trim)
                    .filter(|c| looks_like_url(c))
                    .map(str::to_string),
            );
        }
        UrlInput::SingleString(s) => {
            if looks_like_url(s) {
                out.push(s.to_string());
            }
        }
        UrlInput::ObjectWithUrlField(url) => out.push(url.to_string()),
        UrlInput::Unrecognized => {}
    }
}

/// Normalize any supported shape into a deduplicated list of URLs.
///
/// Never fails; unusable input yields an empty list.
pub fn normalize_urls(value: &Value) -> Vec<String> {
    let mut raw = Vec::new();
    extract(value, &mut raw);

    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|url| !url.is_empty())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Normalize a required URL list field, failing when nothing usable remains.
pub fn require_urls(value: Option<&Value>, field: &str) -> Result<Vec<String>, ValidationError> {
    let urls = value.map(normalize_urls).unwrap_or_default();
    if urls.is_empty() {
        return Err(ValidationError::NoUrls {
            field: field.to_string(),
        });
    }
    Ok(urls)
}

/// Normalize an optional URL list field. `None` means "omit the field".
pub fn optional_urls(value: Option<&Value>) -> Option<Vec<String>> {
    let urls = value.map(normalize_urls).unwrap_or_default();
    if urls.is_empty() { None } else { Some(urls) }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ab() -> Vec<String> {
        vec!["https://a.com".to_string(), "https://b.com".to_string()]
    }

    #[test]
    fn every_encoding_yields_same_list() {
        let inputs = [
            json!("https://a.com,https://b.com"),
            json!("https://a.com\nhttps://b.com"),
            json!("https://a.com https://b.com"),
            json!(r#"["https://a.com","https://b.com"]"#),
            json!(["https://a.com", "https://b.com"]),
        ];
        for input in inputs {
            assert_eq!(normalize_urls(&input), ab(), "input: {input}");
        }
    }

    #[test]
    fn clean_array_is_idempotent() {
        let once = normalize_urls(&json!(["https://a.com", "https://b.com", "https://a.com"]));
        let twice = normalize_urls(&json!(once.clone()));
        assert_eq!(once, twice);
        assert_eq!(once, ab());
    }

    #[test]
    fn duplicates_keep_first_seen_order() {
        let urls = normalize_urls(&json!("https://b.com, https://a.com, https://b.com"));
        assert_eq!(urls, vec!["https://b.com", "https://a.com"]);
    }

    #[test]
    fn newline_wins_over_comma() {
        // Only the newline rule fires; the first line keeps its comma.
        let urls = normalize_urls(&json!("https://a.com,https://x.com\nhttps://b.com"));
        assert_eq!(urls, vec!["https://a.com,https://x.com", "https://b.com"]);
        assert_eq!(
            classify(&json!("a,b\nc")),
            UrlInput::DelimitedString("a,b\nc", Separator::Newline)
        );
    }

    #[test]
    fn comma_wins_over_whitespace() {
        let urls = normalize_urls(&json!("https://a.com https://x.com, https://b.com"));
        assert_eq!(urls, vec!["https://a.com https://x.com", "https://b.com"]);
    }

    #[test]
    fn nested_single_element_arrays_flatten() {
        let urls = normalize_urls(&json!([["https://a.com"], [["https://b.com"]]]));
        assert_eq!(urls, ab());
    }

    #[test]
    fn array_elements_may_be_delimited_strings() {
        let urls = normalize_urls(&json!(["https://a.com\nhttps://b.com", "https://a.com"]));
        assert_eq!(urls, ab());
    }

    #[test]
    fn malformed_json_falls_through() {
        let input = json!("[https://a.com, https://b.com");
        assert!(matches!(
            classify(&input),
            UrlInput::DelimitedString(_, Separator::Comma)
        ));
        // "[https://a.com" does not start with http, so only b survives.
        assert_eq!(normalize_urls(&input), vec!["https://b.com"]);
    }

    #[test]
    fn json_array_of_objects() {
        let input = json!(r#"[{"url":"https://a.com"},{"url":"https://b.com"}]"#);
        assert_eq!(normalize_urls(&input), ab());
    }

    #[test]
    fn object_with_url_field() {
        assert_eq!(
            normalize_urls(&json!({"url": "https://a.com", "title": "A"})),
            vec!["https://a.com"]
        );
        assert_eq!(classify(&json!({"url": 42})), UrlInput::Unrecognized);
    }

    #[test]
    fn non_urls_are_dropped() {
        assert!(normalize_urls(&json!("example.com")).is_empty());
        assert_eq!(
            normalize_urls(&json!("ftp://x.com, https://a.com, ")),
            vec!["https://a.com"]
        );
    }

    #[test]
    fn empty_and_unrecognized_inputs() {
        assert!(normalize_urls(&json!("   ")).is_empty());
        assert!(normalize_urls(&Value::Null).is_empty());
        assert!(normalize_urls(&json!(42)).is_empty());
        assert!(normalize_urls(&json!({})).is_empty());
        assert!(normalize_urls(&json!([])).is_empty());
    }

    #[test]
    fn single_url_is_trimmed() {
        assert_eq!(
            classify(&json!("  https://a.com  ")),
            UrlInput::SingleString("https://a.com")
        );
    }

    #[test]
    fn require_urls_rejects_empty() {
        let err = require_urls(Some(&json!("not a url")), "urls").unwrap_err();
        assert_eq!(
            err,
            ValidationError::NoUrls {
                field: "urls".into()
            }
        );
        assert!(require_urls(None, "urls").is_err());
        assert_eq!(require_urls(Some(&json!("https://a.com")), "urls").unwrap().len(), 1);
    }

    #[test]
    fn optional_urls_omits_empty() {
        assert_eq!(optional_urls(Some(&json!(""))), None);
        assert_eq!(optional_urls(None), None);
        assert_eq!(
            optional_urls(Some(&json!(["https://a.com"]))),
            Some(vec!["https://a.com".to_string()])
        );
    }
}
