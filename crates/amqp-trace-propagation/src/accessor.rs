//! Single-use, per-message view over a message's metadata map.

use crate::error::{PropagationError, Result};
use crate::headers::{HeaderMap, HeaderValue};

/// A write-tracking view over one message's headers.
///
/// Construct one accessor per message per call and discard it afterwards;
/// it holds nothing beyond the map reference and a dirty flag, and it is
/// not meant to be shared across messages or threads.
///
/// Only [`HeaderValue::Text`] and the reserved [`HeaderValue::Span`]
/// passthrough may be stored; any other value type is rejected with
/// [`PropagationError::InvalidHeaderValue`].
pub struct HeaderAccessor<'a> {
    headers: &'a mut HeaderMap,
    modified: bool,
}

impl<'a> HeaderAccessor<'a> {
    /// Wraps a message's metadata map.
    pub fn new(headers: &'a mut HeaderMap) -> Self {
        Self {
            headers,
            modified: false,
        }
    }

    /// Returns the value stored under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// Returns the textual value stored under `name`, if the entry exists
    /// and is a string.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(HeaderValue::as_text)
    }

    /// Whether a header named `name` exists.
    pub fn has(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// Sets or removes a header.
    ///
    /// `None` removes the key (marking the view dirty if it was present).
    /// `Some(value)` stores the value if it differs from the current one.
    pub fn set(&mut self, name: &str, value: Option<HeaderValue>) -> Result<()> {
        match value {
            Some(value) => {
                verify_type(name, &value)?;
                if self.headers.get(name) != Some(&value) {
                    self.headers.insert(name.to_string(), value);
                    self.modified = true;
                }
            }
            None => {
                if self.headers.remove(name).is_some() {
                    self.modified = true;
                }
            }
        }
        Ok(())
    }

    /// Convenience for storing a string value.
    pub fn set_text(&mut self, name: &str, value: &str) -> Result<()> {
        self.set(name, Some(HeaderValue::Text(value.to_string())))
    }

    /// True if any `set` call changed the map.
    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

fn verify_type(name: &str, value: &HeaderValue) -> Result<()> {
    match value {
        HeaderValue::Text(_) | HeaderValue::Span(_) => Ok(()),
        _ => Err(PropagationError::InvalidHeaderValue(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SpanContext;

    #[test]
    fn test_set_new_header_marks_dirty() {
        let mut headers = HeaderMap::new();
        let mut accessor = HeaderAccessor::new(&mut headers);

        assert!(!accessor.is_modified());
        accessor.set_text("X-B3-TraceId", "00000000000001c8").unwrap();
        assert!(accessor.is_modified());
        assert_eq!(accessor.get_text("X-B3-TraceId"), Some("00000000000001c8"));
    }

    #[test]
    fn test_set_same_value_is_not_a_modification() {
        let mut headers = HeaderMap::new();
        headers.insert("k".to_string(), HeaderValue::from("v"));

        let mut accessor = HeaderAccessor::new(&mut headers);
        accessor.set_text("k", "v").unwrap();
        assert!(!accessor.is_modified());

        accessor.set_text("k", "other").unwrap();
        assert!(accessor.is_modified());
    }

    #[test]
    fn test_set_none_removes_header() {
        let mut headers = HeaderMap::new();
        headers.insert("k".to_string(), HeaderValue::from("v"));

        let mut accessor = HeaderAccessor::new(&mut headers);
        accessor.set("k", None).unwrap();
        assert!(accessor.is_modified());
        assert!(!accessor.has("k"));
    }

    #[test]
    fn test_remove_absent_header_is_noop() {
        let mut headers = HeaderMap::new();
        let mut accessor = HeaderAccessor::new(&mut headers);
        accessor.set("missing", None).unwrap();
        assert!(!accessor.is_modified());
    }

    #[test]
    fn test_rejects_non_string_values() {
        let mut headers = HeaderMap::new();
        let mut accessor = HeaderAccessor::new(&mut headers);

        let err = accessor.set("count", Some(HeaderValue::Int(3))).unwrap_err();
        assert!(matches!(err, PropagationError::InvalidHeaderValue(name) if name == "count"));
        assert!(!accessor.is_modified());
        assert!(!accessor.has("count"));
    }

    #[test]
    fn test_accepts_span_passthrough_value() {
        let mut headers = HeaderMap::new();
        let mut accessor = HeaderAccessor::new(&mut headers);

        let span = SpanContext::builder().trace_id(1).span_id(2).build();
        accessor
            .set("currentSpan", Some(HeaderValue::Span(span)))
            .unwrap();
        assert!(accessor.is_modified());
        assert!(accessor.has("currentSpan"));
    }
}
