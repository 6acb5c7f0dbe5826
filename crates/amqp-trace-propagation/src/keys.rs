//! Configuration of the tag-enrichment policy.

/// Names and prefixes used when deriving span tags from a message.
///
/// `headers` lists the application header names of interest: for each one
/// present on an outbound message, the injector adds a tag keyed by
/// `prefix` + the lowercased header name. Payload tags use the two fixed
/// keys below.
#[derive(Clone, Debug)]
pub struct TraceKeys {
    prefix: String,
    headers: Vec<String>,
    payload_type_key: String,
    payload_size_key: String,
}

impl Default for TraceKeys {
    fn default() -> Self {
        Self {
            prefix: "message/".to_string(),
            headers: Vec::new(),
            payload_type_key: "message/payload/type".to_string(),
            payload_size_key: "message/payload/size".to_string(),
        }
    }
}

impl TraceKeys {
    /// Creates the default key set with no headers of interest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header name whose value should be tagged onto sampled spans.
    pub fn header(mut self, name: impl Into<String>) -> Self {
        self.headers.push(name.into());
        self
    }

    /// Overrides the tag key prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// The configured header names of interest.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// The tag key for a given header name.
    pub fn tag_key(&self, header_name: &str) -> String {
        format!("{}{}", self.prefix, header_name.to_lowercase())
    }

    /// The tag key recording the payload type.
    pub fn payload_type_key(&self) -> &str {
        &self.payload_type_key
    }

    /// The tag key recording the payload size.
    pub fn payload_size_key(&self) -> &str {
        &self.payload_size_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys() {
        let keys = TraceKeys::default();
        assert_eq!(keys.payload_type_key(), "message/payload/type");
        assert_eq!(keys.payload_size_key(), "message/payload/size");
        assert!(keys.headers().is_empty());
    }

    #[test]
    fn test_tag_key_lowercases_header_name() {
        let keys = TraceKeys::new().header("X-Request-Id");
        assert_eq!(keys.tag_key("X-Request-Id"), "message/x-request-id");
    }
}
