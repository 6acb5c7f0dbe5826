//! An owned broker message with a body and a typed header map.

use amqp_trace_propagation::{HeaderMap, HeaderValue, MessageCarrier, Payload};

/// A broker-style message: opaque body bytes plus string-keyed metadata.
///
/// The propagation core never owns message lifecycle; this type plays the
/// role of the broker client's message so tests and examples have something
/// to extract from and inject into.
#[derive(Clone, Debug, Default)]
pub struct Message {
    body: Vec<u8>,
    content_type: Option<String>,
    headers: HeaderMap,
}

impl Message {
    /// Creates a message with the given byte body and no headers.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
            headers: HeaderMap::new(),
        }
    }

    /// Starts building a message.
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// The message body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The declared content type, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The textual value of a header, if present and a string. Convenience
    /// for assertions.
    pub fn header_text(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(HeaderValue::as_text)
    }

    fn is_textual(&self) -> bool {
        self.content_type.as_deref().is_some_and(|ct| {
            ct.starts_with("text/") || ct == "application/json" || ct == "application/xml"
        })
    }
}

impl MessageCarrier for Message {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn payload(&self) -> Payload<'_> {
        if self.body.is_empty() {
            return Payload::None;
        }
        if self.is_textual() {
            if let Ok(text) = std::str::from_utf8(&self.body) {
                return Payload::Text(text);
            }
        }
        Payload::Bytes(&self.body)
    }
}

/// Builder for [`Message`].
#[derive(Default)]
pub struct MessageBuilder {
    body: Vec<u8>,
    content_type: Option<String>,
    headers: HeaderMap,
}

impl MessageBuilder {
    /// Sets an opaque byte body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a textual body with content type `application/json`.
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into().into_bytes();
        self.content_type = Some("application/json".to_string());
        self
    }

    /// Sets the content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Builds the message.
    pub fn build(self) -> Message {
        Message {
            body: self.body,
            content_type: self.content_type,
            headers: self.headers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_payload_view() {
        let message = Message::builder().text_body("hello").build();
        match message.payload() {
            Payload::Text(text) => assert_eq!(text, "hello"),
            other => panic!("expected text payload, got {other:?}"),
        }
    }

    #[test]
    fn test_binary_payload_view() {
        let message = Message::new(vec![0u8, 159, 146, 150]);
        assert!(matches!(message.payload(), Payload::Bytes(_)));
    }

    #[test]
    fn test_empty_body_has_no_payload() {
        let message = Message::default();
        assert!(matches!(message.payload(), Payload::None));
    }

    #[test]
    fn test_non_utf8_text_content_falls_back_to_bytes() {
        let message = Message::builder()
            .body(vec![0xff, 0xfe])
            .content_type("text/plain")
            .build();
        assert!(matches!(message.payload(), Payload::Bytes(_)));
    }

    #[test]
    fn test_builder_headers() {
        let message = Message::builder()
            .header("X-Request-Id", "req-1")
            .header("X-Retries", 3i64)
            .build();
        assert_eq!(message.header_text("X-Request-Id"), Some("req-1"));
        assert_eq!(
            message.headers().get("X-Retries"),
            Some(&HeaderValue::Int(3))
        );
    }
}
