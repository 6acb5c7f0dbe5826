//! Header names, value types and the message-carrier seam.
//!
//! Trace identity travels in a message's string-keyed metadata map. Two
//! parallel header namespaces are honoured on read - the primary `X-B3-*`
//! style names and a legacy `span*` style set kept for older producers -
//! while writes always use the primary namespace.

use crate::span::SpanContext;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One bundle of header names carrying a span's identity on the wire.
#[derive(Clone, Copy, Debug)]
pub struct HeaderNamespace {
    /// Trace id header name.
    pub trace_id: &'static str,
    /// Span id header name.
    pub span_id: &'static str,
    /// Parent span id header name.
    pub parent_id: &'static str,
    /// Sampling decision header name.
    pub sampled: &'static str,
    /// Span name header name.
    pub span_name: &'static str,
    /// Originating process id header name.
    pub process_id: &'static str,
}

/// Primary namespace; every outbound write uses these names.
pub const PRIMARY: HeaderNamespace = HeaderNamespace {
    trace_id: "X-B3-TraceId",
    span_id: "X-B3-SpanId",
    parent_id: "X-B3-ParentSpanId",
    sampled: "X-B3-Sampled",
    span_name: "X-Span-Name",
    process_id: "X-Process-Id",
};

/// Legacy namespace, honoured on read only.
pub const LEGACY: HeaderNamespace = HeaderNamespace {
    trace_id: "spanTraceId",
    span_id: "spanId",
    parent_id: "spanParentSpanId",
    sampled: "spanSampled",
    span_name: "spanName",
    process_id: "spanProcessId",
};

/// Candidate namespaces in extraction priority order.
pub const NAMESPACES: [&HeaderNamespace; 2] = [&PRIMARY, &LEGACY];

/// Marker header set on a message the first time it leaves a client, so a
/// later send of the same message is recognised as a relay/reply leg.
pub const MESSAGE_SENT: &str = "messageSent";

/// Marker value for [`MESSAGE_SENT`].
pub const MESSAGE_SENT_VALUE: &str = "true";

/// Reserved header carrying the span value itself for same-process
/// consumers. Never meaningful across processes.
pub const CURRENT_SPAN: &str = "currentSpan";

/// Sampled-flag value meaning "sampled".
pub const SPAN_SAMPLED: &str = "1";

/// Sampled-flag value meaning "deliberately not sampled".
pub const SPAN_NOT_SAMPLED: &str = "0";

/// A single metadata entry value.
///
/// Broker clients allow richly typed header values; the propagation layer
/// itself only ever writes [`HeaderValue::Text`] and the reserved
/// [`HeaderValue::Span`] passthrough, but it must be able to read (and
/// stringify, for tag enrichment) whatever an application put there.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HeaderValue {
    /// A string value.
    Text(String),
    /// A boolean value.
    Bool(bool),
    /// An integer value.
    Int(i64),
    /// An opaque byte value.
    Bytes(Vec<u8>),
    /// An explicitly null value.
    Null,
    /// The current span, passed through in-process under [`CURRENT_SPAN`].
    Span(SpanContext),
}

impl HeaderValue {
    /// The value as a string slice, when it is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The stringified form used when enriching span tags from headers.
    /// Null values become the literal string `"null"`.
    pub fn to_tag_value(&self) -> String {
        match self {
            HeaderValue::Text(s) => s.clone(),
            HeaderValue::Bool(b) => b.to_string(),
            HeaderValue::Int(i) => i.to_string(),
            HeaderValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            HeaderValue::Null => "null".to_string(),
            HeaderValue::Span(span) => span.trace_id_string(),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Text(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Text(value)
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        HeaderValue::Int(value)
    }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self {
        HeaderValue::Bool(value)
    }
}

/// A message's metadata map.
pub type HeaderMap = HashMap<String, HeaderValue>;

/// Read-only view of a message body for payload tag enrichment.
#[derive(Clone, Copy, Debug)]
pub enum Payload<'a> {
    /// No payload.
    None,
    /// A textual payload; size is its character count.
    Text(&'a str),
    /// An opaque byte payload; size is its byte length.
    Bytes(&'a [u8]),
}

/// The seam between this crate and the collaborator-owned message type.
///
/// The core never owns a message's lifecycle; it only reads the body for
/// payload tags and reads/mutates the metadata map. One message is handled
/// or sent by exactly one call at a time, so implementations need no
/// interior synchronisation.
pub trait MessageCarrier {
    /// The message's metadata map.
    fn headers(&self) -> &HeaderMap;

    /// Mutable access to the metadata map.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// A view of the message body for payload tag derivation.
    fn payload(&self) -> Payload<'_>;
}
