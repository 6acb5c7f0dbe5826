//! Reconstructs a parent span context from a message's trace headers.

use crate::error::Result;
use crate::headers::{HeaderMap, HeaderNamespace, HeaderValue, MessageCarrier, NAMESPACES, SPAN_SAMPLED};
use crate::id::{hex_to_id, hex_to_id_at};
use crate::span::SpanContext;
use tracing::warn;

/// Extracts a remote [`SpanContext`] from message metadata.
///
/// Both the primary and the legacy header namespaces are checked, primary
/// preferred. A namespace matches only when it carries both a trace id and
/// a span id; anything less is treated as untraced traffic and yields
/// `None`, which is the expected common case.
///
/// Malformed identifiers are handled fail-soft: the extraction logs a
/// warning and behaves as if no context were present, so a corrupt header
/// can never block message handling.
#[derive(Clone, Debug, Default)]
pub struct SpanExtractor;

impl SpanExtractor {
    /// Creates a new extractor.
    pub fn new() -> Self {
        Self
    }

    /// Reads the message's headers and reconstructs the propagated span
    /// context, or returns `None` when no (valid) trace is present.
    ///
    /// This is a pure read; the message is never mutated.
    pub fn extract<M: MessageCarrier>(&self, message: &M) -> Option<SpanContext> {
        let headers = message.headers();
        let namespace = NAMESPACES
            .iter()
            .find(|ns| headers.contains_key(ns.trace_id) && headers.contains_key(ns.span_id))?;

        match read_span(headers, *namespace) {
            Ok(span) => Some(span),
            Err(err) => {
                warn!(namespace = namespace.trace_id, %err, "ignoring malformed trace headers");
                None
            }
        }
    }
}

fn read_span(headers: &HeaderMap, ns: &HeaderNamespace) -> Result<SpanContext> {
    // Namespace match guarantees presence; a non-string value decodes to
    // an empty string and fails identifier parsing below.
    let trace_id_hex = text(headers, ns.trace_id).unwrap_or_default();
    let span_id_hex = text(headers, ns.span_id).unwrap_or_default();

    let mut builder = SpanContext::builder()
        .trace_id_high(if trace_id_hex.len() == 32 {
            hex_to_id_at(trace_id_hex, 0)?
        } else {
            0
        })
        .trace_id(hex_to_id(trace_id_hex)?)
        .span_id(hex_to_id(span_id_hex)?)
        .exportable(text(headers, ns.sampled) == Some(SPAN_SAMPLED))
        .remote(true);

    if let Some(name) = text(headers, ns.span_name) {
        builder = builder.name(name);
    }
    if let Some(process_id) = text(headers, ns.process_id) {
        builder = builder.process_id(process_id);
    }
    if let Some(parent_hex) = text(headers, ns.parent_id) {
        builder = builder.parent(hex_to_id(parent_hex)?);
    }

    Ok(builder.build())
}

fn text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(HeaderValue::as_text)
}
