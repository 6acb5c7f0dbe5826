//! Writes a span's identity, sampling decision and derived tags onto a
//! message's metadata.

use crate::accessor::HeaderAccessor;
use crate::error::Result;
use crate::headers::{
    CURRENT_SPAN, HeaderValue, LEGACY, MessageCarrier, PRIMARY, Payload, SPAN_NOT_SAMPLED,
    SPAN_SAMPLED,
};
use crate::id::id_to_hex;
use crate::keys::TraceKeys;
use crate::span::SpanContext;

/// Payload-type tag value for textual bodies.
const PAYLOAD_TYPE_TEXT: &str = "string";

/// Payload-type tag value for opaque byte bodies.
const PAYLOAD_TYPE_BYTES: &str = "bytes";

/// Injects a span into message metadata, always through the primary header
/// namespace.
///
/// When no span is supplied, the message is marked "not sampled" so a
/// downstream consumer can tell a deliberate negative sampling decision
/// apart from traffic that was never traced - propagating that decision
/// takes exactly one header.
#[derive(Clone, Debug, Default)]
pub struct SpanInjector {
    keys: TraceKeys,
}

impl SpanInjector {
    /// Creates an injector with the given tag-enrichment keys.
    pub fn new(keys: TraceKeys) -> Self {
        Self { keys }
    }

    /// Writes `span` (or the not-sampled marker when absent) onto `message`.
    ///
    /// For an exportable span the span itself is also enriched: configured
    /// headers of interest and payload type/size become tags, first write
    /// wins per key. Unsampled spans carry only trace id, span id and the
    /// negative sampling marker on the wire.
    pub fn inject<M: MessageCarrier>(
        &self,
        span: Option<&mut SpanContext>,
        message: &mut M,
    ) -> Result<()> {
        match span {
            Some(span) => self.add_headers(span, message),
            None => mark_not_sampled(message),
        }
    }

    fn add_headers<M: MessageCarrier>(&self, span: &mut SpanContext, message: &mut M) -> Result<()> {
        if span.exportable {
            self.enrich_tags(span, message);
        }

        let mut accessor = HeaderAccessor::new(message.headers_mut());
        add_header(&mut accessor, PRIMARY.trace_id, &span.trace_id_string())?;
        add_header(&mut accessor, PRIMARY.span_id, &id_to_hex(span.span_id))?;

        if span.exportable {
            if let Some(parent) = span.parent() {
                add_header(&mut accessor, PRIMARY.parent_id, &id_to_hex(parent))?;
            }
            if let Some(name) = span.name.clone() {
                add_header(&mut accessor, PRIMARY.span_name, &name)?;
            }
            if let Some(process_id) = span.process_id.clone() {
                add_header(&mut accessor, PRIMARY.process_id, &process_id)?;
            }
            add_header(&mut accessor, PRIMARY.sampled, SPAN_SAMPLED)?;
        } else {
            add_header(&mut accessor, PRIMARY.sampled, SPAN_NOT_SAMPLED)?;
        }

        // Same-process consumers can recover the span directly instead of
        // re-parsing the wire headers.
        accessor.set(CURRENT_SPAN, Some(HeaderValue::Span(span.clone())))?;
        Ok(())
    }

    fn enrich_tags<M: MessageCarrier>(&self, span: &mut SpanContext, message: &M) {
        for name in self.keys.headers() {
            if let Some(value) = message.headers().get(name) {
                span.tag_if_absent(self.keys.tag_key(name), value.to_tag_value());
            }
        }

        match message.payload() {
            Payload::Text(text) => {
                span.tag_if_absent(self.keys.payload_type_key(), PAYLOAD_TYPE_TEXT);
                span.tag_if_absent(self.keys.payload_size_key(), text.chars().count().to_string());
            }
            Payload::Bytes(bytes) => {
                span.tag_if_absent(self.keys.payload_type_key(), PAYLOAD_TYPE_BYTES);
                span.tag_if_absent(self.keys.payload_size_key(), bytes.len().to_string());
            }
            Payload::None => {}
        }
    }
}

fn mark_not_sampled<M: MessageCarrier>(message: &mut M) -> Result<()> {
    let already_sampled = NAMESPACE_SAMPLED_KEYS.iter().any(|name| {
        message
            .headers()
            .get(*name)
            .and_then(HeaderValue::as_text)
            .is_some_and(|value| value == SPAN_SAMPLED)
    });
    if !already_sampled {
        let mut accessor = HeaderAccessor::new(message.headers_mut());
        accessor.set_text(PRIMARY.sampled, SPAN_NOT_SAMPLED)?;
    }
    Ok(())
}

const NAMESPACE_SAMPLED_KEYS: [&str; 2] = [PRIMARY.sampled, LEGACY.sampled];

/// Writes a header unless the value is blank; absence beats empty string.
fn add_header(accessor: &mut HeaderAccessor<'_>, name: &str, value: &str) -> Result<()> {
    if !value.trim().is_empty() {
        accessor.set_text(name, value)?;
    }
    Ok(())
}
