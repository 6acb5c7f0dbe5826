//! The span context value type and its lifecycle log events.

use crate::id::id_to_hex;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Tag key recording the error message of a failed handle/send operation.
pub const ERROR_TAG: &str = "error";

/// A lifecycle event logged on a span, following the classic Zipkin
/// client/server annotation model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEvent {
    /// `cs` - a client initiated an outbound call.
    ClientSend,
    /// `sr` - a server received an inbound message.
    ServerReceive,
    /// `ss` - a server finished handling and is responding.
    ServerSend,
    /// `cr` - a client observed the completion of its outbound call.
    ClientReceive,
}

impl LogEvent {
    /// The short wire/annotation form of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogEvent::ClientSend => "cs",
            LogEvent::ServerReceive => "sr",
            LogEvent::ServerSend => "ss",
            LogEvent::ClientReceive => "cr",
        }
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timestamped lifecycle event on a span.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanLog {
    /// Epoch milliseconds at which the event was recorded.
    pub timestamp: i64,
    /// The recorded event.
    pub event: LogEvent,
}

impl SpanLog {
    /// Records `event` at the current wall-clock time.
    pub fn now(event: LogEvent) -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis(),
            event,
        }
    }
}

/// One span of a distributed trace, as propagated through message metadata.
///
/// This is a plain value: it is constructed transiently by the extractor or
/// the tracer, mutated while a message is being handled or sent, and either
/// discarded or exported when closed. The ambient tracer owns the instance
/// that represents the current span of the executing task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpanContext {
    /// High 64 bits of a 128-bit trace id; zero when only a 64-bit trace id
    /// was ever seen.
    pub trace_id_high: u64,
    /// Low 64 bits of the trace id.
    pub trace_id: u64,
    /// This span's identifier, unique within the trace.
    pub span_id: u64,
    /// Ancestor span ids. At most one entry is set by this crate, but the
    /// field is a sequence for forward compatibility.
    pub parents: Vec<u64>,
    /// Human-readable operation name, typically a destination or a
    /// comma-joined list of queue names.
    pub name: Option<String>,
    /// Opaque identifier of the process that created the span.
    pub process_id: Option<String>,
    /// Whether the span is sampled for export. Unsampled spans still exist
    /// locally to preserve trace-id continuity but are never exported and
    /// never receive extra tags.
    pub exportable: bool,
    /// True when the context originated off-process.
    pub remote: bool,
    /// String tags, unique keys, derived from message headers and payload.
    pub tags: HashMap<String, String>,
    /// Ordered lifecycle events.
    pub logs: Vec<SpanLog>,
}

impl SpanContext {
    /// Starts building a span context.
    pub fn builder() -> SpanContextBuilder {
        SpanContextBuilder::default()
    }

    /// The trace id in its wire form: 32 hex characters when a high word is
    /// present, 16 otherwise.
    pub fn trace_id_string(&self) -> String {
        if self.trace_id_high != 0 {
            format!("{}{}", id_to_hex(self.trace_id_high), id_to_hex(self.trace_id))
        } else {
            id_to_hex(self.trace_id)
        }
    }

    /// The first (and in practice only) parent span id, if any.
    pub fn parent(&self) -> Option<u64> {
        self.parents.first().copied()
    }

    /// Appends a lifecycle event at the current time.
    pub fn log_event(&mut self, event: LogEvent) {
        self.logs.push(SpanLog::now(event));
    }

    /// Whether `event` has already been logged on this span.
    pub fn has_logged(&self, event: LogEvent) -> bool {
        self.logs.iter().any(|log| log.event == event)
    }

    /// Sets a tag, overwriting any previous value for the key.
    pub fn tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Sets a tag only if the key is not already present (first write wins).
    pub fn tag_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.entry(key.into()).or_insert_with(|| value.into());
    }
}

/// Builder for [`SpanContext`].
#[derive(Default)]
pub struct SpanContextBuilder {
    trace_id_high: u64,
    trace_id: u64,
    span_id: u64,
    parents: Vec<u64>,
    name: Option<String>,
    process_id: Option<String>,
    exportable: bool,
    remote: bool,
}

impl SpanContextBuilder {
    /// Sets the high word of a 128-bit trace id.
    pub fn trace_id_high(mut self, trace_id_high: u64) -> Self {
        self.trace_id_high = trace_id_high;
        self
    }

    /// Sets the (low word of the) trace id.
    pub fn trace_id(mut self, trace_id: u64) -> Self {
        self.trace_id = trace_id;
        self
    }

    /// Sets the span id.
    pub fn span_id(mut self, span_id: u64) -> Self {
        self.span_id = span_id;
        self
    }

    /// Appends a parent span id.
    pub fn parent(mut self, parent_id: u64) -> Self {
        self.parents.push(parent_id);
        self
    }

    /// Sets the operation name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the originating process id.
    pub fn process_id(mut self, process_id: impl Into<String>) -> Self {
        self.process_id = Some(process_id.into());
        self
    }

    /// Sets the sampling decision.
    pub fn exportable(mut self, exportable: bool) -> Self {
        self.exportable = exportable;
        self
    }

    /// Marks the context as having originated off-process.
    pub fn remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    /// Builds the span context with empty tags and logs.
    pub fn build(self) -> SpanContext {
        SpanContext {
            trace_id_high: self.trace_id_high,
            trace_id: self.trace_id,
            span_id: self.span_id,
            parents: self.parents,
            name: self.name,
            process_id: self.process_id,
            exportable: self.exportable,
            remote: self.remote,
            tags: HashMap::new(),
            logs: Vec::new(),
        }
    }
}
