//! The span lifecycle state machine around receiving and sending messages.

use crate::accessor::HeaderAccessor;
use crate::error::Result;
use crate::extractor::SpanExtractor;
use crate::headers::{MESSAGE_SENT, MESSAGE_SENT_VALUE, MessageCarrier};
use crate::injector::SpanInjector;
use crate::span::{ERROR_TAG, LogEvent, SpanContext};
use crate::tracer::Tracer;
use std::error::Error;
use tracing::debug;

/// Span name for outbound sends whose destination cannot be resolved.
///
/// Callers should resolve the real exchange/queue name whenever it is
/// obtainable and fall back to this sentinel otherwise.
pub const DESTINATION_UNKNOWN: &str = "unknown";

/// Sequences span creation, continuation, event logging, error tagging and
/// closing around the receive-then-optionally-relay-then-reply pattern of
/// message brokers.
///
/// The interception layer wraps the underlying handle/send call and pairs
/// every `before_*` with exactly one `after_*` on every exit path; a
/// skipped `after_*` leaks an attached span. Failures of the wrapped call
/// are only observed here for error tagging - the caller always re-raises
/// them unchanged.
#[derive(Clone, Debug, Default)]
pub struct SpanLifecycleManager {
    extractor: SpanExtractor,
    injector: SpanInjector,
}

impl SpanLifecycleManager {
    /// Creates a manager from its injector and extractor parts.
    pub fn new(injector: SpanInjector, extractor: SpanExtractor) -> Self {
        Self { extractor, injector }
    }

    /// Called before an inbound message is handled.
    ///
    /// Extracts the propagated parent context (logging `server-receive` on
    /// it when present) and asks the tracer to continue it, or to start a
    /// fresh root span for untraced traffic. Returns a snapshot of the new
    /// current span.
    pub fn before_handle<T: Tracer, M: MessageCarrier>(
        &self,
        tracer: &mut T,
        message: &M,
    ) -> SpanContext {
        let mut context = self.extractor.extract(message);
        if let Some(ctx) = context.as_mut() {
            ctx.log_event(LogEvent::ServerReceive);
        } else {
            debug!("no trace context on inbound message; starting fresh trace");
        }
        tracer.continue_span(context).clone()
    }

    /// Called after an inbound message was handled, successfully or not.
    ///
    /// Logs `server-send`, tags the error message when the handler failed,
    /// and detaches the current span - handling is a sub-operation of the
    /// surrounding unit of work, so the span is not finalised here.
    pub fn after_handle<T: Tracer>(&self, tracer: &mut T, error: Option<&dyn Error>) {
        if let Some(current) = tracer.current_span_mut() {
            current.log_event(LogEvent::ServerSend);
        }
        tag_error(tracer, error);
        if tracer.is_tracing() {
            tracer.detach();
        }
    }

    /// Called before a message is sent to `destination`.
    ///
    /// The parent is the ambient current span when one exists; otherwise
    /// the message's own headers are consulted, which covers a reply sent
    /// from a handler that never had an ambient span. A fresh child span is
    /// created, the client/server leg is detected via the sent marker, and
    /// the span is injected into the message. Returns a snapshot of the
    /// created span.
    pub fn before_send<T: Tracer, M: MessageCarrier>(
        &self,
        tracer: &mut T,
        message: &mut M,
        destination: &str,
    ) -> Result<SpanContext> {
        let parent = if tracer.is_tracing() {
            tracer.current_span().cloned()
        } else {
            self.extractor.extract(message)
        };

        let relay = message.headers().contains_key(MESSAGE_SENT);
        if !relay {
            let mut accessor = HeaderAccessor::new(message.headers_mut());
            accessor.set_text(MESSAGE_SENT, MESSAGE_SENT_VALUE)?;
        }

        let span = tracer.create_span(destination, parent);
        span.log_event(if relay {
            // A marked message is a relay or reply: this leg is a server
            // responding, not a fresh client call.
            LogEvent::ServerReceive
        } else {
            LogEvent::ClientSend
        });

        self.injector.inject(Some(&mut *span), message)?;
        Ok(span.clone())
    }

    /// Called after a send completed, successfully or not.
    ///
    /// Completes the observed cycle - `server-send` when this span had
    /// already logged `server-receive`, `client-receive` otherwise - tags
    /// the error when present, and closes the span. Closing always happens,
    /// whichever branch was taken.
    pub fn after_send<T: Tracer>(&self, tracer: &mut T, error: Option<&dyn Error>) {
        if let Some(current) = tracer.current_span_mut() {
            if current.has_logged(LogEvent::ServerReceive) {
                current.log_event(LogEvent::ServerSend);
            } else {
                current.log_event(LogEvent::ClientReceive);
            }
        }
        tag_error(tracer, error);
        tracer.close();
    }

    /// Receive-path variant for broker-delivered messages associated with
    /// multiple destinations (multi-queue listeners).
    ///
    /// Like [`before_handle`](Self::before_handle), but the new span is
    /// created under a synthesized name: the destination names joined by
    /// commas in declaration order.
    pub fn extract_and_continue_span<T: Tracer, M: MessageCarrier>(
        &self,
        tracer: &mut T,
        message: &M,
        destinations: &[&str],
    ) -> SpanContext {
        let mut context = self.extractor.extract(message);
        if let Some(ctx) = context.as_mut() {
            ctx.log_event(LogEvent::ServerReceive);
        }
        let name = destinations.join(",");
        tracer.create_span(&name, context).clone()
    }

    /// Injects whatever span is currently ambient into `message`, without
    /// creating a new one. Used when relaying a message that does not start
    /// a new logical span; an absent ambient span marks the message "not
    /// sampled".
    pub fn inject_current_span<T: Tracer, M: MessageCarrier>(
        &self,
        tracer: &mut T,
        message: &mut M,
    ) -> Result<()> {
        self.injector.inject(tracer.current_span_mut(), message)
    }
}

/// Tags the error message on the current span. Unsampled spans never
/// receive tags.
fn tag_error<T: Tracer>(tracer: &mut T, error: Option<&dyn Error>) {
    if let Some(err) = error {
        if let Some(span) = tracer.current_span_mut() {
            if span.exportable {
                span.tag(ERROR_TAG, err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::{HeaderMap, HeaderValue, PRIMARY, Payload};
    use std::fmt;

    /// Minimal stack tracer used to observe manager behaviour.
    #[derive(Default)]
    struct StackTracer {
        stack: Vec<SpanContext>,
        closed: Vec<SpanContext>,
        detached: Vec<SpanContext>,
        next_id: u64,
    }

    impl StackTracer {
        fn new() -> Self {
            Self {
                next_id: 0x1000,
                ..Self::default()
            }
        }

        fn next_id(&mut self) -> u64 {
            self.next_id += 1;
            self.next_id
        }
    }

    impl Tracer for StackTracer {
        fn create_span(&mut self, name: &str, parent: Option<SpanContext>) -> &mut SpanContext {
            let span_id = self.next_id();
            let span = match parent {
                Some(parent) => SpanContext::builder()
                    .trace_id_high(parent.trace_id_high)
                    .trace_id(parent.trace_id)
                    .span_id(span_id)
                    .parent(parent.span_id)
                    .name(name)
                    .exportable(parent.exportable)
                    .build(),
                None => SpanContext::builder()
                    .trace_id(span_id)
                    .span_id(span_id)
                    .name(name)
                    .exportable(true)
                    .build(),
            };
            self.stack.push(span);
            self.stack.last_mut().expect("span just pushed")
        }

        fn continue_span(&mut self, context: Option<SpanContext>) -> &mut SpanContext {
            let span = context.unwrap_or_else(|| {
                let id = self.next_id();
                SpanContext::builder().trace_id(id).span_id(id).exportable(true).build()
            });
            self.stack.push(span);
            self.stack.last_mut().expect("span just pushed")
        }

        fn current_span(&self) -> Option<&SpanContext> {
            self.stack.last()
        }

        fn current_span_mut(&mut self) -> Option<&mut SpanContext> {
            self.stack.last_mut()
        }

        fn detach(&mut self) -> Option<SpanContext> {
            let span = self.stack.pop();
            if let Some(span) = span.clone() {
                self.detached.push(span);
            }
            span
        }

        fn close(&mut self) -> Option<SpanContext> {
            let span = self.stack.pop();
            if let Some(span) = span.clone() {
                self.closed.push(span);
            }
            span
        }
    }

    #[derive(Debug)]
    struct HandlerError(&'static str);

    impl fmt::Display for HandlerError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl Error for HandlerError {}

    struct TestMessage {
        headers: HeaderMap,
    }

    impl TestMessage {
        fn untraced() -> Self {
            Self {
                headers: HeaderMap::new(),
            }
        }

        fn traced(trace_id: &str, span_id: &str) -> Self {
            let mut headers = HeaderMap::new();
            headers.insert(PRIMARY.trace_id.to_string(), HeaderValue::from(trace_id));
            headers.insert(PRIMARY.span_id.to_string(), HeaderValue::from(span_id));
            headers.insert(PRIMARY.sampled.to_string(), HeaderValue::from("1"));
            Self { headers }
        }
    }

    impl MessageCarrier for TestMessage {
        fn headers(&self) -> &HeaderMap {
            &self.headers
        }

        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        fn payload(&self) -> Payload<'_> {
            Payload::None
        }
    }

    fn manager() -> SpanLifecycleManager {
        SpanLifecycleManager::default()
    }

    #[test]
    fn test_before_handle_continues_remote_span() {
        let mut tracer = StackTracer::new();
        let message = TestMessage::traced("0000000000000456", "0000000000000123");

        let span = manager().before_handle(&mut tracer, &message);

        assert_eq!(span.trace_id, 0x456);
        assert_eq!(span.span_id, 0x123);
        assert!(span.has_logged(LogEvent::ServerReceive));
        assert!(tracer.is_tracing());
    }

    #[test]
    fn test_before_handle_untraced_starts_fresh_root() {
        let mut tracer = StackTracer::new();
        let message = TestMessage::untraced();

        let span = manager().before_handle(&mut tracer, &message);

        assert!(!span.has_logged(LogEvent::ServerReceive));
        assert_eq!(span.trace_id, span.span_id);
        assert!(tracer.is_tracing());
    }

    #[test]
    fn test_after_handle_logs_server_send_and_detaches() {
        let mut tracer = StackTracer::new();
        let message = TestMessage::traced("0000000000000456", "0000000000000123");
        let m = manager();

        m.before_handle(&mut tracer, &message);
        m.after_handle(&mut tracer, None);

        assert!(!tracer.is_tracing());
        assert_eq!(tracer.detached.len(), 1);
        assert!(tracer.closed.is_empty());
        let detached = &tracer.detached[0];
        assert!(detached.has_logged(LogEvent::ServerSend));
        assert!(!detached.tags.contains_key(ERROR_TAG));
    }

    #[test]
    fn test_after_handle_tags_error() {
        let mut tracer = StackTracer::new();
        let message = TestMessage::traced("0000000000000456", "0000000000000123");
        let m = manager();

        m.before_handle(&mut tracer, &message);
        m.after_handle(&mut tracer, Some(&HandlerError("boom")));

        assert_eq!(
            tracer.detached[0].tags.get(ERROR_TAG).map(String::as_str),
            Some("boom")
        );
    }

    #[test]
    fn test_after_handle_without_span_is_noop() {
        let mut tracer = StackTracer::new();
        manager().after_handle(&mut tracer, None);
        assert!(tracer.detached.is_empty());
        assert!(tracer.closed.is_empty());
    }

    #[test]
    fn test_before_send_fresh_message_logs_client_send_and_marks() {
        let mut tracer = StackTracer::new();
        let mut message = TestMessage::untraced();

        let span = manager()
            .before_send(&mut tracer, &mut message, "orders-exchange")
            .unwrap();

        assert!(span.has_logged(LogEvent::ClientSend));
        assert_eq!(span.name.as_deref(), Some("orders-exchange"));
        assert_eq!(
            message.headers.get(MESSAGE_SENT).and_then(HeaderValue::as_text),
            Some("true")
        );
    }

    #[test]
    fn test_before_send_marked_message_logs_server_receive() {
        let mut tracer = StackTracer::new();
        let mut message = TestMessage::untraced();
        let m = manager();

        // First send marks the message; a second send of the same message
        // object is a relay/reply leg.
        m.before_send(&mut tracer, &mut message, "orders-exchange").unwrap();
        m.after_send(&mut tracer, None);

        let span = m
            .before_send(&mut tracer, &mut message, "orders-exchange")
            .unwrap();
        assert!(span.has_logged(LogEvent::ServerReceive));
        assert!(!span.has_logged(LogEvent::ClientSend));
    }

    #[test]
    fn test_before_send_parent_from_ambient_span() {
        let mut tracer = StackTracer::new();
        let inbound = TestMessage::traced("0000000000000456", "0000000000000123");
        let m = manager();

        m.before_handle(&mut tracer, &inbound);
        let mut outbound = TestMessage::untraced();
        let span = m.before_send(&mut tracer, &mut outbound, "replies").unwrap();

        assert_eq!(span.trace_id, 0x456);
        assert_eq!(span.parent(), Some(0x123));
    }

    #[test]
    fn test_before_send_parent_from_message_when_not_tracing() {
        let mut tracer = StackTracer::new();
        let mut message = TestMessage::traced("0000000000000456", "0000000000000123");

        let span = manager()
            .before_send(&mut tracer, &mut message, "replies")
            .unwrap();

        assert_eq!(span.trace_id, 0x456);
        assert_eq!(span.parent(), Some(0x123));
    }

    #[test]
    fn test_after_send_completes_client_cycle_and_closes() {
        let mut tracer = StackTracer::new();
        let mut message = TestMessage::untraced();
        let m = manager();

        m.before_send(&mut tracer, &mut message, "orders-exchange").unwrap();
        m.after_send(&mut tracer, None);

        assert_eq!(tracer.closed.len(), 1);
        assert!(tracer.closed[0].has_logged(LogEvent::ClientReceive));
        assert!(!tracer.closed[0].has_logged(LogEvent::ServerSend));
    }

    #[test]
    fn test_after_send_completes_server_cycle_when_server_receive_logged() {
        let mut tracer = StackTracer::new();
        let mut message = TestMessage::untraced();
        let m = manager();

        m.before_send(&mut tracer, &mut message, "x").unwrap();
        m.after_send(&mut tracer, None);
        m.before_send(&mut tracer, &mut message, "x").unwrap();
        m.after_send(&mut tracer, None);

        let relay_span = &tracer.closed[1];
        assert!(relay_span.has_logged(LogEvent::ServerSend));
        assert!(!relay_span.has_logged(LogEvent::ClientReceive));
    }

    #[test]
    fn test_after_send_tags_error_once_and_always_closes() {
        let mut tracer = StackTracer::new();
        let mut message = TestMessage::untraced();
        let m = manager();

        m.before_send(&mut tracer, &mut message, "x").unwrap();
        m.after_send(&mut tracer, Some(&HandlerError("send failed")));

        assert_eq!(tracer.closed.len(), 1);
        assert_eq!(
            tracer.closed[0].tags.get(ERROR_TAG).map(String::as_str),
            Some("send failed")
        );
    }

    #[test]
    fn test_error_never_tagged_on_unsampled_span() {
        let mut tracer = StackTracer::new();
        tracer.create_span("x", Some(SpanContext::builder().trace_id(1).span_id(2).build()));

        manager().after_send(&mut tracer, Some(&HandlerError("boom")));
        assert!(!tracer.closed[0].tags.contains_key(ERROR_TAG));
    }

    #[test]
    fn test_extract_and_continue_span_joins_queue_names() {
        let mut tracer = StackTracer::new();
        let message = TestMessage::traced("0000000000000456", "0000000000000123");
        let m = manager();

        let span = m.extract_and_continue_span(&mut tracer, &message, &["queue1", "queue2"]);
        assert_eq!(span.name.as_deref(), Some("queue1,queue2"));
        assert_eq!(span.trace_id, 0x456);
        assert_eq!(span.parent(), Some(0x123));

        let single = m.extract_and_continue_span(&mut tracer, &message, &["queue"]);
        assert_eq!(single.name.as_deref(), Some("queue"));
    }

    #[test]
    fn test_inject_current_span_uses_ambient_span() {
        let mut tracer = StackTracer::new();
        let inbound = TestMessage::traced("0000000000000456", "0000000000000123");
        let m = manager();

        m.before_handle(&mut tracer, &inbound);
        let mut relayed = TestMessage::untraced();
        m.inject_current_span(&mut tracer, &mut relayed).unwrap();

        assert_eq!(
            relayed.headers.get(PRIMARY.trace_id).and_then(HeaderValue::as_text),
            Some("0000000000000456")
        );
        // No new span was created.
        assert_eq!(tracer.stack.len(), 1);
    }

    #[test]
    fn test_inject_current_span_without_ambient_marks_not_sampled() {
        let mut tracer = StackTracer::new();
        let mut message = TestMessage::untraced();

        manager().inject_current_span(&mut tracer, &mut message).unwrap();
        assert_eq!(
            message.headers.get(PRIMARY.sampled).and_then(HeaderValue::as_text),
            Some("0")
        );
    }
}
