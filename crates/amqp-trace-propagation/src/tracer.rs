//! The ambient-tracer collaborator interface.

use crate::span::SpanContext;

/// Holds the currently active span for the executing logical task.
///
/// This is the seam to the external tracing runtime: span storage, export
/// and sampling policy live behind it. There is deliberately no hidden
/// thread-local state in this crate - a `&mut impl Tracer` is threaded
/// explicitly through every lifecycle-manager entry point, so each entry
/// point is a pure function of (tracer state, message).
///
/// Implementations are expected to maintain a stack: `create_span` and
/// `continue_span` push the new current span, `detach` pops it without
/// finalising, and `close` pops it, finalises it and exports it when
/// sampled.
pub trait Tracer {
    /// Creates a new span named `name` as a child of `parent` (or a fresh
    /// root when `parent` is `None`), makes it current and returns it.
    fn create_span(&mut self, name: &str, parent: Option<SpanContext>) -> &mut SpanContext;

    /// Continues `context` as the current span when it is a genuine
    /// continuation, or creates a fresh root span otherwise. Returns the
    /// new current span.
    fn continue_span(&mut self, context: Option<SpanContext>) -> &mut SpanContext;

    /// The currently active span, if any.
    fn current_span(&self) -> Option<&SpanContext>;

    /// Mutable access to the currently active span, if any.
    fn current_span_mut(&mut self) -> Option<&mut SpanContext>;

    /// Whether a span is currently active.
    fn is_tracing(&self) -> bool {
        self.current_span().is_some()
    }

    /// Pops the current span without finalising it; the handled unit of
    /// work is considered a sub-operation of a larger one.
    fn detach(&mut self) -> Option<SpanContext>;

    /// Pops and finalises the current span, exporting it when sampled.
    fn close(&mut self) -> Option<SpanContext>;
}
