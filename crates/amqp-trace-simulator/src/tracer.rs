//! A stack tracer with in-memory export, standing in for the tracing
//! runtime that would normally hold the ambient current span.

use amqp_trace_propagation::{SpanContext, Tracer};
use rand::Rng;
use tracing::debug;

/// In-memory [`Tracer`] implementation.
///
/// Maintains the current-span stack for one logical task, allocates random
/// 64-bit identifiers, and records every closed sampled span in an
/// `exported` list that tests can inspect. Root spans take the configured
/// default sampling decision; child and continued spans inherit theirs.
#[derive(Debug, Default)]
pub struct SimulatorTracer {
    process_id: String,
    sample_new_traces: bool,
    stack: Vec<SpanContext>,
    exported: Vec<SpanContext>,
}

impl SimulatorTracer {
    /// Creates a tracer that samples every fresh trace.
    pub fn new(process_id: impl Into<String>) -> Self {
        Self {
            process_id: process_id.into(),
            sample_new_traces: true,
            stack: Vec::new(),
            exported: Vec::new(),
        }
    }

    /// Overrides the sampling decision applied to fresh root spans.
    pub fn sample_new_traces(mut self, sample: bool) -> Self {
        self.sample_new_traces = sample;
        self
    }

    /// Spans that were closed while sampled, in closing order.
    pub fn exported(&self) -> &[SpanContext] {
        &self.exported
    }

    /// Depth of the current-span stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn next_id() -> u64 {
        let mut rng = rand::rng();
        loop {
            let id: u64 = rng.random();
            if id != 0 {
                return id;
            }
        }
    }

    fn new_root(&self) -> SpanContext {
        // Root spans reuse the trace id as their span id.
        let id = Self::next_id();
        SpanContext::builder()
            .trace_id(id)
            .span_id(id)
            .process_id(self.process_id.clone())
            .exportable(self.sample_new_traces)
            .build()
    }

    fn child_of(&self, parent: &SpanContext, name: &str) -> SpanContext {
        SpanContext::builder()
            .trace_id_high(parent.trace_id_high)
            .trace_id(parent.trace_id)
            .span_id(Self::next_id())
            .parent(parent.span_id)
            .name(name)
            .process_id(self.process_id.clone())
            .exportable(parent.exportable)
            .build()
    }

    fn push(&mut self, span: SpanContext) -> &mut SpanContext {
        self.stack.push(span);
        self.stack.last_mut().expect("span just pushed")
    }
}

impl Tracer for SimulatorTracer {
    fn create_span(&mut self, name: &str, parent: Option<SpanContext>) -> &mut SpanContext {
        let span = match parent {
            Some(parent) => self.child_of(&parent, name),
            None => {
                let mut root = self.new_root();
                root.name = Some(name.to_string());
                root
            }
        };
        debug!(name, span_id = span.span_id, "created span");
        self.push(span)
    }

    fn continue_span(&mut self, context: Option<SpanContext>) -> &mut SpanContext {
        let span = context.unwrap_or_else(|| self.new_root());
        self.push(span)
    }

    fn current_span(&self) -> Option<&SpanContext> {
        self.stack.last()
    }

    fn current_span_mut(&mut self) -> Option<&mut SpanContext> {
        self.stack.last_mut()
    }

    fn detach(&mut self) -> Option<SpanContext> {
        self.stack.pop()
    }

    fn close(&mut self) -> Option<SpanContext> {
        let span = self.stack.pop()?;
        if span.exportable {
            self.exported.push(span.clone());
        }
        Some(span)
    }
}
