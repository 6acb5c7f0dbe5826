//! Distributed-tracing context propagation for AMQP-style messaging.
//!
//! This crate implements the hard part of tracing asynchronous messaging:
//! the protocol for carrying trace identity across process boundaries in
//! message metadata, and the span lifecycle state machine around receiving,
//! relaying and replying to messages. It does not talk to a broker, weave
//! interceptors or export spans - those collaborators sit behind the
//! [`MessageCarrier`] and [`Tracer`] seams.
//!
//! # Architecture
//!
//! - [`SpanExtractor`] reads a message's headers and reconstructs the
//!   propagated parent context, honouring both the primary `X-B3-*` and the
//!   legacy `span*` header namespaces.
//! - [`SpanInjector`] writes a span's identity, sampling decision and
//!   derived tags onto an outbound message, always under the primary
//!   namespace. Negative sampling decisions travel as a single header.
//! - [`SpanLifecycleManager`] is the orchestrator the interception layer
//!   calls: `before_handle`/`after_handle` around message handling and
//!   `before_send`/`after_send` around publishing, plus the multi-queue
//!   receive and relay-injection variants.
//!
//! # Usage
//!
//! ```ignore
//! use amqp_trace_propagation::SpanLifecycleManager;
//!
//! let manager = SpanLifecycleManager::default();
//!
//! // around an inbound delivery:
//! let span = manager.before_handle(&mut tracer, &message);
//! let outcome = handle(&message);
//! manager.after_handle(&mut tracer, outcome.as_ref().err().map(|e| e as _));
//! // the interception layer re-raises `outcome` unchanged.
//!
//! // around an outbound publish:
//! manager.before_send(&mut tracer, &mut message, "orders-exchange")?;
//! let outcome = publish(&message);
//! manager.after_send(&mut tracer, outcome.as_ref().err().map(|e| e as _));
//! ```
//!
//! Every `before_*` must be paired with exactly one `after_*` on every exit
//! path; that pairing is the crate's only resource-safety obligation.

mod accessor;
mod error;
mod extractor;
mod injector;
mod keys;
mod manager;
mod span;
mod tracer;

pub mod headers;
pub mod id;

pub use accessor::HeaderAccessor;
pub use error::{PropagationError, Result};
pub use extractor::SpanExtractor;
pub use headers::{HeaderMap, HeaderValue, MessageCarrier, Payload};
pub use injector::SpanInjector;
pub use keys::TraceKeys;
pub use manager::{DESTINATION_UNKNOWN, SpanLifecycleManager};
pub use span::{ERROR_TAG, LogEvent, SpanContext, SpanContextBuilder, SpanLog};
pub use tracer::Tracer;
