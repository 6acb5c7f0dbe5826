//! In-memory stand-ins for the external collaborators of
//! `amqp-trace-propagation`: an owned message type implementing
//! [`MessageCarrier`](amqp_trace_propagation::MessageCarrier) and a stack
//! tracer that records exported spans.
//!
//! Nothing here talks to a real broker or tracing backend; the crate exists
//! so the propagation core can be exercised end to end in tests, examples
//! and local experiments.
//!
//! # Example
//!
//! ```
//! use amqp_trace_propagation::SpanLifecycleManager;
//! use amqp_trace_simulator::{Message, SimulatorTracer};
//!
//! let manager = SpanLifecycleManager::default();
//! let mut tracer = SimulatorTracer::new("demo-process");
//!
//! let mut message = Message::builder()
//!     .text_body(r#"{"order":42}"#)
//!     .build();
//!
//! manager.before_send(&mut tracer, &mut message, "orders-exchange").unwrap();
//! manager.after_send(&mut tracer, None);
//!
//! assert_eq!(tracer.exported().len(), 1);
//! ```

mod message;
mod tracer;

pub use message::{Message, MessageBuilder};
pub use tracer::SimulatorTracer;
