//! AMQP Trace Workspace - Integration tests for trace-context propagation
//! over message-broker metadata.
//!
//! This is a virtual package that provides workspace-level integration tests.
//! The actual functionality is provided by the workspace member crates:
//!
//! - `amqp-trace-propagation`: header codec, span extractor/injector and the
//!   span lifecycle manager
//! - `amqp-trace-simulator`: in-memory tracer and message fixtures standing
//!   in for the broker client and the tracing backend
