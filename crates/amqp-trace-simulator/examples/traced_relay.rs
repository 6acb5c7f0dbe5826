//! Walks one message through a consume-then-relay flow and prints the
//! exported spans as JSON.
//!
//! Run with: `cargo run --example traced_relay`

use amqp_trace_propagation::{SpanLifecycleManager, SpanInjector, SpanExtractor, TraceKeys};
use amqp_trace_simulator::{Message, SimulatorTracer};

fn main() {
    let keys = TraceKeys::new().header("X-Request-Id");
    let manager = SpanLifecycleManager::new(SpanInjector::new(keys), SpanExtractor::new());

    let mut producer_tracer = SimulatorTracer::new("producer");
    let mut consumer_tracer = SimulatorTracer::new("consumer");

    // Producer publishes a fresh message.
    let mut message = Message::builder()
        .text_body(r#"{"order":42}"#)
        .header("X-Request-Id", "req-7")
        .build();
    manager
        .before_send(&mut producer_tracer, &mut message, "orders-exchange")
        .expect("inject outbound span");
    manager.after_send(&mut producer_tracer, None);

    // Consumer receives it, handles it, then relays it onward.
    manager.extract_and_continue_span(&mut consumer_tracer, &message, &["orders", "audit"]);
    manager.after_handle(&mut consumer_tracer, None);

    manager
        .before_send(&mut consumer_tracer, &mut message, "audit-exchange")
        .expect("inject relay span");
    manager.after_send(&mut consumer_tracer, None);

    for (who, tracer) in [("producer", &producer_tracer), ("consumer", &consumer_tracer)] {
        for span in tracer.exported() {
            let json = serde_json::to_string_pretty(span).expect("span serialises");
            println!("--- {who} exported span ---\n{json}");
        }
    }
}
