//! Model readiness reporting from the backend's progress stream.
//!
//! * [`ReadinessGate`]: follows the stream once, latches on a terminal
//!   status or transport error, publishes through a `watch` channel.
//! * [`SseDecoder`]: splits raw stream bytes into event payloads.

pub mod gate;
pub mod sse;

pub use gate::{GateState, ModelStatus, ReadinessGate};
pub use sse::SseDecoder;
