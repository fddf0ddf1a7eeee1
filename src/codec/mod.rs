//! The message codec: [`Encode`] assembles typed messages into wire bytes,
//! [`Decode`] parses wire bytes into typed messages.

pub mod decode;
pub mod encode;

pub use decode::Decode;
pub use encode::Encode;
