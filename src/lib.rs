//! Client-side core for a hosted multi-model AI chat service: a typed HTTP
//! gateway layer, an in-memory conversation store, and the send-and-stream
//! workflow that ties them together.

pub mod config;
pub mod error;
pub mod gateway;
pub mod session;
pub mod store;
pub mod title;
pub mod types;
