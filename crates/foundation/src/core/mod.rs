//! Core types shared across the foundation layer

mod types;

pub use types::{Message, MessageRole};
