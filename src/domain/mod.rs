//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machines)
//! - `conversation` - Transcript, contact capture dialogue, intent routing, stream accumulation
//! - `model` - Model registry and per-session model/budget selection

pub mod conversation;
pub mod foundation;
pub mod model;
