//! HTTP route handlers.
//!
//! Thin adapters: every handler maps one-to-one onto a service call.

pub mod admin;
pub mod health;
pub mod preview;
