//! Database models.

pub mod entity;

pub use entity::{ChangeSummary, EntityRow, NewEntity};
