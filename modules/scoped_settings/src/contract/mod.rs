//! Contract layer - public API shared by callers and collaborators
//!
//! This layer contains transport-agnostic models, the error taxonomy and the
//! settings API trait.

pub mod client;
pub mod error;
pub mod model;

pub use client::SettingsApi;
pub use error::SettingsError;
pub use model::{CastDirective, DatePeriod, Entry, OwnerRef, Value, DEFAULT_GROUP};
