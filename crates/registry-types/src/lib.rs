//! Core types and traits for the permissioned record registry.
//!
//! Request/response DTOs here are the JSON contract of the HTTP adapter.

mod dto;
mod lifecycle;
mod record;
mod traits;

pub use dto::*;
pub use lifecycle::*;
pub use record::*;
pub use traits::*;
