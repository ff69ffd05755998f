//! `supplyid-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the supplier
//! resolution crates (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use id::{SessionId, SupplierId};
pub use value_object::ValueObject;
