//! `emporium-core`: shared building blocks for the admin backend core.
//!
//! This crate contains **pure domain** primitives plus the in-memory table used
//! by the reference storage adapters. No transport, no storage drivers.

pub mod error;
pub mod id;
pub mod lifecycle;
pub mod table;
pub mod version;

pub use error::{DependentRef, DomainError, DomainResult, ErrorBody, StoreError, StoreResult};
pub use id::{NodeId, RecordId, UserId};
pub use lifecycle::{Lifecycle, SoftDelete, Visibility};
pub use table::{LiveTable, Rows};
pub use version::ExpectedVersion;
