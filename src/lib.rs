//! Registers (query, region) searches and answers interval counts and top-N
//! lookups by paging through a classified-ads listing source.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod interval;
pub mod registry;

pub use crate::aggregate::Listings;
pub use crate::api::{AppState, routes};
pub use crate::error::ServiceError;
