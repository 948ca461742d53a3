//! Search Module
//!
//! Help-request retrieval over the alumni index:
//! - `QueryExpander` rewrites a free-text request into short search phrases
//! - `SearchService` runs the phrases through the index, fuses the hits and
//!   projects the surviving profiles into display cards

pub mod expander;
pub mod service;

pub use expander::{Expansion, QueryExpander};
pub use service::SearchService;
