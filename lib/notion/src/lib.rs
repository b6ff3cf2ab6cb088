//! Notion task-store client for telepost.
//!
//! This crate provides:
//!
//! - **Client**: Paginated data-source query and status write-back
//! - **Parse stage**: Projection of raw pages into [`RawPost`] records
//! - **Filter stack**: The due-post predicate pipeline
//!
//! The remote store is never assumed to support the due predicate; the
//! client fetches everything page by page and filters locally.

pub mod client;
pub mod error;
pub mod filter;
pub mod parse;

pub use client::NotionClient;
pub use error::ParseError;
pub use filter::{DueWindow, select_due};
pub use parse::{RawPost, parse_page, parse_pages};
