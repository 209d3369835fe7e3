//! Pagination module
//!
//! Supports: Next URL (body or Link header), Opaque token, Offset, Page Number
//!
//! # Overview
//!
//! The pagination module provides a unified interface for handling different
//! API pagination patterns. A [`CursorStyle`] describes how the next page is
//! found, [`extract_page`] turns a response into a [`PageResult`], and the
//! [`Paginator`] state machine drives one job from its first page to `Done`
//! or `Failed`, yielding item batches lazily.

mod paginator;
mod strategies;
mod types;

pub use paginator::{Paginator, PaginatorPhase};
pub use strategies::{describe_shape, extract_page, lookup_path};
pub use types::{
    Cursor, CursorStyle, EmptyPagePolicy, PageResult, PaginationConfig, PaginationState,
};
