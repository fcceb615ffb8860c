//! Core types and trait definitions for the Bookmarks social site.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement the traits in [`store`]; the web layer drives
//! the operations in [`feed`], [`graph`] and [`directory`] through them.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod action;
pub mod directory;
pub mod error;
pub mod feed;
pub mod forms;
pub mod graph;
pub mod session;
pub mod store;
pub mod user;

pub use error::{Error, Result};
