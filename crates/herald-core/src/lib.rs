//! Core types, trait definitions and services for the Herald notification
//! subsystem.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::NotificationStore`]; the user directory
//! is injected through [`directory::UserDirectory`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod delivery;
pub mod directory;
pub mod error;
pub mod events;
pub mod fanout;
pub mod lifecycle;
pub mod notification;
pub mod query;
pub mod retention;
pub mod store;

pub use error::{Error, Result};
