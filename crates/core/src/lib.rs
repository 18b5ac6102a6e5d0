//! Alankree Core - Shared domain types.
//!
//! This crate provides the types used by every Alankree component:
//! - `server` - The storefront and back-office JSON API
//! - `cli` - Command-line tools for migrations, seeding and admin tasks
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. The optional `postgres` feature adds `sqlx`
//! encode/decode support so the server can bind these types directly.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, emails, and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
