// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # warren-server-db
//!
//! Persistence layer for the warren server using SQLite via sqlx.
//!
//! ## Repository Pattern
//!
//! The peer domain has two components:
//! - **[`PeerStore`] trait**: the interface services program against
//! - **[`PeerRepository`] struct**: concrete implementation holding a `SqlitePool`
//!
//! ## Error Handling
//!
//! Use [`DbError`] variants appropriately:
//!
//! | Variant | When to use |
//! |---------|-------------|
//! | `NotFound` | Resource must exist but doesn't (update by ID) |
//! | `Sqlx` | Let sqlx errors propagate via `?` for unexpected database errors |
//! | `Internal` | Invalid stored data (e.g., unparseable handshake timestamp) |
//!
//! Lookups where absence is normal return `Result<Option<T>>` instead of
//! `NotFound`.
//!
//! ## Testing
//!
//! The [`testing`] module provides in-memory pool and table helpers shared
//! by this crate's tests and by downstream service crates.

mod error;

pub mod peers;
pub mod pool;
pub mod testing;

pub use error::{DbError, Result};
pub use peers::{PeerAttributeUpdate, PeerRepository, PeerRow, PeerStore};
pub use pool::create_pool;
