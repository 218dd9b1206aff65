// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DbError {
	/// Database query failed
	#[error("database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	/// Record not found
	#[error("not found: {0}")]
	NotFound(String),

	/// Internal error
	#[error("internal error: {0}")]
	Internal(String),
}

/// Result type alias for database operations.
pub type Result<T> = std::result::Result<T, DbError>;
