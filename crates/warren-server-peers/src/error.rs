// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;
use warren_server_db::DbError;

/// Message shown to callers in place of internal diagnostics.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Errors from driving the tunnel control tool.
#[derive(Debug, Error)]
pub enum TunnelError {
	/// The control tool binary is missing from PATH
	#[error("{tool} is not installed or not in PATH")]
	ToolNotInstalled { tool: &'static str },

	/// The tool exited non-zero
	#[error("command failed: {tool} {args:?}: {output}")]
	CommandFailed {
		tool: &'static str,
		args: Vec<String>,
		output: String,
	},

	/// `set` exited zero but printed output, which the tool only does on error
	#[error("unexpected output from set: {output}")]
	UnexpectedOutput { output: String },

	/// `save` completed without echoing the expected confirmation marker
	#[error("configuration save was not confirmed: {output}")]
	SaveNotConfirmed { output: String },

	/// Failed to spawn the tool or stage its input
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}

/// Outcome of a rejected or failed peer update.
///
/// `Validation` and `Collision` are detected before any mutation and carry
/// operator-facing reasons returned verbatim. `Tool` and `Persistence` carry
/// internal diagnostics that must never reach the caller; use
/// [`PeerUpdateError::client_message`] at the boundary.
#[derive(Debug, Error)]
pub enum PeerUpdateError {
	#[error("{0}")]
	Validation(String),

	#[error("{0}")]
	Collision(String),

	#[error("tool failure: {0}")]
	Tool(String),

	#[error("persistence failure: {0}")]
	Persistence(String),
}

impl PeerUpdateError {
	pub fn validation(reason: impl Into<String>) -> Self {
		Self::Validation(reason.into())
	}

	/// The message safe to return to the requesting client.
	pub fn client_message(&self) -> &str {
		match self {
			Self::Validation(reason) | Self::Collision(reason) => reason,
			Self::Tool(_) | Self::Persistence(_) => INTERNAL_ERROR_MESSAGE,
		}
	}
}

impl From<DbError> for PeerUpdateError {
	fn from(err: DbError) -> Self {
		Self::Persistence(err.to_string())
	}
}

/// Errors from rendering a peer profile.
#[derive(Debug, Error)]
pub enum ProfileError {
	#[error("descriptor serialization failed: {0}")]
	Descriptor(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PeerUpdateError>;
