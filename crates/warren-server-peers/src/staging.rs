// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Short-lived secret staging for tool invocations.
//!
//! The control tool reads pre-shared keys from a file path, never from
//! argv where they would be visible in the process table. Each staged
//! secret gets a fresh UUID v4 name in the OS temp directory and is
//! removed when the guard drops, whatever the tool invocation did.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;
use warren_wg_common::SecretString;

/// Guard for one staged secret file. The file lives exactly as long as
/// the guard.
#[derive(Debug)]
pub struct StagedSecret {
	path: PathBuf,
}

impl StagedSecret {
	/// Write `secret` to a freshly named temp file with owner-only
	/// permissions.
	#[tracing::instrument(skip_all)]
	pub fn stage(secret: &SecretString) -> std::io::Result<Self> {
		let path = std::env::temp_dir().join(Uuid::new_v4().to_string());

		let mut options = OpenOptions::new();
		options.write(true).create_new(true);

		#[cfg(unix)]
		{
			use std::os::unix::fs::OpenOptionsExt;
			options.mode(0o600);
		}

		let mut file = options.open(&path)?;
		// Guard constructed before the write so a short write still
		// removes the file.
		let staged = Self { path };
		file.write_all(secret.expose().as_bytes())?;

		Ok(staged)
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// The staged path in the form the tool command line takes.
	pub fn path_arg(&self) -> String {
		self.path.to_string_lossy().into_owned()
	}
}

impl Drop for StagedSecret {
	fn drop(&mut self) {
		if let Err(e) = std::fs::remove_file(&self.path) {
			tracing::warn!(path = %self.path.display(), error = %e, "failed to remove staged secret");
		}
	}
}
