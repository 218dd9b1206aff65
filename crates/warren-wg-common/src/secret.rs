// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacted wrapper for secret text (private keys, pre-shared keys).
//!
//! A [`SecretString`] never appears in logs or serialized output; reading
//! the value requires an explicit [`SecretString::expose`] call, which
//! keeps secret access visible in review. Memory is zeroed on drop.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroize;

/// The redaction placeholder used in all output.
pub const REDACTED: &str = "[REDACTED]";

#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretString {
	inner: String,
}

impl SecretString {
	pub fn new(inner: impl Into<String>) -> Self {
		Self {
			inner: inner.into(),
		}
	}

	/// Explicitly access the secret text.
	pub fn expose(&self) -> &str {
		&self.inner
	}

	/// True when no secret is set. Empty text means "absent" throughout
	/// the peer model, matching the stored representation.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl Default for SecretString {
	fn default() -> Self {
		Self::new(String::new())
	}
}

impl From<String> for SecretString {
	fn from(inner: String) -> Self {
		Self::new(inner)
	}
}

impl From<&str> for SecretString {
	fn from(inner: &str) -> Self {
		Self::new(inner)
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl Eq for SecretString {}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SecretString").field(&REDACTED).finish()
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let inner = String::deserialize(deserializer)?;
		Ok(Self::new(inner))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn debug_is_redacted() {
		let secret = SecretString::new("psk-material");
		let debug = format!("{secret:?}");
		assert!(!debug.contains("psk-material"));
		assert!(debug.contains(REDACTED));
	}

	#[test]
	fn display_is_redacted() {
		let secret = SecretString::new("psk-material");
		assert_eq!(format!("{secret}"), REDACTED);
	}

	#[test]
	fn expose_returns_inner_value() {
		let secret = SecretString::new("psk-material");
		assert_eq!(secret.expose(), "psk-material");
	}

	#[test]
	fn empty_secret_reports_absent() {
		assert!(SecretString::default().is_empty());
		assert!(!SecretString::new("x").is_empty());
	}

	#[test]
	fn serialize_is_redacted() {
		let secret = SecretString::new("psk-material");
		let json = serde_json::to_string(&secret).unwrap();
		assert!(!json.contains("psk-material"));
		assert!(json.contains(REDACTED));
	}

	#[test]
	fn deserialize_populates_secret() {
		let secret: SecretString = serde_json::from_str(r#""psk-material""#).unwrap();
		assert_eq!(secret.expose(), "psk-material");
	}

	proptest! {
		#[test]
		fn debug_never_contains_secret(inner in "[a-zA-Z0-9!@#$%^&*_+=;:,.<>?/-]{3,50}") {
			prop_assume!(!inner.contains("REDACTED"));
			prop_assume!(!inner.contains("SecretString"));

			let secret = SecretString::new(inner.clone());
			let debug = format!("{secret:?}");
			prop_assert!(!debug.contains(&inner));
		}

		#[test]
		fn serialize_never_contains_secret(inner in "[a-zA-Z0-9!@#$%^&*_+=;:,.<>?/-]{3,50}") {
			prop_assume!(!inner.contains("REDACTED"));

			let secret = SecretString::new(inner.clone());
			let json = serde_json::to_string(&secret).unwrap();
			prop_assert!(!json.contains(&inner));
		}

		#[test]
		fn expose_roundtrips(inner in ".*") {
			let secret = SecretString::new(inner.clone());
			prop_assert_eq!(secret.expose(), &inner);
		}
	}
}
