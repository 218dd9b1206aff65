// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Curve25519 key material in the text form the tunnel tooling speaks.
//!
//! Peer identities are the padded-base64 encoding of a 32-byte public key
//! (44 characters). A private key, when present, must derive exactly the
//! identity it claims to belong to; [`WgPrivateKey::public_key`] is the
//! deterministic base-point scalar multiplication used for that check.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::secret::SecretString;

#[derive(Error, Debug)]
pub enum KeyError {
	#[error("invalid key length: expected 32 bytes, got {0}")]
	InvalidLength(usize),

	#[error("invalid base64 encoding: {0}")]
	InvalidBase64(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, KeyError>;

fn decode_key(s: &str) -> Result<[u8; 32]> {
	let bytes = STANDARD.decode(s)?;
	if bytes.len() != 32 {
		return Err(KeyError::InvalidLength(bytes.len()));
	}
	let mut arr = [0u8; 32];
	arr.copy_from_slice(&bytes);
	Ok(arr)
}

#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct WgPrivateKey {
	bytes: [u8; 32],
}

impl WgPrivateKey {
	pub fn from_bytes(bytes: [u8; 32]) -> Self {
		Self { bytes }
	}

	pub fn from_base64(s: &str) -> Result<Self> {
		Ok(Self {
			bytes: decode_key(s)?,
		})
	}

	pub fn to_base64(&self) -> SecretString {
		SecretString::new(STANDARD.encode(self.bytes))
	}

	/// Derives the public key for this private key.
	///
	/// Deterministic: the same private key always yields the same public
	/// key, so a stored identity can be checked against supplied key
	/// material without touching the tunnel daemon.
	pub fn public_key(&self) -> WgPublicKey {
		let secret = StaticSecret::from(self.bytes);
		let public = PublicKey::from(&secret);
		WgPublicKey {
			bytes: *public.as_bytes(),
		}
	}

	pub fn expose_bytes(&self) -> &[u8; 32] {
		&self.bytes
	}
}

impl fmt::Debug for WgPrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WgPrivateKey")
			.field("bytes", &"[REDACTED]")
			.finish()
	}
}

impl fmt::Display for WgPrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("[REDACTED]")
	}
}

impl Serialize for WgPrivateKey {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str("[REDACTED]")
	}
}

impl<'de> Deserialize<'de> for WgPrivateKey {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Self::from_base64(&s).map_err(serde::de::Error::custom)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WgPublicKey {
	bytes: [u8; 32],
}

impl WgPublicKey {
	pub fn from_bytes(bytes: [u8; 32]) -> Self {
		Self { bytes }
	}

	pub fn from_base64(s: &str) -> Result<Self> {
		Ok(Self {
			bytes: decode_key(s)?,
		})
	}

	pub fn to_base64(&self) -> String {
		STANDARD.encode(self.bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.bytes
	}
}

impl fmt::Debug for WgPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let b64 = self.to_base64();
		let prefix = if b64.len() >= 8 { &b64[..8] } else { &b64 };
		f.debug_struct("WgPublicKey")
			.field("prefix", &format!("{}...", prefix))
			.finish()
	}
}

impl fmt::Display for WgPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_base64())
	}
}

impl Serialize for WgPublicKey {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_base64())
	}
}

impl<'de> Deserialize<'de> for WgPublicKey {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Self::from_base64(&s).map_err(serde::de::Error::custom)
	}
}
