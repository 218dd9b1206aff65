// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Interface-side configuration passed explicitly to the peer operations.
//!
//! Nothing here reaches for ambient state: the update coordinator and the
//! profile generator both take an [`InterfaceSnapshot`] argument, and the
//! caller decides how fresh that snapshot is.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which control-tool dialect the interface speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TunnelVariant {
	#[default]
	#[serde(rename = "wg")]
	Wireguard,
	/// Extended variant carrying obfuscation tuning parameters.
	#[serde(rename = "awg")]
	Amnezia,
}

impl TunnelVariant {
	/// Name of the peer-mutation tool.
	pub fn tool(&self) -> &'static str {
		match self {
			Self::Wireguard => "wg",
			Self::Amnezia => "awg",
		}
	}

	/// Name of the companion tool that manages interface lifecycle and
	/// config persistence.
	pub fn quick_tool(&self) -> &'static str {
		match self {
			Self::Wireguard => "wg-quick",
			Self::Amnezia => "awg-quick",
		}
	}
}

/// Administrator-forced per-peer settings on an interface.
///
/// `None` (and, for parity with older configurations, empty text or zero)
/// means "inherit the peer's own value".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerOverrides {
	#[serde(default)]
	pub mtu: Option<i64>,
	#[serde(default)]
	pub dns: Option<String>,
	#[serde(default)]
	pub endpoint_allowed_ips: Option<String>,
	#[serde(default)]
	pub remote_endpoint: Option<String>,
	#[serde(default)]
	pub listen_port: Option<i64>,
	#[serde(default)]
	pub keepalive: Option<i64>,
}

/// Obfuscation tuning parameters of the extended variant.
///
/// The numeric parameters shape junk-packet injection and header
/// disguise; the `i1`..`i5` strings carry the newer injection payload
/// templates and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmneziaParams {
	pub jc: i64,
	pub jmin: i64,
	pub jmax: i64,
	pub s1: i64,
	pub s2: i64,
	#[serde(default)]
	pub s3: i64,
	#[serde(default)]
	pub s4: i64,
	pub h1: i64,
	pub h2: i64,
	pub h3: i64,
	pub h4: i64,
	#[serde(default)]
	pub i1: String,
	#[serde(default)]
	pub i2: String,
	#[serde(default)]
	pub i3: String,
	#[serde(default)]
	pub i4: String,
	#[serde(default)]
	pub i5: String,
}

/// Immutable view of one tunnel interface, taken at the start of an
/// operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSnapshot {
	pub name: String,
	#[serde(default)]
	pub variant: TunnelVariant,
	/// Interface public key in base64 text form.
	pub public_key: String,
	pub listen_port: i64,
	/// Administrative status at snapshot time.
	pub enabled: bool,
	/// Globally configured endpoint peers dial when no override is set.
	pub remote_endpoint: String,
	#[serde(default)]
	pub overrides: PeerOverrides,
	/// Present when `variant` is the extended one.
	#[serde(default)]
	pub amnezia: Option<AmneziaParams>,
	/// Extra values resolvable from profile templates, merged over the
	/// built-in keys.
	#[serde(default)]
	pub template_values: BTreeMap<String, String>,
}

impl InterfaceSnapshot {
	/// Values a rendered profile may reference via `{{ key }}`.
	///
	/// Built-in keys cover the interface identity; `template_values`
	/// entries are merged last and win on collision.
	pub fn template_context(&self) -> BTreeMap<String, String> {
		let mut ctx = BTreeMap::new();
		ctx.insert("name".to_string(), self.name.clone());
		ctx.insert("public_key".to_string(), self.public_key.clone());
		ctx.insert("listen_port".to_string(), self.listen_port.to_string());
		ctx.insert(
			"remote_endpoint".to_string(),
			self.remote_endpoint.clone(),
		);
		ctx.insert("protocol".to_string(), self.variant.tool().to_string());
		for (key, value) in &self.template_values {
			ctx.insert(key.clone(), value.clone());
		}
		ctx
	}
}
