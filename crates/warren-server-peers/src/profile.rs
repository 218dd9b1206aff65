// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client profile generation.
//!
//! Renders the `[Interface]`/`[Peer]` configuration text a peer imports
//! into its client, plus a companion JSON descriptor for the extended
//! variant's mobile clients. Rendering is a pure function of the peer
//! record and the interface snapshot, so equal inputs always produce
//! byte-equal output.
//!
//! Fields follow a shared emission rule: a `Key = Value` line is written
//! only when the text value is non-empty or the integer value is strictly
//! positive. Absent lines make clients fall back to protocol defaults.
//! Administrator overrides obey the same truthiness, an empty or zero
//! override means "inherit the peer's value".

use std::collections::BTreeMap;

use serde::Serialize;

use warren_wg_common::{InterfaceSnapshot, PeerRecord, TunnelVariant};

use crate::error::ProfileError;

/// Container name the extended variant's clients expect.
const AMNEZIA_CONTAINER: &str = "amnezia-awg";

/// A generated client profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileBundle {
	/// Download filename derived from the peer name, without extension.
	pub file_name: String,
	/// Rendered configuration text.
	pub config: String,
	/// JSON descriptor for the extended variant, absent otherwise.
	pub descriptor: Option<String>,
}

/// Render the profile for one peer on one interface.
#[tracing::instrument(skip_all, fields(interface = %iface.name, peer = %peer.id))]
pub fn generate_profile(
	peer: &PeerRecord,
	iface: &InterfaceSnapshot,
) -> Result<ProfileBundle, ProfileError> {
	let rendered = render_config(peer, iface);
	let config = apply_template(&rendered, &iface.template_context());

	let descriptor = match iface.variant {
		TunnelVariant::Amnezia => Some(render_descriptor(peer, iface, &config)?),
		TunnelVariant::Wireguard => None,
	};

	Ok(ProfileBundle {
		file_name: derive_file_name(&peer.name),
		config,
		descriptor,
	})
}

fn render_config(peer: &PeerRecord, iface: &InterfaceSnapshot) -> String {
	let mut out = String::from("[Interface]\n");
	push_text(&mut out, "PrivateKey", peer.private_key.expose());
	push_text(&mut out, "Address", &peer.allowed_ip);
	push_int(&mut out, "MTU", effective_int(iface.overrides.mtu, peer.mtu));
	push_text(
		&mut out,
		"DNS",
		effective_text(iface.overrides.dns.as_deref(), &peer.dns),
	);

	if iface.variant == TunnelVariant::Amnezia {
		if let Some(params) = &iface.amnezia {
			push_int(&mut out, "Jc", params.jc);
			push_int(&mut out, "Jmin", params.jmin);
			push_int(&mut out, "Jmax", params.jmax);
			push_int(&mut out, "S1", params.s1);
			push_int(&mut out, "S2", params.s2);
			push_int(&mut out, "S3", params.s3);
			push_int(&mut out, "S4", params.s4);
			push_int(&mut out, "H1", params.h1);
			push_int(&mut out, "H2", params.h2);
			push_int(&mut out, "H3", params.h3);
			push_int(&mut out, "H4", params.h4);
			push_text(&mut out, "I1", &params.i1);
			push_text(&mut out, "I2", &params.i2);
			push_text(&mut out, "I3", &params.i3);
			push_text(&mut out, "I4", &params.i4);
			push_text(&mut out, "I5", &params.i5);
		}
	}

	out.push_str("\n[Peer]\n");
	push_text(&mut out, "PublicKey", &iface.public_key);
	push_text(
		&mut out,
		"AllowedIPs",
		effective_text(
			iface.overrides.endpoint_allowed_ips.as_deref(),
			&peer.endpoint_allowed_ip,
		),
	);

	// Endpoint is composed, so it is present even when parts are unset.
	let host = effective_text(iface.overrides.remote_endpoint.as_deref(), &iface.remote_endpoint);
	let port = effective_int(iface.overrides.listen_port, iface.listen_port);
	out.push_str(&format!("Endpoint = {host}:{port}\n"));

	push_int(
		&mut out,
		"PersistentKeepalive",
		effective_int(iface.overrides.keepalive, peer.keepalive),
	);
	push_text(&mut out, "PresharedKey", peer.preshared_key.expose());

	out
}

fn push_text(out: &mut String, key: &str, value: &str) {
	if !value.is_empty() {
		out.push_str(&format!("{key} = {value}\n"));
	}
}

fn push_int(out: &mut String, key: &str, value: i64) {
	if value > 0 {
		out.push_str(&format!("{key} = {value}\n"));
	}
}

fn effective_text<'a>(override_value: Option<&'a str>, peer_value: &'a str) -> &'a str {
	match override_value {
		Some(value) if !value.is_empty() => value,
		_ => peer_value,
	}
}

fn effective_int(override_value: Option<i64>, peer_value: i64) -> i64 {
	match override_value {
		Some(value) if value > 0 => value,
		_ => peer_value,
	}
}

/// Resolve `{{ key }}` references against `context`. Unknown keys render
/// as the empty string; an unterminated reference is copied verbatim.
fn apply_template(text: &str, context: &BTreeMap<String, String>) -> String {
	let mut out = String::with_capacity(text.len());
	let mut rest = text;

	while let Some(start) = rest.find("{{") {
		out.push_str(&rest[..start]);
		let after = &rest[start + 2..];
		match after.find("}}") {
			Some(end) => {
				let key = after[..end].trim();
				if let Some(value) = context.get(key) {
					out.push_str(value);
				}
				rest = &after[end + 2..];
			}
			None => {
				out.push_str(&rest[start..]);
				rest = "";
			}
		}
	}

	out.push_str(rest);
	out
}

/// Derive a download filename from a peer name.
///
/// Empty names become `UntitledPeer`. Spaces and shell/filesystem
/// metacharacters are dropped, trailing dots and spaces trimmed, Windows
/// reserved device names get a `file_` prefix, and only
/// `[A-Za-z0-9_=+.-]` survives the final pass.
pub fn derive_file_name(name: &str) -> String {
	let base = if name.is_empty() { "UntitledPeer" } else { name };

	let mut filename: String = base.split(' ').collect();
	filename.retain(|c| {
		!matches!(
			c,
			'.' | ',' | '/' | '?' | '<' | '>' | '\\' | ':' | '*' | '|' | '"'
		)
	});

	let mut candidate = filename.trim_end_matches(['.', ' ']).to_string();
	if is_reserved_device_name(&candidate) {
		candidate = format!("file_{candidate}");
	}

	candidate
		.chars()
		.filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '=' | '+' | '.' | '-'))
		.collect()
}

/// Windows reserved device names, with or without an extension.
fn is_reserved_device_name(name: &str) -> bool {
	let stem = match name.split_once('.') {
		Some((stem, _)) => stem,
		None => name,
	};
	let upper = stem.to_ascii_uppercase();

	if matches!(upper.as_str(), "CON" | "PRN" | "AUX" | "NUL") {
		return true;
	}
	if upper.len() == 4 && (upper.starts_with("COM") || upper.starts_with("LPT")) {
		return matches!(upper.as_bytes()[3], b'1'..=b'9');
	}
	false
}

#[derive(Serialize)]
struct VpnDescriptor<'a> {
	containers: Vec<DescriptorContainer<'a>>,
	#[serde(rename = "defaultContainer")]
	default_container: &'static str,
	description: &'a str,
	#[serde(rename = "hostName")]
	host_name: &'a str,
}

#[derive(Serialize)]
struct DescriptorContainer<'a> {
	awg: AwgContainer<'a>,
	container: &'static str,
}

#[derive(Serialize)]
struct AwgContainer<'a> {
	#[serde(rename = "isThirdPartyConfig")]
	is_third_party_config: bool,
	last_config: &'a str,
	port: i64,
	transport_proto: &'static str,
}

fn render_descriptor(
	peer: &PeerRecord,
	iface: &InterfaceSnapshot,
	config: &str,
) -> Result<String, ProfileError> {
	let descriptor = VpnDescriptor {
		containers: vec![DescriptorContainer {
			awg: AwgContainer {
				is_third_party_config: true,
				last_config: config,
				port: iface.listen_port,
				transport_proto: "udp",
			},
			container: AMNEZIA_CONTAINER,
		}],
		default_container: AMNEZIA_CONTAINER,
		description: &peer.name,
		host_name: effective_text(
			iface.overrides.remote_endpoint.as_deref(),
			&iface.remote_endpoint,
		),
	};

	Ok(serde_json::to_string(&descriptor)?)
}
