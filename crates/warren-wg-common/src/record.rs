// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The typed peer record and the usage-counter reset modes.

use chrono::{DateTime, Utc};

use crate::secret::SecretString;

/// One tunnel endpoint attached to an interface.
///
/// The identity is the peer's public key in base64 text form and is
/// immutable for the life of the record; every other attribute is
/// replaced wholesale by the update protocol. Secrets are held behind
/// [`SecretString`] so a logged record never exposes key material.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerRecord {
	/// Public key text; primary key within the interface's peer set.
	pub id: String,
	pub name: String,
	/// Private key text, empty when unknown.
	pub private_key: SecretString,
	pub dns: String,
	/// Address range advertised to the peer as reachable via the
	/// interface.
	pub endpoint_allowed_ip: String,
	/// Comma-separated CIDR/IP entries this peer may source traffic for.
	pub allowed_ip: String,
	/// Last seen dial source of the peer, as reported by the daemon.
	pub endpoint: String,
	/// host:port the peer dials.
	pub remote_endpoint: String,
	/// Pre-shared key text, empty when none.
	pub preshared_key: SecretString,
	/// 0 = unset/inherit; valid range is 0..=1460.
	pub mtu: i64,
	/// Seconds; 0 = disabled.
	pub keepalive: i64,
	pub notes: String,
	pub status: bool,
	pub latest_handshake: Option<DateTime<Utc>>,
	pub total_receive: f64,
	pub total_sent: f64,
	pub total_data: f64,
	pub cumu_receive: f64,
	pub cumu_sent: f64,
	pub cumu_data: f64,
}

impl PeerRecord {
	/// Splits the allowed-address list into trimmed, non-empty entries.
	/// The list is semantically a set; collision checks compare these
	/// entries across peers.
	pub fn allowed_ip_entries(&self) -> Vec<String> {
		split_address_list(&self.allowed_ip)
	}
}

/// Splits a comma-separated address list into trimmed, non-empty entries.
pub fn split_address_list(list: &str) -> Vec<String> {
	list.split(',')
		.map(str::trim)
		.filter(|entry| !entry.is_empty())
		.map(str::to_string)
		.collect()
}

/// Which traffic counters a data-usage reset touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageResetMode {
	/// All six counters.
	Total,
	/// Interval and cumulative receive only.
	Receive,
	/// Interval and cumulative sent only.
	Sent,
}

impl UsageResetMode {
	/// Parses the wire-facing mode string. Unknown modes yield `None`;
	/// the reset operation treats that as a no-op failure.
	pub fn parse(mode: &str) -> Option<Self> {
		match mode {
			"total" => Some(Self::Total),
			"receive" => Some(Self::Receive),
			"sent" => Some(Self::Sent),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Total => "total",
			Self::Receive => "receive",
			Self::Sent => "sent",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record_with_allowed_ip(allowed_ip: &str) -> PeerRecord {
		PeerRecord {
			id: "peer-id".to_string(),
			name: String::new(),
			private_key: SecretString::default(),
			dns: String::new(),
			endpoint_allowed_ip: String::new(),
			allowed_ip: allowed_ip.to_string(),
			endpoint: String::new(),
			remote_endpoint: String::new(),
			preshared_key: SecretString::default(),
			mtu: 0,
			keepalive: 0,
			notes: String::new(),
			status: false,
			latest_handshake: None,
			total_receive: 0.0,
			total_sent: 0.0,
			total_data: 0.0,
			cumu_receive: 0.0,
			cumu_sent: 0.0,
			cumu_data: 0.0,
		}
	}

	#[test]
	fn entries_are_trimmed() {
		let record = record_with_allowed_ip("10.0.0.2/32 , fd00::2/128");
		assert_eq!(
			record.allowed_ip_entries(),
			vec!["10.0.0.2/32".to_string(), "fd00::2/128".to_string()]
		);
	}

	#[test]
	fn empty_entries_are_dropped() {
		let record = record_with_allowed_ip("10.0.0.2/32,,");
		assert_eq!(record.allowed_ip_entries(), vec!["10.0.0.2/32".to_string()]);
		assert!(record_with_allowed_ip("").allowed_ip_entries().is_empty());
	}

	#[test]
	fn reset_mode_parses_known_strings() {
		assert_eq!(UsageResetMode::parse("total"), Some(UsageResetMode::Total));
		assert_eq!(
			UsageResetMode::parse("receive"),
			Some(UsageResetMode::Receive)
		);
		assert_eq!(UsageResetMode::parse("sent"), Some(UsageResetMode::Sent));
	}

	#[test]
	fn reset_mode_rejects_unknown_strings() {
		assert_eq!(UsageResetMode::parse("Total"), None);
		assert_eq!(UsageResetMode::parse("everything"), None);
		assert_eq!(UsageResetMode::parse(""), None);
	}

	#[test]
	fn reset_mode_roundtrips_via_str() {
		for mode in [
			UsageResetMode::Total,
			UsageResetMode::Receive,
			UsageResetMode::Sent,
		] {
			assert_eq!(UsageResetMode::parse(mode.as_str()), Some(mode));
		}
	}
}
