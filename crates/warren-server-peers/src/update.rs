// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Peer update coordination.
//!
//! One update walks a fixed protocol: validate the replacement attributes
//! against the directory snapshot, push the change to the live interface,
//! persist the interface's running config, then commit the attributes to
//! the database and refresh the directory. The interface is mutated
//! before the database so the row only ever describes state the kernel
//! has accepted; a tool failure between the two leaves the interface
//! ahead of the record until the next successful update.
//!
//! The collision check reads the directory snapshot without cross-peer
//! locking. Two concurrent updates claiming the same address can both
//! pass; callers needing strict disjointness must serialize updates per
//! interface.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use warren_server_db::{PeerAttributeUpdate, PeerStore};
use warren_wg_common::{
	matches_address_charset, split_address_list, validate_address, validate_dns_or_host,
	InterfaceSnapshot, SecretString, UsageResetMode, WgPrivateKey,
};

use crate::controller::TunnelControl;
use crate::directory::PeerDirectory;
use crate::error::{PeerUpdateError, TunnelError};
use crate::staging::StagedSecret;

/// Full replacement attribute set for one peer update.
///
/// Numeric fields deserialize leniently: numeric strings are parsed and
/// anything non-numeric becomes 0, which the range checks then judge.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PeerUpdateRequest {
	pub name: String,
	pub private_key: SecretString,
	pub preshared_key: SecretString,
	pub dns: String,
	pub allowed_ip: String,
	pub endpoint_allowed_ip: String,
	#[serde(deserialize_with = "lenient_int")]
	pub mtu: i64,
	#[serde(deserialize_with = "lenient_int")]
	pub keepalive: i64,
	pub notes: String,
}

fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
	D: serde::Deserializer<'de>,
{
	struct LenientVisitor;

	impl<'de> serde::de::Visitor<'de> for LenientVisitor {
		type Value = i64;

		fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
			formatter.write_str("an integer or a numeric string")
		}

		fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<i64, E> {
			Ok(value)
		}

		fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<i64, E> {
			Ok(i64::try_from(value).unwrap_or(0))
		}

		fn visit_f64<E: serde::de::Error>(self, value: f64) -> Result<i64, E> {
			Ok(value as i64)
		}

		fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<i64, E> {
			Ok(value.trim().parse().unwrap_or(0))
		}

		fn visit_unit<E: serde::de::Error>(self) -> Result<i64, E> {
			Ok(0)
		}

		fn visit_none<E: serde::de::Error>(self) -> Result<i64, E> {
			Ok(0)
		}
	}

	deserializer.deserialize_any(LenientVisitor)
}

/// Orchestrates validation, interface mutation and record commit for the
/// peers of one interface.
pub struct PeerUpdateCoordinator {
	store: Arc<dyn PeerStore>,
	control: Arc<dyn TunnelControl>,
	directory: Arc<PeerDirectory>,
}

impl PeerUpdateCoordinator {
	/// `directory` must be bound to the same interface the snapshots
	/// passed to [`update_peer`](Self::update_peer) describe.
	pub fn new(
		store: Arc<dyn PeerStore>,
		control: Arc<dyn TunnelControl>,
		directory: Arc<PeerDirectory>,
	) -> Self {
		Self {
			store,
			control,
			directory,
		}
	}

	/// Apply a full attribute replacement to one peer.
	///
	/// Validation failures and address collisions reject before anything
	/// is mutated and carry the operator-facing reason. Tool and
	/// persistence failures are logged here with their diagnostics; pass
	/// the error through [`PeerUpdateError::client_message`] before
	/// showing it to a caller.
	#[tracing::instrument(skip(self, iface, request), fields(interface = %iface.name, %peer_id))]
	pub async fn update_peer(
		&self,
		iface: &InterfaceSnapshot,
		peer_id: &str,
		request: &PeerUpdateRequest,
	) -> Result<(), PeerUpdateError> {
		// An update needs a live interface to push to.
		if !iface.enabled {
			self.control
				.bring_up(iface)
				.await
				.map_err(|e| tool_failure(&e))?;
		}

		if !validate_address(&request.endpoint_allowed_ip) {
			return Err(PeerUpdateError::validation(
				"Endpoint Allowed IPs format is incorrect",
			));
		}

		let entries = split_address_list(&request.allowed_ip);
		if self.directory.address_taken(&entries, peer_id).await {
			return Err(PeerUpdateError::Collision(
				"Allowed IP already taken by another peer".to_string(),
			));
		}

		if !validate_dns_or_host(&request.dns) {
			return Err(PeerUpdateError::validation(
				"DNS IP-Address or FQDN is incorrect",
			));
		}

		if !(0..=1460).contains(&request.mtu) {
			return Err(PeerUpdateError::validation("MTU format is not correct"));
		}

		if request.keepalive < 0 {
			return Err(PeerUpdateError::validation(
				"Persistent Keepalive format is not correct",
			));
		}

		let supplied_key = request.private_key.expose();
		if !supplied_key.is_empty() {
			let derived_matches = WgPrivateKey::from_base64(supplied_key)
				.map(|key| key.public_key().to_base64() == peer_id)
				.unwrap_or(false);
			if !derived_matches {
				return Err(PeerUpdateError::validation(
					"Private key does not match with the public key",
				));
			}
		}

		let cleaned_allowed_ip = request.allowed_ip.replace(' ', "");
		if !matches_address_charset(&cleaned_allowed_ip) {
			return Err(PeerUpdateError::validation(
				"Allowed IPs entry format is incorrect",
			));
		}

		let staged = if request.preshared_key.expose().is_empty() {
			None
		} else {
			match StagedSecret::stage(&request.preshared_key) {
				Ok(staged) => Some(staged),
				Err(e) => {
					tracing::error!(error = %e, "Failed to stage preshared key");
					return Err(PeerUpdateError::Tool(e.to_string()));
				}
			}
		};
		let psk_arg = staged
			.as_ref()
			.map(StagedSecret::path_arg)
			.unwrap_or_else(|| "/dev/null".to_string());

		let set_result = self
			.control
			.set_peer(iface, peer_id, &cleaned_allowed_ip, &psk_arg)
			.await;
		// The staged secret is gone before anything else happens, whatever
		// the tool did.
		drop(staged);
		set_result.map_err(|e| tool_failure(&e))?;

		self.control
			.save_config(iface)
			.await
			.map_err(|e| tool_failure(&e))?;

		let update = PeerAttributeUpdate {
			name: request.name.clone(),
			private_key: request.private_key.clone(),
			dns: request.dns.clone(),
			endpoint_allowed_ip: request.endpoint_allowed_ip.clone(),
			allowed_ip: cleaned_allowed_ip,
			mtu: request.mtu,
			keepalive: request.keepalive,
			notes: request.notes.clone(),
			preshared_key: request.preshared_key.clone(),
		};
		self.store
			.update_peer_attributes(self.directory.interface(), peer_id, &update)
			.await
			.map_err(|e| {
				tracing::error!(error = %e, "peer attribute commit failed");
				PeerUpdateError::from(e)
			})?;

		// The commit stands even if the refresh fails; the next reload
		// catches the directory up.
		if let Err(e) = self.directory.reload().await {
			tracing::warn!(error = %e, "peer directory reload failed after update");
		}

		tracing::debug!("peer updated");
		Ok(())
	}

	/// Zero a peer's usage counters in the row and the directory.
	///
	/// Returns plain success/failure; persistence errors are logged here
	/// and never propagate. An unknown mode changes nothing and reports
	/// failure.
	#[tracing::instrument(skip(self), fields(interface = %self.directory.interface(), %peer_id, %mode))]
	pub async fn reset_data_usage(&self, peer_id: &str, mode: &str) -> bool {
		let Some(mode) = UsageResetMode::parse(mode) else {
			return false;
		};

		match self
			.store
			.reset_usage(self.directory.interface(), peer_id, mode)
			.await
		{
			Ok(()) => {
				self.directory.zero_usage(peer_id, mode).await;
				true
			}
			Err(e) => {
				tracing::error!(error = %e, "usage counter reset failed");
				false
			}
		}
	}
}

/// Log a tool failure with its diagnostics and downgrade it for the
/// caller.
fn tool_failure(err: &TunnelError) -> PeerUpdateError {
	match err {
		TunnelError::UnexpectedOutput { output } => {
			tracing::error!(%output, "Update peer failed when updating Allowed IPs");
		}
		TunnelError::SaveNotConfirmed { output } => {
			tracing::error!(%output, "Update peer failed when saving the configuration");
		}
		other => {
			tracing::error!(error = %other, "Subprocess call failed");
		}
	}
	PeerUpdateError::Tool(err.to_string())
}
