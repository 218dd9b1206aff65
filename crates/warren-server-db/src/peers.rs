// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Peer repository for database operations.
//!
//! One row per tunnel peer, keyed by `(interface, id)` where `id` is the
//! peer's WireGuard public key. Attribute updates are committed only after
//! the kernel interface has accepted the change, so the table always mirrors
//! the last applied configuration rather than the last requested one.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::SqlitePool;

use warren_wg_common::{PeerRecord, SecretString, UsageResetMode};

use crate::error::DbError;

/// Raw shape of a `peers` row, exactly as stored.
///
/// Counters are REAL columns holding byte totals in gigabytes, status is an
/// INTEGER flag and `latest_handshake` is a free-form timestamp string that
/// the poller writes. Conversion into [`PeerRecord`] happens in `TryFrom`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PeerRow {
	pub interface: String,
	pub id: String,
	pub name: String,
	pub private_key: String,
	pub dns: String,
	pub endpoint_allowed_ip: String,
	pub allowed_ip: String,
	pub endpoint: String,
	pub remote_endpoint: String,
	pub preshared_key: String,
	pub mtu: i64,
	pub keepalive: i64,
	pub notes: String,
	pub status: i64,
	pub latest_handshake: Option<String>,
	pub total_receive: f64,
	pub total_sent: f64,
	pub total_data: f64,
	pub cumu_receive: f64,
	pub cumu_sent: f64,
	pub cumu_data: f64,
}

impl TryFrom<PeerRow> for PeerRecord {
	type Error = DbError;

	fn try_from(row: PeerRow) -> Result<Self, DbError> {
		let latest_handshake = match row.latest_handshake.as_deref() {
			Some(raw) if !raw.is_empty() => Some(parse_handshake(raw)?),
			_ => None,
		};

		Ok(PeerRecord {
			id: row.id,
			name: row.name,
			private_key: SecretString::new(row.private_key),
			dns: row.dns,
			endpoint_allowed_ip: row.endpoint_allowed_ip,
			allowed_ip: row.allowed_ip,
			endpoint: row.endpoint,
			remote_endpoint: row.remote_endpoint,
			preshared_key: SecretString::new(row.preshared_key),
			mtu: row.mtu,
			keepalive: row.keepalive,
			notes: row.notes,
			status: row.status != 0,
			latest_handshake,
			total_receive: row.total_receive,
			total_sent: row.total_sent,
			total_data: row.total_data,
			cumu_receive: row.cumu_receive,
			cumu_sent: row.cumu_sent,
			cumu_data: row.cumu_data,
		})
	}
}

/// Parse a handshake timestamp in either RFC 3339 or the poller's
/// `YYYY-MM-DD HH:MM:SS` form. Both are stored in UTC.
fn parse_handshake(raw: &str) -> Result<DateTime<Utc>, DbError> {
	if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
		return Ok(parsed.with_timezone(&Utc));
	}

	NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
		.map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
		.map_err(|e| DbError::Internal(format!("unparseable handshake timestamp {raw:?}: {e}")))
}

/// Replacement attribute set for a peer, written in one transaction after
/// the interface mutation succeeds.
///
/// Counters, status and handshake are owned by the traffic poller and are
/// deliberately absent here.
#[derive(Debug, Clone)]
pub struct PeerAttributeUpdate {
	pub name: String,
	pub private_key: SecretString,
	pub dns: String,
	pub endpoint_allowed_ip: String,
	pub allowed_ip: String,
	pub mtu: i64,
	pub keepalive: i64,
	pub notes: String,
	pub preshared_key: SecretString,
}

/// Repository for peer database operations.
#[derive(Clone)]
pub struct PeerRepository {
	pool: SqlitePool,
}

impl PeerRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	const SELECT_COLUMNS: &'static str = "SELECT interface, id, name, private_key, dns, \
		 endpoint_allowed_ip, allowed_ip, endpoint, remote_endpoint, preshared_key, \
		 mtu, keepalive, notes, status, latest_handshake, \
		 total_receive, total_sent, total_data, cumu_receive, cumu_sent, cumu_data \
		 FROM peers";

	/// Fetch every peer configured on one interface, in insertion order.
	#[tracing::instrument(skip(self), fields(%interface))]
	pub async fn list_peers(&self, interface: &str) -> Result<Vec<PeerRecord>, DbError> {
		let query = format!("{} WHERE interface = ? ORDER BY rowid", Self::SELECT_COLUMNS);
		let rows: Vec<PeerRow> = sqlx::query_as(&query)
			.bind(interface)
			.fetch_all(&self.pool)
			.await?;

		rows.into_iter().map(PeerRecord::try_from).collect()
	}

	#[tracing::instrument(skip(self), fields(%interface, %id))]
	pub async fn get_peer(&self, interface: &str, id: &str) -> Result<Option<PeerRecord>, DbError> {
		let query = format!("{} WHERE interface = ? AND id = ?", Self::SELECT_COLUMNS);
		let row: Option<PeerRow> = sqlx::query_as(&query)
			.bind(interface)
			.bind(id)
			.fetch_optional(&self.pool)
			.await?;

		row.map(PeerRecord::try_from).transpose()
	}

	/// Replace the editable attributes of one peer.
	///
	/// Runs in a transaction and rolls back when the peer row does not
	/// exist, returning `DbError::NotFound`.
	#[tracing::instrument(skip(self, update), fields(%interface, %id))]
	pub async fn update_peer_attributes(
		&self,
		interface: &str,
		id: &str,
		update: &PeerAttributeUpdate,
	) -> Result<(), DbError> {
		let mut tx = self.pool.begin().await?;

		let result = sqlx::query(
			"UPDATE peers SET name = ?, private_key = ?, dns = ?, endpoint_allowed_ip = ?,
			        allowed_ip = ?, mtu = ?, keepalive = ?, notes = ?, preshared_key = ?
			 WHERE interface = ? AND id = ?",
		)
		.bind(&update.name)
		.bind(update.private_key.expose())
		.bind(&update.dns)
		.bind(&update.endpoint_allowed_ip)
		.bind(&update.allowed_ip)
		.bind(update.mtu)
		.bind(update.keepalive)
		.bind(&update.notes)
		.bind(update.preshared_key.expose())
		.execute(&mut *tx)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("peer {id} on {interface}")));
		}

		tx.commit().await?;
		Ok(())
	}

	/// Zero the accumulated data counters for one peer.
	///
	/// `Total` clears all six counter columns, `Receive` and `Sent` clear
	/// only their directional pair. Resetting a peer that does not exist is
	/// a no-op, not an error.
	#[tracing::instrument(skip(self), fields(%interface, %id, mode = mode.as_str()))]
	pub async fn reset_usage(
		&self,
		interface: &str,
		id: &str,
		mode: UsageResetMode,
	) -> Result<(), DbError> {
		let sql = match mode {
			UsageResetMode::Total => {
				"UPDATE peers SET total_data = 0, cumu_data = 0, total_receive = 0, \
				 cumu_receive = 0, total_sent = 0, cumu_sent = 0 \
				 WHERE interface = ? AND id = ?"
			}
			UsageResetMode::Receive => {
				"UPDATE peers SET total_receive = 0, cumu_receive = 0 \
				 WHERE interface = ? AND id = ?"
			}
			UsageResetMode::Sent => {
				"UPDATE peers SET total_sent = 0, cumu_sent = 0 \
				 WHERE interface = ? AND id = ?"
			}
		};

		sqlx::query(sql)
			.bind(interface)
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(())
	}
}

/// Store abstraction over peer persistence, for services that should not
/// depend on a concrete pool.
#[async_trait]
pub trait PeerStore: Send + Sync {
	async fn list_peers(&self, interface: &str) -> Result<Vec<PeerRecord>, DbError>;
	async fn get_peer(&self, interface: &str, id: &str) -> Result<Option<PeerRecord>, DbError>;
	async fn update_peer_attributes(
		&self,
		interface: &str,
		id: &str,
		update: &PeerAttributeUpdate,
	) -> Result<(), DbError>;
	async fn reset_usage(
		&self,
		interface: &str,
		id: &str,
		mode: UsageResetMode,
	) -> Result<(), DbError>;
}

#[async_trait]
impl PeerStore for PeerRepository {
	async fn list_peers(&self, interface: &str) -> Result<Vec<PeerRecord>, DbError> {
		PeerRepository::list_peers(self, interface).await
	}

	async fn get_peer(&self, interface: &str, id: &str) -> Result<Option<PeerRecord>, DbError> {
		PeerRepository::get_peer(self, interface, id).await
	}

	async fn update_peer_attributes(
		&self,
		interface: &str,
		id: &str,
		update: &PeerAttributeUpdate,
	) -> Result<(), DbError> {
		PeerRepository::update_peer_attributes(self, interface, id, update).await
	}

	async fn reset_usage(
		&self,
		interface: &str,
		id: &str,
		mode: UsageResetMode,
	) -> Result<(), DbError> {
		PeerRepository::reset_usage(self, interface, id, mode).await
	}
}
