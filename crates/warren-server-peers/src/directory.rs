// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory peer directory for one interface.
//!
//! Holds the last loaded set of peer records so address-collision checks
//! and lookups run without a database round trip. The coordinator reloads
//! it after every successful commit; readers always see a consistent,
//! possibly slightly stale, snapshot.

use std::sync::Arc;

use tokio::sync::RwLock;

use warren_server_db::{DbError, PeerStore};
use warren_wg_common::{PeerRecord, UsageResetMode};

pub struct PeerDirectory {
	store: Arc<dyn PeerStore>,
	interface: String,
	peers: RwLock<Vec<PeerRecord>>,
}

impl PeerDirectory {
	pub fn new(store: Arc<dyn PeerStore>, interface: impl Into<String>) -> Self {
		Self {
			store,
			interface: interface.into(),
			peers: RwLock::new(Vec::new()),
		}
	}

	pub fn interface(&self) -> &str {
		&self.interface
	}

	/// Replace the snapshot with the current database state.
	#[tracing::instrument(skip(self), fields(interface = %self.interface))]
	pub async fn reload(&self) -> Result<(), DbError> {
		let peers = self.store.list_peers(&self.interface).await?;
		let count = peers.len();
		*self.peers.write().await = peers;

		tracing::debug!(peers = count, "peer directory reloaded");
		Ok(())
	}

	pub async fn snapshot(&self) -> Vec<PeerRecord> {
		self.peers.read().await.clone()
	}

	pub async fn find(&self, id: &str) -> Option<PeerRecord> {
		self.peers
			.read()
			.await
			.iter()
			.find(|peer| peer.id == id)
			.cloned()
	}

	/// Whether any peer other than `exclude_id` already claims one of
	/// `entries` in its allowed-address list.
	pub async fn address_taken(&self, entries: &[String], exclude_id: &str) -> bool {
		let peers = self.peers.read().await;
		peers
			.iter()
			.filter(|peer| peer.id != exclude_id)
			.any(|peer| {
				peer.allowed_ip_entries()
					.iter()
					.any(|entry| entries.contains(entry))
			})
	}

	/// Zero the snapshot's usage counters for one peer, mirroring the row
	/// update of the same mode. Unknown peers are ignored.
	pub async fn zero_usage(&self, id: &str, mode: UsageResetMode) {
		let mut peers = self.peers.write().await;
		let Some(peer) = peers.iter_mut().find(|peer| peer.id == id) else {
			return;
		};

		match mode {
			UsageResetMode::Total => {
				peer.total_data = 0.0;
				peer.cumu_data = 0.0;
				peer.total_receive = 0.0;
				peer.cumu_receive = 0.0;
				peer.total_sent = 0.0;
				peer.cumu_sent = 0.0;
			}
			UsageResetMode::Receive => {
				peer.total_receive = 0.0;
				peer.cumu_receive = 0.0;
			}
			UsageResetMode::Sent => {
				peer.total_sent = 0.0;
				peer.cumu_sent = 0.0;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio_test::assert_ok;
	use warren_server_db::testing::{create_peer_test_pool, insert_test_peer};
	use warren_server_db::PeerRepository;

	async fn make_directory() -> (sqlx::SqlitePool, PeerDirectory) {
		let pool = create_peer_test_pool().await;
		let store = Arc::new(PeerRepository::new(pool.clone()));
		(pool, PeerDirectory::new(store, "wg0"))
	}

	#[tokio::test]
	async fn test_reload_populates_snapshot_for_own_interface() {
		let (pool, directory) = make_directory().await;
		insert_test_peer(&pool, "wg0", "pk-a", "10.0.0.2/32").await;
		insert_test_peer(&pool, "wg0", "pk-b", "10.0.0.3/32").await;
		insert_test_peer(&pool, "wg1", "pk-other", "10.0.1.2/32").await;

		assert_ok!(directory.reload().await);

		let snapshot = directory.snapshot().await;
		assert_eq!(snapshot.len(), 2);
		assert_eq!(snapshot[0].id, "pk-a");
		assert_eq!(snapshot[1].id, "pk-b");
	}

	#[tokio::test]
	async fn test_find_by_identity() {
		let (pool, directory) = make_directory().await;
		insert_test_peer(&pool, "wg0", "pk-a", "10.0.0.2/32").await;
		assert_ok!(directory.reload().await);

		assert!(directory.find("pk-a").await.is_some());
		assert!(directory.find("pk-b").await.is_none());
	}

	/// Test: collision detection excludes the peer being updated.
	///
	/// Why this test is important: every update re-submits the peer's own
	/// addresses. Without self-exclusion no peer could ever keep its
	/// current allowed IPs through an update.
	#[tokio::test]
	async fn test_address_taken_excludes_self() {
		let (pool, directory) = make_directory().await;
		insert_test_peer(&pool, "wg0", "pk-a", "10.0.0.2/32").await;
		insert_test_peer(&pool, "wg0", "pk-b", "10.0.0.3/32, 10.0.0.4/32").await;
		assert_ok!(directory.reload().await);

		let own = vec!["10.0.0.2/32".to_string()];
		assert!(!directory.address_taken(&own, "pk-a").await);

		// The same entries from any other peer collide.
		assert!(directory.address_taken(&own, "pk-b").await);

		let taken = vec!["10.0.0.9/32".to_string(), "10.0.0.4/32".to_string()];
		assert!(directory.address_taken(&taken, "pk-a").await);

		let free = vec!["10.0.0.9/32".to_string()];
		assert!(!directory.address_taken(&free, "pk-a").await);
	}

	#[tokio::test]
	async fn test_address_taken_matches_trimmed_entries() {
		let (pool, directory) = make_directory().await;
		insert_test_peer(&pool, "wg0", "pk-a", "10.0.0.2/32 , 10.0.0.5/32").await;
		assert_ok!(directory.reload().await);

		let entries = vec!["10.0.0.5/32".to_string()];
		assert!(directory.address_taken(&entries, "pk-b").await);
	}

	#[tokio::test]
	async fn test_reload_reflects_external_changes() {
		let (pool, directory) = make_directory().await;
		insert_test_peer(&pool, "wg0", "pk-a", "10.0.0.2/32").await;
		assert_ok!(directory.reload().await);

		sqlx::query("UPDATE peers SET name = 'renamed' WHERE id = 'pk-a'")
			.execute(&pool)
			.await
			.unwrap();

		assert_ok!(directory.reload().await);
		assert_eq!(directory.find("pk-a").await.unwrap().name, "renamed");
	}

	#[tokio::test]
	async fn test_zero_usage_clears_only_requested_mode() {
		let (pool, directory) = make_directory().await;
		insert_test_peer(&pool, "wg0", "pk-a", "10.0.0.2/32").await;
		sqlx::query(
			"UPDATE peers SET total_receive = 1.0, cumu_receive = 2.0,
			        total_sent = 3.0, cumu_sent = 4.0, total_data = 5.0, cumu_data = 6.0
			 WHERE id = 'pk-a'",
		)
		.execute(&pool)
		.await
		.unwrap();
		assert_ok!(directory.reload().await);

		directory.zero_usage("pk-a", UsageResetMode::Receive).await;

		let peer = directory.find("pk-a").await.unwrap();
		assert_eq!(peer.total_receive, 0.0);
		assert_eq!(peer.cumu_receive, 0.0);
		assert_eq!(peer.total_sent, 3.0);
		assert_eq!(peer.cumu_sent, 4.0);
		assert_eq!(peer.total_data, 5.0);
		assert_eq!(peer.cumu_data, 6.0);

		directory.zero_usage("pk-a", UsageResetMode::Total).await;
		let peer = directory.find("pk-a").await.unwrap();
		assert_eq!(peer.total_sent, 0.0);
		assert_eq!(peer.cumu_data, 0.0);
	}

	#[tokio::test]
	async fn test_zero_usage_unknown_peer_is_ignored() {
		let (_pool, directory) = make_directory().await;
		directory.zero_usage("pk-missing", UsageResetMode::Total).await;
		assert!(directory.snapshot().await.is_empty());
	}
}
