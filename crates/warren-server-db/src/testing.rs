// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str(":memory:")
		.unwrap()
		.create_if_missing(true);

	// A single connection keeps every test query on the same in-memory database.
	SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.expect("Failed to create test pool")
}

pub async fn create_peers_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS peers (
			interface TEXT NOT NULL,
			id TEXT NOT NULL,
			name TEXT NOT NULL DEFAULT '',
			private_key TEXT NOT NULL DEFAULT '',
			dns TEXT NOT NULL DEFAULT '',
			endpoint_allowed_ip TEXT NOT NULL DEFAULT '',
			allowed_ip TEXT NOT NULL DEFAULT '',
			endpoint TEXT NOT NULL DEFAULT '',
			remote_endpoint TEXT NOT NULL DEFAULT '',
			preshared_key TEXT NOT NULL DEFAULT '',
			mtu INTEGER NOT NULL DEFAULT 0,
			keepalive INTEGER NOT NULL DEFAULT 0,
			notes TEXT NOT NULL DEFAULT '',
			status INTEGER NOT NULL DEFAULT 0,
			latest_handshake TEXT,
			total_receive REAL NOT NULL DEFAULT 0,
			total_sent REAL NOT NULL DEFAULT 0,
			total_data REAL NOT NULL DEFAULT 0,
			cumu_receive REAL NOT NULL DEFAULT 0,
			cumu_sent REAL NOT NULL DEFAULT 0,
			cumu_data REAL NOT NULL DEFAULT 0,
			PRIMARY KEY (interface, id)
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();
}

pub async fn create_peer_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	create_peers_table(&pool).await;
	pool
}

/// Insert a peer row with the given identity and allowed IPs, everything else defaulted.
pub async fn insert_test_peer(pool: &SqlitePool, interface: &str, id: &str, allowed_ip: &str) {
	sqlx::query("INSERT INTO peers (interface, id, allowed_ip) VALUES (?, ?, ?)")
		.bind(interface)
		.bind(id)
		.bind(allowed_ip)
		.execute(pool)
		.await
		.unwrap();
}
