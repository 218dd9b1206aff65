// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Peer lifecycle services for warren tunnel interfaces.
//!
//! This crate sits between the HTTP layer and the tunnel tooling: it
//! validates peer attribute changes, pushes them to the live interface
//! through `wg`/`awg`, commits them to the database, and renders the
//! client-side profiles peers import into their apps.
//!
//! # Overview
//!
//! An attribute update runs a fixed protocol:
//! 1. Validate the replacement attributes (address syntax, DNS, MTU,
//!    keepalive range, private-key/identity match)
//! 2. Check the allowed addresses against every other peer on the
//!    interface, bringing the interface up first if it is down
//! 3. Stage the pre-shared key in a private temp file and push the change
//!    with `wg set` (or `awg set` for the extended variant)
//! 4. Persist the running interface config with `wg-quick save`
//! 5. Commit the attributes to the peer row and refresh the in-memory
//!    directory
//!
//! Profile generation is a pure function over a peer record and an
//! interface snapshot; it renders the `[Interface]`/`[Peer]` INI text,
//! resolves `{{ key }}` template references, and for the extended variant
//! also emits the provisioning descriptor JSON.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use warren_server_db::{PeerRepository, PeerStore};
//! use warren_server_peers::{CommandTunnelControl, PeerDirectory, PeerUpdateCoordinator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = warren_server_db::create_pool("sqlite://./warren.db").await?;
//!     let store: Arc<dyn PeerStore> = Arc::new(PeerRepository::new(pool));
//!
//!     let directory = Arc::new(PeerDirectory::new(store.clone(), "wg0"));
//!     directory.reload().await?;
//!
//!     let control = Arc::new(CommandTunnelControl::new());
//!     let coordinator = PeerUpdateCoordinator::new(store, control, directory);
//!
//!     let request = serde_json::from_str(r#"{"name": "laptop", "allowed_ip": "10.0.0.2/32"}"#)?;
//!     coordinator.update_peer(&iface, peer_id, &request).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod controller;
pub mod directory;
pub mod error;
pub mod profile;
pub mod staging;
pub mod update;

pub use controller::{CommandTunnelControl, TunnelControl};
pub use directory::PeerDirectory;
pub use error::{PeerUpdateError, ProfileError, Result, TunnelError, INTERNAL_ERROR_MESSAGE};
pub use profile::{derive_file_name, generate_profile, ProfileBundle};
pub use staging::StagedSecret;
pub use update::{PeerUpdateCoordinator, PeerUpdateRequest};
