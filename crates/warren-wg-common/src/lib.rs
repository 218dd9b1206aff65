// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared domain types for the warren tunnel system: key material,
//! address validation, redacted secrets, the typed peer record, and the
//! interface snapshot the peer operations take as explicit input.

pub mod address;
pub mod iface;
pub mod keys;
pub mod record;
pub mod secret;

pub use address::{matches_address_charset, validate_address, validate_dns_or_host};
pub use iface::{AmneziaParams, InterfaceSnapshot, PeerOverrides, TunnelVariant};
pub use keys::{KeyError, WgPrivateKey, WgPublicKey};
pub use record::{split_address_list, PeerRecord, UsageResetMode};
pub use secret::{SecretString, REDACTED};
