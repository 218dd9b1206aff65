// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pure syntax validation for the address-shaped fields a peer carries.
//!
//! These checks never touch the network; they gate what is allowed to
//! reach the control tool and the stored record.

use ipnet::IpNet;
use std::net::IpAddr;

/// Validates one or more comma-separated IPv4/IPv6 addresses or CIDR
/// ranges. Internal whitespace is ignored. Empty input is rejected: an
/// empty string is one empty token.
pub fn validate_address(text: &str) -> bool {
	let cleaned = text.replace(' ', "");
	cleaned.split(',').all(is_address_or_range)
}

/// Validates comma-separated tokens that are each an IP literal or a
/// hostname/FQDN. Empty input is accepted (the field is optional).
pub fn validate_dns_or_host(text: &str) -> bool {
	if text.is_empty() {
		return true;
	}
	let cleaned = text.replace(' ', "");
	cleaned
		.split(',')
		.all(|token| token.parse::<IpAddr>().is_ok() || is_valid_hostname(token))
}

/// Conservative character filter for an allowed-address list before it is
/// handed to the control tool. Hex digits, dots, commas, colons, slashes
/// and spaces only; anything else is rejected up front.
pub fn matches_address_charset(text: &str) -> bool {
	!text.is_empty()
		&& text
			.chars()
			.all(|c| c.is_ascii_hexdigit() || matches!(c, '.' | ',' | ':' | '/' | ' '))
}

fn is_address_or_range(token: &str) -> bool {
	if token.is_empty() {
		return false;
	}
	token.parse::<IpNet>().is_ok() || token.parse::<IpAddr>().is_ok()
}

fn is_valid_hostname(token: &str) -> bool {
	if token.is_empty() || token.len() > 253 {
		return false;
	}
	token.split('.').all(is_valid_label)
}

fn is_valid_label(label: &str) -> bool {
	if label.is_empty() || label.len() > 63 {
		return false;
	}
	if label.starts_with('-') || label.ends_with('-') {
		return false;
	}
	label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
