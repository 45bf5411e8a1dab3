// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

/// Describes a provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderMetadata {
	pub name: String,
}

impl ProviderMetadata {
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into() }
	}
}

/// Describes a client. `domain` is `None` for clients bound to the default provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientMetadata {
	pub domain: Option<String>,
}

impl ClientMetadata {
	pub fn new(domain: Option<String>) -> Self {
		Self { domain }
	}
}
