// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provider events.
//!
//! Providers emit these to announce lifecycle and configuration changes. The
//! SDK updates the emitting provider's status and fans the event out to
//! handlers registered on the API and on clients bound to that provider.
//!
//! - `PROVIDER_READY` - provider can serve evaluations
//! - `PROVIDER_CONFIGURATION_CHANGED` - flag configuration changed
//! - `PROVIDER_ERROR` - provider failed; fatal when `error_code` is `PROVIDER_FATAL`
//! - `PROVIDER_STALE` - provider serves cached, possibly outdated values

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, EvaluationError};
use crate::value::FlagMetadataValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderEvent {
	#[serde(rename = "PROVIDER_READY")]
	Ready,
	#[serde(rename = "PROVIDER_CONFIGURATION_CHANGED")]
	ConfigurationChanged,
	#[serde(rename = "PROVIDER_ERROR")]
	Error,
	#[serde(rename = "PROVIDER_STALE")]
	Stale,
}

impl ProviderEvent {
	pub fn as_str(&self) -> &'static str {
		match self {
			ProviderEvent::Ready => "PROVIDER_READY",
			ProviderEvent::ConfigurationChanged => "PROVIDER_CONFIGURATION_CHANGED",
			ProviderEvent::Error => "PROVIDER_ERROR",
			ProviderEvent::Stale => "PROVIDER_STALE",
		}
	}
}

impl std::fmt::Display for ProviderEvent {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Payload delivered with a [`ProviderEvent`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
	/// Name of the provider that emitted the event. Filled in by the SDK when
	/// the provider leaves it empty.
	#[serde(default)]
	pub provider_name: String,
	/// Keys of flags whose configuration changed.
	#[serde(default)]
	pub flags_changed: Vec<String>,
	pub message: Option<String>,
	pub error_code: Option<ErrorCode>,
	#[serde(default)]
	pub metadata: BTreeMap<String, FlagMetadataValue>,
}

impl EventDetails {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_provider_name(mut self, provider_name: impl Into<String>) -> Self {
		self.provider_name = provider_name.into();
		self
	}

	pub fn with_flags_changed(mut self, flags_changed: Vec<String>) -> Self {
		self.flags_changed = flags_changed;
		self
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());
		self
	}

	pub fn with_error_code(mut self, error_code: ErrorCode) -> Self {
		self.error_code = Some(error_code);
		self
	}

	pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<FlagMetadataValue>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}

	/// Details describing a failure.
	pub fn from_error(error: &EvaluationError) -> Self {
		Self {
			message: error.message.clone(),
			error_code: Some(error.code),
			..Self::default()
		}
	}
}
