// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provider status state machine.
//!
//! - `NOT_READY` is the initial status and the status after shutdown.
//! - `READY` after a successful initialize or a `PROVIDER_READY` event.
//! - `ERROR` after a failed initialize or a non-fatal `PROVIDER_ERROR` event.
//! - `FATAL` after a `PROVIDER_ERROR` carrying `PROVIDER_FATAL`. Events no
//!   longer change it; only shutdown resets the provider.
//! - `STALE` after a `PROVIDER_STALE` event.

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::event::ProviderEvent;

/// Lifecycle status of a provider instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderStatus {
	#[default]
	NotReady,
	Ready,
	Error,
	Stale,
	Fatal,
}

impl ProviderStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			ProviderStatus::NotReady => "NOT_READY",
			ProviderStatus::Ready => "READY",
			ProviderStatus::Error => "ERROR",
			ProviderStatus::Stale => "STALE",
			ProviderStatus::Fatal => "FATAL",
		}
	}

	/// Computes the status after `event` is emitted by a provider in this status.
	///
	/// `FATAL` absorbs every event. Configuration changes never change status.
	pub fn on_event(self, event: ProviderEvent, error_code: Option<ErrorCode>) -> ProviderStatus {
		if self == ProviderStatus::Fatal {
			return self;
		}
		match event {
			ProviderEvent::Ready => ProviderStatus::Ready,
			ProviderEvent::Stale => ProviderStatus::Stale,
			ProviderEvent::Error if error_code == Some(ErrorCode::ProviderFatal) => {
				ProviderStatus::Fatal
			}
			ProviderEvent::Error => ProviderStatus::Error,
			ProviderEvent::ConfigurationChanged => self,
		}
	}

	/// The event whose handlers should run immediately when registered while
	/// a provider is in this status.
	pub fn matching_event(self) -> Option<ProviderEvent> {
		match self {
			ProviderStatus::Ready => Some(ProviderEvent::Ready),
			ProviderStatus::Error | ProviderStatus::Fatal => Some(ProviderEvent::Error),
			ProviderStatus::Stale => Some(ProviderEvent::Stale),
			ProviderStatus::NotReady => None,
		}
	}

	/// The error an evaluation short-circuits with, if any.
	pub fn short_circuit_code(self) -> Option<ErrorCode> {
		match self {
			ProviderStatus::NotReady => Some(ErrorCode::ProviderNotReady),
			ProviderStatus::Fatal => Some(ErrorCode::ProviderFatal),
			_ => None,
		}
	}
}

impl std::fmt::Display for ProviderStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_status_is_not_ready() {
		assert_eq!(ProviderStatus::default(), ProviderStatus::NotReady);
	}

	#[test]
	fn ready_event_moves_to_ready() {
		for status in [
			ProviderStatus::NotReady,
			ProviderStatus::Error,
			ProviderStatus::Stale,
		] {
			assert_eq!(
				status.on_event(ProviderEvent::Ready, None),
				ProviderStatus::Ready
			);
		}
	}

	#[test]
	fn error_event_distinguishes_fatal() {
		let ready = ProviderStatus::Ready;
		assert_eq!(
			ready.on_event(ProviderEvent::Error, Some(ErrorCode::General)),
			ProviderStatus::Error
		);
		assert_eq!(
			ready.on_event(ProviderEvent::Error, None),
			ProviderStatus::Error
		);
		assert_eq!(
			ready.on_event(ProviderEvent::Error, Some(ErrorCode::ProviderFatal)),
			ProviderStatus::Fatal
		);
	}

	#[test]
	fn fatal_is_terminal() {
		let fatal = ProviderStatus::Fatal;
		assert_eq!(fatal.on_event(ProviderEvent::Ready, None), fatal);
		assert_eq!(fatal.on_event(ProviderEvent::Stale, None), fatal);
		assert_eq!(fatal.on_event(ProviderEvent::Error, None), fatal);
	}

	#[test]
	fn configuration_changed_keeps_status() {
		assert_eq!(
			ProviderStatus::Stale.on_event(ProviderEvent::ConfigurationChanged, None),
			ProviderStatus::Stale
		);
	}

	#[test]
	fn short_circuit_codes() {
		assert_eq!(
			ProviderStatus::NotReady.short_circuit_code(),
			Some(ErrorCode::ProviderNotReady)
		);
		assert_eq!(
			ProviderStatus::Fatal.short_circuit_code(),
			Some(ErrorCode::ProviderFatal)
		);
		assert_eq!(ProviderStatus::Ready.short_circuit_code(), None);
		assert_eq!(ProviderStatus::Error.short_circuit_code(), None);
		assert_eq!(ProviderStatus::Stale.short_circuit_code(), None);
	}
}
