// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resolution and evaluation results.
//!
//! A provider answers with [`ResolutionDetails`]; the client adds the flag key
//! and hands the application an [`EvaluationDetails`].

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, EvaluationError};
use crate::value::{FlagMetadata, FlagValue, FlagValueType};

/// Why a particular value was returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
	/// The value is statically configured.
	Static,
	/// The value fell back to a default.
	Default,
	/// A targeting rule matched.
	TargetingMatch,
	/// A pseudorandom assignment, e.g. a percentage rollout.
	Split,
	/// The value was served from a cache.
	Cached,
	/// The flag is disabled.
	Disabled,
	Unknown,
	/// Evaluation failed and the default was returned.
	Error,
}

impl Reason {
	pub fn as_str(&self) -> &'static str {
		match self {
			Reason::Static => "STATIC",
			Reason::Default => "DEFAULT",
			Reason::TargetingMatch => "TARGETING_MATCH",
			Reason::Split => "SPLIT",
			Reason::Cached => "CACHED",
			Reason::Disabled => "DISABLED",
			Reason::Unknown => "UNKNOWN",
			Reason::Error => "ERROR",
		}
	}
}

impl std::fmt::Display for Reason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A provider's raw answer to a flag lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionDetails<T> {
	pub value: T,
	pub variant: Option<String>,
	pub reason: Option<Reason>,
	#[serde(default)]
	pub flag_metadata: FlagMetadata,
	pub error_code: Option<ErrorCode>,
	pub error_message: Option<String>,
}

impl<T> ResolutionDetails<T> {
	/// A resolution carrying only a value.
	pub fn new(value: T) -> Self {
		Self {
			value,
			variant: None,
			reason: None,
			flag_metadata: FlagMetadata::new(),
			error_code: None,
			error_message: None,
		}
	}

	/// A resolution that failed and falls back to `default_value`.
	pub fn error(default_value: T, error: &EvaluationError) -> Self {
		Self {
			value: default_value,
			variant: None,
			reason: Some(Reason::Error),
			flag_metadata: FlagMetadata::new(),
			error_code: Some(error.code),
			error_message: error.message.clone(),
		}
	}

	pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
		self.variant = Some(variant.into());
		self
	}

	pub fn with_reason(mut self, reason: Reason) -> Self {
		self.reason = Some(reason);
		self
	}

	pub fn with_metadata(mut self, flag_metadata: FlagMetadata) -> Self {
		self.flag_metadata = flag_metadata;
		self
	}

	/// True when the resolution reports an error, by code or by reason.
	pub fn is_error(&self) -> bool {
		self.error_code.is_some() || self.reason == Some(Reason::Error)
	}

	/// Extracts the error carried in the resolution, if any.
	pub fn error_details(&self) -> Option<EvaluationError> {
		self.error_code.map(|code| EvaluationError {
			code,
			message: self.error_message.clone(),
		})
	}

	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResolutionDetails<U> {
		ResolutionDetails {
			value: f(self.value),
			variant: self.variant,
			reason: self.reason,
			flag_metadata: self.flag_metadata,
			error_code: self.error_code,
			error_message: self.error_message,
		}
	}
}

impl<T: FlagValueType> ResolutionDetails<T> {
	/// Erases the value type.
	pub fn into_flag_value(self) -> ResolutionDetails<FlagValue> {
		self.map(T::into_flag_value)
	}
}

/// The result of one flag evaluation, as returned to application code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationDetails<T> {
	pub flag_key: String,
	pub value: T,
	pub variant: Option<String>,
	#[serde(default)]
	pub flag_metadata: FlagMetadata,
	pub reason: Option<Reason>,
	pub error_code: Option<ErrorCode>,
	pub error_message: Option<String>,
}

impl<T> EvaluationDetails<T> {
	/// Builds the evaluation result from a provider resolution.
	pub fn from_resolution(flag_key: impl Into<String>, resolution: ResolutionDetails<T>) -> Self {
		Self {
			flag_key: flag_key.into(),
			value: resolution.value,
			variant: resolution.variant,
			flag_metadata: resolution.flag_metadata,
			reason: resolution.reason,
			error_code: resolution.error_code,
			error_message: resolution.error_message,
		}
	}

	/// An `ERROR` result carrying the default value.
	pub fn error(flag_key: impl Into<String>, default_value: T, error: &EvaluationError) -> Self {
		Self {
			flag_key: flag_key.into(),
			value: default_value,
			variant: None,
			flag_metadata: FlagMetadata::new(),
			reason: Some(Reason::Error),
			error_code: Some(error.code),
			error_message: error.message.clone(),
		}
	}

	pub fn is_error(&self) -> bool {
		self.error_code.is_some()
	}

	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> EvaluationDetails<U> {
		EvaluationDetails {
			flag_key: self.flag_key,
			value: f(self.value),
			variant: self.variant,
			flag_metadata: self.flag_metadata,
			reason: self.reason,
			error_code: self.error_code,
			error_message: self.error_message,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resolution_error_carries_code_and_message() {
		let err = EvaluationError::flag_not_found("missing");
		let res = ResolutionDetails::error(false, &err);

		assert!(!res.value);
		assert_eq!(res.reason, Some(Reason::Error));
		assert_eq!(res.error_code, Some(ErrorCode::FlagNotFound));
		assert_eq!(res.error_details(), Some(err));
	}

	#[test]
	fn error_reason_without_code_is_still_an_error() {
		let res = ResolutionDetails::new(1i64).with_reason(Reason::Error);
		assert!(res.is_error());
		assert!(res.error_details().is_none());
	}

	#[test]
	fn evaluation_details_copy_resolution_fields() {
		let mut metadata = FlagMetadata::new();
		metadata.insert("source".to_string(), "test".into());

		let res = ResolutionDetails::new("on".to_string())
			.with_variant("on")
			.with_reason(Reason::TargetingMatch)
			.with_metadata(metadata.clone());

		let details = EvaluationDetails::from_resolution("ui.theme", res);
		assert_eq!(details.flag_key, "ui.theme");
		assert_eq!(details.value, "on");
		assert_eq!(details.variant.as_deref(), Some("on"));
		assert_eq!(details.reason, Some(Reason::TargetingMatch));
		assert_eq!(details.flag_metadata, metadata);
		assert!(!details.is_error());
	}

	#[test]
	fn into_flag_value_erases_type() {
		let res = ResolutionDetails::new(true).with_variant("on").into_flag_value();
		assert_eq!(res.value, FlagValue::Bool(true));
		assert_eq!(res.variant.as_deref(), Some("on"));
	}

	#[test]
	fn reason_serializes_screaming_snake_case() {
		assert_eq!(
			serde_json::to_string(&Reason::TargetingMatch).unwrap(),
			"\"TARGETING_MATCH\""
		);
	}
}
