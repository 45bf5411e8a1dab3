// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for flag evaluation and provider management.
//!
//! Two families exist:
//!
//! - [`EvaluationError`] is the tagged `{code, message}` error produced by
//!   providers, hooks and the evaluation pipeline. It never escapes a client's
//!   public evaluation methods; the client turns it into an `ERROR` result.
//! - [`OpenFeatureError`] reports API misuse (for example binding a provider to
//!   an empty domain) directly at the call site.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for evaluation operations.
pub type EvaluationResult<T> = std::result::Result<T, EvaluationError>;

/// Result type alias for API-level operations.
pub type Result<T> = std::result::Result<T, OpenFeatureError>;

/// Closed set of error codes an evaluation can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	ProviderNotReady,
	ProviderFatal,
	FlagNotFound,
	ParseError,
	TypeMismatch,
	TargetingKeyMissing,
	InvalidContext,
	General,
}

impl ErrorCode {
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorCode::ProviderNotReady => "PROVIDER_NOT_READY",
			ErrorCode::ProviderFatal => "PROVIDER_FATAL",
			ErrorCode::FlagNotFound => "FLAG_NOT_FOUND",
			ErrorCode::ParseError => "PARSE_ERROR",
			ErrorCode::TypeMismatch => "TYPE_MISMATCH",
			ErrorCode::TargetingKeyMissing => "TARGETING_KEY_MISSING",
			ErrorCode::InvalidContext => "INVALID_CONTEXT",
			ErrorCode::General => "GENERAL",
		}
	}
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// An evaluation failure carrying an [`ErrorCode`] and an optional message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}{}", .code, .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct EvaluationError {
	pub code: ErrorCode,
	pub message: Option<String>,
}

impl EvaluationError {
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self {
			code,
			message: Some(message.into()),
		}
	}

	/// Creates an error with a code and no message.
	pub fn from_code(code: ErrorCode) -> Self {
		Self {
			code,
			message: None,
		}
	}

	pub fn provider_not_ready(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::ProviderNotReady, message)
	}

	pub fn provider_fatal(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::ProviderFatal, message)
	}

	pub fn flag_not_found(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::FlagNotFound, message)
	}

	pub fn parse_error(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::ParseError, message)
	}

	pub fn type_mismatch(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::TypeMismatch, message)
	}

	pub fn targeting_key_missing(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::TargetingKeyMissing, message)
	}

	pub fn invalid_context(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::InvalidContext, message)
	}

	pub fn general(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::General, message)
	}

	/// Returns true if this error marks its provider as permanently unusable.
	pub fn is_fatal(&self) -> bool {
		self.code == ErrorCode::ProviderFatal
	}
}

impl From<OpenFeatureError> for EvaluationError {
	fn from(err: OpenFeatureError) -> Self {
		EvaluationError::new(err.code(), err.to_string())
	}
}

/// Errors raised immediately by API calls, outside any evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenFeatureError {
	/// A domain was required but was empty.
	#[error("No domain")]
	NoDomain,

	/// Two multi-provider entries were given the same explicit name.
	#[error("duplicate provider name: {0}")]
	DuplicateProviderName(String),

	/// Configuration rejected at construction time.
	#[error("invalid configuration: {0}")]
	InvalidConfiguration(String),
}

impl OpenFeatureError {
	/// Every API misuse is reported with the `GENERAL` code.
	pub fn code(&self) -> ErrorCode {
		ErrorCode::General
	}
}
