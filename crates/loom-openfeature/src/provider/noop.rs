// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use loom_openfeature_core::{
	EvaluationContext, EvaluationResult, ProviderMetadata, Reason, ResolutionDetails,
};

use super::FeatureProvider;

const PASSED_IN_DEFAULT: &str = "Passed in default";

/// The provider every API starts with. Returns the caller's default for
/// every flag.
#[derive(Debug, Clone, Default)]
pub struct NoOpProvider {
	_private: (),
}

impl NoOpProvider {
	pub const NAME: &'static str = "No-op Provider";

	pub fn new() -> Self {
		Self::default()
	}

	fn passthrough<T>(default_value: T) -> EvaluationResult<ResolutionDetails<T>> {
		Ok(ResolutionDetails::new(default_value)
			.with_variant(PASSED_IN_DEFAULT)
			.with_reason(Reason::Default))
	}
}

#[async_trait]
impl FeatureProvider for NoOpProvider {
	fn metadata(&self) -> ProviderMetadata {
		ProviderMetadata::new(Self::NAME)
	}

	async fn resolve_boolean_details(
		&self,
		_flag_key: &str,
		default_value: bool,
		_context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<bool>> {
		Self::passthrough(default_value)
	}

	async fn resolve_string_details(
		&self,
		_flag_key: &str,
		default_value: String,
		_context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<String>> {
		Self::passthrough(default_value)
	}

	async fn resolve_integer_details(
		&self,
		_flag_key: &str,
		default_value: i64,
		_context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<i64>> {
		Self::passthrough(default_value)
	}

	async fn resolve_float_details(
		&self,
		_flag_key: &str,
		default_value: f64,
		_context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<f64>> {
		Self::passthrough(default_value)
	}

	async fn resolve_object_details(
		&self,
		_flag_key: &str,
		default_value: serde_json::Value,
		_context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<serde_json::Value>> {
		Self::passthrough(default_value)
	}
}
