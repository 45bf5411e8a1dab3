// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! A hook that logs every evaluation stage through `tracing`.

use async_trait::async_trait;
use loom_openfeature_core::{
	EvaluationContext, EvaluationDetails, EvaluationError, EvaluationResult, FlagValue,
};
use tracing::{debug, error};

use super::{Hook, HookContext, HookData, HookHints};

/// Logs `before`, `after` and `error` stages with structured fields.
///
/// `before` and `after` log at debug level, `error` at error level. The
/// evaluation context is only logged when explicitly enabled since it often
/// carries user identifiers.
#[derive(Debug, Clone, Default)]
pub struct LoggingHook {
	include_evaluation_context: bool,
}

impl LoggingHook {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn builder() -> LoggingHookBuilder {
		LoggingHookBuilder::default()
	}

	fn context_field(&self, ctx: &HookContext) -> Option<String> {
		if !self.include_evaluation_context {
			return None;
		}
		serde_json::to_string(ctx.evaluation_context()).ok()
	}
}

/// Builder for [`LoggingHook`].
#[derive(Debug, Clone, Default)]
pub struct LoggingHookBuilder {
	include_evaluation_context: bool,
}

impl LoggingHookBuilder {
	/// Adds the serialized evaluation context to every log line.
	pub fn include_evaluation_context(mut self, include: bool) -> Self {
		self.include_evaluation_context = include;
		self
	}

	pub fn build(self) -> LoggingHook {
		LoggingHook {
			include_evaluation_context: self.include_evaluation_context,
		}
	}
}

#[async_trait]
impl Hook for LoggingHook {
	async fn before(
		&self,
		ctx: &HookContext,
		_hints: &HookHints,
		_data: &mut HookData,
	) -> EvaluationResult<Option<EvaluationContext>> {
		debug!(
			stage = "before",
			domain = ?ctx.client_metadata().domain,
			provider_name = %ctx.provider_metadata().name,
			flag_key = %ctx.flag_key(),
			default_value = %ctx.default_value(),
			evaluation_context = ?self.context_field(ctx),
			"flag evaluation starting"
		);
		Ok(None)
	}

	async fn after(
		&self,
		ctx: &HookContext,
		details: &EvaluationDetails<FlagValue>,
		_hints: &HookHints,
		_data: &mut HookData,
	) -> EvaluationResult<()> {
		debug!(
			stage = "after",
			domain = ?ctx.client_metadata().domain,
			provider_name = %ctx.provider_metadata().name,
			flag_key = %ctx.flag_key(),
			default_value = %ctx.default_value(),
			reason = ?details.reason,
			variant = ?details.variant,
			value = %details.value,
			evaluation_context = ?self.context_field(ctx),
			"flag evaluated"
		);
		Ok(())
	}

	async fn error(
		&self,
		ctx: &HookContext,
		error: &EvaluationError,
		_hints: &HookHints,
		_data: &mut HookData,
	) -> EvaluationResult<()> {
		error!(
			stage = "error",
			domain = ?ctx.client_metadata().domain,
			provider_name = %ctx.provider_metadata().name,
			flag_key = %ctx.flag_key(),
			default_value = %ctx.default_value(),
			error_code = %error.code,
			error_message = ?error.message,
			evaluation_context = ?self.context_field(ctx),
			"flag evaluation failed"
		);
		Ok(())
	}
}
