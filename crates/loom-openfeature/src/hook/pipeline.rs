// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ordered execution of hook stages for one evaluation.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use loom_openfeature_core::{
	EvaluationContext, EvaluationDetails, EvaluationError, EvaluationResult, FlagType, FlagValue,
};
use tracing::{debug, warn};

use super::{HookContext, HookData, HookHints, SharedHook};
use crate::panic_message;

/// The hooks that apply to one evaluation, each with its own [`HookData`].
///
/// Entries are stored in before-stage order (API, client, invocation,
/// provider). Hooks that do not support the flag type are dropped up front so
/// they are skipped consistently at every stage.
pub(crate) struct HookChain {
	entries: Vec<(SharedHook, HookData)>,
}

impl HookChain {
	pub(crate) fn new(hooks: impl IntoIterator<Item = SharedHook>, flag_type: FlagType) -> Self {
		let entries = hooks
			.into_iter()
			.filter(|hook| hook.supports_flag_value_type(flag_type))
			.map(|hook| (hook, HookData::new()))
			.collect();
		Self { entries }
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}

	/// Runs every before-hook in order and returns the left-fold merge of the
	/// contexts they returned, or an empty context if none returned one.
	///
	/// Each hook sees the contexts returned by the hooks before it. The first
	/// failure aborts the stage.
	pub(crate) async fn run_before(
		&mut self,
		hook_context: &mut HookContext,
		hints: &HookHints,
	) -> EvaluationResult<EvaluationContext> {
		let mut returned = EvaluationContext::default();

		for (index, (hook, data)) in self.entries.iter_mut().enumerate() {
			if let Some(ctx) = hook.before(hook_context, hints, data).await? {
				debug!(hook_index = index, flag_key = %hook_context.flag_key(), "before hook returned context");
				returned = returned.merge(&ctx);
				let updated = hook_context.evaluation_context().merge(&ctx);
				hook_context.set_evaluation_context(updated);
			}
		}

		Ok(returned)
	}

	/// Runs every after-hook in reverse order. The first failure aborts the stage.
	pub(crate) async fn run_after(
		&mut self,
		hook_context: &HookContext,
		details: &EvaluationDetails<FlagValue>,
		hints: &HookHints,
	) -> EvaluationResult<()> {
		for (hook, data) in self.entries.iter_mut().rev() {
			hook.after(hook_context, details, hints, data).await?;
		}
		Ok(())
	}

	/// Runs every error-hook in reverse order. Failures and panics are logged
	/// and never propagate.
	pub(crate) async fn run_error(
		&mut self,
		hook_context: &HookContext,
		error: &EvaluationError,
		hints: &HookHints,
	) {
		let len = self.entries.len();
		for (offset, (hook, data)) in self.entries.iter_mut().rev().enumerate() {
			let outcome = AssertUnwindSafe(hook.error(hook_context, error, hints, data))
				.catch_unwind()
				.await;
			log_isolated_failure("error", len - 1 - offset, hook_context, outcome);
		}
	}

	/// Runs every finally-hook in reverse order. Failures and panics are
	/// logged and never propagate.
	pub(crate) async fn run_finally(&mut self, hook_context: &HookContext, hints: &HookHints) {
		let len = self.entries.len();
		for (offset, (hook, data)) in self.entries.iter_mut().rev().enumerate() {
			let outcome = AssertUnwindSafe(hook.finally_after(hook_context, hints, data))
				.catch_unwind()
				.await;
			log_isolated_failure("finally_after", len - 1 - offset, hook_context, outcome);
		}
	}
}

fn log_isolated_failure(
	stage: &'static str,
	hook_index: usize,
	hook_context: &HookContext,
	outcome: std::thread::Result<EvaluationResult<()>>,
) {
	match outcome {
		Ok(Ok(())) => {}
		Ok(Err(e)) => {
			warn!(
				stage,
				hook_index,
				flag_key = %hook_context.flag_key(),
				error = %e,
				"hook failed, ignoring"
			);
		}
		Err(panic) => {
			warn!(
				stage,
				hook_index,
				flag_key = %hook_context.flag_key(),
				panic = %panic_message(panic.as_ref()),
				"hook panicked, ignoring"
			);
		}
	}
}
