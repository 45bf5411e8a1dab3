// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hooks: cross-cutting callbacks around flag evaluation.
//!
//! A hook can run at four stages of an evaluation:
//!
//! | Stage | When | Failure |
//! |-------|------|---------|
//! | `before` | before the provider is called; may return extra context | aborts the evaluation |
//! | `after` | after a successful resolution | aborts the evaluation |
//! | `error` | when any earlier stage or the provider failed | logged and ignored |
//! | `finally_after` | always, last | logged and ignored |
//!
//! Hooks are collected from four scopes. `before` runs them API, client,
//! invocation, provider; the other stages run them in exact reverse.
//!
//! # Example
//!
//! ```ignore
//! use loom_openfeature::{EvaluationContext, EvaluationResult, Hook, HookContext, HookData, HookHints};
//! use async_trait::async_trait;
//! use std::time::Instant;
//!
//! struct TimingHook;
//!
//! #[async_trait]
//! impl Hook for TimingHook {
//!     async fn before(
//!         &self,
//!         _ctx: &HookContext,
//!         _hints: &HookHints,
//!         data: &mut HookData,
//!     ) -> EvaluationResult<Option<EvaluationContext>> {
//!         data.insert("started", Instant::now());
//!         Ok(None)
//!     }
//!
//!     async fn finally_after(
//!         &self,
//!         ctx: &HookContext,
//!         _hints: &HookHints,
//!         data: &mut HookData,
//!     ) -> EvaluationResult<()> {
//!         if let Some(started) = data.get::<Instant>("started") {
//!             println!("{} took {:?}", ctx.flag_key(), started.elapsed());
//!         }
//!         Ok(())
//!     }
//! }
//! ```

mod logging;
mod pipeline;

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use loom_openfeature_core::{
	ClientMetadata, ContextValue, EvaluationContext, EvaluationDetails, EvaluationError,
	EvaluationResult, FlagType, FlagValue, ProviderMetadata,
};

pub use logging::{LoggingHook, LoggingHookBuilder};
pub(crate) use pipeline::HookChain;

/// Read-only hints passed to every stage of every hook for one evaluation.
pub type HookHints = BTreeMap<String, ContextValue>;

/// Type alias for a shared hook.
pub type SharedHook = Arc<dyn Hook>;

/// Per-call scratch space for a single hook.
///
/// Each hook gets its own empty `HookData` at the start of every evaluation,
/// and the same instance is passed to all of that hook's stages.
#[derive(Default)]
pub struct HookData {
	values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl HookData {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
		self.values.insert(key.into(), Box::new(value));
	}

	/// Returns the value under `key` if it exists and has type `T`.
	pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
		self.values.get(key).and_then(|v| v.downcast_ref::<T>())
	}

	pub fn remove(&mut self, key: &str) -> bool {
		self.values.remove(key).is_some()
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.values.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

impl std::fmt::Debug for HookData {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HookData")
			.field("keys", &self.values.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Evaluation facts shared by all hook stages of one call.
///
/// Everything except the evaluation context is fixed when the evaluation
/// starts. The context is replaced only by the SDK while before-hooks run.
#[derive(Debug, Clone)]
pub struct HookContext {
	flag_key: String,
	flag_type: FlagType,
	default_value: FlagValue,
	evaluation_context: EvaluationContext,
	client_metadata: ClientMetadata,
	provider_metadata: ProviderMetadata,
}

impl HookContext {
	pub fn new(
		flag_key: impl Into<String>,
		flag_type: FlagType,
		default_value: FlagValue,
		evaluation_context: EvaluationContext,
		client_metadata: ClientMetadata,
		provider_metadata: ProviderMetadata,
	) -> Self {
		Self {
			flag_key: flag_key.into(),
			flag_type,
			default_value,
			evaluation_context,
			client_metadata,
			provider_metadata,
		}
	}

	pub fn flag_key(&self) -> &str {
		&self.flag_key
	}

	pub fn flag_type(&self) -> FlagType {
		self.flag_type
	}

	pub fn default_value(&self) -> &FlagValue {
		&self.default_value
	}

	pub fn evaluation_context(&self) -> &EvaluationContext {
		&self.evaluation_context
	}

	pub fn client_metadata(&self) -> &ClientMetadata {
		&self.client_metadata
	}

	pub fn provider_metadata(&self) -> &ProviderMetadata {
		&self.provider_metadata
	}

	pub(crate) fn set_evaluation_context(&mut self, evaluation_context: EvaluationContext) {
		self.evaluation_context = evaluation_context;
	}
}

/// A lifecycle callback around flag evaluation.
///
/// Every stage has a no-op default, so implementations override only what
/// they need.
#[async_trait]
pub trait Hook: Send + Sync + 'static {
	/// Runs before resolution. A returned context is merged on top of the
	/// evaluation context; an `Err` aborts the evaluation.
	async fn before(
		&self,
		_ctx: &HookContext,
		_hints: &HookHints,
		_data: &mut HookData,
	) -> EvaluationResult<Option<EvaluationContext>> {
		Ok(None)
	}

	/// Runs after a successful resolution. An `Err` turns the evaluation into
	/// an error result.
	async fn after(
		&self,
		_ctx: &HookContext,
		_details: &EvaluationDetails<FlagValue>,
		_hints: &HookHints,
		_data: &mut HookData,
	) -> EvaluationResult<()> {
		Ok(())
	}

	/// Runs when the evaluation failed. Failures here are logged and ignored.
	async fn error(
		&self,
		_ctx: &HookContext,
		_error: &EvaluationError,
		_hints: &HookHints,
		_data: &mut HookData,
	) -> EvaluationResult<()> {
		Ok(())
	}

	/// Always runs last. Failures here are logged and ignored.
	async fn finally_after(
		&self,
		_ctx: &HookContext,
		_hints: &HookHints,
		_data: &mut HookData,
	) -> EvaluationResult<()> {
		Ok(())
	}

	/// Hooks returning false are skipped for every stage of the evaluation.
	fn supports_flag_value_type(&self, _flag_type: FlagType) -> bool {
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hook_data_is_typed() {
		let mut data = HookData::new();
		data.insert("count", 3u32);
		data.insert("label", "x".to_string());

		assert_eq!(data.get::<u32>("count"), Some(&3));
		assert_eq!(data.get::<String>("label").map(String::as_str), Some("x"));
		assert!(data.get::<i64>("count").is_none());
		assert_eq!(data.len(), 2);

		assert!(data.remove("count"));
		assert!(!data.contains_key("count"));
	}

	#[test]
	fn hook_context_exposes_fixed_fields() {
		let ctx = HookContext::new(
			"flag",
			FlagType::Boolean,
			FlagValue::Bool(false),
			EvaluationContext::new("user"),
			ClientMetadata::new(Some("checkout".to_string())),
			ProviderMetadata::new("in-memory"),
		);

		assert_eq!(ctx.flag_key(), "flag");
		assert_eq!(ctx.flag_type(), FlagType::Boolean);
		assert_eq!(ctx.default_value(), &FlagValue::Bool(false));
		assert_eq!(ctx.evaluation_context().targeting_key.as_deref(), Some("user"));
		assert_eq!(ctx.client_metadata().domain.as_deref(), Some("checkout"));
		assert_eq!(ctx.provider_metadata().name, "in-memory");
	}
}
