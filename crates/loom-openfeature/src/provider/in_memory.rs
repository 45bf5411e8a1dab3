// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! A provider backed by a map of flags held in memory.
//!
//! Useful for tests and for applications that compute flags locally. Flags
//! resolve to their default variant with reason `STATIC` unless a context
//! evaluator picks something else.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use loom_openfeature_core::{
	EvaluationContext, EvaluationError, EvaluationResult, EventDetails, FlagMetadata,
	FlagMetadataValue, FlagValue, FlagValueType, ProviderEvent, ProviderMetadata, Reason,
	ResolutionDetails,
};
use parking_lot::RwLock;
use tracing::debug;

use super::FeatureProvider;
use crate::event::{EmitterSlot, ProviderEventEmitter};

/// Computes a resolution for a flag from the evaluation context.
pub type ContextEvaluator =
	Arc<dyn Fn(&InMemoryFlag, &EvaluationContext) -> ResolutionDetails<FlagValue> + Send + Sync>;

/// One flag definition: named variants and the variant served by default.
#[derive(Clone)]
pub struct InMemoryFlag {
	pub default_variant: String,
	pub variants: HashMap<String, FlagValue>,
	pub flag_metadata: FlagMetadata,
	pub context_evaluator: Option<ContextEvaluator>,
}

impl InMemoryFlag {
	pub fn new(default_variant: impl Into<String>) -> Self {
		Self {
			default_variant: default_variant.into(),
			variants: HashMap::new(),
			flag_metadata: FlagMetadata::new(),
			context_evaluator: None,
		}
	}

	pub fn with_variant(mut self, name: impl Into<String>, value: impl Into<FlagValue>) -> Self {
		self.variants.insert(name.into(), value.into());
		self
	}

	pub fn with_metadata(
		mut self,
		key: impl Into<String>,
		value: impl Into<FlagMetadataValue>,
	) -> Self {
		self.flag_metadata.insert(key.into(), value.into());
		self
	}

	/// Replaces static resolution with `evaluator`.
	pub fn with_context_evaluator(
		mut self,
		evaluator: impl Fn(&InMemoryFlag, &EvaluationContext) -> ResolutionDetails<FlagValue>
			+ Send
			+ Sync
			+ 'static,
	) -> Self {
		self.context_evaluator = Some(Arc::new(evaluator));
		self
	}

	/// The resolution served when no evaluator is set.
	pub fn static_resolution(&self) -> EvaluationResult<ResolutionDetails<FlagValue>> {
		let value = self.variants.get(&self.default_variant).ok_or_else(|| {
			EvaluationError::general(format!(
				"Default variant '{}' has no value",
				self.default_variant
			))
		})?;
		Ok(ResolutionDetails::new(value.clone())
			.with_variant(self.default_variant.clone())
			.with_reason(Reason::Static)
			.with_metadata(self.flag_metadata.clone()))
	}

	fn resolve(&self, context: &EvaluationContext) -> EvaluationResult<ResolutionDetails<FlagValue>> {
		match &self.context_evaluator {
			Some(evaluator) => Ok(evaluator(self, context)),
			None => self.static_resolution(),
		}
	}
}

impl std::fmt::Debug for InMemoryFlag {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("InMemoryFlag")
			.field("default_variant", &self.default_variant)
			.field("variants", &self.variants)
			.field("flag_metadata", &self.flag_metadata)
			.field("context_evaluator", &self.context_evaluator.is_some())
			.finish()
	}
}

/// Serves flags from memory.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
	flags: RwLock<HashMap<String, InMemoryFlag>>,
	events: EmitterSlot,
}

impl InMemoryProvider {
	pub const NAME: &'static str = "In-Memory Provider";

	pub fn new(flags: HashMap<String, InMemoryFlag>) -> Self {
		Self {
			flags: RwLock::new(flags),
			events: EmitterSlot::new(),
		}
	}

	pub fn builder() -> InMemoryProviderBuilder {
		InMemoryProviderBuilder::default()
	}

	/// Replaces every flag and emits `PROVIDER_CONFIGURATION_CHANGED` listing
	/// the new flag keys.
	pub fn update_flags(&self, flags: HashMap<String, InMemoryFlag>) {
		let mut changed: Vec<String> = flags.keys().cloned().collect();
		changed.sort();
		*self.flags.write() = flags;

		debug!(flags_changed = ?changed, "in-memory flags replaced");
		self.events.emit(
			ProviderEvent::ConfigurationChanged,
			EventDetails::new().with_flags_changed(changed),
		);
	}

	pub fn flag_keys(&self) -> Vec<String> {
		let mut keys: Vec<String> = self.flags.read().keys().cloned().collect();
		keys.sort();
		keys
	}

	fn resolve<T: FlagValueType>(
		&self,
		flag_key: &str,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<T>> {
		let flag = self
			.flags
			.read()
			.get(flag_key)
			.cloned()
			.ok_or_else(|| EvaluationError::flag_not_found(format!("Flag '{flag_key}' not found")))?;

		let details = flag.resolve(context)?;
		let value = T::from_flag_value(details.value)?;
		Ok(ResolutionDetails {
			value,
			variant: details.variant,
			reason: details.reason,
			flag_metadata: details.flag_metadata,
			error_code: details.error_code,
			error_message: details.error_message,
		})
	}
}

/// Builder for [`InMemoryProvider`].
#[derive(Debug, Default)]
pub struct InMemoryProviderBuilder {
	flags: HashMap<String, InMemoryFlag>,
}

impl InMemoryProviderBuilder {
	pub fn flag(mut self, key: impl Into<String>, flag: InMemoryFlag) -> Self {
		self.flags.insert(key.into(), flag);
		self
	}

	pub fn build(self) -> InMemoryProvider {
		InMemoryProvider::new(self.flags)
	}
}

#[async_trait]
impl FeatureProvider for InMemoryProvider {
	fn metadata(&self) -> ProviderMetadata {
		ProviderMetadata::new(Self::NAME)
	}

	fn attach(&self, emitter: ProviderEventEmitter) {
		self.events.attach(emitter);
	}

	fn detach(&self) {
		self.events.detach();
	}

	async fn resolve_boolean_details(
		&self,
		flag_key: &str,
		_default_value: bool,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<bool>> {
		self.resolve(flag_key, context)
	}

	async fn resolve_string_details(
		&self,
		flag_key: &str,
		_default_value: String,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<String>> {
		self.resolve(flag_key, context)
	}

	async fn resolve_integer_details(
		&self,
		flag_key: &str,
		_default_value: i64,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<i64>> {
		self.resolve(flag_key, context)
	}

	async fn resolve_float_details(
		&self,
		flag_key: &str,
		_default_value: f64,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<f64>> {
		self.resolve(flag_key, context)
	}

	async fn resolve_object_details(
		&self,
		flag_key: &str,
		_default_value: serde_json::Value,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<serde_json::Value>> {
		self.resolve(flag_key, context)
	}
}
