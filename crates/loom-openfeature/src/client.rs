// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flag evaluation.
//!
//! Every `get_*` method funnels into [`Client::evaluate_details`], which
//! never fails: any error is turned into details carrying the caller's
//! default value, reason `ERROR` and the error code.
//!
//! One evaluation proceeds as follows:
//!
//! 1. Look up the provider for the client's domain. If it is `NOT_READY` or
//!    `FATAL`, run error and finally hooks and return the matching error.
//! 2. Reject a default value whose type differs from the requested type.
//! 3. Merge API, client and invocation contexts, then run before-hooks.
//! 4. Resolve with the merged context plus whatever the hooks returned.
//! 5. Treat a resolution carrying an error code as an error, type-check the
//!    value, and run after-hooks.
//! 6. On error, run error-hooks. Finally-hooks always run last.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use loom_openfeature_core::{
	ClientMetadata, ContextValue, ErrorCode, EvaluationContext, EvaluationDetails,
	EvaluationError, EvaluationResult, EventDetails, FlagType, FlagValue, FlagValueType,
	ProviderEvent, ProviderStatus,
};
use parking_lot::RwLock;
use tracing::{debug, error};

use crate::api::OpenFeature;
use crate::event::{run_handler, EventHandler};
use crate::hook::{Hook, HookChain, HookContext, HookHints, SharedHook};
use crate::panic_message;
use crate::provider::{resolve_value, FeatureProvider};

/// Per-invocation hooks and hook hints.
#[derive(Clone, Default)]
pub struct EvaluationOptions {
	hooks: Vec<SharedHook>,
	hook_hints: HookHints,
}

impl EvaluationOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_hook(mut self, hook: impl Hook) -> Self {
		self.hooks.push(Arc::new(hook));
		self
	}

	pub fn with_hooks(mut self, hooks: impl IntoIterator<Item = SharedHook>) -> Self {
		self.hooks.extend(hooks);
		self
	}

	pub fn with_hint(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
		self.hook_hints.insert(key.into(), value.into());
		self
	}

	pub fn hooks(&self) -> &[SharedHook] {
		&self.hooks
	}

	pub fn hook_hints(&self) -> &HookHints {
		&self.hook_hints
	}
}

impl std::fmt::Debug for EvaluationOptions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EvaluationOptions")
			.field("hooks", &self.hooks.len())
			.field("hook_hints", &self.hook_hints)
			.finish()
	}
}

/// Evaluates flags against the provider bound to the client's domain.
///
/// The provider is looked up on every evaluation, so rebinding the domain
/// takes effect immediately. Clones share hooks and context.
#[derive(Clone)]
pub struct Client {
	inner: Arc<ClientInner>,
}

struct ClientInner {
	api: OpenFeature,
	metadata: ClientMetadata,
	hooks: RwLock<Vec<SharedHook>>,
	context: RwLock<EvaluationContext>,
}

impl Client {
	pub(crate) fn new(api: OpenFeature, domain: Option<String>) -> Self {
		Self {
			inner: Arc::new(ClientInner {
				api,
				metadata: ClientMetadata::new(domain),
				hooks: RwLock::new(Vec::new()),
				context: RwLock::new(EvaluationContext::default()),
			}),
		}
	}

	pub fn metadata(&self) -> &ClientMetadata {
		&self.inner.metadata
	}

	pub fn domain(&self) -> Option<&str> {
		self.inner.metadata.domain.as_deref()
	}

	pub fn set_evaluation_context(&self, context: EvaluationContext) {
		*self.inner.context.write() = context;
	}

	pub fn evaluation_context(&self) -> EvaluationContext {
		self.inner.context.read().clone()
	}

	pub fn add_hook(&self, hook: impl Hook) {
		self.add_hooks([Arc::new(hook) as SharedHook]);
	}

	pub fn add_hooks(&self, hooks: impl IntoIterator<Item = SharedHook>) {
		self.inner.hooks.write().extend(hooks);
	}

	pub fn hooks(&self) -> Vec<SharedHook> {
		self.inner.hooks.read().clone()
	}

	pub fn clear_hooks(&self) {
		self.inner.hooks.write().clear();
	}

	/// Status of the provider this client currently resolves to.
	pub fn provider_status(&self) -> ProviderStatus {
		self.inner.api.registry().provider_status(self.domain())
	}

	/// Registers a handler for events from this client's provider.
	///
	/// Runs the handler immediately if the provider's current status already
	/// corresponds to `event`.
	pub fn add_handler(&self, event: ProviderEvent, handler: EventHandler) {
		let registry = self.inner.api.registry();
		registry
			.events()
			.add_client_handler(self.domain(), event, Arc::clone(&handler));

		let (provider, status) = registry.provider_and_status(self.domain());
		if status.matching_event() == Some(event) {
			let details = EventDetails::new().with_provider_name(provider.metadata().name);
			run_handler(event, &handler, &details);
		}
	}

	pub fn remove_handler(&self, event: ProviderEvent, handler: &EventHandler) {
		self.inner
			.api
			.registry()
			.events()
			.remove_client_handler(self.domain(), event, handler);
	}

	pub async fn get_boolean_value(
		&self,
		flag_key: &str,
		default_value: bool,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> bool {
		self.get_value(flag_key, default_value, context, options)
			.await
	}

	pub async fn get_boolean_details(
		&self,
		flag_key: &str,
		default_value: bool,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> EvaluationDetails<bool> {
		self.get_details(flag_key, default_value, context, options)
			.await
	}

	pub async fn get_string_value(
		&self,
		flag_key: &str,
		default_value: impl Into<String>,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> String {
		self.get_value(flag_key, default_value.into(), context, options)
			.await
	}

	pub async fn get_string_details(
		&self,
		flag_key: &str,
		default_value: impl Into<String>,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> EvaluationDetails<String> {
		self.get_details(flag_key, default_value.into(), context, options)
			.await
	}

	pub async fn get_integer_value(
		&self,
		flag_key: &str,
		default_value: i64,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> i64 {
		self.get_value(flag_key, default_value, context, options)
			.await
	}

	pub async fn get_integer_details(
		&self,
		flag_key: &str,
		default_value: i64,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> EvaluationDetails<i64> {
		self.get_details(flag_key, default_value, context, options)
			.await
	}

	pub async fn get_float_value(
		&self,
		flag_key: &str,
		default_value: f64,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> f64 {
		self.get_value(flag_key, default_value, context, options)
			.await
	}

	pub async fn get_float_details(
		&self,
		flag_key: &str,
		default_value: f64,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> EvaluationDetails<f64> {
		self.get_details(flag_key, default_value, context, options)
			.await
	}

	pub async fn get_object_value(
		&self,
		flag_key: &str,
		default_value: serde_json::Value,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> serde_json::Value {
		self.get_value(flag_key, default_value, context, options)
			.await
	}

	pub async fn get_object_details(
		&self,
		flag_key: &str,
		default_value: serde_json::Value,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> EvaluationDetails<serde_json::Value> {
		self.get_details(flag_key, default_value, context, options)
			.await
	}

	pub async fn get_value<T: FlagValueType>(
		&self,
		flag_key: &str,
		default_value: T,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> T {
		self.get_details(flag_key, default_value, context, options)
			.await
			.value
	}

	pub async fn get_details<T: FlagValueType>(
		&self,
		flag_key: &str,
		default_value: T,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> EvaluationDetails<T> {
		let details = self
			.evaluate_details(
				T::FLAG_TYPE,
				flag_key,
				default_value.clone().into_flag_value(),
				context,
				options,
			)
			.await;

		let EvaluationDetails {
			flag_key: key,
			value,
			variant,
			flag_metadata,
			reason,
			error_code,
			error_message,
		} = details;
		if error_code.is_some() {
			return EvaluationDetails {
				flag_key: key,
				value: default_value,
				variant,
				flag_metadata,
				reason,
				error_code,
				error_message,
			};
		}
		match T::from_flag_value(value) {
			Ok(value) => EvaluationDetails {
				flag_key: key,
				value,
				variant,
				flag_metadata,
				reason,
				error_code,
				error_message,
			},
			Err(e) => EvaluationDetails::error(key, default_value, &e),
		}
	}

	/// Evaluates `flag_key` as `flag_type`. Never fails.
	pub async fn evaluate_details(
		&self,
		flag_type: FlagType,
		flag_key: &str,
		default_value: FlagValue,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> EvaluationDetails<FlagValue> {
		let api = &self.inner.api;
		let (provider, status) = api.registry().provider_and_status(self.domain());

		let merged = {
			let api_context = api.evaluation_context();
			let client_context = self.evaluation_context();
			let invocation_context = context.cloned().unwrap_or_default();
			EvaluationContext::merge_all([&api_context, &client_context, &invocation_context])
		};

		let empty_hints = HookHints::new();
		let hints = options.map_or(&empty_hints, |o| &o.hook_hints);
		let hooks = api
			.hooks()
			.into_iter()
			.chain(self.hooks())
			.chain(options.map(|o| o.hooks.clone()).unwrap_or_default())
			.chain(provider.hooks());
		let mut chain = HookChain::new(hooks, flag_type);

		let mut hook_context = HookContext::new(
			flag_key,
			flag_type,
			default_value.clone(),
			merged,
			self.inner.metadata.clone(),
			provider.metadata(),
		);

		debug!(
			domain = ?self.domain(),
			flag_key,
			flag_type = %flag_type,
			provider_status = %status,
			hooks = chain.len(),
			"evaluating flag"
		);

		if let Some(code) = status.short_circuit_code() {
			let err = short_circuit_error(code);
			chain.run_error(&hook_context, &err, hints).await;
			chain.run_finally(&hook_context, hints).await;
			return EvaluationDetails::error(flag_key, default_value, &err);
		}

		let outcome = AssertUnwindSafe(evaluate_with_hooks(
			&mut chain,
			&mut hook_context,
			provider.as_ref(),
			hints,
		))
		.catch_unwind()
		.await
		.unwrap_or_else(|panic| Err(EvaluationError::general(panic_message(panic.as_ref()))));

		let details = match outcome {
			Ok(details) => details,
			Err(e) => {
				error!(
					domain = ?self.domain(),
					flag_key,
					error_code = %e.code,
					error = %e,
					"flag evaluation failed, returning default"
				);
				chain.run_error(&hook_context, &e, hints).await;
				EvaluationDetails::error(flag_key, default_value, &e)
			}
		};

		chain.run_finally(&hook_context, hints).await;
		details
	}
}

impl std::fmt::Debug for Client {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Client")
			.field("metadata", &self.inner.metadata)
			.field("hooks", &self.inner.hooks.read().len())
			.finish_non_exhaustive()
	}
}

fn short_circuit_error(code: ErrorCode) -> EvaluationError {
	match code {
		ErrorCode::ProviderFatal => {
			EvaluationError::provider_fatal("Provider is in an irrecoverable error state")
		}
		_ => EvaluationError::provider_not_ready("Provider is not ready"),
	}
}

/// Steps 2 to 5 of an evaluation. The hook context starts as the merged
/// API, client and invocation context.
async fn evaluate_with_hooks(
	chain: &mut HookChain,
	hook_context: &mut HookContext,
	provider: &dyn FeatureProvider,
	hints: &HookHints,
) -> EvaluationResult<EvaluationDetails<FlagValue>> {
	let flag_type = hook_context.flag_type();
	let flag_key = hook_context.flag_key().to_string();
	let default_value = hook_context.default_value().clone();

	if default_value.flag_type() != flag_type {
		return Err(EvaluationError::general(format!(
			"Unknown flag type: {} default for {flag_type} flag",
			default_value.flag_type()
		)));
	}

	let invocation_context = hook_context.evaluation_context().clone();
	let hook_returned = chain.run_before(hook_context, hints).await?;
	let evaluation_context = invocation_context.merge(&hook_returned);

	let resolution = resolve_value(provider, &flag_key, &default_value, &evaluation_context).await?;
	if let Some(err) = resolution.error_details() {
		return Err(err);
	}
	resolution.value.check_type(flag_type)?;

	let details = EvaluationDetails::from_resolution(flag_key, resolution);
	chain.run_after(hook_context, &details, hints).await?;
	Ok(details)
}
