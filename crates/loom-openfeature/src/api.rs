// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The API object: provider bindings, global hooks, global context, and
//! client construction.

use std::sync::{Arc, OnceLock};

use loom_openfeature_core::{
	EvaluationContext, EventDetails, ProviderEvent, ProviderMetadata, ProviderStatus, Result,
};
use parking_lot::RwLock;
use tracing::debug;

use crate::client::Client;
use crate::event::{run_handler, EventHandler};
use crate::hook::{Hook, SharedHook};
use crate::provider::{FeatureProvider, SharedProvider};
use crate::registry::ProviderRegistry;

static GLOBAL: OnceLock<OpenFeature> = OnceLock::new();

/// Entry point of the SDK.
///
/// Each `OpenFeature` value is an isolated instance with its own providers,
/// hooks and context. Clones share state. Applications that want a single
/// process-wide instance use [`OpenFeature::global`].
#[derive(Clone)]
pub struct OpenFeature {
	inner: Arc<ApiInner>,
}

struct ApiInner {
	registry: Arc<ProviderRegistry>,
	hooks: RwLock<Vec<SharedHook>>,
	context: RwLock<EvaluationContext>,
}

impl Default for OpenFeature {
	fn default() -> Self {
		Self::new()
	}
}

impl OpenFeature {
	/// Creates an instance whose default provider is the NoOp provider.
	pub fn new() -> Self {
		Self {
			inner: Arc::new(ApiInner {
				registry: Arc::new(ProviderRegistry::new()),
				hooks: RwLock::new(Vec::new()),
				context: RwLock::new(EvaluationContext::default()),
			}),
		}
	}

	/// The process-wide instance, created on first use.
	pub fn global() -> &'static OpenFeature {
		GLOBAL.get_or_init(OpenFeature::new)
	}

	/// Sets the default provider and waits for it to initialize.
	///
	/// Initialization failures are reported through the provider's status
	/// and a `PROVIDER_ERROR` event, not returned here.
	pub async fn set_provider(&self, provider: impl FeatureProvider) {
		self.set_shared_provider(Arc::new(provider)).await;
	}

	pub async fn set_shared_provider(&self, provider: SharedProvider) {
		let context = self.evaluation_context();
		self.inner
			.registry
			.set_default_provider(provider, &context)
			.await;
	}

	/// Binds a provider to `domain`. Fails with `NoDomain` if `domain` is empty.
	pub async fn set_provider_for_domain(
		&self,
		domain: &str,
		provider: impl FeatureProvider,
	) -> Result<()> {
		self.set_shared_provider_for_domain(domain, Arc::new(provider))
			.await
	}

	/// Binds a shared provider instance to `domain`. Binding an instance
	/// that is already bound elsewhere does not initialize it again.
	pub async fn set_shared_provider_for_domain(
		&self,
		domain: &str,
		provider: SharedProvider,
	) -> Result<()> {
		let context = self.evaluation_context();
		self.inner
			.registry
			.set_provider(domain, provider, &context)
			.await
	}

	/// The provider for `domain`, or the default provider.
	pub fn provider(&self, domain: Option<&str>) -> SharedProvider {
		self.inner.registry.get_provider(domain)
	}

	pub fn provider_metadata(&self, domain: Option<&str>) -> ProviderMetadata {
		self.provider(domain).metadata()
	}

	pub fn provider_status(&self, domain: Option<&str>) -> ProviderStatus {
		self.inner.registry.provider_status(domain)
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

	/// A client bound to the default provider.
	pub fn client(&self) -> Client {
		Client::new(self.clone(), None)
	}

	/// A client bound to whatever provider `domain` resolves to at
	/// evaluation time. An empty domain yields a default client.
	pub fn domain_client(&self, domain: impl Into<String>) -> Client {
		let domain = domain.into();
		Client::new(self.clone(), (!domain.is_empty()).then_some(domain))
	}

	/// Registers a global handler for `event`.
	///
	/// The handler also runs once immediately for every bound provider whose
	/// current status already corresponds to `event`.
	pub fn add_handler(&self, event: ProviderEvent, handler: EventHandler) {
		let registry = &self.inner.registry;
		registry
			.events()
			.add_global_handler(event, Arc::clone(&handler));

		for (provider, status) in registry.bound_providers() {
			if status.matching_event() == Some(event) {
				let details = EventDetails::new().with_provider_name(provider.metadata().name);
				run_handler(event, &handler, &details);
			}
		}
	}

	pub fn remove_handler(&self, event: ProviderEvent, handler: &EventHandler) {
		self.inner
			.registry
			.events()
			.remove_global_handler(event, handler);
	}

	/// Shuts every provider down and resets to the NoOp default.
	pub async fn clear_providers(&self) {
		self.inner.registry.clear_providers().await;
	}

	/// Shuts every provider down once. Failures are logged, never returned.
	pub async fn shutdown(&self) {
		debug!("shutting down openfeature api");
		self.clear_providers().await;
	}

	pub(crate) fn registry(&self) -> &Arc<ProviderRegistry> {
		&self.inner.registry
	}
}

impl std::fmt::Debug for OpenFeature {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OpenFeature")
			.field("default_provider", &self.provider_metadata(None).name)
			.field("hooks", &self.inner.hooks.read().len())
			.finish_non_exhaustive()
	}
}
