// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Domain to provider bindings and provider lifecycle.
//!
//! The registry is the only owner of provider status. Bindings are changed
//! under a short lock; `initialize` and `shutdown` always run after the lock
//! is released so a slow provider never blocks other domains.
//!
//! Providers are tracked by instance identity. An instance bound to several
//! domains is initialized once when it is first bound and shut down once
//! when its last binding is removed.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use futures::FutureExt;
use loom_openfeature_core::{
	EvaluationContext, EvaluationError, EventDetails, OpenFeatureError, ProviderEvent,
	ProviderStatus, Result,
};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::event::{EventSupport, ProviderEventEmitter};
use crate::panic_message;
use crate::provider::{NoOpProvider, ProviderId, SharedProvider};

struct RegistryState {
	default_provider: SharedProvider,
	providers: HashMap<String, SharedProvider>,
	status: HashMap<ProviderId, ProviderStatus>,
}

impl RegistryState {
	fn fresh() -> Self {
		let default_provider: SharedProvider = Arc::new(NoOpProvider::new());
		let mut status = HashMap::new();
		status.insert(ProviderId::of(&default_provider), ProviderStatus::Ready);
		Self {
			default_provider,
			providers: HashMap::new(),
			status,
		}
	}

	fn is_bound(&self, id: ProviderId) -> bool {
		ProviderId::of(&self.default_provider) == id
			|| self.providers.values().any(|p| ProviderId::of(p) == id)
	}

	fn resolve(&self, domain: Option<&str>) -> &SharedProvider {
		domain
			.and_then(|d| self.providers.get(d))
			.unwrap_or(&self.default_provider)
	}

	fn resolve_id(&self, id: ProviderId) -> Option<&SharedProvider> {
		std::iter::once(&self.default_provider)
			.chain(self.providers.values())
			.find(|p| ProviderId::of(p) == id)
	}

	fn status_of(&self, id: ProviderId) -> ProviderStatus {
		self.status.get(&id).copied().unwrap_or_default()
	}
}

#[derive(Clone, Copy)]
enum Slot<'a> {
	Default,
	Domain(&'a str),
}

pub(crate) struct ProviderRegistry {
	state: Mutex<RegistryState>,
	events: EventSupport,
}

impl ProviderRegistry {
	pub(crate) fn new() -> Self {
		Self {
			state: Mutex::new(RegistryState::fresh()),
			events: EventSupport::new(),
		}
	}

	pub(crate) fn events(&self) -> &EventSupport {
		&self.events
	}

	/// Binds `provider` to `domain`. An empty domain is rejected.
	pub(crate) async fn set_provider(
		self: &Arc<Self>,
		domain: &str,
		provider: SharedProvider,
		context: &EvaluationContext,
	) -> Result<()> {
		if domain.is_empty() {
			return Err(OpenFeatureError::NoDomain);
		}
		self.bind(Slot::Domain(domain), provider, context).await;
		Ok(())
	}

	pub(crate) async fn set_default_provider(
		self: &Arc<Self>,
		provider: SharedProvider,
		context: &EvaluationContext,
	) {
		self.bind(Slot::Default, provider, context).await;
	}

	async fn bind(
		self: &Arc<Self>,
		slot: Slot<'_>,
		provider: SharedProvider,
		context: &EvaluationContext,
	) {
		let new_id = ProviderId::of(&provider);

		let (orphan, needs_init) = {
			let mut state = self.state.lock();
			let already_bound = state.is_bound(new_id);

			let old = match slot {
				Slot::Default => Some(std::mem::replace(
					&mut state.default_provider,
					Arc::clone(&provider),
				)),
				Slot::Domain(domain) => state
					.providers
					.insert(domain.to_string(), Arc::clone(&provider)),
			};

			let orphan = old.filter(|old| {
				let old_id = ProviderId::of(old);
				old_id != new_id && !state.is_bound(old_id)
			});

			if !already_bound {
				state.status.insert(new_id, ProviderStatus::NotReady);
			}
			(orphan, !already_bound)
		};

		debug!(
			domain = ?match slot {
				Slot::Default => None,
				Slot::Domain(d) => Some(d),
			},
			provider_name = %provider.metadata().name,
			needs_init,
			"provider bound"
		);

		if let Some(old) = orphan {
			self.shutdown_provider(old).await;
		}
		if needs_init {
			self.initialize_provider(provider, context).await;
		}
	}

	/// Attaches an emitter and initializes the provider. Failures become a
	/// `PROVIDER_ERROR` event and are never returned to the caller.
	async fn initialize_provider(
		self: &Arc<Self>,
		provider: SharedProvider,
		context: &EvaluationContext,
	) {
		let id = ProviderId::of(&provider);
		let name = provider.metadata().name;

		let registry: Weak<ProviderRegistry> = Arc::downgrade(self);
		provider.attach(ProviderEventEmitter::new(move |event, details| {
			if let Some(registry) = registry.upgrade() {
				registry.dispatch_event(id, event, details);
			}
		}));

		let outcome = AssertUnwindSafe(provider.initialize(context))
			.catch_unwind()
			.await
			.unwrap_or_else(|panic| {
				Err(EvaluationError::general(format!(
					"provider initialize panicked: {}",
					panic_message(panic.as_ref())
				)))
			});

		match outcome {
			Ok(()) => {
				debug!(provider_name = %name, "provider initialized");
				self.dispatch_event(
					id,
					ProviderEvent::Ready,
					EventDetails::new().with_provider_name(name),
				);
			}
			Err(e) => {
				error!(provider_name = %name, error = %e, "provider initialization failed");
				self.dispatch_event(
					id,
					ProviderEvent::Error,
					EventDetails::from_error(&e).with_provider_name(name),
				);
			}
		}
	}

	async fn shutdown_provider(&self, provider: SharedProvider) {
		let id = ProviderId::of(&provider);
		let name = provider.metadata().name;

		provider.detach();
		let outcome = AssertUnwindSafe(provider.shutdown()).catch_unwind().await;
		match outcome {
			Ok(Ok(())) => debug!(provider_name = %name, "provider shut down"),
			Ok(Err(e)) => error!(provider_name = %name, error = %e, "provider shutdown failed"),
			Err(panic) => error!(
				provider_name = %name,
				panic = %panic_message(panic.as_ref()),
				"provider shutdown panicked"
			),
		}

		let mut state = self.state.lock();
		if !state.is_bound(id) {
			state.status.remove(&id);
		}
	}

	/// Applies `event` to the emitting provider's status and fans it out.
	///
	/// Events from providers that are no longer bound are dropped.
	pub(crate) fn dispatch_event(
		&self,
		id: ProviderId,
		event: ProviderEvent,
		details: EventDetails,
	) {
		let (default_id, domains, provider_name) = {
			let mut state = self.state.lock();
			if !state.is_bound(id) {
				debug!(event = %event, "event from unbound provider ignored");
				return;
			}

			let current = state.status_of(id);
			let next = current.on_event(event, details.error_code);
			state.status.insert(id, next);
			if current != next {
				debug!(event = %event, from = %current, to = %next, "provider status changed");
			}

			let default_id = ProviderId::of(&state.default_provider);
			let domains: HashMap<String, ProviderId> = state
				.providers
				.iter()
				.map(|(domain, p)| (domain.clone(), ProviderId::of(p)))
				.collect();
			let provider_name = details
				.provider_name
				.is_empty()
				.then(|| state.resolve_id(id).map(|p| p.metadata().name))
				.flatten();
			(default_id, domains, provider_name)
		};

		let details = match provider_name {
			Some(name) => details.with_provider_name(name),
			None => details,
		};

		self.events.dispatch(event, &details, |domain| {
			let bound = domain
				.and_then(|d| domains.get(d).copied())
				.unwrap_or(default_id);
			bound == id
		});
	}

	pub(crate) fn get_provider(&self, domain: Option<&str>) -> SharedProvider {
		Arc::clone(self.state.lock().resolve(domain))
	}

	/// The provider for `domain` together with its current status, read
	/// atomically.
	pub(crate) fn provider_and_status(
		&self,
		domain: Option<&str>,
	) -> (SharedProvider, ProviderStatus) {
		let state = self.state.lock();
		let provider = Arc::clone(state.resolve(domain));
		let status = state.status_of(ProviderId::of(&provider));
		(provider, status)
	}

	pub(crate) fn provider_status(&self, domain: Option<&str>) -> ProviderStatus {
		self.provider_and_status(domain).1
	}

	/// Every distinct bound provider with its status, default first.
	pub(crate) fn bound_providers(&self) -> Vec<(SharedProvider, ProviderStatus)> {
		let state = self.state.lock();
		let mut seen = Vec::new();
		let mut bound = Vec::new();
		for provider in std::iter::once(&state.default_provider).chain(state.providers.values()) {
			let id = ProviderId::of(provider);
			if !seen.contains(&id) {
				seen.push(id);
				bound.push((Arc::clone(provider), state.status_of(id)));
			}
		}
		bound
	}

	/// Shuts every bound provider down once and resets to a fresh NoOp default.
	pub(crate) async fn clear_providers(&self) {
		let previous = {
			let mut state = self.state.lock();
			std::mem::replace(&mut *state, RegistryState::fresh())
		};

		let mut seen = Vec::new();
		let providers = std::iter::once(previous.default_provider)
			.chain(previous.providers.into_values());
		for provider in providers {
			let id = ProviderId::of(&provider);
			if seen.contains(&id) {
				continue;
			}
			seen.push(id);
			self.shutdown_provider(provider).await;
		}
		debug!(count = seen.len(), "providers cleared");
	}
}
