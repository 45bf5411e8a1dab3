// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! A provider that composes several providers behind one.
//!
//! Sub-providers are consulted in registration order and an
//! [`EvaluationStrategy`] picks which answer to return. Sub-provider failures
//! never abort the evaluation; they are recorded as error results and the
//! next provider is tried.
//!
//! # Example
//!
//! ```
//! use loom_openfeature::{InMemoryProvider, MultiProvider, NoOpProvider};
//! use loom_openfeature::provider::multi::FirstMatchStrategy;
//!
//! let multi = MultiProvider::builder()
//!     .named_provider("local", InMemoryProvider::builder().build())
//!     .provider(NoOpProvider::new())
//!     .strategy(FirstMatchStrategy)
//!     .build()
//!     .expect("names are unique");
//! assert_eq!(multi.provider_names(), vec!["local", "No-op Provider"]);
//! ```

mod strategy;

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use loom_openfeature_core::{
	EvaluationContext, EvaluationError, EvaluationResult, EventDetails, FlagValue, FlagValueType,
	OpenFeatureError, ProviderEvent, ProviderMetadata, ProviderStatus, ResolutionDetails, Result,
};
use parking_lot::Mutex;
use tracing::{debug, error};

use super::{resolve_value, FeatureProvider, SharedProvider};
use crate::event::{EmitterSlot, ProviderEventEmitter};
use crate::hook::SharedHook;
use crate::panic_message;

pub use strategy::{EvaluationStrategy, FirstMatchStrategy, FirstSuccessfulStrategy, RunMode};

struct SubProvider {
	name: String,
	provider: SharedProvider,
}

/// Aggregates several providers behind the [`FeatureProvider`] contract.
pub struct MultiProvider {
	providers: Vec<SubProvider>,
	strategy: Arc<dyn EvaluationStrategy>,
	hooks: Vec<SharedHook>,
	relay: Arc<EventRelay>,
}

impl MultiProvider {
	pub const NAME: &'static str = "MultiProvider";

	pub fn builder() -> MultiProviderBuilder {
		MultiProviderBuilder::default()
	}

	/// Resolved sub-provider names in registration order.
	pub fn provider_names(&self) -> Vec<&str> {
		self.providers.iter().map(|p| p.name.as_str()).collect()
	}

	async fn resolve_one(
		&self,
		sub: &SubProvider,
		flag_key: &str,
		default_value: &FlagValue,
		context: &EvaluationContext,
	) -> ResolutionDetails<FlagValue> {
		let outcome = AssertUnwindSafe(resolve_value(
			sub.provider.as_ref(),
			flag_key,
			default_value,
			context,
		))
		.catch_unwind()
		.await
		.unwrap_or_else(|panic| Err(EvaluationError::general(panic_message(panic.as_ref()))));

		match outcome {
			Ok(details) => details,
			Err(e) => {
				debug!(
					provider_name = %sub.name,
					flag_key,
					error = %e,
					"sub-provider failed, trying next"
				);
				ResolutionDetails::error(default_value.clone(), &e)
			}
		}
	}

	async fn evaluate(
		&self,
		flag_key: &str,
		default_value: FlagValue,
		context: &EvaluationContext,
	) -> ResolutionDetails<FlagValue> {
		let mut last = None;

		match self.strategy.run_mode() {
			RunMode::Sequential => {
				for sub in &self.providers {
					let result = self
						.resolve_one(sub, flag_key, &default_value, context)
						.await;
					if self.strategy.should_use_result(flag_key, &sub.name, &result) {
						return result;
					}
					last = Some(result);
				}
			}
			RunMode::Parallel => {
				let results = join_all(
					self.providers
						.iter()
						.map(|sub| self.resolve_one(sub, flag_key, &default_value, context)),
				)
				.await;
				for (sub, result) in self.providers.iter().zip(results) {
					if self.strategy.should_use_result(flag_key, &sub.name, &result) {
						return result;
					}
					last = Some(result);
				}
			}
		}

		last.unwrap_or_else(|| {
			ResolutionDetails::error(
				default_value,
				&EvaluationError::general("No provider returned a result"),
			)
		})
	}

	async fn evaluate_typed<T: FlagValueType>(
		&self,
		flag_key: &str,
		default_value: T,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<T>> {
		let details = self
			.evaluate(flag_key, default_value.into_flag_value(), context)
			.await;
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

/// Runs a lifecycle call, reporting a panic as a GENERAL error.
async fn guarded(
	call: impl std::future::Future<Output = EvaluationResult<()>>,
) -> EvaluationResult<()> {
	AssertUnwindSafe(call)
		.catch_unwind()
		.await
		.unwrap_or_else(|panic| {
			Err(EvaluationError::general(format!(
				"panicked: {}",
				panic_message(panic.as_ref())
			)))
		})
}

impl std::fmt::Debug for MultiProvider {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MultiProvider")
			.field("providers", &self.provider_names())
			.field("run_mode", &self.strategy.run_mode())
			.field("hooks", &self.hooks.len())
			.finish()
	}
}

#[async_trait]
impl FeatureProvider for MultiProvider {
	fn metadata(&self) -> ProviderMetadata {
		ProviderMetadata::new(Self::NAME)
	}

	fn hooks(&self) -> Vec<SharedHook> {
		self.hooks.clone()
	}

	async fn initialize(&self, context: &EvaluationContext) -> EvaluationResult<()> {
		let outcomes = join_all(
			self.providers
				.iter()
				.map(|sub| async move { (sub, guarded(sub.provider.initialize(context)).await) }),
		)
		.await;

		let mut failures = Vec::new();
		for (sub, outcome) in outcomes {
			match outcome {
				Ok(()) => self.relay.set_status(&sub.name, ProviderStatus::Ready),
				Err(e) => {
					let status = if e.is_fatal() {
						ProviderStatus::Fatal
					} else {
						ProviderStatus::Error
					};
					self.relay.set_status(&sub.name, status);
					failures.push(format!("Provider '{}' initialization failed: {e}", sub.name));
				}
			}
		}

		if failures.is_empty() {
			Ok(())
		} else {
			Err(EvaluationError::general(failures.join("; ")))
		}
	}

	async fn shutdown(&self) -> EvaluationResult<()> {
		let outcomes = join_all(
			self.providers
				.iter()
				.map(|sub| async move { (sub, guarded(sub.provider.shutdown()).await) }),
		)
		.await;

		for (sub, outcome) in outcomes {
			if let Err(e) = outcome {
				error!(provider_name = %sub.name, error = %e, "sub-provider shutdown failed");
			}
			self.relay.set_status(&sub.name, ProviderStatus::NotReady);
		}
		Ok(())
	}

	fn attach(&self, emitter: ProviderEventEmitter) {
		self.relay.upstream.attach(emitter);
		for sub in &self.providers {
			let relay = Arc::clone(&self.relay);
			let name = sub.name.clone();
			sub.provider
				.attach(ProviderEventEmitter::new(move |event, details| {
					relay.forward(&name, event, details);
				}));
		}
	}

	fn detach(&self) {
		for sub in &self.providers {
			sub.provider.detach();
		}
		self.relay.upstream.detach();
	}

	async fn resolve_boolean_details(
		&self,
		flag_key: &str,
		default_value: bool,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<bool>> {
		self.evaluate_typed(flag_key, default_value, context).await
	}

	async fn resolve_string_details(
		&self,
		flag_key: &str,
		default_value: String,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<String>> {
		self.evaluate_typed(flag_key, default_value, context).await
	}

	async fn resolve_integer_details(
		&self,
		flag_key: &str,
		default_value: i64,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<i64>> {
		self.evaluate_typed(flag_key, default_value, context).await
	}

	async fn resolve_float_details(
		&self,
		flag_key: &str,
		default_value: f64,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<f64>> {
		self.evaluate_typed(flag_key, default_value, context).await
	}

	async fn resolve_object_details(
		&self,
		flag_key: &str,
		default_value: serde_json::Value,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<serde_json::Value>> {
		self.evaluate_typed(flag_key, default_value, context).await
	}
}

/// Forwards sub-provider events upstream and tracks the aggregate status.
///
/// Configuration changes are always forwarded. Status events are forwarded
/// only when they change the aggregate, which is the worst status among the
/// sub-providers.
struct EventRelay {
	upstream: EmitterSlot,
	state: Mutex<RelayState>,
}

struct RelayState {
	statuses: HashMap<String, ProviderStatus>,
	aggregate: ProviderStatus,
}

impl EventRelay {
	fn new(names: &[String]) -> Self {
		Self {
			upstream: EmitterSlot::new(),
			state: Mutex::new(RelayState {
				statuses: names
					.iter()
					.map(|name| (name.clone(), ProviderStatus::NotReady))
					.collect(),
				aggregate: ProviderStatus::NotReady,
			}),
		}
	}

	fn set_status(&self, name: &str, status: ProviderStatus) {
		let mut state = self.state.lock();
		state.statuses.insert(name.to_string(), status);
		state.aggregate = worst(state.statuses.values().copied());
	}

	fn forward(&self, name: &str, event: ProviderEvent, details: EventDetails) {
		let details = details.with_provider_name(name);

		if event == ProviderEvent::ConfigurationChanged {
			self.upstream.emit(event, details);
			return;
		}

		let changed = {
			let mut state = self.state.lock();
			let current = state
				.statuses
				.get(name)
				.copied()
				.unwrap_or_default();
			state
				.statuses
				.insert(name.to_string(), current.on_event(event, details.error_code));
			let aggregate = worst(state.statuses.values().copied());
			let changed = aggregate != state.aggregate;
			state.aggregate = aggregate;
			changed.then_some(aggregate)
		};

		if let Some(event) = changed.and_then(ProviderStatus::matching_event) {
			debug!(provider_name = name, event = %event, "multi-provider status changed");
			self.upstream.emit(event, details);
		}
	}
}

fn severity(status: ProviderStatus) -> u8 {
	match status {
		ProviderStatus::Ready => 0,
		ProviderStatus::Stale => 1,
		ProviderStatus::Error => 2,
		ProviderStatus::NotReady => 3,
		ProviderStatus::Fatal => 4,
	}
}

fn worst(statuses: impl Iterator<Item = ProviderStatus>) -> ProviderStatus {
	statuses
		.max_by_key(|status| severity(*status))
		.unwrap_or(ProviderStatus::Ready)
}

/// Builder for [`MultiProvider`].
#[derive(Default)]
pub struct MultiProviderBuilder {
	entries: Vec<(SharedProvider, Option<String>)>,
	strategy: Option<Arc<dyn EvaluationStrategy>>,
}

impl MultiProviderBuilder {
	/// Adds a provider named after its metadata.
	pub fn provider(self, provider: impl FeatureProvider) -> Self {
		self.shared_provider(Arc::new(provider), None)
	}

	/// Adds a provider under an explicit name.
	pub fn named_provider(self, name: impl Into<String>, provider: impl FeatureProvider) -> Self {
		self.shared_provider(Arc::new(provider), Some(name.into()))
	}

	pub fn shared_provider(mut self, provider: SharedProvider, name: Option<String>) -> Self {
		self.entries.push((provider, name));
		self
	}

	/// Defaults to [`FirstMatchStrategy`].
	pub fn strategy(mut self, strategy: impl EvaluationStrategy) -> Self {
		self.strategy = Some(Arc::new(strategy));
		self
	}

	/// Resolves sub-provider names and builds the provider.
	///
	/// Explicit names must be unique. Providers without one take their
	/// metadata name, suffixed `_1`, `_2`, ... when that name is shared or
	/// already taken.
	pub fn build(self) -> Result<MultiProvider> {
		let mut used: HashSet<String> = HashSet::new();
		for name in self.entries.iter().filter_map(|(_, name)| name.as_ref()) {
			if !used.insert(name.clone()) {
				return Err(OpenFeatureError::DuplicateProviderName(name.clone()));
			}
		}

		let metadata_names: Vec<Option<String>> = self
			.entries
			.iter()
			.map(|(provider, name)| match name {
				Some(_) => None,
				None => Some(provider.metadata().name),
			})
			.collect();
		let mut occurrences: HashMap<&str, usize> = HashMap::new();
		for name in metadata_names.iter().flatten() {
			*occurrences.entry(name.as_str()).or_default() += 1;
		}

		let mut counters: HashMap<String, usize> = HashMap::new();
		let mut providers = Vec::with_capacity(self.entries.len());
		for ((provider, explicit), metadata_name) in
			self.entries.into_iter().zip(metadata_names.iter())
		{
			let name = match (explicit, metadata_name) {
				(Some(name), _) => name,
				(None, Some(base)) => {
					let ambiguous = occurrences.get(base.as_str()).copied().unwrap_or(0) > 1;
					if ambiguous || used.contains(base) {
						let counter = counters.entry(base.clone()).or_default();
						loop {
							*counter += 1;
							let candidate = format!("{base}_{counter}");
							if !used.contains(&candidate) {
								break candidate;
							}
						}
					} else {
						base.clone()
					}
				}
				(None, None) => {
					return Err(OpenFeatureError::InvalidConfiguration(
						"provider has neither an explicit nor a metadata name".to_string(),
					))
				}
			};
			used.insert(name.clone());
			providers.push(SubProvider { name, provider });
		}

		let hooks = providers
			.iter()
			.flat_map(|sub| sub.provider.hooks())
			.collect();
		let names: Vec<String> = providers.iter().map(|sub| sub.name.clone()).collect();

		debug!(providers = ?names, "multi-provider built");
		Ok(MultiProvider {
			providers,
			strategy: self
				.strategy
				.unwrap_or_else(|| Arc::new(FirstMatchStrategy)),
			hooks,
			relay: Arc::new(EventRelay::new(&names)),
		})
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicBool, Ordering};

	use loom_openfeature_core::{ErrorCode, Reason};

	use super::*;
	use crate::provider::{InMemoryFlag, InMemoryProvider, NoOpProvider};

	fn flag(value: &str) -> InMemoryFlag {
		InMemoryFlag::new("on").with_variant("on", value)
	}

	struct StubProvider {
		name: &'static str,
		init_error: Option<EvaluationError>,
		panics: bool,
		initialized: AtomicBool,
		shut_down: AtomicBool,
		events: EmitterSlot,
	}

	impl StubProvider {
		fn new(name: &'static str) -> Self {
			Self {
				name,
				init_error: None,
				panics: false,
				initialized: AtomicBool::new(false),
				shut_down: AtomicBool::new(false),
				events: EmitterSlot::new(),
			}
		}

		/// Panics in every lifecycle call and resolver.
		fn panicking(name: &'static str) -> Self {
			Self {
				panics: true,
				..Self::new(name)
			}
		}

		fn failing(name: &'static str) -> Self {
			Self {
				init_error: Some(EvaluationError::general("boom")),
				..Self::new(name)
			}
		}

		fn fire(&self, event: ProviderEvent, details: EventDetails) {
			self.events.emit(event, details);
		}
	}

	#[async_trait]
	impl FeatureProvider for StubProvider {
		fn metadata(&self) -> ProviderMetadata {
			ProviderMetadata::new(self.name)
		}

		async fn initialize(&self, _context: &EvaluationContext) -> EvaluationResult<()> {
			if self.panics {
				panic!("init bug");
			}
			// Lets panicking siblings run first.
			tokio::task::yield_now().await;
			tokio::task::yield_now().await;
			self.initialized.store(true, Ordering::SeqCst);
			match &self.init_error {
				Some(e) => Err(e.clone()),
				None => Ok(()),
			}
		}

		async fn shutdown(&self) -> EvaluationResult<()> {
			if self.panics {
				panic!("shutdown bug");
			}
			tokio::task::yield_now().await;
			self.shut_down.store(true, Ordering::SeqCst);
			Ok(())
		}

		fn attach(&self, emitter: ProviderEventEmitter) {
			self.events.attach(emitter);
		}

		fn detach(&self) {
			self.events.detach();
		}

		async fn resolve_boolean_details(
			&self,
			_flag_key: &str,
			_default_value: bool,
			_context: &EvaluationContext,
		) -> EvaluationResult<ResolutionDetails<bool>> {
			if self.panics {
				panic!("resolve bug");
			}
			Err(EvaluationError::general("unavailable"))
		}

		async fn resolve_string_details(
			&self,
			_flag_key: &str,
			_default_value: String,
			_context: &EvaluationContext,
		) -> EvaluationResult<ResolutionDetails<String>> {
			Err(EvaluationError::general("unavailable"))
		}

		async fn resolve_integer_details(
			&self,
			_flag_key: &str,
			_default_value: i64,
			_context: &EvaluationContext,
		) -> EvaluationResult<ResolutionDetails<i64>> {
			Err(EvaluationError::general("unavailable"))
		}

		async fn resolve_float_details(
			&self,
			_flag_key: &str,
			_default_value: f64,
			_context: &EvaluationContext,
		) -> EvaluationResult<ResolutionDetails<f64>> {
			Err(EvaluationError::general("unavailable"))
		}

		async fn resolve_object_details(
			&self,
			_flag_key: &str,
			_default_value: serde_json::Value,
			_context: &EvaluationContext,
		) -> EvaluationResult<ResolutionDetails<serde_json::Value>> {
			Err(EvaluationError::general("unavailable"))
		}
	}

	#[test]
	fn explicit_name_collision_is_rejected() {
		let err = MultiProvider::builder()
			.named_provider("a", NoOpProvider::new())
			.named_provider("a", NoOpProvider::new())
			.build()
			.unwrap_err();
		assert!(matches!(err, OpenFeatureError::DuplicateProviderName(name) if name == "a"));
	}

	#[test]
	fn shared_metadata_names_are_suffixed() {
		let multi = MultiProvider::builder()
			.provider(NoOpProvider::new())
			.provider(NoOpProvider::new())
			.provider(InMemoryProvider::builder().build())
			.build()
			.unwrap();
		assert_eq!(
			multi.provider_names(),
			vec!["No-op Provider_1", "No-op Provider_2", "In-Memory Provider"]
		);
	}

	#[test]
	fn metadata_name_taken_explicitly_is_suffixed() {
		let multi = MultiProvider::builder()
			.named_provider("No-op Provider", InMemoryProvider::builder().build())
			.provider(NoOpProvider::new())
			.build()
			.unwrap();
		assert_eq!(
			multi.provider_names(),
			vec!["No-op Provider", "No-op Provider_1"]
		);
	}

	#[tokio::test]
	async fn first_match_falls_through_not_found() {
		let multi = MultiProvider::builder()
			.named_provider("a", InMemoryProvider::builder().build())
			.named_provider("b", InMemoryProvider::builder().flag("flag1", flag("on")).build())
			.build()
			.unwrap();

		let details = multi
			.resolve_string_details("flag1", "off".to_string(), &EvaluationContext::default())
			.await
			.unwrap();
		assert_eq!(details.value, "on");
		assert_eq!(details.reason, Some(Reason::Static));
		assert!(!details.is_error());
	}

	#[tokio::test]
	async fn panicking_sub_provider_falls_through() {
		let multi = MultiProvider::builder()
			.named_provider("a", StubProvider::panicking("a"))
			.named_provider(
				"b",
				InMemoryProvider::builder()
					.flag("flag1", InMemoryFlag::new("on").with_variant("on", true))
					.build(),
			)
			.build()
			.unwrap();

		let details = multi
			.resolve_boolean_details("flag1", false, &EvaluationContext::default())
			.await
			.unwrap();
		assert!(details.value);
		assert!(!details.is_error());
	}

	#[tokio::test]
	async fn panicking_sub_provider_is_reported_as_general_error() {
		let multi = MultiProvider::builder()
			.named_provider("a", StubProvider::panicking("a"))
			.build()
			.unwrap();

		let details = multi
			.resolve_boolean_details("flag1", false, &EvaluationContext::default())
			.await
			.unwrap();
		assert!(!details.value);
		assert_eq!(details.error_code, Some(ErrorCode::General));
		assert_eq!(details.error_message.as_deref(), Some("resolve bug"));
	}

	#[tokio::test]
	async fn panicking_initialize_does_not_stop_siblings() {
		let healthy = Arc::new(StubProvider::new("healthy"));
		let multi = MultiProvider::builder()
			.named_provider("broken", StubProvider::panicking("broken"))
			.shared_provider(healthy.clone(), None)
			.build()
			.unwrap();

		let err = multi
			.initialize(&EvaluationContext::default())
			.await
			.unwrap_err();

		assert!(healthy.initialized.load(Ordering::SeqCst));
		let message = err.message.unwrap_or_default();
		assert!(message.contains("Provider 'broken' initialization failed"), "{message}");
		assert!(message.contains("init bug"), "{message}");
		assert!(!message.contains("'healthy'"), "{message}");
	}

	#[tokio::test]
	async fn panicking_shutdown_is_logged_not_raised() {
		let healthy = Arc::new(StubProvider::new("healthy"));
		let multi = MultiProvider::builder()
			.named_provider("broken", StubProvider::panicking("broken"))
			.shared_provider(healthy.clone(), None)
			.build()
			.unwrap();

		multi.shutdown().await.unwrap();
		assert!(healthy.shut_down.load(Ordering::SeqCst));
	}

	#[tokio::test]
	async fn sequential_mode_stops_at_first_accepted() {
		let multi = MultiProvider::builder()
			.named_provider("a", InMemoryProvider::builder().flag("f", flag("from-a")).build())
			.named_provider("b", InMemoryProvider::builder().flag("f", flag("from-b")).build())
			.build()
			.unwrap();

		let details = multi
			.resolve_string_details("f", String::new(), &EvaluationContext::default())
			.await
			.unwrap();
		assert_eq!(details.value, "from-a");
	}

	#[tokio::test]
	async fn parallel_mode_prefers_registration_order() {
		let multi = MultiProvider::builder()
			.named_provider("a", InMemoryProvider::builder().build())
			.named_provider("b", InMemoryProvider::builder().flag("f", flag("from-b")).build())
			.named_provider("c", InMemoryProvider::builder().flag("f", flag("from-c")).build())
			.strategy(FirstSuccessfulStrategy)
			.build()
			.unwrap();

		let details = multi
			.resolve_string_details("f", String::new(), &EvaluationContext::default())
			.await
			.unwrap();
		assert_eq!(details.value, "from-b");
	}

	#[tokio::test]
	async fn no_accepted_result_returns_last_error() {
		let multi = MultiProvider::builder()
			.named_provider("a", InMemoryProvider::builder().build())
			.named_provider("b", InMemoryProvider::builder().build())
			.build()
			.unwrap();

		let details = multi
			.resolve_boolean_details("missing", true, &EvaluationContext::default())
			.await
			.unwrap();
		assert!(details.value);
		assert_eq!(details.reason, Some(Reason::Error));
		assert_eq!(details.error_code, Some(ErrorCode::FlagNotFound));
	}

	#[tokio::test]
	async fn empty_multi_provider_synthesizes_error() {
		let multi = MultiProvider::builder().build().unwrap();

		let details = multi
			.resolve_integer_details("any", 5, &EvaluationContext::default())
			.await
			.unwrap();
		assert_eq!(details.value, 5);
		assert_eq!(details.error_code, Some(ErrorCode::General));
	}

	#[tokio::test]
	async fn initialize_aggregates_failures() {
		let multi = MultiProvider::builder()
			.provider(StubProvider::failing("x"))
			.provider(NoOpProvider::new())
			.provider(StubProvider::failing("y"))
			.build()
			.unwrap();

		let err = multi
			.initialize(&EvaluationContext::default())
			.await
			.unwrap_err();
		assert_eq!(err.code, ErrorCode::General);
		let message = err.message.unwrap();
		assert!(message.contains("Provider 'x' initialization failed"));
		assert!(message.contains("Provider 'y' initialization failed"));
		assert!(message.contains("; "));
	}

	#[test]
	fn worst_status_wins() {
		use ProviderStatus::*;
		assert_eq!(worst([Ready, Stale].into_iter()), Stale);
		assert_eq!(worst([Ready, Error, Stale].into_iter()), Error);
		assert_eq!(worst([Error, NotReady].into_iter()), NotReady);
		assert_eq!(worst([NotReady, Fatal].into_iter()), Fatal);
		assert_eq!(worst(std::iter::empty()), Ready);
	}

	#[tokio::test]
	async fn sub_provider_events_are_tagged_and_deduplicated() {
		let a = Arc::new(StubProvider::new("a"));
		let b = Arc::new(StubProvider::new("b"));
		let multi = MultiProvider::builder()
			.shared_provider(a.clone(), None)
			.shared_provider(b.clone(), None)
			.build()
			.unwrap();
		multi
			.initialize(&EvaluationContext::default())
			.await
			.unwrap();

		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		multi.attach(ProviderEventEmitter::new(move |event, details| {
			sink.lock().push((event, details.provider_name));
		}));

		a.fire(
			ProviderEvent::ConfigurationChanged,
			EventDetails::new().with_flags_changed(vec!["f".to_string()]),
		);
		a.fire(ProviderEvent::Stale, EventDetails::new());
		// Aggregate is already STALE, so b going stale is not forwarded.
		b.fire(ProviderEvent::Stale, EventDetails::new());
		a.fire(ProviderEvent::Ready, EventDetails::new());
		b.fire(ProviderEvent::Ready, EventDetails::new());

		assert_eq!(
			*seen.lock(),
			vec![
				(ProviderEvent::ConfigurationChanged, "a".to_string()),
				(ProviderEvent::Stale, "a".to_string()),
				(ProviderEvent::Ready, "b".to_string()),
			]
		);

		multi.detach();
		a.fire(ProviderEvent::Stale, EventDetails::new());
		assert_eq!(seen.lock().len(), 3);
	}

	#[tokio::test]
	async fn fatal_sub_provider_makes_aggregate_fatal() {
		let a = Arc::new(StubProvider::new("a"));
		let multi = MultiProvider::builder()
			.shared_provider(a.clone(), None)
			.provider(NoOpProvider::new())
			.build()
			.unwrap();
		multi
			.initialize(&EvaluationContext::default())
			.await
			.unwrap();

		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		multi.attach(ProviderEventEmitter::new(move |event, details| {
			sink.lock().push((event, details.error_code));
		}));

		a.fire(
			ProviderEvent::Error,
			EventDetails::from_error(&EvaluationError::provider_fatal("lost credentials")),
		);
		a.fire(ProviderEvent::Ready, EventDetails::new());

		assert_eq!(
			*seen.lock(),
			vec![(ProviderEvent::Error, Some(ErrorCode::ProviderFatal))]
		);
	}
}
