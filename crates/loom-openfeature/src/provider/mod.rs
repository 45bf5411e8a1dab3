// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The provider contract and the providers shipped with the SDK.
//!
//! A provider resolves flag values from some backing source. The SDK owns the
//! lifecycle: it calls [`FeatureProvider::initialize`] once when the provider is
//! first bound, [`FeatureProvider::shutdown`] once when the last binding goes
//! away, and attaches a [`ProviderEventEmitter`] in between.

mod blocking;
mod in_memory;
pub mod multi;
mod noop;

use std::sync::Arc;

use async_trait::async_trait;
use loom_openfeature_core::{
	EvaluationContext, EvaluationResult, FlagValue, ProviderMetadata, ResolutionDetails,
};

use crate::event::ProviderEventEmitter;
use crate::hook::SharedHook;

pub use blocking::{BlockingProvider, SyncFeatureProvider};
pub use in_memory::{ContextEvaluator, InMemoryFlag, InMemoryProvider, InMemoryProviderBuilder};
pub use multi::MultiProvider;
pub use noop::NoOpProvider;

/// Type alias for a shared provider.
pub type SharedProvider = Arc<dyn FeatureProvider>;

/// Resolves typed flag values and reports its lifecycle through events.
///
/// Resolvers should return `Err` for failures rather than panicking; the SDK
/// converts both into an error result, but panics are logged as bugs.
#[async_trait]
pub trait FeatureProvider: Send + Sync + 'static {
	fn metadata(&self) -> ProviderMetadata;

	/// Hooks that run innermost, after API, client and invocation hooks.
	fn hooks(&self) -> Vec<SharedHook> {
		Vec::new()
	}

	/// Prepares the provider. Called at most once per binding lifetime.
	async fn initialize(&self, _context: &EvaluationContext) -> EvaluationResult<()> {
		Ok(())
	}

	/// Releases resources. Called once when the provider is no longer bound.
	async fn shutdown(&self) -> EvaluationResult<()> {
		Ok(())
	}

	/// Receives the emitter to use for spontaneous events.
	fn attach(&self, _emitter: ProviderEventEmitter) {}

	/// Stops event emission. Events emitted after this are dropped.
	fn detach(&self) {}

	async fn resolve_boolean_details(
		&self,
		flag_key: &str,
		default_value: bool,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<bool>>;

	async fn resolve_string_details(
		&self,
		flag_key: &str,
		default_value: String,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<String>>;

	async fn resolve_integer_details(
		&self,
		flag_key: &str,
		default_value: i64,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<i64>>;

	async fn resolve_float_details(
		&self,
		flag_key: &str,
		default_value: f64,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<f64>>;

	async fn resolve_object_details(
		&self,
		flag_key: &str,
		default_value: serde_json::Value,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<serde_json::Value>>;
}

/// Identity of a provider instance, independent of its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ProviderId(usize);

impl ProviderId {
	pub(crate) fn of(provider: &SharedProvider) -> Self {
		ProviderId(Arc::as_ptr(provider) as *const () as usize)
	}
}

/// Calls the resolver matching the type of `default_value`.
pub async fn resolve_value(
	provider: &dyn FeatureProvider,
	flag_key: &str,
	default_value: &FlagValue,
	context: &EvaluationContext,
) -> EvaluationResult<ResolutionDetails<FlagValue>> {
	let details = match default_value {
		FlagValue::Bool(b) => provider
			.resolve_boolean_details(flag_key, *b, context)
			.await?
			.map(FlagValue::Bool),
		FlagValue::String(s) => provider
			.resolve_string_details(flag_key, s.clone(), context)
			.await?
			.map(FlagValue::String),
		FlagValue::Int(i) => provider
			.resolve_integer_details(flag_key, *i, context)
			.await?
			.map(FlagValue::Int),
		FlagValue::Float(x) => provider
			.resolve_float_details(flag_key, *x, context)
			.await?
			.map(FlagValue::Float),
		FlagValue::Object(json) => provider
			.resolve_object_details(flag_key, json.clone(), context)
			.await?
			.map(FlagValue::Object),
	};
	Ok(details)
}
