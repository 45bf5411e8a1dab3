// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Providers shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use loom_openfeature_core::{
	EvaluationContext, EvaluationError, EvaluationResult, EventDetails, ProviderEvent,
	ProviderMetadata, ResolutionDetails,
};
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::event::{EmitterSlot, ProviderEventEmitter};
use crate::provider::{FeatureProvider, InMemoryFlag, InMemoryProvider};

/// Counts lifecycle calls and serves flags from an in-memory map.
pub(crate) struct TrackingProvider {
	name: String,
	flags: InMemoryProvider,
	init_error: Mutex<Option<EvaluationError>>,
	gate: Option<Arc<Notify>>,
	init_calls: AtomicUsize,
	shutdown_calls: AtomicUsize,
	resolve_calls: AtomicUsize,
	events: EmitterSlot,
}

impl TrackingProvider {
	pub(crate) fn new(name: &str) -> Self {
		Self {
			name: name.to_string(),
			flags: InMemoryProvider::builder()
				.flag(
					"Key",
					InMemoryFlag::new("true")
						.with_variant("true", true)
						.with_variant("false", false),
				)
				.build(),
			init_error: Mutex::new(None),
			gate: None,
			init_calls: AtomicUsize::new(0),
			shutdown_calls: AtomicUsize::new(0),
			resolve_calls: AtomicUsize::new(0),
			events: EmitterSlot::new(),
		}
	}

	pub(crate) fn failing_init(name: &str, error: EvaluationError) -> Self {
		let provider = Self::new(name);
		*provider.init_error.lock() = Some(error);
		provider
	}

	/// Initialization waits until `gate` is notified.
	pub(crate) fn gated(name: &str, gate: Arc<Notify>) -> Self {
		Self {
			gate: Some(gate),
			..Self::new(name)
		}
	}

	pub(crate) fn fire(&self, event: ProviderEvent, details: EventDetails) -> bool {
		self.events.emit(event, details)
	}

	pub(crate) fn inits(&self) -> usize {
		self.init_calls.load(Ordering::SeqCst)
	}

	pub(crate) fn shutdowns(&self) -> usize {
		self.shutdown_calls.load(Ordering::SeqCst)
	}

	pub(crate) fn resolves(&self) -> usize {
		self.resolve_calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl FeatureProvider for TrackingProvider {
	fn metadata(&self) -> ProviderMetadata {
		ProviderMetadata::new(self.name.clone())
	}

	async fn initialize(&self, _context: &EvaluationContext) -> EvaluationResult<()> {
		self.init_calls.fetch_add(1, Ordering::SeqCst);
		if let Some(gate) = &self.gate {
			gate.notified().await;
		}
		match self.init_error.lock().clone() {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}

	async fn shutdown(&self) -> EvaluationResult<()> {
		self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
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
		flag_key: &str,
		default_value: bool,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<bool>> {
		self.resolve_calls.fetch_add(1, Ordering::SeqCst);
		self.flags
			.resolve_boolean_details(flag_key, default_value, context)
			.await
	}

	async fn resolve_string_details(
		&self,
		flag_key: &str,
		default_value: String,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<String>> {
		self.resolve_calls.fetch_add(1, Ordering::SeqCst);
		self.flags
			.resolve_string_details(flag_key, default_value, context)
			.await
	}

	async fn resolve_integer_details(
		&self,
		flag_key: &str,
		default_value: i64,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<i64>> {
		self.resolve_calls.fetch_add(1, Ordering::SeqCst);
		self.flags
			.resolve_integer_details(flag_key, default_value, context)
			.await
	}

	async fn resolve_float_details(
		&self,
		flag_key: &str,
		default_value: f64,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<f64>> {
		self.resolve_calls.fetch_add(1, Ordering::SeqCst);
		self.flags
			.resolve_float_details(flag_key, default_value, context)
			.await
	}

	async fn resolve_object_details(
		&self,
		flag_key: &str,
		default_value: serde_json::Value,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<serde_json::Value>> {
		self.resolve_calls.fetch_add(1, Ordering::SeqCst);
		self.flags
			.resolve_object_details(flag_key, default_value, context)
			.await
	}
}
