// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Adapter for providers written against blocking I/O.

use std::sync::Arc;

use async_trait::async_trait;
use loom_openfeature_core::{
	EvaluationContext, EvaluationError, EvaluationResult, ProviderMetadata, ResolutionDetails,
};
use tracing::error;

use super::FeatureProvider;
use crate::event::ProviderEventEmitter;
use crate::hook::SharedHook;

fn not_implemented<T>(kind: &str) -> EvaluationResult<ResolutionDetails<T>> {
	Err(EvaluationError::general(format!(
		"{kind} resolution is not implemented by this provider"
	)))
}

/// A provider whose methods block the calling thread.
///
/// Every resolver defaults to a GENERAL "not implemented" error so a provider
/// only has to implement the flag types it serves. Wrap it in
/// [`BlockingProvider`] to register it with the SDK.
pub trait SyncFeatureProvider: Send + Sync + 'static {
	fn metadata(&self) -> ProviderMetadata;

	fn hooks(&self) -> Vec<SharedHook> {
		Vec::new()
	}

	fn initialize(&self, _context: &EvaluationContext) -> EvaluationResult<()> {
		Ok(())
	}

	fn shutdown(&self) -> EvaluationResult<()> {
		Ok(())
	}

	fn attach(&self, _emitter: ProviderEventEmitter) {}

	fn detach(&self) {}

	fn resolve_boolean_details(
		&self,
		_flag_key: &str,
		_default_value: bool,
		_context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<bool>> {
		not_implemented("boolean")
	}

	fn resolve_string_details(
		&self,
		_flag_key: &str,
		_default_value: String,
		_context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<String>> {
		not_implemented("string")
	}

	fn resolve_integer_details(
		&self,
		_flag_key: &str,
		_default_value: i64,
		_context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<i64>> {
		not_implemented("integer")
	}

	fn resolve_float_details(
		&self,
		_flag_key: &str,
		_default_value: f64,
		_context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<f64>> {
		not_implemented("float")
	}

	fn resolve_object_details(
		&self,
		_flag_key: &str,
		_default_value: serde_json::Value,
		_context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<serde_json::Value>> {
		not_implemented("object")
	}
}

/// Runs a [`SyncFeatureProvider`] on tokio's blocking thread pool.
pub struct BlockingProvider<P> {
	inner: Arc<P>,
}

impl<P: SyncFeatureProvider> BlockingProvider<P> {
	pub fn new(provider: P) -> Self {
		Self {
			inner: Arc::new(provider),
		}
	}

	pub fn inner(&self) -> &P {
		&self.inner
	}

	async fn run<T, F>(&self, operation: &'static str, f: F) -> EvaluationResult<T>
	where
		T: Send + 'static,
		F: FnOnce(&P) -> EvaluationResult<T> + Send + 'static,
	{
		let inner = Arc::clone(&self.inner);
		match tokio::task::spawn_blocking(move || f(&inner)).await {
			Ok(result) => result,
			Err(e) => {
				error!(
					provider_name = %self.inner.metadata().name,
					operation,
					error = %e,
					"blocking provider task failed"
				);
				Err(EvaluationError::general(format!(
					"blocking {operation} task failed: {e}"
				)))
			}
		}
	}
}

#[async_trait]
impl<P: SyncFeatureProvider> FeatureProvider for BlockingProvider<P> {
	fn metadata(&self) -> ProviderMetadata {
		self.inner.metadata()
	}

	fn hooks(&self) -> Vec<SharedHook> {
		self.inner.hooks()
	}

	async fn initialize(&self, context: &EvaluationContext) -> EvaluationResult<()> {
		let context = context.clone();
		self.run("initialize", move |p| p.initialize(&context)).await
	}

	async fn shutdown(&self) -> EvaluationResult<()> {
		self.run("shutdown", |p| p.shutdown()).await
	}

	fn attach(&self, emitter: ProviderEventEmitter) {
		self.inner.attach(emitter);
	}

	fn detach(&self) {
		self.inner.detach();
	}

	async fn resolve_boolean_details(
		&self,
		flag_key: &str,
		default_value: bool,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<bool>> {
		let (key, context) = (flag_key.to_string(), context.clone());
		self.run("resolve", move |p| {
			p.resolve_boolean_details(&key, default_value, &context)
		})
		.await
	}

	async fn resolve_string_details(
		&self,
		flag_key: &str,
		default_value: String,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<String>> {
		let (key, context) = (flag_key.to_string(), context.clone());
		self.run("resolve", move |p| {
			p.resolve_string_details(&key, default_value, &context)
		})
		.await
	}

	async fn resolve_integer_details(
		&self,
		flag_key: &str,
		default_value: i64,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<i64>> {
		let (key, context) = (flag_key.to_string(), context.clone());
		self.run("resolve", move |p| {
			p.resolve_integer_details(&key, default_value, &context)
		})
		.await
	}

	async fn resolve_float_details(
		&self,
		flag_key: &str,
		default_value: f64,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<f64>> {
		let (key, context) = (flag_key.to_string(), context.clone());
		self.run("resolve", move |p| {
			p.resolve_float_details(&key, default_value, &context)
		})
		.await
	}

	async fn resolve_object_details(
		&self,
		flag_key: &str,
		default_value: serde_json::Value,
		context: &EvaluationContext,
	) -> EvaluationResult<ResolutionDetails<serde_json::Value>> {
		let (key, context) = (flag_key.to_string(), context.clone());
		self.run("resolve", move |p| {
			p.resolve_object_details(&key, default_value, &context)
		})
		.await
	}
}
