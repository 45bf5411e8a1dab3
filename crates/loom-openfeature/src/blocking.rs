// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Synchronous facade over [`Client`].

use loom_openfeature_core::{EvaluationContext, EvaluationDetails, FlagValueType, ProviderStatus};
use tokio::runtime::{Builder, Runtime};

use crate::client::{Client, EvaluationOptions};

/// Evaluates flags from synchronous code.
///
/// Owns a current-thread tokio runtime and blocks on it for every call.
/// Calling it from inside an async runtime panics; use [`Client`] there.
pub struct BlockingClient {
	client: Client,
	runtime: Runtime,
}

impl BlockingClient {
	pub fn new(client: Client) -> std::io::Result<Self> {
		let runtime = Builder::new_current_thread().enable_all().build()?;
		Ok(Self { client, runtime })
	}

	pub fn client(&self) -> &Client {
		&self.client
	}

	pub fn provider_status(&self) -> ProviderStatus {
		self.client.provider_status()
	}

	pub fn get_value<T: FlagValueType>(
		&self,
		flag_key: &str,
		default_value: T,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> T {
		self.runtime
			.block_on(self.client.get_value(flag_key, default_value, context, options))
	}

	pub fn get_details<T: FlagValueType>(
		&self,
		flag_key: &str,
		default_value: T,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> EvaluationDetails<T> {
		self.runtime
			.block_on(self.client.get_details(flag_key, default_value, context, options))
	}

	pub fn get_boolean_value(
		&self,
		flag_key: &str,
		default_value: bool,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> bool {
		self.get_value(flag_key, default_value, context, options)
	}

	pub fn get_boolean_details(
		&self,
		flag_key: &str,
		default_value: bool,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> EvaluationDetails<bool> {
		self.get_details(flag_key, default_value, context, options)
	}

	pub fn get_string_value(
		&self,
		flag_key: &str,
		default_value: impl Into<String>,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> String {
		self.get_value(flag_key, default_value.into(), context, options)
	}

	pub fn get_string_details(
		&self,
		flag_key: &str,
		default_value: impl Into<String>,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> EvaluationDetails<String> {
		self.get_details(flag_key, default_value.into(), context, options)
	}

	pub fn get_integer_value(
		&self,
		flag_key: &str,
		default_value: i64,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> i64 {
		self.get_value(flag_key, default_value, context, options)
	}

	pub fn get_integer_details(
		&self,
		flag_key: &str,
		default_value: i64,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> EvaluationDetails<i64> {
		self.get_details(flag_key, default_value, context, options)
	}

	pub fn get_float_value(
		&self,
		flag_key: &str,
		default_value: f64,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> f64 {
		self.get_value(flag_key, default_value, context, options)
	}

	pub fn get_float_details(
		&self,
		flag_key: &str,
		default_value: f64,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> EvaluationDetails<f64> {
		self.get_details(flag_key, default_value, context, options)
	}

	pub fn get_object_value(
		&self,
		flag_key: &str,
		default_value: serde_json::Value,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> serde_json::Value {
		self.get_value(flag_key, default_value, context, options)
	}

	pub fn get_object_details(
		&self,
		flag_key: &str,
		default_value: serde_json::Value,
		context: Option<&EvaluationContext>,
		options: Option<&EvaluationOptions>,
	) -> EvaluationDetails<serde_json::Value> {
		self.get_details(flag_key, default_value, context, options)
	}
}

impl Client {
	/// Wraps this client in a [`BlockingClient`].
	pub fn blocking(&self) -> std::io::Result<BlockingClient> {
		BlockingClient::new(self.clone())
	}
}

impl std::fmt::Debug for BlockingClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BlockingClient")
			.field("client", &self.client)
			.finish_non_exhaustive()
	}
}
