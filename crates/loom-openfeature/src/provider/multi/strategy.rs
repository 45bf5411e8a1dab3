// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use loom_openfeature_core::{FlagValue, ResolutionDetails};

/// How a [`super::MultiProvider`] dispatches to its sub-providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
	/// One provider at a time, stopping at the first accepted result.
	#[default]
	Sequential,
	/// Every provider concurrently; selection happens after all return.
	Parallel,
}

/// Decides which sub-provider result a [`super::MultiProvider`] returns.
///
/// Results are offered in registration order. The first one accepted wins;
/// if none is accepted the last result is returned.
pub trait EvaluationStrategy: Send + Sync + 'static {
	fn run_mode(&self) -> RunMode;

	fn should_use_result(
		&self,
		flag_key: &str,
		provider_name: &str,
		result: &ResolutionDetails<FlagValue>,
	) -> bool;
}

/// Sequentially tries providers and takes the first non-error result.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMatchStrategy;

impl EvaluationStrategy for FirstMatchStrategy {
	fn run_mode(&self) -> RunMode {
		RunMode::Sequential
	}

	fn should_use_result(
		&self,
		_flag_key: &str,
		_provider_name: &str,
		result: &ResolutionDetails<FlagValue>,
	) -> bool {
		!result.is_error()
	}
}

/// Queries all providers concurrently and takes the first non-error result
/// in registration order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstSuccessfulStrategy;

impl EvaluationStrategy for FirstSuccessfulStrategy {
	fn run_mode(&self) -> RunMode {
		RunMode::Parallel
	}

	fn should_use_result(
		&self,
		_flag_key: &str,
		_provider_name: &str,
		result: &ResolutionDetails<FlagValue>,
	) -> bool {
		!result.is_error()
	}
}
