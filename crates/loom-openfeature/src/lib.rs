// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OpenFeature evaluation SDK for Loom.
//!
//! The SDK separates *where flag values come from* (a [`FeatureProvider`])
//! from *how application code asks for them* (a [`Client`]). Providers are
//! registered on an [`OpenFeature`] instance, either as the default or bound
//! to a named domain, and clients evaluate flags against whichever provider
//! their domain resolves to.
//!
//! # Features
//!
//! - Typed flag evaluation that never fails: errors come back as the default
//!   value plus an error code in [`EvaluationDetails`]
//! - Layered evaluation context (API, client, invocation)
//! - Hooks around every evaluation, with a [`LoggingHook`] included
//! - Provider lifecycle tracking and event handlers
//! - [`InMemoryProvider`] for tests and [`MultiProvider`] for fallback chains
//! - [`BlockingClient`] and [`BlockingProvider`] for synchronous callers
//!
//! # Example
//!
//! ```
//! use loom_openfeature::{InMemoryFlag, InMemoryProvider, OpenFeature};
//!
//! # tokio_test::block_on(async {
//! let api = OpenFeature::new();
//! api.set_provider(
//!     InMemoryProvider::builder()
//!         .flag(
//!             "checkout.new_flow",
//!             InMemoryFlag::new("on")
//!                 .with_variant("on", true)
//!                 .with_variant("off", false),
//!         )
//!         .build(),
//! )
//! .await;
//!
//! let client = api.client();
//! assert!(client.get_boolean_value("checkout.new_flow", false, None, None).await);
//! assert!(!client.get_boolean_value("missing", false, None, None).await);
//! # });
//! ```

pub mod api;
pub mod blocking;
pub mod client;
pub mod event;
pub mod hook;
pub mod provider;
mod registry;

#[cfg(test)]
mod testing;

pub use loom_openfeature_core::{
	ClientMetadata, ContextValue, ErrorCode, EvaluationContext, EvaluationDetails, EvaluationError,
	EvaluationResult, EventDetails, FlagMetadata, FlagMetadataValue, FlagType, FlagValue,
	FlagValueType, OpenFeatureError, ProviderEvent, ProviderMetadata, ProviderStatus, Reason,
	ResolutionDetails, Result,
};

pub use api::OpenFeature;
pub use blocking::BlockingClient;
pub use client::{Client, EvaluationOptions};
pub use event::{event_handler, EmitterSlot, EventHandler, ProviderEventEmitter};
pub use hook::{Hook, HookContext, HookData, HookHints, LoggingHook, LoggingHookBuilder, SharedHook};
pub use provider::{
	resolve_value, BlockingProvider, FeatureProvider, InMemoryFlag, InMemoryProvider,
	MultiProvider, NoOpProvider, SharedProvider, SyncFeatureProvider,
};

/// Renders a caught panic payload for logs and error messages.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic".to_string()
	}
}
