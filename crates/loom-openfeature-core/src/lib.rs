// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Loom OpenFeature SDK.
//!
//! This crate holds the runtime-independent data model shared by the SDK
//! (`loom-openfeature`) and by provider implementations.
//!
//! # Overview
//!
//! - [`EvaluationContext`] with its merge algebra
//! - [`FlagValue`] / [`FlagType`] and the [`FlagValueType`] conversion trait
//! - [`ResolutionDetails`] (provider answer) and [`EvaluationDetails`] (client answer)
//! - [`ErrorCode`], [`EvaluationError`] and [`OpenFeatureError`]
//! - [`ProviderStatus`] state machine and [`ProviderEvent`] / [`EventDetails`]
//!
//! # Example
//!
//! ```
//! use loom_openfeature_core::{
//!     EvaluationContext, EvaluationDetails, Reason, ResolutionDetails,
//! };
//!
//! let ctx = EvaluationContext::new("user-123").with_attribute("plan", "enterprise");
//!
//! let resolution = ResolutionDetails::new(true)
//!     .with_variant("on")
//!     .with_reason(Reason::TargetingMatch);
//!
//! let details = EvaluationDetails::from_resolution("checkout.new_flow", resolution);
//! assert!(details.value);
//! ```

pub mod context;
pub mod details;
pub mod error;
pub mod event;
pub mod metadata;
pub mod status;
pub mod value;

pub use context::{ContextValue, EvaluationContext};
pub use details::{EvaluationDetails, Reason, ResolutionDetails};
pub use error::{ErrorCode, EvaluationError, EvaluationResult, OpenFeatureError, Result};
pub use event::{EventDetails, ProviderEvent};
pub use metadata::{ClientMetadata, ProviderMetadata};
pub use status::ProviderStatus;
pub use value::{FlagMetadata, FlagMetadataValue, FlagType, FlagValue, FlagValueType};
