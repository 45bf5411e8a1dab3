// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flag values and flag types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EvaluationError, EvaluationResult};

/// The five value types a flag can be evaluated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagType {
	Boolean,
	String,
	Integer,
	Float,
	Object,
}

impl FlagType {
	pub fn as_str(&self) -> &'static str {
		match self {
			FlagType::Boolean => "BOOLEAN",
			FlagType::String => "STRING",
			FlagType::Integer => "INTEGER",
			FlagType::Float => "FLOAT",
			FlagType::Object => "OBJECT",
		}
	}
}

impl std::fmt::Display for FlagType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A resolved or default flag value.
///
/// Object flags carry JSON; only objects and arrays are valid object values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	Object(serde_json::Value),
}

impl FlagValue {
	/// The flag type this value's kind corresponds to.
	pub fn flag_type(&self) -> FlagType {
		match self {
			FlagValue::Bool(_) => FlagType::Boolean,
			FlagValue::Int(_) => FlagType::Integer,
			FlagValue::Float(_) => FlagType::Float,
			FlagValue::String(_) => FlagType::String,
			FlagValue::Object(_) => FlagType::Object,
		}
	}

	/// Checks that this value is a valid value of `expected`.
	///
	/// Values are never coerced: an integer is not a float and a JSON scalar
	/// is not an object.
	pub fn check_type(&self, expected: FlagType) -> EvaluationResult<()> {
		let matches = match (self, expected) {
			(FlagValue::Object(json), FlagType::Object) => json.is_object() || json.is_array(),
			(value, expected) => value.flag_type() == expected,
		};
		if matches {
			Ok(())
		} else {
			Err(EvaluationError::type_mismatch(format!(
				"expected {expected} value, got {}",
				self.describe()
			)))
		}
	}

	fn describe(&self) -> &'static str {
		match self {
			FlagValue::Object(json) if !(json.is_object() || json.is_array()) => "non-object JSON",
			other => other.flag_type().as_str(),
		}
	}
}

impl std::fmt::Display for FlagValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			FlagValue::Bool(b) => write!(f, "{b}"),
			FlagValue::Int(i) => write!(f, "{i}"),
			FlagValue::Float(x) => write!(f, "{x}"),
			FlagValue::String(s) => f.write_str(s),
			FlagValue::Object(json) => write!(f, "{json}"),
		}
	}
}

/// Rust types that can be requested as a flag value.
///
/// Implemented for `bool`, `String`, `i64`, `f64` and `serde_json::Value`.
pub trait FlagValueType: Sized + Clone + Send + Sync + 'static {
	const FLAG_TYPE: FlagType;

	fn into_flag_value(self) -> FlagValue;

	fn from_flag_value(value: FlagValue) -> EvaluationResult<Self>;
}

impl FlagValueType for bool {
	const FLAG_TYPE: FlagType = FlagType::Boolean;

	fn into_flag_value(self) -> FlagValue {
		FlagValue::Bool(self)
	}

	fn from_flag_value(value: FlagValue) -> EvaluationResult<Self> {
		match value {
			FlagValue::Bool(b) => Ok(b),
			other => Err(mismatch(Self::FLAG_TYPE, &other)),
		}
	}
}

impl FlagValueType for String {
	const FLAG_TYPE: FlagType = FlagType::String;

	fn into_flag_value(self) -> FlagValue {
		FlagValue::String(self)
	}

	fn from_flag_value(value: FlagValue) -> EvaluationResult<Self> {
		match value {
			FlagValue::String(s) => Ok(s),
			other => Err(mismatch(Self::FLAG_TYPE, &other)),
		}
	}
}

impl FlagValueType for i64 {
	const FLAG_TYPE: FlagType = FlagType::Integer;

	fn into_flag_value(self) -> FlagValue {
		FlagValue::Int(self)
	}

	fn from_flag_value(value: FlagValue) -> EvaluationResult<Self> {
		match value {
			FlagValue::Int(i) => Ok(i),
			other => Err(mismatch(Self::FLAG_TYPE, &other)),
		}
	}
}

impl FlagValueType for f64 {
	const FLAG_TYPE: FlagType = FlagType::Float;

	fn into_flag_value(self) -> FlagValue {
		FlagValue::Float(self)
	}

	fn from_flag_value(value: FlagValue) -> EvaluationResult<Self> {
		match value {
			FlagValue::Float(x) => Ok(x),
			other => Err(mismatch(Self::FLAG_TYPE, &other)),
		}
	}
}

impl FlagValueType for serde_json::Value {
	const FLAG_TYPE: FlagType = FlagType::Object;

	fn into_flag_value(self) -> FlagValue {
		FlagValue::Object(self)
	}

	fn from_flag_value(value: FlagValue) -> EvaluationResult<Self> {
		value.check_type(Self::FLAG_TYPE)?;
		match value {
			FlagValue::Object(json) => Ok(json),
			other => Err(mismatch(Self::FLAG_TYPE, &other)),
		}
	}
}

fn mismatch(expected: FlagType, actual: &FlagValue) -> EvaluationError {
	EvaluationError::type_mismatch(format!(
		"expected {expected} value, got {}",
		actual.describe()
	))
}

impl From<bool> for FlagValue {
	fn from(value: bool) -> Self {
		FlagValue::Bool(value)
	}
}

impl From<i64> for FlagValue {
	fn from(value: i64) -> Self {
		FlagValue::Int(value)
	}
}

impl From<f64> for FlagValue {
	fn from(value: f64) -> Self {
		FlagValue::Float(value)
	}
}

impl From<String> for FlagValue {
	fn from(value: String) -> Self {
		FlagValue::String(value)
	}
}

impl From<&str> for FlagValue {
	fn from(value: &str) -> Self {
		FlagValue::String(value.to_string())
	}
}

impl From<serde_json::Value> for FlagValue {
	fn from(value: serde_json::Value) -> Self {
		FlagValue::Object(value)
	}
}

/// A scalar value attached to a resolution as flag metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagMetadataValue {
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
}

impl From<bool> for FlagMetadataValue {
	fn from(value: bool) -> Self {
		FlagMetadataValue::Bool(value)
	}
}

impl From<i64> for FlagMetadataValue {
	fn from(value: i64) -> Self {
		FlagMetadataValue::Int(value)
	}
}

impl From<f64> for FlagMetadataValue {
	fn from(value: f64) -> Self {
		FlagMetadataValue::Float(value)
	}
}

impl From<String> for FlagMetadataValue {
	fn from(value: String) -> Self {
		FlagMetadataValue::String(value)
	}
}

impl From<&str> for FlagMetadataValue {
	fn from(value: &str) -> Self {
		FlagMetadataValue::String(value.to_string())
	}
}

/// String-keyed metadata describing a resolution.
pub type FlagMetadata = BTreeMap<String, FlagMetadataValue>;
