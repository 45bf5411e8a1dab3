// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Evaluation context: the targeting data handed to providers.
//!
//! A context is a targeting key plus a map of typed attributes. Contexts are
//! combined with [`EvaluationContext::merge`], which is applied in a fixed order
//! during evaluation:
//!
//! ```text
//! API context -> client context -> invocation context -> before-hook context
//! ```
//!
//! Each later context overrides attributes of the same name and replaces the
//! targeting key when its own key is non-empty.
//!
//! # Example
//!
//! ```
//! use loom_openfeature_core::EvaluationContext;
//!
//! let api = EvaluationContext::default().with_attribute("region", "eu");
//! let call = EvaluationContext::new("user-123").with_attribute("plan", "pro");
//!
//! let merged = api.merge(&call);
//! assert_eq!(merged.targeting_key.as_deref(), Some("user-123"));
//! assert_eq!(merged.attributes.len(), 2);
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A typed attribute value. Null and opaque values are not representable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	DateTime(DateTime<Utc>),
	List(Vec<ContextValue>),
	Struct(BTreeMap<String, ContextValue>),
}

impl ContextValue {
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			ContextValue::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			ContextValue::Int(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			ContextValue::Float(f) => Some(*f),
			ContextValue::Int(i) => Some(*i as f64),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			ContextValue::String(s) => Some(s),
			_ => None,
		}
	}
}

impl From<bool> for ContextValue {
	fn from(value: bool) -> Self {
		ContextValue::Bool(value)
	}
}

impl From<i64> for ContextValue {
	fn from(value: i64) -> Self {
		ContextValue::Int(value)
	}
}

impl From<i32> for ContextValue {
	fn from(value: i32) -> Self {
		ContextValue::Int(i64::from(value))
	}
}

impl From<f64> for ContextValue {
	fn from(value: f64) -> Self {
		ContextValue::Float(value)
	}
}

impl From<String> for ContextValue {
	fn from(value: String) -> Self {
		ContextValue::String(value)
	}
}

impl From<&str> for ContextValue {
	fn from(value: &str) -> Self {
		ContextValue::String(value.to_string())
	}
}

impl From<DateTime<Utc>> for ContextValue {
	fn from(value: DateTime<Utc>) -> Self {
		ContextValue::DateTime(value)
	}
}

impl<T: Into<ContextValue>> From<Vec<T>> for ContextValue {
	fn from(values: Vec<T>) -> Self {
		ContextValue::List(values.into_iter().map(Into::into).collect())
	}
}

impl From<BTreeMap<String, ContextValue>> for ContextValue {
	fn from(value: BTreeMap<String, ContextValue>) -> Self {
		ContextValue::Struct(value)
	}
}

/// Targeting data for one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
	/// Identifier of the subject being evaluated, usually a user id.
	pub targeting_key: Option<String>,
	/// Arbitrary typed attributes.
	#[serde(default)]
	pub attributes: BTreeMap<String, ContextValue>,
}

impl EvaluationContext {
	/// Creates a context with the given targeting key and no attributes.
	pub fn new(targeting_key: impl Into<String>) -> Self {
		Self {
			targeting_key: Some(targeting_key.into()),
			attributes: BTreeMap::new(),
		}
	}

	/// Sets the targeting key.
	pub fn with_targeting_key(mut self, targeting_key: impl Into<String>) -> Self {
		self.targeting_key = Some(targeting_key.into());
		self
	}

	/// Adds an attribute, replacing any previous value under the same key.
	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
		self.attributes.insert(key.into(), value.into());
		self
	}

	pub fn attribute(&self, key: &str) -> Option<&ContextValue> {
		self.attributes.get(key)
	}

	/// Returns the targeting key if it is set and non-empty.
	pub fn effective_targeting_key(&self) -> Option<&str> {
		self.targeting_key.as_deref().filter(|k| !k.is_empty())
	}

	/// True when there is neither a targeting key nor any attribute.
	pub fn is_empty(&self) -> bool {
		self.effective_targeting_key().is_none() && self.attributes.is_empty()
	}

	/// Merges `other` on top of `self` without modifying either.
	///
	/// `other`'s non-empty targeting key wins, otherwise `self`'s is kept.
	/// Attribute maps are shallow-unioned with `other` winning on collisions.
	pub fn merge(&self, other: &EvaluationContext) -> EvaluationContext {
		let targeting_key = other
			.effective_targeting_key()
			.or_else(|| self.effective_targeting_key())
			.map(str::to_string)
			.or_else(|| self.targeting_key.clone());

		let mut attributes = self.attributes.clone();
		for (key, value) in &other.attributes {
			attributes.insert(key.clone(), value.clone());
		}

		EvaluationContext {
			targeting_key,
			attributes,
		}
	}

	/// Left-folds `merge` over a sequence of contexts, later ones winning.
	pub fn merge_all<'a>(contexts: impl IntoIterator<Item = &'a EvaluationContext>) -> Self {
		contexts
			.into_iter()
			.fold(EvaluationContext::default(), |acc, ctx| acc.merge(ctx))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	#[test]
	fn merge_prefers_right_targeting_key() {
		let a = EvaluationContext::new("a");
		let b = EvaluationContext::new("b");
		assert_eq!(a.merge(&b).targeting_key.as_deref(), Some("b"));
	}

	#[test]
	fn merge_keeps_left_key_when_right_key_is_empty() {
		let a = EvaluationContext::new("a");
		let b = EvaluationContext::new("");
		assert_eq!(a.merge(&b).targeting_key.as_deref(), Some("a"));

		let c = EvaluationContext::default();
		assert_eq!(a.merge(&c).targeting_key.as_deref(), Some("a"));
	}

	#[test]
	fn merge_overrides_colliding_attributes() {
		let a = EvaluationContext::default()
			.with_attribute("plan", "free")
			.with_attribute("age", 30);
		let b = EvaluationContext::default()
			.with_attribute("plan", "pro")
			.with_attribute("beta", true);

		let merged = a.merge(&b);
		assert_eq!(merged.attribute("plan"), Some(&ContextValue::from("pro")));
		assert_eq!(merged.attribute("age"), Some(&ContextValue::Int(30)));
		assert_eq!(merged.attribute("beta"), Some(&ContextValue::Bool(true)));
	}

	#[test]
	fn merge_does_not_mutate_inputs() {
		let a = EvaluationContext::new("a").with_attribute("x", 1);
		let b = EvaluationContext::new("b").with_attribute("x", 2);
		let _ = a.merge(&b);
		assert_eq!(a.attribute("x"), Some(&ContextValue::Int(1)));
		assert_eq!(b.attribute("x"), Some(&ContextValue::Int(2)));
	}

	#[test]
	fn merge_is_shallow_for_nested_structs() {
		let mut left_inner = BTreeMap::new();
		left_inner.insert("a".to_string(), ContextValue::Int(1));
		let mut right_inner = BTreeMap::new();
		right_inner.insert("b".to_string(), ContextValue::Int(2));

		let a = EvaluationContext::default().with_attribute("nested", left_inner);
		let b = EvaluationContext::default().with_attribute("nested", right_inner.clone());

		assert_eq!(
			a.merge(&b).attribute("nested"),
			Some(&ContextValue::Struct(right_inner))
		);
	}

	#[test]
	fn merge_all_applies_in_order() {
		let api = EvaluationContext::new("api").with_attribute("layer", "api");
		let client = EvaluationContext::default().with_attribute("layer", "client");
		let invocation = EvaluationContext::new("call");

		let merged = EvaluationContext::merge_all([&api, &client, &invocation]);
		assert_eq!(merged.targeting_key.as_deref(), Some("call"));
		assert_eq!(merged.attribute("layer"), Some(&ContextValue::from("client")));
	}

	#[test]
	fn supports_all_attribute_kinds() {
		let when = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
		let ctx = EvaluationContext::new("user")
			.with_attribute("bool", true)
			.with_attribute("int", 7)
			.with_attribute("float", 1.5)
			.with_attribute("string", "s")
			.with_attribute("when", when)
			.with_attribute("list", vec!["a", "b"]);

		assert_eq!(ctx.attribute("bool").and_then(ContextValue::as_bool), Some(true));
		assert_eq!(ctx.attribute("int").and_then(ContextValue::as_i64), Some(7));
		assert_eq!(ctx.attribute("float").and_then(ContextValue::as_f64), Some(1.5));
		assert_eq!(ctx.attribute("string").and_then(ContextValue::as_str), Some("s"));
		assert_eq!(ctx.attribute("when"), Some(&ContextValue::DateTime(when)));
		assert!(matches!(ctx.attribute("list"), Some(ContextValue::List(l)) if l.len() == 2));
	}

	#[test]
	fn empty_context_is_empty() {
		assert!(EvaluationContext::default().is_empty());
		assert!(EvaluationContext::new("").is_empty());
		assert!(!EvaluationContext::new("k").is_empty());
	}
}
