// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provider event emission and handler registries.
//!
//! Providers receive a [`ProviderEventEmitter`] when the SDK initializes them
//! and use it to report lifecycle changes. The SDK updates the provider's
//! status and runs the matching handlers:
//!
//! 1. every global handler registered on the API for that event
//! 2. every handler registered on a client whose domain resolves to the
//!    emitting provider
//!
//! Handlers run synchronously on the emitting thread, outside of any lock, and
//! a panicking handler does not prevent the others from running.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use loom_openfeature_core::{EvaluationError, EventDetails, ProviderEvent};
use parking_lot::Mutex;
use tracing::warn;

use crate::panic_message;

/// Callback invoked with the details of a provider event.
pub type EventHandler = Arc<dyn Fn(&EventDetails) + Send + Sync>;

/// Wraps a closure as an [`EventHandler`].
pub fn event_handler(f: impl Fn(&EventDetails) + Send + Sync + 'static) -> EventHandler {
	Arc::new(f)
}

/// Handle through which a provider emits events.
#[derive(Clone)]
pub struct ProviderEventEmitter {
	sink: Arc<dyn Fn(ProviderEvent, EventDetails) + Send + Sync>,
}

impl ProviderEventEmitter {
	pub fn new(sink: impl Fn(ProviderEvent, EventDetails) + Send + Sync + 'static) -> Self {
		Self {
			sink: Arc::new(sink),
		}
	}

	pub fn emit(&self, event: ProviderEvent, details: EventDetails) {
		(self.sink)(event, details);
	}

	pub fn emit_ready(&self) {
		self.emit(ProviderEvent::Ready, EventDetails::new());
	}

	pub fn emit_configuration_changed(&self, flags_changed: Vec<String>) {
		self.emit(
			ProviderEvent::ConfigurationChanged,
			EventDetails::new().with_flags_changed(flags_changed),
		);
	}

	/// Emits `PROVIDER_ERROR`; a `PROVIDER_FATAL` code makes the provider fatal.
	pub fn emit_error(&self, error: &EvaluationError) {
		self.emit(ProviderEvent::Error, EventDetails::from_error(error));
	}

	pub fn emit_stale(&self, message: impl Into<String>) {
		self.emit(ProviderEvent::Stale, EventDetails::new().with_message(message));
	}
}

impl std::fmt::Debug for ProviderEventEmitter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ProviderEventEmitter").finish_non_exhaustive()
	}
}

/// Storage for the emitter a provider was attached with.
///
/// Providers embed one of these and forward `attach`/`detach` to it. Events
/// emitted while detached are dropped.
#[derive(Debug, Default)]
pub struct EmitterSlot {
	emitter: Mutex<Option<ProviderEventEmitter>>,
}

impl EmitterSlot {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn attach(&self, emitter: ProviderEventEmitter) {
		*self.emitter.lock() = Some(emitter);
	}

	pub fn detach(&self) {
		*self.emitter.lock() = None;
	}

	pub fn is_attached(&self) -> bool {
		self.emitter.lock().is_some()
	}

	/// Returns true if the event was delivered to an attached emitter.
	pub fn emit(&self, event: ProviderEvent, details: EventDetails) -> bool {
		// Clone out so the lock is not held while handlers run.
		let emitter = self.emitter.lock().clone();
		match emitter {
			Some(emitter) => {
				emitter.emit(event, details);
				true
			}
			None => false,
		}
	}
}

type HandlerMap = HashMap<ProviderEvent, Vec<EventHandler>>;

/// Global and per-domain handler registries.
///
/// Client handlers are keyed by the client's domain; `None` is the key for
/// clients without a domain.
#[derive(Default)]
pub(crate) struct EventSupport {
	global: Mutex<HandlerMap>,
	clients: Mutex<HashMap<Option<String>, HandlerMap>>,
}

impl EventSupport {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn add_global_handler(&self, event: ProviderEvent, handler: EventHandler) {
		self.global.lock().entry(event).or_default().push(handler);
	}

	pub(crate) fn remove_global_handler(&self, event: ProviderEvent, handler: &EventHandler) {
		if let Some(handlers) = self.global.lock().get_mut(&event) {
			handlers.retain(|h| !same_handler(h, handler));
		}
	}

	pub(crate) fn add_client_handler(
		&self,
		domain: Option<&str>,
		event: ProviderEvent,
		handler: EventHandler,
	) {
		self.clients
			.lock()
			.entry(domain.map(str::to_string))
			.or_default()
			.entry(event)
			.or_default()
			.push(handler);
	}

	pub(crate) fn remove_client_handler(
		&self,
		domain: Option<&str>,
		event: ProviderEvent,
		handler: &EventHandler,
	) {
		let mut clients = self.clients.lock();
		if let Some(handlers) = clients
			.get_mut(&domain.map(str::to_string))
			.and_then(|by_event| by_event.get_mut(&event))
		{
			handlers.retain(|h| !same_handler(h, handler));
		}
	}

	/// Runs global handlers, then the handlers of every client domain for
	/// which `bound_to_emitter` returns true.
	pub(crate) fn dispatch(
		&self,
		event: ProviderEvent,
		details: &EventDetails,
		bound_to_emitter: impl Fn(Option<&str>) -> bool,
	) {
		let mut handlers: Vec<EventHandler> = self
			.global
			.lock()
			.get(&event)
			.cloned()
			.unwrap_or_default();

		{
			let clients = self.clients.lock();
			for (domain, by_event) in clients.iter() {
				if !bound_to_emitter(domain.as_deref()) {
					continue;
				}
				if let Some(client_handlers) = by_event.get(&event) {
					handlers.extend(client_handlers.iter().cloned());
				}
			}
		}

		for handler in &handlers {
			run_handler(event, handler, details);
		}
	}
}

pub(crate) fn run_handler(event: ProviderEvent, handler: &EventHandler, details: &EventDetails) {
	if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(details))) {
		warn!(
			event = %event,
			provider_name = %details.provider_name,
			panic = %panic_message(panic.as_ref()),
			"event handler panicked"
		);
	}
}

fn same_handler(a: &EventHandler, b: &EventHandler) -> bool {
	std::ptr::eq(
		Arc::as_ptr(a) as *const (),
		Arc::as_ptr(b) as *const (),
	)
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;

	fn counting_handler(counter: &Arc<AtomicUsize>) -> EventHandler {
		let counter = Arc::clone(counter);
		event_handler(move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
		})
	}

	#[test]
	fn global_handlers_receive_events() {
		let support = EventSupport::new();
		let count = Arc::new(AtomicUsize::new(0));
		support.add_global_handler(ProviderEvent::Ready, counting_handler(&count));

		support.dispatch(ProviderEvent::Ready, &EventDetails::new(), |_| false);
		support.dispatch(ProviderEvent::Stale, &EventDetails::new(), |_| false);

		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn client_handlers_filtered_by_binding() {
		let support = EventSupport::new();
		let bound = Arc::new(AtomicUsize::new(0));
		let unbound = Arc::new(AtomicUsize::new(0));
		support.add_client_handler(Some("a"), ProviderEvent::Ready, counting_handler(&bound));
		support.add_client_handler(Some("b"), ProviderEvent::Ready, counting_handler(&unbound));

		support.dispatch(ProviderEvent::Ready, &EventDetails::new(), |domain| {
			domain == Some("a")
		});

		assert_eq!(bound.load(Ordering::SeqCst), 1);
		assert_eq!(unbound.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn removed_handlers_stop_receiving() {
		let support = EventSupport::new();
		let count = Arc::new(AtomicUsize::new(0));
		let handler = counting_handler(&count);
		support.add_global_handler(ProviderEvent::Error, Arc::clone(&handler));
		support.add_client_handler(None, ProviderEvent::Error, Arc::clone(&handler));

		support.remove_global_handler(ProviderEvent::Error, &handler);
		support.remove_client_handler(None, ProviderEvent::Error, &handler);
		support.dispatch(ProviderEvent::Error, &EventDetails::new(), |_| true);

		assert_eq!(count.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn panicking_handler_does_not_stop_others() {
		let support = EventSupport::new();
		let count = Arc::new(AtomicUsize::new(0));
		support.add_global_handler(
			ProviderEvent::Ready,
			event_handler(|_| panic!("handler exploded")),
		);
		support.add_global_handler(ProviderEvent::Ready, counting_handler(&count));

		support.dispatch(ProviderEvent::Ready, &EventDetails::new(), |_| false);

		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn emitter_slot_drops_events_when_detached() {
		let slot = EmitterSlot::new();
		let count = Arc::new(AtomicUsize::new(0));
		assert!(!slot.emit(ProviderEvent::Ready, EventDetails::new()));

		let counter = Arc::clone(&count);
		slot.attach(ProviderEventEmitter::new(move |_, _| {
			counter.fetch_add(1, Ordering::SeqCst);
		}));
		assert!(slot.is_attached());
		assert!(slot.emit(ProviderEvent::Ready, EventDetails::new()));

		slot.detach();
		assert!(!slot.emit(ProviderEvent::Ready, EventDetails::new()));
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn concurrent_registration_and_dispatch() {
		let support = Arc::new(EventSupport::new());
		let count = Arc::new(AtomicUsize::new(0));

		let threads: Vec<_> = (0..8)
			.map(|_| {
				let support = Arc::clone(&support);
				let count = Arc::clone(&count);
				std::thread::spawn(move || {
					for _ in 0..50 {
						support.add_global_handler(ProviderEvent::Stale, counting_handler(&count));
						support.dispatch(ProviderEvent::Ready, &EventDetails::new(), |_| true);
					}
				})
			})
			.collect();
		for thread in threads {
			thread.join().unwrap();
		}

		support.dispatch(ProviderEvent::Stale, &EventDetails::new(), |_| true);
		assert_eq!(count.load(Ordering::SeqCst), 400);
	}
}
