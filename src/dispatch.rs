//! The method registry and message dispatcher: matches incoming OSC
//! messages against registered method addresses and fans each match out
//! to its handler.
//!
//! There is no teacher precedent for a multi-handler dispatcher —
//! `pykeio-vmc` only ever hands a single decoded packet to one VMC state
//! machine. The `Arc`/`Weak` split here follows the same ownership
//! discipline the teacher uses for its socket handles (`Arc<UdpSocket>`
//! shared between `VMCSocket` and cloned `VMCSender`s); the `RwLock`
//! fan-out is a standard reader/writer split between registration and
//! in-flight dispatch.

use std::sync::{Arc, RwLock, Weak};

use crate::{
	argument::{self, ArgumentTypeTag},
	error::Result,
	pattern::{self, MatchKind},
	packet::{Bundle, Message, Packet},
	timetag::TimeTag
};

/// A handler invoked on dispatch: the matched message, how the pattern
/// matched it, and the timetag of the enclosing bundle (`None` if the
/// message arrived unbundled).
pub type Handler = dyn Fn(&Message, MatchKind, Option<TimeTag>) + Send + Sync;

struct MethodInner {
	address: String,
	required_arguments: Option<Vec<ArgumentTypeTag>>,
	handler: Box<Handler>
}

/// A registered handler at a fully qualified address.
///
/// `Method` is the owning handle returned by [`Method::new`]; an
/// [`AddressSpace`] holds only a non-owning [`Weak`] reference to it,
/// identified by that reference's identity rather than its address, so
/// dropping every `Method` clone removes it from dispatch without
/// requiring an explicit [`AddressSpace::deregister`] call.
#[derive(Clone)]
pub struct Method(Arc<MethodInner>);

impl Method {
	/// Creates a new method. Fails with `InvalidAddress` if `address`
	/// contains a reserved character or does not start with `/`; this is
	/// checked here too (not only at registration) so a `Method` handle
	/// is never silently unusable.
	pub fn new(address: impl Into<String>, required_arguments: Option<Vec<ArgumentTypeTag>>, handler: impl Fn(&Message, MatchKind, Option<TimeTag>) + Send + Sync + 'static) -> Result<Self> {
		let address = address.into();
		pattern::validate_address(&address)?;
		Ok(Method(Arc::new(MethodInner { address, required_arguments, handler: Box::new(handler) })))
	}

	pub fn address(&self) -> &str {
		&self.0.address
	}

	fn downgrade(&self) -> Weak<MethodInner> {
		Arc::downgrade(&self.0)
	}
}

/// An ordered registry of [`Method`]s that decoded packets are dispatched
/// against.
///
/// Registration order determines dispatch order. Duplicates (two methods
/// at the same address) are allowed. Concurrent `register`/`deregister`
/// against an in-progress `dispatch` are serialized by an internal
/// `RwLock`: registration takes the writer lock; dispatch takes the
/// reader lock for the duration of one message's fan-out. Handlers MUST
/// NOT call back into `register`/`deregister` on the same address space —
/// doing so under the reader lock held by `dispatch` would deadlock.
#[derive(Default)]
pub struct AddressSpace {
	methods: RwLock<Vec<Weak<MethodInner>>>
}

impl AddressSpace {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `method`, appending it to the end of the dispatch order.
	/// The method's address was already validated in [`Method::new`], so
	/// this cannot fail; it returns `Result` anyway for callers that
	/// construct the method address and the registration in one step.
	pub fn register(&self, method: &Method) -> Result<()> {
		pattern::validate_address(method.address())?;
		self.methods.write().unwrap().push(method.downgrade());
		Ok(())
	}

	/// Removes `method` by identity. A method that was never registered
	/// (or already deregistered) is a no-op.
	pub fn deregister(&self, method: &Method) {
		let target = Arc::as_ptr(&method.0);
		self.methods.write().unwrap().retain(|weak| weak.as_ptr() != target);
	}

	/// Clears every registered method.
	pub fn deregister_all(&self) {
		self.methods.write().unwrap().clear();
	}

	/// The number of currently-live registered methods.
	pub fn len(&self) -> usize {
		self.methods.read().unwrap().iter().filter(|w| w.strong_count() > 0).count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Dispatches a decoded packet. A lone message is dispatched with
	/// `enclosing_time_tag = None`; a bundle recursively
	/// dispatches each of its elements with `enclosing_time_tag` set to
	/// the bundle's own timetag, depth-first, in array order.
	pub fn dispatch(&self, packet: &Packet) {
		self.dispatch_with_time_tag(packet, None);
	}

	fn dispatch_with_time_tag(&self, packet: &Packet, enclosing_time_tag: Option<TimeTag>) {
		match packet {
			Packet::Message(message) => self.dispatch_message(message, enclosing_time_tag),
			Packet::Bundle(bundle) => self.dispatch_bundle(bundle)
		}
	}

	fn dispatch_bundle(&self, bundle: &Bundle) {
		for element in &bundle.elements {
			self.dispatch_with_time_tag(element, Some(bundle.time_tag));
		}
	}

	fn dispatch_message(&self, message: &Message, enclosing_time_tag: Option<TimeTag>) {
		let methods = self.methods.read().unwrap();
		let arg_tags = message.argument_type_tags();

		for weak in methods.iter() {
			let Some(method) = weak.upgrade() else { continue };

			let match_kind = pattern::match_pattern(&message.address_pattern, &method.address);
			if !match_kind.is_match() {
				continue;
			}

			if let Some(required) = &method.required_arguments {
				if !argument::matches(&arg_tags, required) {
					continue;
				}
			}

			(method.handler)(message, match_kind, enclosing_time_tag);
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering}
	};

	use super::*;
	use crate::Argument;

	#[test]
	fn register_rejects_invalid_address() {
		let result = Method::new("no-leading-slash", None, |_, _, _| {});
		assert!(result.is_err());
	}

	#[test]
	fn dispatch_invokes_matching_methods_only() {
		let space = AddressSpace::new();
		let hits: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

		let hits_a = hits.clone();
		let method_a = Method::new("/foo/bar", None, move |m, _, _| hits_a.lock().unwrap().push(m.address_pattern.clone())).unwrap();
		let hits_b = hits.clone();
		let method_b = Method::new("/foo/baz", None, move |m, _, _| hits_b.lock().unwrap().push(m.address_pattern.clone())).unwrap();

		space.register(&method_a).unwrap();
		space.register(&method_b).unwrap();

		space.dispatch(&Packet::Message(Message::new("/foo/bar", vec![])));

		assert_eq!(*hits.lock().unwrap(), vec!["/foo/bar".to_string()]);
	}

	#[test]
	fn deregister_removes_by_identity_not_address() {
		let space = AddressSpace::new();
		let count = Arc::new(AtomicUsize::new(0));

		let count_a = count.clone();
		let method_a = Method::new("/foo", None, move |_, _, _| {
			count_a.fetch_add(1, Ordering::SeqCst);
		})
		.unwrap();
		let count_b = count.clone();
		let method_b = Method::new("/foo", None, move |_, _, _| {
			count_b.fetch_add(1, Ordering::SeqCst);
		})
		.unwrap();

		space.register(&method_a).unwrap();
		space.register(&method_b).unwrap();
		space.deregister(&method_a);

		space.dispatch(&Packet::Message(Message::new("/foo", vec![])));
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn deregister_missing_method_is_a_no_op() {
		let space = AddressSpace::new();
		let method = Method::new("/foo", None, |_, _, _| {}).unwrap();
		space.deregister(&method); // never registered
		assert_eq!(space.len(), 0);
	}

	#[test]
	fn required_arguments_filter_dispatch() {
		let space = AddressSpace::new();
		let hit = Arc::new(AtomicUsize::new(0));
		let hit2 = hit.clone();

		let method = Method::new("/foo", Some(vec![ArgumentTypeTag::Int32]), move |_, _, _| {
			hit2.fetch_add(1, Ordering::SeqCst);
		})
		.unwrap();
		space.register(&method).unwrap();

		space.dispatch(&Packet::Message(Message::new("/foo", vec![Argument::String("nope".into())])));
		assert_eq!(hit.load(Ordering::SeqCst), 0);

		space.dispatch(&Packet::Message(Message::new("/foo", vec![Argument::Int32(1)])));
		assert_eq!(hit.load(Ordering::SeqCst), 1);
	}

	// A bundle of six messages dispatched to six registered methods:
	// each is invoked once, in registration order, each receiving the
	// bundle's timetag.
	#[test]
	fn bundle_dispatch_order_and_time_tag() {
		let space = AddressSpace::new();
		let order: Arc<Mutex<Vec<(String, Option<TimeTag>)>>> = Arc::new(Mutex::new(Vec::new()));

		let methods: Vec<Method> = (0..6)
			.map(|i| {
				let order = order.clone();
				Method::new(format!("/m{i}"), None, move |m, _, tt| {
					order.lock().unwrap().push((m.address_pattern.clone(), tt));
				})
				.unwrap()
			})
			.collect();
		for m in &methods {
			space.register(m).unwrap();
		}

		let time_tag = TimeTag::new(42, 7);
		let elements = (0..6).map(|i| Packet::Message(Message::new(format!("/m{i}"), vec![]))).collect();
		space.dispatch(&Packet::Bundle(Bundle::new(time_tag, elements)));

		let recorded = order.lock().unwrap();
		assert_eq!(recorded.len(), 6);
		for (i, (addr, tt)) in recorded.iter().enumerate() {
			assert_eq!(addr, &format!("/m{i}"));
			assert_eq!(*tt, Some(time_tag));
		}
	}

	#[test]
	fn unbundled_message_has_no_enclosing_time_tag() {
		let space = AddressSpace::new();
		let seen: Arc<Mutex<Option<Option<TimeTag>>>> = Arc::new(Mutex::new(None));
		let seen2 = seen.clone();

		let method = Method::new("/foo", None, move |_, _, tt| *seen2.lock().unwrap() = Some(tt)).unwrap();
		space.register(&method).unwrap();

		space.dispatch(&Packet::Message(Message::new("/foo", vec![])));
		assert_eq!(*seen.lock().unwrap(), Some(None));
	}

	#[test]
	fn dropping_the_method_handle_removes_it_from_dispatch() {
		let space = AddressSpace::new();
		let count = Arc::new(AtomicUsize::new(0));
		let count2 = count.clone();

		let method = Method::new("/foo", None, move |_, _, _| {
			count2.fetch_add(1, Ordering::SeqCst);
		})
		.unwrap();
		space.register(&method).unwrap();
		drop(method);

		space.dispatch(&Packet::Message(Message::new("/foo", vec![])));
		assert_eq!(count.load(Ordering::SeqCst), 0);
	}
}
