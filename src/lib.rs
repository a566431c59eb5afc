//! # `osc-core`
//! A transport-agnostic implementation of [Open Sound Control 1.1](https://opensoundcontrol.stanford.edu/)
//! (OSC): a binary wire codec for messages and bundles, an XPath-style
//! address-pattern matcher, a method registry and dispatcher, and a
//! SLIP (RFC 1055) framer for stream transports.
//!
//! This crate does not open a socket or own an event loop — it only
//! turns bytes into [`Packet`]s and back, matches address patterns, and
//! fans decoded messages out to registered [`Method`]s. Pair it with
//! whatever transport (UDP, TCP via [`slip`], a serial port, ...) your
//! application already uses.
//!
//! ## Example
//! ```
//! use osc_core::{AddressSpace, Argument, Message, Method, Packet, decode, encode};
//!
//! let message = Message::new("/synth/freq", vec![Argument::Float32(440.0)]);
//! let bytes = encode(&Packet::Message(message)).unwrap();
//!
//! let space = AddressSpace::new();
//! let method = Method::new("/synth/freq", None, |m, _, _| {
//! 	println!("freq -> {:?}", m.arguments);
//! })
//! .unwrap();
//! space.register(&method).unwrap();
//! space.dispatch(&decode(&bytes).unwrap());
//! ```

mod argument;
mod dispatch;
mod error;
mod packet;
mod pattern;
mod primitive;
pub mod slip;
mod timetag;

pub use self::{
	argument::{Argument, ArgumentTypeTag},
	dispatch::{AddressSpace, Handler, Method},
	error::{Error, Result},
	packet::{Bundle, Message, Packet, decode, encode, validate_method_address},
	pattern::{MatchKind, match_pattern, validate_address},
	timetag::{TimeTag, TimeTagError}
};
