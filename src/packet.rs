//! OSC message/bundle structural codec and the leading-byte packet
//! dispatcher, per the [OSC 1.1 specification](http://opensoundcontrol.org/spec-1_0).
//!
//! Grounded on the teacher's `osc/decoder.rs` (nom-combinator decode) and
//! `osc/encoder.rs` (the `Output` mark/place abstraction for backpatching
//! bundle element lengths), generalized from the teacher's fourteen-tag
//! argument set down to the closed nine-tag OSC 1.1 union of
//! [`crate::Argument`].

use nom::Err as NomErr;

use crate::{
	argument::{self, Argument, ArgumentTypeTag},
	error::{Error, Result},
	pattern::validate_address,
	primitive,
	timetag::TimeTag
};

/// A decoded or to-be-encoded OSC message: an address pattern plus zero or
/// more arguments.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
	pub address_pattern: String,
	pub arguments: Vec<Argument>
}

impl Message {
	pub fn new(address_pattern: impl Into<String>, arguments: Vec<Argument>) -> Self {
		Message { address_pattern: address_pattern.into(), arguments }
	}

	/// The type-tag sequence of this message's arguments, for use with
	/// [`argument::matches`] against a method's `requiredArguments`.
	pub fn argument_type_tags(&self) -> Vec<ArgumentTypeTag> {
		self.arguments.iter().map(Argument::type_tag).collect()
	}
}

/// A decoded or to-be-encoded OSC bundle: a timetag plus a list of nested
/// elements.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bundle {
	pub time_tag: TimeTag,
	pub elements: Vec<Packet>
}

impl Bundle {
	pub fn new(time_tag: TimeTag, elements: Vec<Packet>) -> Self {
		Bundle { time_tag, elements }
	}
}

/// The sum type of the two packet shapes distinguished by their leading
/// byte: `/` for a message, `#` for a bundle.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Packet {
	Message(Message),
	Bundle(Bundle)
}

impl Packet {
	pub fn as_message(&self) -> Option<&Message> {
		match self {
			Packet::Message(m) => Some(m),
			_ => None
		}
	}

	pub fn as_bundle(&self) -> Option<&Bundle> {
		match self {
			Packet::Bundle(b) => Some(b),
			_ => None
		}
	}
}

impl From<Message> for Packet {
	fn from(m: Message) -> Self {
		Packet::Message(m)
	}
}

impl From<Bundle> for Packet {
	fn from(b: Bundle) -> Self {
		Packet::Bundle(b)
	}
}

// ---------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------

/// Encodes a packet (message or bundle) to its OSC wire bytes. The
/// result is always a multiple of 4 bytes long.
pub fn encode(packet: &Packet) -> Result<Vec<u8>> {
	let mut out = Vec::new();
	match packet {
		Packet::Message(m) => encode_message(m, &mut out)?,
		Packet::Bundle(b) => encode_bundle(b, &mut out)?
	}
	Ok(out)
}

fn encode_message(message: &Message, out: &mut Vec<u8>) -> Result<()> {
	if !message.address_pattern.starts_with('/') {
		return Err(Error::InvalidMessage(format!("address {:?} does not start with '/'", message.address_pattern)));
	}
	primitive::encode_string(&message.address_pattern, out);

	let tag_string = argument::encode_type_tag_string(&message.arguments);
	primitive::encode_string(&tag_string, out);

	for arg in &message.arguments {
		encode_argument(arg, out)?;
	}
	Ok(())
}

fn encode_argument(arg: &Argument, out: &mut Vec<u8>) -> Result<()> {
	match arg {
		Argument::Int32(v) => primitive::encode_i32(*v, out),
		Argument::Float32(v) => primitive::encode_f32(*v, out),
		Argument::String(s) => primitive::encode_string(s, out),
		Argument::Blob(b) => primitive::encode_blob(b, out)?,
		Argument::TimeTag(t) => primitive::encode_timetag(t.seconds, t.picoseconds, out),
		Argument::True | Argument::False | Argument::Null | Argument::Impulse => {}
	}
	Ok(())
}

fn encode_bundle(bundle: &Bundle, out: &mut Vec<u8>) -> Result<()> {
	primitive::encode_string("#bundle", out);
	primitive::encode_timetag(bundle.time_tag.seconds, bundle.time_tag.picoseconds, out);

	for element in &bundle.elements {
		if let Packet::Bundle(nested) = element {
			if nested.time_tag < bundle.time_tag {
				return Err(Error::InvalidBundle(format!(
					"nested bundle timetag {:?} precedes enclosing bundle timetag {:?}",
					nested.time_tag, bundle.time_tag
				)));
			}
		}

		let element_bytes = match element {
			Packet::Message(m) => {
				let mut buf = Vec::new();
				encode_message(m, &mut buf)?;
				buf
			}
			Packet::Bundle(b) => {
				let mut buf = Vec::new();
				encode_bundle(b, &mut buf)?;
				buf
			}
		};

		let len = i32::try_from(element_bytes.len()).map_err(|_| Error::InvalidBundle("bundle element exceeds i32::MAX bytes".into()))?;
		out.extend_from_slice(&len.to_be_bytes());
		out.extend_from_slice(&element_bytes);
	}
	Ok(())
}

// ---------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------

/// Decodes a single packet from `input`. Peeks the leading
/// byte: `/` decodes a message, `#` (with the literal `#bundle` marker)
/// decodes a bundle; any other leading byte, or an empty buffer, is
/// `InvalidPacket`. Trailing bytes after the packet are ignored — stream
/// framing (SLIP) is responsible for delimiting datagrams.
pub fn decode(input: &[u8]) -> Result<Packet> {
	decode_packet(input, input).map(|(_, packet)| packet).map_err(to_error)
}

fn to_error(e: NomErr<Error>) -> Error {
	match e {
		NomErr::Incomplete(_) => Error::InvalidPacket("incomplete buffer".into()),
		NomErr::Error(e) | NomErr::Failure(e) => e
	}
}

fn decode_packet<'a>(input: &'a [u8], origin: &'a [u8]) -> nom::IResult<&'a [u8], Packet, Error> {
	match input.first() {
		None => Err(NomErr::Error(Error::InvalidPacket("empty buffer".into()))),
		Some(b'/') => decode_message(input, origin).map(|(rest, m)| (rest, Packet::Message(m))),
		Some(b'#') => decode_bundle(input, origin).map(|(rest, b)| (rest, Packet::Bundle(b))),
		Some(&byte) => Err(NomErr::Error(Error::InvalidPacket(format!("leading byte {byte:#x} is neither '/' nor '#'"))))
	}
}

fn decode_message<'a>(input: &'a [u8], origin: &'a [u8]) -> nom::IResult<&'a [u8], Message, Error> {
	let (input, address_pattern) = primitive::decode_string(input, origin)?;
	if !address_pattern.starts_with('/') {
		return Err(NomErr::Error(Error::InvalidMessage(format!("address {address_pattern:?} does not start with '/'"))));
	}

	let (input, tag_string) = primitive::decode_string(input, origin)?;
	if !tag_string.starts_with(',') {
		return Err(NomErr::Error(Error::InvalidMessage(format!("type tag string {tag_string:?} does not start with ','"))));
	}

	let tags = argument::parse_type_tag_string(&tag_string).map_err(NomErr::Error)?;

	let mut input = input;
	let mut arguments = Vec::with_capacity(tags.len());
	for tag in &tags {
		let (rest, arg) = decode_argument(input, origin, tag)?;
		input = rest;
		arguments.push(arg);
	}

	Ok((input, Message { address_pattern, arguments }))
}

fn decode_argument<'a>(input: &'a [u8], origin: &'a [u8], tag: &ArgumentTypeTag) -> nom::IResult<&'a [u8], Argument, Error> {
	match tag {
		ArgumentTypeTag::Int32 => {
			let (input, v) = primitive::decode_i32(input)?;
			Ok((input, Argument::Int32(v)))
		}
		ArgumentTypeTag::Float32 => {
			let (input, v) = primitive::decode_f32(input)?;
			Ok((input, Argument::Float32(v)))
		}
		ArgumentTypeTag::String => {
			let (input, v) = primitive::decode_string(input, origin)?;
			Ok((input, Argument::String(v)))
		}
		ArgumentTypeTag::Blob => {
			let (input, v) = primitive::decode_blob(input, origin)?;
			Ok((input, Argument::Blob(v)))
		}
		ArgumentTypeTag::TimeTag => {
			let (input, (seconds, picoseconds)) = primitive::decode_timetag(input)?;
			Ok((input, Argument::TimeTag(TimeTag::new(seconds, picoseconds))))
		}
		ArgumentTypeTag::True => Ok((input, Argument::True)),
		ArgumentTypeTag::False => Ok((input, Argument::False)),
		ArgumentTypeTag::Null => Ok((input, Argument::Null)),
		ArgumentTypeTag::Impulse => Ok((input, Argument::Impulse)),
		// These only occur in registered method patterns, never on the wire.
		ArgumentTypeTag::AnyTag | ArgumentTypeTag::AnyBoolean | ArgumentTypeTag::AnyNumber | ArgumentTypeTag::Optional(_) => {
			Err(NomErr::Error(Error::InvalidArgumentList("pattern-only type tag cannot appear on the wire".into())))
		}
	}
}

fn decode_bundle<'a>(input: &'a [u8], origin: &'a [u8]) -> nom::IResult<&'a [u8], Bundle, Error> {
	let (input, marker) = primitive::decode_string(input, origin)?;
	if marker != "#bundle" {
		return Err(NomErr::Error(Error::InvalidBundle(format!("expected '#bundle' marker, found {marker:?}"))));
	}

	let (mut input, (seconds, picoseconds)) = primitive::decode_timetag(input)?;
	let time_tag = TimeTag::new(seconds, picoseconds);

	let mut elements = Vec::new();
	while !input.is_empty() {
		let (rest, element) = read_bundle_element(input, origin, time_tag)?;
		elements.push(element);
		input = rest;
	}

	Ok((input, Bundle { time_tag, elements }))
}

fn read_bundle_element<'a>(input: &'a [u8], origin: &'a [u8], enclosing_time_tag: TimeTag) -> nom::IResult<&'a [u8], Packet, Error> {
	let (input, size) = primitive::decode_i32(input)?;
	if size < 0 {
		return Err(NomErr::Error(Error::InvalidBundle(format!("bundle element has negative size {size}"))));
	}
	let size = size as usize;
	if input.len() < size {
		return Err(NomErr::Error(Error::InvalidBundle("bundle shorter than its declared element size".into())));
	}
	let (element_bytes, input) = input.split_at(size);

	let (_, element) = decode_packet(element_bytes, origin)?;

	if let Packet::Bundle(ref nested) = element {
		if nested.time_tag < enclosing_time_tag {
			return Err(NomErr::Error(Error::InvalidBundle(format!(
				"nested bundle timetag {:?} precedes enclosing bundle timetag {enclosing_time_tag:?}",
				nested.time_tag
			))));
		}
	}

	Ok((input, element))
}

/// Validates a registered method address is free of wildcards;
/// re-exported here for callers that only need packet-layer validation
/// without pulling in the full dispatcher.
pub fn validate_method_address(address: &str) -> Result<()> {
	validate_address(address)
}

#[cfg(test)]
mod tests {
	use super::*;

	// Literal test vector for the OSC 1.1 binary wire format.
	#[test]
	fn literal_wire_test_vector() {
		let message = Message::new("/i/T/f/F", vec![Argument::Int32(1), Argument::True, Argument::Float32(2.0), Argument::False]);
		let bytes = encode(&Packet::Message(message)).unwrap();

		let expected: Vec<u8> = vec![
			0x2F, 0x69, 0x2F, 0x54, 0x2F, 0x66, 0x2F, 0x46, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x69, 0x54, 0x66, 0x46, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
			0x40, 0x00, 0x00, 0x00,
		];
		assert_eq!(bytes, expected);
		assert_eq!(bytes.len(), 28);
		assert_eq!(bytes.len() % 4, 0);
	}

	#[test]
	fn message_round_trips() {
		let message = Message::new("/foo/bar", vec![Argument::Int32(-5), Argument::String("hi".into()), Argument::Blob(vec![1, 2, 3, 4, 5])]);
		let packet = Packet::Message(message.clone());
		let bytes = encode(&packet).unwrap();
		assert_eq!(bytes.len() % 4, 0);

		let decoded = decode(&bytes).unwrap();
		assert_eq!(decoded, packet);
	}

	#[test]
	fn empty_argument_list_round_trips() {
		let message = Message::new("/ping", vec![]);
		let bytes = encode(&Packet::Message(message.clone())).unwrap();
		let decoded = decode(&bytes).unwrap();
		assert_eq!(decoded, Packet::Message(message));
	}

	#[test]
	fn bundle_round_trips() {
		let inner = Message::new("/a", vec![Argument::Int32(1)]);
		let bundle = Bundle::new(TimeTag::new(100, 0), vec![Packet::Message(inner)]);
		let bytes = encode(&Packet::Bundle(bundle.clone())).unwrap();
		assert_eq!(bytes.len() % 4, 0);

		let decoded = decode(&bytes).unwrap();
		assert_eq!(decoded, Packet::Bundle(bundle));
	}

	// A nested bundle with an earlier timetag than its parent fails to decode.
	#[test]
	fn bundle_monotonicity_violation_fails_to_decode() {
		let outer_time = TimeTag::new(100, 0);
		let inner_time = TimeTag::new(50, 0);

		// Hand-construct the bytes so we bypass the encoder's own check
		// and can exercise decode-time validation in isolation.
		let mut inner_bytes = Vec::new();
		encode_bundle(&Bundle::new(inner_time, vec![]), &mut inner_bytes).unwrap();

		let mut out = Vec::new();
		primitive::encode_string("#bundle", &mut out);
		primitive::encode_timetag(outer_time.seconds, outer_time.picoseconds, &mut out);
		out.extend_from_slice(&(inner_bytes.len() as i32).to_be_bytes());
		out.extend_from_slice(&inner_bytes);

		let err = decode(&out).unwrap_err();
		match err {
			Error::InvalidBundle(_) => {}
			other => panic!("expected InvalidBundle, got {other:?}")
		}
	}

	#[test]
	fn encode_rejects_encode_time_monotonicity_violation() {
		let outer = Bundle::new(TimeTag::new(100, 0), vec![Packet::Bundle(Bundle::new(TimeTag::new(50, 0), vec![]))]);
		let err = encode(&Packet::Bundle(outer)).unwrap_err();
		match err {
			Error::InvalidBundle(_) => {}
			other => panic!("expected InvalidBundle, got {other:?}")
		}
	}

	#[test]
	fn encode_rejects_address_not_starting_with_slash() {
		let message = Message::new("foo/bar", vec![Argument::Int32(1)]);
		let err = encode(&Packet::Message(message)).unwrap_err();
		match err {
			Error::InvalidMessage(_) => {}
			other => panic!("expected InvalidMessage, got {other:?}")
		}
	}

	#[test]
	fn invalid_leading_byte_is_invalid_packet() {
		let err = decode(b"xyz").unwrap_err();
		matches!(err, Error::InvalidPacket(_));
	}

	#[test]
	fn empty_buffer_is_invalid_packet() {
		assert!(decode(&[]).is_err());
	}
}
