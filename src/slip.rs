//! SLIP ([RFC 1055](https://www.rfc-editor.org/rfc/rfc1055)) byte-stuffed
//! framing for stream transports: single-datagram encode/decode plus a
//! streaming state machine that turns an arbitrary byte stream into a
//! sequence of complete datagrams.
//!
//! There is no SLIP precedent in the teacher crate (`pykeio-vmc` is
//! UDP-only); the streaming half is grounded on `rust-embedded-itm`'s
//! stateful `Decoder`/`Singles` iterator shape (buffer input, yield
//! complete items, retain the remainder) adapted from bit-packet framing
//! to byte-stuffed `END`-delimited framing. The write path's
//! scan-then-copy-prefix discipline mirrors the teacher's
//! `Output::write` zero-copy convention in `osc/encoder.rs`.

use crate::error::{Error, Result};

/// Frame terminator.
pub const END: u8 = 0xC0;
/// Escape byte.
pub const ESC: u8 = 0xDB;
/// Escaped `END`.
pub const ESC_END: u8 = 0xDC;
/// Escaped `ESC`.
pub const ESC_ESC: u8 = 0xDD;

/// SLIP-encodes a single datagram: every `END` byte becomes `ESC,
/// ESC_END`, every `ESC` byte becomes `ESC, ESC_ESC`, and a single
/// trailing `END` terminates the frame.
///
/// Encoding cannot fail for any input — all 256 byte values are
/// encodable — this function's `Result` exists only to keep the
/// taxonomy symmetric with [`decode`] and streaming callers that thread a
/// single error type through.
pub fn encode(datagram: &[u8]) -> Result<Vec<u8>> {
	let mut out = Vec::with_capacity(datagram.len() + 2);
	let mut start = 0;
	for (i, &byte) in datagram.iter().enumerate() {
		match byte {
			END => {
				out.extend_from_slice(&datagram[start..i]);
				out.push(ESC);
				out.push(ESC_END);
				start = i + 1;
			}
			ESC => {
				out.extend_from_slice(&datagram[start..i]);
				out.push(ESC);
				out.push(ESC_ESC);
				start = i + 1;
			}
			_ => {}
		}
	}
	out.extend_from_slice(&datagram[start..]);
	out.push(END);
	Ok(out)
}

/// SLIP-decodes a single framed datagram. If the last byte is `END`, it is
/// dropped. A dangling `ESC` at end-of-input, or an `ESC` followed by
/// anything other than `ESC_END`/`ESC_ESC`, is a [`Error::DecodingFailure`].
pub fn decode(framed: &[u8]) -> Result<Vec<u8>> {
	let framed = match framed.last() {
		Some(&END) => &framed[..framed.len() - 1],
		_ => framed
	};

	let mut out = Vec::with_capacity(framed.len());
	let mut i = 0;
	while i < framed.len() {
		match framed[i] {
			ESC => match framed.get(i + 1) {
				Some(&ESC_END) => {
					out.push(END);
					i += 2;
				}
				Some(&ESC_ESC) => {
					out.push(ESC);
					i += 2;
				}
				Some(&other) => return Err(Error::DecodingFailure(format!("illegal escape follow-byte {other:#x}"))),
				None => return Err(Error::DecodingFailure("dangling ESC at end of input".into()))
			},
			byte => {
				out.push(byte);
				i += 1;
			}
		}
	}
	Ok(out)
}

/// A streaming SLIP framer for stream transports.
///
/// Bytes are pushed in via [`SlipDecoder::push_bytes`] as they arrive;
/// whenever the accumulated buffer contains an `END` byte, the prefix up
/// to and including it is SLIP-decoded as one datagram and returned.
/// Unparsed bytes (including a partial datagram with no `END` yet) are
/// retained across calls.
///
/// This "wait for a complete `END`-delimited frame" policy is deliberate:
/// a malformed escape sequence inside one frame discards only that frame
/// (logged via `log::warn!`) and never desynchronizes the stream, since
/// resynchronization is anchored on the `END` byte rather than
/// byte-by-byte escape tracking.
#[derive(Debug, Default)]
pub struct SlipDecoder {
	buffer: Vec<u8>
}

impl SlipDecoder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Feeds newly received bytes into the framer and returns every
	/// complete datagram they produced, in arrival order. A datagram that
	/// fails to decode (a malformed escape sequence) is dropped and logged
	/// rather than surfaced as an error, so one corrupt frame never stalls
	/// the rest of the stream.
	pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
		self.buffer.extend_from_slice(bytes);

		let mut datagrams = Vec::new();
		while let Some(end_at) = self.buffer.iter().position(|&b| b == END) {
			let frame: Vec<u8> = self.buffer.drain(..=end_at).collect();
			// Leading END bytes between packets are benign per RFC 1055
			// and decode to an empty datagram; skip them without logging.
			if frame.len() == 1 {
				continue;
			}
			match decode(&frame) {
				Ok(datagram) => datagrams.push(datagram),
				Err(e) => log::warn!("discarding malformed SLIP datagram ({e}); stream resynchronizes on the next END byte")
			}
		}
		datagrams
	}

	/// `true` if no partial datagram is buffered.
	pub fn is_idle(&self) -> bool {
		self.buffer.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn encode_vector() {
		let input = [10, 0xC0, 20, 21, 0xDB, 0xDB, 30, 31, 32, 0xC0];
		let expected = [10, 0xDB, 0xDC, 20, 21, 0xDB, 0xDD, 0xDB, 0xDD, 30, 31, 32, 0xDB, 0xDC, 0xC0];
		assert_eq!(encode(&input).unwrap(), expected);
	}

	#[test]
	fn round_trips_with_escapes() {
		let input = [10, 0xC0, 20, 21, 0xDB, 0xDB, 30, 31, 32, 0xC0];
		let encoded = encode(&input).unwrap();
		assert_eq!(decode(&encoded).unwrap(), input);
	}

	#[test]
	fn encoded_output_contains_no_bare_end_except_trailing() {
		for input in [vec![], vec![END], vec![ESC, ESC, END, 1, 2, 3]] {
			let encoded = encode(&input).unwrap();
			assert_eq!(&encoded[encoded.len() - 1..], &[END]);
			assert!(!encoded[..encoded.len() - 1].contains(&END));
		}
	}

	#[test]
	fn decode_rejects_dangling_escape() {
		let err = decode(&[1, 2, ESC]).unwrap_err();
		matches!(err, Error::DecodingFailure(_));
	}

	#[test]
	fn decode_rejects_illegal_follow_byte() {
		let err = decode(&[ESC, 0x01]).unwrap_err();
		matches!(err, Error::DecodingFailure(_));
	}

	#[test]
	fn streaming_framer_yields_one_datagram_per_end() {
		let mut framer = SlipDecoder::new();
		let mut stream = Vec::new();
		stream.extend(encode(b"hello").unwrap());
		stream.extend(encode(b"world").unwrap());

		let datagrams = framer.push_bytes(&stream);
		assert_eq!(datagrams, vec![b"hello".to_vec(), b"world".to_vec()]);
		assert!(framer.is_idle());
	}

	#[test]
	fn streaming_framer_reassembles_datagram_split_mid_escape() {
		let mut framer = SlipDecoder::new();
		let encoded = encode(&[1, ESC, 3]).unwrap();
		// split right inside the two-byte escape sequence produced for `ESC`
		let split_at = encoded.iter().position(|&b| b == ESC).unwrap() + 1;
		let (first, second) = encoded.split_at(split_at);

		assert!(framer.push_bytes(first).is_empty());
		let datagrams = framer.push_bytes(second);
		assert_eq!(datagrams, vec![vec![1, ESC, 3]]);
	}

	#[test]
	fn streaming_framer_discards_only_the_malformed_datagram() {
		let mut framer = SlipDecoder::new();
		let mut stream = vec![ESC, 0x01, END]; // malformed: illegal follow-byte
		stream.extend(encode(b"ok").unwrap());

		let datagrams = framer.push_bytes(&stream);
		assert_eq!(datagrams, vec![b"ok".to_vec()]);
	}

	#[test]
	fn streaming_framer_tolerates_leading_end_bytes() {
		let mut framer = SlipDecoder::new();
		let mut stream = vec![END, END];
		stream.extend(encode(b"ok").unwrap());

		let datagrams = framer.push_bytes(&stream);
		assert_eq!(datagrams, vec![b"ok".to_vec()]);
	}
}
