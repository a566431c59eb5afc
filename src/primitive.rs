//! Big-endian primitive (de)serialization shared by the argument and
//! packet codecs, per the [OSC 1.1 specification](http://opensoundcontrol.org/spec-1_0).
//!
//! Every variable-length field — strings and blobs — is padded with zero
//! bytes out to the next 4-byte boundary. [`pad`] is the single source of
//! truth for that rule; every other function in this module and in
//! [`crate::packet`] computes padding through it rather than re-deriving
//! the `(4 - n % 4) % 4` arithmetic inline.

use nom::{
	Offset,
	bytes::complete::{take, take_till},
	combinator::map_res,
	number::complete::{be_f32, be_i32, be_u32},
	sequence::terminated
};

use crate::error::Error;

/// Returns `n` rounded up to the next multiple of 4.
pub fn pad(n: usize) -> usize {
	n + (4 - n % 4) % 4
}

/// Appends `value` to `out` as 4 big-endian bytes.
pub fn encode_i32(value: i32, out: &mut Vec<u8>) {
	out.extend_from_slice(&value.to_be_bytes());
}

/// Appends `value` to `out` as 4 big-endian bytes.
pub fn encode_f32(value: f32, out: &mut Vec<u8>) {
	out.extend_from_slice(&value.to_be_bytes());
}

/// Appends `s` to `out` as UTF-8 bytes, a trailing NUL, and zero padding
/// out to the next 4-byte boundary.
pub fn encode_string(s: &str, out: &mut Vec<u8>) {
	let padded_len = pad(s.len() + 1);
	out.extend_from_slice(s.as_bytes());
	out.resize(out.len() + (padded_len - s.len()), 0);
}

/// Appends `blob` to `out` as a big-endian int32 length followed by the
/// bytes themselves and zero padding out to the next 4-byte boundary.
///
/// The OSC spec reserves this length as a signed 32-bit integer; blobs
/// longer than `i32::MAX` cannot be represented and are rejected here
/// rather than silently wrapping.
pub fn encode_blob(blob: &[u8], out: &mut Vec<u8>) -> crate::error::Result<()> {
	let len = i32::try_from(blob.len()).map_err(|_| Error::InvalidMessage("blob exceeds i32::MAX bytes".into()))?;
	out.extend_from_slice(&len.to_be_bytes());
	out.extend_from_slice(blob);
	let padding = pad(blob.len()) - blob.len();
	out.resize(out.len() + padding, 0);
	Ok(())
}

/// Appends a big-endian timetag (seconds, picoseconds) to `out`.
pub fn encode_timetag(seconds: u32, picoseconds: u32, out: &mut Vec<u8>) {
	out.extend_from_slice(&seconds.to_be_bytes());
	out.extend_from_slice(&picoseconds.to_be_bytes());
}

/// Decodes a big-endian `i32`.
pub fn decode_i32(input: &[u8]) -> nom::IResult<&[u8], i32, Error> {
	be_i32(input)
}

/// Decodes a big-endian `f32`.
pub fn decode_f32(input: &[u8]) -> nom::IResult<&[u8], f32, Error> {
	be_f32(input)
}

/// Decodes a big-endian `(u32, u32)` timetag pair.
pub fn decode_timetag(input: &[u8]) -> nom::IResult<&[u8], (u32, u32), Error> {
	let (input, seconds) = be_u32(input)?;
	let (input, picoseconds) = be_u32(input)?;
	Ok((input, (seconds, picoseconds)))
}

/// Decodes a NUL-terminated UTF-8 string, then consumes zero padding up to
/// the next 4-byte boundary measured from `origin` (the start of the
/// enclosing packet, since padding is relative to the packet start, not
/// the string start).
pub fn decode_string<'a>(input: &'a [u8], origin: &'a [u8]) -> nom::IResult<&'a [u8], String, Error> {
	map_res(terminated(terminated(take_till(|c| c == 0u8), take(1usize)), pad_to_boundary(origin)), |bytes: &'a [u8]| {
		String::from_utf8(bytes.to_vec()).map_err(Error::StringEncodingFailure)
	})(input)
}

/// Decodes a length-prefixed blob, then consumes zero padding up to the
/// next 4-byte boundary measured from `origin`.
///
/// A blob with a negative length prefix is an `InvalidMessage` error.
pub fn decode_blob<'a>(input: &'a [u8], origin: &'a [u8]) -> nom::IResult<&'a [u8], Vec<u8>, Error> {
	let (input, len) = be_i32(input)?;
	if len < 0 {
		return Err(nom::Err::Error(Error::InvalidMessage(format!("blob has negative length {len}"))));
	}
	let (input, bytes) = terminated(take(len as usize), pad_to_boundary(origin))(input)?;
	Ok((input, bytes.to_vec()))
}

/// Consumes the zero-padding bytes needed to bring `origin.offset(input)`
/// up to the next multiple of 4.
fn pad_to_boundary<'a>(origin: &'a [u8]) -> impl Fn(&'a [u8]) -> nom::IResult<&'a [u8], (), Error> {
	move |input| {
		let consumed = origin.offset(input);
		let padding = pad(consumed) - consumed;
		let (input, _) = take(padding)(input)?;
		Ok((input, ()))
	}
}
