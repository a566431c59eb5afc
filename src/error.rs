use std::string::FromUtf8Error;

use nom::error::{ErrorKind, FromExternalError, ParseError};

/// The closed error taxonomy for the core. Every failure mode of the
/// codec, matcher, dispatcher, and SLIP framer is one of these variants;
/// nothing in this crate panics on malformed input.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// A Rust string could not be encoded because it was not valid UTF-8.
	#[error("string is not valid UTF-8: {0}")]
	StringEncodingFailure(#[source] FromUtf8Error),

	/// A type-tag string was empty or contained a character outside
	/// `{i,f,s,b,t,T,F,N,I}`.
	#[error("invalid argument list: {0}")]
	InvalidArgumentList(String),

	/// A message was malformed: truncated buffer, an address not starting
	/// with `/`, a type-tag string not starting with `,`, or similar.
	#[error("invalid message: {0}")]
	InvalidMessage(String),

	/// A bundle was malformed: the `#bundle\0` marker was missing, an
	/// element was truncated, or a nested timetag preceded its parent's.
	#[error("invalid bundle: {0}")]
	InvalidBundle(String),

	/// The leading byte of a packet was neither `/` nor `#`, or the buffer
	/// was empty.
	#[error("invalid packet: {0}")]
	InvalidPacket(String),

	/// A method was registered with an address containing a reserved
	/// character, or one not starting with `/`.
	#[error("invalid address: {0}")]
	InvalidAddress(String),

	/// SLIP decoding encountered a dangling `ESC` byte or an illegal
	/// follow-byte after `ESC`.
	#[error("SLIP decoding failed: {0}")]
	DecodingFailure(String),

	/// SLIP encoding failed. Unreachable for well-formed input since every
	/// byte value is encodable, but kept in the taxonomy for symmetry
	/// with [`Error::DecodingFailure`].
	#[error("SLIP encoding failed: {0}")]
	EncodingFailure(String)
}

impl<I> ParseError<I> for Error {
	fn from_error_kind(_input: I, kind: ErrorKind) -> Self {
		Self::InvalidMessage(format!("parser error: {kind:?}"))
	}

	fn append(_input: I, _kind: ErrorKind, other: Self) -> Self {
		other
	}

	fn from_char(_input: I, c: char) -> Self {
		Self::InvalidMessage(format!("unexpected character: {c:?}"))
	}

	fn or(self, _other: Self) -> Self {
		self
	}
}

impl<I> FromExternalError<I, Error> for Error {
	fn from_external_error(_input: I, _kind: ErrorKind, e: Error) -> Self {
		e
	}
}

/// Alias for `Result<T, Error>`, mirroring the rest of the pack's
/// `XResult` convention.
pub type Result<T> = std::result::Result<T, Error>;
