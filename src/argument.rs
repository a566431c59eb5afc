//! The OSC 1.1 argument model: a closed nine-variant tagged union, its
//! type-tag string, and the type-tag pattern matcher used by method
//! dispatch. See the [OSC 1.1 specification](http://opensoundcontrol.org/spec-1_0)
//! for the nine wire tags and their type-tag string grammar.

use crate::error::{Error, Result};

/// A single OSC argument value.
///
/// This is a closed union over the nine OSC 1.1 wire tags
/// (`i f s b t T F N I`). A generic boolean constructor canonicalizes
/// immediately to [`Argument::True`] / [`Argument::False`], so only two
/// boolean representations ever exist once an `Argument` is built.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Argument {
	Int32(i32),
	Float32(f32),
	String(String),
	Blob(Vec<u8>),
	TimeTag(crate::TimeTag),
	True,
	False,
	Null,
	Impulse
}

macro_rules! value_impl {
    ($(($name:ident, $variant:ident, $ty:ty)),*) => {
        $(
        impl Argument {
            #[allow(dead_code)]
            pub fn $name(self) -> Option<$ty> {
                match self {
                    Argument::$variant(v) => Some(v),
                    _ => None
                }
            }
        }
        impl From<$ty> for Argument {
            fn from(v: $ty) -> Self {
                Argument::$variant(v)
            }
        }
        )*
    }
}
value_impl! {
	(int32, Int32, i32),
	(float32, Float32, f32),
	(string, String, String),
	(blob, Blob, Vec<u8>),
	(time_tag, TimeTag, crate::TimeTag)
}

impl From<&str> for Argument {
	fn from(s: &str) -> Self {
		Argument::String(s.to_string())
	}
}

impl From<bool> for Argument {
	/// Canonicalizes to [`Argument::True`] / [`Argument::False`] — a
	/// plain `bool` never becomes a distinct `Boolean` variant, only two
	/// boolean representations exist at the model layer.
	fn from(value: bool) -> Self {
		if value { Argument::True } else { Argument::False }
	}
}

impl Argument {
	/// Builds a boolean argument, canonicalizing to [`Argument::True`] /
	/// [`Argument::False`].
	pub fn boolean(value: bool) -> Self {
		value.into()
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Argument::True => Some(true),
			Argument::False => Some(false),
			_ => None
		}
	}

	/// The wire type tag character for this argument, e.g. `'i'` for
	/// [`Argument::Int32`].
	pub fn tag(&self) -> char {
		match self {
			Argument::Int32(_) => 'i',
			Argument::Float32(_) => 'f',
			Argument::String(_) => 's',
			Argument::Blob(_) => 'b',
			Argument::TimeTag(_) => 't',
			Argument::True => 'T',
			Argument::False => 'F',
			Argument::Null => 'N',
			Argument::Impulse => 'I'
		}
	}

	/// The [`ArgumentTypeTag`] this argument matches, for use with
	/// [`matches`].
	pub fn type_tag(&self) -> ArgumentTypeTag {
		match self {
			Argument::Int32(_) => ArgumentTypeTag::Int32,
			Argument::Float32(_) => ArgumentTypeTag::Float32,
			Argument::String(_) => ArgumentTypeTag::String,
			Argument::Blob(_) => ArgumentTypeTag::Blob,
			Argument::TimeTag(_) => ArgumentTypeTag::TimeTag,
			Argument::True => ArgumentTypeTag::True,
			Argument::False => ArgumentTypeTag::False,
			Argument::Null => ArgumentTypeTag::Null,
			Argument::Impulse => ArgumentTypeTag::Impulse
		}
	}
}

/// A type tag used for pattern matching against a method's
/// `requiredArguments`. Not used on the wire directly — only
/// [`Argument::tag`]'s character is ever serialized.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArgumentTypeTag {
	Int32,
	Float32,
	String,
	Blob,
	TimeTag,
	True,
	False,
	Null,
	Impulse,
	/// Matches any single argument type.
	AnyTag,
	/// Matches `True`, `False`, or `AnyBoolean`.
	AnyBoolean,
	/// Matches `Int32`, `Float32`, or `AnyNumber`.
	AnyNumber,
	/// May only appear in a trailing run of a tag pattern.
	Optional(Box<ArgumentTypeTag>)
}

impl ArgumentTypeTag {
	fn is_optional(&self) -> bool {
		matches!(self, ArgumentTypeTag::Optional(_))
	}

	fn unwrap_optional(&self) -> &ArgumentTypeTag {
		match self {
			ArgumentTypeTag::Optional(inner) => inner,
			other => other
		}
	}

	/// Symmetric elementwise match between two (non-pattern-position)
	/// type tags.
	fn elementwise_matches(a: &ArgumentTypeTag, b: &ArgumentTypeTag) -> bool {
		let a = a.unwrap_optional();
		let b = b.unwrap_optional();
		match (a, b) {
			(ArgumentTypeTag::AnyTag, _) | (_, ArgumentTypeTag::AnyTag) => true,
			(ArgumentTypeTag::AnyBoolean, x) | (x, ArgumentTypeTag::AnyBoolean) => {
				matches!(x, ArgumentTypeTag::True | ArgumentTypeTag::False | ArgumentTypeTag::AnyBoolean)
			}
			(ArgumentTypeTag::AnyNumber, x) | (x, ArgumentTypeTag::AnyNumber) => {
				matches!(x, ArgumentTypeTag::Int32 | ArgumentTypeTag::Float32 | ArgumentTypeTag::AnyNumber)
			}
			(a, b) => a == b
		}
	}

	/// Parses a wire type-tag string (the leading `,` stripped) into the
	/// wire-accurate subset of tags (no synthetic `AnyTag`/`Optional`
	/// variants — those only occur in registered method patterns, never
	/// on the wire).
	pub(crate) fn parse_tag_char(c: char) -> Result<ArgumentTypeTag> {
		Ok(match c {
			'i' => ArgumentTypeTag::Int32,
			'f' => ArgumentTypeTag::Float32,
			's' => ArgumentTypeTag::String,
			'b' => ArgumentTypeTag::Blob,
			't' => ArgumentTypeTag::TimeTag,
			'T' => ArgumentTypeTag::True,
			'F' => ArgumentTypeTag::False,
			'N' => ArgumentTypeTag::Null,
			'I' => ArgumentTypeTag::Impulse,
			other => return Err(Error::InvalidArgumentList(format!("unknown type tag character {other:?}")))
		})
	}
}

/// Parses a type-tag string (e.g. `",iTf"`), stripping the leading `,`,
/// into a sequence of [`ArgumentTypeTag`]s. An empty string (no leading
/// `,`) or an unknown character is an `InvalidArgumentList` error.
pub fn parse_type_tag_string(tag_string: &str) -> Result<Vec<ArgumentTypeTag>> {
	let mut chars = tag_string.chars();
	if chars.next() != Some(',') {
		return Err(Error::InvalidArgumentList(format!("type tag string {tag_string:?} does not start with ','")));
	}
	chars.map(ArgumentTypeTag::parse_tag_char).collect()
}

/// Emits a type-tag string for the given arguments: `,` followed by one
/// character per argument.
pub fn encode_type_tag_string(args: &[Argument]) -> String {
	let mut s = String::with_capacity(args.len() + 1);
	s.push(',');
	for arg in args {
		s.push(arg.tag());
	}
	s
}

/// Implements the type-tag pattern match algorithm used to filter
/// dispatch by a method's required arguments.
///
/// `pattern` is a method's `requiredArguments`; `args` is the type-tag
/// sequence of an incoming message's arguments. Returns `true` iff the
/// message's arguments satisfy the pattern.
pub fn matches(args: &[ArgumentTypeTag], pattern: &[ArgumentTypeTag]) -> bool {
	if pattern.len() < args.len() {
		return false;
	}

	let k = pattern.iter().position(|t| t.is_optional()).unwrap_or(pattern.len());

	// pat[k..] must be exclusively Optional(_).
	if pattern[k..].iter().any(|t| !t.is_optional()) {
		return false;
	}

	// Required prefixes must be length-equal and elementwise-match.
	if args.len() < k {
		return false;
	}
	for i in 0..k {
		if !ArgumentTypeTag::elementwise_matches(&pattern[i], &args[i]) {
			return false;
		}
	}

	// args[k..] must elementwise-match pattern[k..] (possibly shorter).
	for (i, arg) in args.iter().enumerate().skip(k) {
		let pat = &pattern[i];
		if !ArgumentTypeTag::elementwise_matches(pat, arg) {
			return false;
		}
	}

	true
}
