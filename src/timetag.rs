//! OSC time tags: a 64-bit [NTP](https://www.rfc-editor.org/rfc/rfc5905)-epoch
//! timestamp, ordered by absolute instant, with a reserved "immediate"
//! value.
//!
//! Grounded on the teacher's `OSCTime`, renamed to match this crate's
//! field names and extended with the "immediate" helper the teacher's
//! VMC use case never needed.

use std::{
	convert::TryFrom,
	fmt,
	time::{Duration, SystemTime, UNIX_EPOCH}
};

/// A 64-bit NTP-epoch timestamp: `seconds` since midnight 1 Jan 1900 UTC,
/// plus `picoseconds` — despite the name, this is the raw 32-bit NTP
/// fractional-second field, named for its nominal resolution
/// (2^-32 s ≈ 233 picoseconds).
///
/// The reserved value `(0, 1)` means "execute immediately"
/// ([`TimeTag::IMMEDIATE`]); every other `(0, p)` is a normal timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeTag {
	pub seconds: u32,
	pub picoseconds: u32
}

impl TimeTag {
	/// The reserved "execute immediately" value.
	pub const IMMEDIATE: TimeTag = TimeTag { seconds: 0, picoseconds: 1 };

	const UNIX_OFFSET: u64 = 2_208_988_800; // RFC 5905, NTP epoch -> Unix epoch
	const TWO_POW_32: f64 = (u32::MAX as f64) + 1.0;
	const NANOS_PER_SECOND: f64 = 1.0e9;

	pub const fn new(seconds: u32, picoseconds: u32) -> Self {
		TimeTag { seconds, picoseconds }
	}

	/// `true` iff this is the reserved "execute immediately" value.
	pub fn is_immediate(&self) -> bool {
		*self == Self::IMMEDIATE
	}

	/// The absolute instant this timetag denotes, as a real-valued second
	/// count since the OSC epoch: `seconds + picoseconds / 2^32`.
	pub fn as_seconds_f64(&self) -> f64 {
		self.seconds as f64 + self.picoseconds as f64 / Self::TWO_POW_32
	}
}

impl Ord for TimeTag {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		(self.seconds, self.picoseconds).cmp(&(other.seconds, other.picoseconds))
	}
}

impl PartialOrd for TimeTag {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl From<(u32, u32)> for TimeTag {
	fn from((seconds, picoseconds): (u32, u32)) -> Self {
		TimeTag { seconds, picoseconds }
	}
}

impl From<TimeTag> for (u32, u32) {
	fn from(t: TimeTag) -> (u32, u32) {
		(t.seconds, t.picoseconds)
	}
}

impl TryFrom<SystemTime> for TimeTag {
	type Error = TimeTagError;

	fn try_from(time: SystemTime) -> Result<TimeTag, TimeTagError> {
		let since_epoch = time.duration_since(UNIX_EPOCH).map_err(|_| TimeTagError(TimeTagErrorKind::BeforeEpoch))? + Duration::new(Self::UNIX_OFFSET, 0);
		let seconds = u32::try_from(since_epoch.as_secs()).map_err(|_| TimeTagError(TimeTagErrorKind::Overflow))?;
		let nanos = since_epoch.subsec_nanos() as f64;
		let picoseconds = (nanos / Self::NANOS_PER_SECOND * Self::TWO_POW_32).round() as u32;
		Ok(TimeTag { seconds, picoseconds })
	}
}

impl From<TimeTag> for SystemTime {
	fn from(time: TimeTag) -> SystemTime {
		let nanos = time.picoseconds as f64 / TimeTag::TWO_POW_32 * TimeTag::NANOS_PER_SECOND;
		let since_osc_epoch = Duration::new(time.seconds as u64, nanos.round() as u32);
		let since_unix_epoch = since_osc_epoch - Duration::new(TimeTag::UNIX_OFFSET, 0);
		UNIX_EPOCH + since_unix_epoch
	}
}

/// An error returned by conversions involving [`TimeTag`].
#[derive(Debug)]
pub struct TimeTagError(TimeTagErrorKind);

#[derive(Debug)]
enum TimeTagErrorKind {
	BeforeEpoch,
	Overflow
}

impl fmt::Display for TimeTagError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self.0 {
			TimeTagErrorKind::BeforeEpoch => write!(f, "time is before the unix epoch and cannot be stored"),
			TimeTagErrorKind::Overflow => write!(f, "time overflows what a time tag can store")
		}
	}
}

impl std::error::Error for TimeTagError {}
