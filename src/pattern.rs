//! The OSC address pattern matcher: wildcard-with-XPath-recursion
//! matching of a message pattern against a fully qualified method
//! address, per the pattern-matching rules of the
//! [OSC 1.1 specification](http://opensoundcontrol.org/spec-1_0).
//!
//! There is no teacher precedent for this module (`pykeio-vmc` only ever
//! does a plain [`str::starts_with`] prefix check); it populates the
//! `BadAddressPattern`/`BadAddress` error variants the teacher's
//! `osc/error.rs` left dormant.

use crate::error::{Error, Result};

const RESERVED: &[char] = &[' ', '#', ',', '?', '*', '[', ']', '{', '}'];

/// The outcome of matching a message pattern against a method address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
	/// The pattern does not select this address at all.
	None,
	/// The pattern is a strict prefix ending at a segment boundary — it
	/// selects this address's container, not the address itself.
	Container,
	/// The pattern matches the address exactly.
	Full
}

impl MatchKind {
	/// `true` for [`MatchKind::Full`] or [`MatchKind::Container`] — the
	/// two outcomes that should invoke a method's handler.
	pub fn is_match(&self) -> bool {
		!matches!(self, MatchKind::None)
	}
}

/// Validates a fully qualified method address: must start
/// with `/` and must not contain any reserved character
/// (`{' ', '#', ',', '?', '*', '[', ']', '{', '}'}`).
pub fn validate_address(address: &str) -> Result<()> {
	if !address.starts_with('/') {
		return Err(Error::InvalidAddress(format!("address {address:?} does not start with '/'")));
	}
	if let Some(c) = address.chars().find(|c| RESERVED.contains(c)) {
		return Err(Error::InvalidAddress(format!("address {address:?} contains reserved character {c:?}")));
	}
	Ok(())
}

/// Classifies the match between message pattern `pattern` and fully
/// qualified method address `address`.
///
/// Both strings are expected to start with `/`; this is not re-validated
/// here since callers (the address space) already validate registered
/// addresses, and patterns are allowed to carry wildcards which
/// [`validate_address`] would reject.
pub fn match_pattern(pattern: &str, address: &str) -> MatchKind {
	let p: Vec<char> = pattern.chars().collect();
	let a: Vec<char> = address.chars().collect();
	walk(&p, &a)
}

/// Walks pattern chars `p` against address chars `a` from the start,
/// returning the classification once both are exhausted (or one is).
fn walk(p: &[char], a: &[char]) -> MatchKind {
	match match_segment(p, 0, a, 0) {
		Some((pi, ai)) => classify(p, pi, a, ai),
		None => MatchKind::None
	}
}

/// Classifies a position where the linear/recursive matcher stopped
/// advancing: `pi`/`ai` are the indices into `p`/`a` where matching ended.
fn classify(p: &[char], pi: usize, a: &[char], ai: usize) -> MatchKind {
	let p_done = pi >= p.len();
	let a_done = ai >= a.len();

	if p_done && a_done {
		return MatchKind::Full;
	}
	if a_done {
		// address exhausted but pattern is not: no match, unless the
		// remaining pattern is just a trailing '/' is not possible here
		// since a_done means address ran out entirely.
		return MatchKind::None;
	}
	if p_done {
		// pattern exhausted; a container match iff we stopped exactly at
		// a segment boundary in the address.
		if a[ai] == '/' || (ai > 0 && a[ai - 1] == '/') {
			return MatchKind::Container;
		}
		return MatchKind::None;
	}
	MatchKind::None
}

/// Attempts to match the remainder of `p` (from `pi`) against the
/// remainder of `a` (from `ai`). Returns the `(pi, ai)` positions where
/// matching stopped, to be classified by [`classify`], or `None` if a
/// literal/operator mismatch makes this path dead.
///
/// This linear walk handles everything except `//`, which is the only
/// construct requiring recursion: it tries matching the remainder of
/// the pattern from every subsequent segment start in the address and
/// keeps the best result.
fn match_segment(p: &[char], mut pi: usize, a: &[char], mut ai: usize) -> Option<(usize, usize)> {
	loop {
		if pi >= p.len() {
			return Some((pi, ai));
		}

		// '//' : XPath descendant wildcard.
		if p[pi] == '/' && p.get(pi + 1) == Some(&'/') {
			return match_descendant(p, pi + 2, a, ai);
		}

		if ai >= a.len() {
			// pattern not exhausted but address is: a trailing run of '*'
			// still matches (it can consume zero characters), so skip past
			// it; anything else left in the pattern is unmatchable and we
			// stop here, letting `classify` decide (a trailing '/' can
			// still resolve to Container).
			while p.get(pi) == Some(&'*') {
				pi += 1;
			}
			return Some((pi, ai));
		}

		match p[pi] {
			'?' => {
				if a[ai] == '/' {
					return None;
				}
				pi += 1;
				ai += 1;
			}
			'*' => {
				let (new_pi, new_ai) = match_star(p, pi, a, ai)?;
				pi = new_pi;
				ai = new_ai;
			}
			'[' => {
				let (new_pi, new_ai) = match_bracket(p, pi, a, ai)?;
				pi = new_pi;
				ai = new_ai;
			}
			'{' => {
				let (brace_end, consumed) = match_brace_alternatives(p, pi, a, ai)?;
				pi = brace_end;
				ai += consumed;
			}
			c => {
				if a[ai] != c {
					return None;
				}
				pi += 1;
				ai += 1;
			}
		}
	}
}

/// Matches `*` greedily within the current segment, stopping one
/// character before the next pattern character if that character appears
/// in the address (a one-character lookahead tie-break). `*` never
/// crosses a `/`.
fn match_star(p: &[char], pi: usize, a: &[char], ai: usize) -> Option<(usize, usize)> {
	debug_assert_eq!(p[pi], '*');
	let next_pi = pi + 1;

	// Find the end of the current address segment; '*' may consume up to
	// (but not past) it.
	let seg_end = a[ai..].iter().position(|&c| c == '/').map(|rel| ai + rel).unwrap_or(a.len());

	let next_pat_char = p.get(next_pi).copied();
	match next_pat_char {
		None | Some('/') => {
			// '*' is the last thing in this segment: consume the rest of
			// the segment.
			Some((next_pi, seg_end))
		}
		Some(next_char) if !matches!(next_char, '?' | '*' | '[' | '{') => {
			// Greedy scan backward from the segment end for the first
			// occurrence of `next_char`, per the "stop one character
			// before the next literal pattern character" rule. Scanning
			// from the end (rather than the first occurrence from `ai`)
			// keeps `*` maximal while still leaving `next_char` available
			// to match.
			let mut cursor = seg_end;
			while cursor > ai {
				if a[cursor - 1] == next_char {
					return Some((next_pi, cursor - 1));
				}
				cursor -= 1;
			}
			None
		}
		_ => {
			// Next pattern token is itself an operator; fall back to
			// trying every split point greedily from the widest match
			// down, short-circuiting on the first that lets the rest of
			// the pattern match.
			for split in (ai..=seg_end).rev() {
				if match_segment(p, next_pi, a, split).is_some() {
					return Some((next_pi, split));
				}
			}
			None
		}
	}
}

/// Tests whether `c` belongs to the `[set]` body described by `body`
/// (already stripped of brackets), honoring a leading `!` negation and
/// `a-z`-style ranges.
fn bracket_member(body: &[char], c: char) -> bool {
	let mut member = false;
	let mut i = 0;
	while i < body.len() {
		if i + 2 < body.len() && body[i + 1] == '-' {
			let (lo, hi) = (body[i], body[i + 2]);
			if lo <= hi && (lo..=hi).contains(&c) {
				member = true;
			}
			i += 3;
		} else {
			if body[i] == c {
				member = true;
			}
			i += 1;
		}
	}
	member
}

/// Matches a `[set]` construct at `p[pi] == '['` against a run of one or
/// more consecutive address characters starting at `a[ai]` (e.g.
/// `[a-z0-9]` against `foo123` must consume the entire run of matching
/// digits, not a single character — this generalizes the single-character
/// set test to a maximal run, with the same one-character lookahead
/// tie-break [`match_star`] uses).
///
/// A set must not cross a segment boundary; a leading `!` inverts it;
/// `a-z` ranges expand inclusively; a dash at the first or last position,
/// or an empty set, is malformed and never matches. At least one address
/// character must belong to the set.
fn match_bracket(p: &[char], pi: usize, a: &[char], ai: usize) -> Option<(usize, usize)> {
	debug_assert_eq!(p[pi], '[');
	let close = p[pi..].iter().position(|&ch| ch == ']').map(|rel| pi + rel)?;
	let body: &[char] = &p[pi + 1..close];

	if body.contains(&'/') {
		return None; // crosses a segment boundary
	}
	if body.is_empty() {
		return None;
	}

	let (negate, body) = if body[0] == '!' { (true, &body[1..]) } else { (false, body) };
	if body.is_empty() {
		return None;
	}
	if body[0] == '-' || body[body.len() - 1] == '-' {
		return None; // malformed: dash at an edge
	}

	let seg_end = a[ai..].iter().position(|&c| c == '/').map(|rel| ai + rel).unwrap_or(a.len());

	let mut run_end = ai;
	while run_end < seg_end && (bracket_member(body, a[run_end]) != negate) {
		run_end += 1;
	}
	if run_end == ai {
		return None; // must match at least one character
	}

	let next_pi = close + 1;
	match p.get(next_pi).copied() {
		None | Some('/') => Some((next_pi, run_end)),
		Some(next_char) if !matches!(next_char, '?' | '*' | '[' | '{') => {
			let mut cursor = run_end;
			while cursor > ai {
				if a[cursor - 1] == next_char {
					return Some((next_pi, cursor - 1));
				}
				cursor -= 1;
			}
			// `next_char` never recurs inside the run: the run's natural
			// end is already the boundary the literal must match against.
			Some((next_pi, run_end))
		}
		_ => {
			for split in (ai + 1..=run_end).rev() {
				if match_segment(p, next_pi, a, split).is_some() {
					return Some((next_pi, split));
				}
			}
			None
		}
	}
}

/// Matches a `{a,b,...}` construct at `p[pi] == '{'` against the address
/// starting at `a[ai]`. Prefers the *longest* matching alternative, not
/// the first in source order. Returns `(index just past '}', characters
/// consumed from the address)`.
fn match_brace_alternatives(p: &[char], pi: usize, a: &[char], ai: usize) -> Option<(usize, usize)> {
	debug_assert_eq!(p[pi], '{');
	let close = p[pi..].iter().position(|&ch| ch == '}').map(|rel| pi + rel)?;
	let body: &[char] = &p[pi + 1..close];
	if body.contains(&'/') {
		return None; // alternatives may not cross a segment boundary
	}

	let alternatives: Vec<&[char]> = body.split(|&c| c == ',').collect();

	let mut best: Option<usize> = None;
	for alt in &alternatives {
		if alt.len() > a.len() - ai {
			continue;
		}
		if &a[ai..ai + alt.len()] == *alt {
			best = Some(best.map_or(alt.len(), |b: usize| b.max(alt.len())));
		}
	}

	best.map(|len| (close + 1, len))
}

/// Implements the `//` XPath descendant wildcard: try matching the
/// remainder of the pattern (from `pi`, just past `//`)
/// against the remainder of the address starting at every segment start
/// from `ai` onward, and take the best (highest-classifying) result.
fn match_descendant(p: &[char], pi: usize, a: &[char], ai: usize) -> Option<(usize, usize)> {
	let mut candidates: Vec<usize> = vec![ai];
	for i in ai..a.len() {
		if a[i] == '/' {
			candidates.push(i + 1);
		}
	}

	let mut best: Option<(usize, usize, MatchKind)> = None;
	for start in candidates {
		if let Some((stop_pi, stop_ai)) = match_segment(p, pi, a, start) {
			let kind = classify(p, stop_pi, a, stop_ai);
			if kind == MatchKind::Full {
				return Some((stop_pi, stop_ai));
			}
			if kind == MatchKind::Container && best.map(|(_, _, k)| k) != Some(MatchKind::Full) {
				best = Some((stop_pi, stop_ai, kind));
			}
		}
	}

	best.map(|(pi, ai, _)| (pi, ai))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn validates_address_requires_leading_slash() {
		assert!(validate_address("/foo/bar").is_ok());
		assert!(validate_address("foo/bar").is_err());
	}

	#[test]
	fn validates_address_rejects_reserved_characters() {
		for bad in ["/foo bar", "/foo#bar", "/foo,bar", "/foo?bar", "/foo*bar", "/foo[bar", "/foo]bar", "/foo{bar", "/foo}bar"] {
			assert!(validate_address(bad).is_err(), "{bad} should be invalid");
		}
	}

	#[test]
	fn wildcard_truth_table() {
		let cases: &[(&str, &str, MatchKind)] = &[
			("/foobar/fo?/bar", "/foobar/foo/bar", MatchKind::Full),
			("/foobar/foo?/bar", "/foobar/foo/bar", MatchKind::None),
			("/foobar/fo?", "/foobar/foo/bar", MatchKind::Container),
			("/foobar/foo/bar?", "/foobar/foo/bar", MatchKind::None),
			("/foobar/fo*/b*r", "/foobar/fooo/bar", MatchKind::Full),
			("/foobar/foo[a-z0-9]/ba[a-z]", "/foobar/foo123/bar", MatchKind::Full),
			("/foobar/{foo,foo1}/bar", "/foobar/foo1/bar", MatchKind::Full),
			("//foo[0-9]/b?r*", "/foobar/foo1/bar", MatchKind::Full),
			("//bar1", "/foobar/foo1/bar", MatchKind::None)
		];

		for (pattern, address, expected) in cases {
			assert_eq!(match_pattern(pattern, address), *expected, "pattern={pattern:?} address={address:?}");
		}
	}

	#[test]
	fn exact_match_is_full() {
		assert_eq!(match_pattern("/foo/bar", "/foo/bar"), MatchKind::Full);
	}

	#[test]
	fn unrelated_addresses_do_not_match() {
		assert_eq!(match_pattern("/foo/bar", "/foo/baz"), MatchKind::None);
	}

	#[test]
	fn brace_prefers_longest_alternative() {
		// "{foo,foobar}" against "/foobar" should select "foobar", not "foo".
		assert_eq!(match_pattern("/{foo,foobar}", "/foobar"), MatchKind::Full);
		assert_eq!(match_pattern("/{foo,foobar}", "/foo"), MatchKind::Full);
	}

	#[test]
	fn question_mark_never_matches_delimiter_or_end() {
		assert_eq!(match_pattern("/foo?", "/foo"), MatchKind::None);
		assert_eq!(match_pattern("/fo?/bar", "/fo/bar"), MatchKind::None);
	}

	#[test]
	fn bracket_set_malformed_edge_dash_never_matches() {
		assert_eq!(match_pattern("/foo[-az]", "/fooa"), MatchKind::None);
		assert_eq!(match_pattern("/foo[az-]", "/fooa"), MatchKind::None);
	}

	#[test]
	fn bracket_set_empty_never_matches() {
		assert_eq!(match_pattern("/foo[]", "/foox"), MatchKind::None);
	}

	#[test]
	fn bracket_set_negation() {
		assert_eq!(match_pattern("/foo[!0-9]", "/fooa"), MatchKind::Full);
		assert_eq!(match_pattern("/foo[!0-9]", "/foo5"), MatchKind::None);
	}

	#[test]
	fn descendant_wildcard_at_start() {
		assert_eq!(match_pattern("//bar", "/foo/bar"), MatchKind::Full);
		assert_eq!(match_pattern("//bar", "/foo/baz"), MatchKind::None);
	}

	#[test]
	fn container_match_requires_segment_boundary() {
		// pattern exhausted exactly at a '/' in the address => Container
		assert_eq!(match_pattern("/foo", "/foo/bar"), MatchKind::Container);
		// pattern exhausted mid-segment => None
		assert_eq!(match_pattern("/fo", "/foo/bar"), MatchKind::None);
	}
}
