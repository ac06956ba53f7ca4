//! `Authorization: OAuth ...` header encoding and parsing.

// self
use crate::{_prelude::*, oauth1::percent_encode};

const SCHEME: &str = "OAuth";

/// Formats protocol parameters as an `Authorization` header value.
pub fn authorization_header(params: &[(String, String)]) -> String {
	let mut buf = String::from(SCHEME);

	for (idx, (name, value)) in params.iter().enumerate() {
		buf.push_str(if idx == 0 { " " } else { ", " });
		buf.push_str(&percent_encode(name));
		buf.push_str("=\"");
		buf.push_str(&percent_encode(value));
		buf.push('"');
	}

	buf
}

/// Parses an `Authorization` header into decoded protocol parameters.
///
/// Returns `None` when the header does not use the OAuth scheme. The `realm` parameter is
/// dropped because it never participates in the signature.
pub fn parse_authorization_header(value: &str) -> Option<Vec<(String, String)>> {
	let value = value.trim();
	let (scheme, rest) = value.split_at_checked(SCHEME.len())?;

	if !scheme.eq_ignore_ascii_case(SCHEME) {
		return None;
	}
	if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
		return None;
	}

	let mut params = Vec::new();

	for part in rest.split(',') {
		let part = part.trim();

		if part.is_empty() {
			continue;
		}

		let Some((name, raw)) = part.split_once('=') else {
			continue;
		};
		let name = name.trim();

		if name.eq_ignore_ascii_case("realm") {
			continue;
		}

		let raw = raw.trim().trim_matches('"');
		let name = urlencoding::decode(name).ok()?.into_owned();
		let value = urlencoding::decode(raw).ok()?.into_owned();

		params.push((name, value));
	}

	Some(params)
}
