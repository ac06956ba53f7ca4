//! Redacting wrapper for OAuth token and consumer secrets.

// self
use crate::_prelude::*;

/// Secret string that never prints its value through `Debug` or `Display`.
///
/// Used for Evernote access tokens, request-token secrets, and consumer secrets alike.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the wrapped value is empty (Evernote issues empty access-token
	/// secrets).
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("S=s1:U=1234:E=15e1d8e3c4f:C=15c1d8e3c4f:P=185:A=lti");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn serializes_as_plain_string() {
		let json = serde_json::to_string(&TokenSecret::new("abc"))
			.expect("Secrets should serialize for persistent stores.");

		assert_eq!(json, "\"abc\"");
	}
}
