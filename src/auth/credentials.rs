//! OAuth 1.0a client credentials issued by Evernote to this tool.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Consumer key/secret pair used to sign requests to the Evernote OAuth endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsumerCredentials {
	/// Public consumer key.
	pub key: String,
	/// Consumer secret; only ever used as HMAC key material.
	pub secret: TokenSecret,
}
impl ConsumerCredentials {
	/// Creates a credential pair.
	pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
		Self { key: key.into(), secret: TokenSecret::new(secret) }
	}
}
