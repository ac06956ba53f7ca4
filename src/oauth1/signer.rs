//! Outbound request signing for calls this tool makes as an OAuth 1.0a consumer.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::ConsumerCredentials,
	oauth1::{self, SignatureMethod},
};

const NONCE_LEN: usize = 32;

/// Signs requests on behalf of a consumer, optionally with a (request or access) token.
#[derive(Clone, Copy, Debug)]
pub struct RequestSigner<'a> {
	consumer: &'a ConsumerCredentials,
	token: Option<(&'a str, &'a str)>,
	method: SignatureMethod,
}
impl<'a> RequestSigner<'a> {
	/// Creates a signer that uses `HMAC-SHA1` and no token.
	pub fn new(consumer: &'a ConsumerCredentials) -> Self {
		Self { consumer, token: None, method: SignatureMethod::HmacSha1 }
	}

	/// Attaches a token and its secret.
	pub fn with_token(mut self, token: &'a str, secret: &'a str) -> Self {
		self.token = Some((token, secret));

		self
	}

	/// Overrides the signature method.
	pub fn with_method(mut self, method: SignatureMethod) -> Self {
		self.method = method;

		self
	}

	/// Produces the `Authorization` header value for a request at the current instant.
	///
	/// `extra` carries additional protocol parameters (`oauth_callback`, `oauth_verifier`)
	/// and `body` any form parameters that will be sent alongside.
	pub fn authorization(
		&self,
		http_method: &str,
		url: &Url,
		extra: &[(&str, &str)],
		body: &[(String, String)],
	) -> String {
		self.authorization_at(
			http_method,
			url,
			extra,
			body,
			&random_nonce(),
			OffsetDateTime::now_utc().unix_timestamp(),
		)
	}

	/// Deterministic variant of [`RequestSigner::authorization`].
	pub fn authorization_at(
		&self,
		http_method: &str,
		url: &Url,
		extra: &[(&str, &str)],
		body: &[(String, String)],
		nonce: &str,
		timestamp: i64,
	) -> String {
		let mut protocol: Vec<(String, String)> = vec![
			("oauth_consumer_key".into(), self.consumer.key.clone()),
			("oauth_nonce".into(), nonce.to_owned()),
			("oauth_signature_method".into(), self.method.as_str().into()),
			("oauth_timestamp".into(), timestamp.to_string()),
			("oauth_version".into(), "1.0".into()),
		];

		if let Some((token, _)) = self.token {
			protocol.push(("oauth_token".into(), token.to_owned()));
		}

		protocol.extend(extra.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())));

		let mut signed = protocol.clone();

		signed.extend(body.iter().cloned());

		let signature = oauth1::sign(
			self.method,
			http_method,
			url,
			&signed,
			self.consumer.secret.expose(),
			self.token.map(|(_, secret)| secret),
		);

		protocol.push((oauth1::SIGNATURE_PARAM.into(), signature));

		oauth1::authorization_header(&protocol)
	}
}

/// Generates a random alphanumeric nonce.
pub fn random_nonce() -> String {
	rand::rng().sample_iter(Alphanumeric).take(NONCE_LEN).map(char::from).collect()
}
