//! Transport primitives for provider calls.
//!
//! [`ProviderHttpClient`] wraps a shared [`ReqwestClient`] and performs the two kinds of
//! outbound requests the tool makes: OAuth 1.0a token calls (signed POSTs answered with
//! form-encoded bodies) and Thrift note-store RPCs. Every response is returned together with
//! its [`ResponseMetadata`] so callers can classify failures consistently.

// crates.io
use reqwest::{
	header::{AUTHORIZATION, CONTENT_TYPE},
	redirect::Policy,
};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

const THRIFT_CONTENT_TYPE: &str = "application/x-thrift";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Captures metadata from an HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the provider.
	pub status: Option<u16>,
}
impl ResponseMetadata {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		matches!(self.status, Some(200..=299))
	}
}

/// Raw provider response.
#[derive(Clone, Debug)]
pub struct ProviderResponse {
	/// Status and headers worth keeping.
	pub metadata: ResponseMetadata,
	/// Response body.
	pub body: Vec<u8>,
}
impl ProviderResponse {
	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Short body excerpt safe to embed in error messages.
	pub fn preview(&self) -> String {
		let text = self.text();
		let trimmed = text.trim();

		match trimmed.char_indices().nth(200) {
			Some((idx, _)) => format!("{}...", &trimmed[..idx]),
			None => trimmed.to_owned(),
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token endpoints answer directly, so the default client never follows redirects.
#[derive(Clone, Debug)]
pub struct ProviderHttpClient(pub ReqwestClient);
impl ProviderHttpClient {
	/// Builds the default client: no redirects, crate user agent.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.redirect(Policy::none())
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Sends an OAuth 1.0a signed POST with an empty form body.
	pub async fn post_oauth(
		&self,
		url: &Url,
		authorization: &str,
	) -> Result<ProviderResponse, TransportError> {
		let request = self
			.0
			.post(url.clone())
			.header(AUTHORIZATION, authorization)
			.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
			.body(Vec::new());

		execute(request).await
	}

	/// Sends a Thrift binary-protocol call.
	pub async fn post_thrift(
		&self,
		url: &Url,
		payload: Vec<u8>,
	) -> Result<ProviderResponse, TransportError> {
		let request = self
			.0
			.post(url.clone())
			.header(CONTENT_TYPE, THRIFT_CONTENT_TYPE)
			.header("accept", THRIFT_CONTENT_TYPE)
			.body(payload);

		execute(request).await
	}
}
impl AsRef<ReqwestClient> for ProviderHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}

async fn execute(request: reqwest::RequestBuilder) -> Result<ProviderResponse, TransportError> {
	let response = request.send().await?;
	let metadata = ResponseMetadata { status: Some(response.status().as_u16()) };
	let body = response.bytes().await?.to_vec();

	Ok(ProviderResponse { metadata, body })
}
