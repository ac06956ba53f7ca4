//! Signed-launch verification: consumer lookup, OAuth 1.0a signature, timestamp window,
//! and nonce replay protection, in that order.

// self
use crate::{
	_prelude::*,
	auth::{ConsumerKey, IdentifierError},
	lti::{ANONYMOUS_USERNAME, ConsumerRegistry, LaunchParams},
	nonce::{DEFAULT_NONCE_TTL, NonceOutcome, NonceStore},
	oauth1::{self, SignatureMethod, UnsupportedSignatureMethod},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Default tolerated distance between `oauth_timestamp` and the verifier's clock.
pub const DEFAULT_TIMESTAMP_WINDOW: Duration = Duration::seconds(3600);

/// Reasons a launch is rejected. Every variant is final; the consumer must relaunch.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum LaunchError {
	/// No `oauth_consumer_key` in the request.
	#[error("No consumer key")]
	MissingConsumerKey,
	/// Key not present in the registry.
	#[error("Consumer key wasn't recognized")]
	UnknownConsumerKey,
	/// A required OAuth or LTI parameter is absent.
	#[error("The launch is missing the `{name}` parameter.")]
	MissingParameter {
		/// Parameter name.
		name: &'static str,
	},
	/// `oauth_version` other than `1.0`.
	#[error("OAuth version `{0}` is not supported.")]
	UnsupportedVersion(String),
	/// Signature method outside HMAC-SHA1/HMAC-SHA256.
	#[error(transparent)]
	UnsupportedSignatureMethod(#[from] UnsupportedSignatureMethod),
	/// Signature did not validate against the registered secret.
	#[error("The OAuth signature was invalid")]
	InvalidSignature,
	/// `oauth_timestamp` is not an integer.
	#[error("The OAuth timestamp is not a valid integer.")]
	InvalidTimestamp,
	/// Timestamp outside the freshness window.
	#[error("Your request is too old.")]
	StaleTimestamp,
	/// Nonce already seen within the cache TTL.
	#[error("Why are you reusing the nonce?")]
	NonceReused,
	/// `user_id` failed identifier validation.
	#[error(transparent)]
	InvalidUserId(#[from] IdentifierError),
}

/// Transport-neutral view of an incoming launch.
#[derive(Clone, Debug)]
pub struct LaunchRequest {
	/// HTTP method, normally `POST`.
	pub method: String,
	/// Absolute URL the consumer signed, including any query string.
	pub url: Url,
	/// Form body parameters.
	pub params: Vec<(String, String)>,
	/// Raw `Authorization` header, when the consumer signed via header.
	pub authorization: Option<String>,
}
impl LaunchRequest {
	/// Creates a POST launch carrying form parameters.
	pub fn post(url: Url, params: Vec<(String, String)>) -> Self {
		Self { method: "POST".into(), url, params, authorization: None }
	}

	/// Attaches the `Authorization` header value.
	pub fn with_authorization(mut self, header: impl Into<String>) -> Self {
		self.authorization = Some(header.into());

		self
	}

	/// Body parameters plus any OAuth parameters carried in the header.
	fn signed_params(&self) -> Vec<(String, String)> {
		let mut params = self.params.clone();

		if let Some(header) = self.authorization.as_deref().and_then(oauth1::parse_authorization_header)
		{
			params.extend(header);
		}

		params
	}
}

/// Outcome of a successful verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedLaunch {
	/// Consumer that signed the launch.
	pub consumer_key: ConsumerKey,
	/// Non-OAuth launch parameters.
	pub params: LaunchParams,
	/// Display name derived from the person-name parameters.
	pub username: String,
	/// Accepted `oauth_timestamp`.
	pub timestamp: i64,
}

/// Verifies LTI 1.x launches against a [`ConsumerRegistry`] and a shared [`NonceStore`].
#[derive(Clone)]
pub struct LaunchVerifier {
	registry: ConsumerRegistry,
	nonces: Arc<dyn NonceStore>,
	timestamp_window: Duration,
	nonce_ttl: Duration,
}
impl LaunchVerifier {
	/// Creates a verifier with the default window (3600 s) and nonce TTL (300 s).
	pub fn new(registry: ConsumerRegistry, nonces: Arc<dyn NonceStore>) -> Self {
		Self {
			registry,
			nonces,
			timestamp_window: DEFAULT_TIMESTAMP_WINDOW,
			nonce_ttl: DEFAULT_NONCE_TTL,
		}
	}

	/// Overrides the timestamp window.
	pub fn with_timestamp_window(mut self, window: Duration) -> Self {
		self.timestamp_window = window.abs();

		self
	}

	/// Overrides the nonce TTL.
	pub fn with_nonce_ttl(mut self, ttl: Duration) -> Self {
		self.nonce_ttl = ttl;

		self
	}

	/// Registered consumers.
	pub fn registry(&self) -> &ConsumerRegistry {
		&self.registry
	}

	/// Verifies a launch at instant `now`.
	///
	/// The nonce is recorded only after every other check passes, so a rejected launch
	/// never burns its nonce.
	pub async fn verify(&self, request: &LaunchRequest, now: OffsetDateTime) -> Result<VerifiedLaunch> {
		const KIND: FlowKind = FlowKind::LtiLaunch;

		let span = FlowSpan::new(KIND, "verify");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.verify_inner(request, now)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn verify_inner(
		&self,
		request: &LaunchRequest,
		now: OffsetDateTime,
	) -> Result<VerifiedLaunch> {
		let params = request.signed_params();
		let lookup = |name: &str| {
			params.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str()).filter(|v| !v.is_empty())
		};
		let key = lookup("oauth_consumer_key").ok_or(LaunchError::MissingConsumerKey)?;
		let secret = self.registry.secret_for(key).ok_or(LaunchError::UnknownConsumerKey)?;
		let consumer_key = ConsumerKey::new(key).map_err(|_| LaunchError::UnknownConsumerKey)?;

		if let Some(version) = lookup("oauth_version").filter(|v| *v != "1.0") {
			return Err(LaunchError::UnsupportedVersion(version.to_owned()).into());
		}

		let method: SignatureMethod = lookup("oauth_signature_method")
			.ok_or(LaunchError::MissingParameter { name: "oauth_signature_method" })?
			.parse()
			.map_err(LaunchError::from)?;
		let signature = lookup(oauth1::SIGNATURE_PARAM)
			.ok_or(LaunchError::MissingParameter { name: oauth1::SIGNATURE_PARAM })?;

		if !oauth1::verify(
			method,
			&request.method,
			&request.url,
			&params,
			signature,
			secret.expose(),
			None,
		) {
			return Err(LaunchError::InvalidSignature.into());
		}

		let timestamp = lookup("oauth_timestamp")
			.ok_or(LaunchError::MissingParameter { name: "oauth_timestamp" })?
			.parse::<i64>()
			.map_err(|_| LaunchError::InvalidTimestamp)?;

		let window = self.timestamp_window.whole_seconds().unsigned_abs();

		if now.unix_timestamp().abs_diff(timestamp) > window {
			return Err(LaunchError::StaleTimestamp.into());
		}

		let nonce = lookup("oauth_nonce").ok_or(LaunchError::MissingParameter { name: "oauth_nonce" })?;

		match self.nonces.insert_if_absent(nonce, timestamp, now, self.nonce_ttl).await? {
			NonceOutcome::Fresh => {},
			NonceOutcome::Replayed => return Err(LaunchError::NonceReused.into()),
		}

		let launch = LaunchParams::from_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
		let username = launch.username(ANONYMOUS_USERNAME).to_owned();

		Ok(VerifiedLaunch { consumer_key, params: launch, username, timestamp })
	}
}
impl Debug for LaunchVerifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LaunchVerifier")
			.field("consumers", &self.registry.len())
			.field("timestamp_window", &self.timestamp_window)
			.field("nonce_ttl", &self.nonce_ttl)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{_preludet::*, oauth1::authorization_header};

	const NOW: OffsetDateTime = macros::datetime!(2025-01-01 12:00 UTC);

	fn launch_url() -> Url {
		Url::parse("https://tool.example.com/lti_tool").expect("Launch URL fixture should parse.")
	}

	fn request(nonce: &str, timestamp: i64, extra: &[(&str, &str)]) -> LaunchRequest {
		LaunchRequest::post(
			launch_url(),
			sign_launch(&launch_url(), TEST_CONSUMER_KEY, TEST_CONSUMER_SECRET, nonce, timestamp, extra),
		)
	}

	fn launch_error(err: Error) -> LaunchError {
		match err {
			Error::Launch(inner) => inner,
			other => panic!("Expected a launch error, got {other:?}."),
		}
	}

	#[tokio::test]
	async fn valid_launch_defaults_username() {
		let (verifier, nonces) = build_test_verifier();
		let verified = verifier
			.verify(&request("abc123", NOW.unix_timestamp(), &[("user_id", "u-1")]), NOW)
			.await
			.expect("Signed launch should verify.");

		assert_eq!(verified.username, "Anonymous");
		assert_eq!(verified.consumer_key.as_ref(), TEST_CONSUMER_KEY);
		assert_eq!(verified.params.user_id(), Some("u-1"));
		assert_eq!(nonces.timestamp_of("abc123"), Some(NOW.unix_timestamp()));
	}

	#[tokio::test]
	async fn missing_and_unknown_consumer_keys_are_rejected() {
		let (verifier, _) = build_test_verifier();
		let unsigned = LaunchRequest::post(launch_url(), vec![("user_id".into(), "u-1".into())]);
		let err = verifier.verify(&unsigned, NOW).await.expect_err("Unsigned launch must fail.");

		assert_eq!(launch_error(err), LaunchError::MissingConsumerKey);

		let foreign = LaunchRequest::post(
			launch_url(),
			sign_launch(&launch_url(), "intruder", "whatever", "n-1", NOW.unix_timestamp(), &[]),
		);
		let err = verifier.verify(&foreign, NOW).await.expect_err("Unknown key must fail.");

		assert_eq!(launch_error(err), LaunchError::UnknownConsumerKey);
	}

	#[tokio::test]
	async fn tampered_or_wrongly_signed_launches_fail() {
		let (verifier, nonces) = build_test_verifier();
		let mut tampered = request("n-1", NOW.unix_timestamp(), &[("user_id", "u-1")]);

		for (name, value) in tampered.params.iter_mut() {
			if name == "user_id" {
				*value = "u-2".into();
			}
		}

		let err = verifier.verify(&tampered, NOW).await.expect_err("Tampered launch must fail.");

		assert_eq!(launch_error(err), LaunchError::InvalidSignature);

		let wrong_secret = LaunchRequest::post(
			launch_url(),
			sign_launch(&launch_url(), TEST_CONSUMER_KEY, "not-the-secret", "n-2", NOW.unix_timestamp(), &[]),
		);
		let err = verifier.verify(&wrong_secret, NOW).await.expect_err("Wrong secret must fail.");

		assert_eq!(launch_error(err), LaunchError::InvalidSignature);
		assert!(nonces.is_empty());
	}

	#[tokio::test]
	async fn timestamps_outside_the_window_fail_even_when_signed() {
		let (verifier, _) = build_test_verifier();
		let old = request("n-old", NOW.unix_timestamp() - 3601, &[]);
		let err = verifier.verify(&old, NOW).await.expect_err("Old launch must fail.");

		assert_eq!(launch_error(err), LaunchError::StaleTimestamp);

		let future = request("n-future", NOW.unix_timestamp() + 3601, &[]);
		let err = verifier.verify(&future, NOW).await.expect_err("Future launch must fail.");

		assert_eq!(launch_error(err), LaunchError::StaleTimestamp);

		let edge = request("n-edge", NOW.unix_timestamp() - 3600, &[]);

		verifier.verify(&edge, NOW).await.expect("Launch exactly at the window edge should pass.");
	}

	#[tokio::test]
	async fn extreme_timestamps_are_stale_not_fatal() {
		let (verifier, nonces) = build_test_verifier();

		for (nonce, timestamp) in [("n-min", i64::MIN), ("n-max", i64::MAX)] {
			let err = verifier
				.verify(&request(nonce, timestamp, &[]), NOW)
				.await
				.expect_err("Out-of-range timestamps must be rejected.");

			assert_eq!(launch_error(err), LaunchError::StaleTimestamp);
		}

		assert!(nonces.is_empty());
	}

	#[tokio::test]
	async fn nonce_replay_is_rejected_until_ttl_elapses() {
		let (verifier, _) = build_test_verifier();
		let t = NOW.unix_timestamp();

		verifier.verify(&request("abc123", t, &[]), NOW).await.expect("First use should pass.");

		let err = verifier
			.verify(&request("abc123", t, &[]), NOW + Duration::seconds(10))
			.await
			.expect_err("Replay within the TTL must fail.");

		assert_eq!(launch_error(err), LaunchError::NonceReused);

		verifier
			.verify(&request("abc123", t, &[]), NOW + Duration::seconds(301))
			.await
			.expect("Nonce should be reusable after the TTL.");
	}

	#[tokio::test]
	async fn header_signed_launches_verify() {
		let (verifier, _) = build_test_verifier();
		let signed = sign_launch(
			&launch_url(),
			TEST_CONSUMER_KEY,
			TEST_CONSUMER_SECRET,
			"hdr-1",
			NOW.unix_timestamp(),
			&[],
		);
		let (oauth, body): (Vec<_>, Vec<_>) =
			signed.into_iter().partition(|(name, _)| name.starts_with("oauth_"));
		let request = LaunchRequest::post(launch_url(), body)
			.with_authorization(authorization_header(&oauth));

		verifier.verify(&request, NOW).await.expect("Header-signed launch should verify.");
	}

	#[tokio::test]
	async fn unsupported_method_and_version_are_rejected() {
		let (verifier, _) = build_test_verifier();
		let mut plaintext = request("n-1", NOW.unix_timestamp(), &[]);

		for (name, value) in plaintext.params.iter_mut() {
			if name == "oauth_signature_method" {
				*value = "PLAINTEXT".into();
			}
		}

		let err = verifier.verify(&plaintext, NOW).await.expect_err("PLAINTEXT must fail.");

		assert!(matches!(launch_error(err), LaunchError::UnsupportedSignatureMethod(_)));

		let mut versioned = request("n-2", NOW.unix_timestamp(), &[]);

		for (name, value) in versioned.params.iter_mut() {
			if name == "oauth_version" {
				*value = "2.0".into();
			}
		}

		let err = verifier.verify(&versioned, NOW).await.expect_err("Version 2.0 must fail.");

		assert_eq!(launch_error(err), LaunchError::UnsupportedVersion("2.0".into()));
	}
}
