//! Shared helpers for handshake steps (response parsing, guards, error mapping).

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{LmsUserId, TokenRecordBuilderError},
	error::{ConfigError, TransientError},
	flows::Broker,
	http::ProviderResponse,
};

/// Rejects non-2xx token endpoint responses with a body preview.
pub(crate) fn ensure_success(response: &ProviderResponse) -> Result<()> {
	if response.metadata.is_success() {
		return Ok(());
	}

	let status = response.metadata.status;
	let preview = response.preview();
	let message = match status {
		Some(code) if preview.is_empty() => format!("HTTP {code}"),
		Some(code) => format!("HTTP {code}: {preview}"),
		None => preview,
	};

	Err(TransientError::TokenEndpoint { message, status }.into())
}

/// Decodes a form-encoded token endpoint body, keeping the failing field path.
pub fn parse_form<T>(response: &ProviderResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	let deserializer = serde_urlencoded::Deserializer::new(url::form_urlencoded::parse(&response.body));

	serde_path_to_error::deserialize(deserializer).map_err(|source| {
		TransientError::TokenResponseParse { source, status: response.metadata.status }.into()
	})
}

/// Returns (and creates on demand) the callback guard for an LMS user.
pub(crate) fn user_guard(broker: &Broker, user: &LmsUserId) -> Arc<AsyncMutex<()>> {
	let mut guards = broker.user_guards.lock();

	guards.entry(user.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}

/// Drops the guard for an LMS user once no other callback holds or awaits it.
pub(crate) fn release_user_guard(broker: &Broker, user: &LmsUserId, guard: Arc<AsyncMutex<()>>) {
	let mut guards = broker.user_guards.lock();

	// One reference in the map plus the caller's.
	if Arc::strong_count(&guard) == 2 {
		guards.remove(user);
	}
}

/// Normalizes token builder errors into crate errors.
pub(crate) fn map_token_builder_error(err: TokenRecordBuilderError) -> Error {
	ConfigError::from(err).into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::build_test_broker, http::ResponseMetadata, provider::ProviderDescriptor};

	#[derive(Debug, Deserialize)]
	struct Sample {
		oauth_token: String,
		edam_expires: Option<i64>,
	}

	fn response(status: u16, body: &str) -> ProviderResponse {
		ProviderResponse {
			metadata: ResponseMetadata { status: Some(status) },
			body: body.as_bytes().to_vec(),
		}
	}

	#[test]
	fn form_bodies_decode_with_numeric_fields() {
		let sample: Sample = parse_form(&response(200, "oauth_token=abc%3D&edam_expires=1735693200000"))
			.expect("Well-formed body should decode.");

		assert_eq!(sample.oauth_token, "abc=");
		assert_eq!(sample.edam_expires, Some(1_735_693_200_000));
	}

	#[test]
	fn malformed_fields_report_their_path() {
		let err = parse_form::<Sample>(&response(200, "oauth_token=abc&edam_expires=soon"))
			.expect_err("Non-numeric expiry should fail.");

		match err {
			Error::Transient(TransientError::TokenResponseParse { source, status }) => {
				assert_eq!(source.path().to_string(), "edam_expires");
				assert_eq!(status, Some(200));
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn idle_guards_are_released_and_contended_ones_kept() {
		let descriptor = ProviderDescriptor::evernote(
			Url::parse(ProviderDescriptor::SANDBOX).expect("Sandbox URL should parse."),
		)
		.expect("Sandbox descriptor should build.");
		let (broker, _, _) = build_test_broker(descriptor);

		for idx in 0..1_000 {
			let user = LmsUserId::new(format!("user-{idx}")).expect("User fixture should be valid.");
			let guard = user_guard(&broker, &user);

			release_user_guard(&broker, &user, guard);
		}

		assert_eq!(broker.callbacks_in_flight(), 0);

		let user = LmsUserId::new("busy").expect("User fixture should be valid.");
		let first = user_guard(&broker, &user);
		let waiting = user_guard(&broker, &user);

		assert!(Arc::ptr_eq(&first, &waiting));

		release_user_guard(&broker, &user, first);

		assert_eq!(broker.callbacks_in_flight(), 1);

		release_user_guard(&broker, &user, waiting);

		assert_eq!(broker.callbacks_in_flight(), 0);
	}

	#[test]
	fn non_success_status_is_transient() {
		let err = ensure_success(&response(401, "oauth_problem=signature_invalid"))
			.expect_err("401 should be rejected.");

		assert!(matches!(
			err,
			Error::Transient(TransientError::TokenEndpoint { status: Some(401), .. })
		));
		assert!(ensure_success(&response(200, "")).is_ok());
	}
}
