// crates.io
use httpmock::prelude::*;
// self
use evernote_lti::{
	_preludet::*,
	auth::{ConsumerKey, LmsUserId},
	flows::{AuthorizationError, AuthorizationState, CallbackParams},
	lti::{LaunchParams, VerifiedLaunch},
	provider::ProviderDescriptor,
	session::{LaunchSession, MemorySessionStore, SessionId, SessionStore},
	store::TokenStore,
};

const LMS_USER: &str = "lms-user-42";

fn mock_url(server: &MockServer, path: &str) -> Url {
	let mut url = Url::parse(&server.url(path)).expect("Mock URL should parse.");

	url.set_scheme("https").expect("Mock URL should accept the https scheme.");

	url
}

fn build_descriptor(server: &MockServer) -> ProviderDescriptor {
	ProviderDescriptor::evernote(mock_url(server, "/"))
		.expect("Descriptor should build for the mock server.")
}

fn user() -> LmsUserId {
	LmsUserId::new(LMS_USER).expect("LMS user fixture should be valid.")
}

async fn launch_session(sessions: &MemorySessionStore) -> SessionId {
	let id = SessionId::generate();
	let now = OffsetDateTime::now_utc();
	let launch = VerifiedLaunch {
		consumer_key: ConsumerKey::new(TEST_CONSUMER_KEY).expect("Consumer key should be valid."),
		params: LaunchParams::from_pairs([("user_id", LMS_USER), ("lis_person_name_given", "Ada")]),
		username: "Ada".into(),
		timestamp: now.unix_timestamp(),
	};

	sessions
		.save_launch(&id, LaunchSession::new(launch, now, Duration::hours(1)))
		.await
		.expect("Launch session should be saved.");

	id
}

fn access_token_body(server: &MockServer) -> String {
	format!(
		"oauth_token=S%3Ds1%3AU%3D1d%3AE%3Dabc&oauth_token_secret=&edam_shard=s1&edam_userId=29&edam_expires=4102444800000&edam_noteStoreUrl={}",
		urlencoding::encode(mock_url(server, "/shard/s1/notestore").as_str())
	)
}

#[tokio::test]
async fn request_token_then_callback_stores_the_access_token() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (broker, store, sessions) = build_test_broker(descriptor);
	let id = launch_session(&sessions).await;
	let mut request_token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth").header_exists("authorization");
			then.status(200)
				.header("content-type", "text/plain")
				.body("oauth_token=rt-1&oauth_token_secret=rts-1&oauth_callback_confirmed=true");
		})
		.await;
	let callback_url =
		Url::parse("https://tool.example.com/callback").expect("Callback URL should parse.");
	let redirect = broker
		.start_authorization(&id, user(), callback_url.clone())
		.await
		.expect("Temporary credentials should be obtained.");

	request_token.assert_async().await;
	request_token.delete_async().await;

	assert_eq!(redirect.request_token, "rt-1");
	assert_eq!(redirect.authorize_url.path(), "/OAuth.action");
	assert!(redirect.authorize_url.query().unwrap_or_default().contains("oauth_token=rt-1"));

	match broker
		.authorization_state(&id, &user(), OffsetDateTime::now_utc())
		.await
		.expect("State lookup should succeed.")
	{
		AuthorizationState::RequestTokenObtained(pending) => {
			assert_eq!(pending.request_token, "rt-1");
			assert_eq!(pending.callback_url, callback_url);
		},
		other => panic!("Expected a pending authorization, got {other:?}."),
	}

	let access_token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth").header_exists("authorization");
			then.status(200).header("content-type", "text/plain").body(access_token_body(&server));
		})
		.await;
	let record = broker
		.complete_authorization(
			&id,
			CallbackParams {
				oauth_token: Some("rt-1".into()),
				oauth_verifier: Some("verifier-1".into()),
			},
		)
		.await
		.expect("Verifier exchange should succeed.");

	access_token.assert_async().await;

	assert_eq!(record.lms_user_id, user());
	assert_eq!(record.access_token.expose(), "S=s1:U=1d:E=abc");
	assert_eq!(record.note_store_url, mock_url(&server, "/shard/s1/notestore"));
	assert_eq!(record.expires_at.unix_timestamp(), 4_102_444_800);
	assert_eq!(sessions.pending_count(), 0);
	assert_eq!(broker.callbacks_in_flight(), 0);

	let stored = store
		.get(&user())
		.await
		.expect("Store lookup should succeed.")
		.expect("Token should be stored for the LMS user.");

	assert_eq!(stored, record);
	assert!(matches!(
		broker
			.authorization_state(&id, &user(), OffsetDateTime::now_utc())
			.await
			.expect("State lookup should succeed."),
		AuthorizationState::Authorized(_)
	));
}

#[tokio::test]
async fn callback_without_pending_authorization_never_contacts_evernote() {
	let server = MockServer::start_async().await;
	let (broker, store, sessions) = build_test_broker(build_descriptor(&server));
	let id = launch_session(&sessions).await;
	let access_token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth");
			then.status(200).body(access_token_body(&server));
		})
		.await;
	let err = broker
		.complete_authorization(
			&id,
			CallbackParams { oauth_token: Some("rt-x".into()), oauth_verifier: Some("v".into()) },
		)
		.await
		.expect_err("Callback without a pending authorization should fail.");

	assert!(matches!(
		err,
		Error::Authorization(AuthorizationError::MissingPendingAuthorization)
	));
	access_token.assert_calls_async(0).await;
	assert!(store.is_empty());
}

#[tokio::test]
async fn declined_authorization_reports_missing_verifier() {
	let server = MockServer::start_async().await;
	let (broker, _store, sessions) = build_test_broker(build_descriptor(&server));
	let id = launch_session(&sessions).await;
	let err = broker
		.complete_authorization(
			&id,
			CallbackParams { oauth_token: Some("rt-1".into()), oauth_verifier: None },
		)
		.await
		.expect_err("Missing verifier should fail.");

	assert!(matches!(err, Error::Authorization(AuthorizationError::MissingVerifier)));
	assert_eq!(err.to_string(), "Content owner did not authorize the temporary credentials");
}

#[tokio::test]
async fn mismatched_callback_token_consumes_the_pending_authorization() {
	let server = MockServer::start_async().await;
	let (broker, store, sessions) = build_test_broker(build_descriptor(&server));
	let id = launch_session(&sessions).await;
	let request_token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth");
			then.status(200)
				.body("oauth_token=rt-1&oauth_token_secret=rts-1&oauth_callback_confirmed=true");
		})
		.await;

	broker
		.start_authorization(
			&id,
			user(),
			Url::parse("https://tool.example.com/callback").expect("Callback URL should parse."),
		)
		.await
		.expect("Temporary credentials should be obtained.");

	let err = broker
		.complete_authorization(
			&id,
			CallbackParams {
				oauth_token: Some("forged".into()),
				oauth_verifier: Some("verifier-1".into()),
			},
		)
		.await
		.expect_err("Forged token should be rejected.");

	assert!(matches!(err, Error::Authorization(AuthorizationError::TokenMismatch)));
	request_token.assert_calls_async(1).await;
	assert_eq!(sessions.pending_count(), 0);
	assert!(store.is_empty());
}

#[tokio::test]
async fn unconfirmed_callback_and_error_status_fail_the_request_token_step() {
	let server = MockServer::start_async().await;
	let (broker, _store, sessions) = build_test_broker(build_descriptor(&server));
	let id = launch_session(&sessions).await;
	let callback_url =
		Url::parse("https://tool.example.com/callback").expect("Callback URL should parse.");
	let mut unconfirmed = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth");
			then.status(200).body("oauth_token=rt-1&oauth_token_secret=rts-1");
		})
		.await;
	let err = broker
		.start_authorization(&id, user(), callback_url.clone())
		.await
		.expect_err("Unconfirmed callback should fail.");

	assert!(matches!(err, Error::Authorization(AuthorizationError::CallbackNotConfirmed)));
	assert_eq!(sessions.pending_count(), 0);

	unconfirmed.delete_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth");
			then.status(401).body("oauth_problem=signature_invalid");
		})
		.await;

	let err = broker
		.start_authorization(&id, user(), callback_url)
		.await
		.expect_err("Rejected signature should fail.");

	match err {
		Error::Transient(evernote_lti::error::TransientError::TokenEndpoint { status, message }) => {
			assert_eq!(status, Some(401));
			assert!(message.contains("signature_invalid"));
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn expired_tokens_count_as_unauthorized() {
	let server = MockServer::start_async().await;
	let (broker, store, sessions) = build_test_broker(build_descriptor(&server));
	let id = launch_session(&sessions).await;
	let record = evernote_lti::auth::TokenRecord::builder(user())
		.access_token("stale")
		.note_store_url(mock_url(&server, "/shard/s1/notestore"))
		.expires_at(OffsetDateTime::now_utc() - Duration::minutes(1))
		.build()
		.expect("Expired record should build.");

	store.put(record).await.expect("Store write should succeed.");

	assert_eq!(
		broker
			.authorization_state(&id, &user(), OffsetDateTime::now_utc())
			.await
			.expect("State lookup should succeed."),
		AuthorizationState::Unauthorized
	);
}
