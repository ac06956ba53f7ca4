// crates.io
use time::macros;
// self
use evernote_lti::{
	_preludet::*,
	lti::{LaunchError, LaunchRequest, LaunchVerifier},
	nonce::{MemoryNonceStore, NonceStore},
	session::{LaunchSession, MemorySessionStore, SessionId, SessionStore},
};

const NOW: OffsetDateTime = macros::datetime!(2025-03-01 09:30 UTC);

fn launch_url(raw: &str) -> Url {
	Url::parse(raw).expect("Launch URL fixture should parse.")
}

fn canvas_launch(url: &Url, nonce: &str) -> LaunchRequest {
	LaunchRequest::post(
		url.clone(),
		sign_launch(
			url,
			TEST_CONSUMER_KEY,
			TEST_CONSUMER_SECRET,
			nonce,
			NOW.unix_timestamp(),
			&[
				("lti_message_type", "basic-lti-launch-request"),
				("lti_version", "LTI-1p0"),
				("resource_link_id", "rl-7"),
				("context_id", "course-101"),
				("user_id", "canvas-user-9"),
				("roles", "urn:lti:role:ims/lis/Instructor,Learner"),
				("lis_person_name_given", ""),
				("lis_person_name_family", "Lovelace"),
				("lis_person_name_full", "Ada Lovelace"),
				("custom_canvas_course_id", "101"),
				("launch_presentation_return_url", "https://canvas.example.edu/return"),
			],
		),
	)
}

fn launch_error(err: Error) -> LaunchError {
	match err {
		Error::Launch(inner) => inner,
		other => panic!("Expected a launch error, got {other:?}."),
	}
}

#[tokio::test]
async fn canvas_launch_exposes_parameters_and_username() {
	let (verifier, _) = build_test_verifier();
	let url = launch_url("https://tool.example.com/lti_tool");
	let verified = verifier
		.verify(&canvas_launch(&url, "canvas-1"), NOW)
		.await
		.expect("Canvas launch should verify.");
	let params = &verified.params;

	assert_eq!(verified.username, "Lovelace");
	assert_eq!(verified.timestamp, NOW.unix_timestamp());
	assert_eq!(params.user_id(), Some("canvas-user-9"));
	assert_eq!(params.resource_link_id(), Some("rl-7"));
	assert_eq!(params.context_id(), Some("course-101"));
	assert_eq!(params.custom("canvas_course_id"), Some("101"));
	assert_eq!(params.launch_presentation_return_url(), Some("https://canvas.example.edu/return"));
	assert!(params.is_instructor());
	assert!(params.is_learner());
	assert!(params.get("oauth_signature").is_none());
	assert_eq!(params.lms_user_id().expect("User id should be valid.").as_ref(), "canvas-user-9");
}

#[tokio::test]
async fn query_parameters_on_the_launch_url_are_signed() {
	let (verifier, _) = build_test_verifier();
	let url = launch_url("https://tool.example.com/lti_tool?placement=editor");

	verifier
		.verify(&canvas_launch(&url, "query-1"), NOW)
		.await
		.expect("Launch signed over its query string should verify.");

	let moved = LaunchRequest::post(
		launch_url("https://tool.example.com/lti_tool?placement=course"),
		canvas_launch(&url, "query-2").params,
	);
	let err = verifier.verify(&moved, NOW).await.expect_err("Changed query must break the signature.");

	assert_eq!(launch_error(err), LaunchError::InvalidSignature);
}

#[tokio::test]
async fn nonce_cache_is_shared_between_verifiers() {
	let nonces = Arc::new(MemoryNonceStore::default());
	let shared: Arc<dyn NonceStore> = nonces.clone();
	let first = LaunchVerifier::new(test_registry(), shared.clone());
	let second = LaunchVerifier::new(test_registry(), shared);
	let url = launch_url("https://tool.example.com/lti_tool");

	first.verify(&canvas_launch(&url, "shared-1"), NOW).await.expect("First use should verify.");

	let err = second
		.verify(&canvas_launch(&url, "shared-1"), NOW + Duration::seconds(5))
		.await
		.expect_err("Replay on another instance must fail.");

	assert_eq!(launch_error(err), LaunchError::NonceReused);
	assert_eq!(err_message(LaunchError::NonceReused), "Why are you reusing the nonce?");
	assert_eq!(nonces.len(), 1);
}

#[tokio::test]
async fn configured_window_and_ttl_are_honored() {
	let (verifier, _) = build_test_verifier();
	let verifier = verifier
		.with_timestamp_window(Duration::minutes(5))
		.with_nonce_ttl(Duration::seconds(30));
	let url = launch_url("https://tool.example.com/lti_tool");
	let err = verifier
		.verify(&canvas_launch(&url, "window-1"), NOW + Duration::minutes(6))
		.await
		.expect_err("Launch older than the configured window must fail.");

	assert_eq!(launch_error(err), LaunchError::StaleTimestamp);
	assert_eq!(err_message(LaunchError::StaleTimestamp), "Your request is too old.");

	verifier
		.verify(&canvas_launch(&url, "window-2"), NOW + Duration::minutes(4))
		.await
		.expect("Launch inside the window should verify.");
	verifier
		.verify(&canvas_launch(&url, "window-2"), NOW + Duration::minutes(4) + Duration::seconds(31))
		.await
		.expect("Nonce should be reusable after the configured TTL.");
}

#[tokio::test]
async fn verified_launch_becomes_a_session() {
	let (verifier, _) = build_test_verifier();
	let sessions = MemorySessionStore::default();
	let url = launch_url("https://tool.example.com/lti_tool");
	let verified = verifier
		.verify(&canvas_launch(&url, "session-1"), NOW)
		.await
		.expect("Canvas launch should verify.");
	let id = SessionId::generate();

	sessions
		.save_launch(&id, LaunchSession::new(verified, NOW, Duration::hours(24)))
		.await
		.expect("Session should be saved.");

	let session = sessions
		.launch(&id, NOW + Duration::hours(1))
		.await
		.expect("Session lookup should succeed.")
		.expect("Session should be alive.");

	assert_eq!(session.username, "Lovelace");
	assert_eq!(session.params.user_id(), Some("canvas-user-9"));
	assert!(
		sessions
			.launch(&id, NOW + Duration::hours(25))
			.await
			.expect("Session lookup should succeed.")
			.is_none()
	);
}

fn err_message(err: LaunchError) -> String {
	err.to_string()
}
