//! Server-side sessions: the verified launch bound to a browser cookie, and the pending
//! authorization that links a temporary credential to that session until the callback.

pub mod memory;

pub use memory::MemorySessionStore;

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::{ConsumerKey, LmsUserId, TokenSecret},
	lti::{LaunchParams, VerifiedLaunch},
	store::StoreFuture,
};

const SESSION_ID_LEN: usize = 32;

/// Default launch-session lifetime.
pub const DEFAULT_SESSION_TTL: Duration = Duration::days(1);
/// Default lifetime of a pending authorization.
pub const DEFAULT_PENDING_TTL: Duration = Duration::minutes(30);

/// Opaque session identifier carried in the session cookie.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);
impl SessionId {
	/// Generates a fresh random identifier.
	pub fn generate() -> Self {
		Self(rand::rng().sample_iter(Alphanumeric).take(SESSION_ID_LEN).map(char::from).collect())
	}

	/// Accepts a cookie value only if it has the shape of a generated identifier.
	pub fn parse(raw: &str) -> Option<Self> {
		(raw.len() == SESSION_ID_LEN && raw.bytes().all(|b| b.is_ascii_alphanumeric()))
			.then(|| Self(raw.to_owned()))
	}

	/// Cookie value.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Debug for SessionId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		// Only a prefix; the full value is a bearer credential.
		write!(f, "SessionId({}..)", self.0.chars().take(6).collect::<String>())
	}
}

/// Verified launch kept for follow-up requests from the same browser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSession {
	/// Consumer that signed the launch.
	pub consumer_key: ConsumerKey,
	/// Non-OAuth launch parameters.
	pub params: LaunchParams,
	/// Display name resolved at launch time.
	pub username: String,
	/// Launch instant.
	pub created_at: OffsetDateTime,
	/// Instant after which the session is gone.
	pub expires_at: OffsetDateTime,
}
impl LaunchSession {
	/// Wraps a verified launch.
	pub fn new(launch: VerifiedLaunch, now: OffsetDateTime, ttl: Duration) -> Self {
		Self {
			consumer_key: launch.consumer_key,
			params: launch.params,
			username: launch.username,
			created_at: now,
			expires_at: now + ttl,
		}
	}

	/// Returns `true` once the session lifetime has elapsed.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}

/// Temporary credential awaiting the user's approval at the provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthorization {
	/// Browser session that started the handshake.
	pub session_id: SessionId,
	/// LMS user the eventual token belongs to.
	pub lms_user_id: LmsUserId,
	/// Temporary credential identifier (`oauth_token`).
	pub request_token: String,
	/// Temporary credential secret.
	pub request_token_secret: TokenSecret,
	/// Callback URL registered with the provider.
	pub callback_url: Url,
	/// Creation instant.
	pub created_at: OffsetDateTime,
	/// Instant after which the callback is refused.
	pub expires_at: OffsetDateTime,
}
impl PendingAuthorization {
	/// Returns `true` once the record has outlived its TTL.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}

/// Session persistence contract.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Stores (or replaces) the launch bound to `id`.
	fn save_launch<'a>(&'a self, id: &'a SessionId, session: LaunchSession) -> StoreFuture<'a, ()>;

	/// Fetches an unexpired launch session.
	fn launch<'a>(
		&'a self,
		id: &'a SessionId,
		now: OffsetDateTime,
	) -> StoreFuture<'a, Option<LaunchSession>>;

	/// Stores the pending authorization for `pending.session_id`, replacing any earlier one.
	fn save_pending(&self, pending: PendingAuthorization) -> StoreFuture<'_, ()>;

	/// Returns the pending authorization without consuming it.
	fn pending<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, Option<PendingAuthorization>>;

	/// Removes and returns the pending authorization, so it can be consumed only once.
	fn take_pending<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, Option<PendingAuthorization>>;

	/// Drops every record bound to the session.
	fn destroy<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, ()>;
}
