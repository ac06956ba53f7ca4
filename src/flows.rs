//! Three-legged OAuth 1.0a orchestration against Evernote.
//!
//! A user moves through `Unauthorized → RequestTokenObtained → Authorized`. The broker
//! obtains a temporary credential, parks it as a [`PendingAuthorization`] keyed by the
//! browser session, and on callback exchanges the verifier for an access token that is
//! persisted per LMS user. Any failure drops the user back to `Unauthorized`.
//!
//! [`PendingAuthorization`]: crate::session::PendingAuthorization

pub mod access_token;
pub mod common;
pub mod request_token;
pub mod state;

pub use access_token::*;
pub use common::*;
pub use request_token::*;
pub use state::*;

// self
use crate::{
	_prelude::*,
	auth::{ConsumerCredentials, LmsUserId},
	error::ConfigError,
	http::ProviderHttpClient,
	provider::ProviderDescriptor,
	session::{DEFAULT_PENDING_TTL, SessionStore},
	store::TokenStore,
};

/// Handshake failures that are not transport or storage problems.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthorizationError {
	/// Callback arrived without `oauth_verifier` (the user declined or the URL was forged).
	#[error("Content owner did not authorize the temporary credentials")]
	MissingVerifier,
	/// No verified launch is bound to the browser session.
	#[error("No LTI launch is associated with this session.")]
	MissingLaunch,
	/// No temporary credential is parked for the browser session.
	#[error("No authorization is in progress for this session.")]
	MissingPendingAuthorization,
	/// The parked temporary credential outlived its TTL.
	#[error("The authorization request expired; start again from the tool.")]
	PendingExpired,
	/// Callback `oauth_token` differs from the parked temporary credential.
	#[error("The callback token does not match the pending authorization.")]
	TokenMismatch,
	/// Request-token response lacked `oauth_callback_confirmed=true`.
	#[error("The provider did not confirm the callback URL.")]
	CallbackNotConfirmed,
}

/// Coordinates the handshake for a single provider descriptor.
///
/// The broker owns the HTTP client, both stores, and the consumer credentials so the
/// individual steps only deal with protocol details. Callbacks for the same LMS user are
/// serialized through per-user guards.
#[derive(Clone)]
pub struct Broker {
	/// HTTP client used for every outbound provider request.
	pub http_client: ProviderHttpClient,
	/// Token store receiving access tokens.
	pub store: Arc<dyn TokenStore>,
	/// Session store holding launches and pending authorizations.
	pub sessions: Arc<dyn SessionStore>,
	/// Provider endpoints.
	pub descriptor: ProviderDescriptor,
	/// Consumer key/secret issued by the provider.
	pub consumer: ConsumerCredentials,
	/// Lifetime of a pending authorization.
	pub pending_ttl: Duration,
	user_guards: Arc<Mutex<HashMap<LmsUserId, Arc<AsyncMutex<()>>>>>,
}
impl Broker {
	/// Creates a broker with its own redirect-free HTTP client.
	pub fn new(
		store: Arc<dyn TokenStore>,
		sessions: Arc<dyn SessionStore>,
		descriptor: ProviderDescriptor,
		consumer: ConsumerCredentials,
	) -> Result<Self, ConfigError> {
		Ok(Self::with_http_client(store, sessions, descriptor, consumer, ProviderHttpClient::new()?))
	}

	/// Creates a broker that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn TokenStore>,
		sessions: Arc<dyn SessionStore>,
		descriptor: ProviderDescriptor,
		consumer: ConsumerCredentials,
		http_client: ProviderHttpClient,
	) -> Self {
		Self {
			http_client,
			store,
			sessions,
			descriptor,
			consumer,
			pending_ttl: DEFAULT_PENDING_TTL,
			user_guards: Default::default(),
		}
	}

	/// Number of LMS users whose callback is currently in flight.
	pub fn callbacks_in_flight(&self) -> usize {
		self.user_guards.lock().len()
	}

	/// Overrides the pending-authorization lifetime.
	pub fn with_pending_ttl(mut self, ttl: Duration) -> Self {
		self.pending_ttl = ttl;

		self
	}
}
impl Debug for Broker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("descriptor", &self.descriptor)
			.field("consumer_key", &self.consumer.key)
			.field("pending_ttl", &self.pending_ttl)
			.finish()
	}
}
