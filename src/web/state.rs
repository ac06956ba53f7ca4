// crates.io
use axum::http::{HeaderMap, Uri, header::HOST};
// self
use crate::{
	_prelude::*,
	config::{Settings, StorageSettings, ToolSettings},
	error::ConfigError,
	flows::Broker,
	lti::LaunchVerifier,
	nonce::{MemoryNonceStore, NonceStore},
	session::{DEFAULT_SESSION_TTL, MemorySessionStore, SessionStore},
	store::{FileStore, MemoryStore, TokenStore},
};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Presentation and cookie options for the routes.
#[derive(Clone, Debug)]
pub struct WebOptions {
	/// Externally visible base URL; derived from `Host` when unset.
	pub public_url: Option<Url>,
	/// Issue `Secure; SameSite=None` session cookies.
	pub secure_cookies: bool,
	/// Launch session lifetime, also used as the cookie `Max-Age`.
	pub session_ttl: Duration,
	/// Tool title, description and icon.
	pub tool: ToolSettings,
}
impl WebOptions {
	/// Extracts the route options from loaded settings.
	pub fn from_settings(settings: &Settings) -> Self {
		Self {
			public_url: settings.server.public_url.clone(),
			secure_cookies: settings.server.secure_cookies,
			session_ttl: settings.lti.session_ttl(),
			tool: settings.tool.clone(),
		}
	}
}
impl Default for WebOptions {
	fn default() -> Self {
		Self {
			public_url: None,
			secure_cookies: false,
			session_ttl: DEFAULT_SESSION_TTL,
			tool: ToolSettings::default(),
		}
	}
}

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
	/// Signed-launch verifier.
	pub verifier: Arc<LaunchVerifier>,
	/// Evernote handshake broker; owns the token and session stores.
	pub broker: Arc<Broker>,
	/// Route options.
	pub options: Arc<WebOptions>,
}
impl AppState {
	/// Assembles state from already-built components.
	pub fn new(verifier: LaunchVerifier, broker: Broker, options: WebOptions) -> Self {
		Self { verifier: Arc::new(verifier), broker: Arc::new(broker), options: Arc::new(options) }
	}

	/// Builds the configured token store, nonce cache, verifier and broker.
	///
	/// Selecting a backend whose cargo feature is disabled is a configuration error.
	pub async fn from_settings(settings: &Settings) -> Result<Self> {
		settings.validate()?;

		let store: Arc<dyn TokenStore> = match &settings.storage {
			StorageSettings::Memory => Arc::new(MemoryStore::default()),
			StorageSettings::File { path } => Arc::new(FileStore::open(path.clone())?),
			#[cfg(feature = "postgres")]
			StorageSettings::Postgres { url, max_connections } =>
				Arc::new(crate::store::PgTokenStore::connect(url, *max_connections).await?),
			#[cfg(not(feature = "postgres"))]
			StorageSettings::Postgres { .. } =>
				return Err(missing_feature("storage.backend = postgres", "postgres").into()),
		};
		let nonces: Arc<dyn NonceStore> = match settings.cache.redis_url()? {
			None => Arc::new(MemoryNonceStore::default()),
			#[cfg(feature = "redis")]
			Some(url) => Arc::new(crate::nonce::RedisNonceStore::connect(&url).await?),
			#[cfg(not(feature = "redis"))]
			Some(_) => return Err(missing_feature("cache.backend = redis", "redis").into()),
		};
		let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::default());
		let verifier = LaunchVerifier::new(settings.consumers.clone(), nonces)
			.with_timestamp_window(settings.lti.timestamp_window())
			.with_nonce_ttl(settings.lti.nonce_ttl());
		let broker =
			Broker::new(store, sessions, settings.descriptor()?, settings.evernote_credentials())?
				.with_pending_ttl(settings.lti.pending_ttl());

		Ok(Self::new(verifier, broker, WebOptions::from_settings(settings)))
	}

	/// Session store shared with the broker.
	pub fn sessions(&self) -> &Arc<dyn SessionStore> {
		&self.broker.sessions
	}

	/// Public base URL, always ending in `/`.
	///
	/// Uses `server.public_url` when configured, otherwise `Host` plus `X-Forwarded-Proto`
	/// (defaulting to `http`).
	pub fn base_url(&self, headers: &HeaderMap) -> Result<Url> {
		if let Some(url) = &self.options.public_url {
			let mut url = url.clone();

			if !url.path().ends_with('/') {
				let path = format!("{}/", url.path());

				url.set_path(&path);
			}

			return Ok(url);
		}

		let host = headers
			.get(HOST)
			.and_then(|value| value.to_str().ok())
			.filter(|value| !value.is_empty())
			.ok_or(ConfigError::MissingHost)?;
		let scheme = headers
			.get(FORWARDED_PROTO)
			.and_then(|value| value.to_str().ok())
			.filter(|value| matches!(*value, "http" | "https"))
			.unwrap_or("http");
		let raw = format!("{scheme}://{host}/");

		Url::parse(&raw).map_err(|e| ConfigError::invalid_url(raw, e).into())
	}

	/// Absolute URL the client requested, as the consumer saw it when signing.
	pub fn request_url(&self, headers: &HeaderMap, uri: &Uri) -> Result<Url> {
		let base = self.base_url(headers)?;
		let relative = uri.path_and_query().map_or("", |pq| pq.as_str()).trim_start_matches('/');

		base.join(relative).map_err(|e| ConfigError::invalid_url(relative, e).into())
	}

	/// Resolves a route below the public base URL.
	pub fn route_url(&self, headers: &HeaderMap, route: &str) -> Result<Url> {
		let base = self.base_url(headers)?;

		base.join(route).map_err(|e| ConfigError::invalid_url(route, e).into())
	}
}
impl Debug for AppState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppState").field("options", &self.options).finish_non_exhaustive()
	}
}

#[cfg(not(all(feature = "postgres", feature = "redis")))]
fn missing_feature(setting: &str, feature: &str) -> ConfigError {
	ConfigError::Settings {
		message: format!("{setting} requires the `{feature}` feature"),
	}
}
