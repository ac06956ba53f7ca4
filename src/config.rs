//! Runtime settings: a YAML/TOML file layered with `EVERNOTE_LTI__SECTION__KEY` environment
//! overrides, plus the command line.

// std
use std::{
	net::{IpAddr, Ipv4Addr, SocketAddr},
	path::PathBuf,
};
// self
use crate::{
	_prelude::*,
	auth::{ConsumerCredentials, TokenSecret},
	error::ConfigError,
	lti::ConsumerRegistry,
	provider::ProviderDescriptor,
};

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "EVERNOTE_LTI";
/// Settings file read when none is given.
pub const DEFAULT_SETTINGS_PATH: &str = "settings.yml";

/// Command line arguments of the server binary.
#[cfg(feature = "server")]
#[derive(Clone, Debug, clap::Parser)]
#[command(version, about = "LTI tool provider linking LMS users to Evernote.")]
pub struct Cli {
	/// Settings file (YAML or TOML, chosen by extension).
	#[arg(long, env = "EVERNOTE_LTI_SETTINGS", default_value = DEFAULT_SETTINGS_PATH)]
	pub settings: PathBuf,
	/// Listen address, overriding `server.bind`.
	#[arg(long, env = "EVERNOTE_LTI_BIND")]
	pub bind: Option<SocketAddr>,
}

/// Complete runtime configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// HTTP listener.
	pub server: ServerSettings,
	/// Evernote API credentials.
	pub evernote: EvernoteSettings,
	/// LTI consumer key to secret map.
	pub consumers: ConsumerRegistry,
	/// Token store backend.
	pub storage: StorageSettings,
	/// Nonce cache backend.
	pub cache: CacheSettings,
	/// Launch and handshake timing.
	pub lti: LtiSettings,
	/// Tool presentation.
	pub tool: ToolSettings,
}
impl Settings {
	/// Loads `path` (when it exists) and applies environment overrides.
	#[cfg(feature = "server")]
	pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
		// crates.io
		use ::config::{Config, Environment, File};

		let mut builder = Config::builder();

		if path.exists() {
			builder = builder.add_source(File::from(path));
		}

		builder = builder.add_source(
			Environment::with_prefix(ENV_PREFIX).try_parsing(true).separator("__"),
		);

		let settings: Self = builder
			.build()
			.and_then(Config::try_deserialize)
			.map_err(|e| ConfigError::Settings { message: e.to_string() })?;

		settings.validate()?;

		Ok(settings)
	}

	/// Checks cross-field requirements the type system cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.consumers.is_empty() {
			return Err(settings_error("at least one LTI consumer must be configured"));
		}
		if self.evernote.key.trim().is_empty() || self.evernote.secret.is_empty() {
			return Err(settings_error("evernote.key and evernote.secret are required"));
		}
		if let Some(url) = &self.server.public_url
			&& !matches!(url.scheme(), "http" | "https")
		{
			return Err(settings_error("server.public_url must be an http(s) URL"));
		}

		self.lti.validate()
	}

	/// Evernote endpoint descriptor for `evernote.server`.
	pub fn descriptor(&self) -> Result<ProviderDescriptor, ConfigError> {
		Ok(ProviderDescriptor::evernote(self.evernote.server.clone())?)
	}

	/// Consumer credentials for the Evernote API.
	pub fn evernote_credentials(&self) -> ConsumerCredentials {
		ConsumerCredentials {
			key: self.evernote.key.clone(),
			secret: self.evernote.secret.clone(),
		}
	}
}

/// HTTP listener settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
	/// Listen address.
	pub bind: SocketAddr,
	/// Externally visible base URL; derived from the `Host` header when unset.
	pub public_url: Option<Url>,
	/// Marks the session cookie `Secure; SameSite=None` (needed inside HTTPS LMS iframes).
	pub secure_cookies: bool,
}
impl Default for ServerSettings {
	fn default() -> Self {
		Self {
			bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 9292),
			public_url: None,
			secure_cookies: false,
		}
	}
}

/// Evernote API settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EvernoteSettings {
	/// Consumer key issued by Evernote.
	pub key: String,
	/// Consumer secret issued by Evernote.
	pub secret: TokenSecret,
	/// Service root; the sandbox unless overridden.
	pub server: Url,
}
impl Default for EvernoteSettings {
	fn default() -> Self {
		Self {
			key: String::new(),
			secret: TokenSecret::new(""),
			server: Url::parse(ProviderDescriptor::SANDBOX).expect("sandbox URL is a valid constant"),
		}
	}
}

/// Token store backend selection.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageSettings {
	/// Process memory; tokens vanish on restart.
	#[default]
	Memory,
	/// JSON file.
	File {
		/// Snapshot location.
		path: PathBuf,
	},
	/// PostgreSQL `token` table (feature `postgres`).
	Postgres {
		/// Connection URL.
		url: String,
		/// Pool size.
		#[serde(default = "default_max_connections")]
		max_connections: u32,
	},
}

impl StorageSettings {
	/// Backend label for logs.
	pub const fn name(&self) -> &'static str {
		match self {
			StorageSettings::Memory => "memory",
			StorageSettings::File { .. } => "file",
			StorageSettings::Postgres { .. } => "postgres",
		}
	}
}

/// Nonce cache backend selection.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum CacheSettings {
	/// Process memory; only safe for a single instance.
	#[default]
	Memory,
	/// Redis (feature `redis`).
	Redis {
		/// Connection URL.
		url: String,
		/// Optional username merged into the URL.
		#[serde(default)]
		username: Option<String>,
		/// Optional password merged into the URL.
		#[serde(default)]
		password: Option<TokenSecret>,
	},
}
impl CacheSettings {
	/// Redis URL with credentials applied, when the Redis backend is selected.
	pub fn redis_url(&self) -> Result<Option<String>, ConfigError> {
		let CacheSettings::Redis { url, username, password } = self else {
			return Ok(None);
		};
		let mut parsed = Url::parse(url).map_err(|e| ConfigError::invalid_url(url.as_str(), e))?;

		if let Some(username) = username {
			parsed
				.set_username(username)
				.map_err(|_| settings_error("cache.username cannot be applied to the URL"))?;
		}
		if let Some(password) = password {
			parsed
				.set_password(Some(password.expose()))
				.map_err(|_| settings_error("cache.password cannot be applied to the URL"))?;
		}

		Ok(Some(parsed.into()))
	}
}

/// Launch and handshake timing, in seconds.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LtiSettings {
	/// Accepted distance between `oauth_timestamp` and now.
	pub timestamp_window_secs: i64,
	/// Nonce cache lifetime.
	pub nonce_ttl_secs: i64,
	/// Launch session lifetime.
	pub session_ttl_secs: i64,
	/// Pending authorization lifetime.
	pub pending_ttl_secs: i64,
}
impl LtiSettings {
	/// Timestamp window.
	pub fn timestamp_window(&self) -> Duration {
		Duration::seconds(self.timestamp_window_secs)
	}

	/// Nonce TTL.
	pub fn nonce_ttl(&self) -> Duration {
		Duration::seconds(self.nonce_ttl_secs)
	}

	/// Session TTL.
	pub fn session_ttl(&self) -> Duration {
		Duration::seconds(self.session_ttl_secs)
	}

	/// Pending authorization TTL.
	pub fn pending_ttl(&self) -> Duration {
		Duration::seconds(self.pending_ttl_secs)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		for (name, value) in [
			("lti.timestamp_window_secs", self.timestamp_window_secs),
			("lti.nonce_ttl_secs", self.nonce_ttl_secs),
			("lti.session_ttl_secs", self.session_ttl_secs),
			("lti.pending_ttl_secs", self.pending_ttl_secs),
		] {
			if value <= 0 {
				return Err(settings_error(&format!("{name} must be positive")));
			}
		}

		Ok(())
	}
}
impl Default for LtiSettings {
	fn default() -> Self {
		Self {
			timestamp_window_secs: 3600,
			nonce_ttl_secs: 300,
			session_ttl_secs: 86_400,
			pending_ttl_secs: 1800,
		}
	}
}

/// Tool presentation settings used by the tool configuration XML and pages.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
	/// Title.
	pub title: String,
	/// Description.
	pub description: String,
	/// Icon; `<base>/favicon.ico` when unset.
	pub icon_url: Option<Url>,
}
impl Default for ToolSettings {
	fn default() -> Self {
		Self {
			title: "Evernote LTI".into(),
			description: "Evernote integration for the Canvas LMS".into(),
			icon_url: None,
		}
	}
}

fn default_max_connections() -> u32 {
	5
}

fn settings_error(message: &str) -> ConfigError {
	ConfigError::Settings { message: message.to_owned() }
}
