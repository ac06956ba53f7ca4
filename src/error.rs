//! Crate-level error types shared by the launch verifier, OAuth flows, stores, and routes.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Every variant renders as the generic error page; none of them is retried.
#[derive(Debug, ThisError)]
pub enum Error {
	/// LTI launch verification failure.
	#[error(transparent)]
	Launch(#[from] crate::lti::LaunchError),
	/// Three-legged handshake failure.
	#[error(transparent)]
	Authorization(#[from] crate::flows::AuthorizationError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Unexpected upstream response.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Note-store RPC failure.
	#[error(transparent)]
	NoteStore(#[from] crate::notes::NoteStoreError),
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Provider descriptor is invalid.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// A configured or derived URL cannot be parsed.
	#[error("URL `{value}` is invalid.")]
	InvalidUrl {
		/// Offending input.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Token record builder validation failed.
	#[error("Unable to build token record.")]
	TokenBuild(#[from] crate::auth::TokenRecordBuilderError),
	/// LMS or consumer identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
	/// Public base URL can neither be read from settings nor derived from the request.
	#[error("Request has no usable Host header and server.public_url is unset.")]
	MissingHost,
	/// Settings could not be loaded.
	#[error("Settings could not be loaded: {message}.")]
	Settings {
		/// Loader-supplied reason.
		message: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Wraps a URL parse failure together with the rejected input.
	pub fn invalid_url(value: impl Into<String>, source: url::ParseError) -> Self {
		Self::InvalidUrl { value: value.into(), source }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Upstream answered, but not with something usable.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned a non-success status.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Provider-supplied body preview or summary.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with a form body that could not be parsed.
	#[error("Token endpoint returned a malformed response.")]
	TokenResponseParse {
		/// Structured parsing failure including the offending field.
		#[source]
		source: serde_path_to_error::Error<serde_urlencoded::de::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint response omitted a required value.
	#[error("Token endpoint response is missing {field}.")]
	MissingField {
		/// Name of the absent field.
		field: &'static str,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{lti::LaunchError, store::StoreError};

	#[test]
	fn launch_errors_keep_their_message() {
		let err: Error = LaunchError::NonceReused.into();

		assert!(matches!(err, Error::Launch(LaunchError::NonceReused)));
		assert_eq!(err.to_string(), LaunchError::NonceReused.to_string());
	}

	#[test]
	fn store_error_is_exposed_as_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let err: Error = store_error.clone().into();
		let source =
			StdError::source(&err).expect("Storage errors should expose the store error as source.");

		assert!(err.to_string().contains("database unreachable"));
		assert_eq!(source.to_string(), store_error.to_string());
	}
}
