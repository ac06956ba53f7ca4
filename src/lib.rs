//! LTI 1.x tool provider that links LMS users to their Evernote accounts through
//! three-legged OAuth 1.0a, with replay-safe launch verification and pluggable token stores.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod lti;
pub mod nonce;
pub mod notes;
pub mod oauth1;
pub mod obs;
pub mod provider;
pub mod session;
pub mod store;
#[cfg(feature = "server")] pub mod web;
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and fixtures shared by unit and integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::ConsumerCredentials,
		flows::Broker,
		http::ProviderHttpClient,
		lti::{ConsumerRegistry, LaunchVerifier},
		nonce::{MemoryNonceStore, NonceStore},
		oauth1::{self, SignatureMethod},
		provider::ProviderDescriptor,
		session::{MemorySessionStore, SessionStore},
		store::{MemoryStore, TokenStore},
	};

	/// Consumer key registered by [`test_registry`].
	pub const TEST_CONSUMER_KEY: &str = "test";
	/// Consumer secret registered by [`test_registry`].
	pub const TEST_CONSUMER_SECRET: &str = "secret";

	/// Builds a reqwest client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_http_client() -> ProviderHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ProviderHttpClient::with_client(client)
	}

	/// Registry holding the `test`/`secret` consumer pair.
	pub fn test_registry() -> ConsumerRegistry {
		ConsumerRegistry::from_iter([(TEST_CONSUMER_KEY, TEST_CONSUMER_SECRET)])
	}

	/// Builds a verifier backed by an in-memory nonce cache.
	pub fn build_test_verifier() -> (LaunchVerifier, Arc<MemoryNonceStore>) {
		let nonces = Arc::new(MemoryNonceStore::default());
		let store: Arc<dyn NonceStore> = nonces.clone();

		(LaunchVerifier::new(test_registry(), store), nonces)
	}

	/// Constructs a [`Broker`] backed by in-memory token and session stores.
	pub fn build_test_broker(
		descriptor: ProviderDescriptor,
	) -> (Broker, Arc<MemoryStore>, Arc<MemorySessionStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let session_backend = Arc::new(MemorySessionStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let sessions: Arc<dyn SessionStore> = session_backend.clone();
		let broker = Broker::with_http_client(
			store,
			sessions,
			descriptor,
			ConsumerCredentials::new("evernote-consumer", "evernote-secret"),
			test_http_client(),
		);

		(broker, store_backend, session_backend)
	}

	/// Signs LTI launch parameters the way a tool consumer would, returning the complete
	/// form including `oauth_signature`.
	pub fn sign_launch(
		url: &Url,
		consumer_key: &str,
		consumer_secret: &str,
		nonce: &str,
		timestamp: i64,
		extra: &[(&str, &str)],
	) -> Vec<(String, String)> {
		let mut params: Vec<(String, String)> = vec![
			("oauth_consumer_key".into(), consumer_key.into()),
			("oauth_nonce".into(), nonce.into()),
			("oauth_signature_method".into(), SignatureMethod::HmacSha1.as_str().into()),
			("oauth_timestamp".into(), timestamp.to_string()),
			("oauth_version".into(), "1.0".into()),
		];

		params.extend(extra.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())));

		let signature = oauth1::sign(
			SignatureMethod::HmacSha1,
			"POST",
			url,
			&params,
			consumer_secret,
			None,
		);

		params.push(("oauth_signature".into(), signature));

		params
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tower as _};
