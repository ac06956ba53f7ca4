//! Storage contract and built-in backends for per-LMS-user Evernote tokens.

pub mod file;
pub mod memory;
#[cfg(feature = "postgres")] pub mod postgres;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")] pub use postgres::PgTokenStore;

// self
use crate::{
	_prelude::*,
	auth::{LmsUserId, TokenRecord},
};

/// Boxed future returned by store backends.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Token persistence contract.
///
/// At most one record exists per LMS user: [`TokenStore::put`] replaces whatever was stored
/// for the same user, so re-authorizing simply overwrites the previous token.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Inserts or replaces the record for `record.lms_user_id`.
	fn put(&self, record: TokenRecord) -> StoreFuture<'_, ()>;

	/// Fetches the record for an LMS user, if present.
	fn get<'a>(&'a self, lms_user_id: &'a LmsUserId) -> StoreFuture<'a, Option<TokenRecord>>;
}

/// Error type produced by storage backends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
