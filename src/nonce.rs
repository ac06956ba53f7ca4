//! Replay protection: a short-TTL cache of recently accepted OAuth nonces.
//!
//! The check and the insert are a single operation so two concurrent launches carrying
//! the same nonce cannot both be accepted.

pub mod memory;
#[cfg(feature = "redis")] pub mod redis;

pub use memory::MemoryNonceStore;
#[cfg(feature = "redis")] pub use self::redis::RedisNonceStore;

// self
use crate::{
	_prelude::*,
	store::{StoreError, StoreFuture},
};

/// Default lifetime of a cached nonce.
pub const DEFAULT_NONCE_TTL: Duration = Duration::seconds(300);

/// Result of an insert-if-absent attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NonceOutcome {
	/// The nonce was unseen within the TTL and has now been recorded.
	Fresh,
	/// The nonce is still cached; the request is a replay.
	Replayed,
}

/// Atomic nonce cache contract.
pub trait NonceStore
where
	Self: Send + Sync,
{
	/// Records `nonce` (with the request's `oauth_timestamp`) unless it is already cached.
	///
	/// `now` is the verifier's clock; entries older than `ttl` relative to it are treated as
	/// absent.
	fn insert_if_absent<'a>(
		&'a self,
		nonce: &'a str,
		timestamp: i64,
		now: OffsetDateTime,
		ttl: Duration,
	) -> StoreFuture<'a, NonceOutcome>;
}

pub(crate) fn cache_key(nonce: &str) -> String {
	format!("evernote_lti:nonce:{nonce}")
}

pub(crate) fn ttl_seconds(ttl: Duration) -> Result<u64, StoreError> {
	u64::try_from(ttl.whole_seconds())
		.ok()
		.filter(|secs| *secs > 0)
		.ok_or_else(|| StoreError::Backend { message: format!("Nonce TTL {ttl} must be positive") })
}
