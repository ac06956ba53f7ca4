//! In-process nonce cache for single-node deployments and tests.

// self
use crate::{
	_prelude::*,
	nonce::{self, NonceOutcome, NonceStore},
	store::StoreFuture,
};

#[derive(Clone, Copy, Debug)]
struct NonceEntry {
	timestamp: i64,
	expires_at: OffsetDateTime,
}

/// Nonce cache guarded by a single lock so check-and-insert is atomic.
#[derive(Clone, Debug, Default)]
pub struct MemoryNonceStore(Arc<Mutex<HashMap<String, NonceEntry>>>);
impl MemoryNonceStore {
	/// Number of entries still held (expired ones are dropped lazily).
	pub fn len(&self) -> usize {
		self.0.lock().len()
	}

	/// Returns `true` when no nonce is cached.
	pub fn is_empty(&self) -> bool {
		self.0.lock().is_empty()
	}

	/// Returns the `oauth_timestamp` recorded for a cached nonce.
	pub fn timestamp_of(&self, nonce: &str) -> Option<i64> {
		self.0.lock().get(&nonce::cache_key(nonce)).map(|entry| entry.timestamp)
	}

	fn insert_now(
		&self,
		nonce: &str,
		timestamp: i64,
		now: OffsetDateTime,
		ttl: Duration,
	) -> NonceOutcome {
		let key = nonce::cache_key(nonce);
		let mut guard = self.0.lock();

		guard.retain(|_, entry| entry.expires_at > now);

		if guard.contains_key(&key) {
			return NonceOutcome::Replayed;
		}

		guard.insert(key, NonceEntry { timestamp, expires_at: now + ttl });

		NonceOutcome::Fresh
	}
}
impl NonceStore for MemoryNonceStore {
	fn insert_if_absent<'a>(
		&'a self,
		nonce: &'a str,
		timestamp: i64,
		now: OffsetDateTime,
		ttl: Duration,
	) -> StoreFuture<'a, NonceOutcome> {
		Box::pin(async move {
			nonce::ttl_seconds(ttl)?;

			Ok(self.insert_now(nonce, timestamp, now, ttl))
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::nonce::DEFAULT_NONCE_TTL;

	#[tokio::test]
	async fn nonce_is_rejected_inside_ttl_and_accepted_after() {
		let store = MemoryNonceStore::default();
		let t = macros::datetime!(2025-03-01 12:00 UTC);
		let first = store
			.insert_if_absent("abc123", t.unix_timestamp(), t, DEFAULT_NONCE_TTL)
			.await
			.expect("First insert should succeed.");

		assert_eq!(first, NonceOutcome::Fresh);
		assert_eq!(store.timestamp_of("abc123"), Some(t.unix_timestamp()));

		let replay = store
			.insert_if_absent("abc123", t.unix_timestamp(), t + Duration::seconds(10), DEFAULT_NONCE_TTL)
			.await
			.expect("Replay check should succeed.");

		assert_eq!(replay, NonceOutcome::Replayed);

		let later = store
			.insert_if_absent("abc123", t.unix_timestamp(), t + Duration::seconds(301), DEFAULT_NONCE_TTL)
			.await
			.expect("Insert after TTL should succeed.");

		assert_eq!(later, NonceOutcome::Fresh);
	}

	#[tokio::test]
	async fn expired_entries_are_purged() {
		let store = MemoryNonceStore::default();
		let t = macros::datetime!(2025-03-01 12:00 UTC);

		for nonce in ["a", "b", "c"] {
			store
				.insert_if_absent(nonce, 0, t, DEFAULT_NONCE_TTL)
				.await
				.expect("Insert should succeed.");
		}

		assert_eq!(store.len(), 3);

		store
			.insert_if_absent("d", 0, t + Duration::minutes(10), DEFAULT_NONCE_TTL)
			.await
			.expect("Insert should succeed.");

		assert_eq!(store.len(), 1);
	}

	#[tokio::test]
	async fn non_positive_ttl_is_rejected() {
		let store = MemoryNonceStore::default();

		store
			.insert_if_absent("x", 0, OffsetDateTime::now_utc(), Duration::ZERO)
			.await
			.expect_err("Zero TTL should be rejected.");

		assert!(store.is_empty());
	}
}
