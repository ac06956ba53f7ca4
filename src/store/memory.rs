//! Thread-safe in-memory [`TokenStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{LmsUserId, TokenRecord},
	store::{StoreFuture, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<LmsUserId, TokenRecord>>>;

/// Storage backend that keeps records in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of stored records.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no record is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl TokenStore for MemoryStore {
	fn put(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(record.lms_user_id.clone(), record);

			Ok(())
		})
	}

	fn get<'a>(&'a self, lms_user_id: &'a LmsUserId) -> StoreFuture<'a, Option<TokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(lms_user_id).cloned()) })
	}
}
