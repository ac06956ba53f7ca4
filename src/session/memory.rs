//! In-process session store.

// self
use crate::{
	_prelude::*,
	session::{LaunchSession, PendingAuthorization, SessionId, SessionStore},
	store::StoreFuture,
};

#[derive(Debug, Default)]
struct Sessions {
	launches: HashMap<SessionId, LaunchSession>,
	pending: HashMap<SessionId, PendingAuthorization>,
}

/// Session store backed by a process-local map; expired launches are purged on write.
#[derive(Clone, Debug, Default)]
pub struct MemorySessionStore(Arc<RwLock<Sessions>>);
impl MemorySessionStore {
	/// Number of live launch sessions.
	pub fn launch_count(&self) -> usize {
		self.0.read().launches.len()
	}

	/// Number of pending authorizations.
	pub fn pending_count(&self) -> usize {
		self.0.read().pending.len()
	}
}
impl SessionStore for MemorySessionStore {
	fn save_launch<'a>(&'a self, id: &'a SessionId, session: LaunchSession) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.0.write();
			let now = session.created_at;

			guard.launches.retain(|_, existing| !existing.is_expired_at(now));
			guard.pending.retain(|_, pending| !pending.is_expired_at(now));
			guard.launches.insert(id.clone(), session);

			Ok(())
		})
	}

	fn launch<'a>(
		&'a self,
		id: &'a SessionId,
		now: OffsetDateTime,
	) -> StoreFuture<'a, Option<LaunchSession>> {
		Box::pin(async move {
			Ok(self.0.read().launches.get(id).filter(|s| !s.is_expired_at(now)).cloned())
		})
	}

	fn save_pending(&self, pending: PendingAuthorization) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.0.write().pending.insert(pending.session_id.clone(), pending);

			Ok(())
		})
	}

	fn pending<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, Option<PendingAuthorization>> {
		Box::pin(async move { Ok(self.0.read().pending.get(id).cloned()) })
	}

	fn take_pending<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, Option<PendingAuthorization>> {
		Box::pin(async move { Ok(self.0.write().pending.remove(id)) })
	}

	fn destroy<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.0.write();

			guard.launches.remove(id);
			guard.pending.remove(id);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		auth::{ConsumerKey, LmsUserId, TokenSecret},
		lti::{LaunchParams, VerifiedLaunch},
	};

	const NOW: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);

	fn launch() -> LaunchSession {
		LaunchSession::new(
			VerifiedLaunch {
				consumer_key: ConsumerKey::new("test").expect("Consumer key fixture should be valid."),
				params: LaunchParams::from_pairs([("user_id", "u-1")]),
				username: "Anonymous".into(),
				timestamp: NOW.unix_timestamp(),
			},
			NOW,
			Duration::days(1),
		)
	}

	fn pending(id: &SessionId) -> PendingAuthorization {
		PendingAuthorization {
			session_id: id.clone(),
			lms_user_id: LmsUserId::new("u-1").expect("User fixture should be valid."),
			request_token: "tmp".into(),
			request_token_secret: TokenSecret::new("tmp-secret"),
			callback_url: Url::parse("https://tool.example.com/callback")
				.expect("Callback fixture should parse."),
			created_at: NOW,
			expires_at: NOW + Duration::minutes(30),
		}
	}

	#[tokio::test]
	async fn launch_sessions_expire_after_ttl() {
		let store = MemorySessionStore::default();
		let id = SessionId::generate();

		store.save_launch(&id, launch()).await.expect("Saving a launch should succeed.");

		assert!(store.launch(&id, NOW + Duration::hours(23)).await.expect("Lookup should succeed.").is_some());
		assert!(store.launch(&id, NOW + Duration::days(1)).await.expect("Lookup should succeed.").is_none());
	}

	#[tokio::test]
	async fn pending_authorization_is_consumed_once() {
		let store = MemorySessionStore::default();
		let id = SessionId::generate();

		store.save_pending(pending(&id)).await.expect("Saving a pending record should succeed.");

		assert!(store.pending(&id).await.expect("Peek should succeed.").is_some());

		let taken = store.take_pending(&id).await.expect("Take should succeed.");

		assert_eq!(taken.map(|p| p.request_token), Some("tmp".into()));
		assert!(store.take_pending(&id).await.expect("Second take should succeed.").is_none());
	}

	#[tokio::test]
	async fn destroy_clears_launch_and_pending() {
		let store = MemorySessionStore::default();
		let id = SessionId::generate();

		store.save_launch(&id, launch()).await.expect("Saving a launch should succeed.");
		store.save_pending(pending(&id)).await.expect("Saving a pending record should succeed.");
		store.destroy(&id).await.expect("Destroy should succeed.");

		assert_eq!(store.launch_count(), 0);
		assert_eq!(store.pending_count(), 0);
	}
}
