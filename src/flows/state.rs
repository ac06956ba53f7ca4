//! Per-user authorization state as seen by the launch routes.

// self
use crate::{
	_prelude::*,
	auth::{LmsUserId, TokenRecord},
	flows::Broker,
	session::{PendingAuthorization, SessionId},
};

/// Where an LMS user stands in the handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthorizationState {
	/// No usable token; the user must be offered authorization.
	Unauthorized,
	/// A temporary credential is parked for this session and awaits the callback.
	RequestTokenObtained(PendingAuthorization),
	/// An unexpired token is on file.
	Authorized(TokenRecord),
}
impl AuthorizationState {
	/// The stored token when authorized.
	pub fn token(&self) -> Option<&TokenRecord> {
		match self {
			AuthorizationState::Authorized(record) => Some(record),
			_ => None,
		}
	}
}

impl Broker {
	/// Resolves the state for an LMS user in a browser session at instant `now`.
	///
	/// An expired token counts as no token.
	pub async fn authorization_state(
		&self,
		session_id: &SessionId,
		lms_user_id: &LmsUserId,
		now: OffsetDateTime,
	) -> Result<AuthorizationState> {
		if let Some(record) = self
			.store
			.get(lms_user_id)
			.await
			.map_err(Error::from)?
			.filter(|record| !record.is_expired_at(now))
		{
			return Ok(AuthorizationState::Authorized(record));
		}

		let pending = self
			.sessions
			.pending(session_id)
			.await
			.map_err(Error::from)?
			.filter(|p| !p.is_expired_at(now) && &p.lms_user_id == lms_user_id);

		Ok(match pending {
			Some(pending) => AuthorizationState::RequestTokenObtained(pending),
			None => AuthorizationState::Unauthorized,
		})
	}
}
