//! Per-LMS-user Evernote access-token records and their builder.

// self
use crate::{
	_prelude::*,
	auth::{LmsUserId, token::secret::TokenSecret},
};

/// Current lifecycle status for a token record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token can be used against the note store.
	Active,
	/// Token exceeded its expiry instant; the user must re-authorize.
	Expired,
}

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no note-store URL was provided.
	#[error("Note-store URL is required.")]
	MissingNoteStoreUrl,
	/// Issued when no expiry was configured.
	#[error("Expiry must be supplied via expires_at or expires_at_millis.")]
	MissingExpiry,
	/// Issued when a millisecond timestamp falls outside the supported range.
	#[error("Expiry timestamp {millis} is out of range.")]
	ExpiryOutOfRange {
		/// Rejected value in milliseconds since the Unix epoch.
		millis: i64,
	},
}

/// The single row stored per LMS user after a successful OAuth callback.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenRecord {
	/// LMS user the token belongs to; unique across the store.
	pub lms_user_id: LmsUserId,
	/// Evernote access token; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Shard-specific note-store endpoint returned with the token.
	pub note_store_url: Url,
	/// Instant after which Evernote rejects the token.
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Returns a builder for the provided LMS user.
	pub fn builder(lms_user_id: LmsUserId) -> TokenRecordBuilder {
		TokenRecordBuilder::new(lms_user_id)
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant >= self.expires_at { TokenStatus::Expired } else { TokenStatus::Active }
	}

	/// Returns `true` if the record has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Returns `true` if the record is usable relative to the current clock.
	pub fn is_active(&self) -> bool {
		matches!(self.status_at(OffsetDateTime::now_utc()), TokenStatus::Active)
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("lms_user_id", &self.lms_user_id)
			.field("access_token", &"<redacted>")
			.field("note_store_url", &self.note_store_url.as_str())
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug)]
pub struct TokenRecordBuilder {
	lms_user_id: LmsUserId,
	access_token: Option<TokenSecret>,
	note_store_url: Option<Url>,
	expires_at: Option<OffsetDateTime>,
	expires_at_millis: Option<i64>,
}
impl TokenRecordBuilder {
	fn new(lms_user_id: LmsUserId) -> Self {
		Self {
			lms_user_id,
			access_token: None,
			note_store_url: None,
			expires_at: None,
			expires_at_millis: None,
		}
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the note-store endpoint.
	pub fn note_store_url(mut self, url: Url) -> Self {
		self.note_store_url = Some(url);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the expiry from Evernote's `edam_expires` (milliseconds since the Unix epoch).
	pub fn expires_at_millis(mut self, millis: i64) -> Self {
		self.expires_at_millis = Some(millis);

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self.access_token.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let note_store_url =
			self.note_store_url.ok_or(TokenRecordBuilderError::MissingNoteStoreUrl)?;
		let expires_at = match (self.expires_at, self.expires_at_millis) {
			(Some(instant), _) => instant,
			(None, Some(millis)) => OffsetDateTime::from_unix_timestamp_nanos(
				i128::from(millis) * 1_000_000,
			)
			.map_err(|_| TokenRecordBuilderError::ExpiryOutOfRange { millis })?,
			(None, None) => return Err(TokenRecordBuilderError::MissingExpiry),
		};

		Ok(TokenRecord { lms_user_id: self.lms_user_id, access_token, note_store_url, expires_at })
	}
}
