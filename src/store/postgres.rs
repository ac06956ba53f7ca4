//! PostgreSQL [`TokenStore`] using the `token` table.
//!
//! The schema is expected to exist already:
//!
//! ```sql
//! CREATE TABLE token (
//!     lms_id text PRIMARY KEY,
//!     evernote_token text,
//!     evernote_notestoreurl text,
//!     expires timestamptz
//! );
//! ```

// crates.io
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
// self
use crate::{
	_prelude::*,
	auth::{LmsUserId, TokenRecord},
	store::{StoreError, StoreFuture, TokenStore},
};

const UPSERT: &str = "INSERT INTO token (lms_id, evernote_token, evernote_notestoreurl, expires) \
	VALUES ($1, $2, $3, $4) \
	ON CONFLICT (lms_id) DO UPDATE SET \
	evernote_token = EXCLUDED.evernote_token, \
	evernote_notestoreurl = EXCLUDED.evernote_notestoreurl, \
	expires = EXCLUDED.expires";
const SELECT: &str =
	"SELECT evernote_token, evernote_notestoreurl, expires FROM token WHERE lms_id = $1";

/// Token store backed by a shared connection pool.
#[derive(Clone, Debug)]
pub struct PgTokenStore {
	pool: PgPool,
}
impl PgTokenStore {
	/// Wraps an existing pool.
	pub const fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	/// Opens a pool against `url`.
	pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
		let pool = PgPoolOptions::new()
			.max_connections(max_connections)
			.connect(url)
			.await
			.map_err(|e| StoreError::Backend { message: format!("Failed to connect to PostgreSQL: {e}") })?;

		Ok(Self::new(pool))
	}
}
impl TokenStore for PgTokenStore {
	fn put(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			sqlx::query(UPSERT)
				.bind(record.lms_user_id.as_ref())
				.bind(record.access_token.expose())
				.bind(record.note_store_url.as_str())
				.bind(record.expires_at)
				.execute(&self.pool)
				.await
				.map_err(|e| StoreError::Backend { message: format!("Failed to save token: {e}") })?;

			Ok(())
		})
	}

	fn get<'a>(&'a self, lms_user_id: &'a LmsUserId) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move {
			let Some(row) = sqlx::query(SELECT)
				.bind(lms_user_id.as_ref())
				.fetch_optional(&self.pool)
				.await
				.map_err(|e| StoreError::Backend { message: format!("Failed to load token: {e}") })?
			else {
				return Ok(None);
			};
			let decode = |e: sqlx::Error| StoreError::Serialization {
				message: format!("Failed to decode token row: {e}"),
			};
			let access_token: Option<String> = row.try_get("evernote_token").map_err(decode)?;
			let note_store_url: Option<String> =
				row.try_get("evernote_notestoreurl").map_err(decode)?;
			let expires_at: Option<OffsetDateTime> = row.try_get("expires").map_err(decode)?;
			// Rows with missing columns cannot be used and count as absent.
			let (Some(access_token), Some(note_store_url), Some(expires_at)) =
				(access_token, note_store_url, expires_at)
			else {
				return Ok(None);
			};
			let note_store_url = Url::parse(&note_store_url).map_err(|e| StoreError::Serialization {
				message: format!("Stored note-store URL is invalid: {e}"),
			})?;
			let record = TokenRecord::builder(lms_user_id.clone())
				.access_token(access_token)
				.note_store_url(note_store_url)
				.expires_at(expires_at)
				.build()
				.map_err(|e| StoreError::Serialization { message: e.to_string() })?;

			Ok(Some(record))
		})
	}
}
