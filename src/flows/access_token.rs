//! Callback handling: verifier-for-token exchange and persistence.

// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	error::{ConfigError, TransientError},
	flows::{AuthorizationError, Broker, common},
	oauth1::RequestSigner,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{PendingAuthorization, SessionId},
};

/// Query parameters the provider appends to the callback URL.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParams {
	/// Temporary credential echoed back by the provider.
	pub oauth_token: Option<String>,
	/// Verifier proving the user approved access; absent when they declined.
	pub oauth_verifier: Option<String>,
}

/// Form fields returned by Evernote's token endpoint.
#[allow(non_snake_case)]
#[derive(Clone, Deserialize)]
pub struct AccessTokenResponse {
	/// Access token (Evernote calls it the auth token).
	pub oauth_token: String,
	/// Always empty for Evernote.
	#[serde(default)]
	pub oauth_token_secret: String,
	/// Shard-specific note-store URL.
	#[serde(default)]
	pub edam_noteStoreUrl: Option<String>,
	/// Token expiry in milliseconds since the Unix epoch.
	#[serde(default)]
	pub edam_expires: Option<i64>,
	/// Shard the account lives on.
	#[serde(default)]
	pub edam_shard: Option<String>,
	/// Numeric Evernote user id.
	#[serde(default)]
	pub edam_userId: Option<String>,
	/// Web API prefix for the shard.
	#[serde(default)]
	pub edam_webApiUrlPrefix: Option<String>,
}
impl Debug for AccessTokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessTokenResponse")
			.field("oauth_token", &"<redacted>")
			.field("edam_noteStoreUrl", &self.edam_noteStoreUrl)
			.field("edam_expires", &self.edam_expires)
			.field("edam_shard", &self.edam_shard)
			.field("edam_userId", &self.edam_userId)
			.finish()
	}
}

impl Broker {
	/// Completes the handshake for `session_id` and stores the resulting token.
	///
	/// Checks run before any network call: verifier present, launch session alive, pending
	/// authorization present (and consumed), unexpired, and matching the echoed token.
	pub async fn complete_authorization(
		&self,
		session_id: &SessionId,
		callback: CallbackParams,
	) -> Result<TokenRecord> {
		const KIND: FlowKind = FlowKind::AccessToken;

		let span = FlowSpan::new(KIND, "complete_authorization");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.exchange_verifier(session_id, callback)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn exchange_verifier(
		&self,
		session_id: &SessionId,
		callback: CallbackParams,
	) -> Result<TokenRecord> {
		let now = OffsetDateTime::now_utc();
		let verifier = callback
			.oauth_verifier
			.filter(|v| !v.is_empty())
			.ok_or(AuthorizationError::MissingVerifier)?;

		self.sessions
			.launch(session_id, now)
			.await
			.map_err(Error::from)?
			.ok_or(AuthorizationError::MissingLaunch)?;

		let pending = self
			.sessions
			.take_pending(session_id)
			.await
			.map_err(Error::from)?
			.ok_or(AuthorizationError::MissingPendingAuthorization)?;

		if pending.is_expired_at(now) {
			return Err(AuthorizationError::PendingExpired.into());
		}
		if callback.oauth_token.as_deref().is_some_and(|token| token != pending.request_token) {
			return Err(AuthorizationError::TokenMismatch.into());
		}

		let lms_user_id = pending.lms_user_id.clone();
		let guard = common::user_guard(self, &lms_user_id);
		let result = {
			let _serialized = guard.lock().await;

			self.redeem_verifier(pending, &verifier).await
		};

		common::release_user_guard(self, &lms_user_id, guard);

		result
	}

	async fn redeem_verifier(
		&self,
		pending: PendingAuthorization,
		verifier: &str,
	) -> Result<TokenRecord> {
		let endpoint = &self.descriptor.endpoints.access_token;
		let authorization = RequestSigner::new(&self.consumer)
			.with_token(&pending.request_token, pending.request_token_secret.expose())
			.authorization("POST", endpoint, &[("oauth_verifier", verifier)], &[]);
		let response =
			self.http_client.post_oauth(endpoint, &authorization).await.map_err(Error::from)?;

		common::ensure_success(&response)?;

		let parsed: AccessTokenResponse = common::parse_form(&response)?;

		if parsed.oauth_token.is_empty() {
			return Err(TransientError::MissingField { field: "oauth_token" }.into());
		}

		let note_store_url = match (&parsed.edam_noteStoreUrl, &parsed.edam_shard) {
			(Some(raw), _) =>
				Url::parse(raw).map_err(|e| ConfigError::invalid_url(raw.as_str(), e))?,
			(None, Some(shard)) =>
				self.descriptor.note_store_url_for_shard(shard).map_err(ConfigError::from)?,
			(None, None) =>
				return Err(TransientError::MissingField { field: "edam_noteStoreUrl" }.into()),
		};
		let expires =
			parsed.edam_expires.ok_or(TransientError::MissingField { field: "edam_expires" })?;
		let record = TokenRecord::builder(pending.lms_user_id.clone())
			.access_token(parsed.oauth_token)
			.note_store_url(note_store_url)
			.expires_at_millis(expires)
			.build()
			.map_err(common::map_token_builder_error)?;

		self.store.put(record.clone()).await.map_err(Error::from)?;

		Ok(record)
	}
}
