//! Temporary-credential request and the authorization redirect.

// self
use crate::{
	_prelude::*,
	auth::{LmsUserId, TokenSecret},
	flows::{AuthorizationError, Broker, common},
	oauth1::RequestSigner,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{PendingAuthorization, SessionId},
};

/// Form fields returned by the temporary-credential endpoint.
#[derive(Clone, Deserialize)]
pub struct RequestTokenResponse {
	/// Temporary credential identifier.
	pub oauth_token: String,
	/// Temporary credential secret.
	#[serde(default)]
	pub oauth_token_secret: String,
	/// Must be `true` for OAuth 1.0a providers.
	#[serde(default)]
	pub oauth_callback_confirmed: Option<String>,
}
impl Debug for RequestTokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestTokenResponse")
			.field("oauth_token", &self.oauth_token)
			.field("oauth_token_secret", &"<redacted>")
			.field("oauth_callback_confirmed", &self.oauth_callback_confirmed)
			.finish()
	}
}

/// Where to send the user-agent after a temporary credential was obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationRedirect {
	/// Provider authorization page carrying `oauth_token`.
	pub authorize_url: Url,
	/// Temporary credential identifier now parked for the session.
	pub request_token: String,
}

impl Broker {
	/// Obtains a temporary credential and parks it for `session_id`.
	///
	/// Any earlier pending authorization for the same session is replaced.
	pub async fn start_authorization(
		&self,
		session_id: &SessionId,
		lms_user_id: LmsUserId,
		callback_url: Url,
	) -> Result<AuthorizationRedirect> {
		const KIND: FlowKind = FlowKind::RequestToken;

		let span = FlowSpan::new(KIND, "start_authorization");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let endpoint = &self.descriptor.endpoints.request_token;
				let authorization = RequestSigner::new(&self.consumer).authorization(
					"POST",
					endpoint,
					&[("oauth_callback", callback_url.as_str())],
					&[],
				);
				let response =
					self.http_client.post_oauth(endpoint, &authorization).await.map_err(Error::from)?;

				common::ensure_success(&response)?;

				let parsed: RequestTokenResponse = common::parse_form(&response)?;

				if parsed.oauth_callback_confirmed.as_deref() != Some("true") {
					return Err(AuthorizationError::CallbackNotConfirmed.into());
				}

				let now = OffsetDateTime::now_utc();
				let pending = PendingAuthorization {
					session_id: session_id.clone(),
					lms_user_id,
					request_token: parsed.oauth_token.clone(),
					request_token_secret: TokenSecret::new(parsed.oauth_token_secret),
					callback_url,
					created_at: now,
					expires_at: now + self.pending_ttl,
				};

				self.sessions.save_pending(pending).await.map_err(Error::from)?;

				Ok(AuthorizationRedirect {
					authorize_url: self.descriptor.authorize_url(&parsed.oauth_token),
					request_token: parsed.oauth_token,
				})
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
