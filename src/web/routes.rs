// crates.io
use axum::{
	Form, Router,
	extract::{Query, State},
	http::{HeaderMap, Uri, header},
	response::{Html, IntoResponse, Redirect, Response},
	routing::{get, post},
};
use axum_extra::extract::{
	CookieJar,
	cookie::{Cookie, SameSite},
};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	flows::{AuthorizationError, AuthorizationState, CallbackParams},
	lti::{LaunchError, LaunchRequest, ToolConfig},
	notes::NoteStoreClient,
	session::{LaunchSession, SessionId},
	web::{AppState, page},
};

/// Session cookie carrying the [`SessionId`].
pub const SESSION_COOKIE: &str = "evernote_lti_session";

const TEMPORARY_CREDENTIALS_ERROR: &str = "Error obtaining temporary credentials";

/// Builds the application router.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/", get(index))
		.route("/tool_config.xml", get(tool_config))
		.route("/lti_tool", post(lti_tool))
		.route("/lti_tool_embed", post(lti_tool_embed))
		.route("/assessment", post(assessment))
		.route("/authorize", get(authorize))
		.route("/callback", get(callback))
		.route("/reset", get(reset))
		.with_state(state)
}

/// Failure rendered as the HTML error page.
#[derive(Debug)]
pub struct PageError {
	context: Option<&'static str>,
	error: Error,
}
impl PageError {
	fn context(mut self, context: &'static str) -> Self {
		self.context = Some(context);

		self
	}

	fn message(&self) -> String {
		match self.context {
			Some(context) => format!("{context}: {}", self.error),
			None => self.error.to_string(),
		}
	}
}
impl<E> From<E> for PageError
where
	E: Into<Error>,
{
	fn from(e: E) -> Self {
		Self { context: None, error: e.into() }
	}
}
impl IntoResponse for PageError {
	fn into_response(self) -> Response {
		let message = self.message();

		tracing::warn!(error = ?self.error, "{message}");

		Html(page::error(&message)).into_response()
	}
}

type PageResult<T = Response> = std::result::Result<T, PageError>;

async fn index(State(state): State<AppState>, headers: HeaderMap) -> PageResult {
	let config_url = state.route_url(&headers, "tool_config.xml")?;

	Ok(Html(page::index(&state.options.tool, &config_url)).into_response())
}

async fn tool_config(State(state): State<AppState>, headers: HeaderMap) -> PageResult {
	let base = state.base_url(&headers)?;
	let tool = &state.options.tool;
	let icon_url = tool.icon_url.clone().or_else(|| base.join("favicon.ico").ok());
	let config =
		ToolConfig::evernote(&base, tool.title.clone(), tool.description.clone(), icon_url)?;

	Ok(([(header::CONTENT_TYPE, "text/xml")], config.to_xml()).into_response())
}

async fn lti_tool(
	State(state): State<AppState>,
	headers: HeaderMap,
	uri: Uri,
	jar: CookieJar,
	Form(form): Form<Vec<(String, String)>>,
) -> PageResult {
	let (id, session) = accept_launch(&state, &headers, &uri, form).await?;
	let jar = jar.add(session_cookie(&state, &id));
	let html = match notebook_page(&state, &headers, &id, &session, None).await {
		Ok(html) => html,
		Err(e) => return Ok((jar, e).into_response()),
	};

	Ok((jar, Html(html)).into_response())
}

async fn lti_tool_embed(
	State(state): State<AppState>,
	headers: HeaderMap,
	uri: Uri,
	jar: CookieJar,
	Form(form): Form<Vec<(String, String)>>,
) -> PageResult {
	let (id, session) = accept_launch(&state, &headers, &uri, form).await?;
	let jar = jar.add(session_cookie(&state, &id));
	let html = match embed_return_url(&session) {
		Ok(return_url) =>
			notebook_page(&state, &headers, &id, &session, Some(&return_url)).await,
		Err(e) => Err(e),
	};

	match html {
		Ok(html) => Ok((jar, Html(html)).into_response()),
		Err(e) => Ok((jar, e).into_response()),
	}
}

async fn assessment(
	State(state): State<AppState>,
	headers: HeaderMap,
	uri: Uri,
	jar: CookieJar,
	Form(form): Form<Vec<(String, String)>>,
) -> PageResult {
	let (id, session) = accept_launch(&state, &headers, &uri, form).await?;
	let jar = jar.add(session_cookie(&state, &id));

	Ok((jar, Html(page::assessment(&session.username, &session.params))).into_response())
}

async fn authorize(
	State(state): State<AppState>,
	headers: HeaderMap,
	uri: Uri,
	jar: CookieJar,
) -> PageResult {
	start_authorization(&state, &headers, &uri, &jar)
		.await
		.map(|redirect| redirect.into_response())
		.map_err(|e| e.context(TEMPORARY_CREDENTIALS_ERROR))
}

async fn callback(
	State(state): State<AppState>,
	jar: CookieJar,
	Query(params): Query<CallbackParams>,
) -> PageResult {
	if params.oauth_verifier.as_deref().is_none_or(str::is_empty) {
		return Err(AuthorizationError::MissingVerifier.into());
	}

	let id = session_id(&jar).ok_or(AuthorizationError::MissingLaunch)?;
	let record = state.broker.complete_authorization(&id, params).await?;

	tracing::info!(lms_user_id = %record.lms_user_id, "Evernote account linked");

	Ok(Html(page::authorized()).into_response())
}

async fn reset(State(state): State<AppState>, jar: CookieJar) -> PageResult {
	if let Some(id) = session_id(&jar) {
		state.sessions().destroy(&id).await?;
	}

	let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));

	Ok((jar, Html(page::reset())).into_response())
}

async fn accept_launch(
	state: &AppState,
	headers: &HeaderMap,
	uri: &Uri,
	form: Vec<(String, String)>,
) -> Result<(SessionId, LaunchSession)> {
	let url = state.request_url(headers, uri)?;
	let mut request = LaunchRequest::post(url, form);

	if let Some(authorization) =
		headers.get(header::AUTHORIZATION).and_then(|value| value.to_str().ok())
	{
		request = request.with_authorization(authorization);
	}

	let now = OffsetDateTime::now_utc();
	let launch = state.verifier.verify(&request, now).await?;
	let id = SessionId::generate();
	let session = LaunchSession::new(launch, now, state.options.session_ttl);

	state.sessions().save_launch(&id, session.clone()).await?;

	Ok((id, session))
}

async fn notebook_page(
	state: &AppState,
	headers: &HeaderMap,
	id: &SessionId,
	session: &LaunchSession,
	return_url: Option<&Url>,
) -> PageResult<String> {
	let lms_user_id = session.params.lms_user_id()?;
	let now = OffsetDateTime::now_utc();
	let record = match state.broker.authorization_state(id, &lms_user_id, now).await? {
		AuthorizationState::Authorized(record) => record,
		AuthorizationState::Unauthorized | AuthorizationState::RequestTokenObtained(_) =>
			return authorize_page(state, headers, session),
	};
	let client = NoteStoreClient::for_token(state.broker.http_client.clone(), &record);
	let listings = match client.notebook_listing(record.access_token.expose()).await {
		Ok(listings) => listings,
		Err(Error::NoteStore(e)) if e.requires_reauthorization() => {
			tracing::info!(lms_user_id = %lms_user_id, error = %e, "stored token rejected");

			return authorize_page(state, headers, session);
		},
		Err(e) => return Err(e.into()),
	};
	let descriptor = &state.broker.descriptor;

	Ok(match return_url {
		Some(return_url) => page::embed(&session.username, &listings, descriptor, return_url),
		None => page::notebooks(&session.username, &listings, descriptor),
	})
}

fn authorize_page(
	state: &AppState,
	headers: &HeaderMap,
	session: &LaunchSession,
) -> PageResult<String> {
	let authorize_url = state.route_url(headers, "authorize")?;

	Ok(page::authorize(&session.username, &authorize_url))
}

fn embed_return_url(session: &LaunchSession) -> PageResult<Url> {
	let raw = session.params.launch_presentation_return_url().ok_or(
		LaunchError::MissingParameter { name: "launch_presentation_return_url" },
	)?;

	Url::parse(raw).map_err(|e| ConfigError::invalid_url(raw, e).into())
}

async fn start_authorization(
	state: &AppState,
	headers: &HeaderMap,
	uri: &Uri,
	jar: &CookieJar,
) -> PageResult<Redirect> {
	let id = session_id(jar).ok_or(AuthorizationError::MissingLaunch)?;
	let now = OffsetDateTime::now_utc();
	let session =
		state.sessions().launch(&id, now).await?.ok_or(AuthorizationError::MissingLaunch)?;
	let lms_user_id = session.params.lms_user_id()?;
	let callback_url = callback_url(state.request_url(headers, uri)?);
	let redirect = state.broker.start_authorization(&id, lms_user_id, callback_url).await?;

	Ok(Redirect::to(redirect.authorize_url.as_str()))
}

/// Swaps the trailing `authorize` path segment for `callback` and drops the query.
fn callback_url(mut request_url: Url) -> Url {
	let path = match request_url.path().strip_suffix("authorize") {
		Some(prefix) => format!("{prefix}callback"),
		None => format!("{}/callback", request_url.path().trim_end_matches('/')),
	};

	request_url.set_path(&path);
	request_url.set_query(None);
	request_url.set_fragment(None);

	request_url
}

fn session_id(jar: &CookieJar) -> Option<SessionId> {
	jar.get(SESSION_COOKIE).and_then(|cookie| SessionId::parse(cookie.value()))
}

fn session_cookie(state: &AppState, id: &SessionId) -> Cookie<'static> {
	let secure = state.options.secure_cookies;

	Cookie::build((SESSION_COOKIE, id.as_str().to_owned()))
		.http_only(true)
		.secure(secure)
		.same_site(if secure { SameSite::None } else { SameSite::Lax })
		.path("/")
		.max_age(state.options.session_ttl)
		.build()
}
