//! Verified launch parameters and the accessors routes rely on.

// self
use crate::{_prelude::*, auth::LmsUserId, lti::LaunchError};

/// Display name used when the launch carries no person-name parameter.
pub const ANONYMOUS_USERNAME: &str = "Anonymous";

/// Non-OAuth launch parameters, kept in the launch session after verification.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaunchParams(BTreeMap<String, String>);
impl LaunchParams {
	/// Collects parameters, dropping the `oauth_*` protocol fields.
	pub fn from_pairs<'a, I>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (&'a str, &'a str)>,
	{
		Self(
			pairs
				.into_iter()
				.filter(|(name, _)| !name.starts_with("oauth_"))
				.map(|(name, value)| (name.to_owned(), value.to_owned()))
				.collect(),
		)
	}

	/// Raw parameter lookup; empty values count as absent.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(name).map(String::as_str).filter(|value| !value.is_empty())
	}

	/// Iterates over every stored parameter.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Opaque LMS `user_id`.
	pub fn user_id(&self) -> Option<&str> {
		self.get("user_id")
	}

	/// Validated LMS user id, required by anything that touches the token store.
	pub fn lms_user_id(&self) -> Result<LmsUserId, LaunchError> {
		let raw = self.user_id().ok_or(LaunchError::MissingParameter { name: "user_id" })?;

		Ok(LmsUserId::new(raw)?)
	}

	/// Display name: given name, then family name, then full name, else `default`.
	pub fn username<'a>(&'a self, default: &'a str) -> &'a str {
		self.get("lis_person_name_given")
			.or_else(|| self.get("lis_person_name_family"))
			.or_else(|| self.get("lis_person_name_full"))
			.unwrap_or(default)
	}

	/// Comma-separated `roles`, trimmed.
	pub fn roles(&self) -> Vec<&str> {
		self.get("roles")
			.map(|raw| raw.split(',').map(str::trim).filter(|r| !r.is_empty()).collect())
			.unwrap_or_default()
	}

	/// `true` when any role names an instructor (short or URN form).
	pub fn is_instructor(&self) -> bool {
		self.has_role("instructor")
	}

	/// `true` when any role names a learner (short or URN form).
	pub fn is_learner(&self) -> bool {
		self.has_role("learner")
	}

	/// `resource_link_id`.
	pub fn resource_link_id(&self) -> Option<&str> {
		self.get("resource_link_id")
	}

	/// `context_id`.
	pub fn context_id(&self) -> Option<&str> {
		self.get("context_id")
	}

	/// `lti_message_type`.
	pub fn lti_message_type(&self) -> Option<&str> {
		self.get("lti_message_type")
	}

	/// `lti_version`.
	pub fn lti_version(&self) -> Option<&str> {
		self.get("lti_version")
	}

	/// `launch_presentation_return_url`.
	pub fn launch_presentation_return_url(&self) -> Option<&str> {
		self.get("launch_presentation_return_url")
	}

	/// `lis_outcome_service_url`.
	pub fn lis_outcome_service_url(&self) -> Option<&str> {
		self.get("lis_outcome_service_url")
	}

	/// `lis_result_sourcedid`.
	pub fn lis_result_sourcedid(&self) -> Option<&str> {
		self.get("lis_result_sourcedid")
	}

	/// `custom_<name>` lookup.
	pub fn custom(&self, name: &str) -> Option<&str> {
		self.get(&format!("custom_{name}"))
	}

	fn has_role(&self, needle: &str) -> bool {
		self.roles().iter().any(|role| {
			let tail = role.rsplit(['/', '#']).next().unwrap_or(role);

			tail.eq_ignore_ascii_case(needle)
		})
	}
}
