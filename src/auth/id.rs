//! Strongly typed identifiers for LMS users and LTI tool consumers.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

// LTI 1.x leaves `user_id` opaque; 255 matches the common LMS column width.
const IDENTIFIER_MAX_LEN: usize = 255;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (LMS user, consumer).
		kind: &'static str,
	},
	/// The identifier contains control characters.
	#[error("{kind} identifier contains control characters.")]
	ContainsControl {
		/// Kind of identifier (LMS user, consumer).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed byte count.
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Kind of identifier (LMS user, consumer).
		kind: &'static str,
		/// Maximum permitted length.
		max: usize,
	},
}

def_id! { LmsUserId, "Opaque LMS user identifier taken from the launch `user_id` parameter.", "LmsUser" }
def_id! { ConsumerKey, "LTI tool-consumer key (`oauth_consumer_key`).", "Consumer" }

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.trim().is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_control) {
		return Err(IdentifierError::ContainsControl { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_blank_and_control_input() {
		assert!(LmsUserId::new("").is_err());
		assert!(LmsUserId::new("   ").is_err());
		assert!(ConsumerKey::new("key\nwith-newline").is_err());

		let user = LmsUserId::new("535fa085f22b4655f48cd5a36a9215f64c062838")
			.expect("Canvas-style user id should be valid.");

		assert_eq!(user.as_ref(), "535fa085f22b4655f48cd5a36a9215f64c062838");
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let user: LmsUserId =
			serde_json::from_str("\"user-42\"").expect("User id should deserialize successfully.");

		assert_eq!(user.as_ref(), "user-42");
		assert!(serde_json::from_str::<LmsUserId>("\"\"").is_err());
	}

	#[test]
	fn length_limit_is_enforced() {
		let exact = "a".repeat(IDENTIFIER_MAX_LEN);

		LmsUserId::new(&exact).expect("Exact length should succeed.");

		assert!(LmsUserId::new("a".repeat(IDENTIFIER_MAX_LEN + 1)).is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<ConsumerKey, u8> = HashMap::from_iter([(
			ConsumerKey::new("test").expect("Consumer key used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("test"), Some(&7));
	}
}
