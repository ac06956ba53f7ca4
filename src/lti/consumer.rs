//! Static registry of LTI tool consumers (LMS installations) and their shared secrets.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Consumer key to shared-secret map, loaded from configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumerRegistry(BTreeMap<String, TokenSecret>);
impl ConsumerRegistry {
	/// Registers (or replaces) a consumer.
	pub fn insert(&mut self, key: impl Into<String>, secret: impl Into<String>) {
		self.0.insert(key.into(), TokenSecret::new(secret));
	}

	/// Shared secret for a consumer key.
	pub fn secret_for(&self, key: &str) -> Option<&TokenSecret> {
		self.0.get(key)
	}

	/// Returns `true` when the key is registered.
	pub fn contains(&self, key: &str) -> bool {
		self.0.contains_key(key)
	}

	/// Number of registered consumers.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no consumer is registered.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Registered consumer keys in sorted order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.0.keys().map(String::as_str)
	}
}
impl<K, V> FromIterator<(K, V)> for ConsumerRegistry
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut registry = Self::default();

		for (key, secret) in iter {
			registry.insert(key, secret);
		}

		registry
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn registry_looks_up_secrets_without_leaking_them() {
		let registry = ConsumerRegistry::from_iter([("test", "secret"), ("testing", "supersecret")]);

		assert_eq!(registry.len(), 2);
		assert_eq!(registry.secret_for("testing").map(TokenSecret::expose), Some("supersecret"));
		assert!(registry.secret_for("unknown").is_none());
		assert!(!format!("{registry:?}").contains("supersecret"));
	}

	#[test]
	fn registry_deserializes_from_plain_map() {
		let registry: ConsumerRegistry = serde_json::from_str("{\"test\":\"secret\"}")
			.expect("Consumer map should deserialize.");

		assert!(registry.contains("test"));
		assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["test"]);
	}
}
