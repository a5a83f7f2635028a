//! Example identifiers - stable uids for annotated texts

use std::fmt;

/// Unique identifier for an example, based on UUIDv7
///
/// UUIDv7 provides:
/// - Chronological sortability (uids mint in submission order)
/// - 128-bit uniqueness without coordination
/// - RFC 9562-standard string form, which is what gets persisted and
///   travels on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExampleId(u128);

impl ExampleId {
    /// Mint a fresh UUIDv7-based ExampleId
    ///
    /// # Examples
    ///
    /// ```
    /// use gloss_domain::ExampleId;
    ///
    /// let id = ExampleId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create an ExampleId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse an ExampleId from its UUID string form
    ///
    /// # Examples
    ///
    /// ```
    /// use gloss_domain::ExampleId;
    ///
    /// let id = ExampleId::new();
    /// let parsed = ExampleId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid uid string: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for ExampleId {
    fn default() -> Self {
        Self::new()
    }
}

/// A unit of text to annotate, paired with its stable per-task uid.
///
/// Within a task, `text -> uid` and `uid -> text` are both injective: one uid
/// per distinct text, no reuse across distinct texts. Examples are created on
/// first submission and never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    /// Persisted unique identifier (UUID string form)
    pub uid: String,
    /// The raw text
    pub text: String,
}

impl fmt::Display for ExampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_id_ordering() {
        let id1 = ExampleId::from_value(1000);
        let id2 = ExampleId::from_value(2000);

        assert!(id1 < id2);
        assert!(id2 > id1);
    }

    #[test]
    fn test_example_id_chronological() {
        // UUIDv7s generated in sequence should be chronologically ordered
        let id1 = ExampleId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = ExampleId::new();

        assert!(id1 < id2, "Earlier UUIDv7 should be less than later UUIDv7");
    }

    #[test]
    fn test_example_id_display_and_parse() {
        let id = ExampleId::new();
        let id_str = id.to_string();

        // UUID strings are 36 characters (8-4-4-4-12 with hyphens)
        assert_eq!(id_str.len(), 36);

        let parsed = ExampleId::from_string(&id_str).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_example_id_invalid_string() {
        assert!(ExampleId::from_string("not-a-valid-uuid").is_err());
        assert!(ExampleId::from_string("").is_err());
    }
}
