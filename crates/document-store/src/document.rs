use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Revision number of a stored document, used for optimistic concurrency control.
///
/// A document that has never been written is at version 0; the first write
/// produces version 1 and each later write increments by 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) of a document that does not exist yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version (1) produced by the first write.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A JSON document together with its storage metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// The collection the document belongs to (e.g. "carts", "orders").
    pub collection: String,

    /// The document id, unique within its collection.
    pub id: String,

    /// Optional owner key, indexed for per-owner listings.
    pub owner: Option<String>,

    /// Revision of the stored document. Ignored on write; assigned by the store.
    pub version: Version,

    /// When the document was first written.
    pub created_at: DateTime<Utc>,

    /// When the document was last written.
    pub updated_at: DateTime<Utc>,

    /// The document body.
    pub body: serde_json::Value,
}

impl Document {
    /// Creates a new, not yet stored document from a raw JSON body.
    pub fn new(
        collection: impl Into<String>,
        id: impl Into<String>,
        body: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            collection: collection.into(),
            id: id.into(),
            owner: None,
            version: Version::initial(),
            created_at: now,
            updated_at: now,
            body,
        }
    }

    /// Creates a new document by serializing a value.
    pub fn from_value<T: Serialize>(
        collection: impl Into<String>,
        id: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(collection, id, serde_json::to_value(value)?))
    }

    /// Sets the owner key.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Deserializes the body into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }

    /// Returns the top-level string field `name` of the body, if any.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.body.get(name).and_then(serde_json::Value::as_str)
    }
}
