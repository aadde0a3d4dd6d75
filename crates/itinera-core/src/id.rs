use crate::error::IdError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

const ITINERARY_ID_MAX_LENGTH: usize = 64;
const ITINERARY_ID_RANDOM_BYTES: usize = 12;
const USER_ID_MAX_LENGTH: usize = 128;
const SHAREABLE_ID_MIN_LENGTH: usize = 16;
const SHAREABLE_ID_MAX_LENGTH: usize = 64;

/// A validated itinerary identifier.
///
/// Ids are 1-64 characters drawn from `[a-zA-Z0-9_-]`. The restricted
/// alphabet keeps ids free of glob metacharacters, so `itinerary:<id>` used
/// as a cache delete pattern only ever matches the key of that one itinerary.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItineraryId(String);

impl ItineraryId {
    /// Parses and validates an id supplied by a client.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.is_empty() || id.len() > ITINERARY_ID_MAX_LENGTH {
            return Err(IdError::InvalidItineraryId(format!(
                "length must be between 1 and {}, got {}",
                ITINERARY_ID_MAX_LENGTH,
                id.len()
            )));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(IdError::InvalidItineraryId(format!(
                "must contain only alphanumeric characters, hyphens, or underscores: '{id}'"
            )));
        }

        Ok(Self(id))
    }

    /// Generates a fresh id from 12 random bytes, hex encoded.
    pub fn generate() -> Self {
        let bytes: [u8; ITINERARY_ID_RANDOM_BYTES] = rand::random();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ItineraryId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItineraryId> for String {
    fn from(value: ItineraryId) -> Self {
        value.0
    }
}

impl Display for ItineraryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authenticated owner of an itinerary.
///
/// User ids are opaque; they come from a verified bearer token and are only
/// compared for equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.trim().is_empty() || id.len() > USER_ID_MAX_LENGTH {
            return Err(IdError::InvalidUserId(format!(
                "length must be between 1 and {USER_ID_MAX_LENGTH}"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token naming a shareable snapshot.
///
/// Generated tokens are the lowercase hex encoding of at least 8 random
/// bytes. Anything that is not 16-64 lowercase hex characters cannot have
/// been issued and is rejected before it reaches the cache.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareableId(String);

impl ShareableId {
    pub fn new(token: impl Into<String>) -> Result<Self, IdError> {
        let token = token.into();
        if token.len() < SHAREABLE_ID_MIN_LENGTH || token.len() > SHAREABLE_ID_MAX_LENGTH {
            return Err(IdError::InvalidShareableId(format!(
                "length must be between {} and {}, got {}",
                SHAREABLE_ID_MIN_LENGTH,
                SHAREABLE_ID_MAX_LENGTH,
                token.len()
            )));
        }

        if !token
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(IdError::InvalidShareableId(format!(
                "must be lowercase hex: '{token}'"
            )));
        }

        Ok(Self(token))
    }

    /// Encodes raw token bytes. Callers supply at least 8 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ShareableId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ShareableId> for String {
    fn from(value: ShareableId) -> Self {
        value.0
    }
}

impl Display for ShareableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
