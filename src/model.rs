//! Domain models for the verification pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A received-but-not-yet-reconciled authorization code awaiting processing.
///
/// Keyed by `user_id` in the store: at most one pending verification per user,
/// a newer callback for the same user silently replaces the older entry.
/// Created by the callback endpoint, consumed and deleted exactly once by the
/// reconciliation loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVerification {
    pub user_id: u64,
    pub guild_id: u64,
    pub authorization_code: String,
    pub enqueued_at: DateTime<Utc>,
}

impl PendingVerification {
    pub fn new(user_id: u64, guild_id: u64, authorization_code: String) -> Self {
        Self {
            user_id,
            guild_id,
            authorization_code,
            enqueued_at: Utc::now(),
        }
    }
}

/// Bearer credential returned by the token exchange.
///
/// Lives only for the reconciliation pass that obtained it and is never
/// persisted. The Debug impl redacts the secret so it cannot leak into logs.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(secret: String) -> Self {
        Self(secret)
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(REDACTED)")
    }
}

/// Outcome of driving one pending verification through exchange and audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditVerdict {
    /// No denylisted memberships found; proceed to the role grant.
    Clean,
    /// The user is a member of a denylisted guild; proceed to enforcement.
    Denylisted(u64),
    /// The token exchange did not produce an access token.
    ExchangeFailed,
    /// The membership listing could not be fetched.
    FetchFailed,
}

/// JSON error body returned by the HTTP surface.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDto {
    pub error: String,
}

/// Deserializes a Discord snowflake, which the API encodes as a decimal
/// string (ids exceed what JavaScript numbers represent losslessly).
pub(crate) fn snowflake<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct SnowflakeVisitor;

    impl serde::de::Visitor<'_> for SnowflakeVisitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a u64 or a decimal string")
        }

        fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<u64, E> {
            Ok(value)
        }

        fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<u64, E> {
            value.parse::<u64>().map_err(serde::de::Error::custom)
        }
    }

    deserializer.deserialize_any(SnowflakeVisitor)
}
