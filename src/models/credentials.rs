use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Tokens are refreshed this long before the service would reject them.
pub const REFRESH_MARGIN_MS: i64 = 5 * 60 * 1000;

/// Durable token record. Field names match the on-disk JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    /// Epoch milliseconds, already reduced by [`REFRESH_MARGIN_MS`].
    #[serde(default)]
    pub expiration_time: i64,
}

/// Response of a code exchange or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Absent when the service does not rotate refresh tokens.
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

impl Credentials {
    pub fn from_grant(grant: TokenGrant, previous_refresh: Option<&str>, now_ms: i64) -> Option<Self> {
        let refresh_token = grant
            .refresh_token
            .or_else(|| previous_refresh.map(str::to_string))?;

        Some(Self {
            access_token: grant.access_token,
            refresh_token,
            expiration_time: now_ms + (grant.expires_in as i64) * 1000 - REFRESH_MARGIN_MS,
        })
    }

    /// A record is usable only while at least the refresh margin remains.
    /// Files written by hand or by older deployments may carry the raw
    /// deadline, so the margin is demanded here as well.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms + REFRESH_MARGIN_MS >= self.expiration_time
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }

    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn record(expiration_time: i64) -> Credentials {
        Credentials {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expiration_time,
        }
    }

    #[test]
    fn four_minutes_left_counts_as_expired() {
        assert!(record(NOW + 4 * 60 * 1000).is_expired_at(NOW));
    }

    #[test]
    fn an_hour_left_is_valid() {
        assert!(!record(NOW + 60 * 60 * 1000).is_expired_at(NOW));
    }

    #[test]
    fn grant_deadline_carries_margin() {
        let grant = TokenGrant {
            access_token: "a".to_string(),
            refresh_token: Some("r".to_string()),
            expires_in: 3600,
        };
        let creds = Credentials::from_grant(grant, None, NOW).unwrap();
        assert_eq!(creds.expiration_time, NOW + 3_600_000 - REFRESH_MARGIN_MS);
        assert!(!creds.is_expired_at(NOW));
    }

    #[test]
    fn refresh_without_rotation_keeps_old_refresh_token() {
        let grant = TokenGrant {
            access_token: "new".to_string(),
            refresh_token: None,
            expires_in: 3600,
        };
        let creds = Credentials::from_grant(grant.clone(), Some("old"), NOW).unwrap();
        assert_eq!(creds.refresh_token, "old");
        assert!(Credentials::from_grant(grant, None, NOW).is_none());
    }

    #[test]
    fn json_uses_stored_field_names() {
        let json = r#"{"accessToken":"a","refreshToken":"r","expirationTime":42}"#;
        let creds: Credentials = serde_json::from_str(json).unwrap();
        assert_eq!(creds, Credentials {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expiration_time: 42,
        });
    }
}
