use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VerificationError;

/// Verified token claims.
///
/// Standard fields are lifted into typed accessors; `raw` carries the full
/// decoded payload so custom claims reach the caller unmodified.
#[derive(Debug, Clone, Serialize)]
pub struct Claims {
    /// Clerk user id (`sub`), e.g. `user_2abc...`.
    pub subject: String,
    pub issuer: String,
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub not_before: Option<DateTime<Utc>>,
    pub audience: Vec<String>,
    /// Clerk session id (`sid`).
    pub session_id: Option<String>,
    /// Authorized party (`azp`).
    pub authorized_party: Option<String>,
    pub raw: serde_json::Value,
}

impl Claims {
    /// Look up any claim by name, including custom claims.
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.raw.get(name)
    }
}

#[derive(Debug, Deserialize)]
struct ClaimsRepr {
    sub: String,
    iss: String,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    nbf: Option<i64>,
    #[serde(default)]
    aud: Option<AudienceRepr>,
    #[serde(default)]
    sid: Option<String>,
    #[serde(default)]
    azp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AudienceRepr {
    Single(String),
    Many(Vec<String>),
}

fn timestamp(claim: &'static str, value: i64) -> Result<DateTime<Utc>, VerificationError> {
    Utc.timestamp_opt(value, 0)
        .single()
        .ok_or_else(|| VerificationError::InvalidClaims(format!("{claim} out of range: {value}")))
}

impl TryFrom<ClaimsRepr> for Claims {
    type Error = VerificationError;

    fn try_from(value: ClaimsRepr) -> Result<Self, Self::Error> {
        let expires_at = timestamp("exp", value.exp)?;
        let issued_at = value.iat.map(|iat| timestamp("iat", iat)).transpose()?;
        let not_before = value.nbf.map(|nbf| timestamp("nbf", nbf)).transpose()?;

        let audience = match value.aud {
            Some(AudienceRepr::Single(item)) => vec![item],
            Some(AudienceRepr::Many(items)) => items,
            None => Vec::new(),
        };

        Ok(Self {
            subject: value.sub,
            issuer: value.iss,
            expires_at,
            issued_at,
            not_before,
            audience,
            session_id: value.sid,
            authorized_party: value.azp,
            raw: serde_json::Value::Null,
        })
    }
}

impl TryFrom<serde_json::Value> for Claims {
    type Error = VerificationError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let repr: ClaimsRepr = serde_json::from_value(value.clone())
            .map_err(|err| VerificationError::InvalidClaims(err.to_string()))?;
        let mut claims = Claims::try_from(repr)?;
        claims.raw = value;
        Ok(claims)
    }
}
