use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    MissingVar(&'static str),
    #[error("environment variable {0} has invalid value '{1}'")]
    InvalidVar(&'static str, String),
}

/// Runtime configuration for Clerk token verification.
#[derive(Debug, Clone)]
pub struct ClerkConfig {
    /// URL of Clerk's published JWKS endpoint.
    pub jwks_url: String,
    /// Expected issuer claim (iss), matched exactly.
    pub issuer: String,
    /// Whether to verify the TLS certificate of the JWKS endpoint.
    /// Disabling this is for development environments only.
    pub tls_verify: bool,
    /// Allowable clock skew in seconds when validating exp/nbf.
    pub leeway_seconds: u32,
}

impl ClerkConfig {
    /// Construct config with defaults (TLS verification on, 30 second leeway).
    pub fn new(jwks_url: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            issuer: issuer.into(),
            tls_verify: true,
            leeway_seconds: 30,
        }
    }

    /// Adjust the allowed leeway.
    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    /// Toggle TLS certificate verification for the JWKS endpoint.
    pub fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Load configuration from `CLERK_JWKS_URL`, `CLERK_ISSUER`,
    /// `CLERK_TLS_VERIFY` and `CLERK_LEEWAY_SECONDS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwks_url =
            env::var("CLERK_JWKS_URL").map_err(|_| ConfigError::MissingVar("CLERK_JWKS_URL"))?;
        let issuer =
            env::var("CLERK_ISSUER").map_err(|_| ConfigError::MissingVar("CLERK_ISSUER"))?;

        let mut config = Self::new(jwks_url, issuer);

        if let Ok(value) = env::var("CLERK_TLS_VERIFY") {
            config.tls_verify = is_truthy(&value);
        }

        if let Ok(value) = env::var("CLERK_LEEWAY_SECONDS") {
            config.leeway_seconds = value
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidVar("CLERK_LEEWAY_SECONDS", value))?;
        }

        Ok(config)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "t"
    )
}
