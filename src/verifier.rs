use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::{debug, warn};

use crate::claims::Claims;
use crate::config::ClerkConfig;
use crate::error::{AuthResult, KeyResolutionError, VerificationError};
use crate::jwks::KeyResolver;

/// Verifies Clerk bearer tokens: signature, algorithm, issuer, audience and
/// time bounds. Stateless per call; the only shared state is the resolver's
/// key cache.
#[derive(Clone)]
pub struct TokenVerifier {
    config: ClerkConfig,
    resolver: KeyResolver,
}

impl TokenVerifier {
    pub fn new(config: ClerkConfig) -> Result<Self, KeyResolutionError> {
        let resolver = KeyResolver::new(&config)?;
        Ok(Self { config, resolver })
    }

    /// Use an injected resolver, e.g. one pointed at a fake endpoint.
    pub fn with_resolver(config: ClerkConfig, resolver: KeyResolver) -> Self {
        Self { config, resolver }
    }

    pub fn config(&self) -> &ClerkConfig {
        &self.config
    }

    pub fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    /// Verify `bearer_token` end to end and return its claims.
    ///
    /// This is the single inbound operation: resolve the signing key, then
    /// check the token against it. Every failure is logged with its concrete
    /// cause and collapsed into the uniform [`crate::AuthError`], so callers
    /// surface one indistinguishable rejection regardless of why the token
    /// was bad.
    pub async fn authenticate(
        &self,
        bearer_token: &str,
        expected_audience: Option<&str>,
    ) -> AuthResult<Claims> {
        let key = match self.resolver.resolve_signing_key(bearer_token).await {
            Ok(key) => key,
            Err(err) => {
                warn!(error = %err, "key resolution failed; rejecting token");
                return Err(err.into());
            }
        };

        match self.verify(bearer_token, &key, expected_audience) {
            Ok(claims) => {
                debug!(subject = %claims.subject, "token verified");
                Ok(claims)
            }
            Err(err) => {
                warn!(error = %err, "token verification failed; rejecting token");
                Err(err.into())
            }
        }
    }

    /// Check `token` against an already-resolved signing key.
    ///
    /// Only RS256 is accepted; a token declaring any other algorithm is
    /// rejected before signature work, closing the symmetric-resign
    /// downgrade hole. `exp`/`nbf` are checked with the configured leeway,
    /// the issuer must match exactly, and the audience is enforced only when
    /// the caller supplies an expectation.
    pub fn verify(
        &self,
        token: &str,
        key: &DecodingKey,
        expected_audience: Option<&str>,
    ) -> Result<Claims, VerificationError> {
        let header =
            decode_header(token).map_err(|err| VerificationError::Malformed(err.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(VerificationError::UnsupportedAlgorithm(format!(
                "{:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.config.issuer.clone()]);
        validation.leeway = self.config.leeway_seconds.into();
        validation.validate_nbf = true;
        match expected_audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let token_data = decode::<Value>(token, key, &validation)?;
        Claims::try_from(token_data.claims)
    }
}
