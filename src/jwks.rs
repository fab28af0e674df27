use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use jsonwebtoken::{decode_header, DecodingKey};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ClerkConfig;
use crate::error::KeyResolutionError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves the signing key for a token from Clerk's JWKS endpoint.
///
/// Keys are cached by `kid`; an unknown `kid` triggers exactly one fetch of
/// the full key set per resolution call. The cache supports concurrent
/// readers and is replaced wholesale on refresh, so no reader ever observes
/// a partially populated entry.
#[derive(Clone)]
pub struct KeyResolver {
    client: Client,
    url: String,
    cache: Arc<RwLock<HashMap<String, DecodingKey>>>,
}

impl KeyResolver {
    pub fn new(config: &ClerkConfig) -> Result<Self, KeyResolutionError> {
        let mut builder = Client::builder().timeout(FETCH_TIMEOUT);
        if !config.tls_verify {
            warn!(
                jwks_url = %config.jwks_url,
                "TLS certificate verification is DISABLED for the key-set endpoint; \
                 never run this configuration in production"
            );
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|err| KeyResolutionError::ClientBuild(err.to_string()))?;

        Ok(Self::with_client(client, config.jwks_url.clone()))
    }

    /// Build a resolver around an existing client, e.g. one shared by the
    /// host service or pointed at a test endpoint.
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Determine which key signed `token` and return it.
    ///
    /// Reads the token header for its `kid` — a metadata read only, no trust
    /// decision. On cache miss the full key set is fetched once; a `kid` the
    /// provider does not publish fails with `UnknownKeyId`.
    pub async fn resolve_signing_key(
        &self,
        token: &str,
    ) -> Result<DecodingKey, KeyResolutionError> {
        let header = decode_header(token)
            .map_err(|err| KeyResolutionError::InvalidHeader(err.to_string()))?;
        let kid = header.kid.ok_or(KeyResolutionError::MissingKeyId)?;

        if let Some(key) = self.cached(&kid) {
            debug!(kid, "signing key cache hit");
            return Ok(key);
        }

        debug!(kid, jwks_url = %self.url, "signing key cache miss; fetching key set");
        self.refresh().await?;

        self.cached(&kid)
            .ok_or(KeyResolutionError::UnknownKeyId(kid))
    }

    /// Fetch the current key set and replace the cache with it.
    ///
    /// Returns the number of keys fetched. An empty key set leaves the
    /// existing cache in place so a provider incident cannot wipe
    /// known-good keys. Callers wanting periodic refresh drive this from
    /// their own schedule.
    pub async fn refresh(&self) -> Result<usize, KeyResolutionError> {
        let keys = self.fetch_key_set().await?;
        let count = keys.len();
        if count > 0 {
            let mut guard = self.cache.write().expect("rwlock poisoned");
            guard.clear();
            guard.extend(keys);
        }
        debug!(count, jwks_url = %self.url, "refreshed key set");
        Ok(count)
    }

    fn cached(&self, kid: &str) -> Option<DecodingKey> {
        let guard = self.cache.read().expect("rwlock poisoned");
        guard.get(kid).cloned()
    }

    async fn fetch_key_set(&self) -> Result<Vec<(String, DecodingKey)>, KeyResolutionError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| KeyResolutionError::Fetch(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeyResolutionError::EndpointStatus(status));
        }

        let body: KeySetResponse = response
            .json()
            .await
            .map_err(|err| KeyResolutionError::Decode(err.to_string()))?;

        body.keys.into_iter().map(decoding_key_for).collect()
    }
}

fn decoding_key_for(entry: KeyEntry) -> Result<(String, DecodingKey), KeyResolutionError> {
    let kid = entry.kid.ok_or(KeyResolutionError::EntryMissingKid)?;

    let kty = entry.kty.unwrap_or_else(|| "RSA".to_string());
    if kty != "RSA" {
        return Err(KeyResolutionError::UnsupportedKeyType { kid, kty });
    }

    if let Some(alg) = entry.alg {
        if alg != "RS256" {
            return Err(KeyResolutionError::UnsupportedAlg { kid, alg });
        }
    }

    let modulus = entry
        .n
        .ok_or_else(|| KeyResolutionError::MissingComponents(kid.clone()))?;
    let exponent = entry
        .e
        .ok_or_else(|| KeyResolutionError::MissingComponents(kid.clone()))?;

    let key = DecodingKey::from_rsa_components(&modulus, &exponent)
        .map_err(|err| KeyResolutionError::KeyParse(kid.clone(), err.to_string()))?;
    Ok((kid, key))
}

#[derive(Debug, Deserialize)]
struct KeySetResponse {
    keys: Vec<KeyEntry>,
}

#[derive(Debug, Deserialize)]
struct KeyEntry {
    kid: Option<String>,
    kty: Option<String>,
    alg: Option<String>,
    n: Option<String>,
    e: Option<String>,
}
