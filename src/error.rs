use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Failures while determining which signing key should verify a token.
#[derive(Debug, Error)]
pub enum KeyResolutionError {
    #[error("failed to decode token header: {0}")]
    InvalidHeader(String),
    #[error("token missing kid header")]
    MissingKeyId,
    #[error("no signing key published for kid '{0}'")]
    UnknownKeyId(String),
    #[error("failed to build HTTPS client: {0}")]
    ClientBuild(String),
    #[error("failed to fetch key set: {0}")]
    Fetch(String),
    #[error("key-set endpoint returned HTTP {0}")]
    EndpointStatus(StatusCode),
    #[error("failed to parse key-set response: {0}")]
    Decode(String),
    #[error("key-set entry missing key id (kid)")]
    EntryMissingKid,
    #[error("key '{0}' missing required RSA components")]
    MissingComponents(String),
    #[error("key '{kid}' uses unsupported key type '{kty}'")]
    UnsupportedKeyType { kid: String, kty: String },
    #[error("key '{kid}' uses unsupported alg '{alg}'")]
    UnsupportedAlg { kid: String, alg: String },
    #[error("failed to parse signing key for kid '{0}': {1}")]
    KeyParse(String, String),
}

/// Failures while checking a token against a resolved signing key.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("token declares unsupported algorithm {0}")]
    UnsupportedAlgorithm(String),
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token not yet valid")]
    NotYetValid,
    #[error("issuer claim does not match configured issuer")]
    WrongIssuer,
    #[error("audience claim does not match expected audience")]
    WrongAudience,
    #[error("token missing required claim '{0}'")]
    MissingClaim(String),
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("malformed claim payload: {0}")]
    InvalidClaims(String),
}

impl From<jsonwebtoken::errors::Error> for VerificationError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match value.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidIssuer => Self::WrongIssuer,
            ErrorKind::InvalidAudience => Self::WrongAudience,
            ErrorKind::InvalidAlgorithm => {
                Self::UnsupportedAlgorithm("not permitted for this key".to_string())
            }
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(claim.clone()),
            _ => Self::Malformed(value.to_string()),
        }
    }
}

/// Internal cause of a rejection, retained for diagnostics only.
#[derive(Debug, Error)]
pub enum AuthCause {
    #[error("authorization header missing")]
    MissingAuthorization,
    #[error("authorization header malformed")]
    InvalidAuthorization,
    #[error(transparent)]
    KeyResolution(#[from] KeyResolutionError),
    #[error(transparent)]
    Verification(#[from] VerificationError),
}

/// Uniform rejection returned to callers of `authenticate`.
///
/// The display message and HTTP response are identical for every cause so the
/// response surface cannot be probed to distinguish failure modes; the
/// underlying cause is available through [`AuthError::cause`] for logging.
#[derive(Debug, Error)]
#[error("invalid authentication credentials")]
pub struct AuthError {
    cause: AuthCause,
}

impl AuthError {
    pub fn cause(&self) -> &AuthCause {
        &self.cause
    }
}

impl From<AuthCause> for AuthError {
    fn from(cause: AuthCause) -> Self {
        Self { cause }
    }
}

impl From<KeyResolutionError> for AuthError {
    fn from(value: KeyResolutionError) -> Self {
        Self {
            cause: AuthCause::KeyResolution(value),
        }
    }
}

impl From<VerificationError> for AuthError {
    fn from(value: VerificationError) -> Self {
        Self {
            cause: AuthCause::Verification(value),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: "UNAUTHENTICATED",
            message: self.to_string(),
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}
