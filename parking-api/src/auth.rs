//! Authentication Module
//!
//! Bearer-token authentication for the parkings API. Users log in with an
//! email and password (bcrypt hashes in the `users` table) and receive a
//! short-lived access token plus a long-lived refresh token. Both are HMAC
//! signed JWTs carrying the user id in `sub` and the token kind in `type`.

use crate::error::{ApiError, ApiResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use parking_core::{ConfigError, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

// ============================================================================
// CLOCK ABSTRACTION
// ============================================================================

/// Clock used for issuing and validating token timestamps.
///
/// Time checks are done here rather than inside `jsonwebtoken` so tests can
/// pin the clock.
pub trait JwtClock: Send + Sync {
    /// Current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
pub mod test_clocks {
    use super::FixedClock;

    /// 2024-01-01 00:00:00 UTC
    pub fn valid() -> FixedClock {
        FixedClock(1704067200)
    }

    /// 2030-01-01 00:00:00 UTC
    pub fn future() -> FixedClock {
        FixedClock(1893456000)
    }
}

// ============================================================================
// JWT SECRET
// ============================================================================

/// JWT signing secret that never shows up in logs.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// # Errors
    /// Returns error if the secret is empty.
    pub fn new(secret: String) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "jwt_secret".to_string(),
            });
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value (only for cryptographic operations).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// JWT secret key for signing and verification
    pub jwt_secret: JwtSecret,

    /// HMAC algorithm (default: HS256)
    pub jwt_algorithm: Algorithm,

    /// Access token lifetime in seconds (default: 30 minutes)
    pub access_expiration_secs: i64,

    /// Refresh token lifetime in seconds (default: 7 days)
    pub refresh_expiration_secs: i64,

    /// Tolerated clock drift when checking `exp`
    pub jwt_clock_skew_secs: i64,

    /// Clock for JWT time validation (injected for testing)
    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("access_expiration_secs", &self.access_expiration_secs)
            .field("refresh_expiration_secs", &self.refresh_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: build_jwt_secret(INSECURE_DEFAULT_SECRET.to_string()),
            jwt_algorithm: Algorithm::HS256,
            access_expiration_secs: 30 * 60,
            refresh_expiration_secs: 7 * 24 * 60 * 60,
            jwt_clock_skew_secs: 0,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: signing secret
    /// - `JWT_ALGORITHM`: HS256, HS384 or HS512 (default: HS256)
    /// - `JWT_ACCESS_EXPIRES_MINUTES`: access token lifetime (default: 30)
    /// - `JWT_REFRESH_EXPIRES_DAYS`: refresh token lifetime (default: 7)
    /// - `JWT_CLOCK_SKEW_SECS`: tolerated drift (default: 0)
    pub fn from_env() -> Self {
        let secret_str =
            std::env::var("JWT_SECRET").unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string());

        let jwt_algorithm = std::env::var("JWT_ALGORITHM")
            .ok()
            .map(|raw| parse_hmac_algorithm(&raw))
            .unwrap_or(Algorithm::HS256);

        let access_minutes: i64 = std::env::var("JWT_ACCESS_EXPIRES_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let refresh_days: i64 = std::env::var("JWT_REFRESH_EXPIRES_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(7);

        Self {
            jwt_secret: build_jwt_secret(secret_str),
            jwt_algorithm,
            access_expiration_secs: access_minutes * 60,
            refresh_expiration_secs: refresh_days * 24 * 60 * 60,
            jwt_clock_skew_secs: std::env::var("JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            clock: Arc::new(SystemClock),
        }
    }

    /// Refuse insecure secrets when `PARKING_ENVIRONMENT` is production.
    ///
    /// Outside production the same problems are only logged.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        let environment = std::env::var("PARKING_ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase();

        let is_production = environment == "production" || environment == "prod";

        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "Cannot start server in production with insecure JWT secret. \
                     Set JWT_SECRET to a secure value. PARKING_ENVIRONMENT={}",
                    environment
                )));
            }
            tracing::warn!(
                "Using insecure default JWT secret. Set JWT_SECRET before deploying."
            );
        }

        if self.jwt_secret.len() < 32 {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "JWT secret is too short for production use ({} chars). \
                     It must be at least 32 characters long.",
                    self.jwt_secret.len()
                )));
            } else if !self.jwt_secret.is_insecure_default() {
                tracing::warn!(
                    length = self.jwt_secret.len(),
                    "JWT secret is short; use at least 32 characters in production"
                );
            }
        }

        Ok(())
    }
}

fn parse_hmac_algorithm(raw: &str) -> Algorithm {
    match raw.trim().to_uppercase().as_str() {
        "HS256" => Algorithm::HS256,
        "HS384" => Algorithm::HS384,
        "HS512" => Algorithm::HS512,
        other => {
            tracing::warn!(algorithm = other, "Unsupported JWT algorithm, using HS256");
            Algorithm::HS256
        }
    }
}

fn build_jwt_secret(secret_str: String) -> JwtSecret {
    let normalized = if secret_str.trim().is_empty() {
        INSECURE_DEFAULT_SECRET.to_string()
    } else {
        secret_str
    };

    match JwtSecret::new(normalized) {
        Ok(secret) => secret,
        Err(_) => JwtSecret(SecretString::new(INSECURE_DEFAULT_SECRET.to_string().into())),
    }
}

// ============================================================================
// JWT CLAIMS
// ============================================================================

/// Which of the two token kinds a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    fn lifetime_secs(self, config: &AuthConfig) -> i64 {
        match self {
            TokenType::Access => config.access_expiration_secs,
            TokenType::Refresh => config.refresh_expiration_secs,
        }
    }
}

/// JWT claims structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id rendered as a string)
    pub sub: String,

    /// Token kind; a missing or unknown value fails the type check
    #[serde(rename = "type", default)]
    pub token_type: Option<TokenType>,

    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: UserId, token_type: TokenType, expiration_secs: i64, clock: &dyn JwtClock) -> Self {
        let now = clock.now_epoch_secs();

        Self {
            sub: user_id.to_string(),
            token_type: Some(token_type),
            iat: now,
            exp: now + expiration_secs,
        }
    }

    pub fn is_expired(&self, clock: &dyn JwtClock) -> bool {
        self.exp < clock.now_epoch_secs()
    }

    /// Parse the subject back into a user id.
    pub fn user_id(&self) -> ApiResult<UserId> {
        self.sub
            .parse::<UserId>()
            .map_err(|_| ApiError::unauthorized("Invalid token subject"))
    }
}

// ============================================================================
// AUTHENTICATION CONTEXT
// ============================================================================

/// Authenticated caller, injected into request extensions by the middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
}

impl AuthContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    /// Reject access to another user's resources.
    pub fn ensure_user(&self, user_id: UserId) -> ApiResult<()> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(ApiError::forbidden("Forbidden"))
        }
    }
}

/// Token pair returned by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

// ============================================================================
// TOKEN FUNCTIONS
// ============================================================================

fn validate_claim_times(now: i64, exp: i64, leeway_secs: i64) -> ApiResult<()> {
    if exp < now - leeway_secs {
        return Err(ApiError::token_expired());
    }
    Ok(())
}

/// Generate a signed token of the given kind for a user.
pub fn generate_token(config: &AuthConfig, user_id: UserId, token_type: TokenType) -> ApiResult<String> {
    let claims = Claims::new(
        user_id,
        token_type,
        token_type.lifetime_secs(config),
        &*config.clock,
    );

    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    let header = Header::new(config.jwt_algorithm);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

/// Issue a fresh access/refresh pair.
pub fn issue_token_pair(config: &AuthConfig, user_id: UserId) -> ApiResult<TokenPair> {
    Ok(TokenPair {
        access_token: generate_token(config, user_id, TokenType::Access)?,
        refresh_token: generate_token(config, user_id, TokenType::Refresh)?,
        token_type: "bearer".to_string(),
    })
}

/// Verify a token's signature, expiry and kind.
///
/// `jsonwebtoken` only checks the signature and the presence of `exp`; the
/// expiry itself is checked against the configured clock.
pub fn validate_token(config: &AuthConfig, token: &str, expected: TokenType) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = HashSet::from(["exp".to_string()]);

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::invalid_token("Token signature is invalid")
            }
            _ => ApiError::invalid_token("Invalid token"),
        })?;

    let claims = token_data.claims;

    let now = config.clock.now_epoch_secs();
    if now < 0 {
        tracing::error!(timestamp = now, "System clock returned pre-epoch time");
        return Err(ApiError::internal_error(
            "Server time configuration error - please contact support",
        ));
    }

    validate_claim_times(now, claims.exp, config.jwt_clock_skew_secs)?;

    if claims.token_type != Some(expected) {
        return Err(ApiError::invalid_token("Invalid token type"));
    }

    Ok(claims)
}

/// Authenticate an `Authorization` header value carrying an access token.
pub fn authenticate_bearer(config: &AuthConfig, auth_header: Option<&str>) -> ApiResult<AuthContext> {
    let auth_value = auth_header
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .or_else(|| auth_value.strip_prefix("bearer "))
        .ok_or_else(|| ApiError::invalid_token("Authorization header must use Bearer scheme"))?;

    let claims = validate_token(config, token.trim(), TokenType::Access)?;
    Ok(AuthContext::new(claims.user_id()?))
}

/// Exchange a refresh token for a new token pair.
pub fn refresh_token_pair(config: &AuthConfig, refresh_token: &str) -> ApiResult<TokenPair> {
    let claims = validate_token(config, refresh_token, TokenType::Refresh)?;
    issue_token_pair(config, claims.user_id()?)
}

// ============================================================================
// PASSWORDS
// ============================================================================

/// Hash a password with the default bcrypt cost.
pub fn hash_password(password: &str) -> ApiResult<String> {
    hash_password_with_cost(password, bcrypt::DEFAULT_COST)
}

pub fn hash_password_with_cost(password: &str, cost: u32) -> ApiResult<String> {
    bcrypt::hash(password, cost)
        .map_err(|e| ApiError::internal_error(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored bcrypt hash.
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match bcrypt::verify(password, password_hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be verified");
            false
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    struct EnvVarGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = std::env::var(key).ok();
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
            Self { key, previous }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.previous.as_deref() {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: JwtSecret::new("test_secret".to_string()).expect("test secret should be valid"),
            clock: Arc::new(test_clocks::valid()),
            ..Default::default()
        }
    }

    #[test]
    fn test_access_token_round_trip() -> ApiResult<()> {
        let config = test_config();

        let token = generate_token(&config, 42, TokenType::Access)?;
        let claims = validate_token(&config, &token, TokenType::Access)?;

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.user_id()?, 42);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
        assert!(!claims.is_expired(&test_clocks::valid()));
        Ok(())
    }

    #[test]
    fn test_refresh_token_rejected_as_access() -> ApiResult<()> {
        let config = test_config();
        let token = generate_token(&config, 42, TokenType::Refresh)?;

        let err = validate_token(&config, &token, TokenType::Access)
            .err()
            .ok_or_else(|| ApiError::internal_error("refresh token accepted as access"))?;
        assert_eq!(err.message, "Invalid token type");
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[test]
    fn test_expired_token() -> ApiResult<()> {
        let mut config = test_config();
        let token = generate_token(&config, 7, TokenType::Access)?;

        config.clock = Arc::new(test_clocks::future());
        let result = validate_token(&config, &token, TokenType::Access);
        assert!(matches!(result, Err(ApiError { code: ErrorCode::TokenExpired, .. })));
        Ok(())
    }

    #[test]
    fn test_wrong_secret_rejected() -> ApiResult<()> {
        let config = test_config();
        let token = generate_token(&config, 7, TokenType::Access)?;

        let other = AuthConfig {
            jwt_secret: JwtSecret::new("another_secret".to_string()).expect("secret"),
            ..test_config()
        };
        let result = validate_token(&other, &token, TokenType::Access);
        assert!(matches!(result, Err(ApiError { code: ErrorCode::InvalidToken, .. })));
        Ok(())
    }

    #[test]
    fn test_non_numeric_subject() -> ApiResult<()> {
        let config = test_config();
        let claims = Claims {
            sub: "not-a-number".to_string(),
            token_type: Some(TokenType::Access),
            iat: 1704067200,
            exp: 1704067200 + 60,
        };
        let key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
        let token = encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| ApiError::internal_error(e.to_string()))?;

        let err = authenticate_bearer(&config, Some(&format!("Bearer {}", token)))
            .err()
            .ok_or_else(|| ApiError::internal_error("bad subject accepted"))?;
        assert_eq!(err.message, "Invalid token subject");
        Ok(())
    }

    #[test]
    fn test_authenticate_bearer() -> ApiResult<()> {
        let config = test_config();
        let token = generate_token(&config, 5, TokenType::Access)?;

        let ctx = authenticate_bearer(&config, Some(&format!("Bearer {}", token)))?;
        assert_eq!(ctx.user_id, 5);

        assert!(authenticate_bearer(&config, None).is_err());
        assert!(authenticate_bearer(&config, Some(&format!("Basic {}", token))).is_err());
        Ok(())
    }

    #[test]
    fn test_refresh_token_pair() -> ApiResult<()> {
        let config = test_config();
        let pair = issue_token_pair(&config, 9)?;
        assert_eq!(pair.token_type, "bearer");

        let refreshed = refresh_token_pair(&config, &pair.refresh_token)?;
        let claims = validate_token(&config, &refreshed.access_token, TokenType::Access)?;
        assert_eq!(claims.user_id()?, 9);

        assert!(refresh_token_pair(&config, &pair.access_token).is_err());
        Ok(())
    }

    #[test]
    fn test_ensure_user() {
        let ctx = AuthContext::new(3);
        assert!(ctx.ensure_user(3).is_ok());
        let err = ctx.ensure_user(4).err();
        assert!(matches!(err, Some(ApiError { code: ErrorCode::Forbidden, .. })));
    }

    #[test]
    fn test_password_hash_and_verify() -> ApiResult<()> {
        let hash = hash_password_with_cost("s3cret", 4)?;
        assert!(hash.starts_with("$2"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret", "not-a-bcrypt-hash"));
        Ok(())
    }

    #[test]
    fn test_parse_hmac_algorithm() {
        assert_eq!(parse_hmac_algorithm("hs512"), Algorithm::HS512);
        assert_eq!(parse_hmac_algorithm("RS256"), Algorithm::HS256);
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = JwtSecret::new("super-secret-value".to_string()).expect("secret");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret-value"));
        assert!(JwtSecret::new(String::new()).is_err());
    }

    #[test]
    fn test_from_env_lifetimes() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _minutes = EnvVarGuard::set("JWT_ACCESS_EXPIRES_MINUTES", Some("15"));
        let _days = EnvVarGuard::set("JWT_REFRESH_EXPIRES_DAYS", Some("1"));

        let config = AuthConfig::from_env();
        assert_eq!(config.access_expiration_secs, 15 * 60);
        assert_eq!(config.refresh_expiration_secs, 24 * 60 * 60);
    }

    #[test]
    fn test_production_validation_allows_secure_secret() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _env_guard = EnvVarGuard::set("PARKING_ENVIRONMENT", Some("production"));

        let config = AuthConfig {
            jwt_secret: JwtSecret::new(
                "this-is-a-very-secure-secret-that-is-at-least-32-characters-long".to_string(),
            )
            .expect("test secret should be valid"),
            ..Default::default()
        };

        assert!(config.validate_for_production().is_ok());
    }

    #[test]
    fn test_production_validation_rejects_insecure_default() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _env_guard = EnvVarGuard::set("PARKING_ENVIRONMENT", Some("production"));

        let config = AuthConfig::default();
        assert!(config.validate_for_production().is_err());
    }

    #[test]
    fn test_development_allows_insecure_default() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _env_guard = EnvVarGuard::set("PARKING_ENVIRONMENT", None);

        let config = AuthConfig::default();
        assert!(config.validate_for_production().is_ok());
    }
}
