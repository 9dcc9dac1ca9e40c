use std::time::{SystemTime, UNIX_EPOCH};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use domain::{LoginRequest, LoginResponse, RegisterRequest, Role, User};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_ttl: ChronoDuration,
    pub reset_token_ttl: ChronoDuration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret".to_string(),
            jwt_audience: "homestock".to_string(),
            jwt_issuer: "homestock-api".to_string(),
            access_token_ttl: ChronoDuration::hours(24),
            reset_token_ttl: ChronoDuration::hours(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("username already exists")]
    UsernameTaken,
    #[error("email already exists")]
    EmailTaken,
    #[error("invalid email format")]
    InvalidEmail,
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters long")]
    PasswordTooShort,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid or expired reset token")]
    ResetTokenInvalid,
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub sub: String,
    pub role: Role,
    pub aud: String,
    pub iss: String,
    pub exp: usize,
    pub iat: usize,
    pub session_id: Uuid,
    pub user_id: Uuid,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, payload: RegisterRequest) -> AuthResult<User>;
    async fn login(&self, payload: LoginRequest) -> AuthResult<LoginResponse>;
    async fn validate_token(&self, token: &str) -> AuthResult<JwtClaims>;
    async fn logout(&self, session_id: Uuid) -> AuthResult<()>;
    /// Create a single-use reset token for the given account and return the
    /// plaintext token. Only its SHA-256 hash is stored.
    async fn request_password_reset(&self, email: &str) -> AuthResult<String>;
    async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<()>;
}

#[derive(Clone)]
pub struct PasswordAuthService {
    config: AuthConfig,
    pool: PgPool,
}

impl PasswordAuthService {
    pub fn new(config: AuthConfig, pool: PgPool) -> Self {
        Self { config, pool }
    }

    fn build_jwt(
        &self,
        user: &User,
        session_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<String> {
        let issued_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| AuthError::Internal(format!("time error: {err}")))?;
        let iat = issued_at.as_secs() as usize;
        let exp = expires_at
            .timestamp()
            .try_into()
            .map_err(|err| AuthError::Internal(format!("token expiration overflow: {err}")))?;

        let claims = JwtClaims {
            sub: user.email.to_lowercase(),
            role: user.role,
            aud: self.config.jwt_audience.clone(),
            iss: self.config.jwt_issuer.clone(),
            exp,
            iat,
            session_id,
            user_id: user.id,
        };

        encode_jwt(&claims, &self.config.jwt_secret)
    }

    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<(User, String)>> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, role FROM users
             WHERE LOWER(email) = LOWER($1) LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| AuthError::Internal(format!("failed to load user: {err}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role: String = row
            .try_get("role")
            .map_err(|err| AuthError::Internal(format!("invalid user row: {err}")))?;
        let user = User {
            id: row
                .try_get("id")
                .map_err(|err| AuthError::Internal(format!("invalid user row: {err}")))?,
            username: row
                .try_get("username")
                .map_err(|err| AuthError::Internal(format!("invalid user row: {err}")))?,
            email: row
                .try_get("email")
                .map_err(|err| AuthError::Internal(format!("invalid user row: {err}")))?,
            role: Role::from_str(&role),
        };
        let password_hash: String = row
            .try_get("password_hash")
            .map_err(|err| AuthError::Internal(format!("invalid user row: {err}")))?;
        Ok(Some((user, password_hash)))
    }

    async fn create_session(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> AuthResult<Uuid> {
        let session_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO user_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|err| AuthError::Internal(format!("failed to store session: {err}")))?;
        Ok(session_id)
    }

    async fn ensure_session_active(&self, session_id: Uuid) -> AuthResult<()> {
        let row = sqlx::query("SELECT expires_at, revoked_at FROM user_sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| AuthError::Internal(format!("failed to load session: {err}")))?;

        let Some(row) = row else {
            return Err(AuthError::InvalidToken);
        };

        let expires_at: DateTime<Utc> = row
            .try_get("expires_at")
            .map_err(|err| AuthError::Internal(format!("invalid session row: {err}")))?;
        let revoked_at: Option<DateTime<Utc>> = row
            .try_get("revoked_at")
            .map_err(|err| AuthError::Internal(format!("invalid session row: {err}")))?;

        if revoked_at.is_some() || expires_at < Utc::now() {
            return Err(AuthError::InvalidToken);
        }

        Ok(())
    }
}

#[async_trait]
impl AuthService for PasswordAuthService {
    async fn register(&self, payload: RegisterRequest) -> AuthResult<User> {
        validate_email(&payload.email)?;
        validate_password(&payload.password)?;

        let username_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(username) = LOWER($1))",
        )
        .bind(&payload.username)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| AuthError::Internal(format!("failed to check username: {err}")))?;
        if username_exists {
            return Err(AuthError::UsernameTaken);
        }

        let email_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(&payload.email)
                .fetch_one(&self.pool)
                .await
                .map_err(|err| AuthError::Internal(format!("failed to check email: {err}")))?;
        if email_exists {
            return Err(AuthError::EmailTaken);
        }

        let role = payload
            .role
            .as_deref()
            .map(Role::from_str)
            .unwrap_or(Role::User);
        let password_hash = hash_password(&payload.password)
            .map_err(|err| AuthError::Internal(format!("failed to hash password: {err}")))?;

        let user = User {
            id: Uuid::new_v4(),
            username: payload.username,
            email: payload.email.to_lowercase(),
            role,
        };
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&password_hash)
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|err| AuthError::Internal(format!("failed to insert user: {err}")))?;

        Ok(user)
    }

    async fn login(&self, payload: LoginRequest) -> AuthResult<LoginResponse> {
        let Some((user, password_hash)) = self.find_user_by_email(&payload.email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        let verified = verify_password(&payload.password, &password_hash)
            .map_err(|err| AuthError::Internal(format!("failed to verify password: {err}")))?;
        if !verified {
            return Err(AuthError::InvalidCredentials);
        }

        let expires_at = Utc::now() + self.config.access_token_ttl;
        let session_id = self.create_session(user.id, expires_at).await?;
        let token = self.build_jwt(&user, session_id, expires_at)?;

        debug!(user = %user.email, "login ok");
        Ok(LoginResponse { token, user })
    }

    async fn validate_token(&self, token: &str) -> AuthResult<JwtClaims> {
        let claims = decode_jwt(
            token,
            &self.config.jwt_secret,
            &self.config.jwt_audience,
            &self.config.jwt_issuer,
        )?;
        self.ensure_session_active(claims.session_id).await?;
        Ok(claims)
    }

    async fn logout(&self, session_id: Uuid) -> AuthResult<()> {
        sqlx::query("UPDATE user_sessions SET revoked_at = NOW() WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|err| AuthError::Internal(format!("failed to revoke session: {err}")))?;
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> AuthResult<String> {
        let Some((user, _)) = self.find_user_by_email(email).await? else {
            return Err(AuthError::UserNotFound);
        };

        let token = generate_reset_token();
        let token_hash = hash_token(&token);
        let expires_at = Utc::now() + self.config.reset_token_ttl;

        sqlx::query(
            "INSERT INTO password_reset_tokens (token_hash, user_id, expires_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (token_hash)
             DO UPDATE SET expires_at = EXCLUDED.expires_at, consumed_at = NULL",
        )
        .bind(&token_hash)
        .bind(user.id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|err| AuthError::Internal(format!("failed to store reset token: {err}")))?;

        Ok(token)
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<()> {
        validate_password(new_password)?;

        let token_hash = hash_token(token);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| AuthError::Internal(format!("failed to start reset tx: {err}")))?;

        let row = sqlx::query(
            "SELECT user_id, expires_at, consumed_at FROM password_reset_tokens
             WHERE token_hash = $1 FOR UPDATE",
        )
        .bind(&token_hash)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|err| AuthError::Internal(format!("failed to load reset token: {err}")))?;

        let Some(row) = row else {
            return Err(AuthError::ResetTokenInvalid);
        };

        let expires_at: DateTime<Utc> = row
            .try_get("expires_at")
            .map_err(|err| AuthError::Internal(format!("invalid token row: {err}")))?;
        let consumed_at: Option<DateTime<Utc>> = row
            .try_get("consumed_at")
            .map_err(|err| AuthError::Internal(format!("invalid token row: {err}")))?;
        if consumed_at.is_some() || expires_at < Utc::now() {
            return Err(AuthError::ResetTokenInvalid);
        }

        let user_id: Uuid = row
            .try_get("user_id")
            .map_err(|err| AuthError::Internal(format!("invalid token row: {err}")))?;
        let password_hash = hash_password(new_password)
            .map_err(|err| AuthError::Internal(format!("failed to hash password: {err}")))?;

        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(&password_hash)
            .execute(&mut *tx)
            .await
            .map_err(|err| AuthError::Internal(format!("failed to update password: {err}")))?;

        sqlx::query("UPDATE password_reset_tokens SET consumed_at = NOW() WHERE token_hash = $1")
            .bind(&token_hash)
            .execute(&mut *tx)
            .await
            .map_err(|err| AuthError::Internal(format!("failed to consume reset token: {err}")))?;

        // Existing sessions stay valid; only the reset token is single-use.
        tx.commit()
            .await
            .map_err(|err| AuthError::Internal(format!("failed to commit reset: {err}")))?;

        Ok(())
    }
}

/// Hash a plaintext password with Argon2id and a random salt. PHC string
/// output embeds the algorithm parameters and salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(err),
    }
}

fn validate_email(email: &str) -> AuthResult<()> {
    if !email.contains('@') || !email.contains('.') {
        return Err(AuthError::InvalidEmail);
    }
    Ok(())
}

fn validate_password(password: &str) -> AuthResult<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::PasswordTooShort);
    }
    Ok(())
}

fn generate_reset_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn encode_jwt(claims: &JwtClaims, secret: &str) -> AuthResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| AuthError::Internal(format!("failed to encode jwt: {err}")))
}

fn decode_jwt(token: &str, secret: &str, audience: &str, issuer: &str) -> AuthResult<JwtClaims> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.set_audience(&[audience.to_string()]);
    validation.iss = Some(
        std::iter::once(issuer.to_string()).collect::<std::collections::HashSet<String>>(),
    );

    decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_password_roundtrip() {
        let hash = hash_password("hunter2-but-longer").expect("hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2-but-longer", &hash).expect("verify"));
        assert!(!verify_password("wrong-password", &hash).expect("verify"));
    }

    #[test]
    fn jwt_roundtrip_preserves_claims() {
        let config = AuthConfig::default();
        let now = Utc::now();
        let claims = JwtClaims {
            sub: "alice@example.com".to_string(),
            role: Role::Admin,
            aud: config.jwt_audience.clone(),
            iss: config.jwt_issuer.clone(),
            exp: (now + ChronoDuration::hours(1)).timestamp() as usize,
            iat: now.timestamp() as usize,
            session_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        };

        let token = encode_jwt(&claims, &config.jwt_secret).expect("encode");
        let decoded = decode_jwt(
            &token,
            &config.jwt_secret,
            &config.jwt_audience,
            &config.jwt_issuer,
        )
        .expect("decode");
        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.user_id, claims.user_id);
        assert_eq!(decoded.session_id, claims.session_id);
        assert_eq!(decoded.role, Role::Admin);
    }

    #[test]
    fn jwt_rejects_wrong_secret() {
        let config = AuthConfig::default();
        let now = Utc::now();
        let claims = JwtClaims {
            sub: "alice@example.com".to_string(),
            role: Role::User,
            aud: config.jwt_audience.clone(),
            iss: config.jwt_issuer.clone(),
            exp: (now + ChronoDuration::hours(1)).timestamp() as usize,
            iat: now.timestamp() as usize,
            session_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        };

        let token = encode_jwt(&claims, "secret-a").expect("encode");
        assert!(matches!(
            decode_jwt(&token, "secret-b", &config.jwt_audience, &config.jwt_issuer),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn email_and_password_validation() {
        assert!(matches!(
            validate_email("nope"),
            Err(AuthError::InvalidEmail)
        ));
        assert!(validate_email("a@x.com").is_ok());
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::PasswordTooShort)
        ));
        assert!(validate_password("long-enough").is_ok());
    }

    #[test]
    fn reset_tokens_are_unique_and_hashed() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), 48);
        assert_ne!(a, b);
        assert_ne!(hash_token(&a), hash_token(&b));
        assert_eq!(hash_token(&a), hash_token(&a));
    }
}
