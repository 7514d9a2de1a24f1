use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::de::DeserializeOwned;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::claims::{AccessClaims, RefreshClaims};
use crate::config::JwtConfig;
use crate::error::AppError;

/// Signs and validates access and refresh tokens.
///
/// Stateless: output depends only on the claims, the secret and the clock.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self::new(
            &cfg.secret,
            Duration::from_secs((cfg.access_ttl_minutes.max(0) as u64) * 60),
            Duration::from_secs((cfg.refresh_ttl_minutes.max(0) as u64) * 60),
        )
    }

    pub fn issue_access_token(&self, user_id: Uuid, email: &str) -> Result<String, AppError> {
        self.issue_access_token_at(user_id, email, OffsetDateTime::now_utc())
    }

    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, AppError> {
        self.issue_refresh_token_at(user_id, OffsetDateTime::now_utc())
    }

    fn issue_access_token_at(
        &self,
        user_id: Uuid,
        email: &str,
        now: OffsetDateTime,
    ) -> Result<String, AppError> {
        let exp = now + TimeDuration::seconds(self.access_ttl.as_secs() as i64);
        let claims = AccessClaims {
            user_id,
            email: email.to_string(),
            jti: Uuid::new_v4(),
            iat: now.unix_timestamp(),
            nbf: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };
        let token = self.sign(&claims)?;
        debug!(user_id = %user_id, jti = %claims.jti, "access token signed");
        Ok(token)
    }

    fn issue_refresh_token_at(
        &self,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<String, AppError> {
        let exp = now + TimeDuration::seconds(self.refresh_ttl.as_secs() as i64);
        let claims = RefreshClaims {
            sub: user_id,
            jti: Uuid::new_v4(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };
        let token = self.sign(&claims)?;
        debug!(user_id = %user_id, jti = %claims.jti, "refresh token signed");
        Ok(token)
    }

    fn sign<T: serde::Serialize>(&self, claims: &T) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("jwt encode: {e}")))
    }

    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, AppError> {
        let mut validation = Self::validation();
        validation.validate_nbf = true;
        let claims: AccessClaims = self.decode(token, &validation)?;
        debug!(user_id = %claims.user_id, "access token verified");
        Ok(claims)
    }

    /// Returns the subject of a valid refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Uuid, AppError> {
        let claims: RefreshClaims = self.decode(token, &Self::validation())?;
        debug!(user_id = %claims.sub, "refresh token verified");
        Ok(claims.sub)
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation
    }

    fn decode<T: DeserializeOwned>(
        &self,
        token: &str,
        validation: &Validation,
    ) -> Result<T, AppError> {
        decode::<T>(token, &self.decoding, validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::ImmatureSignature
                | ErrorKind::InvalidKeyFormat => AppError::TokenInvalid,
                _ => AppError::TokenMalformed,
            })
    }
}
