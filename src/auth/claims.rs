use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload of an access token.
///
/// Unknown fields are rejected so a refresh token never decodes into this
/// shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessClaims {
    pub user_id: Uuid,
    pub email: String,
    pub jti: Uuid, // unique token id
    pub iat: i64,  // issued at (unix timestamp)
    pub nbf: i64,  // not before
    pub exp: i64,  // expires at
}

/// Payload of a refresh token: subject and timing only, no email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}
