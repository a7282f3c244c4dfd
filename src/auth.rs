use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    repository::RepositoryState,
    scope::{Principal, PrincipalKind},
};

/// Header accepted in `Env::Local` instead of a token: `x-principal: <kind>:<id>`.
pub const PRINCIPAL_HEADER: &str = "x-principal";

/// Claims
///
/// The payload of issued bearer tokens. `sub` is the row id in the table selected by
/// `kind`, so the same id space can be reused by all three principal tables.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: i64,
    pub kind: PrincipalKind,
    /// Expiration Time (exp): always validated.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// issue_token
///
/// Signs an HS256 token for `kind`/`id` that expires after the configured TTL.
pub fn issue_token(config: &AppConfig, kind: PrincipalKind, id: i64) -> Result<String, ApiError> {
    let now = Utc::now().timestamp().max(0) as usize;
    let claims = Claims {
        sub: id,
        kind,
        iat: now,
        exp: now + config.token_ttl_secs as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
}

/// Decodes and validates a bearer token. Any failure maps to `Unauthorized`.
pub fn decode_token(config: &AppConfig, token: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
            other => tracing::debug!(reason = ?other, "rejected invalid token"),
        }
        ApiError::Unauthorized
    })
}

fn parse_principal_header(value: &str) -> Option<(PrincipalKind, i64)> {
    let (kind, id) = value.split_once(':')?;
    Some((PrincipalKind::parse(kind.trim())?, id.trim().parse().ok()?))
}

/// Principal Extractor Implementation
///
/// Makes `Principal` usable as a handler argument. Resolution order:
/// 1. A principal already resolved by the auth middleware (request extensions).
/// 2. Local Bypass: the `x-principal` header, only in `Env::Local`.
/// 3. Token Validation: `Authorization: Bearer <jwt>`.
/// 4. DB Lookup: the principal and its scope facts are re-loaded, so deleted or
///    deactivated accounts are rejected even with a valid token.
///
/// Rejection: `ApiError::Unauthorized` (401) on any authentication failure.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(principal.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass = parts
                .headers
                .get(PRINCIPAL_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_principal_header);
            if let Some((kind, id)) = bypass {
                if let Some(principal) = repo.load_principal(kind, id).await? {
                    return Ok(principal);
                }
            }
        }
        // In production, or when the bypass did not resolve, fall through to the token.

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let claims = decode_token(&config, token)?;

        repo.load_principal(claims.kind, claims.sub)
            .await?
            .ok_or(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_header_parses_kind_and_id() {
        assert_eq!(
            parse_principal_header("ba:12"),
            Some((PrincipalKind::Ba, 12))
        );
        assert_eq!(
            parse_principal_header(" admin : 3 "),
            Some((PrincipalKind::Admin, 3))
        );
        assert_eq!(parse_principal_header("root:1"), None);
        assert_eq!(parse_principal_header("user:abc"), None);
        assert_eq!(parse_principal_header("user"), None);
    }

    #[test]
    fn issued_tokens_decode_with_the_same_secret_only() {
        let config = AppConfig::default();
        let token = issue_token(&config, PrincipalKind::User, 42).unwrap();
        let claims = decode_token(&config, &token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.kind, PrincipalKind::User);

        let other = AppConfig {
            jwt_secret: "another-secret".into(),
            ..AppConfig::default()
        };
        assert!(matches!(
            decode_token(&other, &token),
            Err(ApiError::Unauthorized)
        ));
    }
}
