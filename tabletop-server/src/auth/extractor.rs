//! Principal Extractor
//!
//! 无 Authorization 头 → `Principal::Customer`；有头但令牌无效 → 401。

use axum::extract::FromRequestParts;
use http::HeaderMap;
use http::request::Parts;

use crate::auth::{JwtError, JwtService, Principal};
use crate::core::ServerState;
use crate::security_log;
use crate::utils::AppError;

/// Resolve the caller from request headers
pub fn principal_from_headers(headers: &HeaderMap, jwt: &JwtService) -> Result<Principal, AppError> {
    let Some(value) = headers.get(http::header::AUTHORIZATION) else {
        return Ok(Principal::Customer);
    };

    let token = value
        .to_str()
        .ok()
        .and_then(JwtService::extract_from_header)
        .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?;

    jwt.decode_principal(token).map_err(|e| {
        security_log!("WARN", "auth_failed", error = e.to_string());
        match e {
            JwtError::ExpiredToken => AppError::token_expired(),
            _ => AppError::invalid_token(e.to_string()),
        }
    })
}

impl FromRequestParts<ServerState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(principal.clone());
        }

        let principal = principal_from_headers(&parts.headers, &state.jwt)?;
        parts.extensions.insert(principal.clone());
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtConfig;
    use chrono::Duration;
    use http::HeaderValue;
    use shared::error::ErrorCode;
    use shared::models::StaffRole;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::AUTHORIZATION,
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn test_missing_header_is_customer() {
        let jwt = JwtService::with_config(JwtConfig::default());
        assert_eq!(
            principal_from_headers(&HeaderMap::new(), &jwt).unwrap(),
            Principal::Customer
        );
    }

    #[test]
    fn test_bearer_token_decoded() {
        let jwt = JwtService::with_config(JwtConfig::default());
        let token = jwt
            .issue(3, "Chef", StaffRole::Cook, Duration::minutes(5))
            .unwrap();
        let principal = principal_from_headers(&headers(&format!("Bearer {token}")), &jwt).unwrap();
        assert_eq!(principal.role(), Some(StaffRole::Cook));
        assert_eq!(principal.staff_id(), Some(3));
    }

    #[test]
    fn test_bad_credentials_are_401() {
        let jwt = JwtService::with_config(JwtConfig::default());

        let err = principal_from_headers(&headers("Token abc"), &jwt).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);

        let err = principal_from_headers(&headers("Bearer not-a-jwt"), &jwt).unwrap_err();
        assert_eq!(err.http_status(), http::StatusCode::UNAUTHORIZED);

        let expired = jwt
            .issue(3, "Chef", StaffRole::Cook, Duration::hours(-2))
            .unwrap();
        let err = principal_from_headers(&headers(&format!("Bearer {expired}")), &jwt).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
    }
}
