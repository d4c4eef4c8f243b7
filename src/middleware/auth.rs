use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::profile::UserRole;
use crate::services::access_control::Caller;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub email: Option<String>,
}

/// Verified caller identity, before any role resolution.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
}

pub(crate) fn decode_claims(
    token: &str,
    secret: &[u8],
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
}

fn authenticate(req: &Request) -> Result<AuthUser, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(unauthorized("missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(unauthorized("bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(unauthorized("unsupported_scheme"));
    };

    let config = crate::config::get_config();
    match decode_claims(token, config.jwt_secret.as_bytes()) {
        Ok(claims) => Ok(AuthUser {
            uid: claims.sub,
            email: claims.email,
        }),
        Err(_) => Err(unauthorized("invalid_token")),
    }
}

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

fn forbidden(message: &str) -> Response {
    (StatusCode::FORBIDDEN, Json(json!({ "error": message }))).into_response()
}

pub async fn require_bearer_auth(mut req: Request, next: Next) -> Response {
    let user = match authenticate(&req) {
        Ok(user) => user,
        Err(response) => return response,
    };
    req.extensions_mut().insert(user);
    next.run(req).await
}

/// Bearer auth plus the caller's stored role. A missing profile surfaces as
/// 404, distinct from a role mismatch.
pub async fn require_profile(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let user = match authenticate(&req) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let role = match state.profile_service.role_of(&user.uid).await {
        Ok(role) => role,
        Err(err) => return err.into_response(),
    };
    req.extensions_mut().insert(Caller {
        uid: user.uid.clone(),
        role,
    });
    req.extensions_mut().insert(user);
    next.run(req).await
}

pub async fn require_job_seeker(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let user = match authenticate(&req) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let role = match state.profile_service.role_of(&user.uid).await {
        Ok(role) => role,
        Err(err) => return err.into_response(),
    };
    if role != UserRole::JobSeeker {
        return forbidden("Access denied. Job seeker role required.");
    }
    req.extensions_mut().insert(Caller {
        uid: user.uid.clone(),
        role,
    });
    req.extensions_mut().insert(user);
    next.run(req).await
}

pub async fn require_recruiter(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let user = match authenticate(&req) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let role = match state.profile_service.role_of(&user.uid).await {
        Ok(role) => role,
        Err(err) => return err.into_response(),
    };
    if role != UserRole::Recruiter {
        return forbidden("Access denied. Recruiter role required.");
    }
    req.extensions_mut().insert(Caller {
        uid: user.uid.clone(),
        role,
    });
    req.extensions_mut().insert(user);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn mint(claims: &Claims, secret: &[u8]) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_the_subject() {
        let claims = Claims {
            sub: "uid-123".to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
            email: Some("a@example.com".to_string()),
        };
        let token = mint(&claims, b"secret");
        let decoded = decode_claims(&token, b"secret").unwrap();
        assert_eq!(decoded.sub, "uid-123");
        assert_eq!(decoded.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn expired_or_tampered_tokens_are_rejected() {
        let expired = Claims {
            sub: "uid-123".to_string(),
            exp: (chrono::Utc::now().timestamp() - 3600) as usize,
            email: None,
        };
        let token = mint(&expired, b"secret");
        assert!(decode_claims(&token, b"secret").is_err());

        let fresh = Claims {
            sub: "uid-123".to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
            email: None,
        };
        let token = mint(&fresh, b"secret");
        assert!(decode_claims(&token, b"wrong-secret").is_err());
    }
}
