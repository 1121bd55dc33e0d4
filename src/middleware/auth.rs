use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    #[default]
    User,
    Merchant,
    ConsultationClient,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub kind: TokenKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous_id: Option<String>,
}

impl Claims {
    pub fn subject_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| Error::Unauthorized("Session expired".to_string()))
    }

    /// User id of a regular account token.
    pub fn user_id(&self) -> Result<Uuid> {
        if self.kind != TokenKind::User {
            return Err(Error::Forbidden("Unauthorized".to_string()));
        }
        self.subject_id()
    }

    pub fn has_role(&self, role: Role) -> bool {
        let wanted = role.as_str();
        self.role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(wanted))
            || self.roles.iter().any(|r| r.eq_ignore_ascii_case(wanted))
    }

    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        allowed.iter().any(|role| self.has_role(*role))
    }

    pub fn primary_role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }
}

fn sign(claims: &Claims) -> Result<String> {
    let config = crate::config::get_config();
    let token = encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;
    Ok(token)
}

fn expiry_from_now() -> usize {
    let hours = crate::config::get_config().jwt_expiry_hours;
    (Utc::now() + Duration::hours(hours)).timestamp() as usize
}

pub fn issue_user_token(user_id: Uuid, role: &str, roles: &[String], email: &str) -> Result<String> {
    sign(&Claims {
        sub: user_id.to_string(),
        exp: expiry_from_now(),
        role: Some(role.to_string()),
        roles: roles.to_vec(),
        email: Some(email.to_string()),
        kind: TokenKind::User,
        anonymous_id: None,
    })
}

pub fn issue_merchant_token(merchant_id: Uuid, email: &str) -> Result<String> {
    sign(&Claims {
        sub: merchant_id.to_string(),
        exp: expiry_from_now(),
        role: Some("MERCHANT".to_string()),
        roles: Vec::new(),
        email: Some(email.to_string()),
        kind: TokenKind::Merchant,
        anonymous_id: None,
    })
}

/// Token handed to an anonymous client after paying for a session. It stays
/// valid for a week past the session end so the client can still leave a review.
pub fn issue_session_token(
    session_id: Uuid,
    anonymous_id: &str,
    ends_at: DateTime<Utc>,
) -> Result<String> {
    sign(&Claims {
        sub: session_id.to_string(),
        exp: (ends_at + Duration::days(7)).timestamp() as usize,
        role: None,
        roles: Vec::new(),
        email: None,
        kind: TokenKind::ConsultationClient,
        anonymous_id: Some(anonymous_id.to_string()),
    })
}

pub fn decode_token(token: &str) -> Result<Claims> {
    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

fn bearer_claims(req: &Request) -> std::result::Result<Claims, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(unauthorized("missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(unauthorized("bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(unauthorized("unsupported_scheme"));
    };
    decode_token(token.trim()).map_err(|_| unauthorized("invalid_token"))
}

/// Accepts any valid token kind.
pub async fn require_bearer_auth(mut req: Request, next: Next) -> Response {
    match bearer_claims(&req) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

/// Accepts regular account tokens only. An empty `allowed` list admits any role.
pub async fn require_roles(mut req: Request, next: Next, allowed: &[Role]) -> Response {
    let claims = match bearer_claims(&req) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };
    if claims.kind != TokenKind::User {
        return (StatusCode::FORBIDDEN, Json(json!({"error":"forbidden"}))).into_response();
    }
    if !allowed.is_empty() && !claims.has_any_role(allowed) {
        return (StatusCode::FORBIDDEN, Json(json!({"error":"forbidden"}))).into_response();
    }
    req.extensions_mut().insert(claims);
    next.run(req).await
}

pub async fn require_user(req: Request, next: Next) -> Response {
    require_roles(req, next, &[]).await
}

pub async fn require_employer(req: Request, next: Next) -> Response {
    require_roles(req, next, &[Role::Employer, Role::Admin]).await
}

pub async fn require_worker(req: Request, next: Next) -> Response {
    require_roles(req, next, &[Role::Artisan, Role::Doctor, Role::Lawyer]).await
}

pub async fn require_artisan(req: Request, next: Next) -> Response {
    require_roles(req, next, &[Role::Artisan]).await
}

pub async fn require_professional(req: Request, next: Next) -> Response {
    require_roles(req, next, &[Role::Doctor, Role::Lawyer]).await
}

pub async fn require_license_checker(req: Request, next: Next) -> Response {
    require_roles(req, next, &[Role::Doctor, Role::Lawyer, Role::Admin]).await
}

pub async fn require_admin(req: Request, next: Next) -> Response {
    require_roles(req, next, &[Role::Admin]).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Option<&str>, roles: &[&str]) -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            exp: 0,
            role: role.map(str::to_string),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            email: None,
            kind: TokenKind::User,
            anonymous_id: None,
        }
    }

    #[test]
    fn role_checks_consider_primary_and_extra_roles() {
        let c = claims(Some("EMPLOYER"), &["ARTISAN"]);
        assert!(c.has_role(Role::Employer));
        assert!(c.has_role(Role::Artisan));
        assert!(!c.has_role(Role::Doctor));
        assert!(c.has_any_role(&[Role::Doctor, Role::Artisan]));
    }

    #[test]
    fn non_user_tokens_have_no_user_id() {
        let mut c = claims(None, &[]);
        c.kind = TokenKind::ConsultationClient;
        assert!(matches!(c.user_id(), Err(Error::Forbidden(_))));
    }

    #[test]
    fn missing_kind_defaults_to_user() {
        let raw = r#"{"sub":"abc","exp":1,"role":"CLIENT"}"#;
        let c: Claims = serde_json::from_str(raw).unwrap();
        assert_eq!(c.kind, TokenKind::User);
        assert!(c.roles.is_empty());
    }
}
