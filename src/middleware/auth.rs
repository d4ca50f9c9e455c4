use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

/// The learner every progress operation is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i32,
}

#[derive(Clone)]
pub struct AuthConfig {
    secret: Arc<str>,
}

impl AuthConfig {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Arc::from(secret),
        }
    }

    pub fn decode_user(&self, token: &str) -> Option<AuthUser> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .ok()?;
        let user_id = data.claims.sub.parse::<i32>().ok().filter(|id| *id > 0)?;
        Some(AuthUser { user_id })
    }
}

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

pub async fn require_user(
    State(auth): State<AuthConfig>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return unauthorized("missing_authorization");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return unauthorized("bad_authorization");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthorized("unsupported_scheme");
    };

    match auth.decode_user(token) {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => unauthorized("invalid_token"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(sub: &str, secret: &str, exp_offset: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
            role: None,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn decodes_numeric_subject() {
        let auth = AuthConfig::new("s3cret");
        assert_eq!(
            auth.decode_user(&token("42", "s3cret", 3600)),
            Some(AuthUser { user_id: 42 })
        );
    }

    #[test]
    fn rejects_wrong_secret_expired_and_non_numeric() {
        let auth = AuthConfig::new("s3cret");
        assert_eq!(auth.decode_user(&token("42", "other", 3600)), None);
        assert_eq!(auth.decode_user(&token("42", "s3cret", -3600)), None);
        assert_eq!(auth.decode_user(&token("alice", "s3cret", 3600)), None);
        assert_eq!(auth.decode_user(&token("0", "s3cret", 3600)), None);
    }
}
