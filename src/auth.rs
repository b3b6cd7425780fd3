//! Identity boundary. Account registration and login live in an external
//! auth service; this side only verifies the bearer token it minted and
//! exposes the resolved profile id to handlers.

use crate::config::Config;
use crate::errors::ApiError;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use chrono::{Duration, Utc};
use futures_util::future::{Ready, err, ok};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // profile_id
    pub exp: usize,
}

pub fn create_access_token(profile_id: &str, cfg: &Config) -> Result<String, ApiError> {
    let exp = (Utc::now() + Duration::minutes(15)).timestamp() as usize;
    let claims = Claims {
        sub: profile_id.to_string(),
        exp,
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(cfg.jwt_secret_bytes()),
    )
    .map_err(|_| ApiError::Transient)
}

pub fn verify_access_token(token: &str, cfg: &Config) -> Result<Claims, ApiError> {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = true;
    jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(cfg.jwt_secret_bytes()), &v)
        .map(|data| data.claims)
        .map_err(|_| ApiError::Unauthorized)
}

/// Resolved caller identity. Extraction fails with 401 when the bearer
/// token is absent or invalid; membership is a separate question answered
/// by the guard per request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub profile_id: String,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let cfg = req.app_data::<actix_web::web::Data<Config>>().unwrap();
        if let Some(h) = req.headers().get("Authorization") {
            if let Ok(s) = h.to_str() {
                if let Some(token) = s.strip_prefix("Bearer ") {
                    if let Ok(claims) = verify_access_token(token, cfg) {
                        return ok(AuthUser {
                            profile_id: claims.sub,
                        });
                    }
                }
            }
        }
        err(ApiError::Unauthorized)
    }
}
