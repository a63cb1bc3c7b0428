use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimUser {
    pub id: String,
}

/// Token payload. Owner id comes from `sub`, or from the nested
/// `{ "user": { "id" } }` shape older tokens carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    // user id as hex string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ClaimUser>,
    // expiry (unix timestamp seconds)
    pub exp: usize,
}

impl Claims {
    fn owner_hex(&self) -> Option<&str> {
        self.sub
            .as_deref()
            .or_else(|| self.user.as_ref().map(|u| u.id.as_str()))
    }
}

/// Issues and verifies the bearer tokens that identify an owner.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: String,
}

impl TokenVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn verify(&self, token: &str) -> Result<ObjectId, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Missing);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| AuthError::Invalid)?;

        let hex = data.claims.owner_hex().ok_or(AuthError::Invalid)?;
        ObjectId::parse_str(hex).map_err(|_| AuthError::Invalid)
    }

    pub fn issue(&self, user_id: &ObjectId, hours: i64) -> Result<String, String> {
        let exp = (Utc::now() + Duration::hours(hours)).timestamp() as usize;

        let claims = Claims {
            sub: Some(user_id.to_hex()),
            user: None,
            exp,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| e.to_string())
    }
}
