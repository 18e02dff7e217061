use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user ID
    #[serde(rename = "isAdmin")]
    pub is_admin: bool, // admin flag at issuance
    pub iat: i64,    // issued at (unix timestamp)
    pub exp: i64,    // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}

/// Identity attached to a request once its token has been verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl From<Claims> for AuthContext {
    fn from(c: Claims) -> Self {
        Self {
            user_id: c.sub,
            is_admin: c.is_admin,
        }
    }
}
