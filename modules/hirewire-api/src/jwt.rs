use anyhow::{bail, Result};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ACCESS_DURATION_SECS: i64 = 60 * 60; // 1 hour
const REFRESH_DURATION_SECS: i64 = 7 * 24 * 3600; // 7 days

/// JWT Claims stored in the token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub jti: String,
}

/// Signed token pair returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// JWT service for creating and verifying tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    pub fn issue_pair(&self, user_id: Uuid, role: &str) -> Result<TokenPair> {
        Ok(TokenPair {
            access: self.create_token(user_id, role, "access", ACCESS_DURATION_SECS)?,
            refresh: self.create_token(user_id, role, "refresh", REFRESH_DURATION_SECS)?,
        })
    }

    fn create_token(
        &self,
        user_id: Uuid,
        role: &str,
        token_type: &str,
        duration_secs: i64,
    ) -> Result<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::seconds(duration_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            token_type: token_type.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }

    /// Verify an access token and return the user id it names. Refresh
    /// tokens are rejected here: they only pass the refresh endpoint.
    pub fn verify_access(&self, token: &str) -> Result<Uuid> {
        let claims = self.verify(token)?;
        if claims.token_type != "access" {
            bail!("not an access token");
        }
        Ok(Uuid::parse_str(&claims.sub)?)
    }

    /// Verify a refresh token and return the user id for re-issuing a pair.
    pub fn verify_refresh(&self, token: &str) -> Result<Uuid> {
        let claims = self.verify(token)?;
        if claims.token_type != "refresh" {
            bail!("not a refresh token");
        }
        Ok(Uuid::parse_str(&claims.sub)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> JwtService {
        JwtService::new("test-secret-key", "hirewire".to_string())
    }

    #[test]
    fn roundtrip_access_token() {
        let svc = test_service();
        let user_id = Uuid::new_v4();
        let pair = svc.issue_pair(user_id, "employee").unwrap();
        assert_eq!(svc.verify_access(&pair.access).unwrap(), user_id);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let svc = test_service();
        let pair = svc.issue_pair(Uuid::new_v4(), "employee").unwrap();
        assert!(svc.verify_access(&pair.refresh).is_err());
        assert!(svc.verify_refresh(&pair.access).is_err());
    }

    #[test]
    fn refresh_roundtrip() {
        let svc = test_service();
        let user_id = Uuid::new_v4();
        let pair = svc.issue_pair(user_id, "company").unwrap();
        assert_eq!(svc.verify_refresh(&pair.refresh).unwrap(), user_id);
    }

    #[test]
    fn rejects_invalid_token() {
        let svc = test_service();
        assert!(svc.verify_access("garbage").is_err());
    }

    #[test]
    fn rejects_wrong_secret() {
        let svc1 = JwtService::new("secret-a", "hirewire".to_string());
        let svc2 = JwtService::new("secret-b", "hirewire".to_string());
        let pair = svc1.issue_pair(Uuid::new_v4(), "employee").unwrap();
        assert!(svc2.verify_access(&pair.access).is_err());
    }

    #[test]
    fn rejects_wrong_issuer() {
        let svc1 = JwtService::new("secret", "hirewire".to_string());
        let svc2 = JwtService::new("secret", "other".to_string());
        let pair = svc1.issue_pair(Uuid::new_v4(), "employee").unwrap();
        assert!(svc2.verify_access(&pair.access).is_err());
    }
}
