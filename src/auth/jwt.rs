//! JWT Token Codec
//! Mission: Issue and verify HMAC-signed bearer tokens

use crate::auth::errors::TokenError;
use crate::auth::models::{Account, Claims};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// Issuer and audience of every token
pub const SERVICE_NAME: &str = "movie-api";

/// Lifetime of an issued token
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

/// A freshly signed token with its claims
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64, // seconds
    pub claims: Claims,
}

/// Signs and verifies tokens with a symmetric secret
pub struct TokenCodec {
    secret: String,
    lifetime_hours: i64,
}

impl TokenCodec {
    /// Create a codec around the configured secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            lifetime_hours: TOKEN_LIFETIME_HOURS,
        }
    }

    /// Issue a token for an account id
    pub fn issue(&self, subject: Uuid) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, "", Utc::now())
    }

    /// Issue a token for an account, carrying its email for information
    pub fn issue_for(&self, account: &Account) -> Result<IssuedToken, TokenError> {
        self.issue_at(account.id, &account.email, Utc::now())
    }

    /// Issue a token as if the clock read `issued_at`
    pub fn issue_at(
        &self,
        subject: Uuid,
        email: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::Signing(
                "signing secret is not configured".to_string(),
            ));
        }

        let expires_at = issued_at
            .checked_add_signed(Duration::hours(self.lifetime_hours))
            .ok_or_else(|| TokenError::Signing("invalid timestamp".to_string()))?;

        let claims = Claims {
            sub: subject.to_string(),
            iss: SERVICE_NAME.to_string(),
            aud: SERVICE_NAME.to_string(),
            iat: issued_at.timestamp(),
            nbf: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            email: email.to_string(),
        };

        debug!(
            "Issuing token for {}, expires in {}h",
            subject, self.lifetime_hours
        );

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_in: self.lifetime_hours * 3600,
            claims,
        })
    }

    /// Verify a token and extract its claims
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::InvalidSignature);
        }

        let header = decode_header(token).map_err(|_| TokenError::Malformed)?;
        if !matches!(
            header.alg,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            warn!(alg = ?header.alg, "Rejected token with non-HMAC algorithm");
            return Err(TokenError::UnexpectedAlgorithm(format!("{:?}", header.alg)));
        }

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[SERVICE_NAME]);
        validation.set_audience(&[SERVICE_NAME]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);
        validation.validate_nbf = true;
        validation.leeway = 0;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| convert_jwt_error(&e))?;

        debug!("Validated token for {}", decoded.claims.sub);

        Ok(decoded.claims)
    }
}

fn convert_jwt_error(e: &jsonwebtoken::errors::Error) -> TokenError {
    match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            TokenError::Malformed
        }
        ErrorKind::InvalidAlgorithm => TokenError::UnexpectedAlgorithm("mismatched key".to_string()),
        _ => {
            debug!("Token rejected: {:?}", e);
            TokenError::InvalidSignature
        }
    }
}
