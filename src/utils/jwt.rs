//! Utilidades JWT
//!
//! Los tokens los emite el proveedor de identidad; este servicio solo los
//! verifica. `generate_token` existe para herramientas y tests.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::{
    config::environment::EnvironmentConfig,
    models::auth::{Actor, JwtClaims, UserRole},
    utils::errors::AppError,
};

const DEFAULT_EXPIRATION_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration: u64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiration: DEFAULT_EXPIRATION_SECS,
        }
    }
}

impl From<&EnvironmentConfig> for JwtConfig {
    fn from(config: &EnvironmentConfig) -> Self {
        Self::new(config.jwt_secret.clone())
    }
}

/// Emite un token para `actor`
pub fn generate_token(actor: &Actor, config: &JwtConfig) -> Result<String, AppError> {
    let now = chrono::Utc::now();
    let expires_at = now + chrono::Duration::seconds(config.expiration as i64);

    let claims = JwtClaims {
        sub: actor.user_id.to_string(),
        role: actor.role.as_str().to_string(),
        assigned_vehicle_id: actor.assigned_vehicle_id.map(|id| id.to_string()),
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    let encoding_key = EncodingKey::from_secret(config.secret.as_ref());

    encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| AppError::Jwt(format!("Error generating token: {}", e)))
}

/// Verifica y decodifica un token
pub fn verify_token(token: &str, config: &JwtConfig) -> Result<JwtClaims, AppError> {
    let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

    let token_data = decode::<JwtClaims>(token, &decoding_key, &Validation::default())
        .map_err(|e| AppError::Jwt(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims)
}

/// Convierte los claims verificados en la identidad del llamante
pub fn claims_to_actor(claims: &JwtClaims) -> Result<Actor, AppError> {
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Jwt("Token subject is not a valid user id".to_string()))?;
    let role = UserRole::from_str(&claims.role)
        .ok_or_else(|| AppError::Jwt(format!("Unknown role '{}'", claims.role)))?;
    let assigned_vehicle_id = claims
        .assigned_vehicle_id
        .as_deref()
        .map(Uuid::parse_str)
        .transpose()
        .map_err(|_| AppError::Jwt("Assigned vehicle is not a valid id".to_string()))?;

    Ok(Actor {
        user_id,
        role,
        assigned_vehicle_id,
    })
}

/// Extrae el token del valor del header `Authorization`
pub fn extract_token_from_header(auth_header: &str) -> Result<&str, AppError> {
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Authorization header must start with 'Bearer '".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AppError::Unauthorized("Empty bearer token".to_string()));
    }

    Ok(token)
}
