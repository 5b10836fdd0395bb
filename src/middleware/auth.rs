//! Middleware de autenticación JWT
//!
//! Verifica el bearer token e inserta el [`Actor`] del llamante en las
//! extensiones de la request. Los handlers lo leen con `Extension<Actor>`.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{
    models::auth::Actor,
    utils::{
        errors::AppError,
        jwt::{claims_to_actor, extract_token_from_header, verify_token, JwtConfig},
    },
};

/// Resuelve el header `Authorization` a un [`Actor`]
pub fn authenticate(auth_header: Option<&str>, config: &JwtConfig) -> Result<Actor, AppError> {
    let auth_header = auth_header.ok_or_else(|| AppError::Unauthorized("Authorization token required".to_string()))?;
    let token = extract_token_from_header(auth_header)?;
    let claims = verify_token(token, config)?;
    claims_to_actor(&claims)
}

/// Rechaza requests sin autenticar; si no, inyecta el actor
pub async fn auth_middleware(
    State(config): State<JwtConfig>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let actor = authenticate(header_value, &config)?;
    debug!("Authenticated {} as {}", actor.user_id, actor.role.as_str());

    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::UserRole;
    use crate::utils::jwt::generate_token;
    use uuid::Uuid;

    #[test]
    fn test_authenticate_valid_token() {
        let config = JwtConfig::new("secret");
        let actor = Actor {
            user_id: Uuid::new_v4(),
            role: UserRole::Manager,
            assigned_vehicle_id: None,
        };
        let header_value = format!("Bearer {}", generate_token(&actor, &config).unwrap());

        assert_eq!(authenticate(Some(&header_value), &config).unwrap(), actor);
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let err = authenticate(None, &JwtConfig::new("secret")).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
