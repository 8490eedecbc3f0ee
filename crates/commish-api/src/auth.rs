//! HTTP Basic-auth extractor and password hashing.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use commish_core::store::{EventProvider, RecordStore, ScheduleStore};
use rand_core::OsRng;
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

/// Credentials accepted by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Present in a handler's arguments means the request was authenticated.
pub struct Authenticated;

/// Check the `Authorization: Basic` header against `config`.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), ApiError> {
  let encoded = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Basic "))
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;
  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  if username != config.username {
    tracing::warn!(username, "rejected unknown user");
    return Err(ApiError::Unauthorized);
  }

  let parsed = PasswordHash::new(&config.password_hash).map_err(|e| {
    tracing::error!(error = %e, "configured password hash is not a PHC string");
    ApiError::Unauthorized
  })?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .map_err(|_| ApiError::Unauthorized)
}

/// Hash `password` into the PHC string expected in `auth_password_hash`.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

impl<S, P> FromRequestParts<ApiState<S, P>> for Authenticated
where
  S: RecordStore + ScheduleStore + 'static,
  P: EventProvider + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S, P>,
  ) -> Result<Self, Self::Rejection> {
    verify_auth(&parts.headers, &state.auth)?;
    Ok(Authenticated)
  }
}
