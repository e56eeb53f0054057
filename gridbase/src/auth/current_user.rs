use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::Error;
use crate::types::UserId;
use crate::AppState;

/// The authenticated caller of a management API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub is_admin: bool,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = &state.config.auth.proxy_header;
        let value = parts
            .headers
            .get(header)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::Unauthenticated {
                message: Some(format!("Missing {header} header")),
            })?;

        let id = Uuid::parse_str(value).map_err(|_| Error::Unauthenticated {
            message: Some(format!("Invalid {header} header")),
        })?;

        Ok(CurrentUser {
            id,
            is_admin: state.config.auth.admin_users.contains(&id),
        })
    }
}
