//! Request extractors: authentication plus JSON, path and query wrappers
//! whose rejections use the crate's `{"error": ..}` body.

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::extract::CookieJar;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use uuid::Uuid;

use crate::domain::value_objects::Role;
use crate::services::TokenKind;
use crate::state::AppState;
use crate::EcommerceError;

/// `axum::Json` with malformed bodies rejected as 400.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(EcommerceError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(EcommerceError))]
pub struct PathParam<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(EcommerceError))]
pub struct QueryParams<T>(pub T);

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// The caller, taken from the `access_token` cookie or a bearer header.
#[derive(Clone, Debug)]
pub struct AuthUser { pub id: Uuid, pub email: String, pub role: Role }

/// An [`AuthUser`] whose role is `admin`.
#[derive(Clone, Debug)]
pub struct AdminUser(pub AuthUser);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let cookie = CookieJar::from_headers(&parts.headers).get(ACCESS_COOKIE).map(|c| c.value().to_string());
        let token = match cookie {
            Some(token) => token,
            None => {
                let TypedHeader(Authorization(bearer)) = parts
                    .extract::<TypedHeader<Authorization<Bearer>>>()
                    .await
                    .map_err(|_| EcommerceError::Unauthorized("authentication required".into()))?;
                bearer.token().to_string()
            }
        };

        let claims = state.tokens.verify(&token, TokenKind::Access)?;
        Ok(AuthUser { id: claims.sub, email: claims.email, role: claims.role })
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            tracing::warn!(user_id = %user.id, "admin route denied");
            return Err(EcommerceError::Forbidden("admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}
