//! Profile and admin user management

use std::sync::Arc;

use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use super::Clock;
use crate::domain::aggregates::User;
use crate::domain::value_objects::{PaginatedResponse, Pagination, Patch, Role};
use crate::repositories::{UserChanges, UserRepository};
use crate::{EcommerceError, Result};

/// Self-service profile update.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfilePatch {
    pub username: Patch<String>,
    pub email: Patch<String>,
    pub image: Patch<String>,
    pub phone: Patch<String>,
    pub address: Patch<String>,
}

/// Admin update of another account.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdminUserPatch {
    pub username: Patch<String>,
    pub image: Patch<String>,
    pub role: Patch<Role>,
    pub is_blocked: Patch<bool>,
}

impl ProfilePatch {
    fn into_changes(self) -> Result<UserChanges> {
        let email = not_null("email", self.email)?.map(|e| e.trim().to_lowercase());
        if email.as_deref().is_some_and(|e| !validator::validate_email(e)) {
            return Err(EcommerceError::Validation("email is invalid".into()));
        }
        finish(UserChanges {
            username: username(self.username)?,
            email,
            image: self.image.into_update(),
            phone: self.phone.into_update(),
            address: self.address.into_update(),
            ..UserChanges::default()
        })
    }
}

impl AdminUserPatch {
    fn into_changes(self) -> Result<UserChanges> {
        finish(UserChanges {
            username: username(self.username)?,
            image: self.image.into_update(),
            role: not_null("role", self.role)?,
            is_blocked: not_null("is_blocked", self.is_blocked)?,
            ..UserChanges::default()
        })
    }
}

fn not_null<T>(field: &str, patch: Patch<T>) -> Result<Option<T>> {
    match patch {
        Patch::Missing => Ok(None),
        Patch::Null => Err(EcommerceError::Validation(format!("{field} cannot be cleared"))),
        Patch::Value(v) => Ok(Some(v)),
    }
}

fn username(patch: Patch<String>) -> Result<Option<String>> {
    let name = not_null("username", patch)?.map(|n| n.trim().to_string());
    if name.as_deref().is_some_and(str::is_empty) {
        return Err(EcommerceError::Validation("username cannot be empty".into()));
    }
    Ok(name)
}

fn finish(changes: UserChanges) -> Result<UserChanges> {
    if changes.is_empty() {
        return Err(EcommerceError::Validation("no fields to update".into()));
    }
    Ok(changes)
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, clock: Arc<dyn Clock>) -> Self { Self { users, clock } }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        self.users.find_by_id(id).await?.ok_or_else(|| EcommerceError::NotFound("user not found".into()))
    }

    #[instrument(skip(self, patch))]
    pub async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> Result<User> {
        let changes = patch.into_changes()?;
        self.apply(id, changes).await
    }

    #[instrument(skip(self, patch))]
    pub async fn admin_update(&self, id: Uuid, patch: AdminUserPatch) -> Result<User> {
        let changes = patch.into_changes()?;
        let user = self.apply(id, changes).await?;
        tracing::info!(user_id = %user.id, role = user.role.as_str(), blocked = user.is_blocked, "user updated by admin");
        Ok(user)
    }

    pub async fn list(&self, page: Pagination) -> Result<PaginatedResponse<User>> {
        let (data, total) = self.users.list(page).await?;
        Ok(PaginatedResponse { data, total, page: page.page() })
    }

    async fn apply(&self, id: Uuid, changes: UserChanges) -> Result<User> {
        self.users.update(id, changes, self.clock.now()).await?.ok_or_else(|| EcommerceError::NotFound("user not found".into()))
    }
}
