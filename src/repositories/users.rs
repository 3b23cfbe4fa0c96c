//! User account storage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::conflict_on_unique;
use crate::domain::aggregates::User;
use crate::domain::value_objects::{Pagination, Role};
use crate::Result;

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
}

/// Column updates. `None` leaves a column untouched; the nested option on
/// nullable columns distinguishes "clear" from "keep".
#[derive(Clone, Debug, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub image: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub role: Option<Role>,
    pub is_blocked: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.image.is_none() && self.phone.is_none()
            && self.address.is_none() && self.role.is_none() && self.is_blocked.is_none()
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> Result<User>;
    async fn update(&self, id: Uuid, changes: UserChanges, now: DateTime<Utc>) -> Result<Option<User>>;
    async fn set_password(&self, id: Uuid, password_hash: &str, now: DateTime<Utc>) -> Result<()>;
    async fn list(&self, page: Pagination) -> Result<(Vec<User>, i64)>;
}

pub struct PgUserRepository { pool: PgPool }

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

const EMAIL_TAKEN: &str = "email already registered";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> Result<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, email, password_hash, phone, address, role, is_blocked, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8, $8) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(user.role.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, EMAIL_TAKEN))
    }

    async fn update(&self, id: Uuid, changes: UserChanges, now: DateTime<Utc>) -> Result<Option<User>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = ");
        qb.push_bind(now);
        if let Some(username) = changes.username { qb.push(", username = ").push_bind(username); }
        if let Some(email) = changes.email { qb.push(", email = ").push_bind(email); }
        if let Some(image) = changes.image { qb.push(", image = ").push_bind(image); }
        if let Some(phone) = changes.phone { qb.push(", phone = ").push_bind(phone); }
        if let Some(address) = changes.address { qb.push(", address = ").push_bind(address); }
        if let Some(role) = changes.role { qb.push(", role = ").push_bind(role.as_str()); }
        if let Some(blocked) = changes.is_blocked { qb.push(", is_blocked = ").push_bind(blocked); }
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        qb.build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, EMAIL_TAKEN))
    }

    async fn set_password(&self, id: Uuid, password_hash: &str, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self, page: Pagination) -> Result<(Vec<User>, i64)> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users").fetch_one(&self.pool).await?;
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2")
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok((users, total))
    }
}
