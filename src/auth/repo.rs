use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User, UserChanges, UserRow};

/// Persisted user records, keyed on a unique (already normalized) email.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Returns `None` when the email is already taken.
    async fn insert(&self, user: NewUser) -> anyhow::Result<Option<User>>;
    async fn list(&self, skip: i64, limit: i64) -> anyhow::Result<Vec<User>>;
    /// Returns `None` when no user has this id.
    async fn update(&self, id: Uuid, changes: UserChanges) -> anyhow::Result<Option<User>>;
}

const USER_COLUMNS: &str =
    "id, email, password_hash, name, role, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn insert(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        // The unique index settles concurrent registrations of the same email.
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, name, role, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .fetch_optional(&self.db)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn list(&self, skip: i64, limit: i64) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY created_at ASC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET name          = COALESCE($2, name),
                   password_hash = COALESCE($3, password_hash),
                   role          = COALESCE($4, role),
                   is_active     = COALESCE($5, is_active),
                   updated_at    = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.password_hash)
        .bind(changes.role.map(|r| r.as_str()))
        .bind(changes.is_active)
        .fetch_optional(&self.db)
        .await?;
        row.map(User::try_from).transpose()
    }
}

#[cfg(test)]
pub use memory::MemoryUserStore;

#[cfg(test)]
mod memory {
    use std::sync::Mutex;

    use time::OffsetDateTime;

    use super::*;

    /// In-process store backing handler tests.
    #[derive(Default)]
    pub struct MemoryUserStore {
        users: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.email == email).cloned())
        }

        async fn insert(&self, new: NewUser) -> anyhow::Result<Option<User>> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.email == new.email) {
                return Ok(None);
            }
            let user = User {
                id: Uuid::new_v4(),
                email: new.email,
                password_hash: new.password_hash,
                name: new.name,
                role: new.role,
                is_active: new.is_active,
                created_at: OffsetDateTime::now_utc(),
                updated_at: None,
            };
            users.push(user.clone());
            Ok(Some(user))
        }

        async fn list(&self, skip: i64, limit: i64) -> anyhow::Result<Vec<User>> {
            let users = self.users.lock().unwrap();
            Ok(users
                .iter()
                .skip(skip as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn update(&self, id: Uuid, changes: UserChanges) -> anyhow::Result<Option<User>> {
            let mut users = self.users.lock().unwrap();
            let Some(user) = users.iter_mut().find(|u| u.id == id) else {
                return Ok(None);
            };
            if let Some(name) = changes.name {
                user.name = name;
            }
            if let Some(hash) = changes.password_hash {
                user.password_hash = hash;
            }
            if let Some(role) = changes.role {
                user.role = role;
            }
            if let Some(active) = changes.is_active {
                user.is_active = active;
            }
            user.updated_at = Some(OffsetDateTime::now_utc());
            Ok(Some(user.clone()))
        }
    }
}
