use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::repo_types::{encode_sequence, NewUser, ProfilePatch, UserRow};

/// Persistence for user records. The only component that mutates them.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert with defaults for every omitted column; returns the new id.
    async fn create(&self, user: NewUser) -> anyhow::Result<Uuid>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserRow>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserRow>>;
    /// Unconditional overwrite; `None` clears.
    async fn update_refresh_token(&self, id: Uuid, token: Option<&str>) -> anyhow::Result<()>;
    async fn update_profile(&self, id: Uuid, patch: &ProfilePatch) -> anyhow::Result<()>;
    async fn update_last_login(&self, id: Uuid) -> anyhow::Result<()>;
}

const USER_COLUMNS: &str = r#"
    id, email, password_hash, first_name, last_name, phone,
    email_verified, phone_verified, profile_picture, bio,
    location, city, state, zip_code, selected_causes,
    followed_organizations, push_notifications, email_notifications,
    organization_updates, cause_alerts, onboarding_completed,
    refresh_token, password_reset_token, password_reset_expires,
    created_at, updated_at, last_login_at
"#;

#[derive(Clone)]
pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create(&self, user: NewUser) -> anyhow::Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .fetch_one(&self.db)
        .await?;
        Ok(id)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_refresh_token(&self, id: Uuid, token: Option<&str>) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET refresh_token = $1, updated_at = now() WHERE id = $2"#)
            .bind(token)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn update_profile(&self, id: Uuid, patch: &ProfilePatch) -> anyhow::Result<()> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        {
            let mut set = qb.separated(", ");
            let text_fields = [
                ("first_name", &patch.first_name),
                ("last_name", &patch.last_name),
                ("phone", &patch.phone),
                ("bio", &patch.bio),
                ("location", &patch.location),
                ("city", &patch.city),
                ("state", &patch.state),
                ("zip_code", &patch.zip_code),
                ("profile_picture", &patch.profile_picture),
            ];
            for (column, value) in text_fields {
                if let Some(v) = value {
                    set.push(format!("{column} = "));
                    set.push_bind_unseparated(v.clone());
                }
            }

            let sequence_fields = [
                ("selected_causes", &patch.selected_causes),
                ("followed_organizations", &patch.followed_organizations),
            ];
            for (column, value) in sequence_fields {
                if let Some(v) = value {
                    set.push(format!("{column} = "));
                    set.push_bind_unseparated(encode_sequence(v)?);
                }
            }

            let flag_fields = [
                ("push_notifications", patch.push_notifications),
                ("email_notifications", patch.email_notifications),
                ("organization_updates", patch.organization_updates),
                ("cause_alerts", patch.cause_alerts),
                ("onboarding_completed", patch.onboarding_completed),
            ];
            for (column, value) in flag_fields {
                if let Some(v) = value {
                    set.push(format!("{column} = "));
                    set.push_bind_unseparated(v);
                }
            }

            set.push("updated_at = now()");
        }
        qb.push(" WHERE id = ").push_bind(id);

        qb.build().execute(&self.db).await?;
        Ok(())
    }

    async fn update_last_login(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET last_login_at = now(), updated_at = now() WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
