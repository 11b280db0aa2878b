use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{
    repo::CredentialStore,
    repo_types::{encode_sequence, NewUser, ProfilePatch, UserRow},
};

/// Process-local store used when no database is configured, and by tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<Uuid, UserRow>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply<T: Clone>(slot: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(&self, user: NewUser) -> anyhow::Result<Uuid> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            anyhow::bail!("duplicate key value violates unique constraint \"users_email_key\"");
        }

        let now = OffsetDateTime::now_utc();
        let id = Uuid::new_v4();
        users.insert(
            id,
            UserRow {
                id,
                email: user.email,
                password_hash: user.password_hash,
                first_name: user.first_name,
                last_name: user.last_name,
                phone: user.phone,
                email_verified: false,
                phone_verified: false,
                profile_picture: None,
                bio: None,
                location: None,
                city: None,
                state: None,
                zip_code: None,
                selected_causes: None,
                followed_organizations: None,
                push_notifications: true,
                email_notifications: true,
                organization_updates: true,
                cause_alerts: true,
                onboarding_completed: false,
                refresh_token: None,
                password_reset_token: None,
                password_reset_expires: None,
                created_at: now,
                updated_at: now,
                last_login_at: None,
            },
        );
        Ok(id)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserRow>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserRow>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update_refresh_token(&self, id: Uuid, token: Option<&str>) -> anyhow::Result<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.refresh_token = token.map(str::to_owned);
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn update_profile(&self, id: Uuid, patch: &ProfilePatch) -> anyhow::Result<()> {
        let selected_causes = patch.selected_causes.as_ref().map(encode_sequence).transpose()?;
        let followed_organizations = patch
            .followed_organizations
            .as_ref()
            .map(encode_sequence)
            .transpose()?;

        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(());
        };

        apply(&mut user.first_name, &patch.first_name);
        apply(&mut user.last_name, &patch.last_name);
        apply(&mut user.phone, &patch.phone);
        apply(&mut user.bio, &patch.bio);
        apply(&mut user.location, &patch.location);
        apply(&mut user.city, &patch.city);
        apply(&mut user.state, &patch.state);
        apply(&mut user.zip_code, &patch.zip_code);
        apply(&mut user.profile_picture, &patch.profile_picture);
        apply(&mut user.selected_causes, &selected_causes);
        apply(&mut user.followed_organizations, &followed_organizations);
        apply(&mut user.push_notifications, &patch.push_notifications);
        apply(&mut user.email_notifications, &patch.email_notifications);
        apply(&mut user.organization_updates, &patch.organization_updates);
        apply(&mut user.cause_alerts, &patch.cause_alerts);
        apply(&mut user.onboarding_completed, &patch.onboarding_completed);
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn update_last_login(&self, id: Uuid) -> anyhow::Result<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            let now = OffsetDateTime::now_utc();
            user.last_login_at = Some(now);
            user.updated_at = now;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "hash".into(),
            first_name: Some("Ada".into()),
            last_name: None,
            phone: None,
        }
    }

    #[tokio::test]
    async fn create_applies_defaults() {
        let store = MemoryCredentialStore::new();
        let id = store.create(new_user("a@b.com")).await.unwrap();
        let user = store.find_by_id(id).await.unwrap().expect("user exists");

        assert_eq!(user.email, "a@b.com");
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert!(!user.email_verified && !user.phone_verified);
        assert!(user.push_notifications && user.email_notifications);
        assert!(user.organization_updates && user.cause_alerts);
        assert!(!user.onboarding_completed);
        assert!(user.refresh_token.is_none());
        assert!(user.last_login_at.is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_storage_error() {
        let store = MemoryCredentialStore::new();
        store.create(new_user("a@b.com")).await.unwrap();
        assert!(store.create(new_user("a@b.com")).await.is_err());
    }

    #[tokio::test]
    async fn lookups_are_exact_match() {
        let store = MemoryCredentialStore::new();
        store.create(new_user("a@b.com")).await.unwrap();
        assert!(store.find_by_email("a@b.com").await.unwrap().is_some());
        assert!(store.find_by_email("A@B.com").await.unwrap().is_none());
        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn refresh_token_overwrite_and_clear() {
        let store = MemoryCredentialStore::new();
        let id = store.create(new_user("a@b.com")).await.unwrap();

        store.update_refresh_token(id, Some("t1")).await.unwrap();
        store.update_refresh_token(id, Some("t2")).await.unwrap();
        let user = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.refresh_token.as_deref(), Some("t2"));

        store.update_refresh_token(id, None).await.unwrap();
        store.update_refresh_token(id, None).await.unwrap();
        let user = store.find_by_id(id).await.unwrap().unwrap();
        assert!(user.refresh_token.is_none());
    }

    #[tokio::test]
    async fn patch_leaves_absent_fields_alone() {
        let store = MemoryCredentialStore::new();
        let id = store.create(new_user("a@b.com")).await.unwrap();
        let before = store.find_by_id(id).await.unwrap().unwrap();

        let patch = ProfilePatch {
            bio: Some(Some("hello".into())),
            first_name: Some(None),
            selected_causes: Some(Some(vec![json!(1), json!(2)])),
            cause_alerts: Some(false),
            ..Default::default()
        };
        store.update_profile(id, &patch).await.unwrap();

        let after = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(after.bio.as_deref(), Some("hello"));
        assert_eq!(after.first_name, None);
        assert_eq!(after.selected_causes.as_deref(), Some("[1,2]"));
        assert!(!after.cause_alerts);
        assert!(after.push_notifications);
        assert_eq!(after.email, before.email);
        assert_eq!(after.password_hash, before.password_hash);
        assert!(after.updated_at >= before.updated_at);
    }

    #[tokio::test]
    async fn last_login_is_stamped() {
        let store = MemoryCredentialStore::new();
        let id = store.create(new_user("a@b.com")).await.unwrap();
        store.update_last_login(id).await.unwrap();
        let user = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.last_login_at, Some(user.updated_at));
    }
}
