use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{RepoError, UserRepo};
use super::repo_types::{NewUser, ProfileChanges, ResetToken, User};

/// In-process store with the same uniqueness guarantees as the users table.
#[derive(Default)]
pub struct MemoryUserRepo {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    reset_tokens: HashMap<Uuid, ResetToken>,
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == new.email) {
            return Err(RepoError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            photo: new.photo,
            phone: None,
            bio: new.bio,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, RepoError> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(phone) = changes.phone {
            user.phone = Some(phone);
        }
        if let Some(bio) = changes.bio {
            user.bio = bio;
        }
        if let Some(photo) = changes.photo {
            user.photo = photo;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool, RepoError> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn replace_reset_token(&self, token: ResetToken) -> Result<(), RepoError> {
        self.inner
            .write()
            .await
            .reset_tokens
            .insert(token.user_id, token);
        Ok(())
    }

    async fn find_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<ResetToken>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner
            .reset_tokens
            .values()
            .find(|t| t.token_hash == token_hash && t.expires_at > now)
            .cloned())
    }

    async fn delete_reset_token(&self, user_id: Uuid) -> Result<(), RepoError> {
        self.inner.write().await.reset_tokens.remove(&user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "A".into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            photo: "photo".into(),
            bio: "bio".into(),
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let repo = MemoryUserRepo::default();
        repo.create(new_user("a@a.com")).await.expect("first insert");
        let err = repo.create(new_user("a@a.com")).await.unwrap_err();
        assert!(matches!(err, RepoError::DuplicateEmail));
    }

    #[tokio::test]
    async fn update_profile_keeps_identity_and_unset_fields() {
        let repo = MemoryUserRepo::default();
        let user = repo.create(new_user("b@b.com")).await.unwrap();
        let updated = repo
            .update_profile(
                user.id,
                ProfileChanges {
                    phone: Some("555".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .expect("user exists");
        assert_eq!(updated.id, user.id);
        assert_eq!(updated.name, "A");
        assert_eq!(updated.phone.as_deref(), Some("555"));
        assert_eq!(updated.created_at, user.created_at);
    }

    #[tokio::test]
    async fn update_profile_bumps_updated_at() {
        let repo = MemoryUserRepo::default();
        let user = repo.create(new_user("c@c.com")).await.unwrap();
        assert_eq!(user.created_at, user.updated_at);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let updated = repo
            .update_profile(
                user.id,
                ProfileChanges {
                    bio: Some("new bio".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .expect("user exists");
        assert!(updated.updated_at > user.updated_at);
        assert_eq!(updated.created_at, user.created_at);
    }

    #[tokio::test]
    async fn expired_reset_token_is_not_found() {
        let repo = MemoryUserRepo::default();
        let now = OffsetDateTime::now_utc();
        repo.replace_reset_token(ResetToken {
            user_id: Uuid::new_v4(),
            token_hash: "abc".into(),
            expires_at: now - time::Duration::minutes(1),
        })
        .await
        .unwrap();
        assert!(repo.find_reset_token("abc", now).await.unwrap().is_none());
    }
}
