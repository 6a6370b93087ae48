use chrono::Utc;
use paycontrol_core::{
    Actor, AuditAction, AuditEntry, CoreError, EntityKind, NewUser, Recorded, User, UserPatch,
};
use tracing::info;
use uuid::Uuid;

use crate::{PaymentControl, not_found};

impl PaymentControl {
    pub async fn get_user(&self, id: Uuid) -> Result<User, CoreError> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| not_found("user", id))
    }

    pub async fn list_users(&self) -> Result<Vec<User>, CoreError> {
        Ok(self.store.list_users().await?)
    }

    pub async fn create_user(
        &self,
        actor: &Actor,
        input: NewUser,
    ) -> Result<Recorded<User>, CoreError> {
        let input = input.normalized()?;

        if self.store.user_email_taken(&input.email).await? {
            return Err(CoreError::DuplicateKey {
                field: "email",
                value: input.email,
            });
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: input.name,
            email: input.email,
            active: true,
            created_at: now,
            updated_at: now,
            deleted: false,
        };
        self.store.insert_user(&user).await?;

        info!(user_id = %user.id, "user created");

        let audit = AuditEntry::new(
            actor,
            AuditAction::Create,
            EntityKind::User,
            user.id,
            format!("Usuário criado: {}", user.email),
        );

        Ok(Recorded::new(user, audit))
    }

    pub async fn update_user(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: UserPatch,
    ) -> Result<Recorded<User>, CoreError> {
        let mut user = self.get_user(id).await?;
        let patch = patch.normalized()?;

        if let Some(email) = patch.email {
            if email != user.email {
                if self.store.user_email_taken(&email).await? {
                    return Err(CoreError::DuplicateKey {
                        field: "email",
                        value: email,
                    });
                }
                user.email = email;
            }
        }
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(active) = patch.active {
            user.active = active;
        }
        user.updated_at = Utc::now();

        self.store.update_user(&user).await?;

        let audit = AuditEntry::new(
            actor,
            AuditAction::Update,
            EntityKind::User,
            user.id,
            format!("Usuário atualizado: {}", user.email),
        );

        Ok(Recorded::new(user, audit))
    }

    /// Soft-deleted users are also deactivated.
    pub async fn delete_user(&self, actor: &Actor, id: Uuid) -> Result<Recorded<()>, CoreError> {
        let mut user = self.get_user(id).await?;
        user.deleted = true;
        user.active = false;
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;

        info!(user_id = %user.id, "user soft-deleted");

        let audit = AuditEntry::new(
            actor,
            AuditAction::Delete,
            EntityKind::User,
            user.id,
            format!("Usuário excluído: {}", user.email),
        );

        Ok(Recorded::new((), audit))
    }
}
