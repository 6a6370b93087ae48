use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SYSTEM_ACTOR: &str = "Sistema";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditAction {
    #[serde(rename = "CREATE")]
    Create,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
    #[serde(rename = "STATUS_CHANGE")]
    StatusChange,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::StatusChange => "STATUS_CHANGE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CREATE" => Some(AuditAction::Create),
            "UPDATE" => Some(AuditAction::Update),
            "DELETE" => Some(AuditAction::Delete),
            "STATUS_CHANGE" => Some(AuditAction::StatusChange),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntityKind {
    #[serde(rename = "EMPENHO")]
    Commitment,
    #[serde(rename = "CONTRATO")]
    Contract,
    #[serde(rename = "FORNECEDOR")]
    Supplier,
    #[serde(rename = "USUARIO")]
    User,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Commitment => "EMPENHO",
            EntityKind::Contract => "CONTRATO",
            EntityKind::Supplier => "FORNECEDOR",
            EntityKind::User => "USUARIO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EMPENHO" => Some(EntityKind::Commitment),
            "CONTRATO" => Some(EntityKind::Contract),
            "FORNECEDOR" => Some(EntityKind::Supplier),
            "USUARIO" => Some(EntityKind::User),
            _ => None,
        }
    }
}

/// Identity already resolved by the authentication layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub name: String,
}

impl Actor {
    pub fn new(user_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
        }
    }

    /// Name written to the audit trail.
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() { SYSTEM_ACTOR } else { name }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor: String,
    pub action: AuditAction,
    pub entity: EntityKind,
    pub entity_id: Uuid,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor: &Actor,
        action: AuditAction,
        entity: EntityKind,
        entity_id: Uuid,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.display_name().to_string(),
            action,
            entity,
            entity_id,
            details: details.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditQuery {
    pub entity: Option<EntityKind>,
    pub action: Option<AuditAction>,
    pub entity_id: Option<Uuid>,
    pub limit: i64,
}

/// Outcome of an accepted mutation: the new state plus the audit entry the
/// caller must persist.
#[derive(Debug, Clone)]
pub struct Recorded<T> {
    pub value: T,
    pub audit: AuditEntry,
}

impl<T> Recorded<T> {
    pub fn new(value: T, audit: AuditEntry) -> Self {
        Self { value, audit }
    }
}
