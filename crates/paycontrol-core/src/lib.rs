pub mod budget;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod models;
pub mod requests;
pub mod storage;

pub use budget::{BudgetCheck, MissingContractPolicy, check_budget};
pub use error::CoreError;
pub use events::{Actor, AuditAction, AuditEntry, AuditQuery, EntityKind, Recorded};
pub use lifecycle::{StatusTransition, can_transition, ensure_mutable};
pub use models::{
    Commitment, CommitmentStatus, Contract, ContractStatus, StatusTotals, Supplier, User,
};
pub use requests::{
    CommitmentPatch, ContractPatch, NewCommitment, NewContract, NewSupplier, NewUser,
    SupplierPatch, UserPatch,
};
pub use storage::{
    AuditLog, CommitmentStore, CommitmentVersion, ContractStore, Store, SupplierStore,
    UniqueViolation, UserStore,
};
