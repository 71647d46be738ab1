pub mod config;
pub mod context;
pub mod domain;
pub mod errors;
pub mod pagination;
pub mod timeparse;

pub use context::{ContextStore, PendingEdit};
pub use domain::admin::{Admin, SYSTEM_GRANTOR};
pub use domain::claim::{AdmissionOutcome, CancelOutcome, Claim, ClaimId, ClaimWithSlot, Claimant};
pub use domain::slot::{
    CapacityOutcome, DeleteOutcome, FillState, RegisterOutcome, RescheduleOutcome, Slot, SlotId,
};
pub use domain::user::{User, UserToken};
pub use errors::{ConflictKind, CoreError};
pub use pagination::Page;
