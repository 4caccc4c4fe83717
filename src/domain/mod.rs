//! Core domain layer. No external I/O dependencies.
//!
//! Entities, value types and the batch summary live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod phone;
pub mod request;
pub mod summary;
pub mod template;

pub use entities::{
    CANCELLED_REASON, DeliveryOutcome, GroupHandle, OutcomeKind, ProviderAck, Recipient,
    RecipientOutcome, TIMEOUT_REASON,
};
pub use errors::{DomainError, NotANumber, RequestError};
pub use phone::{NormalizedPhoneNumber, RegionPlan};
pub use request::{HttpMethod, ProviderRequest, RequestKind};
pub use summary::{DispatchSummary, SummaryBuilder};
pub use template::MessageTemplate;
