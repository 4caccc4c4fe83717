//! Application use cases. Orchestrate domain logic via ports.

pub mod group_flow;
pub mod notification_service;
pub mod phone_normalizer;

pub use group_flow::{FlowEvent, FlowState};
pub use notification_service::{DispatchSettings, GroupDispatchReport, NotificationService};
pub use phone_normalizer::PhoneNormalizer;
