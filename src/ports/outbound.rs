//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{DeliveryOutcome, ProviderRequest, RegionPlan};

/// Messaging provider gateway. One call, one network round-trip.
#[async_trait::async_trait]
pub trait DeliveryPort: Send + Sync {
    /// Send `request` and classify the response.
    ///
    /// Never retries and never returns an error: every failure mode is folded
    /// into `Rejected` or `TransientFailure`.
    async fn execute(&self, request: &ProviderRequest) -> DeliveryOutcome;

    /// Adapter name for logs (e.g. "whatsapp", "mock").
    fn name(&self) -> &'static str;
}

/// Source of phone-number validity rules. Swappable so tests and deployments
/// can inject their own tables.
pub trait NumberingPlan: Send + Sync {
    /// Plan for an ISO 3166 alpha-2 region code (case-insensitive).
    fn region(&self, region: &str) -> Option<&RegionPlan>;

    /// All regions sharing a country calling code (e.g. US and CA for 1).
    fn regions_for_code(&self, calling_code: u16) -> Vec<&RegionPlan>;
}
