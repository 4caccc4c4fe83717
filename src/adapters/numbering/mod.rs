//! Numbering plan adapters. Implement NumberingPlan from static tables.

pub mod static_plan;

pub use static_plan::StaticNumberingPlan;
