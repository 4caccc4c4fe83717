//! wa-dispatch: WhatsApp Business notification dispatch core with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
