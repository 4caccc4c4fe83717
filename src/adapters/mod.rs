//! Infrastructure adapters. Implement outbound ports.
//!
//! WhatsApp Cloud API, numbering plans, terminal UI.

pub mod numbering;
pub mod ui;
pub mod whatsapp;
