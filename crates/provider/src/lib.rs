//! Alibaba Cloud NAS Provider
//!
//! Resource handlers for NAS access rules and SMB ACL attachments, together
//! with the signed API client, retry policy and schema machinery they share.

pub mod client;
pub mod config;
pub mod provider;
pub mod resources;
pub mod retry;
pub mod schema;
pub mod service;
pub mod signer;
pub mod state;

#[cfg(test)]
mod testing;

pub use client::{NasApi, NasClient, RequestParams};
pub use config::ProviderConfig;
pub use provider::NasProvider;
pub use schema::{Diagnostic, PlanAction, PlannedChange, Schema, Severity};
pub use state::DynamicValue;
