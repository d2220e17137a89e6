pub mod access_guard;
pub mod anchor_compat;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod instruction_layouts;
pub mod ledger;
pub mod registry_layout;
pub mod registry_service;
pub mod status_log;
