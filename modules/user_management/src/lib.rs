//! User directory with an in-memory activity log.
//!
//! Layout follows the usual module shape: `contract` for in-process
//! consumers, `domain` for rules and ports, `infra` for SeaORM storage and
//! the log sink, `api::rest` for the HTTP surface.

pub mod api;
pub mod config;
pub mod contract;
pub mod domain;
pub mod errors;
pub mod gateways;
pub mod infra;
pub mod module;

pub use config::UserManagementConfig;
pub use contract::client::UserManagementApi;
pub use contract::error::UserManagementError;
pub use module::UserManagement;
