//! Kubecred Service: the issuance and verification HTTP services.
//!
//! Both services share one credential store contract; each process owns an
//! explicitly constructed store handle that is passed to its protocol object.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod server;
pub mod telemetry;

pub use config::{ServiceConfig, ServiceKind};
pub use server::{build_app, open_store};
