//! Admission validation and defaulting for chaos-mesh.org resources
//!
//! Every chaos kind, `Schedule`, `Workflow` and `StatusCheck` is typed in
//! [`crd`]. Fields carry validation tags resolved through the
//! [`validation`] registry; a structural walk fills defaults and then
//! collects every field error. [`webhooks`] turns those walks into
//! admission responses.

pub mod crd;
pub mod error;
pub mod health;
pub mod migrate;
pub mod validation;
pub mod webhooks;

pub use crd::{ChaosKind, ChaosObject, Schedule, StatusCheck, Workflow, decode_chaos};
pub use error::{AdmissionError, Result};
pub use health::{HealthState, Metrics};
pub use webhooks::{
    Dispatcher, WebhookConfig, WebhookError, WebhookState, create_webhook_router,
    run_webhook_server,
};
