//! Admission webhooks for chaos resources
//!
//! One mutating and one validating endpoint serve every kind in the
//! dispatcher's table. Both run the same defaulting and validation walk;
//! only the mutating endpoint returns the defaulted spec as a patch.

mod config;
mod dispatcher;
mod server;

use thiserror::Error;

pub use config::{HEALTH_PORT, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookConfig};
pub use dispatcher::{
    AdmissionObject, Decision, Dispatcher, KindEntry, ReviewInput, admit_create, admit_delete,
    admit_update, kinds,
};
pub use server::{
    AdmissionRequest, AdmissionResponse, AdmissionReview, AdmissionReviewResponse,
    AdmissionStatus, GroupVersionKind, WebhookState, create_webhook_router, run_webhook_server,
};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::Operation;

/// Errors that can occur when running the webhook server
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("invalid value {value:?} for {name}")]
    Config { name: &'static str, value: String },

    #[error("TLS configuration error: {0}")]
    TlsConfig(#[source] std::io::Error),

    #[error("webhook server error: {0}")]
    Server(#[source] std::io::Error),
}
