use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service container already initialized")]
    AlreadyInitialized,

    #[error("service container not initialized")]
    NotInitialized,

    #[error("startup step {step:?} failed: {reason}")]
    StartupFailed { step: &'static str, reason: String },
}
