use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin {0:?} is already registered")]
    AlreadyRegistered(String),

    #[error("plugin {0:?} is not registered")]
    NotRegistered(String),

    #[error("plugin {plugin:?} checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { plugin: String, expected: String, actual: String },

    #[error("plugin {plugin:?} built for API version {plugin_api_version}, host is {host_api_version}")]
    ApiVersionMismatch { plugin: String, plugin_api_version: u32, host_api_version: u32 },

    #[error("plugin {plugin:?} lacks required permission for this operation")]
    PermissionDenied { plugin: String },

    #[error("plugin {plugin:?} invalid transition: expected phase {expected:?}, was {actual:?}")]
    InvalidTransition { plugin: String, expected: &'static str, actual: &'static str },

    #[error("plugin {0:?} init/start failed: {1}")]
    LifecycleFailed(String, String),
}
