pub mod capability;
pub mod error;
pub mod lifecycle;
pub mod manifest;
pub mod plugin_trait;
pub mod registry;

pub use capability::PluginCapabilities;
pub use error::PluginError;
pub use lifecycle::PluginState;
pub use manifest::{PluginManifest, PluginVersion};
pub use plugin_trait::Plugin;
pub use registry::PluginRegistry;
