use crate::capability::PluginCapabilities;

/// A host-registered plugin. Implementors are either statically linked into
/// the binary or loaded by the host process behind a narrow, versioned
/// C-ABI boundary before being boxed here — the registry does not care which.
pub trait Plugin: Send + Sync {
    fn capabilities(&self) -> PluginCapabilities;

    fn init(&mut self) -> Result<(), String>;
    fn start(&mut self) -> Result<(), String>;
    fn stop(&mut self) -> Result<(), String>;

    /// Snapshot state before a hot reload. `None` means the plugin has no
    /// state to preserve across reload.
    fn save_state(&self) -> Option<Vec<u8>> {
        None
    }

    /// Restore state captured by a previous `save_state` call, on the new
    /// instance that will take over after `reload`.
    fn restore_state(&mut self, _state: &[u8]) -> Result<(), String> {
        Ok(())
    }
}
