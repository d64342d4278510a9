use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Mutex, RwLock};
use std::thread;
use std::time::Duration;

use crate::capability::PluginCapabilities;
use crate::error::PluginError;
use crate::lifecycle::{LifecycleTracker, PluginState};
use crate::manifest::PluginManifest;
use crate::plugin_trait::Plugin;

struct Slot {
    manifest: PluginManifest,
    lifecycle: LifecycleTracker,
    plugin: Mutex<Box<dyn Plugin>>,
}

/// Inert placeholder left in a slot while its real plugin runs `stop()` on a
/// helper thread. Never observed by a caller: the slot is either restored
/// with the real plugin (stop finished within the deadline) or forced into
/// `ErrorState`, at which point only `unload` touches the slot again.
struct TombstonePlugin;

impl Plugin for TombstonePlugin {
    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities::empty()
    }
    fn init(&mut self) -> Result<(), String> {
        Ok(())
    }
    fn start(&mut self) -> Result<(), String> {
        Ok(())
    }
    fn stop(&mut self) -> Result<(), String> {
        Ok(())
    }
}

/// Tracks every registered plugin's manifest, lifecycle state and boxed
/// implementation. Mutations to the slot map itself are rare (register/
/// unload); per-plugin state is independently mutexed so two plugins can
/// run their lifecycle transitions concurrently.
pub struct PluginRegistry {
    host_api_version: u32,
    slots: RwLock<HashMap<String, Slot>>,
}

impl PluginRegistry {
    pub fn new(host_api_version: u32) -> Self {
        Self { host_api_version, slots: RwLock::new(HashMap::new()) }
    }

    /// Registers and verifies a plugin, moving it into `Loaded` state.
    /// `bytes` is the plugin's code (or a representative digest source) used
    /// for checksum verification.
    pub fn register(
        &self,
        manifest: PluginManifest,
        bytes: &[u8],
        plugin: Box<dyn Plugin>,
    ) -> Result<(), PluginError> {
        manifest.verify(bytes)?;
        manifest.verify_api_version(self.host_api_version)?;

        let mut slots = self.slots.write().unwrap();
        if slots.contains_key(&manifest.id) {
            return Err(PluginError::AlreadyRegistered(manifest.id));
        }

        let lifecycle = LifecycleTracker::new();
        lifecycle.advance(PluginState::Unloaded, PluginState::Loaded).expect("fresh tracker");

        let id = manifest.id.clone();
        slots.insert(id, Slot { manifest, lifecycle, plugin: Mutex::new(plugin) });
        Ok(())
    }

    fn with_slot<T>(&self, id: &str, f: impl FnOnce(&Slot) -> Result<T, PluginError>) -> Result<T, PluginError> {
        let slots = self.slots.read().unwrap();
        let slot = slots.get(id).ok_or_else(|| PluginError::NotRegistered(id.to_string()))?;
        f(slot)
    }

    pub fn state(&self, id: &str) -> Result<PluginState, PluginError> {
        self.with_slot(id, |slot| Ok(slot.lifecycle.state()))
    }

    pub fn init(&self, id: &str) -> Result<(), PluginError> {
        self.with_slot(id, |slot| {
            slot.lifecycle
                .advance(PluginState::Loaded, PluginState::Initialized)
                .map_err(|actual| transition_error(id, "Loaded", actual))?;
            if let Err(reason) = slot.plugin.lock().unwrap().init() {
                slot.lifecycle.force(PluginState::ErrorState);
                return Err(PluginError::LifecycleFailed(id.to_string(), reason));
            }
            Ok(())
        })
    }

    pub fn start(&self, id: &str) -> Result<(), PluginError> {
        self.with_slot(id, |slot| {
            slot.lifecycle
                .advance(PluginState::Initialized, PluginState::Running)
                .map_err(|actual| transition_error(id, "Initialized", actual))?;
            if let Err(reason) = slot.plugin.lock().unwrap().start() {
                slot.lifecycle.force(PluginState::ErrorState);
                return Err(PluginError::LifecycleFailed(id.to_string(), reason));
            }
            Ok(())
        })
    }

    /// Stops the plugin, bounded by `deadline`. `Plugin::stop` runs on a
    /// detached helper thread so a plugin that blocks forever cannot hang the
    /// caller; the call returns as soon as either the thread reports back or
    /// the deadline elapses, whichever comes first. A plugin that exceeds its
    /// deadline is forced into `ErrorState` and its helper thread, wherever it
    /// is, is abandoned — the real plugin is dropped once that thread finally
    /// finishes and the channel's receiver is long gone.
    pub fn stop(&self, id: &str, deadline: Duration) -> Result<(), PluginError> {
        let taken = self.with_slot(id, |slot| {
            slot.lifecycle
                .advance(PluginState::Running, PluginState::Stopped)
                .map_err(|actual| transition_error(id, "Running", actual))?;
            let mut guard = slot.plugin.lock().unwrap();
            Ok(std::mem::replace(&mut *guard, Box::new(TombstonePlugin)))
        })?;

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut plugin = taken;
            let result = plugin.stop();
            let _ = tx.send((plugin, result));
        });

        match rx.recv_timeout(deadline) {
            Ok((plugin, result)) => {
                self.with_slot(id, |slot| {
                    *slot.plugin.lock().unwrap() = plugin;
                    Ok(())
                })?;
                if let Err(reason) = result {
                    self.with_slot(id, |slot| Ok(slot.lifecycle.force(PluginState::ErrorState)))?;
                    return Err(PluginError::LifecycleFailed(id.to_string(), reason));
                }
                Ok(())
            }
            Err(_) => {
                self.with_slot(id, |slot| Ok(slot.lifecycle.force(PluginState::ErrorState)))?;
                Err(PluginError::LifecycleFailed(id.to_string(), "stop exceeded deadline".to_string()))
            }
        }
    }

    /// Removes a plugin's slot. Only valid from `Stopped` or `ErrorState`.
    pub fn unload(&self, id: &str) -> Result<(), PluginError> {
        let mut slots = self.slots.write().unwrap();
        let slot = slots.get(id).ok_or_else(|| PluginError::NotRegistered(id.to_string()))?;
        let current = slot.lifecycle.state();
        if current != PluginState::Stopped && current != PluginState::ErrorState {
            return Err(transition_error(id, "Stopped or ErrorState", current));
        }
        slots.remove(id);
        Ok(())
    }

    /// Performs a hot reload: save-state, stop (bounded), unload, register
    /// `new_manifest`/`new_plugin`, init, restore-state, start. State is
    /// restored only after `init` so the plugin can prepare any storage it
    /// needs before receiving it back. On any failure, the previous version
    /// stays registered if it has not yet been unloaded.
    pub fn reload(
        &self,
        id: &str,
        deadline: Duration,
        new_manifest: PluginManifest,
        new_bytes: &[u8],
        new_plugin: Box<dyn Plugin>,
    ) -> Result<(), PluginError> {
        let saved_state = self.with_slot(id, |slot| Ok(slot.plugin.lock().unwrap().save_state()))?;

        self.stop(id, deadline)?;
        self.unload(id)?;
        self.register(new_manifest, new_bytes, new_plugin)?;
        self.init(id)?;

        if let Some(state) = &saved_state {
            self.with_slot(id, |slot| {
                slot.plugin
                    .lock()
                    .unwrap()
                    .restore_state(state)
                    .map_err(|reason| PluginError::LifecycleFailed(id.to_string(), reason))
            })?;
        }

        self.start(id)
    }

    pub fn capabilities(&self, id: &str) -> Result<PluginCapabilities, PluginError> {
        self.with_slot(id, |slot| Ok(slot.manifest.required_permissions))
    }

    /// Returns the ids of every registered plugin that declares `capability`.
    pub fn plugins_with_capability(&self, capability: PluginCapabilities) -> Vec<String> {
        self.slots
            .read()
            .unwrap()
            .values()
            .filter(|slot| slot.manifest.required_permissions.contains(capability))
            .map(|slot| slot.manifest.id.clone())
            .collect()
    }

    /// Fails the call unless `id` has declared `capability`. Wraps privileged
    /// dispatch so a plugin lacking a permission cannot invoke it.
    pub fn enforce_permission(&self, id: &str, capability: PluginCapabilities) -> Result<(), PluginError> {
        let caps = self.capabilities(id)?;
        if !caps.contains(capability) {
            return Err(PluginError::PermissionDenied { plugin: id.to_string() });
        }
        Ok(())
    }
}

fn transition_error(id: &str, expected: &'static str, actual: PluginState) -> PluginError {
    let actual_name = match actual {
        PluginState::Unloaded => "Unloaded",
        PluginState::Loaded => "Loaded",
        PluginState::Initialized => "Initialized",
        PluginState::Running => "Running",
        PluginState::Stopped => "Stopped",
        PluginState::ErrorState => "ErrorState",
    };
    PluginError::InvalidTransition { plugin: id.to_string(), expected, actual: actual_name }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoPlugin {
        caps: PluginCapabilities,
        started: bool,
        state: Option<Vec<u8>>,
    }

    impl Plugin for EchoPlugin {
        fn capabilities(&self) -> PluginCapabilities {
            self.caps
        }
        fn init(&mut self) -> Result<(), String> {
            Ok(())
        }
        fn start(&mut self) -> Result<(), String> {
            self.started = true;
            Ok(())
        }
        fn stop(&mut self) -> Result<(), String> {
            self.started = false;
            Ok(())
        }
        fn save_state(&self) -> Option<Vec<u8>> {
            self.state.clone()
        }
        fn restore_state(&mut self, state: &[u8]) -> Result<(), String> {
            self.state = Some(state.to_vec());
            Ok(())
        }
    }

    struct SlowPlugin {
        stop_delay: Duration,
    }

    impl Plugin for SlowPlugin {
        fn capabilities(&self) -> PluginCapabilities {
            PluginCapabilities::empty()
        }
        fn init(&mut self) -> Result<(), String> {
            Ok(())
        }
        fn start(&mut self) -> Result<(), String> {
            Ok(())
        }
        fn stop(&mut self) -> Result<(), String> {
            thread::sleep(self.stop_delay);
            Ok(())
        }
    }

    fn manifest(id: &str, bytes: &[u8], caps: PluginCapabilities) -> PluginManifest {
        PluginManifest {
            id: id.to_string(),
            name: id.to_string(),
            version: crate::manifest::PluginVersion { major: 1, minor: 0, patch: 0 },
            api_version: 1,
            checksum: PluginManifest::digest(bytes),
            required_permissions: caps,
        }
    }

    #[test]
    fn full_lifecycle_reaches_running() {
        let registry = PluginRegistry::new(1);
        let bytes = b"analytics-v1";
        let plugin = Box::new(EchoPlugin { caps: PluginCapabilities::EVENT_LISTENER, started: false, state: None });
        registry.register(manifest("analytics", bytes, PluginCapabilities::EVENT_LISTENER), bytes, plugin).unwrap();

        registry.init("analytics").unwrap();
        registry.start("analytics").unwrap();
        assert_eq!(registry.state("analytics").unwrap(), PluginState::Running);
    }

    #[test]
    fn checksum_mismatch_refuses_registration() {
        let registry = PluginRegistry::new(1);
        let mut manifest = manifest("broken", b"real-bytes", PluginCapabilities::empty());
        manifest.checksum = "deadbeef".to_string();
        let plugin = Box::new(EchoPlugin { caps: PluginCapabilities::empty(), started: false, state: None });
        let result = registry.register(manifest, b"real-bytes", plugin);
        assert!(matches!(result, Err(PluginError::ChecksumMismatch { .. })));
    }

    #[test]
    fn permission_enforcement_blocks_unlisted_capability() {
        let registry = PluginRegistry::new(1);
        let bytes = b"billing-v1";
        let plugin = Box::new(EchoPlugin { caps: PluginCapabilities::DATABASE_HOOKS, started: false, state: None });
        registry.register(manifest("billing", bytes, PluginCapabilities::DATABASE_HOOKS), bytes, plugin).unwrap();

        assert!(registry.enforce_permission("billing", PluginCapabilities::DATABASE_HOOKS).is_ok());
        assert!(matches!(
            registry.enforce_permission("billing", PluginCapabilities::WEBSOCKET),
            Err(PluginError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn reload_preserves_state_across_versions() {
        let registry = PluginRegistry::new(1);
        let bytes_v1 = b"counter-v1";
        let plugin_v1 = Box::new(EchoPlugin {
            caps: PluginCapabilities::SCHEDULER,
            started: false,
            state: Some(b"count=7".to_vec()),
        });
        registry
            .register(manifest("counter", bytes_v1, PluginCapabilities::SCHEDULER), bytes_v1, plugin_v1)
            .unwrap();
        registry.init("counter").unwrap();
        registry.start("counter").unwrap();

        let bytes_v2 = b"counter-v2";
        let plugin_v2 = Box::new(EchoPlugin { caps: PluginCapabilities::SCHEDULER, started: false, state: None });
        registry
            .reload(
                "counter",
                Duration::from_secs(1),
                manifest("counter", bytes_v2, PluginCapabilities::SCHEDULER),
                bytes_v2,
                plugin_v2,
            )
            .unwrap();

        assert_eq!(registry.state("counter").unwrap(), PluginState::Running);
    }

    #[test]
    fn plugins_with_capability_filters_by_declared_permission() {
        let registry = PluginRegistry::new(1);
        let bytes = b"http-plugin";
        let plugin = Box::new(EchoPlugin { caps: PluginCapabilities::HTTP_HANDLERS, started: false, state: None });
        registry
            .register(manifest("http-plugin", bytes, PluginCapabilities::HTTP_HANDLERS), bytes, plugin)
            .unwrap();

        let matches = registry.plugins_with_capability(PluginCapabilities::HTTP_HANDLERS);
        assert_eq!(matches, vec!["http-plugin".to_string()]);
        assert!(registry.plugins_with_capability(PluginCapabilities::WEBSOCKET).is_empty());
    }

    #[test]
    fn stop_returns_promptly_when_the_plugin_blocks_past_the_deadline() {
        let registry = PluginRegistry::new(1);
        let bytes = b"slow-v1";
        let plugin = Box::new(SlowPlugin { stop_delay: Duration::from_secs(5) });
        registry.register(manifest("slow", bytes, PluginCapabilities::empty()), bytes, plugin).unwrap();
        registry.init("slow").unwrap();
        registry.start("slow").unwrap();

        let started = std::time::Instant::now();
        let result = registry.stop("slow", Duration::from_millis(50));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(matches!(result, Err(PluginError::LifecycleFailed(_, _))));
        assert_eq!(registry.state("slow").unwrap(), PluginState::ErrorState);
    }

    #[test]
    fn stop_within_deadline_succeeds() {
        let registry = PluginRegistry::new(1);
        let bytes = b"fast-v1";
        let plugin = Box::new(SlowPlugin { stop_delay: Duration::from_millis(5) });
        registry.register(manifest("fast", bytes, PluginCapabilities::empty()), bytes, plugin).unwrap();
        registry.init("fast").unwrap();
        registry.start("fast").unwrap();

        registry.stop("fast", Duration::from_secs(1)).unwrap();
        assert_eq!(registry.state("fast").unwrap(), PluginState::Stopped);
    }
}
