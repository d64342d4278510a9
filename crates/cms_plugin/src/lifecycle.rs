use std::sync::atomic::{AtomicU8, Ordering};

/// A plugin's position in its lifecycle. Transitions are monotonic except
/// for the recovery edge `ErrorState -> Unloaded`, taken when a plugin is
/// unloaded after failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PluginState {
    Unloaded = 0,
    Loaded = 1,
    Initialized = 2,
    Running = 3,
    Stopped = 4,
    ErrorState = 5,
}

impl PluginState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PluginState::Unloaded,
            1 => PluginState::Loaded,
            2 => PluginState::Initialized,
            3 => PluginState::Running,
            4 => PluginState::Stopped,
            _ => PluginState::ErrorState,
        }
    }
}

/// Thread-safe lifecycle tracker for a single plugin instance.
///
/// Every transition goes through [`LifecycleTracker::advance`], which only
/// succeeds if the plugin is currently in the expected state. This prevents,
/// e.g., `start()` racing `stop()` into an inconsistent state.
pub struct LifecycleTracker {
    state: AtomicU8,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self { state: AtomicU8::new(PluginState::Unloaded as u8) }
    }

    pub fn state(&self) -> PluginState {
        PluginState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Attempts `expected -> next`. Returns the state actually observed if
    /// the attempt failed, so the caller can report a precise error.
    pub fn advance(&self, expected: PluginState, next: PluginState) -> Result<(), PluginState> {
        match self.state.compare_exchange(
            expected as u8,
            next as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => Ok(()),
            Err(actual) => Err(PluginState::from_u8(actual)),
        }
    }

    /// Force-sets the state, used to enter `ErrorState` from any prior state.
    pub fn force(&self, next: PluginState) {
        self.state.store(next as u8, Ordering::SeqCst);
    }
}

impl Default for LifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unloaded() {
        let tracker = LifecycleTracker::new();
        assert_eq!(tracker.state(), PluginState::Unloaded);
    }

    #[test]
    fn valid_transitions_chain_through_to_running() {
        let tracker = LifecycleTracker::new();
        tracker.advance(PluginState::Unloaded, PluginState::Loaded).unwrap();
        tracker.advance(PluginState::Loaded, PluginState::Initialized).unwrap();
        tracker.advance(PluginState::Initialized, PluginState::Running).unwrap();
        assert_eq!(tracker.state(), PluginState::Running);
    }

    #[test]
    fn skipping_a_phase_is_rejected() {
        let tracker = LifecycleTracker::new();
        let result = tracker.advance(PluginState::Loaded, PluginState::Running);
        assert_eq!(result, Err(PluginState::Unloaded));
        assert_eq!(tracker.state(), PluginState::Unloaded);
    }

    #[test]
    fn force_enters_error_state_from_any_phase() {
        let tracker = LifecycleTracker::new();
        tracker.advance(PluginState::Unloaded, PluginState::Loaded).unwrap();
        tracker.force(PluginState::ErrorState);
        assert_eq!(tracker.state(), PluginState::ErrorState);
    }
}
