use std::sync::atomic::{AtomicU8, Ordering};

/// Teardown phase of the service container, mirroring the startup order in
/// reverse: plugins depend on everything below them, so they stop first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContainerPhase {
    NotStarted = 0,
    Running = 1,
    SignalSent = 2,
    StoppingPlugins = 3,
    FlushingCache = 4,
    ClosingPool = 5,
    Complete = 6,
}

impl ContainerPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ContainerPhase::NotStarted,
            1 => ContainerPhase::Running,
            2 => ContainerPhase::SignalSent,
            3 => ContainerPhase::StoppingPlugins,
            4 => ContainerPhase::FlushingCache,
            5 => ContainerPhase::ClosingPool,
            _ => ContainerPhase::Complete,
        }
    }
}

pub(crate) struct PhaseTracker(AtomicU8);

impl PhaseTracker {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(ContainerPhase::NotStarted as u8))
    }

    pub(crate) fn set(&self, phase: ContainerPhase) {
        self.0.store(phase as u8, Ordering::SeqCst);
    }

    pub fn get(&self) -> ContainerPhase {
        ContainerPhase::from_u8(self.0.load(Ordering::SeqCst))
    }
}
