/// A point-in-time snapshot of pool counters, sampled without blocking acquire/release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub acquires: u64,
    pub releases: u64,
    pub creates: u64,
    pub destroys: u64,
    pub hits: u64,
    pub timeouts: u64,
    pub waits: u64,
    pub active_count: u32,
    pub idle_count: u32,
    pub total_count: u32,
}
