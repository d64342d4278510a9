use bitflags::bitflags;

bitflags! {
    /// Capabilities a plugin may declare in its manifest. The registry uses
    /// these to answer "which plugins handle HTTP" etc. without downcasting.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PluginCapabilities: u8 {
        const HTTP_HANDLERS      = 1 << 0;
        const MIDDLEWARE         = 1 << 1;
        const SCHEDULER          = 1 << 2;
        const DATABASE_HOOKS     = 1 << 3;
        const EVENT_LISTENER     = 1 << 4;
        const TEMPLATE_EXTENSION = 1 << 5;
        const CUSTOM_ROUTES      = 1 << 6;
        const WEBSOCKET          = 1 << 7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_of_flags_contains_each_member() {
        let caps = PluginCapabilities::HTTP_HANDLERS | PluginCapabilities::SCHEDULER;
        assert!(caps.contains(PluginCapabilities::HTTP_HANDLERS));
        assert!(caps.contains(PluginCapabilities::SCHEDULER));
        assert!(!caps.contains(PluginCapabilities::WEBSOCKET));
    }
}
