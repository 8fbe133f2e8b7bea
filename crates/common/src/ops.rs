//! Operational flags shared between the control surface and the router.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

/// Mutable operational state injected into every turn.
///
/// The takeover flag is written by the takeover detector (agent-originated
/// outbound events, control API) and read by the router. It expires on its
/// own after the configured window; sessions the router touches while the
/// flag is active are additionally marked finished by the caller.
#[derive(Debug)]
pub struct OpsFlags {
    base: Instant,
    takeover_until_ms: AtomicU64,
}

impl OpsFlags {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            takeover_until_ms: AtomicU64::new(0),
        }
    }

    /// Pause automated replies for `window`, measured from now.
    pub fn set_takeover(&self, window: Duration) {
        let until = self.base.elapsed().saturating_add(window);
        self.takeover_until_ms
            .store(until.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn clear_takeover(&self) {
        self.takeover_until_ms.store(0, Ordering::SeqCst);
    }

    #[must_use]
    pub fn takeover_active(&self) -> bool {
        let until = self.takeover_until_ms.load(Ordering::SeqCst);
        until != 0 && (self.base.elapsed().as_millis() as u64) < until
    }
}

impl Default for OpsFlags {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_inactive() {
        assert!(!OpsFlags::new().takeover_active());
    }

    #[test]
    fn set_then_active() {
        let flags = OpsFlags::new();
        flags.set_takeover(Duration::from_secs(60));
        assert!(flags.takeover_active());
    }

    #[test]
    fn zero_window_never_activates() {
        let flags = OpsFlags::new();
        flags.set_takeover(Duration::ZERO);
        assert!(!flags.takeover_active());
    }

    #[test]
    fn clear_deactivates() {
        let flags = OpsFlags::new();
        flags.set_takeover(Duration::from_secs(60));
        flags.clear_takeover();
        assert!(!flags.takeover_active());
    }
}
