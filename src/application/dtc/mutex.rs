use core::sync::atomic::{AtomicBool, Ordering};

/// Non-blocking, non-reentrant single-holder gate serializing the ISR ingest path and the
/// periodic tick path.
///
/// This is a boolean test-and-set, not a spinning mutex: a spin would deadlock if the ISR
/// re-entered while the main loop already held the gate, and a bare-metal target may have
/// nothing to block on anyway. Contention is resolved by the caller dropping its work, not by
/// waiting.
#[derive(Debug, Default)]
pub(crate) struct MutexGate {
    locked: AtomicBool,
}

impl MutexGate {
    pub(crate) fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Attempts to take the gate. Returns `false` immediately if it is already held.
    pub(crate) fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Releases the gate. Only the caller that last acquired it may call this.
    pub(crate) fn release(&self) {
        self.locked.store(false, Ordering::Release);
    }

    /// Acquires the gate for the lifetime of the returned guard, releasing it on drop.
    pub(crate) fn acquire(&self) -> Option<MutexGuard<'_>> {
        self.try_acquire().then_some(MutexGuard { gate: self })
    }
}

pub(crate) struct MutexGuard<'a> {
    gate: &'a MutexGate,
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_first_is_held() {
        let gate = MutexGate::new();
        let first = gate.acquire();
        assert!(first.is_some());
        assert!(gate.acquire().is_none());
    }

    #[test]
    fn releasing_guard_allows_reacquire() {
        let gate = MutexGate::new();
        {
            let _guard = gate.acquire().unwrap();
        }
        assert!(gate.acquire().is_some());
    }

    #[test]
    fn try_acquire_and_release_round_trip() {
        let gate = MutexGate::new();
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
        gate.release();
        assert!(gate.try_acquire());
    }
}
