//! In-flight dispatch counting for one registration.

use std::fmt;
use std::sync::{Condvar, Mutex};

/// Counts the dispatches currently running one registration's closure.
///
/// Dispatches enter while the registry lock is held and the entry is still in the
/// table, so once the entry is removed the count can only go down. A borrowing
/// registration waits on [`DispatchGate::wait_idle`] before its borrow ends.
pub struct DispatchGate {
    active: Mutex<usize>,
    idle: Condvar,
}

impl DispatchGate {
    pub fn new() -> Self {
        DispatchGate {
            active: Mutex::new(0),
            idle: Condvar::new(),
        }
    }

    /// Number of dispatches currently running.
    pub fn active(&self) -> usize {
        *self.active.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub(crate) fn enter(&self) {
        *self.active.lock().unwrap_or_else(|p| p.into_inner()) += 1;
    }

    pub(crate) fn leave(&self) {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        *active -= 1;
        if *active == 0 {
            self.idle.notify_all();
        }
    }

    /// Block until no dispatch is running.
    ///
    /// Must not be called from inside a dispatch of the same registration.
    pub(crate) fn wait_idle(&self) {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        while *active > 0 {
            active = self.idle.wait(active).unwrap_or_else(|p| p.into_inner());
        }
    }
}

impl Default for DispatchGate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DispatchGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchGate")
            .field("active", &self.active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_idle_gate_does_not_block() {
        let gate = DispatchGate::new();
        gate.wait_idle();
        assert_eq!(gate.active(), 0);
    }

    #[test]
    fn test_enter_and_leave_balance() {
        let gate = DispatchGate::new();
        gate.enter();
        gate.enter();
        assert_eq!(gate.active(), 2);

        gate.leave();
        gate.leave();
        assert_eq!(gate.active(), 0);
    }

    #[test]
    fn test_wait_idle_blocks_until_last_leave() {
        let gate = Arc::new(DispatchGate::new());
        gate.enter();

        let woke = Arc::new(AtomicBool::new(false));
        let waiter = {
            let (gate, woke) = (gate.clone(), woke.clone());
            thread::spawn(move || {
                gate.wait_idle();
                woke.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!woke.load(Ordering::SeqCst));

        gate.leave();
        waiter.join().unwrap();
        assert!(woke.load(Ordering::SeqCst));
    }
}
