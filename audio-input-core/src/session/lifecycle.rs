use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Barrier;

use parking_lot::Mutex;

use crate::models::state::LifecycleState;

/// What a worker should do after passing a [`Lifecycle::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// Session is working; carry on.
    Proceed,
    /// Session is shutting down; return without touching shared state.
    Exit,
}

/// Shutdown handoff between the closing thread and the active worker.
///
/// Workers are the capture callback and the reconnection monitor; only one of
/// them is live at any time. The closer moves `Working → Draining` and then
/// waits on a two-party barrier. The first worker to reach a checkpoint while
/// `Draining` moves the state to `Terminated` and joins the barrier, after
/// which the closer knows that worker has left the session for good. Later
/// checkpoints see `Terminated` and exit without waiting, so the barrier is
/// passed exactly once.
///
/// The state lock only guards an O(1) check-and-set and is never held across
/// the barrier.
#[derive(Debug)]
pub struct Lifecycle {
    state: Mutex<LifecycleState>,
    rendezvous: Barrier,
    terminal_transitions: AtomicU64,
    rendezvous_waits: AtomicU64,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LifecycleState::Working),
            rendezvous: Barrier::new(2),
            terminal_transitions: AtomicU64::new(0),
            rendezvous_waits: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    /// Closer side: request shutdown.
    ///
    /// Returns `false` if the session had already left `Working`, in which
    /// case the caller must not wait on the handoff.
    pub fn request_drain(&self) -> bool {
        let mut state = self.state.lock();
        if !state.is_working() {
            return false;
        }
        *state = LifecycleState::Draining;
        true
    }

    /// Closer side: block until the active worker has acknowledged the drain.
    pub fn await_handoff(&self) {
        self.wait_rendezvous();
    }

    /// Worker side: check the state at the top of a callback or loop iteration.
    ///
    /// In `Draining` this performs the terminal transition and blocks on the
    /// rendezvous until the closer arrives.
    pub fn checkpoint(&self) -> Checkpoint {
        let mut state = self.state.lock();
        match *state {
            LifecycleState::Working => Checkpoint::Proceed,
            LifecycleState::Terminated => Checkpoint::Exit,
            LifecycleState::Draining => {
                *state = LifecycleState::Terminated;
                drop(state);
                self.terminal_transitions.fetch_add(1, Ordering::SeqCst);
                self.wait_rendezvous();
                Checkpoint::Exit
            }
        }
    }

    /// Number of `Draining → Terminated` transitions (0 or 1).
    pub fn terminal_transitions(&self) -> u64 {
        self.terminal_transitions.load(Ordering::SeqCst)
    }

    /// Number of parties that have entered the rendezvous (0 or 2 once settled).
    pub fn rendezvous_waits(&self) -> u64 {
        self.rendezvous_waits.load(Ordering::SeqCst)
    }

    fn wait_rendezvous(&self) {
        self.rendezvous_waits.fetch_add(1, Ordering::SeqCst);
        self.rendezvous.wait();
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn working_lets_workers_through() {
        let lifecycle = Lifecycle::new();

        assert_eq!(lifecycle.checkpoint(), Checkpoint::Proceed);
        assert_eq!(lifecycle.checkpoint(), Checkpoint::Proceed);
        assert_eq!(lifecycle.state(), LifecycleState::Working);
        assert_eq!(lifecycle.rendezvous_waits(), 0);
    }

    #[test]
    fn drain_is_requested_once() {
        let lifecycle = Lifecycle::new();

        assert!(lifecycle.request_drain());
        assert!(!lifecycle.request_drain());
        assert_eq!(lifecycle.state(), LifecycleState::Draining);
    }

    #[test]
    fn single_worker_hands_off_to_closer() {
        let lifecycle = Arc::new(Lifecycle::new());
        assert!(lifecycle.request_drain());

        let worker = {
            let lifecycle = Arc::clone(&lifecycle);
            thread::spawn(move || lifecycle.checkpoint())
        };

        lifecycle.await_handoff();

        assert_eq!(worker.join().unwrap(), Checkpoint::Exit);
        assert_eq!(lifecycle.state(), LifecycleState::Terminated);
        assert_eq!(lifecycle.terminal_transitions(), 1);
        assert_eq!(lifecycle.rendezvous_waits(), 2);
    }

    #[test]
    fn later_checkpoints_exit_without_waiting() {
        let lifecycle = Arc::new(Lifecycle::new());
        lifecycle.request_drain();

        let worker = {
            let lifecycle = Arc::clone(&lifecycle);
            thread::spawn(move || lifecycle.checkpoint())
        };
        lifecycle.await_handoff();
        worker.join().unwrap();

        // Would deadlock if any of these waited on the barrier.
        for _ in 0..100 {
            assert_eq!(lifecycle.checkpoint(), Checkpoint::Exit);
        }
        assert_eq!(lifecycle.terminal_transitions(), 1);
        assert_eq!(lifecycle.rendezvous_waits(), 2);
    }

    #[test]
    fn racing_workers_terminate_exactly_once() {
        let lifecycle = Arc::new(Lifecycle::new());
        let exits = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let lifecycle = Arc::clone(&lifecycle);
                let exits = Arc::clone(&exits);
                thread::spawn(move || loop {
                    if lifecycle.checkpoint() == Checkpoint::Exit {
                        exits.fetch_add(1, Ordering::SeqCst);
                        return;
                    }
                    thread::sleep(Duration::from_micros(50));
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(10));
        assert!(lifecycle.request_drain());
        lifecycle.await_handoff();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(exits.load(Ordering::SeqCst), 4);
        assert_eq!(lifecycle.terminal_transitions(), 1);
        assert_eq!(lifecycle.rendezvous_waits(), 2);
        assert_eq!(lifecycle.state(), LifecycleState::Terminated);
    }
}
