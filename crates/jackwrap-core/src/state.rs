//! Process run state shared by every thread.

use crate::wake::WakeSignal;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Init = 0,
    Run = 1,
    Exit = 2,
}

/// `Init -> Run -> Exit`. Exit is terminal; any thread may set it.
#[derive(Debug)]
pub struct RunState {
    phase: AtomicU8,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Init as u8),
        }
    }

    pub fn phase(&self) -> Phase {
        match self.phase.load(Ordering::Acquire) {
            0 => Phase::Init,
            1 => Phase::Run,
            _ => Phase::Exit,
        }
    }

    /// Enter `Run`, unless exit was already requested.
    pub fn start(&self) -> bool {
        self.phase
            .compare_exchange(
                Phase::Init as u8,
                Phase::Run as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn request_exit(&self) {
        self.phase.store(Phase::Exit as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_exiting(&self) -> bool {
        self.phase() == Phase::Exit
    }
}

/// Handle given to everything that can end the process: the engine's
/// shutdown notification, the signal thread and the UI-closed callback.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    state: Arc<RunState>,
    wake: Arc<WakeSignal>,
}

impl Shutdown {
    pub fn new(state: Arc<RunState>, wake: Arc<WakeSignal>) -> Self {
        Self { state, wake }
    }

    /// Set `Exit` and wake the control thread so it notices promptly.
    pub fn trigger(&self) {
        self.state.request_exit();
        self.wake.notify();
    }

    /// Set `Exit` without touching the wake lock, for contexts that must not
    /// block (engine callbacks, signal handlers).
    pub fn trigger_nonblocking(&self) {
        self.state.request_exit();
        self.wake.notify_nonblocking();
    }

    pub fn state(&self) -> &Arc<RunState> {
        &self.state
    }

    pub fn wake(&self) -> &Arc<WakeSignal> {
        &self.wake
    }

    pub fn is_triggered(&self) -> bool {
        self.state.is_exiting()
    }
}
