/// Synchronizer session state machine.
///
/// ```text
/// Starting → Running → Draining → Stopped
/// ```
///
/// `Starting`: both sources armed, waiting for the first frame from each,
/// no output yet. `Running`: steady-state alignment. `Draining`: stop
/// requested, already-buffered data still being emitted, no new silence
/// synthesized. `Stopped`: terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Starting,
    Running,
    Draining,
    Stopped,
}

impl SyncState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    pub fn is_draining(&self) -> bool {
        matches!(self, Self::Draining)
    }
}

/// Running counters for a capture session.
///
/// Non-fatal conditions (stalls, producer drops, echo-cancel bypasses)
/// land here rather than aborting the recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub mic_frames: u64,
    pub system_frames: u64,
    pub mic_dropped: u64,
    pub system_dropped: u64,
    pub mic_stalls: u64,
    pub system_stalls: u64,
    pub aec_bypasses: u64,
    pub pairs_emitted: u64,
    pub bytes_written: u64,
}
