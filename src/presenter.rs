//! The abstract surface the scheduler presents frames and reads input
//! through. Concrete backends live behind feature flags so the CPU/Invaders
//! core never depends on a windowing toolkit directly.
//!
//! Generalized from the teacher's `Mapper` trait (`mapper.rs`): a small,
//! fully-documented trait with exactly one concrete implementation supplied
//! by a leaf module, here widened from "pluggable cartridge address
//! decoder" to "pluggable arcade I/O surface".

#[cfg(feature = "display")]
pub mod window;

/// Everything the scheduler needs from the outside world each tick.
pub trait Presenter {
    /// Push a fully-rendered 224x256 ARGB frame to the screen.
    fn blit_argb(&mut self, buf: &[u32]);
    /// Drain pending input/window events since the last call.
    fn poll_events(&mut self) -> Vec<Event>;
    /// Monotonic milliseconds since the presenter started.
    fn now_ms(&self) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Quit,
    KeyDown(Key),
    KeyUp(Key),
}

/// Keys the cabinet cares about. Mapping from physical keys is the
/// presenter backend's job; spec.md §6 fixes it as: `3`=coin, `2`=P2 start,
/// `1`=P1 start, Space=fire, A/Left=left, D/Right=right, Esc=quit,
/// E=toggle color, Q=toggle pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Coin,
    P1Start,
    P2Start,
    Fire,
    Left,
    Right,
    ToggleColor,
    TogglePause,
    Quit,
}
