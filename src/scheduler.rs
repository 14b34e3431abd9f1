//! Slaves CPU cycles to wall-clock time and issues the arcade's two
//! vertical-blank interrupts per frame.
//!
//! Grounded on `original_source/space-invaders.c`'s `spaceinvaders_loop`,
//! `spaceinvaders_handle_cpu`, and `spaceinvaders_get_deltatime32`. The
//! per-interrupt cycle threshold is enforced by draining `Cpu8080::cycles`
//! directly (subtracting `CYCLES_PER_INT` each time it's crossed), exactly
//! as the source drains `cpu->cycles`; this is an external mutation done by
//! the scheduler between `step` calls, not a behavior of `step` itself, so
//! it does not violate the CPU's own "cycles never decreases during a step"
//! invariant.

use crate::cpu::Cpu8080;
use crate::invaders::InvadersMachine;

/// 2 MHz.
pub const CLOCK_SPEED: u64 = 2_000_000;
/// 60 Hz.
pub const REFRESH_RATE: u64 = 60;
/// `CLOCK_SPEED / REFRESH_RATE`.
pub const CYCLES_PER_FRAME: u64 = 33_333;
/// Half of `CYCLES_PER_FRAME`: one interrupt fires at roughly mid-screen,
/// the other at end-of-frame.
pub const CYCLES_PER_INT: u64 = 16_666;

const RST_1: u8 = 0xCF;
const RST_2: u8 = 0xD7;

pub struct FrameScheduler {
    prev_time_ms: u32,
}

impl FrameScheduler {
    /// `start_time_ms` should be the presenter's `now_ms()` read once at
    /// startup so the first tick doesn't see a spurious huge delta.
    pub fn new(start_time_ms: u32) -> Self {
        FrameScheduler {
            prev_time_ms: start_time_ms,
        }
    }

    /// One iteration of the outer loop: computes the elapsed time since the
    /// last tick, runs the CPU for that many cycles (unless paused),
    /// delivering interrupts and re-rendering VRAM at end-of-frame, and
    /// always advances `prev_time_ms` — even while paused — so resuming
    /// never produces a catch-up burst of cycles.
    pub fn tick(&mut self, cpu: &mut Cpu8080, machine: &mut InvadersMachine, now_ms: u32) {
        let dt_ms = delta_time(self.prev_time_ms, now_ms);

        if dt_ms > 0 && !machine.pause_flag {
            self.run_cpu(cpu, machine, dt_ms);
        }

        self.prev_time_ms = now_ms;
    }

    fn run_cpu(&mut self, cpu: &mut Cpu8080, machine: &mut InvadersMachine, dt_ms: u32) {
        let budget_cycles = (dt_ms as u64 * CLOCK_SPEED) / 1000;
        let mut elapsed = 0u64;

        while elapsed < budget_cycles {
            let before = cpu.cycles;
            cpu.step(machine);
            elapsed += cpu.cycles - before;

            if cpu.cycles >= CYCLES_PER_INT {
                cpu.cycles -= CYCLES_PER_INT;
                cpu.interrupt(machine.next_int);
                if machine.next_int == RST_1 {
                    machine.next_int = RST_2;
                } else {
                    machine.render_video();
                    machine.next_int = RST_1;
                }
            }
        }
    }
}

/// Wraparound-safe millisecond delta, matching
/// `spaceinvaders_get_deltatime32`: the only way `prev > curr` is a
/// `u32` wall-clock overflow.
fn delta_time(prev_ms: u32, curr_ms: u32) -> u32 {
    if prev_ms > curr_ms {
        u32::MAX - prev_ms + curr_ms
    } else {
        curr_ms - prev_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_time_normal_case() {
        assert_eq!(delta_time(1000, 1016), 16);
    }

    #[test]
    fn delta_time_handles_wraparound() {
        let prev = u32::MAX - 5;
        let curr = 10;
        assert_eq!(delta_time(prev, curr), 5 + 10);
    }

    #[test]
    fn pause_advances_prev_time_without_running_cpu() {
        let mut cpu = Cpu8080::new();
        let mut machine = InvadersMachine::new();
        machine.pause_flag = true;
        let mut sched = FrameScheduler::new(0);
        sched.tick(&mut cpu, &mut machine, 500);
        assert_eq!(cpu.cycles, 0);
        assert_eq!(sched.prev_time_ms, 500);
    }

    #[test]
    fn two_full_frames_alternate_interrupts_and_render() {
        let mut cpu = Cpu8080::new();
        let mut machine = InvadersMachine::new(); // ROM is all NOPs (zeroed)
        let mut sched = FrameScheduler::new(0);
        assert_eq!(machine.next_int, RST_1);
        // One frame's worth of wall time.
        let dt_ms = (CYCLES_PER_FRAME * 1000 / CLOCK_SPEED) as u32 + 1;
        sched.tick(&mut cpu, &mut machine, dt_ms);
        assert_eq!(machine.next_int, RST_1); // toggled CF->D7->CF within one frame
    }
}
