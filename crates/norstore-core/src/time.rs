//! Poll budgets and the monotonic tick source
//!
//! The C generations of this driver mixed raw loop counts and millisecond
//! ceilings for conceptually identical "wait until ready" loops. Both
//! strategies are kept, unified behind [`Budget`] so every call site names
//! its policy explicitly and tests can drive the millisecond variant with a
//! fake tick source.

use crate::error::Result;

/// Monotonic millisecond tick source.
///
/// The counter wraps silently at `u32::MAX`; all duration math in this crate
/// uses `wrapping_sub`, so a wrap mid-wait is harmless.
pub trait Ticker {
    /// Current tick count in milliseconds
    fn now_ms(&self) -> u32;

    /// Busy-wait for approximately `us` microseconds
    fn delay_us(&self, us: u32);
}

/// Bound on a busy-poll loop: either a raw iteration count or a wall-clock
/// millisecond ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// At most this many polls
    Polls(u32),
    /// At most this many milliseconds, measured with the bus's tick source
    Millis(u32),
}

impl Budget {
    /// Repeatedly evaluate `ready` until it reports true or the budget is
    /// exhausted. Returns `Ok(true)` on success, `Ok(false)` on exhaustion;
    /// errors from `ready` propagate immediately.
    ///
    /// `ctx` is threaded through both closures so a caller can poll a
    /// mutably-borrowed bus and read its clock in the same loop.
    pub fn poll<C, N, F>(self, ctx: &mut C, now_ms: N, mut ready: F) -> Result<bool>
    where
        N: Fn(&C) -> u32,
        F: FnMut(&mut C) -> Result<bool>,
    {
        match self {
            Budget::Polls(n) => {
                for _ in 0..n {
                    if ready(ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Budget::Millis(ms) => {
                let start = now_ms(ctx);
                loop {
                    if ready(ctx)? {
                        return Ok(true);
                    }
                    if now_ms(ctx).wrapping_sub(start) >= ms {
                        return Ok(false);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_budget_counts_iterations() {
        let mut calls = 0u32;
        let done = Budget::Polls(5)
            .poll(
                &mut calls,
                |_| 0,
                |c| {
                    *c += 1;
                    Ok(*c == 3)
                },
            )
            .unwrap();
        assert!(done);
        assert_eq!(calls, 3);
    }

    #[test]
    fn poll_budget_exhausts() {
        let mut calls = 0u32;
        let done = Budget::Polls(4)
            .poll(
                &mut calls,
                |_| 0,
                |c| {
                    *c += 1;
                    Ok(false)
                },
            )
            .unwrap();
        assert!(!done);
        assert_eq!(calls, 4);
    }

    #[test]
    fn millis_budget_uses_clock() {
        // ctx is the fake clock itself; each ready poll advances it 4 ms.
        let mut clock = 0u32;
        let done = Budget::Millis(10).poll(
            &mut clock,
            |t| *t,
            |t| {
                *t += 4;
                Ok(false)
            },
        );
        assert_eq!(done.unwrap(), false);
    }

    #[test]
    fn millis_budget_tolerates_wraparound() {
        // Clock starts just below the wrap point; elapsed math must stay
        // correct across it.
        struct Clk {
            t: u32,
            polls: u32,
        }
        let mut clk = Clk {
            t: u32::MAX - 2,
            polls: 0,
        };
        let done = Budget::Millis(10)
            .poll(
                &mut clk,
                |c| c.t,
                |c| {
                    c.t = c.t.wrapping_add(1);
                    c.polls += 1;
                    Ok(c.polls == 5)
                },
            )
            .unwrap();
        assert!(done);
    }
}
