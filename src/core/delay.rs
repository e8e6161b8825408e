//! Delay simulator: the example blocking workload.
//!
//! Stands in for any real blocking call (disk I/O, a slow remote call, heavy
//! computation). The sleep is interruptible: a [`CancelToken`] delivered to
//! the executing thread wakes the wait early and surfaces as an
//! [`TaskOutcome::Interrupted`] outcome instead of an unwind.

use std::time::{Duration, Instant};

use crate::core::task::{CancelToken, TaskOutcome};

/// Block the calling thread for at least `delay`, unless cancelled.
///
/// Waits on the token's condvar against a monotonic deadline, so
/// cancellation wakes the sleeper promptly instead of letting the full
/// duration run out. A token cancelled before the call starts (e.g. while
/// the task was still queued) returns `Interrupted` without sleeping at all.
/// A zero delay returns `Completed` immediately.
#[must_use]
pub fn run(delay: Duration, cancel: &CancelToken) -> TaskOutcome {
    let deadline = Instant::now().checked_add(delay);
    let (flag, cv) = cancel.parts();
    let mut cancelled = flag.lock();
    loop {
        if *cancelled {
            return TaskOutcome::Interrupted;
        }
        match deadline {
            Some(deadline) => {
                if Instant::now() >= deadline {
                    return TaskOutcome::Completed;
                }
                if cv.wait_until(&mut cancelled, deadline).timed_out() {
                    return if *cancelled {
                        TaskOutcome::Interrupted
                    } else {
                        TaskOutcome::Completed
                    };
                }
            }
            // Delay too large to represent as a deadline: sleep until
            // cancelled.
            None => cv.wait(&mut cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn zero_delay_completes_immediately() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert_eq!(run(Duration::ZERO, &token), TaskOutcome::Completed);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn sleeps_at_least_the_requested_duration() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert_eq!(run(Duration::from_millis(150), &token), TaskOutcome::Completed);
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn cancellation_interrupts_the_sleep_early() {
        let token = CancelToken::new();
        let canceller = token.clone();
        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        let start = Instant::now();
        let outcome = run(Duration::from_secs(30), &token);
        waker.join().unwrap();

        assert_eq!(outcome, TaskOutcome::Interrupted);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn pre_cancelled_token_never_sleeps() {
        let token = CancelToken::new();
        token.cancel();
        let start = Instant::now();
        assert_eq!(run(Duration::from_secs(30), &token), TaskOutcome::Interrupted);
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
