#![forbid(unsafe_code)]

use crate::Error;
use crate::pool::Job;
use parking_lot::Mutex;

/// The pool's priority lanes: one bounded FIFO queue per priority level.
///
/// Submission goes through the senders without locking; dispatch order is
/// decided under the dispatcher mutex so the anti-starvation counter stays
/// consistent across workers.
pub(crate) struct Lanes {
    senders: Vec<flume::Sender<Job>>,
    dispatcher: Mutex<Dispatcher>,
}

struct Dispatcher {
    receivers: Vec<flume::Receiver<Job>>,
    /// Every K-th dispatch pulls from the lowest-priority non-empty lane.
    /// Zero disables the override.
    anti_starvation: u64,
    dispatches: u64,
}

impl Lanes {
    pub(crate) fn new(levels: usize, capacity: usize, anti_starvation: u32) -> Self {
        let levels = levels.max(1);
        let mut senders = Vec::with_capacity(levels);
        let mut receivers = Vec::with_capacity(levels);
        for _ in 0..levels {
            let (tx, rx) = flume::bounded(capacity);
            senders.push(tx);
            receivers.push(rx);
        }
        Self {
            senders,
            dispatcher: Mutex::new(Dispatcher {
                receivers,
                anti_starvation: anti_starvation.into(),
                dispatches: 0,
            }),
        }
    }

    /// Enqueue into the lane for the job's priority. Priorities past the
    /// last lane clamp to the last lane.
    pub(crate) fn submit(&self, mut job: Job) -> Result<(), Error> {
        let lane = (job.priority as usize).min(self.senders.len() - 1);
        job.priority = lane as u8;
        self.senders[lane].try_send(job).map_err(|err| match err {
            flume::TrySendError::Full(job) => Error::QueueFull {
                priority: job.priority,
            },
            flume::TrySendError::Disconnected(_) => Error::PoolClosed,
        })
    }

    /// Pull the next job according to the dispatch rule, if any is queued.
    pub(crate) fn pop(&self) -> Option<Job> {
        self.dispatcher.lock().pop()
    }

    /// Discard all queued jobs, returning how many were dropped.
    pub(crate) fn drain(&self) -> u64 {
        let dispatcher = self.dispatcher.lock();
        let mut dropped = 0;
        for receiver in &dispatcher.receivers {
            while receiver.try_recv().is_ok() {
                dropped += 1;
            }
        }
        dropped
    }

    pub(crate) fn depths(&self) -> Vec<usize> {
        self.senders.iter().map(flume::Sender::len).collect()
    }

    pub(crate) fn queued(&self) -> usize {
        self.senders.iter().map(flume::Sender::len).sum()
    }
}

impl Dispatcher {
    fn pop(&mut self) -> Option<Job> {
        let forced = self.anti_starvation > 0 && (self.dispatches + 1) % self.anti_starvation == 0;

        let job = if forced {
            // lowest-priority lane first, so background work cannot starve
            self.receivers
                .iter()
                .rev()
                .find_map(|rx| rx.try_recv().ok())
        } else {
            // strict priority: lowest-numbered non-empty lane
            self.receivers.iter().find_map(|rx| rx.try_recv().ok())
        };

        if job.is_some() {
            self.dispatches += 1;
        }
        job
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn job(id: &str, priority: u8) -> Job {
        Job::new(id, priority, async { Ok(()) })
    }

    #[test]
    fn strict_priority_order() {
        let lanes = Lanes::new(4, 16, 0);
        lanes.submit(job("low", 3)).unwrap();
        lanes.submit(job("mid", 1)).unwrap();
        lanes.submit(job("high", 0)).unwrap();

        let order: Vec<String> = std::iter::from_fn(|| lanes.pop()).map(|j| j.id).collect();
        assert_eq!(order, ["high", "mid", "low"]);
    }

    #[test]
    fn fifo_within_a_lane() {
        let lanes = Lanes::new(2, 16, 0);
        for i in 0..5 {
            lanes.submit(job(&format!("j{i}"), 0)).unwrap();
        }
        let order: Vec<String> = std::iter::from_fn(|| lanes.pop()).map(|j| j.id).collect();
        assert_eq!(order, ["j0", "j1", "j2", "j3", "j4"]);
    }

    #[test]
    fn anti_starvation_override_every_kth_dispatch() {
        let lanes = Lanes::new(4, 32, 8);
        for i in 0..20 {
            lanes.submit(job(&format!("urgent{i}"), 0)).unwrap();
        }
        lanes.submit(job("background", 3)).unwrap();

        let order: Vec<String> = std::iter::from_fn(|| lanes.pop()).map(|j| j.id).collect();
        let position = order.iter().position(|id| id == "background").unwrap();
        // dispatched on the 8th cycle despite lane 0 never being empty
        assert_eq!(position, 7);
    }

    #[test]
    fn forced_dispatch_falls_back_to_higher_lanes() {
        // no low-priority work queued: the override must not stall dispatch
        let lanes = Lanes::new(4, 16, 1);
        lanes.submit(job("only", 0)).unwrap();
        assert_eq!(lanes.pop().unwrap().id, "only");
    }

    #[test]
    fn queue_full_backpressure() {
        let lanes = Lanes::new(2, 2, 0);
        lanes.submit(job("a", 1)).unwrap();
        lanes.submit(job("b", 1)).unwrap();

        let err = lanes.submit(job("c", 1)).unwrap_err();
        assert!(matches!(err, Error::QueueFull { priority: 1 }));
        // the other lane still has room
        lanes.submit(job("d", 0)).unwrap();
    }

    #[test]
    fn priority_clamps_to_last_lane() {
        let lanes = Lanes::new(2, 4, 0);
        lanes.submit(job("clamped", 9)).unwrap();
        assert_eq!(lanes.depths(), [0, 1]);

        let popped = lanes.pop().unwrap();
        assert_eq!(popped.priority, 1);
    }

    #[test]
    fn drain_counts_dropped_jobs() {
        let lanes = Lanes::new(3, 8, 0);
        for i in 0..6 {
            lanes.submit(job(&format!("j{i}"), (i % 3) as u8)).unwrap();
        }
        assert_eq!(lanes.queued(), 6);
        assert_eq!(lanes.drain(), 6);
        assert_eq!(lanes.queued(), 0);
    }
}
