use metric;
use source::{send, Channel, Source};
use std::thread::sleep;
use std::time::Duration;
use time;

/// The source of all flush pulses. See `FlushTimer::run` for more details.
pub struct FlushTimer {
    chan: Channel,
    interval: Duration,
}

impl FlushTimer {
    /// Create a new FlushTimer pulsing every `interval_secs` seconds. This will
    /// not produce a new thread, that must be managed by the end-user.
    pub fn new(chan: Channel, interval_secs: u64) -> FlushTimer {
        FlushTimer {
            chan: chan,
            interval: Duration::from_secs(interval_secs),
        }
    }
}

impl Source for FlushTimer {
    /// Sleep one interval, then send `TimerFlush` stamped with the wall clock
    /// in nanoseconds. Stops once the receiver hangs up.
    fn run(&mut self) {
        loop {
            sleep(self.interval);
            if !send("flush", &self.chan, metric::Event::TimerFlush(time::now())) {
                return;
            }
        }
    }
}
