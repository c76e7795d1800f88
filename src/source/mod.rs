//! Sources put events into a strainer pipeline.
//!
//! A source owns the sending half of a channel and runs on its own thread
//! until its input is exhausted or the receiving half hangs up.

use metric;
use std::sync::mpsc;

mod flush;
mod stdin;

pub use self::flush::FlushTimer;
pub use self::stdin::{Decoding, LineSource, LINES_BAD, LINES_GOOD};

/// The channel every source sends into
pub type Channel = mpsc::Sender<metric::Event>;

/// A source of events, run to completion on its own thread
pub trait Source {
    /// Run the source. Returns when the source is exhausted or its channel
    /// is closed.
    fn run(&mut self) -> ();
}

/// Send an event, returning false if the receiver has gone away
#[inline]
pub fn send(ctx: &str, chan: &Channel, event: metric::Event) -> bool {
    match chan.send(event) {
        Ok(()) => true,
        Err(_) => {
            debug!("[{}] receiver hung up", ctx);
            false
        }
    }
}
