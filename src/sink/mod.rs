//! Sinks are the end of a strainer pipeline.

use filter::{self, Filter};
use metric::{Event, FieldRecord};
use std::sync::mpsc;

mod console;

pub use self::console::{Console, ConsoleConfig, Encoding};

/// Whether a sink accepts further events
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Valve {
    /// More events are welcome
    Open,
    /// The sink has shut down
    Closed,
}

/// A 'sink' is a sink for records.
pub trait Sink {
    /// Write out anything buffered
    fn flush(&mut self) -> ();
    /// Accept a single record
    fn deliver(&mut self, record: FieldRecord) -> ();
    /// Flush and release resources. No record is delivered after this.
    fn shutdown(&mut self) -> () {
        self.flush()
    }

    /// Route one event into the sink
    fn handle(&mut self, event: Event) -> Valve {
        match event {
            Event::Record(record) => {
                self.deliver(record);
                Valve::Open
            }
            Event::TimerFlush(_) => {
                self.flush();
                Valve::Open
            }
            Event::Shutdown => {
                self.shutdown();
                Valve::Closed
            }
        }
    }

    /// Pull events from `recv`, run them through `filters` and consume the
    /// result until a `Shutdown` makes it through. Should every sender hang
    /// up first, a `Shutdown` is run through the filters in their place.
    fn run(&mut self, recv: mpsc::Receiver<Event>, filters: &mut [Box<Filter + Send>]) {
        for event in recv.iter() {
            for ev in filter::run_chain(filters, event) {
                if self.handle(ev) == Valve::Closed {
                    return;
                }
            }
        }
        warn!("all sources hung up without shutdown");
        for ev in filter::run_chain(filters, Event::Shutdown) {
            if self.handle(ev) == Valve::Closed {
                return;
            }
        }
    }
}
