//! Filters are the stateful middle of a strainer pipeline.
//!
//! A filter receives one `metric::Event` at a time and pushes zero or more
//! events onto an output buffer. Records flow in order; `TimerFlush` and
//! `Shutdown` are forwarded by every filter after it has emitted whatever the
//! event asked of it.

use metric;
use std::fmt;

mod aggregate_filter;
mod dedupe_filter;

pub use self::aggregate_filter::{AggregateError, AggregateFilter, AggregateFilterConfig};
pub use self::dedupe_filter::{DedupeFilter, DedupeFilterConfig};

/// Errors a filter reports for a single event. The event is carried along so
/// the caller may decide what to do with it.
#[derive(Debug)]
pub enum FilterError {
    /// The named field, required by the filter, is absent
    MissingField(&'static str, metric::Event),
    /// The named field is present but unusable by the filter
    InvalidField(&'static str, metric::Event),
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FilterError::MissingField(name, _) => write!(f, "missing field '{}'", name),
            FilterError::InvalidField(name, _) => write!(f, "invalid field '{}'", name),
        }
    }
}

impl ::std::error::Error for FilterError {}

fn name_in_fe(fe: &FilterError) -> &'static str {
    match *fe {
        FilterError::MissingField(n, _) | FilterError::InvalidField(n, _) => n,
    }
}

/// Recover the event carried by a `FilterError`
pub fn event_in_fe(fe: FilterError) -> metric::Event {
    match fe {
        FilterError::MissingField(_, e) | FilterError::InvalidField(_, e) => e,
    }
}

/// A filter transforms a stream of events
pub trait Filter {
    /// Process a single event, pushing any output onto `res`
    fn process(
        &mut self,
        event: metric::Event,
        res: &mut Vec<metric::Event>,
    ) -> Result<(), FilterError>;
}

/// Run `event` through `filters` in order
///
/// Each filter sees every event emitted by the one before it. An event a
/// filter rejects is logged and dropped; the rest of the stream continues.
pub fn run_chain(filters: &mut [Box<Filter + Send>], event: metric::Event) -> Vec<metric::Event> {
    let mut events = vec![event];
    for filter in filters.iter_mut() {
        let mut next = Vec::with_capacity(events.len());
        for ev in events.drain(..) {
            if let Err(fe) = filter.process(ev, &mut next) {
                error!("Failed to run filter with error: {}", fe);
                trace!("dropping event after '{}': {:?}", name_in_fe(&fe), event_in_fe(fe));
            }
        }
        events = next;
    }
    events
}
