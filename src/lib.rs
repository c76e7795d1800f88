//! Strainer reads StatsD or OpenTSDB lines, aggregates and deduplicates them,
//! and writes the result back out as lines. It is meant to sit in a pipe,
//! between something that produces raw telemetry and something that stores
//! it, and cut the volume of data crossing that pipe.
//!
//! Why you might choose to use strainer:
//!
//!  * You need StatsD-style counters, gauges, timers and sets rolled up on an
//!    interval.
//!  * You write long runs of unchanging values to a time series database and
//!    would rather not.
//!  * You need to move points between the StatsD, OpenTSDB and graphite line
//!    protocols.
//!
//! The library is laid out as the executable uses it: `source` reads lines
//! and `protocols` decodes them into `metric::FieldRecord`s, `filter` holds
//! the stateful aggregate and dedupe stages and `sink` encodes and writes.
#![allow(unknown_lints)]
#![deny(trivial_numeric_casts, missing_docs, unstable_features, unused_import_braces)]
extern crate chrono;
extern crate clap;
extern crate hostname;
extern crate regex;
extern crate seahash;
extern crate serde;
extern crate serde_json;
extern crate toml;

#[macro_use]
extern crate log;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
extern crate tempdir;

pub mod buckets;
pub mod config;
pub mod filter;
pub mod metric;
pub mod protocols;
pub mod sink;
pub mod source;
pub mod time;
