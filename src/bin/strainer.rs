#![allow(unknown_lints)]

extern crate chrono;
extern crate fern;
#[macro_use]
extern crate log;
extern crate strainer;

use chrono::Utc;
use strainer::filter::{AggregateFilter, DedupeFilter, Filter};
use strainer::sink::{Console, Sink};
use strainer::source::{FlushTimer, LineSource, Source};
use std::process;
use std::sync::mpsc;
use std::thread;

fn main() {
    let args = match strainer::config::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let level = match args.verbose {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    // stdout carries data, so logs go to stderr
    if let Err(e) = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}][{}] {}",
                record.module_path().unwrap_or(""),
                record.line().unwrap_or(0),
                Utc::now().to_rfc3339(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
    {
        eprintln!("could not set up logging: {}", e);
        process::exit(1);
    }

    info!("strainer - {}", env!("CARGO_PKG_VERSION"));

    let mut filters: Vec<Box<Filter + Send>> = Vec::new();
    if let Some(ref config) = args.aggregate {
        match AggregateFilter::new(config) {
            Ok(aggr) => filters.push(Box::new(aggr)),
            Err(e) => {
                error!("{}", e);
                process::exit(1);
            }
        }
    }
    if let Some(ref config) = args.dedupe {
        filters.push(Box::new(DedupeFilter::new(config)));
    }

    let (snd, rcv) = mpsc::channel();

    let flush_snd = snd.clone();
    let ticker_interval = args.ticker_interval;
    thread::spawn(move || FlushTimer::new(flush_snd, ticker_interval).run());

    let decoding = args.decoding.clone();
    let lines = thread::spawn(move || LineSource::stdin(decoding, snd).run());

    let mut console = Console::stdout(&args.console);
    console.run(rcv, &mut filters);

    if lines.join().is_err() {
        error!("line source panicked");
        process::exit(1);
    }
}
