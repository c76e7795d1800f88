//! Write encoded records to a stream, standard out by default.

use metric::FieldRecord;
use protocols::opentsdb::{OpenTSDBEncoder, OpenTSDBEncoderConfig};
use protocols::{graphite, statsd, EncodeError};
use serde_json;
use sink::Sink;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Total records written
pub static CONSOLE_RECORD_WRITTEN: AtomicUsize = AtomicUsize::new(0);
/// Total records that could not be encoded
pub static CONSOLE_RECORD_DROPPED: AtomicUsize = AtomicUsize::new(0);

/// The output encoding of a `Console`
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Encoding {
    /// OpenTSDB put lines
    OpenTSDB,
    /// StatsD lines
    Statsd,
    /// Graphite plaintext
    Graphite,
    /// One JSON object per line
    Json,
}

impl Encoding {
    /// Look up an encoding by its configuration name
    pub fn from_name(name: &str) -> Option<Encoding> {
        match name {
            "opentsdb" => Some(Encoding::OpenTSDB),
            "statsd" => Some(Encoding::Statsd),
            "graphite" => Some(Encoding::Graphite),
            "json" => Some(Encoding::Json),
            _ => None,
        }
    }
}

/// Configuration for `Console`
#[derive(Clone, Debug, PartialEq)]
pub struct ConsoleConfig {
    /// How records are written
    pub encoding: Encoding,
    /// Options for the `opentsdb` encoding
    pub opentsdb: OpenTSDBEncoderConfig,
}

impl Default for ConsoleConfig {
    fn default() -> ConsoleConfig {
        ConsoleConfig {
            encoding: Encoding::OpenTSDB,
            opentsdb: OpenTSDBEncoderConfig::default(),
        }
    }
}

/// Write each record, encoded, to `W`
pub struct Console<W> {
    encoding: Encoding,
    opentsdb: OpenTSDBEncoder,
    out: W,
}

impl Console<io::Stdout> {
    /// Create a Console writing to standard out
    pub fn stdout(config: &ConsoleConfig) -> Self {
        Console::new(config, io::stdout())
    }
}

impl<W> Console<W>
where
    W: Write,
{
    /// Create a new Console
    pub fn new(config: &ConsoleConfig, out: W) -> Console<W> {
        Console {
            encoding: config.encoding,
            opentsdb: OpenTSDBEncoder::new(&config.opentsdb),
            out: out,
        }
    }

    /// Encode a record with the configured encoding
    pub fn encode(&self, record: &FieldRecord) -> Result<String, EncodeError> {
        match self.encoding {
            Encoding::OpenTSDB => self.opentsdb.encode(record),
            Encoding::Statsd => statsd::encode(record),
            Encoding::Graphite => graphite::encode(record),
            Encoding::Json => match serde_json::to_string(record) {
                Ok(mut line) => {
                    line.push('\n');
                    Ok(line)
                }
                Err(e) => Err(EncodeError::Serialization(e.to_string())),
            },
        }
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W> Sink for Console<W>
where
    W: Write,
{
    fn deliver(&mut self, record: FieldRecord) {
        match self.encode(&record) {
            Ok(line) => {
                if let Err(e) = self.out.write_all(line.as_bytes()) {
                    error!("unable to write record: {}", e);
                    CONSOLE_RECORD_DROPPED.fetch_add(1, Ordering::Relaxed);
                } else {
                    CONSOLE_RECORD_WRITTEN.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(e) => {
                warn!("dropping record of type '{}': {}", record.message_type, e);
                CONSOLE_RECORD_DROPPED.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            error!("unable to flush output: {}", e);
        }
    }

    fn shutdown(&mut self) {
        self.flush();
        info!(
            "console shutting down, {} records written, {} dropped",
            CONSOLE_RECORD_WRITTEN.load(Ordering::Relaxed),
            CONSOLE_RECORD_DROPPED.load(Ordering::Relaxed)
        );
    }
}
