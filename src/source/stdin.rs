//! Line-oriented input, by default standard in.

use metric;
use protocols::opentsdb::{self, OpenTSDBDecoderConfig};
use protocols::{statsd, ParseError};
use source::{send, Channel, Source};
use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

lazy_static! {
    /// Total lines decoded into records
    pub static ref LINES_GOOD: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total lines that failed to decode
    pub static ref LINES_BAD: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
}

/// The wire protocol of incoming lines
#[derive(Clone, Debug, PartialEq)]
pub enum Decoding {
    /// StatsD lines, see `protocols::statsd::decode`
    Statsd,
    /// OpenTSDB put lines, see `protocols::opentsdb::decode`
    OpenTSDB(OpenTSDBDecoderConfig),
}

impl Decoding {
    /// Decode a single line
    pub fn decode(&self, line: &str) -> Result<metric::FieldRecord, ParseError> {
        match *self {
            Decoding::Statsd => statsd::decode(line),
            Decoding::OpenTSDB(ref config) => opentsdb::decode(line, config),
        }
    }
}

/// Read lines from `R`, decode them and send the records on
///
/// A line that fails to decode is logged, counted and skipped. Blank lines
/// are ignored. Each record carries its source line as payload. At end of input the source sends `Shutdown`.
pub struct LineSource<R> {
    reader: R,
    decoding: Decoding,
    chan: Channel,
}

impl LineSource<io::BufReader<io::Stdin>> {
    /// Create a LineSource over standard in
    pub fn stdin(decoding: Decoding, chan: Channel) -> Self {
        LineSource::new(io::BufReader::new(io::stdin()), decoding, chan)
    }
}

impl<R> LineSource<R>
where
    R: BufRead,
{
    /// Create a new LineSource. This will not produce a new thread, that must
    /// be managed by the end-user.
    pub fn new(reader: R, decoding: Decoding, chan: Channel) -> LineSource<R> {
        LineSource {
            reader: reader,
            decoding: decoding,
            chan: chan,
        }
    }
}

impl<R> Source for LineSource<R>
where
    R: BufRead,
{
    fn run(&mut self) {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match self.decoding.decode(&line) {
                        Ok(record) => {
                            LINES_GOOD.fetch_add(1, Ordering::Relaxed);
                            let raw = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
                            let record = record.payload(raw.as_bytes().to_vec());
                            if !send("lines", &self.chan, metric::Event::Record(record)) {
                                return;
                            }
                        }
                        Err(e) => {
                            LINES_BAD.fetch_add(1, Ordering::Relaxed);
                            warn!("dropping line: {}", e);
                            trace!("bad line: {:?}", line);
                        }
                    }
                }
                Err(e) => {
                    error!("failed to read input: {}", e);
                    break;
                }
            }
        }
        info!(
            "input exhausted, {} good lines, {} bad lines",
            LINES_GOOD.load(Ordering::Relaxed),
            LINES_BAD.load(Ordering::Relaxed)
        );
        send("lines", &self.chan, metric::Event::Shutdown);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use metric::Event;
    use std::io::Cursor;
    use std::sync::mpsc;

    #[test]
    fn decodes_lines_and_shuts_down() {
        let (snd, rcv) = mpsc::channel();
        let input = Cursor::new("a:1|c\n\nnot a line\nb:2|g\n".as_bytes());
        let before = LINES_BAD.load(Ordering::Relaxed);
        LineSource::new(input, Decoding::Statsd, snd).run();

        let events: Vec<Event> = rcv.iter().collect();
        assert_eq!(3, events.len());
        match events[1] {
            Event::Record(ref r) => assert_eq!(Some("b"), r.metric_name()),
            ref other => panic!("unexpected {:?}", other),
        }
        assert_eq!(Event::Shutdown, events[2]);
        assert!(LINES_BAD.load(Ordering::Relaxed) > before);
    }

    #[test]
    fn opentsdb_lines() {
        let (snd, rcv) = mpsc::channel();
        let input = Cursor::new("put cpu 10 1 host=a\n".as_bytes());
        let decoding = Decoding::OpenTSDB(OpenTSDBDecoderConfig::default());
        LineSource::new(input, decoding, snd).run();

        match rcv.recv() {
            Ok(Event::Record(r)) => {
                assert_eq!("opentsdb", r.message_type);
                assert_eq!(10_000_000_000, r.timestamp);
                assert_eq!(Some(b"put cpu 10 1 host=a".to_vec()), r.payload);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(Ok(Event::Shutdown), rcv.recv());
    }
}
