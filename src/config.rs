//! Provides the CLI option parser
//!
//! Used to parse the argv/config file into a struct that the executable can
//! consume and use as configuration data.
//!
//! The configuration file is TOML:
//!
//! ```toml
//! decoder = "statsd"        # or "opentsdb"
//! encoder = "opentsdb"      # or "statsd", "graphite", "json"
//! ticker_interval = 10      # seconds between flushes
//!
//! [decoders.opentsdb]
//! tagname_prefix = ""
//!
//! [encoders.opentsdb]
//! tagname_prefix = ""
//! tagvalue_prefix = ""
//! ts_from_message = true
//! fields_to_tags = true
//! tags_if_missing = ["dc=east"]
//! tags_override = []
//! add_hostname_if_missing = false
//!
//! [filters.aggregate]       # present to enable
//! global_prefix = "stats"
//! percentiles = [50, 75, 90, 99]
//! send_idle_stats = false
//! calculate_rates = false
//!
//! [filters.dedupe]          # present to enable
//! dedupe_window = 300       # seconds
//! variant_fields = ["Value"]
//! ```

use buckets::Percentile;
use clap::{App, Arg};
use filter::{AggregateFilterConfig, DedupeFilterConfig};
use protocols::opentsdb::{OpenTSDBDecoderConfig, OpenTSDBEncoderConfig};
use sink::{ConsoleConfig, Encoding};
use source::Decoding;
use std::error;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use time;
use toml;

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

/// Failures reading or interpreting configuration. All are fatal.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    Io(String, io::Error),
    /// The configuration file is not valid TOML
    Toml(String),
    /// The key holds a value that can't be used. The second member explains.
    InvalidValue(String, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::Io(ref path, ref e) => write!(f, "could not read {}: {}", path, e),
            ConfigError::Toml(ref e) => write!(f, "could not parse config file: {}", e),
            ConfigError::InvalidValue(ref key, ref reason) => {
                write!(f, "invalid value for {}: {}", key, reason)
            }
        }
    }
}

impl error::Error for ConfigError {}

/// Big configuration struct for the strainer executable
///
/// This struct is what we construct from parsing the configuration. Please
/// see documentation on `parse_args` in this module for more details.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    /// Count of `-v` flags
    pub verbose: u64,
    /// Seconds between `TimerFlush` pulses
    pub ticker_interval: u64,
    /// How input lines are decoded
    pub decoding: Decoding,
    /// How output records are written
    pub console: ConsoleConfig,
    /// Aggregation, if enabled
    pub aggregate: Option<AggregateFilterConfig>,
    /// Deduplication, if enabled
    pub dedupe: Option<DedupeFilterConfig>,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            verbose: 0,
            ticker_interval: 10,
            decoding: Decoding::Statsd,
            console: ConsoleConfig::default(),
            aggregate: None,
            dedupe: None,
        }
    }
}

fn invalid<S>(key: &str, reason: S) -> ConfigError
where
    S: Into<String>,
{
    ConfigError::InvalidValue(key.to_string(), reason.into())
}

fn get_str(tbl: &toml::Value, key: &str, path: &str) -> Result<Option<String>, ConfigError> {
    match tbl.get(key) {
        Some(v) => v.as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| invalid(path, "must be a string")),
        None => Ok(None),
    }
}

fn get_bool(tbl: &toml::Value, key: &str, path: &str) -> Result<Option<bool>, ConfigError> {
    match tbl.get(key) {
        Some(v) => v.as_bool()
            .map(Some)
            .ok_or_else(|| invalid(path, "must be a boolean")),
        None => Ok(None),
    }
}

fn get_number(tbl: &toml::Value, key: &str, path: &str) -> Result<Option<f64>, ConfigError> {
    match tbl.get(key) {
        Some(v) => match (v.as_integer(), v.as_float()) {
            (Some(i), _) => Ok(Some(i as f64)),
            (_, Some(f)) => Ok(Some(f)),
            _ => Err(invalid(path, "must be a number")),
        },
        None => Ok(None),
    }
}

fn get_str_list(
    tbl: &toml::Value,
    key: &str,
    path: &str,
) -> Result<Option<Vec<String>>, ConfigError> {
    match tbl.get(key) {
        Some(v) => {
            let arr = v.as_array()
                .ok_or_else(|| invalid(path, "must be an array of strings"))?;
            let mut res = Vec::with_capacity(arr.len());
            for s in arr {
                match s.as_str() {
                    Some(s) => res.push(s.to_string()),
                    None => return Err(invalid(path, "must be an array of strings")),
                }
            }
            Ok(Some(res))
        }
        None => Ok(None),
    }
}

fn get_number_list(
    tbl: &toml::Value,
    key: &str,
    path: &str,
) -> Result<Option<Vec<f64>>, ConfigError> {
    match tbl.get(key) {
        Some(v) => {
            let arr = v.as_array()
                .ok_or_else(|| invalid(path, "must be an array of numbers"))?;
            let mut res = Vec::with_capacity(arr.len());
            for n in arr {
                match (n.as_integer(), n.as_float()) {
                    (Some(i), _) => res.push(i as f64),
                    (_, Some(f)) => res.push(f),
                    _ => return Err(invalid(path, "must be an array of numbers")),
                }
            }
            Ok(Some(res))
        }
        None => Ok(None),
    }
}

fn parse_opentsdb_encoder(tbl: &toml::Value) -> Result<OpenTSDBEncoderConfig, ConfigError> {
    let mut config = OpenTSDBEncoderConfig::default();
    if let Some(s) = get_str(tbl, "tagname_prefix", "encoders.opentsdb.tagname_prefix")? {
        config.tagname_prefix = s;
    }
    if let Some(s) = get_str(tbl, "tagvalue_prefix", "encoders.opentsdb.tagvalue_prefix")? {
        config.tagvalue_prefix = s;
    }
    if let Some(b) = get_bool(tbl, "ts_from_message", "encoders.opentsdb.ts_from_message")? {
        config.ts_from_message = b;
    }
    if let Some(b) = get_bool(tbl, "fields_to_tags", "encoders.opentsdb.fields_to_tags")? {
        config.fields_to_tags = b;
    }
    if let Some(l) = get_str_list(tbl, "tags_if_missing", "encoders.opentsdb.tags_if_missing")? {
        config.tags_if_missing = l;
    }
    if let Some(l) = get_str_list(tbl, "tags_override", "encoders.opentsdb.tags_override")? {
        config.tags_override = l;
    }
    if let Some(b) = get_bool(
        tbl,
        "add_hostname_if_missing",
        "encoders.opentsdb.add_hostname_if_missing",
    )? {
        config.add_hostname_if_missing = b;
    }
    Ok(config)
}

fn parse_aggregate(
    tbl: &toml::Value,
    ticker_interval: u64,
) -> Result<AggregateFilterConfig, ConfigError> {
    let mut config = AggregateFilterConfig::default();
    config.ticker_interval = ticker_interval;
    {
        let mut prefixes: [(&str, &mut String); 6] = [
            ("global_prefix", &mut config.global_prefix),
            ("counter_prefix", &mut config.counter_prefix),
            ("timer_prefix", &mut config.timer_prefix),
            ("gauge_prefix", &mut config.gauge_prefix),
            ("set_prefix", &mut config.set_prefix),
            ("statsd_prefix", &mut config.statsd_prefix),
        ];
        for pair in prefixes.iter_mut() {
            if let Some(s) = get_str(tbl, pair.0, &format!("filters.aggregate.{}", pair.0))? {
                *pair.1 = s;
            }
        }
    }
    if let Some(ps) = get_number_list(tbl, "percentiles", "filters.aggregate.percentiles")? {
        for p in &ps {
            if Percentile::new(*p).is_none() {
                return Err(invalid(
                    "filters.aggregate.percentiles",
                    format!("{} is not a percentile greater than zero", p),
                ));
            }
        }
        config.percentiles = ps;
    }
    if let Some(b) = get_bool(tbl, "send_idle_stats", "filters.aggregate.send_idle_stats")? {
        config.send_idle_stats = b;
    }
    if let Some(b) = get_bool(tbl, "calculate_rates", "filters.aggregate.calculate_rates")? {
        config.calculate_rates = b;
    }
    if let Some(s) = get_str(tbl, "message_type", "filters.aggregate.message_type")? {
        config.message_type = s;
    }
    Ok(config)
}

fn parse_dedupe(tbl: &toml::Value) -> Result<DedupeFilterConfig, ConfigError> {
    let mut config = DedupeFilterConfig::default();
    if let Some(secs) = get_number(tbl, "dedupe_window", "filters.dedupe.dedupe_window")? {
        if !secs.is_finite() {
            return Err(invalid("filters.dedupe.dedupe_window", "must be finite"));
        }
        config.dedupe_window = (secs * time::NANOS_PER_SECOND as f64) as i64;
    }
    if let Some(l) = get_str_list(tbl, "variant_fields", "filters.dedupe.variant_fields")? {
        config.variant_fields = l;
    }
    if let Some(l) = get_str_list(tbl, "invariant_fields", "filters.dedupe.invariant_fields")? {
        config.invariant_fields = l;
    }
    config.dedupe_key_field =
        get_str(tbl, "dedupe_key_field", "filters.dedupe.dedupe_key_field")?;
    if let Some(s) = get_str(tbl, "stats_prefix", "filters.dedupe.stats_prefix")? {
        config.stats_prefix = s;
    }
    if let Some(s) = get_str(tbl, "message_type", "filters.dedupe.message_type")? {
        config.message_type = s;
    }
    if let Some(b) = get_bool(
        tbl,
        "pass_through_when_disabled",
        "filters.dedupe.pass_through_when_disabled",
    )? {
        config.pass_through_when_disabled = b;
    }
    Ok(config)
}

/// Parse the command line, then the configuration file it names.
///
/// `-C`/`--config` names the TOML file; each `-v` raises log verbosity.
pub fn parse_args() -> Result<Args, ConfigError> {
    let args = App::new("strainer")
        .version(VERSION.unwrap_or("unknown"))
        .about("StatsD and OpenTSDB aggregation and deduplication over stdin")
        .arg(
            Arg::with_name("config-file")
                .long("config")
                .short("C")
                .value_name("config")
                .required(true)
                .help("The config file to feed in.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Turn on verbose output."),
        )
        .get_matches();

    let verb = args.occurrences_of("verbose");
    match args.value_of("config-file") {
        Some(filename) => from_file(filename, verb),
        None => Err(invalid("config", "a config file is required")),
    }
}

/// Read and parse the configuration file at `path`
pub fn from_file<P>(path: P, verbosity: u64) -> Result<Args, ConfigError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut buffer = String::new();
    File::open(path)
        .and_then(|mut fp| fp.read_to_string(&mut buffer))
        .map_err(|e| ConfigError::Io(path.display().to_string(), e))?;
    parse_config_file(&buffer, verbosity)
}

/// Parse the strainer configuration file.
///
/// See the module documentation for the format. Every key is optional.
pub fn parse_config_file(buffer: &str, verbosity: u64) -> Result<Args, ConfigError> {
    let mut args = Args::default();
    let value: toml::Value =
        toml::from_str(buffer).map_err(|e| ConfigError::Toml(e.to_string()))?;

    args.verbose = verbosity;

    if let Some(secs) = value.get("ticker_interval") {
        match secs.as_integer() {
            Some(i) if i > 0 => args.ticker_interval = i as u64,
            _ => return Err(invalid("ticker_interval", "must be a positive integer")),
        }
    }

    let decoder = get_str(&value, "decoder", "decoder")?.unwrap_or_else(|| "statsd".to_string());
    args.decoding = match decoder.as_str() {
        "statsd" => Decoding::Statsd,
        "opentsdb" => {
            let mut config = OpenTSDBDecoderConfig::default();
            if let Some(tbl) = value.get("decoders").and_then(|d| d.get("opentsdb")) {
                let path = "decoders.opentsdb.tagname_prefix";
                if let Some(s) = get_str(tbl, "tagname_prefix", path)? {
                    config.tagname_prefix = s;
                }
            }
            Decoding::OpenTSDB(config)
        }
        other => return Err(invalid("decoder", format!("unknown decoder '{}'", other))),
    };

    let encoder = get_str(&value, "encoder", "encoder")?.unwrap_or_else(|| "opentsdb".to_string());
    args.console.encoding = match Encoding::from_name(&encoder) {
        Some(enc) => enc,
        None => return Err(invalid("encoder", format!("unknown encoder '{}'", encoder))),
    };
    if let Some(tbl) = value.get("encoders").and_then(|e| e.get("opentsdb")) {
        args.console.opentsdb = parse_opentsdb_encoder(tbl)?;
    }

    if let Some(filters) = value.get("filters") {
        if let Some(tbl) = filters.get("aggregate") {
            args.aggregate = Some(parse_aggregate(tbl, args.ticker_interval)?);
        }
        if let Some(tbl) = filters.get("dedupe") {
            args.dedupe = Some(parse_dedupe(tbl)?);
        }
    }

    Ok(args)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use tempdir::TempDir;

    #[test]
    fn config_defaults() {
        let args = parse_config_file("", 4).unwrap();
        assert_eq!(4, args.verbose);
        assert_eq!(10, args.ticker_interval);
        assert_eq!(Decoding::Statsd, args.decoding);
        assert_eq!(Encoding::OpenTSDB, args.console.encoding);
        assert!(args.console.opentsdb.ts_from_message);
        assert_eq!(None, args.aggregate);
        assert_eq!(None, args.dedupe);
    }

    #[test]
    fn config_full() {
        let config = r#"
decoder = "opentsdb"
encoder = "graphite"
ticker_interval = 5

[decoders.opentsdb]
tagname_prefix = "tag_"

[encoders.opentsdb]
tagname_prefix = "_t_"
fields_to_tags = false
tags_if_missing = ["dc=east"]
tags_override = ["env=prod", "zone=b"]
add_hostname_if_missing = true

[filters.aggregate]
global_prefix = "stats"
counter_prefix = "counters"
percentiles = [90.0, 99.9]
send_idle_stats = true
calculate_rates = true

[filters.dedupe]
dedupe_window = 2.5
variant_fields = ["Value", "Status"]
dedupe_key_field = "series"
pass_through_when_disabled = true
"#;
        let args = parse_config_file(config, 0).unwrap();
        assert_eq!(5, args.ticker_interval);
        assert_eq!(
            Decoding::OpenTSDB(OpenTSDBDecoderConfig {
                tagname_prefix: "tag_".to_string(),
            }),
            args.decoding
        );
        assert_eq!(Encoding::Graphite, args.console.encoding);

        let enc = &args.console.opentsdb;
        assert_eq!("_t_", enc.tagname_prefix);
        assert!(!enc.fields_to_tags);
        assert!(enc.ts_from_message);
        assert!(enc.add_hostname_if_missing);
        assert_eq!(vec!["dc=east".to_string()], enc.tags_if_missing);
        assert_eq!(2, enc.tags_override.len());

        let aggr = args.aggregate.unwrap();
        assert_eq!(5, aggr.ticker_interval);
        assert_eq!("stats", aggr.global_prefix);
        assert_eq!("counters", aggr.counter_prefix);
        assert_eq!("", aggr.timer_prefix);
        assert_eq!("statsd", aggr.statsd_prefix);
        assert_eq!(vec![90.0, 99.9], aggr.percentiles);
        assert!(aggr.send_idle_stats);
        assert!(aggr.calculate_rates);

        let dedupe = args.dedupe.unwrap();
        assert_eq!(2_500_000_000, dedupe.dedupe_window);
        assert_eq!(
            vec!["Value".to_string(), "Status".to_string()],
            dedupe.variant_fields
        );
        assert_eq!(Some("series".to_string()), dedupe.dedupe_key_field);
        assert!(dedupe.pass_through_when_disabled);
        assert_eq!("heka.dedupe", dedupe.stats_prefix);
    }

    #[test]
    fn config_rejects_bad_values() {
        for config in &[
            "decoder = \"influx\"",
            "encoder = \"carbon\"",
            "ticker_interval = 0",
            "ticker_interval = \"ten\"",
            "[filters.aggregate]\npercentiles = [0, 50]",
            "[filters.aggregate]\npercentiles = [\"p90\"]",
            "[filters.aggregate]\nsend_idle_stats = \"yes\"",
            "[filters.dedupe]\nvariant_fields = \"Value\"",
            "[encoders.opentsdb]\ntags_override = [1]",
        ] {
            match parse_config_file(config, 0) {
                Err(ConfigError::InvalidValue(_, _)) => {}
                other => panic!("expected InvalidValue for {:?}, got {:?}", config, other),
            }
        }
        match parse_config_file("decoder = ", 0) {
            Err(ConfigError::Toml(_)) => {}
            other => panic!("expected Toml error, got {:?}", other),
        }
    }

    #[test]
    fn config_from_file() {
        let dir = TempDir::new("strainer").unwrap();
        let path = dir.path().join("strainer.toml");
        let mut fp = File::create(&path).unwrap();
        fp.write_all(b"encoder = \"json\"\n[filters.dedupe]\ndedupe_window = 60\n")
            .unwrap();
        drop(fp);

        let args = from_file(&path, 1).unwrap();
        assert_eq!(Encoding::Json, args.console.encoding);
        assert_eq!(Some(60 * 1_000_000_000), args.dedupe.map(|d| d.dedupe_window));

        match from_file(dir.path().join("missing.toml"), 0) {
            Err(ConfigError::Io(_, _)) => {}
            other => panic!("expected Io error, got {:?}", other),
        }
    }
}
