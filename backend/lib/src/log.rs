//! Tracing subscriber setup
//!
//! Logs go to stdout either as Bunyan JSON lines or as human readable text,
//! see [`LogFormat`]. Request spans come from the `tower-http` trace layer on
//! the router, so the default filter enables them next to the crate's own
//! events.

use std::{borrow::Cow, io::Write};

use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::{config::LogFormat, constants::server::SERVICE_NAME};

/// Filter used when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "info,tower_http=debug";

/// Field prefix claimed by log shippers; Bunyan fields using it are renamed
const RESERVED_PREFIX: &str = "\"log.";
const RENAMED_PREFIX: &str = "\"backend_log.";

/// Renames reserved top-level field prefixes in JSON log lines
struct ReservedFieldWriter<W> {
    inner: W,
}

impl<W: Write> Write for ReservedFieldWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let line = match std::str::from_utf8(buf) {
            Ok(text) if text.contains(RESERVED_PREFIX) => {
                Cow::Owned(text.replace(RESERVED_PREFIX, RENAMED_PREFIX).into_bytes())
            }
            _ => Cow::Borrowed(buf),
        };

        self.inner.write_all(&line)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

struct StdoutJson;

impl<'a> MakeWriter<'a> for StdoutJson {
    type Writer = ReservedFieldWriter<std::io::Stdout>;

    fn make_writer(&'a self) -> Self::Writer {
        ReservedFieldWriter {
            inner: std::io::stdout(),
        }
    }
}

/// Installs the global subscriber
///
/// The filter is read from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
/// Must be called once, before the first event is emitted.
pub fn initialize_logging(log_format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = matches!(log_format.resolve(), LogFormat::Json);

    let storage = json.then_some(JsonStorageLayer);
    let bunyan =
        json.then(|| BunyanFormattingLayer::new(SERVICE_NAME.to_string(), StdoutJson));
    let text = (!json).then(|| tracing_subscriber::fmt::layer().with_target(true));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(storage)
        .with(bunyan)
        .with(text)
        .init();
}
