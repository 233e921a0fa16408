//! Log initialization. A single-threaded batch tool has no event stream to
//! narrate, so this is reduced to one `tracing-subscriber` setup call: a
//! `fmt` layer writing to stderr, filtered by `RUST_LOG` with a verbosity
//! floor raised by repeated `-v`.

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. `verbosity` is the count of
/// `-v` flags: 0 maps to `info`, 1 to `debug`, 2 or more to `trace`, unless
/// `RUST_LOG` is set, in which case it always wins.
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
