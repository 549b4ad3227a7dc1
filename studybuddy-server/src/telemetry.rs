use tracing_subscriber::EnvFilter;

// Targets match by prefix, so `studybuddy` covers every workspace crate.
const DEFAULT_FILTER: &str = "studybuddy=info,tower_http=info";
const VERBOSE_FILTER: &str = "studybuddy=debug,tower_http=debug";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the built-in filter.
pub fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
    }
}
