//! Tracing subscriber setup shared by the binaries.

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "tsencode=debug,tsencode_av=debug,tsencode_plan=debug"
    } else {
        "tsencode=info,tsencode_av=info,tsencode_plan=info"
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for command output.
pub fn init(verbose: bool) {
    // Respect RUST_LOG env var if set
    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter(verbose).to_string());

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();
}
