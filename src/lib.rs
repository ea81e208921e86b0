pub mod detect;
pub mod discover;
pub mod document;
pub mod error;
pub mod policy;
pub mod regex_inducer;
pub mod stats;
pub mod types;
pub mod verify;

#[cfg(feature = "cli-support")]
pub fn init_logging(verbose: bool, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
