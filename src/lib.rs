pub mod agent;
pub mod analysis;
pub mod browser;
pub mod config;
pub mod errors;
pub mod llm;
pub mod locators;
pub mod reporting;
pub mod testcase;

#[cfg(test)]
mod testing;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
