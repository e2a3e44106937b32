use tracing::level_filters::LevelFilter;

mod record;
pub use record::*;

mod sheet;
pub use sheet::*;

mod toolkit;
pub use toolkit::*;

mod conformers;
pub use conformers::*;

mod duplicates;
pub use duplicates::*;

mod report;
pub use report::*;

/// Installs a stderr `tracing` subscriber at the given level ("error" through
/// "trace", or "off"). Unknown levels fall back to "info". Calling it twice is
/// harmless.
pub fn init_logging(level: &str) {
    let filter = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging("not-a-level");
        init_logging("trace");
        tracing::info!("logging initialized");
    }
}
