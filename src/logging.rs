use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "warn";
const VERBOSE_DIRECTIVE: &str = "result_analyzer=debug";

/// Filter from `RUST_LOG` (or `warn` when unset or unparsable); `verbose`
/// adds crate-level debug on top of either.
pub fn env_filter(verbose: bool, rust_log: Option<&str>) -> anyhow::Result<EnvFilter> {
    let filter = rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE));

    if verbose {
        Ok(filter.add_directive(VERBOSE_DIRECTIVE.parse::<Directive>()?))
    } else {
        Ok(filter)
    }
}

/// Logs go to stderr; stdout carries the report.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = env_filter(verbose, rust_log.as_deref())?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
