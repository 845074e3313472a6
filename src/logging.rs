use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// Level used by `--verbose`: per-chunk flushes, table stats and font resolution are
/// logged at debug.
pub const VERBOSE_LEVEL: Level = Level::DEBUG;

/// Installs the stderr subscriber when `verbose` is set. Safe to call more than once.
pub fn init(verbose: bool) -> Result<()> {
    if !verbose {
        return Ok(());
    }
    let _ = fmt()
        .with_writer(std::io::stderr)
        .with_max_level(VERBOSE_LEVEL)
        .with_target(false)
        .with_level(true)
        .without_time()
        .try_init();
    Ok(())
}
