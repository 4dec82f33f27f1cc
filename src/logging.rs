use anyhow::Result;
use tracing_subscriber::fmt;

/// Installs a stderr subscriber when `verbose` is set; stdout may carry image bytes.
pub fn init(verbose: bool) -> Result<()> {
    if !verbose {
        return Ok(());
    }
    let _ = fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
    Ok(())
}
