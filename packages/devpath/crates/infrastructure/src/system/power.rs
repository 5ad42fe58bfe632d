use anyhow::{bail, Context, Result};

use crate::system::command;

/// Reboots the machine immediately so every process picks up the new
/// environment.
pub fn restart_now() -> Result<()> {
    if !cfg!(windows) {
        bail!("Restarting is only supported on Windows");
    }

    let output = command::run("shutdown", &["/r", "/t", "0"]).context("Failed to run shutdown")?;
    if !output.success() {
        bail!("shutdown refused to restart: {}", output.stderr.trim());
    }
    Ok(())
}
