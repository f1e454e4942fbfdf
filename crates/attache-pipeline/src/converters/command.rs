//! Helpers for running external converter binaries.

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::process::Command;

use attache_core::{Error, Result};

async fn output_with_timeout(cmd: &mut Command, timeout_secs: u64) -> Result<std::process::Output> {
    let output = tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| {
            Error::Conversion(format!(
                "External command timed out after {}s",
                timeout_secs
            ))
        })?
        .map_err(|e| Error::Conversion(format!("Failed to execute command: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Conversion(format!(
            "Command failed (exit {}): {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(output)
}

/// Run a command with a timeout, returning stdout as a string.
pub(crate) async fn run_cmd_with_timeout(cmd: &mut Command, timeout_secs: u64) -> Result<String> {
    let output = output_with_timeout(cmd, timeout_secs).await?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a command that writes its results to files rather than stdout.
pub(crate) async fn run_cmd_status(cmd: &mut Command, timeout_secs: u64) -> Result<()> {
    output_with_timeout(cmd, timeout_secs).await.map(|_| ())
}

/// Whether `binary` can be spawned. Some tools print their version with a
/// non-zero exit code, so any completed run counts.
pub(crate) async fn binary_available(binary: &str, version_arg: &str) -> bool {
    Command::new(binary).arg(version_arg).output().await.is_ok()
}

/// Write input bytes to a temporary file for tools that read from a path.
pub(crate) fn write_temp_file(data: &[u8]) -> Result<NamedTempFile> {
    let mut tmpfile = NamedTempFile::new()
        .map_err(|e| Error::Conversion(format!("Failed to create temp file: {}", e)))?;
    tmpfile
        .write_all(data)
        .map_err(|e| Error::Conversion(format!("Failed to write temp file: {}", e)))?;
    Ok(tmpfile)
}
