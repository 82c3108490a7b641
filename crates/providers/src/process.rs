use crate::{ProviderError, ToolStatus};
use std::ffi::OsStr;
use std::path::Path;
use tokio::process::Command;

/// Runs an external tool to completion and returns its stdout.
pub async fn run_tool<I, S>(command: &Path, args: I) -> Result<Vec<u8>, ProviderError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let tool = command.to_string_lossy().into_owned();
    let output = Command::new(command)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProviderError::NotAvailable(tool.clone()),
            _ => ProviderError::Io(e),
        })?;
    if !output.status.success() {
        return Err(ProviderError::CommandFailed {
            tool,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// Checks that a tool starts and exits cleanly with the given arguments.
pub async fn check_tool(name: &str, command: &Path, args: &[&str]) -> ToolStatus {
    let (available, detail) = match Command::new(command).args(args).output().await {
        Ok(out) => {
            // poppler prints its version banner to stderr
            let text = if out.stdout.is_empty() {
                String::from_utf8_lossy(&out.stderr).into_owned()
            } else {
                String::from_utf8_lossy(&out.stdout).into_owned()
            };
            let first = text.lines().next().unwrap_or("").trim().to_string();
            (out.status.success(), first)
        }
        Err(e) => (false, e.to_string()),
    };
    ToolStatus {
        name: name.to_string(),
        command: command.to_path_buf(),
        available,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_tool_is_not_available() {
        let err = run_tool(Path::new("definitely-not-a-real-tool-xyz"), ["--version"])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotAvailable(_)));

        let status = check_tool("ghost", Path::new("definitely-not-a-real-tool-xyz"), &["-v"]).await;
        assert!(!status.available);
        assert_eq!(status.name, "ghost");
    }
}
