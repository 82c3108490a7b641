use crate::process::{check_tool, run_tool};
use crate::{command_from_env, MarkdownConverter, ProviderError, ToolStatus};
use std::path::{Path, PathBuf};

/// Converts documents to markdown with the `markitdown` executable
/// (`MARKITDOWN_CMD` overrides the location).
#[derive(Debug, Clone)]
pub struct MarkItDownCli {
    pub command: PathBuf,
}

impl MarkItDownCli {
    pub fn from_env() -> Self {
        Self {
            command: command_from_env("MARKITDOWN_CMD", "markitdown"),
        }
    }

    pub async fn check(&self) -> ToolStatus {
        check_tool("markitdown", &self.command, &["--help"]).await
    }
}

#[async_trait::async_trait]
impl MarkdownConverter for MarkItDownCli {
    async fn convert(&self, path: &Path) -> Result<String, ProviderError> {
        let stdout = run_tool(&self.command, [path.as_os_str()]).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}
