use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;

use crate::models::ProviderState;

use super::ProviderStateStore;

/// JSON file-backed cursor store.
///
/// Directory structure:
/// ```text
/// data/
///   providers/
///     {name}/
///       state.json
/// ```
pub struct JsonFileStateStore {
    base_path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn state_file(&self, provider: &str) -> PathBuf {
        self.base_path
            .join("providers")
            .join(provider)
            .join("state.json")
    }

    /// Provider names become directory names, so anything that could walk
    /// out of the data directory is rejected.
    fn check_provider_name(provider: &str) -> Result<()> {
        if provider.is_empty() {
            anyhow::bail!("provider name is empty");
        }
        if provider == "." || provider == ".." {
            anyhow::bail!("provider name {provider:?} is not a valid key");
        }
        if provider.contains('/') || provider.contains('\\') || provider.contains('\0') {
            anyhow::bail!("provider name {provider:?} contains path separators");
        }
        Ok(())
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {path:?}"))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read file"),
        }
    }

    async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        fs::write(path, content)
            .await
            .context("Failed to write file")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProviderStateStore for JsonFileStateStore {
    async fn get_state(&self, provider: &str) -> Result<Option<ProviderState>> {
        Self::check_provider_name(provider)?;
        Self::read_json(&self.state_file(provider)).await
    }

    async fn save_state(&self, provider: &str, state: &ProviderState) -> Result<()> {
        Self::check_provider_name(provider)?;
        Self::write_json(&self.state_file(provider), state).await
    }
}
