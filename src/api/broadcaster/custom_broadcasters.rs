use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::models::address;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BroadcasterConfigError {
    #[error("`{0}` is not a shielded address; broadcaster addresses start with 0zk")]
    InvalidAddress(String),

    #[error("broadcaster {0} is already in the list")]
    AlreadyPinned(String),

    #[error("broadcaster {0} is not in the list")]
    NotPinned(String),

    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// On-disk layout of the broadcaster list.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct BroadcastersFile {
    broadcasters: Vec<String>,
}

/// The broadcaster addresses the user pinned, persisted as JSON.
///
/// Every add or remove rewrites the whole file before the in-memory list
/// changes, so memory and disk never disagree.
#[derive(Debug, Clone)]
pub struct CustomBroadcasters {
    path: PathBuf,
    addresses: Vec<String>,
}

impl CustomBroadcasters {
    /// an empty list that persists to `path`
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            addresses: vec![],
        }
    }

    /// Reads the list at `path`.
    ///
    /// A missing file is an empty list. A malformed file is logged and
    /// treated as empty; it is overwritten on the next change.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let addresses = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<BroadcastersFile>(&contents) {
                Ok(file) => file.broadcasters,
                Err(e) => {
                    warn!("ignoring malformed broadcaster list {}: {}", path.display(), e);
                    vec![]
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no broadcaster list at {}", path.display());
                vec![]
            }
            Err(e) => {
                warn!("could not read broadcaster list {}: {}", path.display(), e);
                vec![]
            }
        };
        info!("loaded {} custom broadcaster(s)", addresses.len());
        Self { path, addresses }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    pub fn contains(&self, candidate: &str) -> bool {
        let candidate = address::normalize(candidate);
        self.addresses
            .iter()
            .any(|a| address::normalize(a) == candidate)
    }

    pub async fn add(&mut self, broadcaster: &str) -> Result<(), BroadcasterConfigError> {
        let broadcaster = broadcaster.trim();
        if !address::is_shielded_address(broadcaster) {
            return Err(BroadcasterConfigError::InvalidAddress(broadcaster.to_string()));
        }
        if self.contains(broadcaster) {
            return Err(BroadcasterConfigError::AlreadyPinned(broadcaster.to_string()));
        }

        let mut updated = self.addresses.clone();
        updated.push(broadcaster.to_string());
        self.persist(updated).await?;
        info!("added custom broadcaster {}", broadcaster);
        Ok(())
    }

    pub async fn remove(&mut self, broadcaster: &str) -> Result<(), BroadcasterConfigError> {
        if !self.contains(broadcaster) {
            return Err(BroadcasterConfigError::NotPinned(broadcaster.to_string()));
        }

        let target = address::normalize(broadcaster);
        let updated = self
            .addresses
            .iter()
            .filter(|a| address::normalize(a) != target)
            .cloned()
            .collect();
        self.persist(updated).await?;
        info!("removed custom broadcaster {}", broadcaster);
        Ok(())
    }

    async fn persist(&mut self, addresses: Vec<String>) -> Result<(), BroadcasterConfigError> {
        let io_err = |source| BroadcasterConfigError::Io {
            path: self.path.clone(),
            source,
        };
        let file = BroadcastersFile {
            broadcasters: addresses,
        };
        let json = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;

        self.addresses = file.broadcasters;
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use assert2::check;
    use assert2::let_assert;
    use macro_rules_attr::apply;

    use super::*;
    use crate::tests::shared::files::unit_test_dir;
    use crate::tests::shared_tokio_runtime;

    const BROADCASTER: &str = "0zk1qyk9nn28x0u3rwn5pknglda68wrn7gw6anjw8gg94mcj6eq5u48tlrv7j6fe3z53lama02nutwtcqc979wnce0qwly4y7w4rls5cq040g7z8eagshxrw5ajy990";

    #[apply(shared_tokio_runtime)]
    async fn missing_file_loads_empty() {
        let dir = unit_test_dir();
        let list = CustomBroadcasters::load(dir.join(".broadcasters.json")).await;
        assert!(list.addresses().is_empty());
    }

    #[apply(shared_tokio_runtime)]
    async fn add_and_remove_persist_immediately() {
        let path = unit_test_dir().join(".broadcasters.json");
        let mut list = CustomBroadcasters::load(&path).await;

        list.add(BROADCASTER).await.unwrap();
        let reloaded = CustomBroadcasters::load(&path).await;
        check!(reloaded.addresses() == [BROADCASTER.to_string()]);

        let on_disk: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        check!(on_disk["broadcasters"][0] == BROADCASTER);

        list.remove(BROADCASTER).await.unwrap();
        let reloaded = CustomBroadcasters::load(&path).await;
        check!(reloaded.addresses().is_empty());
    }

    #[apply(shared_tokio_runtime)]
    async fn rejects_public_addresses_and_duplicates() {
        let path = unit_test_dir().join(".broadcasters.json");
        let mut list = CustomBroadcasters::load(&path).await;

        let_assert!(
            Err(BroadcasterConfigError::InvalidAddress(_)) =
                list.add("0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984").await
        );

        list.add(BROADCASTER).await.unwrap();
        let_assert!(
            Err(BroadcasterConfigError::AlreadyPinned(_)) =
                list.add(&BROADCASTER.to_uppercase().replacen("0ZK", "0zk", 1)).await
        );
        let_assert!(Err(BroadcasterConfigError::NotPinned(_)) = list.remove("0zkother").await);
        check!(list.addresses().len() == 1);
    }

    #[apply(shared_tokio_runtime)]
    async fn malformed_file_is_treated_as_empty_and_repaired() {
        let path = unit_test_dir().join(".broadcasters.json");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let mut list = CustomBroadcasters::load(&path).await;
        check!(list.addresses().is_empty());

        list.add(BROADCASTER).await.unwrap();
        check!(CustomBroadcasters::load(&path).await.addresses().len() == 1);
    }
}
