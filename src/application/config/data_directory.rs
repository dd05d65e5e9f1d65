use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use directories::ProjectDirs;

use crate::models::chain::Chain;

const CUSTOM_BROADCASTERS_FILE_NAME: &str = ".broadcasters.json";
const LOG_FILE_NAME: &str = "shielded-terminal.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDirectory {
    data_dir: PathBuf,
}

impl DataDirectory {
    ///////////////////////////////////////////////////////////////////////////
    ///
    /// The data directory that contains configuration and logs
    ///
    /// The default varies by operating system, and includes the chain, e.g.
    ///
    /// - Linux:   /home/alice/.local/share/shielded-terminal/ethereum
    /// - Windows: C:\Users\Alice\AppData\Roaming\shielded-terminal\data\ethereum
    /// - macOS:   /Users/Alice/Library/Application Support/shielded-terminal/ethereum
    ///
    /// The custom broadcaster list is shared by all chains and lives in the
    /// root, one level above the chain directory.
    pub fn get(root_dir: Option<PathBuf>, chain: Chain) -> Result<Self> {
        let root = match root_dir {
            Some(dir) => dir,
            None => ProjectDirs::from("org", "shielded-terminal", "shielded-terminal")
                .context("Could not determine data directory")?
                .data_dir()
                .to_path_buf(),
        };

        Ok(DataDirectory {
            data_dir: root.join(Path::new(&chain.to_string())),
        })
    }

    /// Create directory if it does not exist
    pub async fn create_dir_if_not_exists(dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", dir.to_string_lossy()))
    }

    /// The chain specific directory
    pub fn chain_dir_path(&self) -> PathBuf {
        self.data_dir.clone()
    }

    /// The root directory shared by all chains
    pub fn root_dir_path(&self) -> PathBuf {
        self.data_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.data_dir.clone())
    }

    /// The user-pinned broadcaster list
    pub fn custom_broadcasters_file_path(&self) -> PathBuf {
        self.root_dir_path()
            .join(Path::new(CUSTOM_BROADCASTERS_FILE_NAME))
    }

    /// The log file written by the tracing subscriber
    pub fn log_file_path(&self) -> PathBuf {
        self.root_dir_path().join(Path::new(LOG_FILE_NAME))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn chain_directories_share_the_broadcaster_file() {
        let root = PathBuf::from("/tmp/shielded-terminal-test");
        let eth = DataDirectory::get(Some(root.clone()), Chain::Ethereum).unwrap();
        let bnb = DataDirectory::get(Some(root.clone()), Chain::Bnb).unwrap();

        assert_ne!(eth.chain_dir_path(), bnb.chain_dir_path());
        assert_eq!(
            eth.custom_broadcasters_file_path(),
            bnb.custom_broadcasters_file_path()
        );
        assert_eq!(
            root.join(".broadcasters.json"),
            eth.custom_broadcasters_file_path()
        );
    }
}
