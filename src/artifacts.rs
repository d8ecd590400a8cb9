//! Loads contract deployment artifacts and resolves per-network addresses.

use ethers::types::Address;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::Web3Error;

/// One `networks` entry of a deployment artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkDeployment {
    pub address: Address,
}

/// Truffle-style artifact document: an ABI plus addresses per network.
///
/// `networks` is keyed by the decimal chain id, matching the files the
/// migration tooling writes.
#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    pub abi: Value,
    #[serde(default)]
    pub networks: HashMap<String, NetworkDeployment>,
}

/// A named contract resolved for one concrete chain.
#[derive(Debug, Clone)]
pub struct DeployedContract {
    pub abi: Value,
    pub address: Address,
}

/// Reads artifact JSON files from a base directory, `<base>/<Name>.json`.
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    base_dir: PathBuf,
}

impl ArtifactLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolves contract `name` on `chain_id`.
    ///
    /// A missing file maps to `ArtifactNotFound`, a chain id absent from the
    /// `networks` table to `UnsupportedNetwork`; anything unreadable or
    /// unparseable is an `ArtifactLoad` failure.
    pub async fn load(&self, name: &str, chain_id: u64) -> Result<DeployedContract, Web3Error> {
        let path = self.base_dir.join(format!("{}.json", name));

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Web3Error::ArtifactNotFound {
                    name: name.to_string(),
                });
            }
            Err(e) => {
                return Err(Web3Error::ArtifactLoad {
                    detail: format!("{}: {}", path.display(), e),
                });
            }
        };

        let artifact: Artifact = serde_json::from_slice(&bytes).map_err(|e| {
            Web3Error::ArtifactLoad {
                detail: format!("{}: {}", path.display(), e),
            }
        })?;

        let deployment = artifact
            .networks
            .get(&chain_id.to_string())
            .ok_or(Web3Error::UnsupportedNetwork { chain_id })?;

        debug!(
            "Resolved artifact {} for chain {} at {:#x}",
            name, chain_id, deployment.address
        );

        Ok(DeployedContract {
            abi: artifact.abi,
            address: deployment.address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MARKET_ADDRESS: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

    fn write_market_artifact(dir: &TempDir) {
        let body = format!(
            r#"{{
                "contractName": "NftMarket",
                "abi": [{{"type": "function", "name": "listingPrice", "inputs": [], "outputs": [{{"type": "uint256"}}]}}],
                "networks": {{
                    "1337": {{ "address": "{}" }}
                }}
            }}"#,
            MARKET_ADDRESS
        );
        fs::write(dir.path().join("NftMarket.json"), body).unwrap();
    }

    #[tokio::test]
    async fn test_load_resolves_address_for_known_chain() {
        let dir = TempDir::new().unwrap();
        write_market_artifact(&dir);
        let loader = ArtifactLoader::new(dir.path());

        let deployed = loader.load("NftMarket", 1337).await.unwrap();
        assert_eq!(deployed.address, MARKET_ADDRESS.parse().unwrap());
        assert!(deployed.abi.is_array());
    }

    #[tokio::test]
    async fn test_load_unknown_chain_is_unsupported_network() {
        let dir = TempDir::new().unwrap();
        write_market_artifact(&dir);
        let loader = ArtifactLoader::new(dir.path());

        match loader.load("NftMarket", 5).await {
            Err(Web3Error::UnsupportedNetwork { chain_id }) => assert_eq!(chain_id, 5),
            other => panic!("expected UnsupportedNetwork, got {:?}", other.map(|d| d.address)),
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_is_artifact_not_found() {
        let dir = TempDir::new().unwrap();
        let loader = ArtifactLoader::new(dir.path());

        assert!(matches!(
            loader.load("Missing", 1337).await,
            Err(Web3Error::ArtifactNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_malformed_json_is_artifact_load_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Broken.json"), "{not json").unwrap();
        let loader = ArtifactLoader::new(dir.path());

        assert!(matches!(
            loader.load("Broken", 1337).await,
            Err(Web3Error::ArtifactLoad { .. })
        ));
    }
}
