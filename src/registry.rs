//! Network registry.
//!
//! Known networks are described by a JSON document of `NetworkDescriptor`
//! entries. The registry is an explicit object owned by the caller; lookups
//! are unique both by numeric chain id and by name.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a network is driven. Anything other than an Ethereum-compatible
/// chain is carried in the registry but has no working backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    #[default]
    Eth,
    #[serde(other)]
    Unsupported,
}

/// Static description of one network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    /// Chain id as reported by `eth_chainId`.
    pub id: u64,
    pub name: String,
    /// Native currency symbol, e.g. "ETH".
    pub currency: String,
    #[serde(default)]
    pub kind: ChainKind,
    #[serde(default)]
    pub is_test: bool,
    /// Candidate RPC endpoints, in preference order.
    pub rpc: Vec<String>,
    #[serde(default)]
    pub explorer: String,
}

#[derive(Debug, Default)]
pub struct NetworkRegistry {
    networks: Vec<NetworkDescriptor>,
    by_id: HashMap<u64, usize>,
    by_name: HashMap<String, usize>,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry from a JSON file of descriptors.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let list: Vec<NetworkDescriptor> = serde_json::from_str(&data)?;
        Self::from_list(list)
    }

    /// Small built-in set used when no registry file exists on disk.
    pub fn builtin() -> Self {
        let list = vec![
            NetworkDescriptor {
                id: 1,
                name: "ethereum".into(),
                currency: "ETH".into(),
                kind: ChainKind::Eth,
                is_test: false,
                rpc: vec![
                    "https://eth.llamarpc.com".into(),
                    "https://rpc.ankr.com/eth".into(),
                ],
                explorer: "https://etherscan.io".into(),
            },
            NetworkDescriptor {
                id: 56,
                name: "bsc".into(),
                currency: "BNB".into(),
                kind: ChainKind::Eth,
                is_test: false,
                rpc: vec![
                    "https://bsc-dataseed.binance.org".into(),
                    "https://rpc.ankr.com/bsc".into(),
                ],
                explorer: "https://bscscan.com".into(),
            },
            NetworkDescriptor {
                id: 137,
                name: "polygon".into(),
                currency: "MATIC".into(),
                kind: ChainKind::Eth,
                is_test: false,
                rpc: vec!["https://polygon-rpc.com".into()],
                explorer: "https://polygonscan.com".into(),
            },
            NetworkDescriptor {
                id: 31337,
                name: "dev".into(),
                currency: "ETH".into(),
                kind: ChainKind::Eth,
                is_test: true,
                rpc: vec!["http://127.0.0.1:8545".into()],
                explorer: String::new(),
            },
        ];
        // The built-in list has no duplicates.
        Self::from_list(list).unwrap_or_default()
    }

    pub fn from_list(list: Vec<NetworkDescriptor>) -> Result<Self> {
        let mut registry = Self::new();
        for descriptor in list {
            registry.insert(descriptor)?;
        }
        Ok(registry)
    }

    /// Add a descriptor, rejecting duplicate ids or names.
    pub fn insert(&mut self, descriptor: NetworkDescriptor) -> Result<()> {
        if self.by_id.contains_key(&descriptor.id) {
            return Err(Error::Registry(format!(
                "duplicate chain id {}",
                descriptor.id
            )));
        }
        if self.by_name.contains_key(&descriptor.name) {
            return Err(Error::Registry(format!(
                "duplicate network name '{}'",
                descriptor.name
            )));
        }
        let index = self.networks.len();
        self.by_id.insert(descriptor.id, index);
        self.by_name.insert(descriptor.name.clone(), index);
        self.networks.push(descriptor);
        Ok(())
    }

    pub fn by_id(&self, id: u64) -> Result<&NetworkDescriptor> {
        self.by_id
            .get(&id)
            .map(|&i| &self.networks[i])
            .ok_or_else(|| Error::NotFound(format!("network with chain id {id}")))
    }

    pub fn by_name(&self, name: &str) -> Result<&NetworkDescriptor> {
        self.by_name
            .get(name)
            .map(|&i| &self.networks[i])
            .ok_or_else(|| Error::NotFound(format!("network '{name}'")))
    }

    pub fn all(&self) -> &[NetworkDescriptor] {
        &self.networks
    }

    /// Replace the registry contents from disk. The swap happens only after
    /// the new document parses and validates, so a bad file leaves the
    /// current registry intact.
    pub fn reload(&mut self, path: &Path) -> Result<()> {
        let fresh = Self::load(path)?;
        *self = fresh;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.networks)?;
        fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: u64, name: &str) -> NetworkDescriptor {
        NetworkDescriptor {
            id,
            name: name.into(),
            currency: "ETH".into(),
            kind: ChainKind::Eth,
            is_test: true,
            rpc: vec!["http://127.0.0.1:8545".into()],
            explorer: String::new(),
        }
    }

    #[test]
    fn lookups_by_id_and_name() {
        let registry =
            NetworkRegistry::from_list(vec![descriptor(1, "ethereum"), descriptor(56, "bsc")])
                .unwrap();
        assert_eq!(registry.by_id(56).unwrap().name, "bsc");
        assert_eq!(registry.by_name("ethereum").unwrap().id, 1);
        assert!(matches!(registry.by_id(2), Err(Error::NotFound(_))));
        assert!(matches!(registry.by_name("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut registry = NetworkRegistry::from_list(vec![descriptor(1, "ethereum")]).unwrap();
        assert!(matches!(
            registry.insert(descriptor(1, "other")),
            Err(Error::Registry(_))
        ));
        assert!(matches!(
            registry.insert(descriptor(2, "ethereum")),
            Err(Error::Registry(_))
        ));
    }

    #[test]
    fn unknown_kind_parses_as_unsupported() {
        let json = r#"[{"id":0,"name":"btc","currency":"BTC","kind":"btc","rpc":[]}]"#;
        let list: Vec<NetworkDescriptor> = serde_json::from_str(json).unwrap();
        assert_eq!(list[0].kind, ChainKind::Unsupported);
    }

    #[test]
    fn reload_keeps_state_on_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("networks.json");
        std::fs::write(&path, "not json").unwrap();

        let mut registry = NetworkRegistry::from_list(vec![descriptor(1, "ethereum")]).unwrap();
        assert!(registry.reload(&path).is_err());
        assert_eq!(registry.all().len(), 1);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("networks.json");
        let registry = NetworkRegistry::from_list(vec![descriptor(1, "ethereum")]).unwrap();
        registry.save(&path).unwrap();

        let loaded = NetworkRegistry::load(&path).unwrap();
        assert_eq!(loaded.all().len(), 1);
        assert_eq!(loaded.by_name("ethereum").unwrap().id, 1);
    }
}
