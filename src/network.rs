//! Pure validation of the wallet's chain against the configured target.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Chains the interface knows by name. Anything else renders as
/// `Unknown network (<id>)` and is treated as unsupported.
static NETWORK_NAMES: Lazy<HashMap<u64, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (1, "Ethereum Main Network"),
        (3, "Ropsten Test Network"),
        (4, "Rinkeby Test Network"),
        (5, "Goerli Test Network"),
        (42, "Kovan Test Network"),
        (56, "Binance Smart Chain"),
        (137, "Polygon Mainnet"),
        (1337, "Ganache"),
    ])
});

/// Derived view of the wallet's chain relative to the target chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkState {
    /// True while the chain id is not known yet.
    pub is_loading: bool,
    /// True only when the wallet chain equals the target chain.
    pub is_connected_to_network: bool,
    pub target_network: String,
    pub network_name: String,
}

pub fn network_name(chain_id: u64) -> String {
    match NETWORK_NAMES.get(&chain_id) {
        Some(name) => (*name).to_string(),
        None => format!("Unknown network ({})", chain_id),
    }
}

/// Compares the wallet's current chain with the target chain.
///
/// Pure: same inputs always produce the same state, and an unknown chain id
/// never fails, it reports as unsupported.
pub fn validate(current: Option<u64>, target: u64) -> NetworkState {
    NetworkState {
        is_loading: current.is_none(),
        is_connected_to_network: current == Some(target),
        target_network: network_name(target),
        network_name: current.map(network_name).unwrap_or_default(),
    }
}
