// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Connection settings for one EthDonation deployment.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::ChainClientError;

/// Describes where one EthDonation deployment lives.
///
/// Deployments differ by endpoint and contract address, so both are
/// configuration, never constants compiled into the client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DonationClientConfig {
    /// URL of the Ethereum JSON-RPC endpoint.
    pub url: String,
    /// Address of the deployed EthDonation contract.
    pub contract_address: String,
    /// Account used as the caller of read-only contract calls. Defaults to
    /// the zero address, which every node accepts for `eth_call`.
    #[serde(default)]
    pub caller: Option<String>,
}

impl DonationClientConfig {
    /// Reads a configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ChainClientError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
