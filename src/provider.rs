// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Concrete Ethereum clients: an alloy provider over HTTP and a raw JSON-RPC
//! client for wallet-style transports, plus the account-change listener.

use std::{sync::Arc, time::Duration};

use alloy::{
    primitives::{Address, U256},
    providers::{Provider, RootProvider},
    rpc::types::eth::{
        request::{TransactionInput, TransactionRequest},
        Filter, Log,
    },
    transports::http::reqwest::{header::CONTENT_TYPE, Client},
};
use alloy_primitives::Bytes;
use async_lock::Mutex;
use async_trait::async_trait;
use serde_json::json;
use tokio::task::JoinHandle;
use url::Url;

use crate::{
    client::{get_block_id, EthereumQueries, JsonRpcClient},
    common::ChainClientError,
};

pub type HttpProvider = RootProvider;

/// An Ethereum endpoint reached through raw JSON-RPC payloads, for transports
/// that only expose a request pipe (injected wallets, oracles).
pub struct EthereumClientSimplified {
    pub url: String,
    pub id: Mutex<u64>,
}

impl EthereumClientSimplified {
    /// Creates a client for an existing Ethereum endpoint.
    pub fn new(url: String) -> Self {
        let id = Mutex::new(1);
        Self { url, id }
    }
}

#[async_trait]
impl JsonRpcClient for EthereumClientSimplified {
    async fn get_id(&self) -> u64 {
        let mut id = self.id.lock().await;
        *id += 1;
        *id
    }

    async fn request_inner(&self, payload: Vec<u8>) -> Result<Vec<u8>, ChainClientError> {
        let response = Client::new()
            .post(self.url.clone())
            .body(payload)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let body = response.bytes().await?;
        Ok(body.as_ref().to_vec())
    }
}

#[async_trait]
impl EthereumQueries for EthereumClientSimplified {
    async fn get_accounts(&self) -> Result<Vec<String>, ChainClientError> {
        self.request("eth_accounts", json!([])).await
    }

    async fn request_accounts(&self) -> Result<Vec<String>, ChainClientError> {
        self.request("eth_requestAccounts", json!([])).await
    }

    async fn get_block_number(&self) -> Result<u64, ChainClientError> {
        let number: U256 = self.request("eth_blockNumber", json!([])).await?;
        u64::try_from(number).map_err(|_| ChainClientError::NumericOverflow)
    }

    async fn get_balance(
        &self,
        address: &str,
        block_number: Option<u64>,
    ) -> Result<U256, ChainClientError> {
        address.parse::<Address>()?;
        let block = match block_number {
            None => "latest".to_string(),
            Some(number) => format!("0x{number:x}"),
        };
        self.request("eth_getBalance", json!([address, block])).await
    }

    async fn call(
        &self,
        contract_address: &str,
        data: Bytes,
        from: &str,
    ) -> Result<Bytes, ChainClientError> {
        contract_address.parse::<Address>()?;
        from.parse::<Address>()?;
        self.request(
            "eth_call",
            json!([{"from": from, "to": contract_address, "data": data}, "latest"]),
        )
        .await
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ChainClientError> {
        self.request("eth_getLogs", json!([filter])).await
    }
}

/// An Ethereum endpoint backed by an alloy provider.
pub struct EthereumClient<M> {
    pub provider: M,
}

impl EthereumClient<HttpProvider> {
    /// Connects to an existing Ethereum node over HTTP.
    pub fn new(url: &str) -> Result<Self, ChainClientError> {
        let rpc_url = Url::parse(url)?;
        let provider = RootProvider::new_http(rpc_url);
        Ok(Self { provider })
    }
}

#[async_trait]
impl EthereumQueries for EthereumClient<HttpProvider> {
    async fn get_accounts(&self) -> Result<Vec<String>, ChainClientError> {
        Ok(self
            .provider
            .get_accounts()
            .await
            .map_err(ChainClientError::from)?
            .into_iter()
            .map(|address| format!("{address:?}"))
            .collect())
    }

    async fn request_accounts(&self) -> Result<Vec<String>, ChainClientError> {
        let accounts: Vec<Address> = self
            .provider
            .raw_request("eth_requestAccounts".into(), json!([]))
            .await
            .map_err(ChainClientError::from)?;
        Ok(accounts
            .into_iter()
            .map(|address| format!("{address:?}"))
            .collect())
    }

    async fn get_block_number(&self) -> Result<u64, ChainClientError> {
        Ok(self
            .provider
            .get_block_number()
            .await
            .map_err(ChainClientError::from)?)
    }

    async fn get_balance(
        &self,
        address: &str,
        block_number: Option<u64>,
    ) -> Result<U256, ChainClientError> {
        let address = address.parse::<Address>()?;
        Ok(self
            .provider
            .get_balance(address)
            .block_id(get_block_id(block_number))
            .await
            .map_err(ChainClientError::from)?)
    }

    async fn call(
        &self,
        contract_address: &str,
        data: Bytes,
        from: &str,
    ) -> Result<Bytes, ChainClientError> {
        let contract_address = contract_address.parse::<Address>()?;
        let from = from.parse::<Address>()?;
        let input = TransactionInput::new(data);
        let tx = TransactionRequest::default()
            .from(from)
            .to(contract_address)
            .input(input);
        Ok(self.provider.call(tx).await.map_err(ChainClientError::from)?)
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ChainClientError> {
        Ok(self
            .provider
            .get_logs(filter)
            .await
            .map_err(ChainClientError::from)?)
    }
}

/// Spawns a task polling the provider's authorized account set, invoking
/// `callback` on every observed change. The first poll only records the
/// baseline. The task runs until its handle is aborted; poll failures are
/// logged and do not stop it.
pub fn spawn_account_listener<Q, F>(
    client: Arc<Q>,
    period: Duration,
    mut callback: F,
) -> JoinHandle<()>
where
    Q: EthereumQueries + Send + Sync + 'static,
    F: FnMut(Vec<String>) + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        let mut known: Option<Vec<String>> = None;
        loop {
            interval.tick().await;
            match client.get_accounts().await {
                Ok(accounts) => {
                    if known.as_ref() != Some(&accounts) {
                        let is_change = known.is_some();
                        known = Some(accounts.clone());
                        if is_change {
                            callback(accounts);
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "failed to poll the provider for accounts");
                }
            }
        }
    })
}
