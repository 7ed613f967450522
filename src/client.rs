// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transport abstraction and the chain reads used by the donation read model.

use alloy::{
    primitives::{Bytes, U256},
    rpc::types::eth::{BlockId, Filter, Log},
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::common::{ChainClientError, USER_REJECTED_REQUEST};

const JSON_RPC_VERSION: &str = "2.0";

/// Translates an optional block number into a `BlockId`, defaulting to the
/// latest block.
pub fn get_block_id(block_number: Option<u64>) -> BlockId {
    match block_number {
        None => BlockId::latest(),
        Some(number) => BlockId::number(number),
    }
}

#[derive(Serialize)]
struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct JsonRpcResponse<'a> {
    jsonrpc: String,
    id: u64,
    #[serde(borrow)]
    result: Option<&'a RawValue>,
    error: Option<JsonRpcErrorObject>,
}

#[derive(Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

/// A transport able to carry JSON-RPC payloads to an Ethereum provider, such
/// as an HTTP endpoint or an injected wallet's request pipe.
#[async_trait]
pub trait JsonRpcClient: Sync {
    /// Returns a fresh request id.
    async fn get_id(&self) -> u64;

    /// Sends one JSON-RPC payload and returns the raw response body.
    async fn request_inner(&self, payload: Vec<u8>) -> Result<Vec<u8>, ChainClientError>;

    /// Issues a JSON-RPC request and decodes its result.
    ///
    /// Wallet permission denials (EIP-1193 code 4001) surface as
    /// [`ChainClientError::AuthorizationDenied`]; every other provider failure
    /// is a [`ChainClientError::ChainUnavailable`].
    async fn request<P, R>(&self, method: &str, params: P) -> Result<R, ChainClientError>
    where
        P: Serialize + Send + Sync,
        R: DeserializeOwned,
    {
        let id = self.get_id().await;
        let payload = serde_json::to_vec(&JsonRpcRequest {
            jsonrpc: JSON_RPC_VERSION,
            id,
            method,
            params,
        })?;
        let body = self.request_inner(payload).await?;
        let response: JsonRpcResponse = serde_json::from_slice(&body)?;
        if response.jsonrpc != JSON_RPC_VERSION {
            return Err(ChainClientError::WrongJsonRpcVersion);
        }
        if response.id != id {
            return Err(ChainClientError::IdIsNotMatching);
        }
        match (response.result, response.error) {
            (_, Some(error)) if error.code == USER_REJECTED_REQUEST => {
                Err(ChainClientError::AuthorizationDenied)
            }
            (_, Some(error)) => Err(ChainClientError::ChainUnavailable(format!(
                "RPC error {}: {}",
                error.code, error.message
            ))),
            (Some(result), None) => Ok(serde_json::from_str(result.get())?),
            (None, None) => Err(ChainClientError::ChainUnavailable(
                "empty JSON-RPC response".to_string(),
            )),
        }
    }
}

/// The chain reads the donation read model is built from.
#[async_trait]
pub trait EthereumQueries: Sync {
    /// Returns the accounts currently authorized by the provider.
    async fn get_accounts(&self) -> Result<Vec<String>, ChainClientError>;

    /// Asks the provider to authorize account access, suspending until the
    /// wallet grants or denies it.
    async fn request_accounts(&self) -> Result<Vec<String>, ChainClientError>;

    async fn get_block_number(&self) -> Result<u64, ChainClientError>;

    async fn get_balance(
        &self,
        address: &str,
        block_number: Option<u64>,
    ) -> Result<U256, ChainClientError>;

    /// Issues a read-only contract call.
    async fn call(
        &self,
        contract_address: &str,
        data: Bytes,
        from: &str,
    ) -> Result<Bytes, ChainClientError>;

    /// Returns the logs matching `filter`.
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ChainClientError>;

    /// Returns the first authorized account, if any.
    async fn first_account(&self) -> Result<Option<String>, ChainClientError> {
        Ok(self.get_accounts().await?.into_iter().next())
    }
}
