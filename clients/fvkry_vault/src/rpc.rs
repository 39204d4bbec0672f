// src/rpc.rs
// JSON-RPC 2.0 transport for node and wallet endpoints

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U64};
use anchor_lang::prelude::*;
use reqwest::blocking::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use crate::chain::{
    CallRequest, ChainConfig, Connector, ProviderError, ProviderResult, PublicClient, Receipt,
    WalletProvider,
};

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

impl RpcResponse {
    fn into_result(self) -> ProviderResult<Value> {
        if let Some(err) = self.error {
            // Revert data comes back as a hex string; anything else carries no selector
            let data = err
                .data
                .as_ref()
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<Bytes>().ok());
            return Err(ProviderError::Rpc {
                code: err.code,
                message: err.message,
                data,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptBody {
    transaction_hash: B256,
    block_number: U64,
    status: U64,
}

fn decode<T: DeserializeOwned>(value: Value) -> ProviderResult<T> {
    serde_json::from_value(value).map_err(|e| ProviderError::Transport(e.to_string()))
}

/// Node or wallet endpoint reached over HTTP
pub struct JsonRpcClient {
    url: String,
    http: Client,
    poll_interval: Duration,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, http: Client, poll_interval: Duration) -> Self {
        Self {
            url: url.into(),
            http,
            poll_interval,
            next_id: AtomicU64::new(1),
        }
    }

    fn request(&self, method: &str, params: Value) -> ProviderResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response: RpcResponse = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        response.into_result()
    }

    fn chain_id(&self) -> ProviderResult<u64> {
        let id: U64 = decode(self.request("eth_chainId", json!([]))?)?;
        Ok(id.to::<u64>())
    }
}

impl PublicClient for JsonRpcClient {
    fn chain_id(&self) -> ProviderResult<u64> {
        JsonRpcClient::chain_id(self)
    }

    fn call(&self, call: &CallRequest) -> ProviderResult<Bytes> {
        decode(self.request("eth_call", json!([call, "latest"]))?)
    }

    fn wait_for_receipt(&self, hash: B256) -> ProviderResult<Receipt> {
        loop {
            let value = self.request("eth_getTransactionReceipt", json!([hash]))?;
            if !value.is_null() {
                let body: ReceiptBody = decode(value)?;
                return Ok(Receipt {
                    transaction_hash: body.transaction_hash,
                    block_number: body.block_number.to::<u64>(),
                    success: body.status == U64::from(1),
                });
            }
            thread::sleep(self.poll_interval);
        }
    }
}

impl WalletProvider for JsonRpcClient {
    fn chain_id(&self) -> ProviderResult<u64> {
        JsonRpcClient::chain_id(self)
    }

    fn request_addresses(&self) -> ProviderResult<Vec<Address>> {
        decode(self.request("eth_requestAccounts", json!([]))?)
    }

    fn send_transaction(&self, call: &CallRequest) -> ProviderResult<B256> {
        msg!("Sending transaction to {}", call.to);
        decode(self.request("eth_sendTransaction", json!([call]))?)
    }
}

/// Opens a [`JsonRpcClient`] on each chain's RPC URL
pub struct HttpConnector {
    http: Client,
    poll_interval: Duration,
}

impl HttpConnector {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            http: Client::new(),
            poll_interval,
        }
    }
}

impl Connector for HttpConnector {
    fn connect(&self, chain: &ChainConfig) -> Result<Box<dyn PublicClient>> {
        msg!("Connecting to {} ({})", chain.name, chain.id);
        Ok(Box::new(JsonRpcClient::new(
            chain.rpc_url.clone(),
            self.http.clone(),
            self.poll_interval,
        )))
    }
}
