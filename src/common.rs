// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy and the read-model records exposed to callers.

use std::num::ParseIntError;

use alloy::transports::{RpcError, TransportErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// EIP-1193 error code emitted by wallet providers when the user rejects a
/// permission request.
pub const USER_REJECTED_REQUEST: i64 = 4001;

#[derive(Debug, Error)]
pub enum ChainClientError {
    /// The wallet refused to authorize account access.
    #[error("wallet authorization denied")]
    AuthorizationDenied,

    /// The provider could not be reached or answered with a failure.
    #[error("chain unavailable: {0}")]
    ChainUnavailable(String),

    /// A project index outside `1..=projectCount`.
    #[error("project {index} not found (project count is {count})")]
    ProjectNotFound { index: u64, count: u64 },

    /// An expense index outside `1..=expenseCount` of its project.
    #[error("expense {index} of project {project_id} not found (expense count is {count})")]
    ExpenseNotFound {
        project_id: u64,
        index: u64,
        count: u64,
    },

    /// The operation has no on-chain accessor yet.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// A decimal ether amount that cannot be represented in wei.
    #[error("invalid ether amount {0:?}")]
    InvalidAmount(String),

    /// An expense state code the contract does not define.
    #[error("invalid expense state {0}")]
    InvalidExpenseState(u64),

    /// A chain value too large for its read-model field.
    #[error("numeric value out of range")]
    NumericOverflow,

    /// The JSON-RPC response id does not match the request id.
    #[error("the JSON-RPC response id does not match the request id")]
    IdIsNotMatching,

    /// Wrong JSON-RPC version in a response.
    #[error("wrong JSON-RPC version")]
    WrongJsonRpcVersion,

    /// ABI decoding error
    #[error(transparent)]
    AbiDecode(#[from] alloy_sol_types::Error),

    /// `serde_json` error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Parsing error
    #[error(transparent)]
    ParseInt(#[from] ParseIntError),

    /// Hex parsing error
    #[error(transparent)]
    FromHex(#[from] alloy::primitives::hex::FromHexError),

    /// URL parsing error
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<RpcError<TransportErrorKind>> for ChainClientError {
    fn from(error: RpcError<TransportErrorKind>) -> Self {
        if let RpcError::ErrorResp(payload) = &error {
            if payload.code == USER_REJECTED_REQUEST {
                return ChainClientError::AuthorizationDenied;
            }
        }
        ChainClientError::ChainUnavailable(error.to_string())
    }
}

impl From<alloy::transports::http::reqwest::Error> for ChainClientError {
    fn from(error: alloy::transports::http::reqwest::Error) -> Self {
        ChainClientError::ChainUnavailable(error.to_string())
    }
}

/// A crowdfunding project as stored on chain, reshaped for display.
///
/// `amount_left` is derived from the getter's `amountFunded - amountAllocated`;
/// the contract maintains that invariant, the adapter only exposes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// 1-based position in the on-chain project list.
    pub index: u64,
    pub founder: String,
    pub title: String,
    pub description: String,
    /// Funding deadline as a unix timestamp.
    pub end_time: u64,
    /// Total donated so far, in decimal ether.
    pub amount_funded: String,
    /// Funds not yet allocated to an approved expense, in decimal ether.
    pub amount_left: String,
    pub expense_count: u64,
}

/// Approval status of an expense.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseState {
    Pending,
    Approved,
}

impl ExpenseState {
    /// Decodes the contract's numeric state code.
    pub fn from_code(code: u64) -> Result<Self, ChainClientError> {
        match code {
            0 => Ok(ExpenseState::Pending),
            1 => Ok(ExpenseState::Approved),
            code => Err(ChainClientError::InvalidExpenseState(code)),
        }
    }

    pub fn code(self) -> u64 {
        match self {
            ExpenseState::Pending => 0,
            ExpenseState::Approved => 1,
        }
    }
}

/// An expense filed by a project founder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// 1-based position within the project's expense list.
    pub index: u64,
    pub description: String,
    /// Requested amount, in decimal ether.
    pub allocation: String,
    /// Amount approved by donors so far, in decimal ether.
    pub approved_amount: String,
    pub state: ExpenseState,
}

/// The donation book entry of one donator for one project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    pub donator: String,
    /// Total donated, in decimal ether.
    pub total: String,
    /// Part not yet spent on expense approvals, in decimal ether.
    pub available: String,
}

/// A donation notification replayed from the contract's event log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationEvent {
    pub donator: String,
    /// Donated amount, in decimal ether.
    pub amount: String,
    pub block_number: u64,
}
