// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! This crate provides functionalities for reading an EthDonation crowdfunding
//! contract deployed on an Ethereum chain: binding a JSON-RPC endpoint,
//! translating on-chain storage into typed project, expense and donation
//! records, and replaying donation notifications from the event log.
//!
//! All monetary amounts cross the RPC boundary as base-unit (wei) integers and
//! are converted to decimal ether at the read-model boundary, never earlier.

pub mod client;
pub mod common;
pub mod config;
pub mod contract;
pub mod provider;
pub mod units;
