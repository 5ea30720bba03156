//! # DeFi Adapters SDK
//!
//! A Rust library exposing one read interface over heterogeneous on-chain
//! lending protocols: protocol tokens, user positions, exchange rates,
//! APR/APY and total value locked.
//!
//! ## Overview
//!
//! Each protocol is wrapped by an adapter implementing [`ProtocolAdapter`].
//! Adapters split their reads in two:
//!
//! - **Metadata**: market lists and token descriptors. Expensive to collect,
//!   effectively immutable, so built once per (protocol, chain, product) and
//!   persisted by [`MetadataCache`].
//! - **Live state**: exchange rates, supply rates, balances, total supply.
//!   Read on every call, optionally pinned to a historical block.
//!
//! ## Architecture
//!
//! ### Cache Layer
//! [`cache`] deduplicates concurrent builds per key and persists results
//! through a [`storage::MetadataStore`] (files on disk, or memory in tests).
//!
//! ### Chain Access
//! [`rpc::ContractReader`] is the only path to the chain. Any ethers
//! `Middleware` implements it.
//!
//! ### Adapters
//! [`adapters`] holds the protocol implementations, built on the shared
//! [`rates`] math and [`token_enricher`] metadata helpers.

// Core Types
/// Common types and data structures
pub mod types;
/// Trait implemented by every protocol adapter
pub mod protocol_adapter;

// Protocol Adapters
/// Protocol-specific adapters
pub mod adapters;

// Metadata Caching
/// Build-once metadata cache
pub mod cache;
/// Durable blob stores behind the cache
pub mod storage;

// Chain Access
/// Contract read abstraction over ethers providers
pub mod rpc;
/// ERC-20 metadata lookups
pub mod token_enricher;
/// Smart contract ABIs (read-only)
pub mod contracts;

// Utilities
/// APR/APY and exchange-rate arithmetic
pub mod rates;
/// Metrics facade (no-op unless the `observability` feature is enabled)
pub mod metrics;

// Settings & Configuration
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use adapters::FluxPoolAdapter;
pub use cache::{CacheKey, MetadataCache};
pub use protocol_adapter::{AdapterError, ProtocolAdapter, RateQuery};
pub use settings::Settings;
