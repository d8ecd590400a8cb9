//! # NFT Market SDK
//!
//! A headless Rust service layer for an NFT marketplace running against an EVM chain. This SDK
//! provides the infrastructure between a user interface and the marketplace contract: wallet
//! session tracking, contract artifact resolution, cached reads, and transaction submission.
//!
//! ## Overview
//!
//! The NFT Market SDK separates Web3 plumbing from presentation logic. It focuses on:
//!
//! - **Connection**: Wallet-driven dependency snapshots with a strict connection state machine
//! - **Resolution**: Deployment artifact loading keyed by the wallet's active chain
//! - **Reads**: Keyed query caching with request deduplication and stale-while-revalidate
//! - **Mutations**: Fire-and-forget transaction submission with lifecycle notifications
//!
//! ## Architecture
//!
//! The SDK is organized into several layers:
//!
//! ### Connection Layer
//! Bridges a browser-style wallet provider into typed account and chain state, resolves the
//! marketplace contract for the active chain, and publishes immutable dependency snapshots.
//!
//! ### Read Layer
//! Serves contract reads through a shared query cache. Concurrent readers of the same key share
//! one in-flight fetch, and stale values are served while a refresh runs in the background.
//!
//! ### Mutation Layer
//! Submits marketplace transactions without blocking the caller and reports pending, success,
//! and failure transitions through a pluggable notifier.

// Core Types
/// Common types and unit conversions
pub mod types;
/// Error taxonomy for the SDK
pub mod errors;

// Connection Layer
/// Wallet provider abstraction and session events
pub mod wallet;
/// Chain access (provider, wallet, contract binding)
pub mod gateway;
/// Deployment artifact loading
pub mod artifacts;
/// Dependency container and connection state machine
pub mod dependencies;
/// Network validation against the target chain
pub mod network;

// Read Layer
/// Keyed query cache with deduplication and stale-while-revalidate
pub mod query_cache;
/// Token metadata fetching
pub mod metadata;
/// Typed read and mutation hooks over a dependency snapshot
pub mod hooks;

// Mutation Layer
/// Transaction submission and confirmation tracking
pub mod transactions;

// Infrastructure
/// Metrics and observability
pub mod metrics;

// Contracts (Public ABIs Only)
/// Smart contract ABIs
pub mod contracts;

// Settings & Configuration
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use dependencies::DependencyContainer;
pub use errors::Web3Error;
pub use gateway::ChainGateway;
pub use hooks::HookBundle;
pub use query_cache::QueryCache;
pub use settings::Settings;
