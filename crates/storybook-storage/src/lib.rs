//! Object storage for published story assets.
//!
//! This crate provides:
//! - Short-lived credential retrieval from the STS broker
//! - Uploads to Tencent COS through its S3-compatible API
//! - Object key generation and public URL construction
//! - The publisher that ties the three together

pub mod client;
pub mod credentials;
pub mod error;
pub mod key;
pub mod publisher;

pub use client::CosClient;
pub use credentials::{BrokerConfig, CredentialBroker, StsCredentials};
pub use error::{StorageError, StorageResult};
pub use key::{generate_key, object_key, public_url, region_host};
pub use publisher::{CosPublisher, PublisherConfig};
