//! # Asset Module — Identifiers, Registry & Transfer Capability
//!
//! Everything the bank knows about the assets it custodies lives here:
//!
//! ```text
//! id.rs        — AssetId: native sentinel or 20-byte token address
//! registry.rs  — accepted-asset registry with cached native precisions
//! transfer.rs  — the pull/push capability the pipelines move value with
//! ```
//!
//! The registry owns the asset records exclusively; no other component
//! caches supported flags or precisions beyond single-operation scope.

pub mod id;
pub mod registry;
pub mod transfer;

pub use id::{AssetId, AssetIdParseError};
pub use registry::{AssetMetadata, AssetRecord, AssetRegistry, MetadataError, RegistryError};
pub use transfer::{AssetTransfer, TransferError};
