//! Type definitions for the live status layer
//!
//! - [`identifiers`] - `Domain` key and `AgentId` newtype
//! - [`catalog`] - Static agent catalog
//! - [`node`] - Normalized agent node state
//! - [`gateway`] - Raw gateway record types
//! - [`snapshot`] - Snapshot and payload types
//! - [`options`] - Sync options and per-domain configuration

pub mod catalog;
pub mod gateway;
pub mod identifiers;
pub mod node;
pub mod options;
pub mod snapshot;

// Re-export commonly used types
pub use catalog::{AgentNodeConfig, Catalog, Position, default_catalog};
pub use gateway::{
    AgentTask, CronJob, GatewaySession, RawAgentRecord, RecentMemory, SessionStatus, Skill,
    SystemStatus, TaskStatus,
};
pub use identifiers::{AgentId, Domain};
pub use node::{AgentNodeState, AgentStatus};
pub use options::{DomainConfig, SyncOptions, SyncOptionsBuilder, TransportKind};
pub use snapshot::{AgentSessionsData, ConnectionType, DomainData, Snapshot, SnapshotSource};
