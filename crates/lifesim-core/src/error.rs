//! Error types for the simulation core.
//!
//! None of these are fatal: the tick loop never returns them. They surface
//! from explicit requests (travel, activities, config, save/load) so hosts can
//! react, and everywhere else they are logged and the call is a no-op.

use thiserror::Error;

use crate::components::{Activity, AgentId, ZoneId};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("unknown zone: {0}")]
    UnknownZone(ZoneId),

    #[error("invalid need key: {0:?}")]
    InvalidNeedKey(String),

    #[error("agent {agent} is busy ({activity:?})")]
    AgentBusy { agent: AgentId, activity: Activity },

    #[error("agent {0} is dead")]
    AgentDead(AgentId),

    #[error("activity {0:?} cannot be started directly")]
    InvalidActivity(Activity),

    #[error("agent {0} is already registered")]
    DuplicateAgent(AgentId),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Errors that can occur during save/load
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

pub type SimResult<T> = std::result::Result<T, SimError>;
