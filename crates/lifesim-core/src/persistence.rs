//! Save/Load functionality for persisting agent state
//!
//! Each agent is captured as one `AgentSnapshot` holding the record every
//! subsystem owns for it. Snapshots are written with bincode inside a
//! versioned `SaveData` envelope.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::components::{AgentDecisionState, AgentId, AgentVitals, LocomotionState};
use crate::error::PersistenceError;

/// Version number for save file format (increment when format changes)
pub const SAVE_VERSION: u32 = 2;

/// Everything the three subsystems hold for one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub vitals: AgentVitals,
    pub locomotion: LocomotionState,
    pub decision: AgentDecisionState,
}

impl AgentSnapshot {
    pub fn agent_id(&self) -> &AgentId {
        &self.vitals.agent_id
    }

    /// All three records belong to the same agent
    pub fn is_consistent(&self) -> bool {
        self.vitals.agent_id == self.locomotion.agent_id
            && self.vitals.agent_id == self.decision.agent_id
    }
}

/// Serializable snapshot of the simulation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    /// Simulation time in seconds
    pub sim_time: f64,
    pub agents: Vec<AgentSnapshot>,
}

impl SaveData {
    pub fn new(sim_time: f64, agents: Vec<AgentSnapshot>) -> Self {
        Self {
            version: SAVE_VERSION,
            sim_time,
            agents,
        }
    }
}

pub fn write_save<W: Write>(writer: W, data: &SaveData) -> Result<(), PersistenceError> {
    bincode::serialize_into(writer, data)?;
    Ok(())
}

/// Read a save, rejecting other format versions
pub fn read_save<R: Read>(reader: R) -> Result<SaveData, PersistenceError> {
    let data: SaveData = bincode::deserialize_from(reader)?;

    if data.version != SAVE_VERSION {
        return Err(PersistenceError::VersionMismatch {
            expected: SAVE_VERSION,
            found: data.version,
        });
    }
    Ok(data)
}
