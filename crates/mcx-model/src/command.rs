use std::fmt;

use crate::domain::{CheckableUnit, Generation};

/// Instruction sent by the driver to the coordinator.
#[derive(Debug, Clone)]
pub enum Command {
    /// Start `min(num_parallel, units.len())` jobs, in order.
    StartK {
        units: Vec<CheckableUnit>,
        generation: Generation,
    },
    /// Start exactly one job.
    StartOne {
        unit: CheckableUnit,
        generation: Generation,
    },
    /// Cancel everything in flight and move to `generation`.
    StopAll { generation: Generation },
}

/// Payload-free discriminant of a [`Command`], used for peeking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    StartK,
    StartOne,
    StopAll,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::StartK { .. } => CommandKind::StartK,
            Command::StartOne { .. } => CommandKind::StartOne,
            Command::StopAll { .. } => CommandKind::StopAll,
        }
    }

    pub fn generation(&self) -> Generation {
        match self {
            Command::StartK { generation, .. }
            | Command::StartOne { generation, .. }
            | Command::StopAll { generation } => *generation,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandKind::StartK => "start_k",
            CommandKind::StartOne => "start_one",
            CommandKind::StopAll => "stop_all",
        };
        f.write_str(s)
    }
}
