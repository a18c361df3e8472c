//! Entity type tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type tag of a secured entity; part of its object identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// A folder holding sub-folders and resources.
    Folder,
    /// A pipeline definition.
    Pipeline,
    /// A saved run configuration.
    Configuration,
    /// A data storage (bucket or NFS share).
    DataStorage,
    /// A docker registry holding tool groups.
    DockerRegistry,
    /// A group of tools.
    ToolGroup,
    /// A single tool image.
    Tool,
    /// A compute run.
    PipelineRun,
    /// A compute node backing runs.
    ComputeNode,
    /// A metadata entity.
    MetadataEntity,
}

impl EntityType {
    /// Whether read-only overrides (mount state, quotas) apply.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::DataStorage)
    }

    /// Whether entities of this type have children and leaves.
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, Self::Folder | Self::DockerRegistry | Self::ToolGroup)
    }

    /// Return the type tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Folder => "FOLDER",
            Self::Pipeline => "PIPELINE",
            Self::Configuration => "CONFIGURATION",
            Self::DataStorage => "DATA_STORAGE",
            Self::DockerRegistry => "DOCKER_REGISTRY",
            Self::ToolGroup => "TOOL_GROUP",
            Self::Tool => "TOOL",
            Self::PipelineRun => "PIPELINE_RUN",
            Self::ComputeNode => "COMPUTE_NODE",
            Self::MetadataEntity => "METADATA_ENTITY",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = pipehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FOLDER" => Ok(Self::Folder),
            "PIPELINE" => Ok(Self::Pipeline),
            "CONFIGURATION" => Ok(Self::Configuration),
            "DATA_STORAGE" | "STORAGE" => Ok(Self::DataStorage),
            "DOCKER_REGISTRY" | "REGISTRY" => Ok(Self::DockerRegistry),
            "TOOL_GROUP" => Ok(Self::ToolGroup),
            "TOOL" => Ok(Self::Tool),
            "PIPELINE_RUN" | "RUN" => Ok(Self::PipelineRun),
            "COMPUTE_NODE" | "NODE" => Ok(Self::ComputeNode),
            "METADATA_ENTITY" => Ok(Self::MetadataEntity),
            _ => Err(pipehub_core::AppError::validation(format!(
                "Invalid entity type: '{s}'"
            ))),
        }
    }
}
