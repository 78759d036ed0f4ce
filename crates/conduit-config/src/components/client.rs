//! Client component configuration

use serde::{Deserialize, Serialize};

/// How the client mints correlation ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Random UUID v4 string per call
    #[default]
    Uuid,
    /// Increasing integers starting at 1, per client
    Sequential,
}

impl std::str::FromStr for IdStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uuid" => Ok(Self::Uuid),
            "sequential" => Ok(Self::Sequential),
            other => Err(format!("unknown id strategy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub id_strategy: IdStrategy,
}
