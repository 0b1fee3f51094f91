use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(TrafficId);
id_newtype!(ProposalId);

/// Consensus classification attached to a traffic event's advanced metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusStatus {
    Success,
    Disagreement,
    Recovery,
    #[serde(other)]
    Other,
}

/// Which wire representation the traffic log shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireMode {
    Json,
    #[default]
    Quantized,
}

impl WireMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Quantized => "quantized",
        }
    }
}

impl FromStr for WireMode {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "quantized" | "slipstream" => Ok(Self::Quantized),
            other => Err(ConfigError::UnknownWireMode(other.to_string())),
        }
    }
}
