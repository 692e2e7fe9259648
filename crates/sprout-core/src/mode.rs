use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reply style hint sent with every chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Concise,
    Detailed,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Concise => "concise",
            ResponseMode::Detailed => "detailed",
        }
    }

    pub fn all() -> Vec<ResponseMode> {
        vec![ResponseMode::Concise, ResponseMode::Detailed]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ResponseMode::Concise => "Concise",
            ResponseMode::Detailed => "Detailed",
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concise" => Ok(ResponseMode::Concise),
            "detailed" => Ok(ResponseMode::Detailed),
            other => Err(format!(
                "unknown response mode '{}' (expected concise or detailed)",
                other
            )),
        }
    }
}
