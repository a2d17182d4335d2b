use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported archive format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    #[default]
    Mpq,
    Loose,
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveFormat::Mpq => write!(f, "mpq"),
            ArchiveFormat::Loose => write!(f, "loose"),
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mpq" => Ok(ArchiveFormat::Mpq),
            "loose" | "dir" => Ok(ArchiveFormat::Loose),
            _ => Err(format!("Unknown archive format: {s}")),
        }
    }
}
