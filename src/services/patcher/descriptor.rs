//! Binary patch descriptors: `{name?, description?, patches: [{address, bytes}]}`.

use crate::types::errors::{CommandError, CommandResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub patches: Vec<PatchEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchEntry {
    /// Hex file offset, `0x` optional.
    pub address: String,
    /// One hex string per byte.
    pub bytes: Vec<String>,
}

/// A patch entry with its address and bytes decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteOverlay {
    pub address: u64,
    pub bytes: Vec<u8>,
}

fn strip_hex_prefix(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
}

pub fn parse_address(raw: &str) -> Result<u64, String> {
    u64::from_str_radix(strip_hex_prefix(raw), 16)
        .map_err(|e| format!("invalid address '{raw}': {e}"))
}

pub fn parse_byte(raw: &str) -> Result<u8, String> {
    u8::from_str_radix(strip_hex_prefix(raw), 16).map_err(|e| format!("invalid byte '{raw}': {e}"))
}

impl PatchDescriptor {
    pub fn parse(raw: &str) -> CommandResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| CommandError::BadInput(format!("Malformed patch descriptor: {e}")))
    }

    /// Decoded entries in document order.
    pub fn overlays(&self) -> CommandResult<Vec<ByteOverlay>> {
        self.patches
            .iter()
            .map(|entry| {
                let address = parse_address(&entry.address).map_err(CommandError::BadInput)?;
                let bytes = entry
                    .bytes
                    .iter()
                    .map(|b| parse_byte(b))
                    .collect::<Result<Vec<u8>, String>>()
                    .map_err(CommandError::BadInput)?;
                Ok(ByteOverlay { address, bytes })
            })
            .collect()
    }
}

/// Overwrite each range of `image` in order; stops at the first range that
/// does not fit.
pub fn apply_overlays(image: &mut [u8], overlays: &[ByteOverlay]) -> CommandResult<()> {
    for overlay in overlays {
        let end = overlay.address.checked_add(overlay.bytes.len() as u64);
        let in_bounds = end.is_some_and(|end| end <= image.len() as u64);
        if !in_bounds {
            return Err(CommandError::BadInput(format!(
                "Out of bounds: {} byte(s) at 0x{:X} exceed executable size {}",
                overlay.bytes.len(),
                overlay.address,
                image.len()
            )));
        }
        let start = overlay.address as usize;
        image[start..start + overlay.bytes.len()].copy_from_slice(&overlay.bytes);
    }
    Ok(())
}
