use std::path::Path;
use std::process::Command;

/// Applies a unified diff to a source checkout.
pub trait DiffApplier {
    fn apply(&mut self, source_dir: &Path, patch: &Path) -> Result<(), String>;
}

/// `git apply <patch>` inside the checkout.
#[derive(Debug, Default)]
pub struct GitApply;

impl DiffApplier for GitApply {
    fn apply(&mut self, source_dir: &Path, patch: &Path) -> Result<(), String> {
        let output = Command::new("git")
            .arg("apply")
            .arg(patch)
            .current_dir(source_dir)
            .output()
            .map_err(|e| format!("Failed to run git apply: {e}"))?;
        if output.status.success() {
            return Ok(());
        }
        Err(format!(
            "git apply {} failed: {}",
            patch.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}
