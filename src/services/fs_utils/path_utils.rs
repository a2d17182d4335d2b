use std::path::{Component, Path};

/// Validates that `target_path` resolves inside `base_path`.
/// Rejects traversal through `..` or absolute paths outside the base.
pub fn is_path_safe(base_path: &Path, target_path: &Path) -> bool {
    if target_path.is_absolute() {
        return target_path.starts_with(base_path);
    }

    let mut depth = 0;
    for component in target_path.components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            Component::Normal(_) => {
                depth += 1;
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }

    true
}

/// Forward-slash, lowercase form of a relative path for case-insensitive keys.
pub fn logical_key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_lowercase()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
