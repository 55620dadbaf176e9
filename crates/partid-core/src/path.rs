//! Path helpers for `/dev` device paths.

use std::path::{Component, Path, PathBuf};

/// Makes `path` absolute against `cwd` and folds `.`/`..` without touching
/// the filesystem (symlinks are not followed).
pub fn resolve_lexically(path: &Path, cwd: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    let mut out = PathBuf::from("/");
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    out
}

/// Kernel device name for a path directly under `/dev` (e.g. `/dev/sda` -> `sda`).
pub fn dev_name(resolved: &Path) -> Option<String> {
    if resolved.parent() != Some(Path::new("/dev")) {
        return None;
    }
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
}
