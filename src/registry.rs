//! Host path registry.
//!
//! The host owns the model and output directory layout. Nodes only ever ask
//! it to list checkpoint names, resolve a name to a path, or hand out the
//! shared directories.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Registry folder holding model weights.
pub const CHECKPOINTS: &str = "checkpoints";

/// File extensions the host lists as checkpoints.
pub const CHECKPOINT_EXTENSIONS: &[&str] =
    &["ckpt", "pt", "pt2", "bin", "pth", "safetensors", "pkl", "sft"];

/// Lookup interface the nodes use to find files on disk.
pub trait PathRegistry: Send + Sync {
    /// Installed file names in `folder`, relative to it, `/`-separated.
    fn filename_list(&self, folder: &str) -> Result<Vec<String>>;

    /// Absolute path of `name` inside `folder`, if it exists.
    fn full_path(&self, folder: &str, name: &str) -> Option<PathBuf>;

    /// Root of the output tree written by terminal nodes.
    fn output_directory(&self) -> PathBuf;

    /// Shared models root.
    fn models_dir(&self) -> PathBuf;
}

/// Directory layout rooted at a single base directory:
/// `<base>/models/<folder>/...` and `<base>/output/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPaths {
    pub models_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl HostPaths {
    pub fn from_base_dir(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            models_dir: base.join("models"),
            output_dir: base.join("output"),
        }
    }

    fn folder_dir(&self, folder: &str) -> PathBuf {
        self.models_dir.join(folder)
    }
}

impl PathRegistry for HostPaths {
    fn filename_list(&self, folder: &str) -> Result<Vec<String>> {
        let root = self.folder_dir(folder);
        let mut names = Vec::new();
        if root.is_dir() {
            collect_files(&root, &root, &mut names)?;
        }
        names.sort();
        Ok(names)
    }

    fn full_path(&self, folder: &str, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            tracing::warn!(folder, name, "refusing checkpoint name outside its folder");
            return None;
        }
        let path = self.folder_dir(folder).join(relative);
        path.is_file().then_some(path)
    }

    fn output_directory(&self) -> PathBuf {
        self.output_dir.clone()
    }

    fn models_dir(&self) -> PathBuf {
        self.models_dir.clone()
    }
}

/// Symlinked files are listed; symlinked directories are not entered, so a
/// link cycle cannot recurse forever.
fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            collect_files(root, &path, out)?;
            continue;
        }
        if file_type.is_symlink() && path.is_dir() {
            tracing::debug!(path = %path.display(), "not following symlinked directory");
            continue;
        }
        let listed = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| CHECKPOINT_EXTENSIONS.contains(&ext));
        if !listed {
            continue;
        }
        if let Ok(relative) = path.strip_prefix(root) {
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push(name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn lists_checkpoints_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let paths = HostPaths::from_base_dir(dir.path());
        touch(&paths.models_dir.join("checkpoints/mula.safetensors"));
        touch(&paths.models_dir.join("checkpoints/HeartCodec-oss/model.safetensors"));
        touch(&paths.models_dir.join("checkpoints/notes.txt"));

        let names = paths.filename_list(CHECKPOINTS).unwrap();
        assert_eq!(
            names,
            vec!["HeartCodec-oss/model.safetensors", "mula.safetensors"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_entered() {
        let dir = tempfile::tempdir().unwrap();
        let paths = HostPaths::from_base_dir(dir.path());
        let checkpoints = paths.models_dir.join(CHECKPOINTS);
        touch(&checkpoints.join("nested/mula.safetensors"));
        touch(&dir.path().join("elsewhere/codec.safetensors"));
        std::os::unix::fs::symlink(&checkpoints, checkpoints.join("nested/loop")).unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("elsewhere/codec.safetensors"),
            checkpoints.join("codec.safetensors"),
        )
        .unwrap();

        let names = paths.filename_list(CHECKPOINTS).unwrap();
        assert_eq!(names, vec!["codec.safetensors", "nested/mula.safetensors"]);
    }

    #[test]
    fn missing_folder_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = HostPaths::from_base_dir(dir.path());
        assert!(paths.filename_list(CHECKPOINTS).unwrap().is_empty());
    }

    #[test]
    fn resolves_existing_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let paths = HostPaths::from_base_dir(dir.path());
        touch(&paths.models_dir.join("checkpoints/mula.safetensors"));

        let found = paths.full_path(CHECKPOINTS, "mula.safetensors").unwrap();
        assert!(found.ends_with("models/checkpoints/mula.safetensors"));
        assert!(paths.full_path(CHECKPOINTS, "absent.safetensors").is_none());
        assert!(paths.full_path(CHECKPOINTS, "../checkpoints/mula.safetensors").is_none());
    }
}
