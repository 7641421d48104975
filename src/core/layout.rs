//! Layout planning
//!
//! Computes source, build and package folders. Every selected target gets its
//! own build folder beneath a shared build root so the two pipelines never
//! share intermediate artifacts.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::defaults::{
    BIN_SUBDIR, BUILD_ROOT, INCLUDE_SUBDIR, LIB_SUBDIR, LICENSES_SUBDIR, PACKAGE_DIR,
};
use crate::core::target::Target;

/// Folder plan for one build invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageLayout {
    pub source_folder: PathBuf,
    pub build_root: PathBuf,
    pub build_folders: BTreeMap<Target, PathBuf>,
    pub package_folder: PathBuf,
    pub licenses_dir: PathBuf,
    pub include_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub lib_dir: PathBuf,
}

impl PackageLayout {
    /// Build folder of a planned target
    pub fn build_folder(&self, target: Target) -> Option<&Path> {
        self.build_folders.get(&target).map(PathBuf::as_path)
    }

    /// Source subtree of a target
    pub fn source_dir(&self, target: Target) -> PathBuf {
        self.source_folder.join(target.source_subdir())
    }
}

/// Plan the layout for `targets` under `workspace_root`
///
/// Pure: nothing is created on disk.
pub fn plan_layout(workspace_root: &Path, targets: &[Target]) -> PackageLayout {
    let build_root = workspace_root.join(BUILD_ROOT);
    let package_folder = workspace_root.join(PACKAGE_DIR);

    let build_folders = targets
        .iter()
        .map(|t| (*t, build_root.join(t.id())))
        .collect();

    PackageLayout {
        source_folder: workspace_root.to_path_buf(),
        build_root,
        build_folders,
        licenses_dir: package_folder.join(LICENSES_SUBDIR),
        include_dir: package_folder.join(INCLUDE_SUBDIR),
        bin_dir: package_folder.join(BIN_SUBDIR),
        lib_dir: package_folder.join(LIB_SUBDIR),
        package_folder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_build_folder_per_target() {
        let layout = plan_layout(Path::new("/ws"), &Target::ALL);
        assert_eq!(
            layout.build_folder(Target::ApplicationCore),
            Some(Path::new("/ws/build/a55"))
        );
        assert_eq!(
            layout.build_folder(Target::McuCore),
            Some(Path::new("/ws/build/m33"))
        );
    }

    #[test]
    fn test_unselected_target_has_no_build_folder() {
        let layout = plan_layout(Path::new("/ws"), &[Target::ApplicationCore]);
        assert!(layout.build_folder(Target::McuCore).is_none());
        assert_eq!(layout.build_folders.len(), 1);
    }

    #[test]
    fn test_install_subpaths_are_fixed() {
        let layout = plan_layout(Path::new("/ws"), &[]);
        assert_eq!(layout.package_folder, PathBuf::from("/ws/package"));
        assert_eq!(layout.licenses_dir, PathBuf::from("/ws/package/licenses"));
        assert_eq!(layout.include_dir, PathBuf::from("/ws/package/include"));
        assert_eq!(layout.bin_dir, PathBuf::from("/ws/package/bin"));
        assert_eq!(layout.lib_dir, PathBuf::from("/ws/package/lib"));
    }

    #[test]
    fn test_build_folders_never_collide() {
        let layout = plan_layout(Path::new("/ws"), &Target::ALL);
        let a = layout.build_folder(Target::ApplicationCore).unwrap();
        let m = layout.build_folder(Target::McuCore).unwrap();
        assert!(!a.starts_with(m) && !m.starts_with(a));
        assert!(a.starts_with(&layout.build_root) && m.starts_with(&layout.build_root));
    }

    #[test]
    fn test_source_dir_per_target() {
        let layout = plan_layout(Path::new("/ws"), &Target::ALL);
        assert_eq!(
            layout.source_dir(Target::McuCore),
            PathBuf::from("/ws/firmware/m33")
        );
    }
}
