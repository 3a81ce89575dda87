use std::path::{Component, Path, PathBuf};

use camino::Utf8PathBuf;

/// Resolves the first element of an executable template to an absolute path.
///
/// Absolute names must sit inside one of `allowed`; relative names are looked
/// up in each allowed directory in order. Names containing `..` never resolve.
pub(crate) fn resolve_executable(binary: &str, allowed: &[Utf8PathBuf]) -> Option<PathBuf> {
    let candidate = Path::new(binary);
    if binary.is_empty()
        || candidate
            .components()
            .any(|component| matches!(component, Component::ParentDir))
    {
        return None;
    }

    if candidate.is_absolute() {
        let inside = allowed
            .iter()
            .any(|dir| candidate.starts_with(dir.as_std_path()));
        return (inside && is_executable_file(candidate)).then(|| candidate.to_path_buf());
    }

    allowed
        .iter()
        .map(|dir| dir.as_std_path().join(candidate))
        .find(|path| is_executable_file(path))
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .is_ok_and(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}
