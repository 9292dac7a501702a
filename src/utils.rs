use std::{
    env,
    path::{Path, PathBuf},
};

/// Null device handed to compilers as an empty source file.
pub const NULL_FILE: &str = if cfg!(windows) { "NUL" } else { "/dev/null" };

/// Appends the platform executable suffix to a bare program name.
pub fn program_name(name: &str) -> String {
    format!("{}{}", name, env::consts::EXE_SUFFIX)
}

pub fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Records `candidate` in `dirs` if it is an existing directory not seen yet.
pub fn add_existing_dir(dirs: &mut Vec<PathBuf>, candidate: impl AsRef<Path>) {
    let candidate = candidate.as_ref();
    if !candidate.is_dir() {
        return;
    }

    let candidate = absolutize(candidate);
    if !dirs.contains(&candidate) {
        dirs.push(candidate);
    }
}

#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Replaces the extension of `source` with `suffix`, dropping it when
/// `suffix` is empty.
pub fn change_file_ext(source: &Path, suffix: &str) -> PathBuf {
    source.with_extension(suffix.trim_start_matches('.'))
}
