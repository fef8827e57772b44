//! Capability-based filesystem helpers for the planner's input and cache files.
//!
//! Paths are UTF-8 (`camino`) and every access goes through a `cap-std`
//! directory handle opened with ambient authority for the file's parent.
#![forbid(unsafe_code)]

use std::io;
use std::path::{Component, MAIN_SEPARATOR};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};

/// Read a whole UTF-8 text file such as a team roster or job list.
///
/// # Errors
///
/// Returns the underlying I/O error when the parent directory cannot be
/// opened or the file cannot be read.
pub fn read_text_file(path: &Utf8Path) -> io::Result<String> {
    let (dir, name) = parent_dir_and_name(path)?;
    dir.read_to_string(name.as_str())
}

/// Whether `path` names an existing regular file.
///
/// A missing file or parent directory yields `Ok(false)`.
///
/// # Errors
///
/// Returns other I/O errors, for example a permission failure.
pub fn is_regular_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = match parent_dir_and_name(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.metadata(name.as_str()) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Create every missing directory above `path`, e.g. for a cache database.
///
/// Bare file names and paths directly under the root need nothing created.
///
/// # Errors
///
/// Returns the I/O error raised while creating the directories.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() {
        return Ok(());
    }
    let (anchor, relative) = split_anchor(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    anchor.create_dir_all(&relative)
}

fn parent_dir_and_name(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("{path} has no file name")))?
        .to_owned();
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, name))
}

/// Split `dir` into an ambient anchor (root, drive or `.`) and the path below it.
fn split_anchor(dir: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_dir = dir.as_std_path();
    let anchor = match std_dir.components().next() {
        Some(Component::Prefix(prefix)) => {
            let prefix = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            Utf8PathBuf::from(format!("{prefix}{MAIN_SEPARATOR}"))
        }
        Some(Component::RootDir) => Utf8PathBuf::from(MAIN_SEPARATOR.to_string()),
        _ => Utf8PathBuf::from("."),
    };
    let relative = if anchor.as_str() == "." {
        dir.to_path_buf()
    } else {
        dir.strip_prefix(&anchor)
            .map_err(|_| io::Error::other(format!("cannot strip {anchor} from {dir}")))?
            .to_path_buf()
    };
    let handle = fs_utf8::Dir::open_ambient_dir(&anchor, ambient_authority())?;
    Ok((handle, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn workdir() -> TempDir {
        tempfile::tempdir().expect("create temporary directory")
    }

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8 temp path")
    }

    #[rstest]
    fn reads_text_files(workdir: TempDir) {
        let path = utf8(&workdir).join("jobs.txt");
        std::fs::write(&path, "SW1A 1AA\nEC1A 1BB\n").expect("write fixture");

        let text = read_text_file(&path).expect("read jobs");

        assert_eq!(text, "SW1A 1AA\nEC1A 1BB\n");
    }

    #[rstest]
    fn reports_missing_files(workdir: TempDir) {
        let root = utf8(&workdir);
        let missing = root.join("absent.json");

        assert!(!is_regular_file(&missing).expect("metadata"));
        assert!(!is_regular_file(&root.join("nope/absent.json")).expect("metadata"));
        assert!(read_text_file(&missing).is_err());
    }

    #[rstest]
    fn directories_are_not_regular_files(workdir: TempDir) {
        let root = utf8(&workdir);
        std::fs::create_dir(root.join("cache")).expect("create dir");

        assert!(!is_regular_file(&root.join("cache")).expect("metadata"));
    }

    #[rstest]
    fn creates_nested_parent_directories(workdir: TempDir) {
        let target = utf8(&workdir).join("state/geocode/cache.db");

        ensure_parent_dir(&target).expect("create parents");

        assert!(target.parent().expect("parent").is_dir());
        assert!(!target.exists());
    }

    #[rstest]
    #[case("cache.db")]
    #[case("/cache.db")]
    fn bare_names_need_no_directories(#[case] path: &str) {
        ensure_parent_dir(Utf8Path::new(path)).expect("nothing to create");
    }
}
