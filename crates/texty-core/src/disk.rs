//! Blocking file access used by the background I/O worker.

use std::{
    fs,
    io::{self, Read as _, Write as _},
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Hard cap on file sizes we will load into memory.
pub const MAX_FILE_BYTES: u64 = 64 * 1024 * 1024;

const TEMP_ATTEMPTS: u128 = 10;

/// Reads the whole file, refusing anything larger than [`MAX_FILE_BYTES`].
pub fn read_capped(path: &Path) -> io::Result<Vec<u8>> {
    let file = fs::File::open(path)?;
    let len = file.metadata()?.len();
    if len > MAX_FILE_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("file is larger than {} MiB", MAX_FILE_BYTES / (1024 * 1024)),
        ));
    }

    let mut bytes = Vec::with_capacity(len as usize);
    file.take(MAX_FILE_BYTES + 1).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > MAX_FILE_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "file grew past the size limit while reading",
        ));
    }
    Ok(bytes)
}

/// Writes `contents` next to `path` and renames it into place, so readers
/// never observe a half-written file. Returns the number of bytes written.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<u64> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
        .to_string_lossy();

    let seed = u128::from(std::process::id())
        ^ SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());

    for attempt in 0..TEMP_ATTEMPTS {
        let suffix = format!("{:x}", seed ^ attempt);
        let tmp_path = dir.join(format!(".texty-{file_name}-{suffix}"));
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        };

        let written = file
            .write_all(contents)
            .and_then(|()| file.sync_all())
            .and_then(|()| replace(&tmp_path, path, &backup_path(dir, &file_name, &suffix)));
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }
        return Ok(contents.len() as u64);
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "could not create a temporary file",
    ))
}

/// Where the original is parked during a fallback replace. One per attempt.
fn backup_path(dir: &Path, file_name: &str, suffix: &str) -> PathBuf {
    dir.join(format!(".texty-{file_name}-{suffix}.bak"))
}

fn replace(tmp_path: &Path, path: &Path, backup: &Path) -> io::Result<()> {
    if fs::rename(tmp_path, path).is_ok() {
        return Ok(());
    }
    if !path.exists() {
        return fs::rename(tmp_path, path);
    }

    // Some filesystems refuse to rename over an existing file: move the
    // original aside first and put it back if the second rename fails.
    fs::rename(path, backup)?;
    match fs::rename(tmp_path, path) {
        Ok(()) => {
            let _ = fs::remove_file(backup);
            Ok(())
        }
        Err(err) => {
            let _ = fs::rename(backup, path);
            Err(err)
        }
    }
}

#[cfg(test)]
pub(crate) fn make_temp_dir(name: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let dir = std::env::temp_dir().join(format!("{name}-{nanos}-{}", std::process::id()));
    let _ = fs::create_dir_all(&dir);
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_capped_returns_file_bytes() {
        let dir = make_temp_dir("texty-read-test");
        let path = dir.join("hello.txt");
        fs::write(&path, "hello").ok();

        assert_eq!(read_capped(&path).ok().as_deref(), Some(&b"hello"[..]));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_capped_missing_file_is_not_found() {
        let dir = make_temp_dir("texty-read-missing-test");
        let err = read_capped(&dir.join("absent.txt")).err().map(|e| e.kind());
        assert_eq!(err, Some(io::ErrorKind::NotFound));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn atomic_write_creates_and_overwrites() {
        let dir = make_temp_dir("texty-atomic-test");
        let path = dir.join("x.txt");

        assert_eq!(atomic_write(&path, b"first").ok(), Some(5));
        assert_eq!(fs::read_to_string(&path).unwrap_or_default(), "first");

        assert_eq!(atomic_write(&path, b"second!").ok(), Some(7));
        assert_eq!(fs::read_to_string(&path).unwrap_or_default(), "second!");

        let leftovers = fs::read_dir(&dir)
            .map(|entries| entries.filter_map(Result::ok).count())
            .unwrap_or_default();
        assert_eq!(leftovers, 1, "temporary files were left behind");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn atomic_write_accepts_empty_contents() {
        let dir = make_temp_dir("texty-atomic-empty-test");
        let path = dir.join("empty.txt");

        assert_eq!(atomic_write(&path, b"").ok(), Some(0));
        assert_eq!(fs::metadata(&path).map(|m| m.len()).ok(), Some(0));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn backup_names_differ_per_attempt() {
        let dir = Path::new("/tmp/docs");
        let first = backup_path(dir, "notes.txt", "a1");
        let second = backup_path(dir, "notes.txt", "b2");

        assert_ne!(first, second);
        assert_eq!(first.parent(), Some(dir));
        assert!(first.to_string_lossy().contains("notes.txt"));
    }

    #[test]
    fn replace_moves_temp_over_existing_file_and_leaves_no_backup() {
        let dir = make_temp_dir("texty-replace-test");
        let path = dir.join("x.txt");
        let tmp = dir.join(".texty-x.txt-1");
        let backup = backup_path(&dir, "x.txt", "1");
        fs::write(&path, "old").ok();
        fs::write(&tmp, "new").ok();

        assert!(replace(&tmp, &path, &backup).is_ok());
        assert_eq!(fs::read_to_string(&path).unwrap_or_default(), "new");
        assert!(!backup.exists());
        assert!(!tmp.exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn atomic_write_rejects_missing_file_name() {
        assert!(atomic_write(Path::new("/"), b"data").is_err());
    }
}
