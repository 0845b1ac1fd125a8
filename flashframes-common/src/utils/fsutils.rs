use std::{
    fs,
    io::{self, Read},
    path::Path,
};

/// Try to read the file, return None if it doesn't exist
pub fn read_optional_file(path: impl AsRef<Path>) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
        Ok(s) => Ok(Some(s)),
    }
}

/// Reads the whole file, or all of stdin if the path is `-`.
pub fn read_file_or_stdin(path: impl AsRef<Path>) -> io::Result<String> {
    let path = path.as_ref();
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().lock().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        fs::read_to_string(path)
    }
}

/// Checks that the path refers to a regular file that can be opened for reading.
pub fn ensure_readable_file(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    let file = fs::File::open(path)?;
    if file.metadata()?.is_file() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "the path is not a regular file",
        ))
    }
}

/// Return true if the path is a directory that is empty
pub fn is_dir_empty(path: impl AsRef<Path>) -> io::Result<bool> {
    let path = path.as_ref();
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(fs::read_dir(path)?.next().is_none()),
        Ok(_) => Ok(false),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn optional_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_optional_file(dir.path().join("nope"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn readable_file_rejects_dirs_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ensure_readable_file(dir.path().join("nope")).unwrap_err();
        assert_eq!(io::ErrorKind::NotFound, missing.kind());
        assert!(ensure_readable_file(dir.path()).is_err());

        let file = dir.path().join("video.mp4");
        fs::write(&file, b"data").unwrap();
        assert!(ensure_readable_file(&file).is_ok());
    }

    #[test]
    fn empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_dir_empty(dir.path()).unwrap());
        fs::write(dir.path().join("a"), b"").unwrap();
        assert!(!is_dir_empty(dir.path()).unwrap());
        assert!(!is_dir_empty(dir.path().join("a")).unwrap());
    }
}
