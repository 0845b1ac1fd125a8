use std::ffi::OsString;

use color_eyre::eyre::{self, Context};

use crate::utils::fsutils::read_optional_file;

/// The process arguments, or if there are none, the whitespace separated flags in
/// `rc_file` if it exists.
pub fn args_or_rc_file(rc_file: &str) -> eyre::Result<Vec<OsString>> {
    let args: Vec<OsString> = std::env::args_os().collect();
    with_rc_file(args, rc_file)
}

fn with_rc_file(mut args: Vec<OsString>, rc_file: &str) -> eyre::Result<Vec<OsString>> {
    if args.len() == 1 {
        if let Some(flags) = read_optional_file(rc_file)
            .wrap_err_with(|| format!("Could not read config file at: {rc_file}"))?
        {
            log::debug!("Using the flags in {rc_file}");
            args.extend(flags.split_whitespace().map(OsString::from));
        }
    }
    Ok(args)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rc_file_is_used_without_args() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".testrc");
        std::fs::write(&rc, "--temp-dir /tmp/x\n  -v video.mp4\n").unwrap();
        let rc = rc.to_str().unwrap();

        let args = with_rc_file(vec!["bin".into()], rc).unwrap();
        assert_eq!(
            vec!["bin", "--temp-dir", "/tmp/x", "-v", "video.mp4"],
            args.iter().map(|a| a.to_str().unwrap()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn rc_file_is_ignored_with_args() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".testrc");
        std::fs::write(&rc, "-v").unwrap();

        let args = with_rc_file(vec!["bin".into(), "a.mp4".into()], rc.to_str().unwrap()).unwrap();
        assert_eq!(2, args.len());
    }

    #[test]
    fn missing_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join("nope");
        let args = with_rc_file(vec!["bin".into()], rc.to_str().unwrap()).unwrap();
        assert_eq!(1, args.len());
    }
}
