use std::process::ExitStatus;

use mcx_core::VerifyError;
use mcx_model::Verdict;

/// Read the verdict from checker output.
///
/// The unsafe marker wins over the safe one. Without a marker a clean exit means
/// `Unknown` and anything else is a failure carrying `stderr_tail`.
pub(super) fn classify(
    stdout: &str,
    status: ExitStatus,
    stderr_tail: &str,
    safe_marker: &str,
    unsafe_marker: &str,
) -> Result<Verdict, VerifyError> {
    if stdout.contains(unsafe_marker) {
        return Ok(Verdict::Unsafe);
    }
    if stdout.contains(safe_marker) {
        return Ok(Verdict::Safe);
    }
    if status.success() {
        return Ok(Verdict::Unknown);
    }

    let exit = match status.code() {
        Some(code) => format!("checker exited with code {code}"),
        None => "checker terminated by signal".to_string(),
    };
    if stderr_tail.is_empty() {
        Err(VerifyError::Failed(exit))
    } else {
        Err(VerifyError::Failed(format!("{exit}: {stderr_tail}")))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::process::ExitStatusExt;

    use super::*;

    const SAFE: &str = "Program is safe";
    const UNSAFE: &str = "Program is unsafe";

    fn exit(code: i32) -> ExitStatus {
        ExitStatus::from_raw(code << 8)
    }

    #[test]
    fn unsafe_marker_wins() {
        let v = classify("Program is unsafe\n", exit(0), "", SAFE, UNSAFE).unwrap();
        assert_eq!(v, Verdict::Unsafe);
    }

    #[test]
    fn safe_marker_even_on_non_zero_exit() {
        let v = classify("... Program is safe\n", exit(3), "", SAFE, UNSAFE).unwrap();
        assert_eq!(v, Verdict::Safe);
    }

    #[test]
    fn clean_exit_without_marker_is_unknown() {
        let v = classify("done\n", exit(0), "", SAFE, UNSAFE).unwrap();
        assert_eq!(v, Verdict::Unknown);
    }

    #[test]
    fn failed_exit_without_marker_carries_stderr() {
        let err = classify("", exit(2), "parse error at 3:1", SAFE, UNSAFE).unwrap_err();
        match err {
            VerifyError::Failed(msg) => {
                assert!(msg.contains("code 2"));
                assert!(msg.contains("parse error at 3:1"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
