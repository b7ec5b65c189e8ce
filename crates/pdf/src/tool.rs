use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Output};

use tracing::debug;

use crate::error::DocumentError;

/// Run an external program to completion, turning a missing binary or a
/// non-zero exit into a [`DocumentError`].
pub(crate) fn run(program: &Path, args: &[OsString]) -> Result<Output, DocumentError> {
    debug!(program = %program.display(), ?args, "invoking external tool");
    let output = Command::new(program).args(args).output().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DocumentError::NotAvailable(program.display().to_string()),
        _ => DocumentError::Io(e),
    })?;

    if !output.status.success() {
        return Err(DocumentError::ToolFailed {
            tool: program.display().to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_not_available() {
        let err = run(Path::new("/nonexistent/ocrmypdf-xyz"), &[]).unwrap_err();
        assert!(matches!(err, DocumentError::NotAvailable(p) if p.contains("ocrmypdf-xyz")));
    }

    #[cfg(unix)]
    #[test]
    fn failing_program_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake::script(dir.path(), "tool", "echo 'PriorOcrFoundError' >&2\nexit 6");
        match run(&tool, &[]).unwrap_err() {
            DocumentError::ToolFailed { stderr, .. } => assert_eq!(stderr, "PriorOcrFoundError"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
