//! Helpers for running foreign executables.
//!
//! Used by the image daemon facade to delegate commands to the docker
//! client binary and to gate-check that the binary is present and
//! responsive before a daemon connection is attempted.

use std::io;
use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::debug;

/// Run a program to completion, sharing the caller's terminal streams.
///
/// Returns the process exit code (-1 if terminated by a signal).
pub async fn run(program: &Path, args: &[String], cwd: Option<&Path>) -> io::Result<i32> {
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    debug!(program = %program.display(), ?args, "running foreground command");
    let status = command.status().await?;
    Ok(status.code().unwrap_or(-1))
}

/// Spawn a program in the background and return immediately.
///
/// The child's standard streams are detached so it cannot write to the
/// caller's terminal.
pub fn run_background(program: &Path, args: &[String], cwd: Option<&Path>) -> io::Result<Child> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    debug!(program = %program.display(), ?args, "spawning background command");
    command.spawn()
}

/// Run a program to completion and collect its stdout.
///
/// Returns the exit code together with stdout decoded as UTF-8 (lossy).
pub async fn run_collect_output(
    program: &Path,
    args: &[String],
    cwd: Option<&Path>,
) -> io::Result<(i32, String)> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = command.output().await?;
    Ok((
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).into_owned(),
    ))
}

/// Check that the docker client binary is present and responsive.
///
/// Runs `<program> version` with collected output. Failure to spawn or a
/// nonzero exit code is reported as an error.
pub async fn verify_executable(program: &Path) -> io::Result<()> {
    let (code, _output) = run_collect_output(program, &["version".to_string()], None)
        .await
        .map_err(|err| io::Error::other(format!("cannot run {}: {err}", program.display())))?;

    if code != 0 {
        return Err(io::Error::other(format!(
            "{} version exited with code {code}",
            program.display()
        )));
    }
    Ok(())
}
