//! Subprocess execution shared by the kubectl, gcloud, helm and expect wrappers

use crate::utils::dryrun::exec_unless_dry_run;
use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use std::io::Write;
use std::process::{Command, ExitStatus, Stdio};

/// Flags whose values never reach logs or error messages
const SECRET_FLAGS: &[&str] = &["--password=", "--docker-password="];

fn redact(arg: &str) -> &str {
    SECRET_FLAGS
        .iter()
        .find(|flag| arg.starts_with(**flag))
        .map_or(arg, |flag| &arg[..flag.len()])
}

/// Render a command the way a user would type it, secrets masked
pub fn command_line(program: &str, args: &[String]) -> String {
    let mut words = Vec::with_capacity(args.len() + 1);
    words.push(program.to_string());
    for arg in args {
        let shown = redact(arg);
        if shown.len() < arg.len() {
            words.push(format!("{}***", shown));
        } else {
            words.push(arg.clone());
        }
    }
    shell_words::join(words)
}

/// True when the process was ended by a signal, e.g. Ctrl-C
#[cfg(unix)]
fn killed_by_signal(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal().is_some()
}

#[cfg(not(unix))]
fn killed_by_signal(_status: &ExitStatus) -> bool {
    false
}

/// Run a mutating command with the terminal attached. Skipped in dry-run mode.
pub fn run(program: &str, args: &[String]) -> Result<()> {
    let line = command_line(program, args);
    crate::log_info!("Calling: {}", line.green());

    exec_unless_dry_run(&line, || {
        let status = Command::new(program)
            .args(args)
            .status()
            .with_context(|| format!("Failed to run {}", program))?;

        if !status.success() {
            return Err(anyhow!("{} command failed: {}", program, line));
        }

        Ok(())
    })
}

/// Run a read-only command with the terminal attached
pub fn show(program: &str, args: &[String]) -> Result<()> {
    let line = command_line(program, args);
    crate::log_debug!("Running: {}", line);

    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("Failed to run {}", program))?;

    if !status.success() {
        return Err(anyhow!("{} command failed: {}", program, line));
    }

    Ok(())
}

/// Run a long-lived read-only command until it is interrupted. A signal
/// ending the command is not an error; a non-zero exit is.
pub fn show_until_interrupted(program: &str, args: &[String]) -> Result<()> {
    let line = command_line(program, args);
    crate::log_debug!("Running: {}", line);

    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("Failed to run {}", program))?;

    if killed_by_signal(&status) {
        crate::log_debug!("{} stopped by a signal", program);
        return Ok(());
    }
    if !status.success() {
        return Err(anyhow!("{} command failed: {}", program, line));
    }

    Ok(())
}

/// Run a read-only command and capture stdout
pub fn output(program: &str, args: &[String]) -> Result<String> {
    let line = command_line(program, args);
    crate::log_debug!("Running: {}", line);

    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {}", program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("{} command failed: {}\n{}", program, line, stderr.trim_end()));
    }

    Ok(String::from_utf8(output.stdout)?)
}

/// Quiet probe: true when the command exits successfully
pub fn succeeds(program: &str, args: &[String]) -> bool {
    crate::log_debug!("Probing: {}", command_line(program, args));

    Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Feed `input` to a mutating command on stdin. Skipped in dry-run mode.
pub fn pipe(program: &str, args: &[String], input: &str) -> Result<()> {
    let line = command_line(program, args);
    crate::log_info!("Calling: {}", line.green());

    exec_unless_dry_run(&line, || {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .with_context(|| format!("Failed to write to {}", program))?;
        }

        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for {}", program))?;

        if !status.success() {
            return Err(anyhow!("{} command failed: {}", program, line));
        }

        Ok(())
    })
}

/// Feed `input` to a read-only command on stdin and capture stdout
pub fn pipe_output(program: &str, args: &[String], input: &str) -> Result<String> {
    let line = command_line(program, args);
    crate::log_debug!("Running: {}", line);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("Failed to spawn {}", program))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .with_context(|| format!("Failed to write to {}", program))?;
    }

    let output = child
        .wait_with_output()
        .with_context(|| format!("Failed to wait for {}", program))?;

    if !output.status.success() {
        return Err(anyhow!("{} command failed: {}", program, line));
    }

    Ok(String::from_utf8(output.stdout)?)
}

/// Convert `&str` arguments into the owned form the runners take
pub fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_quotes_arguments() {
        let args = to_args(&["exec", "-it", "web-1", "--", "bash", "-c", "rails c"]);
        assert_eq!(command_line("kubectl", &args), "kubectl exec -it web-1 -- bash -c 'rails c'");
    }

    #[test]
    fn test_command_line_masks_passwords() {
        let args = to_args(&["sql", "users", "set-password", "postgres", "--instance=db", "--password=s3cr3t"]);
        let line = command_line("gcloud", &args);
        assert!(!line.contains("s3cr3t"));
        assert!(line.contains("--password=***"));
        assert!(line.contains("--instance=db"));

        let args = to_args(&["create", "secret", "docker-registry", "gcr-secret", "--docker-password={\"key\": 1}"]);
        assert!(!command_line("kubectl", &args).contains("key"));
    }

    #[test]
    fn test_show_until_interrupted() {
        assert!(show_until_interrupted("sh", &to_args(&["-c", "exit 0"])).is_ok());
        assert!(show_until_interrupted("sh", &to_args(&["-c", "exit 1"])).is_err());
        assert!(show_until_interrupted("nonexistent-tool-xyz", &[]).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_show_until_interrupted_tolerates_signals() {
        assert!(show_until_interrupted("sh", &to_args(&["-c", "kill -TERM $$"])).is_ok());
    }

    #[test]
    fn test_output_captures_stdout() {
        let out = output("sh", &to_args(&["-c", "echo hello"])).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_output_reports_stderr() {
        let err = output("sh", &to_args(&["-c", "echo nope >&2; exit 3"])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("sh command failed"));
        assert!(message.contains("nope"));
    }

    #[test]
    fn test_succeeds() {
        assert!(succeeds("sh", &to_args(&["-c", "exit 0"])));
        assert!(!succeeds("sh", &to_args(&["-c", "exit 1"])));
        assert!(!succeeds("nonexistent-tool-xyz", &[]));
    }

    #[test]
    fn test_pipe_output() {
        let out = pipe_output("cat", &[], "piped input").unwrap();
        assert_eq!(out, "piped input");
    }
}
