//! Typed invocation of external tools.
//!
//! The container demux/mux engine (`ffmpeg`/`ffprobe`) and the inference runner
//! are consumed as subprocess capabilities: every call returns a typed result
//! with captured stderr so failures surface real diagnostics instead of bare
//! exit codes.

use std::io::{self, Read, Write};
use std::process::{Command, Stdio};

use tracing::debug;

/// Captured result of one external tool invocation
pub struct CommandOutput {
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Stderr trimmed to its last lines, which is where ffmpeg puts the
    /// actual failure reason
    pub fn stderr_tail(&self) -> String {
        let lines: Vec<&str> = self.stderr.lines().collect();
        let start = lines.len().saturating_sub(6);
        lines[start..].join("\n")
    }
}

/// Check that an external tool responds to `-version`
pub fn check_available(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Run a tool to completion, capturing stdout and stderr
pub fn run(tool: &str, args: &[&str]) -> io::Result<CommandOutput> {
    debug!("running: {} {}", tool, args.join(" "));

    let output = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;

    Ok(CommandOutput {
        status: output.status.code().unwrap_or(-1),
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Run a tool feeding its stdin from the given writer callback.
///
/// Stderr is drained on a separate thread while stdin is being fed; otherwise a
/// chatty encoder can fill the stderr pipe and deadlock against our writes. A
/// broken-pipe during feeding is not itself an error: the tool's exit status
/// and stderr carry the real diagnosis.
pub fn run_with_stdin<F>(tool: &str, args: &[&str], feed: F) -> io::Result<CommandOutput>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    debug!("running (piped stdin): {} {}", tool, args.join(" "));

    let mut child = Command::new(tool)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child stdin unavailable"))?;

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child stderr unavailable"))?;

    let drain = std::thread::spawn(move || {
        let mut stderr = stderr;
        let mut buffer = Vec::new();
        let _ = stderr.read_to_end(&mut buffer);
        buffer
    });

    let feed_result = feed(&mut stdin);
    drop(stdin);

    let status = child.wait()?;
    let stderr_bytes = drain.join().unwrap_or_default();

    if let Err(error) = feed_result {
        if error.kind() != io::ErrorKind::BrokenPipe {
            return Err(error);
        }
    }

    Ok(CommandOutput {
        status: status.code().unwrap_or(-1),
        stdout: Vec::new(),
        stderr: String::from_utf8_lossy(&stderr_bytes).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let output = CommandOutput {
            status: 1,
            stdout: Vec::new(),
            stderr: (1..=10)
                .map(|i| format!("line {}", i))
                .collect::<Vec<_>>()
                .join("\n"),
        };
        let tail = output.stderr_tail();
        assert!(tail.starts_with("line 5"));
        assert!(tail.ends_with("line 10"));
    }

    #[test]
    fn missing_tool_is_not_available() {
        assert!(!check_available("definitely-not-a-real-tool-4af1"));
    }
}
