//! Subprocess gateway
//!
//! The only place that starts external processes. Everything else goes
//! through a [`CommandRunner`], so tests can substitute scripted output.
//!
//! Calls block until the child exits. No timeout is applied: a command that
//! never exits blocks the caller indefinitely.

use crate::error::{Error, Result};
use std::io::{self, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

/// Output of a command run in capture mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    bytes: Vec<u8>,
    text: String,
}

impl CapturedOutput {
    /// Wrap raw combined output
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        let text = String::from_utf8_lossy(&bytes).trim().to_string();
        Self { bytes, text }
    }

    /// Raw combined stdout and stderr
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Trimmed, lossily decoded output
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Copies of the streams of a command run in interactive mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractiveOutput {
    /// Everything the child wrote to stdout
    pub stdout: Vec<u8>,
    /// Everything the child wrote to stderr
    pub stderr: Vec<u8>,
}

/// Runs external commands on behalf of the backend client
pub trait CommandRunner {
    /// Run `program` to completion and capture its combined output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if the program cannot be started and
    /// [`Error::CommandFailed`] if it exits unsuccessfully.
    fn capture(&self, program: &str, args: &[&str]) -> Result<CapturedOutput>;

    /// Run `program` attached to the terminal, mirroring its output into
    /// local buffers.
    ///
    /// # Errors
    ///
    /// Same classification as [`capture`](Self::capture).
    fn interactive(&self, program: &str, args: &[&str]) -> Result<InteractiveOutput>;
}

/// [`CommandRunner`] backed by real operating system processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a new system runner
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn capture(&self, program: &str, args: &[&str]) -> Result<CapturedOutput> {
        let command_line = render_command(program, args);
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::spawn(program, e))?;

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);
        let captured = CapturedOutput::new(combined);

        if !output.status.success() {
            return Err(Error::command_failed(
                command_line,
                exit_code(output.status),
                captured.text(),
            ));
        }

        tracing::trace!(command = %command_line, output = %captured.text(), "Command output");
        Ok(captured)
    }

    fn interactive(&self, program: &str, args: &[&str]) -> Result<InteractiveOutput> {
        let command_line = render_command(program, args);
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::spawn(program, e))?;

        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();

        let (stdout, stderr) = thread::scope(|scope| {
            let out = scope.spawn(move || pump(child_stdout, io::stdout()));
            let err = scope.spawn(move || pump(child_stderr, io::stderr()));
            (join_pump(out), join_pump(err))
        });

        let status = child.wait().map_err(|e| Error::spawn(program, e))?;
        let stdout = stdout.map_err(|e| Error::spawn(program, e))?;
        let stderr = stderr.map_err(|e| Error::spawn(program, e))?;

        tracing::debug!(
            command = %command_line,
            stdout = %String::from_utf8_lossy(&stdout),
            stderr = %String::from_utf8_lossy(&stderr),
            "Interactive command finished"
        );

        if !status.success() {
            let mut combined = stdout;
            combined.extend_from_slice(&stderr);
            return Err(Error::command_failed(
                command_line,
                exit_code(status),
                &String::from_utf8_lossy(&combined),
            ));
        }

        Ok(InteractiveOutput { stdout, stderr })
    }
}

/// A writer that duplicates everything into two sinks.
///
/// Both sinks are flushed when the tee is dropped, so output reaches the
/// terminal even when the copy loop bails out early.
pub struct Tee<A: Write, B: Write> {
    primary: A,
    secondary: B,
}

impl<A: Write, B: Write> Tee<A, B> {
    /// Create a tee over two sinks
    pub const fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.primary.write_all(buf)?;
        self.secondary.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.primary.flush()?;
        self.secondary.flush()
    }
}

impl<A: Write, B: Write> Drop for Tee<A, B> {
    fn drop(&mut self) {
        let _ = self.primary.flush();
        let _ = self.secondary.flush();
    }
}

/// Copy a child stream into `terminal` and a buffer, chunk by chunk.
fn pump<R: Read, W: Write>(source: Option<R>, terminal: W) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let Some(mut source) = source else {
        return Ok(buffer);
    };

    let mut tee = Tee::new(terminal, &mut buffer);
    let mut chunk = [0_u8; 8192];
    loop {
        let read = match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        tee.write_all(&chunk[..read])?;
        tee.flush()?;
    }
    drop(tee);
    Ok(buffer)
}

fn join_pump(handle: thread::ScopedJoinHandle<'_, io::Result<Vec<u8>>>) -> io::Result<Vec<u8>> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("output copy thread panicked")))
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn render_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
