//! Subprocess execution seam
//!
//! The external patch tool and the update helper are opaque collaborators. The rest
//! of the crate only reaches them through [`CommandRunner`], which keeps platform
//! process APIs in this one module and lets tests substitute a recording fake.
//!
//! [`SystemCommandRunner`] is the real implementation:
//! - stdout and stderr are piped and read line by line concurrently; every line is
//!   appended to a single combined buffer in arrival order
//! - each line is logged under `target: "process"` and handed to an optional observer
//! - the child is killed (not just abandoned) when the cancellation token fires or
//!   the optional timeout elapses
//!
//! ```rust,no_run
//! use hyprism::process::{CommandRunner, ProcessCommand, SystemCommandRunner};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let runner = SystemCommandRunner::new();
//! let command = ProcessCommand::new("butler").arg("--version");
//! let output = runner.run(&command, None, &CancellationToken::new()).await?;
//! println!("{}", output.combined_output);
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::LauncherError;

/// Callback receiving each output line of a running process.
pub type LineObserver<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// Result of a finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Whether the process exited successfully.
    pub success: bool,
    /// Interleaved stdout and stderr, one line per output line.
    pub combined_output: String,
}

impl ProcessOutput {
    /// Human readable exit description, e.g. `exit code 1`.
    #[must_use]
    pub fn exit_details(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Description of one process invocation.
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Option<Duration>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Kills the process if it runs longer than `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Command line rendered for logs.
    #[must_use]
    pub fn display(&self) -> String {
        let mut rendered = self.program.display().to_string();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(&arg.to_string_lossy());
        }
        rendered
    }
}

/// Runs external programs.
///
/// Implementations must terminate the child when `cancel` fires and then fail with
/// [`LauncherError::Cancelled`].
pub trait CommandRunner: Send + Sync {
    /// Runs `command` to completion, capturing its combined output.
    fn run(
        &self,
        command: &ProcessCommand,
        on_line: Option<&LineObserver<'_>>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<ProcessOutput>> + Send;

    /// Starts `command` detached with inherited stdout/stderr and returns its pid
    /// without waiting for it.
    fn spawn_detached(&self, command: &ProcessCommand) -> std::io::Result<u32>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        command: &ProcessCommand,
        on_line: Option<&LineObserver<'_>>,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput> {
        if cancel.is_cancelled() {
            return Err(LauncherError::cancelled(format!("running {}", command.program.display())).into());
        }

        tracing::debug!(target: "process", "Executing command: {}", command.display());
        let start = std::time::Instant::now();

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&command.program, &e))?;

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, tx.clone());
        }
        drop(tx);

        let deadline = async {
            match command.timeout {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);

        let mut combined = String::new();
        let mut streams_open = true;

        let status = loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::info!(target: "process", "Cancelling {}", command.program.display());
                    terminate(&mut child).await;
                    return Err(LauncherError::cancelled(format!("running {}", command.program.display())).into());
                }

                () = &mut deadline => {
                    let seconds = command.timeout.map_or(0, |d| d.as_secs());
                    tracing::warn!(
                        target: "process",
                        "Command timed out after {} seconds: {}",
                        seconds,
                        command.display()
                    );
                    terminate(&mut child).await;
                    return Err(LauncherError::PatchToolError {
                        exit_details: format!("timed out after {seconds} seconds"),
                        output: combined,
                    }
                    .into());
                }

                line = rx.recv(), if streams_open => match line {
                    Some(line) => {
                        tracing::debug!(target: "process", "{}", line);
                        if let Some(observer) = on_line {
                            observer(&line);
                        }
                        combined.push_str(&line);
                        combined.push('\n');
                    }
                    None => streams_open = false,
                },

                status = child.wait(), if !streams_open => {
                    break status.map_err(|e| LauncherError::file_system("waiting for process", &command.program, &e))?;
                }
            }
        };

        tracing::debug!(
            target: "process",
            "Command finished in {:.2}s with {}",
            start.elapsed().as_secs_f64(),
            status
        );

        Ok(ProcessOutput {
            exit_code: status.code(),
            success: status.success(),
            combined_output: combined,
        })
    }

    fn spawn_detached(&self, command: &ProcessCommand) -> std::io::Result<u32> {
        let mut cmd = std::process::Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group so the helper survives our exit and terminal signals.
            cmd.process_group(0);
        }
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }

        tracing::debug!(target: "process", "Launching detached: {}", command.display());
        let child = cmd.spawn()?;
        Ok(child.id())
    }
}

fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    // Tool output is not guaranteed to be UTF-8; keep every line.
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']).to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(target: "process", "Failed to read process output: {e}");
                    break;
                }
            }
        }
    });
}

async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!(target: "process", "Failed to kill child process: {e}");
    }
}

fn spawn_error(program: &Path, error: &std::io::Error) -> anyhow::Error {
    if error.kind() == std::io::ErrorKind::NotFound {
        LauncherError::PatchToolNotFound {
            tool: program.display().to_string(),
        }
        .into()
    } else {
        LauncherError::file_system("spawning process", program, error).into()
    }
}
