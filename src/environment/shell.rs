//! Running shell commands under a wall-clock ceiling.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::{Duration, Instant};

use super::EnvironmentError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Time allowed to drain output once the command's budget is spent.
const READ_GRACE: Duration = Duration::from_millis(100);

const STDOUT: usize = 0;
const STDERR: usize = 1;

/// Captured result of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    pub duration: Duration,
    /// Combined stdout and stderr.
    pub output: String,
    pub timed_out: bool,
}

impl CommandOutput {
    /// Output for a command that had no time left to run at all.
    pub fn out_of_time() -> Self {
        Self {
            exit_code: None,
            duration: Duration::ZERO,
            output: String::new(),
            timed_out: true,
        }
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Runs commands inside an execution environment.
pub trait Shell {
    /// Run `command` in `directory`, killing it once `time_limit` elapses.
    ///
    /// A non-zero exit or a timeout is reported through [`CommandOutput`];
    /// only failing to run the command at all is an error.
    fn run(
        &self,
        command: &str,
        directory: &str,
        time_limit: Option<Duration>,
    ) -> Result<CommandOutput, EnvironmentError>;
}

/// A shell on the local machine, rooted at a directory.
#[derive(Debug, Clone)]
pub struct LocalShell {
    root: PathBuf,
}

impl LocalShell {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a working directory; relative paths are taken from the root.
    fn resolve(&self, directory: &str) -> PathBuf {
        let path = Path::new(directory);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Shell for LocalShell {
    fn run(
        &self,
        command: &str,
        directory: &str,
        time_limit: Option<Duration>,
    ) -> Result<CommandOutput, EnvironmentError> {
        if time_limit == Some(Duration::ZERO) {
            log::debug!("No time left to run `{}`", command);
            return Ok(CommandOutput::out_of_time());
        }

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(self.resolve(directory))
            .stdin(Stdio::null());

        run_with_timeout(&mut cmd, time_limit).map_err(|source| EnvironmentError::Spawn {
            command: command.to_string(),
            source,
        })
    }
}

fn run_with_timeout(
    command: &mut Command,
    time_limit: Option<Duration>,
) -> io::Result<CommandOutput> {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group, so a timeout also takes down grandchildren.
        command.process_group(0);
    }

    let start = Instant::now();
    let mut child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("failed to capture stderr"))?;

    let (sender, receiver) = mpsc::channel();
    spawn_reader(STDOUT, stdout, sender.clone());
    spawn_reader(STDERR, stderr, sender);

    let mut timed_out = false;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if let Some(limit) = time_limit
            && start.elapsed() >= limit
        {
            timed_out = true;
            break None;
        }
        thread::sleep(POLL_INTERVAL);
    };

    // Background jobs the command left behind still hold its pipes open.
    kill_group(&mut child);
    let status = status.or_else(|| child.wait().ok());
    let duration = start.elapsed();

    let mut streams = [String::new(), String::new()];
    for _ in 0..streams.len() {
        let received = match time_limit {
            Some(limit) => {
                let left = limit.saturating_sub(start.elapsed()).max(READ_GRACE);
                receiver.recv_timeout(left).ok()
            }
            None => receiver.recv().ok(),
        };
        match received {
            Some((stream, text)) => streams[stream] = text,
            None => {
                timed_out = true;
                break;
            }
        }
    }
    let [mut output, errors] = streams;
    output.push_str(&errors);

    Ok(CommandOutput {
        exit_code: status.and_then(|status| status.code()),
        duration,
        output,
        timed_out,
    })
}

/// Kill the command and everything left in its process group.
fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        let _ = Command::new("sh")
            .arg("-c")
            .arg(format!("kill -9 -{} 2>/dev/null", child.id()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
    let _ = child.kill();
}

fn spawn_reader(
    stream: usize,
    mut reader: impl Read + Send + 'static,
    sender: Sender<(usize, String)>,
) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        let _ = sender.send((stream, String::from_utf8_lossy(&buf).into_owned()));
    });
}
