//! Disambiguator running as a long-lived child process.
//!
//! One process serves all requests. Requests are serialized by a mutex; a
//! reader thread forwards the child's stdout line by line through a channel
//! so that every exchange can honour a deadline.
//!
//! Any failure (timeout, broken pipe, protocol error) terminates the child so
//! a stale answer is never read. The next call starts a fresh child. Only an
//! explicit [`ProcessDisambiguator::shutdown`] stops it for good; later calls
//! then fail with [`DisambError::NotRunning`].

use super::Disambiguator;
use super::protocol::{decode_line, encode_dag, regroup};
use crate::RawNode;
use crate::error::DisambError;
use std::ffi::{OsStr, OsString};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

struct Channel {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<std::io::Result<String>>,
}

impl Channel {
    fn start(program: &Path, args: &[OsString]) -> Result<Self, DisambError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| DisambError::Spawn { program: program.to_path_buf(), source })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(DisambError::Exited);
        };

        let (tx, rx) = mpsc::channel();
        let reader = thread::Builder::new().name("disamb-reader".to_string()).spawn(move || {
            for line in BufReader::new(stdout).lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        if let Err(err) = reader {
            let _ = child.kill();
            let _ = child.wait();
            return Err(err.into());
        }

        info!(program = %program.display(), pid = child.id(), "disambiguator started");
        Ok(Channel { child, stdin, lines: rx })
    }

    fn terminate(self) {
        let Channel { mut child, stdin, .. } = self;
        drop(stdin);
        if let Err(err) = child.kill() {
            debug!(error = %err, "disambiguator already gone");
        }
        let _ = child.wait();
    }

    /// Send one request and collect response lines up to the empty line.
    fn exchange(&mut self, request: &str, timeout: Duration) -> Result<Vec<String>, DisambError> {
        self.stdin.write_all(request.as_bytes())?;
        self.stdin.flush()?;

        let deadline = Instant::now() + timeout;
        let mut lines = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(Ok(line)) if line.is_empty() => return Ok(lines),
                Ok(Ok(line)) => lines.push(line),
                Ok(Err(err)) => return Err(err.into()),
                Err(RecvTimeoutError::Timeout) => return Err(DisambError::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => return Err(DisambError::Exited),
            }
        }
    }
}

enum State {
    Running(Channel),
    /// The last exchange failed; the next call restarts the child.
    Failed,
    Stopped,
}

/// Disambiguator backed by an auxiliary executable speaking the line
/// protocol of `disamb/protocol.rs`.
pub struct ProcessDisambiguator {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
    state: Mutex<State>,
}

impl ProcessDisambiguator {
    /// Start `program` with `args`. `timeout` bounds every exchange.
    pub fn spawn<I, S>(program: impl Into<PathBuf>, args: I, timeout: Duration) -> Result<Self, DisambError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = program.into();
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let channel = Channel::start(&program, &args)?;
        Ok(Self { program, args, timeout, state: Mutex::new(State::Running(channel)) })
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lock(), State::Running(_))
    }

    /// Stop the child process for good. Safe to call more than once.
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.lock(), State::Stopped);
        if let State::Running(channel) = previous {
            channel.terminate();
            info!(program = %self.program.display(), "disambiguator stopped");
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Disambiguator for ProcessDisambiguator {
    fn disambiguate(&self, dag: Vec<RawNode>) -> Result<Vec<RawNode>, DisambError> {
        if dag.is_empty() {
            return Ok(dag);
        }
        let request = encode_dag(&dag);

        let mut guard = self.lock();
        if matches!(*guard, State::Stopped) {
            return Err(DisambError::NotRunning);
        }
        if matches!(*guard, State::Failed) {
            warn!(program = %self.program.display(), "restarting disambiguator");
            *guard = State::Running(Channel::start(&self.program, &self.args)?);
        }
        let State::Running(channel) = &mut *guard else {
            return Err(DisambError::NotRunning);
        };

        let result = channel
            .exchange(&request, self.timeout)
            .and_then(|lines| lines.iter().map(|line| decode_line(line)).collect::<Result<Vec<_>, _>>())
            .and_then(|interps| regroup(&dag, interps));

        if let Err(err) = &result {
            warn!(program = %self.program.display(), error = %err, "disambiguator failed, terminating it");
            if let State::Running(channel) = std::mem::replace(&mut *guard, State::Failed) {
                channel.terminate();
            }
        }

        result
    }
}

impl Drop for ProcessDisambiguator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
