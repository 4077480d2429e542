//! Engine Process: owns one spawned child end-to-end — startup handshake,
//! option setting, position setting, search invocation, shutdown. No other
//! component is allowed to touch this child's streams.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;

use crate::config::EngineDescriptor;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::usi::{self, GoParams, InfoAccumulator, USIOption};

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const READY_TIMEOUT: Duration = Duration::from_secs(60);
const QUIT_WAIT_TIMEOUT: Duration = Duration::from_secs(2);
const OPTION_APPLY_DELAY: Duration = Duration::from_millis(50);

/// Operational states of one engine child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Initializing,
    Ready,
    Thinking,
    Error,
}

fn valid_transition(from: EngineState, to: EngineState) -> bool {
    use EngineState::*;
    matches!(
        (from, to),
        (Idle, Initializing)
            | (Initializing, Ready)
            | (Initializing, Error)
            | (Ready, Thinking)
            | (Thinking, Ready)
            | (Ready, Error)
            | (Thinking, Error)
    )
}

/// The result of a completed search cycle.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_move: String,
    pub ponder: Option<String>,
    pub info: InfoAccumulator,
}

/// Owns one spawned USI engine child process.
pub struct EngineProcess {
    descriptor: EngineDescriptor,
    child: Child,
    stdin: ChildStdin,
    reader: Lines<BufReader<ChildStdout>>,
    state: EngineState,
    engine_name: Option<String>,
    engine_author: Option<String>,
    options: Vec<USIOption>,
    current_options: indexmap::IndexMap<String, String>,
}

enum ReadOutcome {
    Line(String),
    TimedOut,
}

impl EngineProcess {
    /// Spawns the descriptor's executable and drives it through the full
    /// `usi`/`usiok` → `defaultOptions` → `isready`/`readyok` handshake. On
    /// any failure the nascent child is killed and an error returned; the
    /// caller (Role Manager) is responsible for leaving prior state intact.
    pub async fn spawn(descriptor: EngineDescriptor) -> OrchestratorResult<Self> {
        info!("spawning engine '{}' at {:?}", descriptor.id, descriptor.executable_path);

        let mut child = spawn_child(&descriptor.executable_path, &descriptor.working_directory)?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");
        spawn_stderr_drain(child.stderr.take(), descriptor.id.clone());

        let reader = BufReader::new(stdout).lines();

        let mut process = Self {
            descriptor,
            child,
            stdin,
            reader,
            state: EngineState::Idle,
            engine_name: None,
            engine_author: None,
            options: Vec::new(),
            current_options: indexmap::IndexMap::new(),
        };

        process.transition_state(EngineState::Initializing)?;

        if let Err(e) = process.run_handshake().await {
            error!("handshake failed for engine '{}': {e}", process.descriptor.id);
            let _ = process.child.kill().await;
            return Err(e);
        }

        process.transition_state(EngineState::Ready)?;
        info!("engine '{}' ready", process.descriptor.id);
        Ok(process)
    }

    pub fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn engine_name(&self) -> Option<&str> {
        self.engine_name.as_deref()
    }

    pub fn engine_author(&self) -> Option<&str> {
        self.engine_author.as_deref()
    }

    pub fn options(&self) -> &[USIOption] {
        &self.options
    }

    pub fn current_options(&self) -> &indexmap::IndexMap<String, String> {
        &self.current_options
    }

    /// True iff the child has not exited.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Sends `setoption` and records the applied value. No reply is
    /// expected or awaited.
    pub async fn set_option(&mut self, name: &str, value: &str) -> OrchestratorResult<()> {
        self.write_line(&usi::format_setoption(name, value)).await?;
        self.current_options.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Sends one `position ...` line. No reply.
    pub async fn set_position(&mut self, sfen: &str, moves: &[String]) -> OrchestratorResult<()> {
        self.write_line(&usi::format_position(sfen, moves)).await
    }

    pub async fn new_game(&mut self) -> OrchestratorResult<()> {
        self.write_line("usinewgame").await
    }

    /// Runs one full search cycle: `go ...` through `bestmove ...`. Every
    /// parsed `info` line is folded into the running accumulator (later
    /// fields overwrite earlier ones) and, if present, forwarded to
    /// `info_callback` as it arrives.
    pub async fn go(
        &mut self,
        params: &GoParams,
        mut info_callback: Option<&mut dyn FnMut(&InfoAccumulator)>,
    ) -> OrchestratorResult<SearchResult> {
        self.transition_state(EngineState::Thinking)?;
        self.write_line(&usi::format_go(params)).await?;

        let mut accumulator = InfoAccumulator::default();
        loop {
            let line = match self.read_line(Duration::from_secs(60)).await? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::TimedOut => continue,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((best_move, ponder)) = usi::parse_bestmove(line) {
                self.transition_state(EngineState::Ready)?;
                return Ok(SearchResult {
                    best_move,
                    ponder,
                    info: accumulator,
                });
            }

            if line.starts_with("info ") {
                let parsed = usi::parse_info(line);
                if let Some(cb) = info_callback.as_deref_mut() {
                    cb(&parsed);
                }
                accumulator.merge(parsed);
            }
        }
    }

    /// Requests the engine abort its current search. The engine is still
    /// expected to emit `bestmove`, which the in-flight `go` call consumes.
    pub async fn stop_search(&mut self) -> OrchestratorResult<()> {
        self.write_line("stop").await
    }

    /// Exits the engine: sends `quit`, waits up to `QUIT_WAIT_TIMEOUT` for
    /// the child to exit on its own, then force-kills it.
    pub async fn quit(mut self) -> OrchestratorResult<()> {
        let engine_id = self.descriptor.id.clone();
        if self.write_line("quit").await.is_err() {
            debug!("write of quit failed for '{engine_id}', child likely already dead");
        }

        match timeout(QUIT_WAIT_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!("engine '{engine_id}' exited with {status:?} after quit");
            }
            Ok(Err(e)) => {
                warn!("error waiting for engine '{engine_id}' to exit: {e}");
            }
            Err(_) => {
                warn!("engine '{engine_id}' did not exit within {QUIT_WAIT_TIMEOUT:?}, killing");
                let _ = self.child.kill().await;
                let _ = self.child.wait().await;
            }
        }
        Ok(())
    }

    fn transition_state(&mut self, to: EngineState) -> OrchestratorResult<()> {
        if self.state == to {
            return Ok(());
        }
        if !valid_transition(self.state, to) {
            return Err(OrchestratorError::InvalidTransition { from: self.state, to });
        }
        self.state = to;
        Ok(())
    }

    async fn run_handshake(&mut self) -> OrchestratorResult<()> {
        self.write_line("usi").await?;

        timeout(HANDSHAKE_TIMEOUT, self.read_until_usiok())
            .await
            .map_err(|_| OrchestratorError::HandshakeTimeout { phase: "usi" })??;

        for (name, value) in self.descriptor.default_options.clone() {
            self.set_option(&name, &value).await?;
            tokio::time::sleep(OPTION_APPLY_DELAY).await;
        }

        self.write_line("isready").await?;
        timeout(READY_TIMEOUT, self.read_until_readyok())
            .await
            .map_err(|_| OrchestratorError::HandshakeTimeout { phase: "isready" })??;

        Ok(())
    }

    async fn read_until_usiok(&mut self) -> OrchestratorResult<()> {
        loop {
            let line = match self.read_line(HANDSHAKE_TIMEOUT).await? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::TimedOut => continue,
            };
            let line = line.trim();
            if line == "usiok" {
                return Ok(());
            } else if let Some(name) = line.strip_prefix("id name ") {
                self.engine_name = Some(name.trim().to_string());
            } else if let Some(author) = line.strip_prefix("id author ") {
                self.engine_author = Some(author.trim().to_string());
            } else if let Some(option) = usi::parse_option(line) {
                self.options.push(option);
            } else {
                debug!("ignoring unrecognized line during usi handshake: {line}");
            }
        }
    }

    async fn read_until_readyok(&mut self) -> OrchestratorResult<()> {
        loop {
            let line = match self.read_line(READY_TIMEOUT).await? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::TimedOut => continue,
            };
            if line.trim() == "readyok" {
                return Ok(());
            }
            debug!("ignoring line while awaiting readyok: {}", line.trim());
        }
    }

    async fn write_line(&mut self, line: &str) -> OrchestratorResult<()> {
        debug!("-> [{}] {line}", self.descriptor.id);
        let mut framed = line.to_string();
        framed.push('\n');
        self.stdin.write_all(framed.as_bytes()).await.map_err(|e| {
            self.state = EngineState::Error;
            OrchestratorError::WriteFailed {
                engine_id: self.descriptor.id.clone(),
                source: e,
            }
        })?;
        self.stdin.flush().await.map_err(|e| OrchestratorError::WriteFailed {
            engine_id: self.descriptor.id.clone(),
            source: e,
        })
    }

    async fn read_line(&mut self, wait: Duration) -> OrchestratorResult<ReadOutcome> {
        match timeout(wait, self.reader.next_line()).await {
            Ok(Ok(Some(line))) => {
                debug!("<- [{}] {line}", self.descriptor.id);
                Ok(ReadOutcome::Line(line))
            }
            Ok(Ok(None)) => {
                self.state = EngineState::Error;
                Err(OrchestratorError::UnexpectedExit {
                    engine_id: self.descriptor.id.clone(),
                })
            }
            Ok(Err(e)) => {
                self.state = EngineState::Error;
                match e.kind() {
                    std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::UnexpectedEof => Err(OrchestratorError::UnexpectedExit {
                        engine_id: self.descriptor.id.clone(),
                    }),
                    _ => Err(OrchestratorError::Io(e)),
                }
            }
            Err(_) => Ok(ReadOutcome::TimedOut),
        }
    }
}

fn spawn_child(executable_path: &PathBuf, working_directory: &PathBuf) -> OrchestratorResult<Child> {
    let mut command = Command::new(executable_path);
    command
        .current_dir(working_directory)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env("TERM", "dumb");

    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    command.spawn().map_err(|e| OrchestratorError::SpawnFailed {
        path: executable_path.clone(),
        source: e,
    })
}

/// Drains stderr in the background so a chatty engine never blocks on a
/// full pipe buffer. USI engines do not carry protocol data on stderr in
/// practice, so these lines are logged, not parsed.
fn spawn_stderr_drain(stderr: Option<tokio::process::ChildStderr>, engine_id: String) {
    let Some(stderr) = stderr else { return };
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!("[{engine_id} stderr] {line}");
        }
    });
}
