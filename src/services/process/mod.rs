// Script process
// Spawns a script and streams its output over a channel from worker threads

use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::models::run::RunId;
use crate::services::command::CommandLine;
use crate::services::output::{LineAssembler, Stream};

const READ_CHUNK: usize = 8 * 1024;
const WAIT_INTERVAL: Duration = Duration::from_millis(40);
/// How long output may keep arriving after the process exited. Pipes held
/// open by grandchildren must not keep the run alive.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Readers send only while the gate is open; the waiter closes it before
/// `Exited` so nothing follows the exit event
type OutputGate = Arc<Mutex<bool>>;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to stop the process: {0}")]
    Kill(#[source] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Output { stream: Stream, line: String },
    /// Reading one of the pipes failed; the process may still be running
    ReadError { stream: Stream, message: String },
    /// Always the last event of a run
    Exited { code: Option<i32>, success: bool },
}

/// Handle to a running script
pub struct ScriptProcess {
    id: RunId,
    pid: u32,
    child: Arc<Mutex<Child>>,
    running: Arc<AtomicBool>,
    kill_requested: Arc<AtomicBool>,
}

impl ScriptProcess {
    pub fn spawn(
        command: &CommandLine,
        id: RunId,
    ) -> Result<(ScriptProcess, Receiver<RunEvent>), ProcessError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Python buffers stdout when it is not a terminal
            .env("PYTHONUNBUFFERED", "1")
            .env("PYTHONIOENCODING", "utf-8");

        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        // Own process group, so a cancel also reaches the script's children
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: command.program.clone(),
            source,
        })?;

        let pid = child.id();
        log::info!("Run {} started as pid {}: {}", id, pid, command.preview());

        let (tx, rx) = mpsc::channel();
        let gate: OutputGate = Arc::new(Mutex::new(true));
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, Stream::Stdout, tx.clone(), Arc::clone(&gate)));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, Stream::Stderr, tx.clone(), Arc::clone(&gate)));
        }

        let child = Arc::new(Mutex::new(child));
        let running = Arc::new(AtomicBool::new(true));

        spawn_waiter(id, Arc::clone(&child), Arc::clone(&running), readers, gate, tx);

        Ok((
            ScriptProcess {
                id,
                pid,
                child,
                running,
                kill_requested: Arc::new(AtomicBool::new(false)),
            },
            rx,
        ))
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn kill_requested(&self) -> bool {
        self.kill_requested.load(Ordering::SeqCst)
    }

    /// Terminate the child and, on unix, everything in its process group.
    /// The waiter thread still reports `Exited`.
    pub fn kill(&self) -> Result<(), ProcessError> {
        self.kill_requested.store(true, Ordering::SeqCst);
        if !self.is_running() {
            return Ok(());
        }

        let mut child = lock_child(&self.child);
        #[cfg(unix)]
        kill_group(self.pid)?;

        match child.kill() {
            Ok(()) => {
                log::info!("Run {} (pid {}) killed", self.id, self.pid);
                Ok(())
            }
            // Already exited between the check and the kill
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(ProcessError::Kill(e)),
        }
    }
}

fn lock_child(child: &Mutex<Child>) -> MutexGuard<'_, Child> {
    child.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(unix)]
fn kill_group(pid: u32) -> Result<(), ProcessError> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return Ok(());
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        // Group already gone
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(ProcessError::Kill(io::Error::from(errno))),
    }
}

/// Send through the gate; false once the gate is closed or nobody listens
fn send_open(gate: &Mutex<bool>, tx: &Sender<RunEvent>, event: RunEvent) -> bool {
    let open = gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    *open && tx.send(event).is_ok()
}

fn spawn_reader<R>(
    mut source: R,
    stream: Stream,
    tx: Sender<RunEvent>,
    gate: OutputGate,
) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut assembler = LineAssembler::new();
        let mut buf = [0u8; READ_CHUNK];

        loop {
            match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    for line in assembler.push(&buf[..n]) {
                        if !send_open(&gate, &tx, RunEvent::Output { stream, line }) {
                            return;
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let message = e.to_string();
                    send_open(&gate, &tx, RunEvent::ReadError { stream, message });
                    break;
                }
            }
        }

        if let Some(line) = assembler.finish() {
            send_open(&gate, &tx, RunEvent::Output { stream, line });
        }
    })
}

fn spawn_waiter(
    id: RunId,
    child: Arc<Mutex<Child>>,
    running: Arc<AtomicBool>,
    readers: Vec<JoinHandle<()>>,
    gate: OutputGate,
    tx: Sender<RunEvent>,
) {
    thread::spawn(move || {
        let status = loop {
            let polled = lock_child(&child).try_wait();
            match polled {
                Ok(Some(status)) => break Ok(status),
                Ok(None) => thread::sleep(WAIT_INTERVAL),
                Err(e) => break Err(e),
            }
        };

        // Let buffered output reach the channel before the exit event
        let deadline = Instant::now() + DRAIN_TIMEOUT;
        while Instant::now() < deadline && readers.iter().any(|r| !r.is_finished()) {
            thread::sleep(WAIT_INTERVAL);
        }
        for reader in readers {
            if !reader.is_finished() {
                log::debug!("Run {} exited with its output still open, detaching reader", id);
                continue;
            }
            if reader.join().is_err() {
                log::warn!("Output reader of run {} panicked", id);
            }
        }

        let mut open = gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *open = false;
        running.store(false, Ordering::SeqCst);

        let event = match status {
            Ok(status) => {
                log::info!("Run {} exited: {}", id, status);
                RunEvent::Exited {
                    code: status.code(),
                    success: status.success(),
                }
            }
            Err(e) => {
                log::error!("Failed to wait for run {}: {}", id, e);
                RunEvent::Exited {
                    code: None,
                    success: false,
                }
            }
        };
        let _ = tx.send(event);
        drop(open);
    });
}
