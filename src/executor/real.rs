//! Real command executor implementation.

use std::process::{Child, Command, Stdio};
use std::thread;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use which::which;

use super::pipe::{StreamType, panic_message, read_pipe_to_log};
use super::{CommandExecutor, CommandSpec, ExecutionResult};
use crate::error::DistroError;

/// Kills a child whose output could not be drained and reaps it.
fn cleanup_child_process<I>(child: &mut Child, handles: I)
where
    I: IntoIterator<Item = JoinHandle<()>>,
{
    let pid = child.id();
    if let Err(e) = child.kill() {
        tracing::debug!(pid, "kill returned error (process may have already exited): {}", e);
    }
    if let Err(e) = child.wait() {
        tracing::warn!(pid, "failed to wait for child process after kill: {}", e);
    }
    for handle in handles {
        if let Err(e) = handle.join() {
            tracing::warn!("reader thread panicked during cleanup: {}", panic_message(&*e));
        }
    }
}

fn spawn_reader<R>(pipe: Option<R>, command: String, stream: StreamType) -> std::io::Result<JoinHandle<()>>
where
    R: std::io::Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("{}-reader", stream))
        .spawn(move || read_pipe_to_log(pipe, &command, stream))
}

/// Command executor that runs actual system commands.
///
/// When the `CommandSpec` carries a privilege method, the command is run as
/// `<sudo|doas> <command> <args...>`.
#[derive(Debug, Default, Clone)]
pub struct RealCommandExecutor;

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        let mut command = match spec.privilege {
            Some(method) => {
                let wrapper = which(method.command_name())
                    .with_context(|| format!("command not found: {}", method))?;
                let mut command = Command::new(wrapper);
                command.arg(&spec.command);
                command
            }
            None => {
                let cmd = which(&spec.command)
                    .with_context(|| format!("command not found: {}", spec.command))?;
                tracing::trace!("command found: {}: {}", spec.command, cmd.to_string_lossy());
                Command::new(cmd)
            }
        };
        command.args(&spec.args);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", spec.display()))?;
        tracing::trace!("spawned command: {}: pid={}", spec.command, child.id());

        let stdout_handle = match spawn_reader(child.stdout.take(), spec.command.clone(), StreamType::Stdout) {
            Ok(handle) => handle,
            Err(e) => {
                cleanup_child_process(&mut child, []);
                return Err(DistroError::Execution {
                    command: spec.display(),
                    status: format!("failed to spawn stdout reader thread: {}", e),
                }
                .into());
            }
        };
        let stderr_handle = match spawn_reader(child.stderr.take(), spec.command.clone(), StreamType::Stderr) {
            Ok(handle) => handle,
            Err(e) => {
                cleanup_child_process(&mut child, [stdout_handle]);
                return Err(DistroError::Execution {
                    command: spec.display(),
                    status: format!("failed to spawn stderr reader thread: {}", e),
                }
                .into());
            }
        };

        let status = match child.wait() {
            Ok(s) => s,
            Err(e) => {
                cleanup_child_process(&mut child, [stdout_handle, stderr_handle]);
                return Err(DistroError::Execution {
                    command: spec.display(),
                    status: format!("failed to wait for command: {}", e),
                }
                .into());
            }
        };

        for (name, handle) in [("stdout", stdout_handle), ("stderr", stderr_handle)] {
            if let Err(e) = handle.join() {
                tracing::error!(stream = name, panic = panic_message(&*e), "reader thread panicked");
            }
        }

        tracing::trace!("executed command: {}: success={}", spec.command, status.success());
        Ok(ExecutionResult { status })
    }
}
