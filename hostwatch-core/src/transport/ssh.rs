//! Transport backed by the system OpenSSH client
//!
//! `open` starts a control master (through `sshpass` when a password or key
//! passphrase has to be typed) and every later command is multiplexed over
//! that one authenticated connection with `BatchMode=yes`. Secrets are only
//! ever handed to the process that starts the master.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;

use super::{ConnectTarget, Connector, Transport, TransportError};
use crate::auth::Credential;
use crate::config::ConnectionSettings;
use crate::error::ConnectionError;

/// `sshpass` exit code for a rejected password
const SSHPASS_BAD_PASSWORD: i32 = 5;
/// `sshpass` exit code for an unknown host key
const SSHPASS_HOST_KEY_UNKNOWN: i32 = 6;

/// Limit for tearing down a control master
const CLOSE_TIMEOUT_SECS: u64 = 5;

/// Options for [`SshConnector`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshOptions {
    /// Limit for establishing the master connection
    pub connect_timeout_secs: u64,
    /// Limit for one remote command
    pub exec_timeout_secs: u64,
    /// Refuse unknown host keys
    pub strict_host_key_checking: bool,
    /// Directory holding control sockets
    pub control_dir: PathBuf,
}

impl SshOptions {
    /// Builds options from `[connection]` settings
    #[must_use]
    pub fn from_settings(settings: &ConnectionSettings) -> Self {
        Self {
            connect_timeout_secs: settings.connect_timeout_secs.max(1),
            exec_timeout_secs: settings.exec_timeout_secs.max(1),
            strict_host_key_checking: settings.strict_host_key_checking,
            control_dir: default_control_dir(),
        }
    }
}

impl Default for SshOptions {
    fn default() -> Self {
        Self::from_settings(&ConnectionSettings::default())
    }
}

/// Runtime dir when available (short, private); temp dir otherwise
fn default_control_dir() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("hostwatch")
}

/// A program plus arguments, with the secret it expects in `SSHPASS`
struct SshInvocation {
    program: &'static str,
    args: Vec<String>,
    secret: Option<SecretString>,
}

impl SshInvocation {
    fn uses_sshpass(&self) -> bool {
        self.program == "sshpass"
    }

    fn into_command(self) -> Command {
        let mut cmd = Command::new(self.program);
        cmd.args(&self.args);
        if let Some(secret) = self.secret {
            cmd.env("SSHPASS", secret.expose_secret());
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

fn opt(args: &mut Vec<String>, value: impl Into<String>) {
    args.push("-o".to_string());
    args.push(value.into());
}

/// Arguments that start a control master and run `true` through it
fn master_invocation(
    target: &ConnectTarget,
    credential: Credential,
    control_path: &Path,
    options: &SshOptions,
) -> SshInvocation {
    let mut ssh_args = Vec::new();
    opt(&mut ssh_args, "ControlMaster=yes");
    opt(&mut ssh_args, format!("ControlPath={}", control_path.display()));
    opt(&mut ssh_args, "ControlPersist=yes");
    opt(
        &mut ssh_args,
        format!("ConnectTimeout={}", options.connect_timeout_secs),
    );
    opt(
        &mut ssh_args,
        if options.strict_host_key_checking {
            "StrictHostKeyChecking=yes"
        } else {
            "StrictHostKeyChecking=no"
        },
    );

    let (prefix, secret) = match credential {
        Credential::Password(password) => {
            opt(
                &mut ssh_args,
                "PreferredAuthentications=password,keyboard-interactive",
            );
            opt(&mut ssh_args, "PubkeyAuthentication=no");
            opt(&mut ssh_args, "NumberOfPasswordPrompts=1");
            (vec!["-e"], Some(password))
        }
        Credential::PrivateKey {
            key_path,
            passphrase,
        } => {
            ssh_args.push("-i".to_string());
            ssh_args.push(key_path.display().to_string());
            opt(&mut ssh_args, "IdentitiesOnly=yes");
            opt(&mut ssh_args, "PreferredAuthentications=publickey");
            match passphrase {
                // sshpass must answer the key prompt, not a password prompt
                Some(passphrase) => (vec!["-P", "passphrase", "-e"], Some(passphrase)),
                None => {
                    opt(&mut ssh_args, "BatchMode=yes");
                    (Vec::new(), None)
                }
            }
        }
    };

    ssh_args.push("-p".to_string());
    ssh_args.push(target.port.to_string());
    ssh_args.push(target.destination());
    ssh_args.push("true".to_string());

    if secret.is_some() {
        let mut args: Vec<String> = prefix.into_iter().map(String::from).collect();
        args.push("ssh".to_string());
        args.extend(ssh_args);
        SshInvocation {
            program: "sshpass",
            args,
            secret,
        }
    } else {
        SshInvocation {
            program: "ssh",
            args: ssh_args,
            secret: None,
        }
    }
}

/// Arguments that run `command` over an existing master
fn exec_args(target: &ConnectTarget, control_path: &Path, command: &str) -> Vec<String> {
    let mut args = Vec::new();
    opt(&mut args, format!("ControlPath={}", control_path.display()));
    opt(&mut args, "ControlMaster=no");
    opt(&mut args, "BatchMode=yes");
    args.push("-p".to_string());
    args.push(target.port.to_string());
    args.push(target.destination());
    args.push(command.to_string());
    args
}

/// Arguments that ask the master to exit
fn close_args(target: &ConnectTarget, control_path: &Path) -> Vec<String> {
    let mut args = Vec::new();
    opt(&mut args, format!("ControlPath={}", control_path.display()));
    args.push("-O".to_string());
    args.push("exit".to_string());
    args.push("-p".to_string());
    args.push(target.port.to_string());
    args.push(target.destination());
    args
}

/// Maps a failed master start to a [`ConnectionError`]
fn classify_failure(
    exit_code: Option<i32>,
    stderr: &str,
    via_sshpass: bool,
    timeout_secs: u64,
) -> ConnectionError {
    if via_sshpass {
        match exit_code {
            Some(SSHPASS_BAD_PASSWORD) => {
                return ConnectionError::AuthFailed("invalid password or passphrase".to_string());
            }
            Some(SSHPASS_HOST_KEY_UNKNOWN) => {
                return ConnectionError::HostUnreachable(
                    "host key is unknown and strict checking is enabled".to_string(),
                );
            }
            _ => {}
        }
    }

    let message = stderr
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .map_or_else(
            || format!("ssh exited with status {}", exit_code.unwrap_or(-1)),
            str::to_string,
        );
    let lower = stderr.to_lowercase();

    if lower.contains("permission denied")
        || lower.contains("authentication failed")
        || lower.contains("too many authentication failures")
        || lower.contains("incorrect passphrase")
    {
        ConnectionError::AuthFailed(message)
    } else if lower.contains("timed out") {
        ConnectionError::Timeout(timeout_secs)
    } else {
        ConnectionError::HostUnreachable(message)
    }
}

/// [`Connector`] that shells out to `ssh`
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    options: SshOptions,
}

impl SshConnector {
    /// Creates a connector
    #[must_use]
    pub const fn new(options: SshOptions) -> Self {
        Self { options }
    }

    /// The options in use
    #[must_use]
    pub const fn options(&self) -> &SshOptions {
        &self.options
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn open(
        &self,
        target: &ConnectTarget,
        credential: Credential,
    ) -> Result<Arc<dyn Transport>, ConnectionError> {
        std::fs::create_dir_all(&self.options.control_dir).map_err(|e| {
            ConnectionError::HostUnreachable(format!(
                "cannot create control directory '{}': {e}",
                self.options.control_dir.display()
            ))
        })?;

        let id = uuid::Uuid::new_v4().simple().to_string();
        let control_path = self
            .options
            .control_dir
            .join(format!("cm-{}", id.get(..12).unwrap_or(&id)));

        let auth_kind = credential.kind();
        let invocation = master_invocation(target, credential, &control_path, &self.options);
        let via_sshpass = invocation.uses_sshpass();
        let program = invocation.program;
        let mut cmd = invocation.into_command();

        tracing::debug!(
            host = %target.host,
            port = target.port,
            auth_kind,
            "Starting ssh control master"
        );

        // The client enforces ConnectTimeout itself; the outer limit covers
        // a stuck authentication exchange.
        let limit = self.options.connect_timeout_secs;
        let output = match tokio::time::timeout(Duration::from_secs(limit * 2), cmd.output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConnectionError::HostUnreachable(format!(
                    "'{program}' is not installed"
                )));
            }
            Ok(Err(e)) => {
                return Err(ConnectionError::HostUnreachable(format!(
                    "failed to spawn {program}: {e}"
                )));
            }
            Err(_) => return Err(ConnectionError::Timeout(limit)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(
                output.status.code(),
                &stderr,
                via_sshpass,
                limit,
            ));
        }

        Ok(Arc::new(SshTransport {
            target: target.clone(),
            control_path,
            exec_timeout_secs: self.options.exec_timeout_secs,
            closed: AtomicBool::new(false),
        }))
    }
}

/// One multiplexed SSH connection
#[derive(Debug)]
pub struct SshTransport {
    target: ConnectTarget,
    control_path: PathBuf,
    exec_timeout_secs: u64,
    closed: AtomicBool,
}

impl SshTransport {
    /// Control socket of the master connection
    #[must_use]
    pub fn control_path(&self) -> &Path {
        &self.control_path
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn exec(&self, command: &str) -> Result<String, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let mut cmd = Command::new("ssh");
        cmd.args(exec_args(&self.target, &self.control_path, command))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let timeout = Duration::from_secs(self.exec_timeout_secs);
        match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => {
                if output.status.success() {
                    String::from_utf8(output.stdout)
                        .map_err(|e| TransportError::Failed(format!("Invalid UTF-8 in output: {e}")))
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(TransportError::Failed(format!(
                        "exit {}: {}",
                        output.status,
                        stderr.trim()
                    )))
                }
            }
            Ok(Err(e)) => Err(TransportError::Failed(format!(
                "Failed to spawn ssh process: {e}"
            ))),
            Err(_) => Err(TransportError::Timeout(self.exec_timeout_secs)),
        }
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut cmd = Command::new("ssh");
        cmd.args(close_args(&self.target, &self.control_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let timeout = Duration::from_secs(CLOSE_TIMEOUT_SECS);
        match tokio::time::timeout(timeout, cmd.status()).await {
            Ok(Ok(status)) if status.success() => {
                tracing::debug!(host = %self.target.host, "Control master closed");
            }
            Ok(Ok(status)) => {
                tracing::debug!(host = %self.target.host, %status, "Control master exit request failed");
            }
            Ok(Err(e)) => {
                tracing::debug!(host = %self.target.host, error = %e, "Failed to spawn ssh -O exit");
            }
            Err(_) => {
                tracing::debug!(host = %self.target.host, "ssh -O exit timed out");
            }
        }
        let _ = std::fs::remove_file(&self.control_path);
    }

    fn target(&self) -> &ConnectTarget {
        &self.target
    }
}

impl Drop for SshTransport {
    fn drop(&mut self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        // Best effort so a dropped session does not leave a master behind
        let _ = std::process::Command::new("ssh")
            .args(close_args(&self.target, &self.control_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
    }
}
