//! Molecular docking using AutoDock Vina.
//!
//! The runner never decides success from log text. A run is `Completed` only
//! when both output files exist and the configured exit policy accepts the
//! process status.

use serde::Serialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use vinadock_common::{DockingSettings, ExitPolicy};

use crate::request::{DockingBox, DockingRequest};
use crate::workspace::JobWorkspace;

/// Why a docking run did not complete. `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DockingFailure {
    #[error("Error: AutoDock Vina executable not found. Check the path!")]
    ExecutableNotFound { path: PathBuf },

    #[error("Error: Could not prepare the docking workspace: {message}")]
    Workspace { message: String },

    #[error("Error: Docking failed.\n\nVina Error Log:\n{message}")]
    Invocation { message: String },

    #[error("Error: Docking did not produce an output file.")]
    NoOutput { exit_code: Option<i32> },

    #[error("Error: AutoDock Vina exited with status {}.", exit_label(*.code))]
    NonZeroExit { code: Option<i32>, log: Option<String> },

    #[error("Error: Docking timed out after {after_secs} seconds.")]
    TimedOut { after_secs: u64 },
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "unknown (terminated by signal)".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DockingResult {
    Completed {
        log: String,
        #[serde(skip_serializing)]
        output: Vec<u8>,
        exit_code: Option<i32>,
    },
    Failed(DockingFailure),
}

impl DockingResult {
    pub fn is_completed(&self) -> bool {
        matches!(self, DockingResult::Completed { .. })
    }

    pub fn failure(&self) -> Option<&DockingFailure> {
        match self {
            DockingResult::Failed(f) => Some(f),
            DockingResult::Completed { .. } => None,
        }
    }

    /// Log text to show the user: the full log on success, the partial log
    /// for a non-zero exit, nothing otherwise.
    pub fn log(&self) -> Option<&str> {
        match self {
            DockingResult::Completed { log, .. } => Some(log),
            DockingResult::Failed(DockingFailure::NonZeroExit { log, .. }) => log.as_deref(),
            DockingResult::Failed(_) => None,
        }
    }
}

/// Whether the configured Vina executable exists.
pub fn check_vina_available(vina_path: &Path) -> bool {
    vina_path.is_file()
}

/// A fully resolved Vina invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VinaCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl VinaCommand {
    /// Shell-quoted rendering, for logs and display only. The process is
    /// spawned from `program` and `args` directly, never through a shell.
    pub fn display(&self) -> String {
        let program = self.program.to_string_lossy();
        std::iter::once(program.as_ref())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(s: &str) -> Cow<'_, str> {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if plain {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(format!("'{}'", s.replace('\'', r"'\''")))
    }
}

/// Wrapper for AutoDock Vina execution.
#[derive(Debug, Clone)]
pub struct VinaRunner {
    executable_path: PathBuf,
    timeout: Duration,
    exit_policy: ExitPolicy,
    extra_args: Vec<String>,
}

impl VinaRunner {
    /// Create a new VinaRunner with the default settings for everything but the path.
    pub fn new<P: AsRef<Path>>(executable_path: P) -> Self {
        let defaults = DockingSettings::default();
        Self {
            executable_path: executable_path.as_ref().to_path_buf(),
            timeout: defaults.timeout(),
            exit_policy: defaults.exit_policy,
            extra_args: defaults.extra_args,
        }
    }

    pub fn from_settings(settings: &DockingSettings) -> Self {
        Self {
            executable_path: settings.vina_path.clone(),
            timeout: settings.timeout(),
            exit_policy: settings.exit_policy,
            extra_args: settings.extra_args.clone(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_exit_policy(mut self, policy: ExitPolicy) -> Self {
        self.exit_policy = policy;
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn executable_path(&self) -> &Path {
        &self.executable_path
    }

    pub fn is_available(&self) -> bool {
        check_vina_available(&self.executable_path)
    }

    /// Build the invocation for a workspace and box. Shape:
    /// `--receptor R --ligand L --center_x .. --size_z .. [extra] --out O --log G`.
    pub fn command(&self, workspace: &JobWorkspace, docking_box: &DockingBox) -> VinaCommand {
        let path = |p: PathBuf| p.to_string_lossy().into_owned();
        let mut args = vec![
            "--receptor".to_string(),
            path(workspace.receptor_path()),
            "--ligand".to_string(),
            path(workspace.ligand_path()),
        ];
        let c = docking_box.center;
        let s = docking_box.size;
        for (flag, value) in [
            ("--center_x", c.x),
            ("--center_y", c.y),
            ("--center_z", c.z),
            ("--size_x", s.x),
            ("--size_y", s.y),
            ("--size_z", s.z),
        ] {
            args.push(flag.to_string());
            args.push(value.to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args.extend([
            "--out".to_string(),
            path(workspace.output_path()),
            "--log".to_string(),
            path(workspace.log_path()),
        ]);

        VinaCommand {
            program: self.executable_path.clone(),
            args,
        }
    }

    /// Run AutoDock Vina for `request` inside `workspace`.
    pub async fn run(&self, workspace: &JobWorkspace, request: &DockingRequest) -> DockingResult {
        if !self.is_available() {
            warn!("AutoDock Vina executable not found at {:?}", self.executable_path);
            return DockingResult::Failed(DockingFailure::ExecutableNotFound {
                path: self.executable_path.clone(),
            });
        }

        if let Err(e) = workspace.write_inputs(request).await {
            warn!("Failed to write docking inputs: {}", e);
            return DockingResult::Failed(DockingFailure::Workspace {
                message: e.to_string(),
            });
        }

        let command = self.command(workspace, &request.docking_box);
        info!("Running AutoDock Vina: {}", command.display());

        let child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(workspace.dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to start AutoDock Vina: {}", e);
                return DockingResult::Failed(DockingFailure::Invocation {
                    message: e.to_string(),
                });
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("AutoDock Vina wait failed: {}", e);
                return DockingResult::Failed(DockingFailure::Invocation {
                    message: e.to_string(),
                });
            }
            Err(_) => {
                warn!("AutoDock Vina timed out after {:?}", self.timeout);
                return DockingResult::Failed(DockingFailure::TimedOut {
                    after_secs: self.timeout.as_secs(),
                });
            }
        };

        debug!(
            "AutoDock Vina exited with {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );

        self.classify(workspace, output.status).await
    }

    async fn classify(&self, workspace: &JobWorkspace, status: ExitStatus) -> DockingResult {
        let exit_code = status.code();

        if self.exit_policy == ExitPolicy::Strict && !status.success() {
            let log = workspace
                .read_log()
                .await
                .ok()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
            return DockingResult::Failed(DockingFailure::NonZeroExit { code: exit_code, log });
        }

        if !workspace.has_outputs().await {
            return DockingResult::Failed(DockingFailure::NoOutput { exit_code });
        }

        match read_outputs(workspace).await {
            Ok((log, output)) => {
                debug!("AutoDock Vina completed. Output in {:?}", workspace.output_path());
                DockingResult::Completed {
                    log: String::from_utf8_lossy(&log).into_owned(),
                    output,
                    exit_code,
                }
            }
            Err(e) => DockingResult::Failed(DockingFailure::Workspace {
                message: e.to_string(),
            }),
        }
    }
}

async fn read_outputs(workspace: &JobWorkspace) -> vinadock_common::Result<(Vec<u8>, Vec<u8>)> {
    Ok((workspace.read_log().await?, workspace.read_output().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Upload, Vec3};
    use tempfile::tempdir;

    fn request() -> DockingRequest {
        DockingRequest {
            receptor: Upload::new("receptor.pdbqt", b"ATOM      1  N   MET A   1".to_vec()),
            ligand: Upload::new("ligand.pdbqt", b"ROOT\nENDROOT\nTORSDOF 0".to_vec()),
            docking_box: DockingBox::default(),
        }
    }

    #[tokio::test]
    async fn test_command_shape() {
        let root = tempdir().unwrap();
        let ws = JobWorkspace::create(root.path(), "shape").await.unwrap();
        let runner = VinaRunner::new("/opt/vina/vina");
        let docking_box = DockingBox {
            center: Vec3::new(1.5, -2.0, 0.0),
            size: Vec3::new(20.0, 22.5, 18.0),
        };
        let cmd = runner.command(&ws, &docking_box);

        let flags: Vec<&str> = cmd.args.iter().step_by(2).map(String::as_str).collect();
        assert_eq!(
            flags,
            [
                "--receptor", "--ligand", "--center_x", "--center_y", "--center_z",
                "--size_x", "--size_y", "--size_z", "--out", "--log",
            ]
        );
        assert_eq!(cmd.args[5], "1.5");
        assert_eq!(cmd.args[7], "-2");
        assert_eq!(cmd.args[13], "22.5");
        assert!(cmd.args[17].ends_with("docked_output.pdbqt"));
        assert!(cmd.args[19].ends_with("vina_log.txt"));
    }

    #[tokio::test]
    async fn test_extra_args_before_outputs() {
        let root = tempdir().unwrap();
        let ws = JobWorkspace::create(root.path(), "extra").await.unwrap();
        let runner = VinaRunner::new("vina")
            .with_extra_args(vec!["--exhaustiveness".into(), "16".into()]);
        let cmd = runner.command(&ws, &DockingBox::default());
        let pos = cmd.args.iter().position(|a| a == "--exhaustiveness").unwrap();
        let out = cmd.args.iter().position(|a| a == "--out").unwrap();
        assert_eq!(cmd.args[pos + 1], "16");
        assert!(pos < out);
        assert!(cmd.args.iter().position(|a| a == "--size_z").unwrap() < pos);
    }

    #[test]
    fn test_display_quotes_paths_with_spaces() {
        let cmd = VinaCommand {
            program: PathBuf::from("/Program Files/Vina/vina.exe"),
            args: vec!["--center_x".into(), "0".into(), "--out".into(), "it's.pdbqt".into()],
        };
        assert_eq!(
            cmd.display(),
            r"'/Program Files/Vina/vina.exe' --center_x 0 --out 'it'\''s.pdbqt'"
        );
    }

    #[test]
    fn test_failure_messages() {
        let missing = DockingFailure::ExecutableNotFound { path: PathBuf::from("/nope") };
        assert_eq!(missing.to_string(), "Error: AutoDock Vina executable not found. Check the path!");
        let none = DockingFailure::NoOutput { exit_code: Some(0) };
        assert_eq!(none.to_string(), "Error: Docking did not produce an output file.");
        let inv = DockingFailure::Invocation { message: "Permission denied".into() };
        assert_eq!(inv.to_string(), "Error: Docking failed.\n\nVina Error Log:\nPermission denied");
        let exit = DockingFailure::NonZeroExit { code: Some(2), log: None };
        assert_eq!(exit.to_string(), "Error: AutoDock Vina exited with status 2.");
    }

    #[tokio::test]
    async fn test_missing_executable_writes_nothing() {
        let root = tempdir().unwrap();
        let ws = JobWorkspace::create(root.path(), "missing").await.unwrap();
        let runner = VinaRunner::new(root.path().join("no-such-vina"));

        let result = runner.run(&ws, &request()).await;

        assert!(matches!(
            result,
            DockingResult::Failed(DockingFailure::ExecutableNotFound { .. })
        ));
        assert_eq!(std::fs::read_dir(ws.dir()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use crate::testing::{fake_vina, NO_OUTPUT_RUN, SUCCESSFUL_RUN};

        #[tokio::test]
        async fn test_successful_run_returns_log_verbatim() {
            let root = tempdir().unwrap();
            let vina = fake_vina(root.path(), SUCCESSFUL_RUN);
            let ws = JobWorkspace::create(root.path(), "ok").await.unwrap();

            let result = VinaRunner::new(&vina).run(&ws, &request()).await;

            let on_disk = std::fs::read_to_string(ws.log_path()).unwrap();
            match &result {
                DockingResult::Completed { log, output, exit_code } => {
                    assert_eq!(log, &on_disk);
                    assert_eq!(output, &std::fs::read(ws.output_path()).unwrap());
                    assert_eq!(*exit_code, Some(0));
                }
                other => panic!("expected completion, got {:?}", other),
            }
            // The log mentions "Error" but the outcome is decided by the files.
            assert!(on_disk.contains("Error"));
            assert_eq!(std::fs::read(ws.receptor_path()).unwrap(), request().receptor.content);
        }

        #[tokio::test]
        async fn test_no_output_ignores_stdout() {
            let root = tempdir().unwrap();
            let vina = fake_vina(root.path(), NO_OUTPUT_RUN);
            let ws = JobWorkspace::create(root.path(), "none").await.unwrap();

            let result = VinaRunner::new(&vina).run(&ws, &request()).await;
            assert_eq!(
                result,
                DockingResult::Failed(DockingFailure::NoOutput { exit_code: Some(0) })
            );
        }

        #[tokio::test]
        async fn test_nonzero_exit_policy() {
            let script = format!("{}\nexit 3", SUCCESSFUL_RUN);
            let root = tempdir().unwrap();
            let vina = fake_vina(root.path(), &script);

            let strict_ws = JobWorkspace::create(root.path(), "strict").await.unwrap();
            let strict = VinaRunner::new(&vina).run(&strict_ws, &request()).await;
            match strict {
                DockingResult::Failed(DockingFailure::NonZeroExit { code, log }) => {
                    assert_eq!(code, Some(3));
                    assert!(log.unwrap().contains("affinity"));
                }
                other => panic!("expected non-zero exit failure, got {:?}", other),
            }

            let lenient_ws = JobWorkspace::create(root.path(), "lenient").await.unwrap();
            let lenient = VinaRunner::new(&vina)
                .with_exit_policy(ExitPolicy::Lenient)
                .run(&lenient_ws, &request())
                .await;
            assert!(lenient.is_completed());
        }

        #[tokio::test]
        async fn test_failed_exit_without_outputs() {
            let root = tempdir().unwrap();
            let vina = fake_vina(root.path(), "echo 'bad receptor' >&2\nexit 1");

            let strict_ws = JobWorkspace::create(root.path(), "strict").await.unwrap();
            let strict = VinaRunner::new(&vina).run(&strict_ws, &request()).await;
            assert_eq!(
                strict,
                DockingResult::Failed(DockingFailure::NonZeroExit { code: Some(1), log: None })
            );

            let lenient_ws = JobWorkspace::create(root.path(), "lenient").await.unwrap();
            let lenient = VinaRunner::new(&vina)
                .with_exit_policy(ExitPolicy::Lenient)
                .run(&lenient_ws, &request())
                .await;
            assert_eq!(
                lenient,
                DockingResult::Failed(DockingFailure::NoOutput { exit_code: Some(1) })
            );
        }

        #[tokio::test]
        async fn test_timeout_kills_run() {
            let root = tempdir().unwrap();
            let vina = fake_vina(root.path(), "exec sleep 30");
            let ws = JobWorkspace::create(root.path(), "slow").await.unwrap();

            let started = std::time::Instant::now();
            let result = VinaRunner::new(&vina)
                .with_timeout(Duration::from_secs(1))
                .run(&ws, &request())
                .await;

            assert_eq!(
                result,
                DockingResult::Failed(DockingFailure::TimedOut { after_secs: 1 })
            );
            assert!(started.elapsed() < Duration::from_secs(10));
        }

        #[tokio::test]
        async fn test_identical_requests_give_identical_results() {
            let root = tempdir().unwrap();
            let vina = fake_vina(root.path(), SUCCESSFUL_RUN);
            let runner = VinaRunner::new(&vina);

            let first_ws = JobWorkspace::create(root.path(), "first").await.unwrap();
            let second_ws = JobWorkspace::create(root.path(), "second").await.unwrap();
            let first = runner.run(&first_ws, &request()).await;
            let second = runner.run(&second_ws, &request()).await;

            assert!(first.is_completed());
            assert_eq!(first, second);
        }
    }
}
