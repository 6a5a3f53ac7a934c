pub mod clipboard;
pub mod screenshot;
pub mod speech;

use async_trait::async_trait;
use std::env;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Result, SnapSenseError};

pub use clipboard::ClipboardTool;
pub use screenshot::ScreenshotTool;

/// A program plus its arguments. Never goes through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
}

impl CommandOutput {
    pub fn describe_status(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Answers whether an external program can be run at all.
pub trait CapabilityProbe: Send + Sync {
    fn is_available(&self, program: &str) -> bool;
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs to completion, capturing stdout.
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Runs to completion with `input` written to stdin. Stdout is not
    /// captured: clipboard tools fork children that keep it open.
    async fn run_with_input(&self, invocation: &Invocation, input: &str) -> Result<CommandOutput>;

    /// Starts the program and returns immediately.
    fn spawn_detached(&self, invocation: &Invocation) -> Result<()>;
}

pub trait Toolbox: CapabilityProbe + CommandRunner {}

impl<T: CapabilityProbe + CommandRunner> Toolbox for T {}

/// Runs real processes found on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct SystemTools;

impl SystemTools {
    pub fn new() -> Self {
        Self
    }
}

impl CapabilityProbe for SystemTools {
    fn is_available(&self, program: &str) -> bool {
        if program.contains(std::path::MAIN_SEPARATOR) {
            return is_executable(Path::new(program));
        }
        env::var_os("PATH")
            .map(|paths| env::split_paths(&paths).any(|dir| is_executable(&dir.join(program))))
            .unwrap_or(false)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

fn spawn_error(invocation: &Invocation, e: std::io::Error) -> SnapSenseError {
    SnapSenseError::CommandError(format!("could not start `{}`: {}", invocation.program, e))
}

fn to_output(output: std::process::Output) -> CommandOutput {
    CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
    }
}

#[async_trait]
impl CommandRunner for SystemTools {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        log::debug!("Running `{}`", invocation);
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .await
            .map_err(|e| spawn_error(invocation, e))?;
        Ok(to_output(output))
    }

    async fn run_with_input(&self, invocation: &Invocation, input: &str) -> Result<CommandOutput> {
        log::debug!("Running `{}` with {} bytes on stdin", invocation, input.len());
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| spawn_error(invocation, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        let status = child.wait().await?;
        Ok(CommandOutput {
            success: status.success(),
            code: status.code(),
            stdout: String::new(),
        })
    }

    fn spawn_detached(&self, invocation: &Invocation) -> Result<()> {
        log::debug!("Spawning `{}`", invocation);
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| spawn_error(invocation, e))?;

        let program = invocation.program.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => log::debug!("`{}` exited with {}", program, status),
                Err(e) => log::warn!("Could not wait for `{}`: {}", program, e),
            }
        });
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_builds_and_displays() {
        let invocation = Invocation::new("grim").args(["-g", "0,0 10x10"]).arg("/tmp/a.png");
        assert_eq!(invocation.args, vec!["-g", "0,0 10x10", "/tmp/a.png"]);
        assert_eq!(invocation.to_string(), "grim -g 0,0 10x10 /tmp/a.png");
    }

    #[test]
    fn probe_rejects_unknown_programs() {
        let tools = SystemTools::new();
        assert!(!tools.is_available("snapsense-no-such-program-xyz"));
    }

    #[cfg(unix)]
    #[test]
    fn probe_finds_shell() {
        assert!(SystemTools::new().is_available("sh"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_captures_stdout_and_input() {
        let tools = SystemTools::new();
        let output = tools
            .run(&Invocation::new("sh").args(["-c", "echo hello"]))
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "hello");

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("stdin.txt");
        let script = format!("cat > '{}'", target.display());
        let output = tools
            .run_with_input(&Invocation::new("sh").args(["-c", script.as_str()]), "piped text")
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "piped text");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn input_run_returns_when_parent_exits() {
        // Stands in for xclip, which forks and keeps serving the selection.
        let forking = Invocation::new("sh").args(["-c", "cat >/dev/null; (sleep 5) & exit 0"]);
        let output = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            SystemTools::new().run_with_input(&forking, "caption"),
        )
        .await
        .expect("waited for the forked child")
        .unwrap();
        assert!(output.success);
    }

    #[tokio::test]
    async fn missing_program_is_command_error() {
        let err = SystemTools::new()
            .run(&Invocation::new("snapsense-no-such-program-xyz"))
            .await
            .unwrap_err();
        assert!(matches!(err, SnapSenseError::CommandError(_)));
    }
}
