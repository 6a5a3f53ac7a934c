//! Region screenshots through `grim` + `slurp` (Wayland) or `scrot` (X11).

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::config::CaptureConfig;
use crate::error::{Result, SnapSenseError};
use crate::tools::{CapabilityProbe, Invocation, Toolbox};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenshotTool {
    /// `slurp` picks the region, `grim` captures it.
    Wayland,
    /// `scrot -s` picks and captures in one go.
    X11,
}

impl ScreenshotTool {
    pub fn detect<P: CapabilityProbe + ?Sized>(probe: &P) -> Option<Self> {
        if probe.is_available("grim") && probe.is_available("slurp") {
            Some(ScreenshotTool::Wayland)
        } else if probe.is_available("scrot") {
            Some(ScreenshotTool::X11)
        } else {
            None
        }
    }
}

pub fn screenshot_path(dir: &Path, unix_seconds: i64) -> PathBuf {
    dir.join(format!("screenshot_{}.png", unix_seconds))
}

/// `screenshot_<secs>.png`, or `screenshot_<secs>_<n>.png` when earlier captures
/// in the same second already hold the name.
pub async fn free_screenshot_path(dir: &Path, unix_seconds: i64) -> PathBuf {
    let first = screenshot_path(dir, unix_seconds);
    if !path_taken(&first).await {
        return first;
    }
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("screenshot_{}_{}.png", unix_seconds, n));
        if !path_taken(&candidate).await {
            return candidate;
        }
        n += 1;
    }
}

async fn path_taken(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path).await.is_ok()
}

/// Lets the user select a region and writes it as PNG under the capture directory.
pub async fn capture<T: Toolbox + ?Sized>(tools: &T, config: &CaptureConfig) -> Result<PathBuf> {
    let tool = ScreenshotTool::detect(tools).ok_or_else(|| {
        SnapSenseError::ToolUnavailable(
            "Screenshot tool not found. Please install 'grim' and 'slurp' (for Wayland) or 'scrot' (for X11)."
                .to_string(),
        )
    })?;

    tokio::fs::create_dir_all(&config.output_dir).await?;
    let path = free_screenshot_path(&config.output_dir, chrono::Utc::now().timestamp()).await;
    log::info!("📸 Capturing with {:?} into {}", tool, path.display());

    match tool {
        ScreenshotTool::Wayland => {
            let selection = tools.run(&Invocation::new("slurp")).await?;
            let geometry = selection.stdout.trim();
            if !selection.success || geometry.is_empty() {
                return Err(SnapSenseError::CaptureError(
                    "region selection was cancelled".to_string(),
                ));
            }
            let invocation = Invocation::new("grim")
                .args(["-g", geometry])
                .arg(path.to_string_lossy());
            run_capture(tools, &invocation).await?;
        }
        ScreenshotTool::X11 => {
            let invocation = Invocation::new("scrot").arg("-s").arg(path.to_string_lossy());
            run_capture(tools, &invocation).await?;
        }
    }

    if wait_for_file(&path, config.timeout, config.poll_interval).await {
        Ok(path)
    } else {
        Err(SnapSenseError::CaptureError(format!(
            "Screenshot failed or was cancelled. File not created at {}",
            path.display()
        )))
    }
}

async fn run_capture<T: Toolbox + ?Sized>(tools: &T, invocation: &Invocation) -> Result<()> {
    let output = tools.run(invocation).await?;
    if output.success {
        Ok(())
    } else {
        Err(SnapSenseError::CaptureError(format!(
            "`{}` failed with {}",
            invocation.program,
            output.describe_status()
        )))
    }
}

/// Polls until `path` exists with non-zero size, or `timeout` passes.
pub async fn wait_for_file(path: &Path, timeout: Duration, interval: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if is_nonempty_file(path).await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(interval).await;
    }
}

async fn is_nonempty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}
