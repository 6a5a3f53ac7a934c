use std::env;

use crate::error::{Result, SnapSenseError};
use crate::tools::{CapabilityProbe, Invocation, Toolbox};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardTool {
    WlCopy,
    Xclip,
    Xsel,
    Pbcopy,
}

impl ClipboardTool {
    pub fn program(&self) -> &'static str {
        match self {
            ClipboardTool::WlCopy => "wl-copy",
            ClipboardTool::Xclip => "xclip",
            ClipboardTool::Xsel => "xsel",
            ClipboardTool::Pbcopy => "pbcopy",
        }
    }

    pub fn invocation(&self) -> Invocation {
        let invocation = Invocation::new(self.program());
        match self {
            ClipboardTool::Xclip => invocation.args(["-selection", "clipboard"]),
            ClipboardTool::Xsel => invocation.args(["--clipboard", "--input"]),
            ClipboardTool::WlCopy | ClipboardTool::Pbcopy => invocation,
        }
    }

    /// First available tool, `wl-copy` first in a Wayland session.
    pub fn detect<P: CapabilityProbe + ?Sized>(probe: &P, wayland_session: bool) -> Option<Self> {
        let order: &[ClipboardTool] = if wayland_session {
            &[Self::WlCopy, Self::Xclip, Self::Xsel, Self::Pbcopy]
        } else {
            &[Self::Xclip, Self::Xsel, Self::WlCopy, Self::Pbcopy]
        };
        order
            .iter()
            .copied()
            .find(|tool| probe.is_available(tool.program()))
    }
}

pub fn is_wayland_session() -> bool {
    env::var_os("WAYLAND_DISPLAY").is_some()
}

pub async fn copy_text<T: Toolbox + ?Sized>(tools: &T, text: &str) -> Result<ClipboardTool> {
    let tool = ClipboardTool::detect(tools, is_wayland_session()).ok_or_else(|| {
        SnapSenseError::ToolUnavailable(
            "Clipboard tool not found. Please install 'wl-clipboard', 'xclip' or 'xsel'."
                .to_string(),
        )
    })?;

    let output = tools.run_with_input(&tool.invocation(), text).await?;
    if output.success {
        Ok(tool)
    } else {
        Err(SnapSenseError::CommandError(format!(
            "`{}` failed with {}",
            tool.program(),
            output.describe_status()
        )))
    }
}
