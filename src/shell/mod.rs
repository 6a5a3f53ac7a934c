//! Line-oriented interactive front end.
//!
//! One event loop owns [`ShellState`]. User input arrives from a dedicated stdin
//! reader thread and caption results from background tasks, both as
//! [`ShellEvent`]s on the same queue, so state is only ever touched here.

pub mod actions;
pub mod command;
pub mod dispatch;
pub mod state;

use colored::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::Config;
use crate::error::Result;
use crate::models::{has_supported_extension, ImageReference, SUPPORTED_EXTENSIONS};
use crate::ollama::CaptionClient;
use crate::tools::{screenshot, Toolbox};

pub use actions::{Notice, NoticeLevel};
pub use command::{PromptChange, ShellCommand};
pub use dispatch::{CaptionJob, CaptionReady, ShellEvent};
pub use state::{CaptionState, ShellState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Shell {
    config: Config,
    client: CaptionClient,
    tools: Arc<dyn Toolbox>,
    state: ShellState,
    events_tx: UnboundedSender<ShellEvent>,
    events_rx: UnboundedReceiver<ShellEvent>,
}

impl Shell {
    pub fn new(config: Config, client: CaptionClient, tools: Arc<dyn Toolbox>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let state = ShellState::new(config.default_prompt.clone());
        Self {
            config,
            client,
            tools,
            state,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    /// Sender for injecting events, e.g. input from somewhere other than stdin.
    pub fn events(&self) -> UnboundedSender<ShellEvent> {
        self.events_tx.clone()
    }

    /// Reads commands from stdin until `quit` or end of input.
    pub async fn run(mut self) -> Result<()> {
        spawn_stdin_reader(self.events_tx.clone())?;
        println!("{}", "📸 SnapSense: Image to Speech".bold());
        println!("Type `help` for commands.");
        print_prompt();

        while let Some(event) = self.next_event().await {
            if self.handle_event(event).await? == Flow::Exit {
                break;
            }
        }
        log::debug!("Shell loop finished");
        Ok(())
    }

    pub async fn next_event(&mut self) -> Option<ShellEvent> {
        self.events_rx.recv().await
    }

    pub async fn handle_event(&mut self, event: ShellEvent) -> Result<Flow> {
        match event {
            ShellEvent::Input(line) => {
                let flow = match ShellCommand::parse(&line) {
                    Ok(command) => self.execute(command).await?,
                    Err(e) => {
                        self.notify(&Notice::warning("Warning", e.to_string()));
                        Flow::Continue
                    }
                };
                if flow == Flow::Continue {
                    print_prompt();
                }
                Ok(flow)
            }
            ShellEvent::InputClosed => Ok(Flow::Exit),
            ShellEvent::CaptionReady(ready) => {
                self.apply_caption(ready);
                Ok(Flow::Continue)
            }
        }
    }

    pub async fn execute(&mut self, command: ShellCommand) -> Result<Flow> {
        match command {
            ShellCommand::Nothing => {}
            ShellCommand::Snap => self.snap().await,
            ShellCommand::Open(path) => {
                if has_supported_extension(&path) {
                    self.load_image(path);
                } else {
                    self.notify(&Notice::warning(
                        "Warning",
                        format!(
                            "Not an image file: {} (expected {})",
                            path.display(),
                            SUPPORTED_EXTENSIONS.join(", ")
                        ),
                    ));
                }
            }
            ShellCommand::Again => match self.state.image().map(PathBuf::from) {
                Some(path) => self.load_image(path),
                None => self.notify(&Notice::warning("Warning", "No image loaded yet.")),
            },
            ShellCommand::Prompt(change) => {
                match change {
                    PromptChange::Show => {}
                    PromptChange::Set(text) => self.state.set_prompt(text),
                    PromptChange::Reset => self.state.reset_prompt(),
                }
                println!("Prompt: {}", self.state.prompt());
            }
            ShellCommand::Speak => {
                let notice = actions::speak(&self.state, &*self.tools, &self.config.speech);
                self.notify(&notice);
            }
            ShellCommand::Copy => {
                let notice = actions::copy(&self.state, &*self.tools).await;
                self.notify(&notice);
            }
            ShellCommand::Save(target) => {
                let notice = actions::save(&self.state, target);
                self.notify(&notice);
            }
            ShellCommand::Show => self.show(),
            ShellCommand::Help => println!("{}", command::HELP_TEXT),
            ShellCommand::Quit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    async fn snap(&mut self) {
        match screenshot::capture(&*self.tools, &self.config.capture).await {
            Ok(path) => self.load_image(path),
            Err(e) => {
                log::warn!("Screenshot failed: {}", e);
                self.notify(&Notice::error("Error", e.to_string()));
            }
        }
    }

    /// Validates and previews the image, then starts a caption request for it.
    fn load_image(&mut self, path: PathBuf) {
        let image = match ImageReference::open(&path) {
            Ok(image) => image,
            Err(e) => {
                self.state.reject_image(e);
                self.print_caption();
                return;
            }
        };

        match image.preview(self.config.preview) {
            Ok(preview) => println!(
                "🖼  {} ({}x{}, preview {}x{})",
                image.path().display(),
                preview.width,
                preview.height,
                preview.fit_width,
                preview.fit_height
            ),
            Err(e) => {
                log::warn!("Could not read image header of {}: {}", path.display(), e);
                println!("🖼  {}", image.path().display());
            }
        }

        let generation = self.state.begin_generation(path.clone());
        self.print_caption();

        let job = CaptionJob {
            generation,
            image: path,
            prompt: self.state.effective_prompt().to_string(),
        };
        dispatch::dispatch_caption(self.client.clone(), job, self.events_tx.clone());
    }

    fn apply_caption(&mut self, ready: CaptionReady) {
        if self.state.apply_result(ready.generation, ready.result) {
            self.print_caption();
            print_prompt();
        } else {
            log::debug!(
                "Dropping caption {} for {}, superseded",
                ready.generation,
                ready.image.display()
            );
        }
    }

    fn show(&self) {
        match self.state.image() {
            Some(path) => println!("Image:   {}", path.display()),
            None => println!("Image:   (none)"),
        }
        println!("Prompt:  {}", self.state.prompt());
        self.print_caption();
    }

    fn print_caption(&self) {
        let caption = self.state.caption();
        let text = caption.display_text();
        let styled = match caption {
            CaptionState::Ready(_) => text.white().bold(),
            CaptionState::Failed(_) => text.red(),
            _ => text.bright_black(),
        };
        println!("{} {}", "Caption:".bold(), styled);
    }

    fn notify(&self, notice: &Notice) {
        println!("{}", notice.render());
    }
}

fn print_prompt() {
    print!("{} ", "snapsense>".cyan());
    let _ = io::stdout().flush();
}

/// Blocking stdin reads live on their own thread; lines are posted as events.
fn spawn_stdin_reader(events: UnboundedSender<ShellEvent>) -> Result<()> {
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if events.send(ShellEvent::Input(line)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        log::warn!("Could not read input: {}", e);
                        break;
                    }
                }
            }
            let _ = events.send(ShellEvent::InputClosed);
        })?;
    Ok(())
}
