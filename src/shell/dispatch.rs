use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::error::CaptionError;
use crate::models::CaptionResult;
use crate::ollama::CaptionClient;

/// Everything the event loop reacts to.
#[derive(Debug)]
pub enum ShellEvent {
    Input(String),
    InputClosed,
    CaptionReady(CaptionReady),
}

#[derive(Debug)]
pub struct CaptionReady {
    pub generation: u64,
    pub image: PathBuf,
    pub result: CaptionResult,
}

#[derive(Debug, Clone)]
pub struct CaptionJob {
    pub generation: u64,
    pub image: PathBuf,
    pub prompt: String,
}

/// Runs one caption request off the event loop and posts exactly one
/// `CaptionReady` back to it. The task is detached; nothing cancels it.
pub fn dispatch_caption(
    client: CaptionClient,
    job: CaptionJob,
    events: UnboundedSender<ShellEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let CaptionJob {
            generation,
            image,
            prompt,
        } = job;

        let worker_image = image.clone();
        let worker = tokio::spawn(async move { client.retrieve(&worker_image, &prompt).await });
        let result = match worker.await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Caption worker for {} died: {}", image.display(), e);
                Err(CaptionError::Unexpected(e.to_string()))
            }
        };

        let ready = CaptionReady {
            generation,
            image,
            result,
        };
        if events.send(ShellEvent::CaptionReady(ready)).is_err() {
            log::debug!("Shell closed before caption {} landed", generation);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn posts_one_result_with_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = CaptionClient::new(Client::new(), "http://127.0.0.1:9/api/generate", "moondream");
        let job = CaptionJob {
            generation: 7,
            image: PathBuf::from("/nowhere/missing.png"),
            prompt: "Describe".into(),
        };

        dispatch_caption(client, job, tx).await.unwrap();

        match rx.recv().await {
            Some(ShellEvent::CaptionReady(ready)) => {
                assert_eq!(ready.generation, 7);
                assert_eq!(ready.image, PathBuf::from("/nowhere/missing.png"));
                assert_eq!(
                    ready.result,
                    Err(CaptionError::InvalidImage("/nowhere/missing.png".into()))
                );
            }
            other => panic!("unexpected event: {:?}", other),
        }
        // The sender was moved into the task, so the channel is now closed.
        assert!(rx.recv().await.is_none());
    }
}
