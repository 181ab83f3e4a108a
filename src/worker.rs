//! Background worker that talks to the completion backend.
//!
//! The worker is a named OS thread running a current-thread tokio runtime. It
//! is created once and lives as long as its [`AiWorker`] handle. The engine
//! thread hands it self-contained requests and waits on a per-request reply
//! channel with a deadline. The worker never sees the game state, only the text
//! of a prompt, and it sends back only text.

use crate::dispatcher::DispatchError;
use crate::llm_client::{ChatMessage, CompletionBackend, LlmError};
use citadel_rules::PlayerIndex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::mpsc::{RecvTimeoutError, SyncSender, sync_channel};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

/// Messages kept per player between requests.
pub const HISTORY_LIMIT: usize = 24;

/// One decision request.
#[derive(Debug)]
struct Request {
    player: PlayerIndex,
    prompt: String,
    deadline: Instant,
    reply: SyncSender<Result<String, LlmError>>,
}

/// Handle to the background worker.
#[derive(Debug)]
pub struct AiWorker {
    requests: mpsc::UnboundedSender<Request>,
}

impl AiWorker {
    /// Starts the worker thread.
    #[instrument(skip(backend, system_prompt), fields(backend = backend.name()))]
    pub fn spawn(
        backend: Arc<dyn CompletionBackend>,
        system_prompt: String,
    ) -> std::io::Result<Self> {
        let (requests, inbox) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("citadel-ai-worker".to_string())
            .spawn(move || run(backend, system_prompt, inbox))?;
        info!("AI worker started");
        Ok(Self { requests })
    }

    /// Sends `prompt` for `player` and blocks until a reply or `deadline`.
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub fn ask(
        &self,
        player: PlayerIndex,
        prompt: String,
        deadline: Instant,
    ) -> Result<String, DispatchError> {
        let (reply, response) = sync_channel(1);
        self.requests
            .send(Request {
                player,
                prompt,
                deadline,
                reply,
            })
            .map_err(|_| DispatchError::WorkerGone)?;

        let wait = deadline.saturating_duration_since(Instant::now());
        match response.recv_timeout(wait) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(DispatchError::Transport(e)),
            Err(RecvTimeoutError::Timeout) => Err(DispatchError::Timeout),
            Err(RecvTimeoutError::Disconnected) => {
                // The worker drops requests it could not serve before the deadline.
                if Instant::now() >= deadline {
                    Err(DispatchError::Timeout)
                } else {
                    Err(DispatchError::WorkerGone)
                }
            }
        }
    }
}

fn run(
    backend: Arc<dyn CompletionBackend>,
    system_prompt: String,
    mut inbox: mpsc::UnboundedReceiver<Request>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to build AI worker runtime");
            return;
        }
    };

    runtime.block_on(async move {
        let mut histories: HashMap<PlayerIndex, VecDeque<ChatMessage>> = HashMap::new();

        while let Some(request) = inbox.recv().await {
            if Instant::now() >= request.deadline {
                debug!(player = request.player, "Skipping expired request");
                continue;
            }

            let history = histories.entry(request.player).or_default();
            let mut messages = Vec::with_capacity(history.len() + 2);
            messages.push(ChatMessage::system(system_prompt.clone()));
            messages.extend(history.iter().cloned());
            messages.push(ChatMessage::user(request.prompt.clone()));

            let deadline = tokio::time::Instant::from_std(request.deadline);
            let result =
                match tokio::time::timeout_at(deadline, backend.complete(&messages)).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(player = request.player, "Completion exceeded its deadline");
                        continue;
                    }
                };

            match result {
                Ok(text) => match request.reply.try_send(Ok(text.clone())) {
                    Ok(()) => {
                        history.push_back(ChatMessage::user(request.prompt));
                        history.push_back(ChatMessage::assistant(text));
                        while history.len() > HISTORY_LIMIT {
                            history.pop_front();
                        }
                    }
                    Err(_) => debug!(player = request.player, "Discarding stale reply"),
                },
                Err(e) => {
                    let _ = request.reply.try_send(Err(e));
                }
            }
        }

        info!("AI worker stopped");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Echoes the number of messages it received.
    #[derive(Default)]
    struct Counting {
        seen: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl CompletionBackend for Counting {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(messages.len());
            Ok("end".to_string())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn test_history_is_per_player_and_bounded() {
        let backend = Arc::new(Counting::default());
        let worker = AiWorker::spawn(backend.clone(), "rules".to_string()).unwrap();
        let deadline = || Instant::now() + Duration::from_secs(5);

        for _ in 0..20 {
            assert_eq!(worker.ask(0, "turn".into(), deadline()).unwrap(), "end");
        }
        assert_eq!(worker.ask(1, "turn".into(), deadline()).unwrap(), "end");

        let seen = backend.seen.lock().unwrap().clone();
        assert_eq!(seen[0], 2);
        assert_eq!(seen[1], 4);
        assert_eq!(seen[19], HISTORY_LIMIT + 2);
        assert_eq!(seen[20], 2);
    }

    #[test]
    fn test_expired_request_times_out() {
        let worker = AiWorker::spawn(Arc::new(Counting::default()), String::new()).unwrap();
        let result = worker.ask(0, "late".into(), Instant::now());
        assert!(matches!(result, Err(DispatchError::Timeout)));
    }
}
