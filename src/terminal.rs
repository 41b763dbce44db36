//! Terminal front-end for the chat widget.
//!
//! Each stdin line is typed into the input field and submitted with Enter.
//! A renderer task prints view events as they happen, so replies show up
//! while further input is being typed.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::widget::{ChatController, PendingSend, Sender, ViewEvent};

/// Line commands understood by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Quit,
    TestGemini,
    Profile,
    Message(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "/quit" => Self::Quit,
            "/test" => Self::TestGemini,
            "/profile" => Self::Profile,
            _ => Self::Message(line.to_string()),
        }
    }
}

/// What the read loop does after a line.
#[derive(Debug)]
pub enum Step {
    Quit,
    Continue,
    /// A send was started; its network half still has to run.
    Send(PendingSend),
}

/// Apply one input line to the controller.
///
/// Runs on the reading task so input is captured in the order it was typed.
pub fn handle_line(controller: &ChatController, line: &str) -> Step {
    let pending = match Input::parse(line) {
        Input::Quit => return Step::Quit,
        Input::Profile => {
            controller.show_profile();
            return Step::Continue;
        }
        Input::TestGemini => controller.start_test_gemini_api(),
        Input::Message(text) => {
            controller.set_input(text);
            controller.start_send()
        }
    };
    pending.map_or(Step::Continue, Step::Send)
}

/// Render a view event as a terminal line. Removals are not shown.
pub fn format_event(event: &ViewEvent) -> Option<String> {
    match event {
        ViewEvent::Appended(message) => {
            let who = match message.sender {
                Sender::User => "you",
                Sender::Ai => "ai",
            };
            Some(format!("{who} › {}", message.text))
        }
        ViewEvent::Notice(text) => Some(format!("(i) {text}")),
        ViewEvent::Removed(_) => None,
    }
}

/// Run the read-eval-print loop until `/quit` or end of input.
pub async fn run(controller: ChatController) -> anyhow::Result<()> {
    let mut events = controller.subscribe();
    let renderer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = format_event(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Renderer fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    info!(name: "terminal.started", "Type a message, /test, /profile or /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        match handle_line(&controller, &line) {
            Step::Quit => break,
            Step::Continue => {}
            Step::Send(pending) => {
                let controller = controller.clone();
                in_flight.spawn(async move { controller.complete_send(pending).await });
            }
        }
    }

    // Let outstanding replies render before exiting
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Send task failed");
        }
    }

    // Closing the view ends the renderer once buffered events are printed
    drop(controller);
    renderer.await?;
    Ok(())
}
