//! Chat UI controller.
//!
//! Ties the three steps of a send together: capture the input, render the
//! user message and a placeholder, then await the server and replace the
//! placeholder with the answer or an error line.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::config::WidgetConfig;
use crate::protocol::ChatRequest;

use super::keys::Key;
use super::message::{Message, MessageId, Sender};
use super::transport::{ChatTransport, HttpTransport, TransportError};
use super::view::{ChatView, ViewEvent};

/// Text of the placeholder shown while a request is in flight.
pub const PLACEHOLDER_TEXT: &str = "Thinking...";

/// Rendered when the request itself fails.
pub const FALLBACK_ERROR: &str = "Sorry, there was an error processing your request.";

/// Input used by [`ChatController::test_gemini_api`].
pub const TEST_GREETING: &str = "Hello! Can you introduce yourself?";

/// Notice raised by [`ChatController::show_profile`].
pub const PROFILE_NOTICE: &str = "Profile information is displayed in the sidebar!";

/// How a finished send removes its placeholder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderRemoval {
    /// Remove the placeholder this send created.
    #[default]
    #[serde(alias = "by-request")]
    ByRequest,
    /// Remove whatever message is last. Overlapping sends can remove each
    /// other's placeholders or replies.
    #[serde(alias = "last-child")]
    LastChild,
}

impl PlaceholderRemoval {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ByRequest => "by_request",
            Self::LastChild => "last_child",
        }
    }
}

/// What a call to [`ChatController::send_message`] rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Input was empty after trimming; nothing happened.
    Ignored,
    /// The server answered.
    Answered(String),
    /// The server reported an error.
    ServerError(String),
    /// The request failed before an envelope was read.
    TransportFailed(String),
}

impl SendOutcome {
    /// Text of the final assistant message, if one was rendered.
    #[must_use]
    pub fn rendered_text(&self) -> Option<String> {
        match self {
            Self::Ignored => None,
            Self::Answered(text) => Some(text.clone()),
            Self::ServerError(error) => Some(format!("Error: {error}")),
            Self::TransportFailed(_) => Some(FALLBACK_ERROR.to_string()),
        }
    }
}

/// A send whose user message and placeholder are rendered but whose request
/// has not been made yet.
#[derive(Debug)]
#[must_use = "a pending send leaves its placeholder on screen until completed"]
pub struct PendingSend {
    send_id: Uuid,
    message: String,
    placeholder: MessageId,
}

impl PendingSend {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn placeholder(&self) -> MessageId {
        self.placeholder
    }
}

/// Chat UI controller.
///
/// Cheap to clone; clones share the same view and transport, so a front-end
/// can run each send on its own task.
#[derive(Clone)]
pub struct ChatController {
    view: Arc<Mutex<ChatView>>,
    transport: Arc<dyn ChatTransport>,
    removal: PlaceholderRemoval,
}

impl std::fmt::Debug for ChatController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatController")
            .field("view", &self.view)
            .field("removal", &self.removal)
            .finish_non_exhaustive()
    }
}

impl ChatController {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            view: Arc::new(Mutex::new(ChatView::new())),
            transport,
            removal: PlaceholderRemoval::default(),
        }
    }

    /// Controller talking HTTP to the configured server.
    pub fn from_config(config: &WidgetConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.server_url, config.timeout())?;
        Ok(Self::new(Arc::new(transport)).with_placeholder_removal(config.placeholder_removal))
    }

    #[must_use]
    pub fn with_placeholder_removal(mut self, removal: PlaceholderRemoval) -> Self {
        self.removal = removal;
        self
    }

    pub fn placeholder_removal(&self) -> PlaceholderRemoval {
        self.removal
    }

    fn lock(&self) -> MutexGuard<'_, ChatView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the current view state.
    pub fn with_view<R>(&self, f: impl FnOnce(&ChatView) -> R) -> R {
        f(&self.lock())
    }

    /// Copy of the message container.
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages().to_vec()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.lock().subscribe()
    }

    pub fn set_input(&self, value: impl Into<String>) {
        self.lock().set_input(value);
    }

    pub fn input(&self) -> String {
        self.lock().input().to_string()
    }

    /// Append a message for `sender` and scroll to the bottom.
    pub fn add_message_to_chat(&self, sender: Sender, message: impl Into<String>) -> MessageId {
        self.lock().append(sender, message)
    }

    /// Send the current input to the server.
    ///
    /// Appends the user message and a placeholder, clears the input, awaits the
    /// transport, then swaps the placeholder for the answer. Every non-empty
    /// send removes exactly one placeholder and appends exactly one reply.
    pub async fn send_message(&self) -> SendOutcome {
        match self.start_send() {
            Some(pending) => self.complete_send(pending).await,
            None => SendOutcome::Ignored,
        }
    }

    /// Synchronous half of [`send_message`](Self::send_message): capture the
    /// input and render the user message plus placeholder.
    ///
    /// Returns `None` when the input is blank. Front-ends that run sends on
    /// their own tasks call this first so the input is captured in order.
    pub fn start_send(&self) -> Option<PendingSend> {
        Self::begin_send(&mut self.lock())
    }

    fn begin_send(view: &mut ChatView) -> Option<PendingSend> {
        let message = view.input().trim().to_string();
        if message.is_empty() {
            return None;
        }
        view.append(Sender::User, message.clone());
        view.clear_input();
        let placeholder = view.append(Sender::Ai, PLACEHOLDER_TEXT);

        Some(PendingSend {
            send_id: Uuid::new_v4(),
            message,
            placeholder,
        })
    }

    /// Network half of [`send_message`](Self::send_message).
    pub async fn complete_send(&self, pending: PendingSend) -> SendOutcome {
        let PendingSend {
            send_id,
            message,
            placeholder,
        } = pending;

        debug!(
            send_id = %send_id,
            placeholder = %placeholder,
            message_length = message.len(),
            "Sending chat message"
        );

        let outcome = match self.transport.send(&ChatRequest::new(message)).await {
            Ok(envelope) => match envelope.into_result() {
                Ok(text) => SendOutcome::Answered(text),
                Err(err) => {
                    warn!(send_id = %send_id, error = %err, "Server reported an error");
                    SendOutcome::ServerError(err)
                }
            },
            Err(e) => {
                error!(send_id = %send_id, error = %e, "Chat request failed");
                SendOutcome::TransportFailed(e.to_string())
            }
        };

        let mut view = self.lock();
        self.remove_placeholder(&mut view, placeholder, send_id);
        if let Some(text) = outcome.rendered_text() {
            view.append(Sender::Ai, text);
        }
        outcome
    }

    fn remove_placeholder(&self, view: &mut ChatView, placeholder: MessageId, send_id: Uuid) {
        let removed = match self.removal {
            PlaceholderRemoval::ByRequest => view.remove(placeholder),
            PlaceholderRemoval::LastChild => view.remove_last(),
        };
        if removed.is_none() {
            warn!(send_id = %send_id, placeholder = %placeholder, "Placeholder already gone");
        }
    }

    /// Enter sends; every other key is ignored.
    pub async fn handle_key_press(&self, key: impl Into<Key>) -> Option<SendOutcome> {
        match key.into() {
            Key::Enter => Some(self.send_message().await),
            _ => None,
        }
    }

    /// Smoke test: send a fixed greeting.
    pub async fn test_gemini_api(&self) -> SendOutcome {
        match self.start_test_gemini_api() {
            Some(pending) => self.complete_send(pending).await,
            None => SendOutcome::Ignored,
        }
    }

    /// Synchronous half of [`test_gemini_api`](Self::test_gemini_api): type
    /// the greeting and start sending it.
    pub fn start_test_gemini_api(&self) -> Option<PendingSend> {
        let mut view = self.lock();
        view.set_input(TEST_GREETING);
        Self::begin_send(&mut view)
    }

    pub fn show_profile(&self) {
        self.lock().notify(PROFILE_NOTICE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ChatResponse;
    use std::collections::{HashMap, VecDeque};
    use tokio::sync::oneshot;

    type Reply = Result<ChatResponse, TransportError>;

    /// Answers requests in order from a script and records what was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Reply>>,
        sent: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().collect()),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
            self.sent.lock().unwrap().push(request.message.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request")
        }
    }

    /// Holds each request until the test releases it.
    struct GatedTransport {
        gates: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
    }

    #[async_trait::async_trait]
    impl ChatTransport for GatedTransport {
        async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
            let gate = self
                .gates
                .lock()
                .unwrap()
                .remove(&request.message)
                .expect("no gate for message");
            gate.await.expect("gate dropped")
        }
    }

    fn status_error() -> TransportError {
        TransportError::Status {
            status: 502,
            body: "Bad Gateway".to_string(),
        }
    }

    fn rendered(controller: &ChatController) -> Vec<(Sender, String)> {
        controller
            .messages()
            .into_iter()
            .map(|m| (m.sender, m.text))
            .collect()
    }

    async fn wait_for_messages(controller: &ChatController, count: usize) {
        for _ in 0..100 {
            if controller.messages().len() == count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("view never reached {count} messages");
    }

    #[tokio::test]
    async fn test_success_replaces_placeholder() {
        let transport = ScriptedTransport::new([Ok(ChatResponse::success("Hi"))]);
        let controller = ChatController::new(transport.clone());

        controller.set_input("  Hello  ");
        let outcome = controller.send_message().await;

        assert_eq!(outcome, SendOutcome::Answered("Hi".to_string()));
        assert_eq!(transport.sent(), ["Hello"]);
        assert_eq!(
            rendered(&controller),
            [(Sender::User, "Hello".to_string()), (Sender::Ai, "Hi".to_string())]
        );
        assert_eq!(controller.input(), "");
    }

    #[tokio::test]
    async fn test_server_error_is_prefixed() {
        let transport = ScriptedTransport::new([Ok(ChatResponse::error("bad key"))]);
        let controller = ChatController::new(transport);

        controller.set_input("Hello");
        let outcome = controller.send_message().await;

        assert_eq!(outcome, SendOutcome::ServerError("bad key".to_string()));
        let last = controller.messages().pop().unwrap();
        assert_eq!(last.sender, Sender::Ai);
        assert_eq!(last.text, "Error: bad key");
    }

    #[tokio::test]
    async fn test_transport_failure_renders_fallback_once() {
        let transport = ScriptedTransport::new([Err(status_error())]);
        let controller = ChatController::new(transport);
        let mut events = controller.subscribe();

        controller.set_input("Hello");
        let outcome = controller.send_message().await;

        assert!(matches!(outcome, SendOutcome::TransportFailed(_)));
        assert_eq!(
            rendered(&controller),
            [
                (Sender::User, "Hello".to_string()),
                (Sender::Ai, FALLBACK_ERROR.to_string())
            ]
        );

        let mut removed = 0;
        while let Ok(event) = events.try_recv() {
            if let ViewEvent::Removed(m) = event {
                assert_eq!(m.text, PLACEHOLDER_TEXT);
                removed += 1;
            }
        }
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let transport = ScriptedTransport::new([]);
        let controller = ChatController::new(transport.clone());
        let mut events = controller.subscribe();

        for input in ["", "   ", "\n\t "] {
            controller.set_input(input);
            assert_eq!(controller.send_message().await, SendOutcome::Ignored);
            assert_eq!(controller.input(), input);
        }

        assert!(controller.messages().is_empty());
        assert!(transport.sent().is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_placeholder_shown_while_in_flight() {
        let (tx, rx) = oneshot::channel();
        let transport = Arc::new(GatedTransport {
            gates: Mutex::new(HashMap::from([("Hello".to_string(), rx)])),
        });
        let controller = ChatController::new(transport);

        controller.set_input("Hello");
        let task = tokio::spawn({
            let controller = controller.clone();
            async move { controller.send_message().await }
        });
        wait_for_messages(&controller, 2).await;

        assert_eq!(
            rendered(&controller),
            [
                (Sender::User, "Hello".to_string()),
                (Sender::Ai, PLACEHOLDER_TEXT.to_string())
            ]
        );
        assert_eq!(controller.input(), "");

        tx.send(Ok(ChatResponse::success("Hi"))).unwrap();
        task.await.unwrap();
        assert_eq!(controller.messages().len(), 2);
        assert_eq!(controller.messages()[1].text, "Hi");
    }

    /// Sends "first" then "second", resolves "second" first.
    async fn overlapping_sends(removal: PlaceholderRemoval) -> Vec<(Sender, String)> {
        let (tx_first, rx_first) = oneshot::channel();
        let (tx_second, rx_second) = oneshot::channel();
        let transport = Arc::new(GatedTransport {
            gates: Mutex::new(HashMap::from([
                ("first".to_string(), rx_first),
                ("second".to_string(), rx_second),
            ])),
        });
        let controller = ChatController::new(transport).with_placeholder_removal(removal);

        controller.set_input("first");
        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.send_message().await }
        });
        wait_for_messages(&controller, 2).await;

        controller.set_input("second");
        let second = tokio::spawn({
            let controller = controller.clone();
            async move { controller.send_message().await }
        });
        wait_for_messages(&controller, 4).await;

        tx_second.send(Ok(ChatResponse::success("reply two"))).unwrap();
        second.await.unwrap();
        tx_first.send(Ok(ChatResponse::success("reply one"))).unwrap();
        first.await.unwrap();

        rendered(&controller)
    }

    #[tokio::test]
    async fn test_overlapping_sends_remove_own_placeholder() {
        let view = overlapping_sends(PlaceholderRemoval::ByRequest).await;
        assert_eq!(
            view,
            [
                (Sender::User, "first".to_string()),
                (Sender::User, "second".to_string()),
                (Sender::Ai, "reply two".to_string()),
                (Sender::Ai, "reply one".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_overlapping_sends_last_child_race() {
        // "reply two" removes the second placeholder, then "reply one" removes
        // "reply two" and leaves the first placeholder behind.
        let view = overlapping_sends(PlaceholderRemoval::LastChild).await;
        assert_eq!(
            view,
            [
                (Sender::User, "first".to_string()),
                (Sender::Ai, PLACEHOLDER_TEXT.to_string()),
                (Sender::User, "second".to_string()),
                (Sender::Ai, "reply one".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_enter_key_sends() {
        let transport = ScriptedTransport::new([Ok(ChatResponse::success("Hi"))]);
        let controller = ChatController::new(transport.clone());

        controller.set_input("Hello");
        let outcome = controller.handle_key_press("Enter").await;

        assert_eq!(outcome, Some(SendOutcome::Answered("Hi".to_string())));
        assert_eq!(transport.sent(), ["Hello"]);
    }

    #[tokio::test]
    async fn test_other_keys_do_nothing() {
        let transport = ScriptedTransport::new([]);
        let controller = ChatController::new(transport.clone());

        controller.set_input("Hello");
        assert_eq!(controller.handle_key_press("a").await, None);
        assert_eq!(controller.handle_key_press("Escape").await, None);
        assert_eq!(controller.handle_key_press(Key::Character('\t')).await, None);

        assert!(controller.messages().is_empty());
        assert!(transport.sent().is_empty());
        assert_eq!(controller.input(), "Hello");
    }

    #[tokio::test]
    async fn test_gemini_smoke_test_sends_greeting() {
        let transport = ScriptedTransport::new([Ok(ChatResponse::success("I am Gemini."))]);
        let controller = ChatController::new(transport.clone());

        controller.test_gemini_api().await;

        assert_eq!(transport.sent(), [TEST_GREETING]);
        assert_eq!(controller.messages()[0].text, TEST_GREETING);
        assert_eq!(controller.messages()[1].text, "I am Gemini.");
    }

    #[tokio::test]
    async fn test_controller_usable_after_failure() {
        let transport = ScriptedTransport::new([
            Err(status_error()),
            Ok(ChatResponse::success("back online")),
        ]);
        let controller = ChatController::new(transport);

        controller.set_input("one");
        controller.send_message().await;
        controller.set_input("two");
        let outcome = controller.send_message().await;

        assert_eq!(outcome, SendOutcome::Answered("back online".to_string()));
        assert_eq!(controller.messages().len(), 4);
    }

    #[tokio::test]
    async fn test_start_send_captures_input_in_order() {
        let transport = ScriptedTransport::new([
            Ok(ChatResponse::success("one")),
            Ok(ChatResponse::success("two")),
        ]);
        let controller = ChatController::new(transport.clone());

        controller.set_input("first");
        let first = controller.start_send().unwrap();
        controller.set_input("second");
        let second = controller.start_send().unwrap();
        assert_eq!(first.message(), "first");
        assert_eq!(second.message(), "second");
        assert!(controller.start_send().is_none());

        controller.complete_send(second).await;
        controller.complete_send(first).await;

        assert_eq!(transport.sent(), ["second", "first"]);
        let texts: Vec<_> = controller.messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, ["first", "second", "one", "two"]);
    }

    #[tokio::test]
    async fn test_start_smoke_test_replaces_typed_input() {
        let transport = ScriptedTransport::new([Ok(ChatResponse::success("I am Gemini."))]);
        let controller = ChatController::new(transport.clone());

        controller.set_input("half typed");
        let pending = controller.start_test_gemini_api().unwrap();
        assert_eq!(pending.message(), TEST_GREETING);
        assert_eq!(controller.input(), "");

        controller.complete_send(pending).await;
        assert_eq!(transport.sent(), [TEST_GREETING]);
    }

    #[test]
    fn test_show_profile_raises_notice() {
        let controller = ChatController::new(ScriptedTransport::new([]));
        controller.show_profile();
        controller.with_view(|view| {
            assert_eq!(view.notices(), [PROFILE_NOTICE]);
            assert!(view.is_empty());
        });
    }

    #[test]
    fn test_add_message_scrolls_to_bottom() {
        let controller = ChatController::new(ScriptedTransport::new([]));
        controller.add_message_to_chat(Sender::User, "one");
        let id = controller.add_message_to_chat(Sender::Ai, "two\nlines");

        controller.with_view(|view| {
            assert_eq!(view.last().map(|m| m.id), Some(id));
            assert_eq!(view.last().map(Message::class_list).as_deref(), Some("chat-message ai-message"));
            assert!(view.is_scrolled_to_bottom());
            assert_eq!(view.scroll_top(), 3);
        });
    }

    #[test]
    fn test_placeholder_removal_names() {
        assert_eq!(PlaceholderRemoval::default(), PlaceholderRemoval::ByRequest);
        assert_eq!(PlaceholderRemoval::LastChild.as_str(), "last_child");
    }
}
