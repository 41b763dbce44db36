//! Render state of the chat widget.
//!
//! [`ChatView`] stands in for the page: it owns the input field value, the
//! ordered message container and its scroll position. Every mutation is
//! also published as a [`ViewEvent`] so a front-end can render incrementally.

use chrono::Utc;
use tokio::sync::broadcast;

use super::message::{Message, MessageId, Sender};

/// Capacity of the view event channel. Slow renderers drop old events.
const EVENT_CAPACITY: usize = 256;

/// A mutation of the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// A message was appended to the container.
    Appended(Message),
    /// A message was removed from the container.
    Removed(Message),
    /// A notice was raised (the page would show an alert).
    Notice(String),
}

/// Ordered message container plus input field.
#[derive(Debug)]
pub struct ChatView {
    input: String,
    messages: Vec<Message>,
    scroll_top: usize,
    notices: Vec<String>,
    next_id: u64,
    events: broadcast::Sender<ViewEvent>,
}

impl Default for ChatView {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatView {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            input: String::new(),
            messages: Vec::new(),
            scroll_top: 0,
            notices: Vec::new(),
            next_id: 0,
            events,
        }
    }

    /// Subscribe to future view mutations.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Input field
    // ─────────────────────────────────────────────────────────────────────────

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, value: impl Into<String>) {
        self.input = value.into();
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Message container
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a message and keep the newest one visible.
    pub fn append(&mut self, sender: Sender, text: impl Into<String>) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;

        let message = Message {
            id,
            sender,
            text: text.into(),
            sent_at: Utc::now(),
        };
        self.messages.push(message.clone());
        self.scroll_to_bottom();
        self.publish(ViewEvent::Appended(message));
        id
    }

    /// Remove whatever message is currently last.
    pub fn remove_last(&mut self) -> Option<Message> {
        let removed = self.messages.pop()?;
        self.clamp_scroll();
        self.publish(ViewEvent::Removed(removed.clone()));
        Some(removed)
    }

    /// Remove the message with the given id, if it is still present.
    pub fn remove(&mut self, id: MessageId) -> Option<Message> {
        let pos = self.messages.iter().position(|m| m.id == id)?;
        let removed = self.messages.remove(pos);
        self.clamp_scroll();
        self.publish(ViewEvent::Removed(removed.clone()));
        Some(removed)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scrolling
    // ─────────────────────────────────────────────────────────────────────────

    /// Total rows of content in the container.
    pub fn scroll_height(&self) -> usize {
        self.messages.iter().map(Message::height).sum()
    }

    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_top = self.scroll_height();
    }

    pub fn is_scrolled_to_bottom(&self) -> bool {
        self.scroll_top == self.scroll_height()
    }

    fn clamp_scroll(&mut self) {
        self.scroll_top = self.scroll_top.min(self.scroll_height());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notices
    // ─────────────────────────────────────────────────────────────────────────

    /// Raise an informational notice.
    pub fn notify(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.notices.push(text.clone());
        self.publish(ViewEvent::Notice(text));
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    fn publish(&self, event: ViewEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_increasing_ids() {
        let mut view = ChatView::new();
        let a = view.append(Sender::User, "a");
        let b = view.append(Sender::Ai, "b");
        assert!(a < b);
        assert_eq!(view.len(), 2);
        assert_eq!(view.last().map(|m| m.id), Some(b));
    }

    #[test]
    fn test_append_scrolls_to_bottom() {
        let mut view = ChatView::new();
        view.append(Sender::User, "one");
        view.scroll_top = 0;
        assert!(!view.is_scrolled_to_bottom());

        view.append(Sender::Ai, "two\nthree");
        assert_eq!(view.scroll_height(), 3);
        assert_eq!(view.scroll_top(), 3);
        assert!(view.is_scrolled_to_bottom());
    }

    #[test]
    fn test_remove_last() {
        let mut view = ChatView::new();
        view.append(Sender::User, "hello");
        view.append(Sender::Ai, "Thinking...");

        let removed = view.remove_last().unwrap();
        assert_eq!(removed.text, "Thinking...");
        assert_eq!(view.len(), 1);
        assert!(view.is_scrolled_to_bottom());
    }

    #[test]
    fn test_remove_last_on_empty_view() {
        let mut view = ChatView::new();
        assert!(view.remove_last().is_none());
    }

    #[test]
    fn test_remove_by_id_keeps_order() {
        let mut view = ChatView::new();
        let first = view.append(Sender::Ai, "first");
        view.append(Sender::Ai, "second");
        view.append(Sender::Ai, "third");

        view.remove(first).unwrap();
        let texts: Vec<_> = view.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["second", "third"]);

        // Already removed
        assert!(view.remove(first).is_none());
    }

    #[test]
    fn test_input_field() {
        let mut view = ChatView::new();
        view.set_input("  hi  ");
        assert_eq!(view.input(), "  hi  ");
        view.clear_input();
        assert_eq!(view.input(), "");
    }

    #[test]
    fn test_events_are_published() {
        let mut view = ChatView::new();
        let mut rx = view.subscribe();

        let id = view.append(Sender::User, "hello");
        view.notify("notice");
        view.remove(id);

        assert!(matches!(rx.try_recv(), Ok(ViewEvent::Appended(m)) if m.text == "hello"));
        assert_eq!(rx.try_recv().ok(), Some(ViewEvent::Notice("notice".to_string())));
        assert!(matches!(rx.try_recv(), Ok(ViewEvent::Removed(m)) if m.id == id));
        assert!(rx.try_recv().is_err());
    }
}
