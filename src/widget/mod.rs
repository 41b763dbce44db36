//! Chat widget.
//!
//! The widget is split the way the page is: a [`ChatView`] holding render
//! state, a [`ChatTransport`] doing the network step, and a [`ChatController`]
//! driving both in response to key presses.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use gemini_chat::widget::{ChatController, HttpTransport, Key};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new("http://127.0.0.1:5000", Duration::from_secs(90))?;
//! let controller = ChatController::new(Arc::new(transport));
//! controller.set_input("Hello!");
//! controller.handle_key_press(Key::Enter).await;
//!
//! for message in controller.messages() {
//!     println!("{}: {}", message.sender, message.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod keys;
pub mod message;
pub mod transport;
pub mod view;

pub use controller::{
    ChatController, FALLBACK_ERROR, PLACEHOLDER_TEXT, PROFILE_NOTICE, PendingSend,
    PlaceholderRemoval, SendOutcome, TEST_GREETING,
};
pub use keys::Key;
pub use message::{Message, MessageId, Sender};
pub use transport::{CHAT_PATH, ChatTransport, HttpTransport, TransportError};
pub use view::{ChatView, ViewEvent};
