//! Chat-completion client for the docuflow platform.
//!
//! Defines the `ChatClient` trait the flow engine and renderer speak to,
//! an Azure-OpenAI-compatible implementation over reqwest, and a scripted
//! mock for tests.

pub mod azure;
pub mod client;
pub mod mock;

pub use azure::AzureChatClient;
pub use client::{ChatClient, ChatMessage, ChatRequest, Role};
pub use mock::MockChatClient;
