//! Scripted chat client for tests.
//!
//! Responses are queued ahead of time and returned in order; every request
//! is recorded so tests can assert on the prompts that were sent.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use docuflow_core::error::{DocuflowError, Result};

use crate::client::{ChatClient, ChatRequest};

/// A `ChatClient` that replays pre-scripted responses.
#[derive(Default)]
pub struct MockChatClient {
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct with an initial set of scripted responses.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for r in responses {
            client.push_response(r);
        }
        client
    }

    /// Queue one response to be returned by a future `complete` call.
    pub fn push_response(&self, response: impl Into<String>) {
        self.responses
            .lock()
            .expect("mock responses lock poisoned")
            .push_back(response.into());
    }

    /// All requests seen so far, in order.
    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .expect("mock requests lock poisoned")
            .clone()
    }

    /// Number of `complete` calls made.
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .expect("mock requests lock poisoned")
            .len()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        self.requests
            .lock()
            .expect("mock requests lock poisoned")
            .push(request);

        self.responses
            .lock()
            .expect("mock responses lock poisoned")
            .pop_front()
            .ok_or_else(|| DocuflowError::Llm("No scripted response queued".to_string()))
    }
}
