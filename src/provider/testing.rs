// src/provider/testing.rs — Scripted provider for unit tests

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::catalog::Backend;
use super::gateway::ModelGateway;
use super::retry::RetryConfig;
use super::{ChatRequest, ChatResponse, ModelProvider, StopReason, TokenUsage};
use crate::infra::errors::DevflowError;

type Responder = dyn Fn(&ChatRequest) -> String + Send + Sync;

/// Answers every request through a closure and keeps a copy of each request.
pub(crate) struct ScriptedProvider {
    respond: Box<Responder>,
    pub calls: AtomicU64,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(respond: impl Fn(&ChatRequest) -> String + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            calls: AtomicU64::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn fixed(answer: &str) -> Arc<Self> {
        let answer = answer.to_string();
        Self::new(move |_| answer.clone())
    }

    pub fn last_request(&self) -> ChatRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    fn name(&self) -> &str {
        "Scripted"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, DevflowError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = (self.respond)(&request);
        self.requests.lock().unwrap().push(request);
        Ok(ChatResponse {
            content,
            usage: TokenUsage::new(100, 50),
            stop_reason: StopReason::EndTurn,
        })
    }
}

/// OpenAI-backed gateway over `provider`, no retry delay.
pub(crate) fn gateway_over(provider: Arc<ScriptedProvider>) -> Arc<ModelGateway> {
    Arc::new(ModelGateway::new(RetryConfig::immediate(0)).with_provider(Backend::OpenAI, provider))
}
