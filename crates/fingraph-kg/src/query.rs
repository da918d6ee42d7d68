//! Conversational question answering over the cached triplets

use crate::invoke::{invoke, ModelCall};
use crate::prompts::query_prompt;
use crate::store::GraphStore;
use fingraph_core::{ConversationTurn, Error, Result, Role, Stage};
use fingraph_llm::{LlmMessage, LlmProvider};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub struct QueryEngine {
    provider: Arc<dyn LlmProvider>,
    call: ModelCall,
    /// One query at a time, so each sees the previous exchange.
    serial: Mutex<()>,
}

impl QueryEngine {
    pub fn new(provider: Arc<dyn LlmProvider>, call: ModelCall) -> Self {
        Self {
            provider,
            call,
            serial: Mutex::new(()),
        }
    }

    pub async fn answer(&self, store: &GraphStore, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("query is empty".into()));
        }

        let _serial = self.serial.lock().await;
        let ctx = store.query_context().await?;

        let mut messages = Vec::with_capacity(ctx.conversation.len() + 2);
        messages.push(LlmMessage::system(query_prompt(&ctx.triplets)));
        messages.extend(ctx.conversation.iter().map(|turn| match turn.role {
            Role::User => LlmMessage::user(&turn.content),
            Role::Assistant => LlmMessage::assistant(&turn.content),
        }));
        messages.push(LlmMessage::user(query));

        debug!("Query with {} prior turns", ctx.conversation.len());
        let answer = invoke(&self.provider, Stage::Query, &self.call, messages).await?;

        let appended = store
            .append_exchange(
                ctx.generation,
                ConversationTurn::user(query),
                ConversationTurn::assistant(&answer),
            )
            .await;
        if !appended {
            info!("Graph replaced during query; answer not added to the new conversation");
        }

        Ok(answer)
    }
}
