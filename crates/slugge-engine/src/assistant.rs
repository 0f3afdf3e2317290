//! Streaming assistant sessions.
//!
//! A session consumes raw text frames and produces [`OutboundMessage`]s. For
//! each valid query it emits one `retrieval`, then the reply word by word as
//! `chunk`s, then one `done` carrying the simulated cost. Queries on one
//! session are handled strictly one after another, so frames never
//! interleave.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use slugge_core::protocol::{decode_frame, OutboundMessage, UserQuery};
use slugge_store::Database;

use crate::retrieval::{self, MAX_HITS};

#[derive(Clone, Debug)]
pub struct AssistantConfig {
    /// Pause before each streamed chunk.
    pub token_delay: Duration,
    pub max_hits: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            token_delay: Duration::from_millis(50),
            max_hits: MAX_HITS,
        }
    }
}

/// The outbound side of a session went away.
#[derive(Debug, thiserror::Error)]
#[error("assistant session closed")]
pub struct SessionClosed;

pub struct AssistantService {
    db: Database,
    config: AssistantConfig,
}

impl AssistantService {
    pub fn new(db: Database, config: AssistantConfig) -> Self {
        Self { db, config }
    }

    /// Drive one session until either channel closes.
    pub async fn run_session(
        &self,
        mut inbound: mpsc::Receiver<String>,
        outbound: mpsc::Sender<OutboundMessage>,
    ) {
        while let Some(frame) = inbound.recv().await {
            if self.handle_frame(&frame, &outbound).await.is_err() {
                debug!("outbound closed, ending assistant session");
                break;
            }
        }
    }

    /// Handle a single inbound frame. Frames that are not `user` messages
    /// produce nothing; invalid `user` messages produce one `error`.
    pub async fn handle_frame(
        &self,
        raw: &str,
        outbound: &mpsc::Sender<OutboundMessage>,
    ) -> Result<(), SessionClosed> {
        let Some(message) = decode_frame(raw) else {
            debug!("ignoring non-user frame");
            return Ok(());
        };

        match message.validate() {
            Ok(query) => self.answer(&query, outbound).await,
            Err(e) => send(outbound, OutboundMessage::error(e.to_string())).await,
        }
    }

    #[instrument(skip(self, query, outbound), fields(project_id = %query.project_id))]
    async fn answer(
        &self,
        query: &UserQuery,
        outbound: &mpsc::Sender<OutboundMessage>,
    ) -> Result<(), SessionClosed> {
        let hits = self.hits_for(query);
        let reply = compose_reply(&hits, &query.text);
        send(outbound, OutboundMessage::Retrieval { hits }).await?;

        for word in reply.split_whitespace() {
            tokio::time::sleep(self.config.token_delay).await;
            send(outbound, OutboundMessage::Chunk { text: format!("{word} ") }).await?;
        }

        send(outbound, OutboundMessage::Done { cost: reply_cost(&reply) }).await
    }

    /// Retrieval failures degrade to zero hits rather than ending the session.
    fn hits_for(&self, query: &UserQuery) -> Vec<String> {
        match retrieval::retrieve(&self.db, &query.project_id, &query.text, self.config.max_hits) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "retrieval failed; answering without hits");
                Vec::new()
            }
        }
    }
}

async fn send(
    outbound: &mpsc::Sender<OutboundMessage>,
    message: OutboundMessage,
) -> Result<(), SessionClosed> {
    outbound.send(message).await.map_err(|_| SessionClosed)
}

/// Canned reply text summarizing the retrieval.
pub fn compose_reply(hits: &[String], text: &str) -> String {
    let names = if hits.is_empty() {
        "none".to_owned()
    } else {
        hits.join(", ")
    };
    format!(
        "I found {} related document(s): {}. You asked: {}",
        hits.len(),
        names,
        text
    )
}

/// One millionth of a unit per character, rounded to six decimals.
pub fn reply_cost(reply: &str) -> f64 {
    let raw = reply.chars().count() as f64 * 1e-6;
    (raw * 1e6).round() / 1e6
}
