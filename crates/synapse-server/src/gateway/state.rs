//! Shared Axum handler state: a thin, `Clone`-derived bag of `Arc`
//! collaborators threaded through `with_state`.

use std::sync::Arc;

use synapse_core::chat::ChatOrchestrator;
use synapse_core::config::Config;
use synapse_core::persistence::ChunkStore;
use synapse_core::retrieval::RetrievalOrchestrator;

#[derive(Clone)]
pub struct HandlerState<C: ChunkStore + 'static> {
    pub retrieval: Arc<RetrievalOrchestrator<C>>,
    pub chat: ChatOrchestrator<C>,
    pub config: Arc<Config>,
}

impl<C: ChunkStore + 'static> HandlerState<C> {
    pub fn new(retrieval: Arc<RetrievalOrchestrator<C>>, chat: ChatOrchestrator<C>, config: Arc<Config>) -> Self {
        Self { retrieval, chat, config }
    }
}
