//! Inbound dispatch
//!
//! Operations reach a processor through an explicit single-consumer queue
//! per symbol, or through a shard task that owns the processor outright and
//! serves requests from an mpsc channel.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use types::errors::BookError;
use types::ids::Symbol;
use types::market::MarketSnapshot;
use types::order::Order;

use matching_engine::{ExecutionReport, SnapshotApplied};

use crate::config::QueueConfig;
use crate::processor::OrderBookProcessor;
use crate::snapshot::BookView;

/// A mutating operation addressed to one symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    Order(Order),
    MarketData(MarketSnapshot),
}

impl Inbound {
    pub fn symbol(&self) -> &Symbol {
        match self {
            Inbound::Order(order) => &order.symbol,
            Inbound::MarketData(snapshot) => &snapshot.symbol,
        }
    }
}

/// Result of applying one inbound operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Applied {
    Execution(ExecutionReport),
    Snapshot(SnapshotApplied),
}

impl OrderBookProcessor {
    /// Apply any inbound operation
    pub fn apply(&mut self, inbound: Inbound) -> Result<Applied, BookError> {
        match inbound {
            Inbound::Order(order) => self.process_order(order).map(Applied::Execution),
            Inbound::MarketData(snapshot) => self
                .process_market_data_update(&snapshot)
                .map(Applied::Snapshot),
        }
    }
}

/// Errors raised by queues and shards.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("queue for {symbol} is full (capacity {capacity})")]
    QueueFull { symbol: Symbol, capacity: usize },

    #[error("operation for {actual} pushed to the {expected} queue")]
    WrongSymbol { expected: Symbol, actual: Symbol },

    #[error("shard has shut down")]
    ShardClosed,

    #[error("shard task failed: {0}")]
    ShardFailed(String),
}

/// Outcome of draining a queue into a processor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub applied: usize,
    pub rejected: usize,
    /// One result per drained operation, in arrival order
    pub results: Vec<Result<Applied, BookError>>,
}

/// Bounded FIFO of operations for one symbol
#[derive(Debug, Clone)]
pub struct InboundQueue {
    symbol: Symbol,
    capacity: usize,
    items: VecDeque<Inbound>,
    refused: u64,
}

impl InboundQueue {
    pub fn new(symbol: Symbol, config: QueueConfig) -> Self {
        Self {
            symbol,
            capacity: config.capacity,
            items: VecDeque::with_capacity(config.capacity.min(1024)),
            refused: 0,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Enqueue an operation; refused when full or addressed to another symbol
    pub fn push(&mut self, inbound: Inbound) -> Result<(), QueueError> {
        if inbound.symbol() != &self.symbol {
            return Err(QueueError::WrongSymbol {
                expected: self.symbol.clone(),
                actual: inbound.symbol().clone(),
            });
        }
        if self.items.len() >= self.capacity {
            self.refused += 1;
            warn!(
                symbol = %self.symbol,
                capacity = self.capacity,
                refused = self.refused,
                "Inbound queue full, refusing operation"
            );
            return Err(QueueError::QueueFull {
                symbol: self.symbol.clone(),
                capacity: self.capacity,
            });
        }
        self.items.push_back(inbound);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Inbound> {
        self.items.pop_front()
    }

    /// Apply every queued operation in arrival order
    pub fn drain_into(&mut self, processor: &mut OrderBookProcessor) -> DrainSummary {
        let mut summary = DrainSummary::default();
        while let Some(inbound) = self.items.pop_front() {
            let result = processor.apply(inbound);
            match &result {
                Ok(_) => summary.applied += 1,
                Err(_) => summary.rejected += 1,
            }
            summary.results.push(result);
        }
        debug!(
            symbol = %self.symbol,
            applied = summary.applied,
            rejected = summary.rejected,
            "Queue drained"
        );
        summary
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pushes refused because the queue was full
    pub fn refused(&self) -> u64 {
        self.refused
    }
}

/// Requests served by a shard task
#[derive(Debug)]
pub enum ShardCommand {
    Apply {
        inbound: Inbound,
        reply: oneshot::Sender<Result<Applied, BookError>>,
    },
    Report {
        symbol: Symbol,
        depth: usize,
        reply: oneshot::Sender<String>,
    },
    View {
        symbol: Symbol,
        depth: usize,
        reply: oneshot::Sender<BookView>,
    },
    Checksum {
        reply: oneshot::Sender<String>,
    },
}

/// Cloneable sender side of a shard
#[derive(Debug, Clone)]
pub struct ShardClient {
    tx: mpsc::Sender<ShardCommand>,
}

impl ShardClient {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ShardCommand,
    ) -> Result<T, QueueError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| QueueError::ShardClosed)?;
        response.await.map_err(|_| QueueError::ShardClosed)
    }

    /// Apply an operation on the shard and wait for its result
    pub async fn submit(&self, inbound: Inbound) -> Result<Result<Applied, BookError>, QueueError> {
        self.request(|reply| ShardCommand::Apply { inbound, reply }).await
    }

    pub async fn report(&self, symbol: Symbol, depth: usize) -> Result<String, QueueError> {
        self.request(|reply| ShardCommand::Report { symbol, depth, reply }).await
    }

    pub async fn view(&self, symbol: Symbol, depth: usize) -> Result<BookView, QueueError> {
        self.request(|reply| ShardCommand::View { symbol, depth, reply }).await
    }

    pub async fn checksum(&self) -> Result<String, QueueError> {
        self.request(|reply| ShardCommand::Checksum { reply }).await
    }
}

/// A running shard: its client plus the task that owns the processor
#[derive(Debug)]
pub struct ShardHandle {
    client: ShardClient,
    task: JoinHandle<OrderBookProcessor>,
}

impl ShardHandle {
    pub fn client(&self) -> ShardClient {
        self.client.clone()
    }

    /// Drop this handle's sender and wait for the task to hand back its processor
    ///
    /// The task only ends once every cloned client has been dropped too.
    pub async fn shutdown(self) -> Result<OrderBookProcessor, QueueError> {
        drop(self.client);
        self.task
            .await
            .map_err(|e| QueueError::ShardFailed(e.to_string()))
    }
}

/// Move a processor onto its own task fed by a bounded channel
pub fn spawn_shard(mut processor: OrderBookProcessor, buffer: usize) -> ShardHandle {
    let (tx, mut rx) = mpsc::channel::<ShardCommand>(buffer.max(1));

    let task = tokio::spawn(async move {
        info!(buffer, "Shard task started");
        while let Some(command) = rx.recv().await {
            match command {
                ShardCommand::Apply { inbound, reply } => {
                    let _ = reply.send(processor.apply(inbound));
                }
                ShardCommand::Report { symbol, depth, reply } => {
                    let _ = reply.send(processor.get_order_book_snapshot(&symbol, depth));
                }
                ShardCommand::View { symbol, depth, reply } => {
                    let _ = reply.send(processor.book_view(&symbol, depth));
                }
                ShardCommand::Checksum { reply } => {
                    let _ = reply.send(processor.state_checksum());
                }
            }
        }
        info!("Shard task stopped");
        processor
    });

    ShardHandle {
        client: ShardClient { tx },
        task,
    }
}
