//! Decode worker pool.
//!
//! Every page source owns one pool: two unbounded FIFO lanes drained by a
//! fixed number of worker tasks (the variant's decode concurrency). Workers
//! always take the oldest page request first and only pick up a preload when
//! no page request is waiting. Each job takes a permit from a semaphore shared
//! by all sources and runs the blocking decode on tokio's blocking thread pool.
//!
//! ```text
//!  decode_page(i)  ──► pages lane ────┐
//!                                     ├──► worker 0..n ──► global permit ──► spawn_blocking(decode)
//!  preload_page(i) ──► preloads lane ─┘         │
//!                                               │
//!  DecodeTicket ◄──────────── oneshot ◄─────────┘
//! ```
//!
//! Every page request completes exactly once through its ticket. A preload
//! whose ticket was dropped before a worker reached it is skipped. After
//! [`DecodePool::drain`] both lanes are closed: queued jobs still run, and new
//! requests complete immediately with [`PageError::Unknown`].

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::PageError;

use super::decoder::{DecodedImage, PageBackend};

type DecodeResult = Result<DecodedImage, PageError>;

/// Queue a decode request goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lane {
    /// Pages someone is waiting to show
    Page,
    /// Speculative decodes, run only when no page request is queued
    Preload,
}

struct DecodeJob {
    index: usize,
    lane: Lane,
    reply: oneshot::Sender<DecodeResult>,
}

impl DecodeJob {
    fn is_abandoned(&self) -> bool {
        self.lane == Lane::Preload && self.reply.is_closed()
    }
}

struct Senders {
    pages: mpsc::UnboundedSender<DecodeJob>,
    preloads: mpsc::UnboundedSender<DecodeJob>,
}

struct Receivers {
    pages: mpsc::UnboundedReceiver<DecodeJob>,
    preloads: mpsc::UnboundedReceiver<DecodeJob>,
}

impl Receivers {
    /// Next job, preferring the pages lane. `None` once both lanes are closed
    /// and empty.
    async fn next(&mut self) -> Option<DecodeJob> {
        tokio::select! {
            biased;
            Some(job) = self.pages.recv() => Some(job),
            Some(job) = self.preloads.recv() => Some(job),
            else => None,
        }
    }
}

// =============================================================================
// DecodeTicket
// =============================================================================

/// Pending result of one decode request.
///
/// Resolves exactly once. Dropping a page ticket does not cancel the decode;
/// the result is discarded when it arrives. Dropping a preload ticket before
/// its decode starts removes it from the queue.
pub struct DecodeTicket {
    index: usize,
    receiver: oneshot::Receiver<DecodeResult>,
}

impl DecodeTicket {
    /// Page index this ticket was issued for.
    pub fn index(&self) -> usize {
        self.index
    }

    fn ready(index: usize, result: DecodeResult) -> Self {
        let (tx, receiver) = oneshot::channel();
        let _ = tx.send(result);
        Self { index, receiver }
    }
}

impl Future for DecodeTicket {
    type Output = DecodeResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let index = self.index;
        Pin::new(&mut self.receiver).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(PageError::unknown(index, "decode worker dropped the request"))
            })
        })
    }
}

impl std::fmt::Debug for DecodeTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeTicket").field("index", &self.index).finish()
    }
}

// =============================================================================
// DecodePool
// =============================================================================

/// Bounded-concurrency decode queue for one page source.
pub struct DecodePool {
    senders: Mutex<Option<Senders>>,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    pending: Arc<AtomicUsize>,
    concurrency: usize,
}

impl DecodePool {
    /// Start `concurrency` workers for `backend`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(backend: Arc<PageBackend>, concurrency: usize, limit: Arc<Semaphore>) -> Self {
        let concurrency = concurrency.max(1);
        let (pages, pages_rx) = mpsc::unbounded_channel();
        let (preloads, preloads_rx) = mpsc::unbounded_channel();
        let receivers = Arc::new(tokio::sync::Mutex::new(Receivers {
            pages: pages_rx,
            preloads: preloads_rx,
        }));
        let pending = Arc::new(AtomicUsize::new(0));

        let workers = (0..concurrency)
            .map(|_| {
                tokio::spawn(run_worker(
                    Arc::clone(&backend),
                    Arc::clone(&receivers),
                    Arc::clone(&limit),
                    Arc::clone(&pending),
                ))
            })
            .collect();

        Self {
            senders: Mutex::new(Some(Senders { pages, preloads })),
            workers: tokio::sync::Mutex::new(workers),
            pending,
            concurrency,
        }
    }

    /// Queue a decode of page `index` on the pages lane.
    pub fn submit(&self, index: usize) -> DecodeTicket {
        self.submit_to(Lane::Page, index)
    }

    /// Queue a best-effort decode of page `index` behind every page request.
    pub fn submit_preload(&self, index: usize) -> DecodeTicket {
        self.submit_to(Lane::Preload, index)
    }

    fn submit_to(&self, lane: Lane, index: usize) -> DecodeTicket {
        let (reply, receiver) = oneshot::channel();
        let job = DecodeJob { index, lane, reply };

        self.pending.fetch_add(1, Ordering::SeqCst);
        let rejected = match self.senders.lock().as_ref() {
            Some(senders) => {
                let sender = match lane {
                    Lane::Page => &senders.pages,
                    Lane::Preload => &senders.preloads,
                };
                sender.send(job).err().map(|e| e.0)
            }
            None => Some(job),
        };

        if let Some(job) = rejected {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return DecodeTicket::ready(job.index, Err(PageError::unknown(index, "source closed")));
        }

        DecodeTicket { index, receiver }
    }

    /// Number of requests submitted but not yet completed or skipped.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Whether the queue has been closed by [`drain`](Self::drain).
    pub fn is_closed(&self) -> bool {
        self.senders.lock().is_none()
    }

    /// Close the queue and wait until every queued decode has completed.
    ///
    /// Safe to call more than once; later calls return once the first drain
    /// has finished.
    pub async fn drain(&self) {
        drop(self.senders.lock().take());

        let mut workers = self.workers.lock().await;
        for worker in workers.drain(..) {
            if let Err(e) = worker.await {
                warn!(error = %e, "Decode worker terminated abnormally");
            }
        }
    }
}

async fn run_worker(
    backend: Arc<PageBackend>,
    jobs: Arc<tokio::sync::Mutex<Receivers>>,
    limit: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
) {
    loop {
        let job = jobs.lock().await.next().await;
        let Some(job) = job else { break };

        if job.is_abandoned() {
            pending.fetch_sub(1, Ordering::SeqCst);
            debug!(page = job.index, "Skipping abandoned preload");
            continue;
        }

        let result = decode_with_permit(&backend, &limit, job.index).await;
        // Settle the count first so a requester that saw its result also sees it
        pending.fetch_sub(1, Ordering::SeqCst);
        if job.reply.send(result).is_err() {
            debug!(page = job.index, lane = ?job.lane, "Decode result discarded, requester went away");
        }
    }
}

async fn decode_with_permit(
    backend: &Arc<PageBackend>,
    limit: &Arc<Semaphore>,
    index: usize,
) -> DecodeResult {
    let permit = Arc::clone(limit)
        .acquire_owned()
        .await
        .map_err(|e| PageError::unknown(index, e))?;
    let backend = Arc::clone(backend);

    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        backend.decode(index)
    })
    .await
    .unwrap_or_else(|e| Err(PageError::unknown(index, format!("decode task failed: {}", e))))
}
