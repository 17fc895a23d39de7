//! The request pipeline for one controller connection.
//!
//! Outbound: request → codec → frame → transport, one full frame at a time
//! under the write lock. Inbound: a single task reads frames, decodes
//! replies, resolves the matching table entry and completes its sink.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::BytesMut;
use futures_util::{SinkExt, StreamExt};
use plcprims_field::{FieldDescriptor, FieldOutcome, Request, Response, ResponseCode, TransactionId};
use plcprims_frame::{FrameCodec, FrameError};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use crate::codec::{Codec, Command, ReplyKind};
use crate::config::DriverConfig;
use crate::error::{CodecError, DriverError, Result, TableError};
use crate::stats::{DriverStats, StatsSnapshot};
use crate::table::CorrelationTable;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// How long `close()` may spend flushing and shutting down the write half.
const CLOSE_GRACE: Duration = Duration::from_millis(250);

struct PendingEntry {
    /// Distinguishes this entry from a later one that reuses its id.
    ticket: u64,
    field: FieldDescriptor,
    sink: oneshot::Sender<Result<FieldOutcome>>,
    _permit: Option<OwnedSemaphorePermit>,
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", content = "detail", rename_all = "snake_case")]
pub enum CloseCause {
    /// `close()` was called or the driver was dropped.
    Requested,
    /// The transport reached end of stream.
    PeerClosed,
    /// An inbound frame was malformed.
    Frame(String),
    /// No transaction id was free.
    DuplicateTransaction(TransactionId),
    /// The controller answered a write, which this driver cannot complete.
    WriteNotImplemented(TransactionId),
    /// Transport I/O failed.
    Io(String),
}

impl fmt::Display for CloseCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseCause::Requested => f.write_str("closed by request"),
            CloseCause::PeerClosed => f.write_str("peer closed the connection"),
            CloseCause::Frame(err) => write!(f, "frame error: {err}"),
            CloseCause::DuplicateTransaction(id) => write!(f, "duplicate transaction {id}"),
            CloseCause::WriteNotImplemented(id) => {
                write!(f, "write reply for transaction {id} not supported")
            }
            CloseCause::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

struct Shared<C> {
    codec: C,
    table: Arc<CorrelationTable<PendingEntry>>,
    stats: Arc<DriverStats>,
    writer: tokio::sync::Mutex<FramedWrite<BoxedWriter, FrameCodec>>,
    permits: Option<Arc<Semaphore>>,
    shutdown: CancellationToken,
    close_cause: Mutex<Option<CloseCause>>,
    tickets: AtomicU64,
    config: DriverConfig,
}

/// A driver session over one byte-stream connection.
///
/// The driver never opens sockets; it is handed both halves of an
/// established stream. Any number of tasks may submit concurrently through a
/// shared reference.
pub struct Driver<C: Codec> {
    shared: Arc<Shared<C>>,
    inbound: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Codec> Driver<C> {
    /// Start a session on separate read and write halves.
    ///
    /// Spawns the inbound task, so this must run inside a tokio runtime.
    pub fn new<R, W>(reader: R, writer: W, codec: C, config: DriverConfig) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let frames = FramedRead::new(reader, FrameCodec::with_config(config.frame.clone()));
        let writer: BoxedWriter = Box::new(writer);
        let shared = Arc::new(Shared {
            codec,
            table: Arc::new(CorrelationTable::with_ceiling(config.id_ceiling)),
            stats: Arc::default(),
            writer: tokio::sync::Mutex::new(FramedWrite::new(
                writer,
                FrameCodec::with_config(config.frame.clone()),
            )),
            permits: config
                .max_in_flight
                .map(|limit| Arc::new(Semaphore::new(limit.max(1)))),
            shutdown: CancellationToken::new(),
            close_cause: Mutex::new(None),
            tickets: AtomicU64::new(0),
            config,
        });
        let inbound = tokio::spawn(run_inbound(Arc::clone(&shared), frames));
        Self {
            shared,
            inbound: Mutex::new(Some(inbound)),
        }
    }

    /// Start a session on a single duplex stream such as a `TcpStream`.
    pub fn from_stream<S>(stream: S, codec: C, config: DriverConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(reader, writer, codec, config)
    }

    /// Send every field of `request` and return a handle for the replies.
    ///
    /// All fields are validated before any id is assigned; a rejected
    /// request writes nothing. Each field becomes its own command with its
    /// own transaction id.
    pub async fn dispatch(&self, request: &Request) -> Result<PendingResponse> {
        self.ensure_open()?;
        let kind = request.kind();
        for item in request.items() {
            self.shared
                .codec
                .validate(kind, item.field(), item.value())?;
        }

        let shared = &self.shared;
        let mut pending = PendingResponse {
            slots: Vec::with_capacity(request.len()),
            table: Arc::clone(&shared.table),
            stats: Arc::clone(&shared.stats),
        };

        for item in request.items() {
            let permit = match &shared.permits {
                Some(permits) => Some(
                    Arc::clone(permits)
                        .acquire_owned()
                        .await
                        .map_err(|_| DriverError::ConnectionClosed)?,
                ),
                None => None,
            };

            let field = item.field().clone();
            let ticket = shared.tickets.fetch_add(1, Ordering::Relaxed);
            let (sink, rx) = oneshot::channel();
            let registered = shared.table.register(|_| PendingEntry {
                ticket,
                field: field.clone(),
                sink,
                _permit: permit,
            });
            let transaction_id = match registered {
                Ok(id) => id,
                Err(TableError::Duplicate(id)) => {
                    shared.terminate(CloseCause::DuplicateTransaction(id));
                    return Err(DriverError::DuplicateTransaction(id));
                }
            };
            pending.slots.push(Slot {
                name: field.name().to_string(),
                transaction_id,
                ticket,
                rx,
                settled: false,
            });

            // A close that raced the registration above has already drained
            // the table or will never see this entry.
            self.ensure_open()?;

            let command = Command {
                transaction_id,
                kind,
                field,
                value: item.value().cloned(),
            };
            let mut payload = BytesMut::new();
            shared.codec.encode(&command, &mut payload)?;
            shared.send(payload).await?;
        }

        Ok(pending)
    }

    /// Dispatch and wait using the configured request timeout.
    pub async fn submit(&self, request: &Request) -> Result<Response> {
        self.submit_within(request, self.shared.config.request_timeout)
            .await
    }

    /// Dispatch and wait at most `timeout`.
    pub async fn submit_with_timeout(
        &self,
        request: &Request,
        timeout: Duration,
    ) -> Result<Response> {
        self.submit_within(request, Some(timeout)).await
    }

    // The deadline covers waiting for an in-flight slot and the write lock
    // as well as the replies. Dropping a half-finished dispatch withdraws
    // whatever it registered.
    async fn submit_within(
        &self,
        request: &Request,
        timeout: Option<Duration>,
    ) -> Result<Response> {
        let Some(limit) = timeout else {
            return self.dispatch(request).await?.wait(None).await;
        };
        let deadline = Instant::now() + limit;
        match tokio::time::timeout_at(deadline, self.dispatch(request)).await {
            Ok(pending) => pending?.wait_until(Some((deadline, limit))).await,
            Err(_) => {
                self.shared.stats.timeout();
                tracing::warn!(?limit, "request timed out before it was sent");
                Err(DriverError::Timeout(limit))
            }
        }
    }

    /// End the session.
    ///
    /// Every pending entry fails with [`DriverError::ConnectionClosed`] and
    /// later submissions are rejected. The write half is shut down.
    pub async fn close(&self) {
        self.shared.terminate(CloseCause::Requested);
        let inbound = self
            .inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = inbound {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "inbound task ended abnormally");
            }
        }
        // A peer that stopped reading must not hold up the caller.
        let shutdown = async {
            let mut writer = self.shared.writer.lock().await;
            writer.close().await
        };
        match tokio::time::timeout(CLOSE_GRACE, shutdown).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::debug!(error = %err, "transport shutdown failed"),
            Err(_) => tracing::debug!("transport shutdown abandoned, peer not reading"),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    /// The first reason the session ended, if it has.
    pub fn close_cause(&self) -> Option<CloseCause> {
        self.shared
            .close_cause
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Number of commands awaiting a reply.
    pub fn in_flight(&self) -> usize {
        self.shared.table.len()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.shared.config
    }

    pub fn codec(&self) -> &C {
        &self.shared.codec
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(DriverError::ConnectionClosed);
        }
        Ok(())
    }
}

impl<C: Codec> Drop for Driver<C> {
    fn drop(&mut self) {
        self.shared.terminate(CloseCause::Requested);
    }
}

impl<C: Codec> Shared<C> {
    async fn send(&self, payload: BytesMut) -> Result<()> {
        let write = async move {
            let mut writer = self.writer.lock().await;
            writer.send(payload.freeze()).await
        };
        let sent = tokio::select! {
            biased;
            () = self.shutdown.cancelled() => return Err(DriverError::ConnectionClosed),
            sent = write => sent,
        };
        match sent {
            Ok(()) => {
                self.stats.command_sent();
                Ok(())
            }
            Err(FrameError::Io(err)) => {
                tracing::error!(error = %err, "transport write failed");
                self.terminate(CloseCause::Io(err.to_string()));
                Err(DriverError::Io(err))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn handle_payload(&self, payload: &[u8]) -> std::result::Result<(), CloseCause> {
        let reply = match self.codec.decode(payload) {
            Ok(reply) => reply,
            Err(err) => {
                self.stats.malformed();
                tracing::warn!(error = %err, len = payload.len(), "discarding malformed reply");
                return Ok(());
            }
        };
        let tns = reply.transaction_id;

        if reply.kind == ReplyKind::Write {
            tracing::error!(tns, status = reply.status, "write replies are not supported");
            let entry = self.table.resolve(tns);
            let cause = CloseCause::WriteNotImplemented(tns);
            self.terminate(cause.clone());
            if let Some(entry) = entry {
                let _ = entry
                    .sink
                    .send(Err(DriverError::NotImplemented("write replies".to_string())));
            }
            return Err(cause);
        }

        let Some(entry) = self.table.resolve(tns) else {
            self.stats.orphan();
            tracing::warn!(tns, "orphan response discarded");
            return Ok(());
        };

        let code = ResponseCode::from_status(reply.status);
        let outcome = if code.is_ok() {
            match self.codec.decode_value(&entry.field, &reply.data) {
                Ok(value) => Ok(FieldOutcome {
                    transaction_id: tns,
                    code,
                    value: Some(value),
                }),
                Err(CodecError::NotImplemented(what)) => Err(DriverError::NotImplemented(what)),
                Err(err) => Err(DriverError::Codec(err)),
            }
        } else {
            tracing::debug!(tns, status = reply.status, "controller reported error status");
            Ok(FieldOutcome {
                transaction_id: tns,
                code,
                value: None,
            })
        };

        self.stats.reply_resolved();
        if entry.sink.send(outcome).is_err() {
            tracing::trace!(tns, "caller stopped waiting before reply");
        }
        Ok(())
    }

    fn terminate(&self, cause: CloseCause) {
        {
            let mut slot = self
                .close_cause
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                match &cause {
                    CloseCause::Requested => tracing::info!("session closed"),
                    other => tracing::error!(cause = %other, "session terminated"),
                }
                *slot = Some(cause);
            }
        }

        self.shutdown.cancel();
        if let Some(permits) = &self.permits {
            permits.close();
        }
        for (tns, entry) in self.table.drain() {
            tracing::debug!(tns, "failing pending entry on close");
            let _ = entry.sink.send(Err(DriverError::ConnectionClosed));
        }
    }
}

async fn run_inbound<C, R>(shared: Arc<Shared<C>>, mut frames: FramedRead<R, FrameCodec>)
where
    C: Codec,
    R: AsyncRead + Send + Unpin + 'static,
{
    let cause = loop {
        let next = tokio::select! {
            biased;
            () = shared.shutdown.cancelled() => return,
            next = frames.next() => next,
        };
        match next {
            Some(Ok(frame)) => {
                if let Err(cause) = shared.handle_payload(&frame.payload) {
                    break cause;
                }
            }
            Some(Err(FrameError::Io(err))) => break CloseCause::Io(err.to_string()),
            Some(Err(err)) => break CloseCause::Frame(err.to_string()),
            None => break CloseCause::PeerClosed,
        }
    };
    shared.terminate(cause);
}

struct Slot {
    name: String,
    transaction_id: TransactionId,
    ticket: u64,
    rx: oneshot::Receiver<Result<FieldOutcome>>,
    settled: bool,
}

/// Handle for the replies to one dispatched request.
///
/// Dropping it before every reply has arrived withdraws the outstanding
/// entries; replies that arrive later are counted as orphans.
pub struct PendingResponse {
    slots: Vec<Slot>,
    table: Arc<CorrelationTable<PendingEntry>>,
    stats: Arc<DriverStats>,
}

impl PendingResponse {
    /// Transaction ids assigned to the request's fields, in request order.
    pub fn transaction_ids(&self) -> Vec<TransactionId> {
        self.slots.iter().map(|slot| slot.transaction_id).collect()
    }

    /// Wait for every field's reply and assemble the response.
    ///
    /// The first failing field fails the whole request. With a `timeout`,
    /// the deadline covers all fields together.
    pub async fn wait(self, timeout: Option<Duration>) -> Result<Response> {
        let deadline = timeout.map(|limit| (Instant::now() + limit, limit));
        self.wait_until(deadline).await
    }

    async fn wait_until(mut self, deadline: Option<(Instant, Duration)>) -> Result<Response> {
        let mut response = Response::new();

        for slot in &mut self.slots {
            let received = match deadline {
                Some((at, limit)) => match tokio::time::timeout_at(at, &mut slot.rx).await {
                    Ok(received) => received,
                    Err(_) => {
                        self.stats.timeout();
                        tracing::warn!(
                            tns = slot.transaction_id,
                            field = %slot.name,
                            ?limit,
                            "request timed out"
                        );
                        return Err(DriverError::Timeout(limit));
                    }
                },
                None => (&mut slot.rx).await,
            };
            slot.settled = true;

            match received {
                Ok(Ok(outcome)) => response.push(slot.name.clone(), outcome),
                Ok(Err(err)) => return Err(err),
                Err(_) => return Err(DriverError::ConnectionClosed),
            }
        }

        Ok(response)
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        for slot in self.slots.iter().filter(|slot| !slot.settled) {
            let ticket = slot.ticket;
            let removed = self
                .table
                .remove_if(slot.transaction_id, |entry| entry.ticket == ticket);
            if removed.is_some() {
                self.stats.withdrawn();
                tracing::debug!(tns = slot.transaction_id, "pending entry withdrawn");
            }
        }
    }
}

impl fmt::Debug for PendingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResponse")
            .field("transaction_ids", &self.transaction_ids())
            .finish()
    }
}
