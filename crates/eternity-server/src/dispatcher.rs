//! Fans one inbound frame stream out to concurrent store operations and
//! fans the replies back onto the transport.
//!
//! Three tasks run for the life of a connection:
//!
//! - the **reader** decodes frames and submits requests to a bounded queue;
//! - the **dispatch loop** starts one execution per request, at most
//!   `max_in_flight` at a time, each under a deadline;
//! - the **writer** encodes replies and owns the transport's send side, so
//!   frames are never interleaved.
//!
//! The reply token moves with its request into exactly one response.

use std::sync::Arc;
use std::time::Duration;

use eternity_protocol::{EternityCodec, ProtocolError, Reply, Request};
use eternity_store::ContentStore;
use eternity_types::ReplyToken;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::{DeadlinePolicy, ServerConfig};
use crate::error::{ServerError, ServerResult};
use crate::handler;
use crate::transport::Transport;

/// A reply bound for the sender of one request.
#[derive(Debug)]
pub struct Response {
    pub reply_token: ReplyToken,
    pub reply: Reply,
}

/// Counters for one `run` of the dispatcher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Frames decoded into requests and queued.
    pub accepted: u64,
    /// Frames dropped because they could not be decoded.
    pub dropped: u64,
    /// Requests that finished before their deadline.
    pub completed: u64,
    /// Requests whose deadline expired.
    pub expired: u64,
    /// Requests whose handler panicked. Answered as failures.
    pub failed: u64,
    /// Reply frames written to the transport.
    pub sent: u64,
}

#[derive(Clone, Copy, Debug)]
struct Limits {
    max_in_flight: usize,
    request_timeout: Duration,
    on_deadline: DeadlinePolicy,
}

enum Outcome {
    Completed,
    Expired,
    Failed,
}

/// Per-outcome counts from the dispatch loop.
#[derive(Default)]
struct Tally {
    completed: u64,
    expired: u64,
    failed: u64,
}

pub struct Dispatcher {
    store: Arc<dyn ContentStore>,
    codec: EternityCodec,
    limits: Limits,
    request_queue_capacity: usize,
    response_queue_capacity: usize,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn ContentStore>, config: &ServerConfig) -> Self {
        Self {
            store,
            codec: EternityCodec::new(config.max_frame_size),
            limits: Limits {
                max_in_flight: config.max_in_flight.max(1),
                request_timeout: config.request_timeout,
                on_deadline: config.on_deadline,
            },
            request_queue_capacity: config.request_queue_capacity.max(1),
            response_queue_capacity: config.response_queue_capacity.max(1),
        }
    }

    /// Serve `transport` until it closes.
    ///
    /// On close, queued and in-flight requests still finish and their replies
    /// are written before this returns. A failed send ends the run at once.
    pub async fn run(&self, transport: Arc<dyn Transport>) -> ServerResult<DispatchStats> {
        let (request_tx, request_rx) = mpsc::channel(self.request_queue_capacity);
        let (response_tx, response_rx) = mpsc::channel(self.response_queue_capacity);

        let mut reader = tokio::spawn(read_loop(Arc::clone(&transport), self.codec, request_tx));
        let mut dispatch = tokio::spawn(dispatch_loop(
            Arc::clone(&self.store),
            request_rx,
            response_tx,
            self.limits,
        ));
        let mut writer = tokio::spawn(write_loop(transport, self.codec, response_rx));

        info!(
            max_in_flight = self.limits.max_in_flight,
            timeout_secs = self.limits.request_timeout.as_secs_f64(),
            "dispatcher started"
        );

        let mut written = None;
        let read = tokio::select! {
            biased;
            read = &mut reader => read,
            result = &mut writer => match flatten(result) {
                // The response queue only closes after the reader has stopped
                // and every request was answered.
                Ok(sent) => {
                    written = Some(sent);
                    reader.await
                }
                Err(e) => {
                    reader.abort();
                    dispatch.abort();
                    error!(error = %e, "transport send failed; stopping");
                    return Err(e);
                }
            },
        };
        let (accepted, dropped) = match flatten(read) {
            Ok(counts) => counts,
            Err(e) => {
                error!(error = %e, "transport receive failed; stopping");
                dispatch.abort();
                writer.abort();
                return Err(e);
            }
        };

        let tally = dispatch.await.map_err(join_error)?;
        let sent = match written {
            Some(sent) => sent,
            None => flatten(writer.await)?,
        };

        let stats = DispatchStats {
            accepted,
            dropped,
            completed: tally.completed,
            expired: tally.expired,
            failed: tally.failed,
            sent,
        };
        info!(?stats, "dispatcher stopped");
        Ok(stats)
    }
}

/// Decode one inbound frame and queue it.
///
/// Returns `Ok(false)` when the frame was dropped. Only a closed queue is an
/// error; undecodable frames are logged and never answered.
async fn submit(
    codec: &EternityCodec,
    frame: &[u8],
    requests: &mpsc::Sender<Request>,
) -> Result<bool, mpsc::error::SendError<Request>> {
    match codec.decode_request(frame) {
        Ok(request) => {
            debug!(
                action = request.action.type_name(),
                token_len = request.reply_token.len(),
                "request received"
            );
            requests.send(request).await?;
            Ok(true)
        }
        Err(ProtocolError::TransportError { kind, message }) => {
            warn!(kind, %message, "anonymizing client reported an error");
            Ok(false)
        }
        Err(e) => {
            warn!(error = %e, len = frame.len(), "dropping undecodable frame");
            Ok(false)
        }
    }
}

async fn read_loop(
    transport: Arc<dyn Transport>,
    codec: EternityCodec,
    requests: mpsc::Sender<Request>,
) -> ServerResult<(u64, u64)> {
    let (mut accepted, mut dropped) = (0u64, 0u64);
    while let Some(frame) = transport.receive().await? {
        match submit(&codec, &frame, &requests).await {
            Ok(true) => accepted += 1,
            Ok(false) => dropped += 1,
            Err(_) => break,
        }
    }
    debug!(accepted, dropped, "transport closed");
    Ok((accepted, dropped))
}

async fn dispatch_loop(
    store: Arc<dyn ContentStore>,
    mut requests: mpsc::Receiver<Request>,
    responses: mpsc::Sender<Response>,
    limits: Limits,
) -> Tally {
    let permits = Arc::new(Semaphore::new(limits.max_in_flight));
    let mut in_flight = JoinSet::new();
    let mut counts = Tally::default();
    let mut tally = |result: Result<Outcome, JoinError>| match result {
        Ok(Outcome::Completed) => counts.completed += 1,
        Ok(Outcome::Expired) => counts.expired += 1,
        Ok(Outcome::Failed) => counts.failed += 1,
        Err(e) => {
            error!(error = %e, "request task failed");
            counts.failed += 1;
        }
    };

    loop {
        // Waiting for a permit before taking the next request leaves excess
        // work in the bounded queue, which in turn stalls the reader. The
        // permit is held by the store call itself, past any deadline.
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let Some(request) = requests.recv().await else {
            break;
        };
        in_flight.spawn(execute(
            Arc::clone(&store),
            request,
            responses.clone(),
            limits,
            permit,
        ));
        while let Some(result) = in_flight.try_join_next() {
            tally(result);
        }
    }
    while let Some(result) = in_flight.join_next().await {
        tally(result);
    }
    counts
}

async fn execute(
    store: Arc<dyn ContentStore>,
    request: Request,
    responses: mpsc::Sender<Response>,
    limits: Limits,
    permit: OwnedSemaphorePermit,
) -> Outcome {
    let Request {
        reply_token,
        action,
    } = request;
    let name = action.type_name();
    let work = tokio::task::spawn_blocking(move || {
        let reply = handler::handle(store.as_ref(), action);
        drop(permit);
        reply
    });

    let (reply, outcome) = match tokio::time::timeout(limits.request_timeout, work).await {
        Ok(Ok(reply)) => (reply, Outcome::Completed),
        Ok(Err(e)) => {
            error!(action = name, error = %e, "request handler panicked");
            (Reply::not_found(), Outcome::Failed)
        }
        Err(_) => {
            warn!(action = name, policy = ?limits.on_deadline, "request deadline expired");
            match limits.on_deadline {
                DeadlinePolicy::Suppress => return Outcome::Expired,
                DeadlinePolicy::ReplyFailure => (Reply::not_found(), Outcome::Expired),
            }
        }
    };

    debug!(action = name, status = ?reply.status, "request complete");
    complete(&responses, Response { reply_token, reply }).await;
    outcome
}

/// Hand a response to the writer.
async fn complete(responses: &mpsc::Sender<Response>, response: Response) {
    if responses.send(response).await.is_err() {
        debug!("writer stopped; response discarded");
    }
}

async fn write_loop(
    transport: Arc<dyn Transport>,
    codec: EternityCodec,
    mut responses: mpsc::Receiver<Response>,
) -> ServerResult<u64> {
    let mut sent = 0u64;
    while let Some(Response { reply_token, reply }) = responses.recv().await {
        transport.send(codec.encode_reply(reply_token, &reply)).await?;
        sent += 1;
    }
    Ok(sent)
}

fn join_error(e: JoinError) -> ServerError {
    ServerError::Internal(format!("dispatcher task failed: {e}"))
}

fn flatten<T>(joined: Result<ServerResult<T>, JoinError>) -> ServerResult<T> {
    joined.map_err(join_error)?
}
