// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use std::sync::Arc;
use std::time::{Duration, Instant};

use suds_core::{Clock, IdGen, MachineState, ObserverId, RequesterId, ResourceClass, UuidIdGen};
use suds_engine::{channel_sink, CoreError, Hub, Runtime};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, error, info, warn};

use crate::protocol::{self, ProtocolError, Request, Response, PROTOCOL_VERSION};

/// Frames buffered per observer before delivery starts to block
const SUBSCRIBER_BUFFER: usize = 64;

/// State shared by every connection task
pub struct ServerContext<C: Clock, G: IdGen = UuidIdGen> {
    pub runtime: Arc<Runtime<C>>,
    pub start_time: Instant,
    pub request_timeout: Duration,
    /// Signalled when a client asks the daemon to stop
    pub shutdown: Arc<Notify>,
    id_gen: G,
}

impl<C: Clock> ServerContext<C> {
    pub fn new(runtime: Arc<Runtime<C>>, request_timeout: Duration) -> Self {
        Self::with_id_gen(runtime, request_timeout, UuidIdGen)
    }
}

impl<C: Clock, G: IdGen> ServerContext<C, G> {
    /// Observer ids come from `id_gen`
    pub fn with_id_gen(runtime: Arc<Runtime<C>>, request_timeout: Duration, id_gen: G) -> Self {
        Self {
            runtime,
            start_time: Instant::now(),
            request_timeout,
            shutdown: Arc::new(Notify::new()),
            id_gen,
        }
    }
}

/// Serve one connection on its own task
pub fn spawn_connection<C: Clock, G: IdGen + 'static>(
    ctx: Arc<ServerContext<C, G>>,
    stream: UnixStream,
) {
    tokio::spawn(async move {
        if let Err(e) = handle_connection(ctx, stream).await {
            error!("error handling connection: {}", e);
        }
    });
}

/// Handle a single client connection
pub async fn handle_connection<C: Clock, G: IdGen>(
    ctx: Arc<ServerContext<C, G>>,
    stream: UnixStream,
) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = match protocol::read_request(&mut reader, ctx.request_timeout).await {
        Ok(req) => req,
        Err(ProtocolError::Timeout) => {
            error!("request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(ProtocolError::ConnectionClosed) => {
            debug!("client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!(?request, "received request");

    if let Request::Subscribe { requester_id } = request {
        return run_subscription(&ctx, reader, writer, requester_id).await;
    }

    let response = handle_request(&ctx, request).await;

    debug!(?response, "sending response");

    protocol::write_response(&mut writer, &response, ctx.request_timeout)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Handle a single request and return a response
async fn handle_request<C: Clock, G: IdGen>(ctx: &ServerContext<C, G>, request: Request) -> Response {
    let coordinator = ctx.runtime.coordinator();
    let waitlists = ctx.runtime.waitlists();

    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Status => status(ctx).await,

        Request::Start {
            resource,
            requester_id,
            cycle,
        } => reply(
            coordinator.start(resource, requester_id, cycle).await,
            |outcome| Response::Started {
                machine: outcome.machine,
                seconds: outcome.seconds,
            },
        ),

        Request::Cancel {
            resource,
            requester_id,
        } => reply(coordinator.cancel(resource, requester_id).await, |machine| {
            Response::Machine { machine }
        }),

        Request::End {
            resource,
            requester_id,
        } => reply(coordinator.end(resource, requester_id).await, |machine| {
            Response::Machine { machine }
        }),

        Request::Collect {
            resource,
            requester_id,
        } => reply(coordinator.collect(resource, requester_id).await, |machine| {
            Response::Machine { machine }
        }),

        Request::ReportFault {
            resource,
            requester_id,
            description,
            photo,
        } => reply(
            coordinator
                .report_fault(resource, requester_id, description, photo)
                .await,
            |tally| Response::FaultTally {
                count: tally.count,
                disabled: tally.disabled,
            },
        ),

        Request::GetMachine { resource } => reply(coordinator.machine(resource).await, |machine| {
            Response::Machine { machine }
        }),

        Request::ListMachines { class } => Response::Machines {
            machines: coordinator.machines(class).await,
        },

        Request::FaultCount { resource } => {
            reply(coordinator.fault_count(resource).await, |tally| {
                Response::FaultTally {
                    count: tally.count,
                    disabled: tally.disabled,
                }
            })
        }

        Request::FaultReports => Response::FaultReports {
            reports: coordinator.fault_reports().await,
        },

        Request::JoinWaitlist {
            class,
            requester_id,
        } => reply(waitlists.join(class, requester_id).await, |position| {
            Response::Position { position }
        }),

        Request::LeaveWaitlist {
            class,
            requester_id,
        } => reply(waitlists.leave(class, requester_id).await, |()| Response::Ok),

        Request::GetWaitlist { class } => Response::Waitlist {
            entries: waitlists.list(class).await.to_vec(),
        },

        Request::Subscribe { .. } | Request::Identify { .. } => Response::Error {
            kind: "invalid_request".to_string(),
            message: "only valid as the first message of an observer stream".to_string(),
        },

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }
    }
}

fn reply<T>(result: Result<T, CoreError>, ok: impl FnOnce(T) -> Response) -> Response {
    match result {
        Ok(value) => ok(value),
        Err(e) => Response::Error {
            kind: e.kind().as_str().to_string(),
            message: e.to_string(),
        },
    }
}

async fn status<C: Clock, G: IdGen>(ctx: &ServerContext<C, G>) -> Response {
    let coordinator = ctx.runtime.coordinator();
    let mut machines_in_use = 0;
    let mut machines_disabled = 0;
    for class in ResourceClass::ALL {
        for machine in coordinator.machines(class).await {
            match machine.state {
                MachineState::InUse => machines_in_use += 1,
                MachineState::Disabled => machines_disabled += 1,
                MachineState::Available | MachineState::Completed => {}
            }
        }
    }
    let waitlists = ctx.runtime.waitlists();

    Response::Status {
        uptime_secs: ctx.start_time.elapsed().as_secs(),
        machines_in_use,
        machines_disabled,
        washers_waiting: waitlists.list(ResourceClass::Washer).await.len(),
        dryers_waiting: waitlists.list(ResourceClass::Dryer).await.len(),
        observers: ctx.runtime.hub().observer_count().await,
    }
}

/// Stream hub frames to the client until either side goes away
async fn run_subscription<C: Clock, G: IdGen>(
    ctx: &ServerContext<C, G>,
    reader: OwnedReadHalf,
    mut writer: OwnedWriteHalf,
    requester: Option<RequesterId>,
) -> Result<(), ServerError> {
    let hub = ctx.runtime.hub().clone();
    let observer = ObserverId::new(ctx.id_gen.next());
    let (sink, mut frames) = channel_sink(SUBSCRIBER_BUFFER);
    hub.register(observer.clone(), Arc::new(sink), requester);
    info!(%observer, ?requester, "observer subscribed");

    let ack = Response::Subscribed {
        observer_id: observer.to_string(),
    };
    if let Err(e) = protocol::write_response(&mut writer, &ack, ctx.request_timeout).await {
        hub.unregister(observer);
        return Err(e.into());
    }

    let (closed_tx, mut closed) = oneshot::channel();
    let reader_task = tokio::spawn(read_observer_requests(
        reader,
        hub.clone(),
        observer.clone(),
        closed_tx,
    ));

    let result = loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => {
                    if let Err(e) =
                        protocol::write_frame(&mut writer, &frame, ctx.request_timeout).await
                    {
                        break Err(ServerError::Protocol(e));
                    }
                }
                // Hub dropped this observer
                None => break Ok(()),
            },
            _ = &mut closed => break Ok(()),
        }
    };

    reader_task.abort();
    hub.unregister(observer.clone());
    info!(%observer, "observer disconnected");
    result
}

async fn read_observer_requests(
    mut reader: OwnedReadHalf,
    hub: Hub,
    observer: ObserverId,
    closed: oneshot::Sender<()>,
) {
    loop {
        match protocol::read_message(&mut reader).await {
            Ok(bytes) => match protocol::decode::<Request>(&bytes) {
                Ok(Request::Identify { requester_id }) => {
                    hub.identify(observer.clone(), requester_id);
                }
                Ok(other) => debug!(%observer, ?other, "ignoring request on observer stream"),
                Err(e) => {
                    warn!(%observer, error = %e, "malformed message on observer stream");
                    break;
                }
            },
            Err(ProtocolError::ConnectionClosed) => break,
            Err(e) => {
                debug!(%observer, error = %e, "observer read failed");
                break;
            }
        }
    }
    let _ = closed.send(());
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("request timeout")]
    Timeout,
}
