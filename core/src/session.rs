// Session: the single task that owns a StreamController
//
// Transport events and display commands arrive on channels and are applied one
// at a time; the display observes state through a watch channel.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::controller::{Command, ConnectionStatus, Snapshot, StreamController};
use crate::transport::{Transport, TransportEvent, WebSocketTransport};
use crate::{Result, SnooperError};

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const COMMAND_CHANNEL_CAPACITY: usize = 64;
// events applied before a snapshot is published
const MAX_EVENT_BATCH: usize = 256;

enum Control {
    Command(Command),
    Shutdown,
}

/// Display-side handle: send commands, read snapshots
pub struct SessionHandle {
    controls: mpsc::Sender<Control>,
    snapshots: watch::Receiver<Snapshot>,
    task: JoinHandle<StreamController>,
}

impl SessionHandle {
    /// Send a command. Silently dropped once the session has ended.
    pub async fn send(&self, command: Command) {
        if self.controls.send(Control::Command(command)).await.is_err() {
            debug!("Session ended; command dropped");
        }
    }

    pub async fn pause(&self) {
        self.send(Command::Pause).await
    }

    pub async fn resume(&self) {
        self.send(Command::Resume).await
    }

    pub async fn toggle_pause(&self) {
        self.send(Command::TogglePause).await
    }

    pub async fn clear(&self) {
        self.send(Command::Clear).await
    }

    pub async fn set_filter(&self, query: impl Into<String>) {
        self.send(Command::SetFilter(query.into())).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that is notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Tear the session down and return the final controller state.
    /// Fails when the session task panicked or was aborted.
    pub async fn shutdown(self) -> Result<StreamController> {
        let _ = self.controls.send(Control::Shutdown).await;
        self.task.await.map_err(|e| {
            tracing::error!(error = %e, "Session task failed");
            SnooperError::Session(e.to_string())
        })
    }
}

pub struct Session {
    controller: StreamController,
    transport: Box<dyn Transport>,
    events: mpsc::Receiver<TransportEvent>,
    events_open: bool,
    controls: mpsc::Receiver<Control>,
    snapshots: watch::Sender<Snapshot>,
}

impl Session {
    /// Open a WebSocket to `endpoint` and start a session over it
    pub fn connect(endpoint: &str, window: usize) -> Result<SessionHandle> {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let transport = WebSocketTransport::connect(endpoint, event_tx)?;
        Ok(Self::spawn(
            StreamController::new(window),
            Box::new(transport),
            event_rx,
        ))
    }

    /// Run `controller` against an already started transport
    pub fn spawn(
        mut controller: StreamController,
        transport: Box<dyn Transport>,
        events: mpsc::Receiver<TransportEvent>,
    ) -> SessionHandle {
        let (control_tx, control_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());
        let session = Session {
            controller,
            transport,
            events,
            events_open: true,
            controls: control_rx,
            snapshots: snapshot_tx,
        };
        SessionHandle {
            controls: control_tx,
            snapshots: snapshot_rx,
            task: tokio::spawn(session.run()),
        }
    }

    async fn run(mut self) -> StreamController {
        info!("Session started");
        loop {
            tokio::select! {
                // a queued shutdown wins over pending records
                biased;
                control = self.controls.recv() => match control {
                    Some(Control::Command(command)) => self.controller.handle_command(command),
                    Some(Control::Shutdown) | None => break,
                },
                event = self.events.recv(), if self.events_open => match event {
                    Some(event) => {
                        self.controller.handle_event(event);
                        self.drain_ready_events();
                    }
                    None => self.on_events_closed(),
                },
            }
            self.publish();
        }
        self.teardown().await
    }

    fn drain_ready_events(&mut self) {
        for _ in 1..MAX_EVENT_BATCH {
            match self.events.try_recv() {
                Ok(event) => self.controller.handle_event(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.on_events_closed();
                    break;
                }
            }
        }
    }

    fn on_events_closed(&mut self) {
        self.events_open = false;
        // sender dropped without a close event
        if self.controller.status() != ConnectionStatus::Disconnected {
            self.controller.handle_event(TransportEvent::Closed);
        }
    }

    fn publish(&mut self) {
        self.snapshots.send_replace(self.controller.snapshot());
    }

    async fn teardown(mut self) -> StreamController {
        self.controller.teardown();
        self.transport.close();
        // unblocks a transport task waiting on a full channel
        self.events.close();
        self.transport.closed().await;
        self.publish();
        info!("Session ended");
        self.controller
    }
}
