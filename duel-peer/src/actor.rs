//! The session actor and the receive task.
//!
//! Each connection runs two tasks. The receive task only reads frames and
//! forwards envelopes, in arrival order, into an unbounded channel. The actor
//! owns the [`GameSession`] and the writer and is the only place either is
//! touched; it selects over inbound envelopes, commands from the
//! [`PeerHandle`](crate::PeerHandle) and a deadline tick.

use numduel_core::{AbortReason, ActionError, GameEvent, GameSession, Output, Role, SessionSnapshot};
use numduel_types::{Card, Envelope};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::framing::{FrameReader, FrameWriter};

/// How often pending request deadlines are checked.
const DEADLINE_TICK: Duration = Duration::from_millis(100);

/// Something read off the connection.
#[derive(Debug)]
pub(crate) enum Inbound {
    Envelope(Envelope),
    Closed,
}

/// A request from the handle. Each carries its reply channel.
#[derive(Debug)]
pub(crate) enum Command {
    Play {
        cards: Vec<Card>,
        reply: oneshot::Sender<Result<(), ActionError>>,
    },
    Draw {
        reply: oneshot::Sender<Result<(), ActionError>>,
    },
    Pass {
        reply: oneshot::Sender<Result<(), ActionError>>,
    },
    TargetNumber {
        reply: oneshot::Sender<Option<i64>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown,
}

/// Spawn the receive task for one connection.
pub(crate) fn spawn_receiver<R>(
    mut reader: FrameReader<R>,
    inbound: mpsc::UnboundedSender<Inbound>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match reader.next_envelope().await {
                Ok(Some(envelope)) => {
                    if inbound.send(Inbound::Envelope(envelope)).is_err() {
                        return;
                    }
                }
                Ok(None) => {
                    tracing::info!("connection closed by peer");
                    break;
                }
                Err(e) => {
                    tracing::warn!("read failed: {}", e);
                    break;
                }
            }
        }
        let _ = inbound.send(Inbound::Closed);
    })
}

/// Owns the session for the lifetime of a connection.
pub(crate) struct SessionActor<W> {
    session: GameSession,
    writer: Option<FrameWriter<W>>,
    receiver: JoinHandle<()>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    commands: mpsc::Receiver<Command>,
    events: mpsc::UnboundedSender<GameEvent>,
    request_timeout: Duration,
    pending_since: Option<Instant>,
}

impl<W: AsyncWrite + Unpin + Send> SessionActor<W> {
    pub(crate) fn new(
        session: GameSession,
        writer: FrameWriter<W>,
        receiver: JoinHandle<()>,
        inbound: mpsc::UnboundedReceiver<Inbound>,
        commands: mpsc::Receiver<Command>,
        events: mpsc::UnboundedSender<GameEvent>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            session,
            writer: Some(writer),
            receiver,
            inbound,
            commands,
            events,
            request_timeout,
            pending_since: None,
        }
    }

    /// Run until shutdown or until every handle is dropped.
    pub(crate) async fn run(mut self) {
        let role = self.session.role();
        tracing::info!(%role, "session started");

        if role == Role::Client {
            match self.session.join() {
                Ok(out) => self.dispatch(out).await,
                Err(e) => tracing::warn!("join failed: {}", e),
            }
        }

        let mut tick = tokio::time::interval(DEADLINE_TICK);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut connected = true;

        loop {
            tokio::select! {
                inbound = self.inbound.recv(), if connected => match inbound {
                    Some(Inbound::Envelope(envelope)) => self.on_envelope(envelope).await,
                    Some(Inbound::Closed) | None => {
                        connected = false;
                        self.disconnect(AbortReason::ConnectionLost).await;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.on_command(command).await,
                },
                _ = tick.tick() => self.check_deadline().await,
            }
            self.track_pending();
        }

        self.receiver.abort();
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!("shutdown of write half failed: {}", e);
            }
        }
        tracing::info!(%role, "session stopped");
    }

    async fn on_envelope(&mut self, envelope: Envelope) {
        match self.session.apply(envelope) {
            Ok(out) => self.dispatch(out).await,
            Err(e) => {
                tracing::warn!("aborting session: {}", e);
                if let Some(reason) = self.session.abort_reason().cloned() {
                    let _ = self.events.send(GameEvent::Aborted(reason));
                }
                // The peer learns of the abort by the connection closing.
                self.receiver.abort();
                self.writer = None;
            }
        }
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Play { cards, reply } => {
                let result = self.session.play(cards);
                let _ = reply.send(self.run_local(result).await);
            }
            Command::Draw { reply } => {
                let result = self.session.draw();
                let _ = reply.send(self.run_local(result).await);
            }
            Command::Pass { reply } => {
                let result = self.session.pass();
                let _ = reply.send(self.run_local(result).await);
            }
            Command::TargetNumber { reply } => {
                let target = self.session.target_number();
                if target.is_none() && self.session.role() == Role::Client {
                    let result = self.session.request_target();
                    if let Err(e) = self.run_local(result).await {
                        tracing::debug!("target request not sent: {}", e);
                    }
                }
                let _ = reply.send(target);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.session.snapshot());
            }
            Command::Shutdown => {}
        }
    }

    async fn run_local(
        &mut self,
        result: Result<Vec<Output>, ActionError>,
    ) -> Result<(), ActionError> {
        let out = result?;
        self.dispatch(out).await;
        Ok(())
    }

    async fn dispatch(&mut self, outputs: Vec<Output>) {
        for output in outputs {
            match output {
                Output::Send(envelope) => self.write(envelope).await,
                Output::Event(event) => {
                    let _ = self.events.send(event);
                }
            }
        }
    }

    async fn write(&mut self, envelope: Envelope) {
        let Some(writer) = self.writer.as_mut() else {
            tracing::debug!(seq = %envelope.seq, "connection gone, dropping envelope");
            return;
        };
        if let Err(e) = writer.send(&envelope).await {
            tracing::warn!("write failed: {}", e);
            self.writer = None;
            self.emit_abort(AbortReason::ConnectionLost);
        }
    }

    async fn disconnect(&mut self, reason: AbortReason) {
        self.receiver.abort();
        self.writer = None;
        let out = self.session.abort(reason);
        self.dispatch(out).await;
    }

    fn emit_abort(&mut self, reason: AbortReason) {
        for output in self.session.abort(reason) {
            if let Output::Event(event) = output {
                let _ = self.events.send(event);
            }
        }
    }

    fn track_pending(&mut self) {
        match (self.session.pending(), self.pending_since) {
            (Some(_), None) => self.pending_since = Some(Instant::now()),
            (None, Some(_)) => self.pending_since = None,
            _ => {}
        }
    }

    async fn check_deadline(&mut self) {
        let Some(since) = self.pending_since else {
            return;
        };
        if since.elapsed() < self.request_timeout {
            return;
        }
        tracing::warn!(
            pending = ?self.session.pending(),
            timeout_ms = self.request_timeout.as_millis() as u64,
            "request unanswered"
        );
        self.pending_since = None;
        self.disconnect(AbortReason::PeerUnresponsive).await;
    }
}
