//! The public face of a running session.

use numduel_core::{GameEvent, GameSession, SessionSnapshot};
use numduel_types::Card;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::actor::{spawn_receiver, Command, SessionActor};
use crate::error::{PeerError, Result};
use crate::framing::{FrameReader, FrameWriter};

/// Bound on queued handle commands.
const COMMAND_BUFFER: usize = 32;

/// Stream of display notifications from a session.
pub type Events = mpsc::UnboundedReceiver<GameEvent>;

/// Drives a session running in its own task.
///
/// Every method is answered by the session task once it has applied (or
/// refused) the request, so a successful `play` means the play is in the
/// local replica and its envelopes are written.
#[derive(Debug)]
pub struct PeerHandle {
    commands: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl PeerHandle {
    /// Play the given cards from the local hand.
    pub async fn play(&self, cards: Vec<Card>) -> Result<()> {
        Ok(self.request(|reply| Command::Play { cards, reply }).await??)
    }

    /// Draw cards for this turn.
    pub async fn draw(&self) -> Result<()> {
        Ok(self.request(|reply| Command::Draw { reply }).await??)
    }

    /// Pass the turn. Refused while the hand holds a legal play.
    pub async fn pass(&self) -> Result<()> {
        Ok(self.request(|reply| Command::Pass { reply }).await??)
    }

    /// The target number, if known. A client that does not know it yet asks
    /// the host again.
    pub async fn target_number(&self) -> Result<Option<i64>> {
        self.request(|reply| Command::TargetNumber { reply }).await
    }

    /// A copy of the session state.
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Stop the session and close the connection.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown).await;
        if let Err(e) = self.task.await {
            tracing::warn!("session task failed: {}", e);
        }
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| PeerError::Stopped)?;
        response.await.map_err(|_| PeerError::Stopped)
    }
}

/// Run `session` over an already established byte stream.
///
/// A client session announces itself as soon as it starts; a host session
/// waits for the client's `PlayerReady`.
pub fn spawn<R, W>(
    session: GameSession,
    reader: R,
    writer: W,
    request_timeout: Duration,
) -> (PeerHandle, Events)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let receiver = spawn_receiver(FrameReader::new(reader), inbound_tx);
    let actor = SessionActor::new(
        session,
        FrameWriter::new(writer),
        receiver,
        inbound_rx,
        command_rx,
        event_tx,
        request_timeout,
    );
    let task = tokio::spawn(actor.run());

    (
        PeerHandle {
            commands: command_tx,
            task,
        },
        event_rx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use numduel_core::{AbortReason, ActionError, Phase, RulesConfig};
    use numduel_types::{
        Envelope, FieldSchedule, GameStart, Message, MessageType, Operator, PlayerIndex, Seq,
        SkipTurn, TargetNumber,
    };
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

    /// The far end of a client session, played by hand.
    struct FakeHost {
        reader: FrameReader<ReadHalf<DuplexStream>>,
        writer: FrameWriter<WriteHalf<DuplexStream>>,
        seq: Seq,
    }

    impl FakeHost {
        async fn send(&mut self, message: Message) {
            self.seq = self.seq.next();
            let envelope = Envelope::new(self.seq, PlayerIndex::HOST, message);
            self.writer.send(&envelope).await.unwrap();
        }

        async fn recv(&mut self) -> Envelope {
            tokio::time::timeout(Duration::from_secs(5), self.reader.next_envelope())
                .await
                .expect("timed out reading from client")
                .unwrap()
                .expect("client closed the connection")
        }

        /// Deal a fixed hand and hand the turn to the client.
        async fn start_client_turn(&mut self) {
            assert_eq!(self.recv().await.message_type(), MessageType::PlayerReady);
            self.send(Message::GameStart(GameStart {
                player_index: PlayerIndex::HOST,
                initial_hand: vec![Card::Number(3), Card::Operator(Operator::Add)],
                host_hand_size: 6,
                field_schedule: FieldSchedule::none(),
            }))
            .await;
            self.send(Message::TargetNumber(TargetNumber {
                player_index: PlayerIndex::HOST,
                target_number: 40,
            }))
            .await;
            self.send(Message::SkipTurn(SkipTurn {
                player_index: PlayerIndex::HOST,
                skip_turn: false,
            }))
            .await;
        }
    }

    fn client(request_timeout: Duration) -> (PeerHandle, Events, FakeHost) {
        let (near, far) = tokio::io::duplex(8192);
        let (read, write) = tokio::io::split(near);
        let (handle, events) = spawn(
            GameSession::client(RulesConfig::default()),
            read,
            write,
            request_timeout,
        );
        let (far_read, far_write) = tokio::io::split(far);
        let host = FakeHost {
            reader: FrameReader::new(far_read),
            writer: FrameWriter::new(far_write),
            seq: Seq::zero(),
        };
        (handle, events, host)
    }

    async fn wait_for(events: &mut Events, pred: impl Fn(&GameEvent) -> bool) -> GameEvent {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match events.recv().await {
                    Some(event) if pred(&event) => return event,
                    Some(_) => continue,
                    None => panic!("event stream closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    async fn wait_for_turn(events: &mut Events, player: PlayerIndex) {
        wait_for(events, |e| {
            matches!(e, GameEvent::TurnChanged { player: p, .. } if *p == player)
        })
        .await;
    }

    #[tokio::test]
    async fn client_announces_itself() {
        let (handle, _events, mut host) = client(Duration::from_secs(10));
        let ready = host.recv().await;
        assert_eq!(ready.sender, PlayerIndex::CLIENT);
        assert_eq!(ready.seq, Seq::new(1));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn out_of_turn_action_is_refused() {
        let (handle, mut events, mut host) = client(Duration::from_secs(10));
        assert_eq!(host.recv().await.message_type(), MessageType::PlayerReady);
        host.send(Message::GameStart(GameStart {
            player_index: PlayerIndex::HOST,
            initial_hand: vec![Card::Number(3)],
            host_hand_size: 6,
            field_schedule: FieldSchedule::none(),
        }))
        .await;
        wait_for(&mut events, |e| matches!(e, GameEvent::GameStarted { .. })).await;

        let err = handle.draw().await.unwrap_err();
        assert!(matches!(err, PeerError::Action(ActionError::NotYourTurn)));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn unanswered_draw_aborts_as_unresponsive() {
        let (handle, mut events, mut host) = client(Duration::from_millis(300));
        host.start_client_turn().await;
        wait_for_turn(&mut events, PlayerIndex::CLIENT).await;

        handle.draw().await.unwrap();
        assert_eq!(host.recv().await.message_type(), MessageType::DrawCard);

        let event = wait_for(&mut events, |e| matches!(e, GameEvent::Aborted(_))).await;
        assert_eq!(event, GameEvent::Aborted(AbortReason::PeerUnresponsive));
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, Phase::Aborted(AbortReason::PeerUnresponsive));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn connection_loss_aborts_session() {
        let (handle, mut events, mut host) = client(Duration::from_secs(10));
        host.start_client_turn().await;
        wait_for_turn(&mut events, PlayerIndex::CLIENT).await;
        drop(host);

        let event = wait_for(&mut events, |e| matches!(e, GameEvent::Aborted(_))).await;
        assert_eq!(event, GameEvent::Aborted(AbortReason::ConnectionLost));
        let err = handle.play(vec![Card::Number(3)]).await.unwrap_err();
        assert!(matches!(err, PeerError::Action(ActionError::GameOver)));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn protocol_violation_aborts_and_closes() {
        let (handle, mut events, mut host) = client(Duration::from_secs(10));
        host.start_client_turn().await;
        wait_for_turn(&mut events, PlayerIndex::CLIENT).await;

        // a second, different target number
        host.send(Message::TargetNumber(TargetNumber {
            player_index: PlayerIndex::HOST,
            target_number: 41,
        }))
        .await;

        let event = wait_for(&mut events, |e| matches!(e, GameEvent::Aborted(_))).await;
        assert!(matches!(
            event,
            GameEvent::Aborted(AbortReason::ProtocolViolation(_))
        ));
        let closed = tokio::time::timeout(Duration::from_secs(5), host.reader.next_envelope())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed, None);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn target_number_is_answered_locally() {
        let (handle, mut events, mut host) = client(Duration::from_secs(10));
        host.start_client_turn().await;
        wait_for(&mut events, |e| matches!(e, GameEvent::TargetSet(40))).await;
        assert_eq!(handle.target_number().await.unwrap(), Some(40));
        handle.shutdown().await;
    }
}
