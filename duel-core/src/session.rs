//! The game session: one replica of the shared game state.
//!
//! A [`GameSession`] is owned by exactly one task. Local actions (`play`,
//! `draw`, `pass`) are checked synchronously and either refused with an
//! [`ActionError`] or applied at once; remote envelopes go through
//! [`GameSession::apply`]. Both return [`Output`]s: envelopes for the peer and
//! [`GameEvent`]s for whoever displays the game. Nothing here performs I/O.
//!
//! The host seat owns the [`Deck`] and all randomness. The client seat only
//! requests draws and the target number and applies what the host returns.

use numduel_types::{
    Card, DeckCounts, DrawCard, DrawCardResponse, Envelope, FieldModifier, FieldSchedule,
    FreezeStatus, GameOver, GameOverReason, GameStart, Message, PlayerIndex, PlayerReady,
    RequestTargetNumber, ScoreSync, Seq, Skill, SkillCast, SkipTurn, TargetNumber, Turn,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

use crate::deck::{Deck, DeckConfig, DeckMirror};
use crate::error::{ActionError, SessionError};
use crate::rules::RulesConfig;
use crate::scoring::{has_legal_play, resolve, Play};
use crate::state::{AbortReason, Advance, Gate, Outcome, PendingRequest, Phase, TurnState};

/// Which side of the connection this replica is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Seat 0: accepts the connection, owns the deck.
    Host,
    /// Seat 1: connects, requests draws.
    Client,
}

impl Role {
    /// The seat this role plays.
    pub fn seat(self) -> PlayerIndex {
        match self {
            Role::Host => PlayerIndex::HOST,
            Role::Client => PlayerIndex::CLIENT,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Host => f.write_str("host"),
            Role::Client => f.write_str("client"),
        }
    }
}

/// Something the session wants done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Write this envelope to the peer.
    Send(Envelope),
    /// Tell the display collaborator.
    Event(GameEvent),
}

/// Notifications for the display collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Replace the displayed hand.
    ShowHand(Vec<Card>),
    /// A card joined the hand.
    AddCard(Card),
    /// A card left the hand.
    RemoveCard(Card),
    /// A transient one-line message.
    ShowResult(String),
    /// Remaining deck counts changed.
    CardCounts(DeckCounts),
    /// The game began.
    GameStarted {
        /// Seat that acts first.
        first: PlayerIndex,
        /// The local initial hand.
        hand: Vec<Card>,
        /// When the special field applies.
        schedule: FieldSchedule,
    },
    /// The target number is known.
    TargetSet(i64),
    /// The opponent did something.
    OpponentAction(Message),
    /// The turn moved.
    TurnChanged {
        /// The player now acting.
        player: PlayerIndex,
        /// The current round.
        round: u32,
        /// The field in force.
        field: FieldModifier,
    },
    /// One or both scores changed.
    ScoresChanged([i64; 2]),
    /// The game finished.
    GameOver(Outcome),
    /// The session was abandoned.
    Aborted(AbortReason),
}

/// A point-in-time copy of a session, for display and status queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// This replica's role.
    pub role: Role,
    /// Lifecycle phase.
    pub phase: Phase,
    /// Current round.
    pub round: u32,
    /// Field in force.
    pub field: FieldModifier,
    /// Scores indexed by seat.
    pub scores: [i64; 2],
    /// Frozen flags indexed by seat.
    pub frozen: [bool; 2],
    /// The target, once known.
    pub target: Option<i64>,
    /// The local hand.
    pub hand: Vec<Card>,
    /// Cards the opponent holds.
    pub opponent_hand_size: usize,
    /// Remaining cards per kind in the host's draw pile.
    pub deck_counts: DeckCounts,
    /// Whether the acting player already drew this turn.
    pub has_drawn: bool,
    /// Unanswered request, if any.
    pub pending: Option<PendingRequest>,
}

#[derive(Debug)]
enum Pile {
    Host { deck: Deck, rng: StdRng },
    Client { mirror: DeckMirror },
}

type Checked = Result<(), String>;

/// One replica of the game.
#[derive(Debug)]
pub struct GameSession {
    role: Role,
    local: PlayerIndex,
    rules: RulesConfig,
    state: TurnState,
    target: Option<i64>,
    hand: Vec<Card>,
    opponent_hand: usize,
    played: [Vec<Card>; 2],
    pile: Pile,
    next_seq: Seq,
    last_seen: Seq,
    joined: bool,
    pending_draw: bool,
    pending_target: bool,
}

impl GameSession {
    /// Create the host replica. `seed` makes deck order, target and field
    /// reproducible.
    pub fn host(rules: RulesConfig, deck: DeckConfig, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let deck = Deck::new(deck, StdRng::seed_from_u64(rng.gen()));
        Self::with_pile(Role::Host, rules, Pile::Host { deck, rng })
    }

    /// Create the client replica.
    pub fn client(rules: RulesConfig) -> Self {
        Self::with_pile(
            Role::Client,
            rules,
            Pile::Client {
                mirror: DeckMirror::default(),
            },
        )
    }

    fn with_pile(role: Role, rules: RulesConfig, pile: Pile) -> Self {
        Self {
            role,
            local: role.seat(),
            state: TurnState::new(&rules),
            rules,
            target: None,
            hand: Vec::new(),
            opponent_hand: 0,
            played: [Vec::new(), Vec::new()],
            pile,
            next_seq: Seq::zero(),
            last_seen: Seq::zero(),
            joined: false,
            pending_draw: false,
            pending_target: false,
        }
    }

    // ===========================================
    // Queries
    // ===========================================

    /// This replica's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The local seat.
    pub fn local(&self) -> PlayerIndex {
        self.local
    }

    /// Current phase.
    pub fn phase(&self) -> &Phase {
        self.state.phase()
    }

    /// The abort reason, if the session was abandoned.
    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match self.state.phase() {
            Phase::Aborted(reason) => Some(reason),
            _ => None,
        }
    }

    /// The target number, once known.
    pub fn target_number(&self) -> Option<i64> {
        self.target
    }

    /// Both scores.
    pub fn scores(&self) -> [i64; 2] {
        self.state.scores()
    }

    /// The local hand.
    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    /// The oldest unanswered request, if any.
    pub fn pending(&self) -> Option<PendingRequest> {
        if self.pending_draw {
            Some(PendingRequest::Draw)
        } else if self.pending_target {
            Some(PendingRequest::Target)
        } else {
            None
        }
    }

    /// Remaining cards per kind in the host's draw pile.
    pub fn deck_counts(&self) -> DeckCounts {
        match &self.pile {
            Pile::Host { deck, .. } => deck.counts(),
            Pile::Client { mirror } => mirror.counts(),
        }
    }

    /// A copy of the state for display.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            role: self.role,
            phase: self.state.phase().clone(),
            round: self.state.round(),
            field: self.state.field(),
            scores: self.state.scores(),
            frozen: PlayerIndex::BOTH.map(|p| self.state.is_frozen(p)),
            target: self.target,
            hand: self.hand.clone(),
            opponent_hand_size: self.opponent_hand,
            deck_counts: self.deck_counts(),
            has_drawn: self.state.has_drawn(),
            pending: self.pending(),
        }
    }

    // ===========================================
    // Setup
    // ===========================================

    /// Client: announce readiness to the host.
    pub fn join(&mut self) -> Result<Vec<Output>, ActionError> {
        if self.role != Role::Client {
            return Err(ActionError::WrongRole("client"));
        }
        if self.joined || *self.state.phase() != Phase::AwaitingSetup {
            return Err(ActionError::AlreadyStarted);
        }
        self.joined = true;

        let mut out = Vec::new();
        self.send(
            &mut out,
            Message::PlayerReady(PlayerReady {
                player_index: self.local,
            }),
        );
        Ok(out)
    }

    /// Host: the client is ready. Deal both hands, pick the target and the
    /// field schedule, and start the game.
    pub fn peer_ready(&mut self) -> Result<Vec<Output>, ActionError> {
        if *self.state.phase() != Phase::AwaitingSetup {
            return Err(ActionError::AlreadyStarted);
        }
        let Pile::Host { deck, rng } = &mut self.pile else {
            return Err(ActionError::WrongRole("host"));
        };

        deck.initialize();
        let host_hand = deck.deal_initial_hand(&self.rules);
        let client_hand = deck.deal_initial_hand(&self.rules);
        let target = rng.gen_range(self.rules.target_range());
        let schedule = if self.rules.field_round == 0 {
            FieldSchedule::none()
        } else {
            FieldSchedule {
                round: self.rules.field_round,
                modifier: if rng.gen_bool(0.5) {
                    FieldModifier::Square
                } else {
                    FieldModifier::SquareRoot
                },
            }
        };

        self.hand = host_hand;
        self.opponent_hand = client_hand.len();
        self.target = Some(target);
        self.state.start(PlayerIndex::HOST, schedule);
        tracing::info!(
            target_number = target,
            field_round = schedule.round,
            field = %schedule.modifier,
            "game started"
        );

        let mut out = Vec::new();
        let host_hand_size = self.hand.len() as u32;
        self.send(
            &mut out,
            Message::GameStart(GameStart {
                player_index: PlayerIndex::HOST,
                initial_hand: client_hand,
                host_hand_size,
                field_schedule: schedule,
            }),
        );
        self.send(
            &mut out,
            Message::TargetNumber(TargetNumber {
                player_index: self.local,
                target_number: target,
            }),
        );
        let counts = self.deck_counts();
        self.send(&mut out, Message::DeckUpdate(counts));

        emit(&mut out, GameEvent::ShowHand(self.hand.clone()));
        emit(
            &mut out,
            GameEvent::GameStarted {
                first: PlayerIndex::HOST,
                hand: self.hand.clone(),
                schedule,
            },
        );
        emit(&mut out, GameEvent::TargetSet(target));
        emit(&mut out, GameEvent::CardCounts(counts));
        self.emit_turn(&mut out);
        Ok(out)
    }

    /// Client: ask the host for the target number if it is still unknown.
    pub fn request_target(&mut self) -> Result<Vec<Output>, ActionError> {
        if self.role != Role::Client {
            return Err(ActionError::WrongRole("client"));
        }
        if self.state.phase().is_terminal() {
            return Err(ActionError::GameOver);
        }
        let mut out = Vec::new();
        if self.target.is_none() {
            self.pending_target = true;
            self.send(
                &mut out,
                Message::RequestTargetNumber(RequestTargetNumber {
                    player_index: self.local,
                }),
            );
        }
        Ok(out)
    }

    // ===========================================
    // Local actions
    // ===========================================

    /// Play the selected cards from the hand.
    pub fn play(&mut self, cards: Vec<Card>) -> Result<Vec<Output>, ActionError> {
        self.check_can_act()?;
        let play = Play::from_cards(cards)?;
        self.take_from_hand(play.cards())?;

        let actor = self.local;
        let mut out = Vec::new();
        for card in play.cards() {
            emit(&mut out, GameEvent::RemoveCard(*card));
        }

        let field = self.state.field();
        let score = self.apply_play(actor, &play);
        if play.is_arithmetic() {
            self.send(
                &mut out,
                Message::Turn(Turn {
                    player_index: actor,
                    played_cards: play.cards().to_vec(),
                    result: score,
                    current_number: score,
                    current_field: field,
                }),
            );
        } else if let Some(skill_card) = play.cards().first() {
            self.send(
                &mut out,
                Message::Skill(SkillCast {
                    player_index: actor,
                    skill_card: *skill_card,
                    is_skill_success: true,
                }),
            );
        }
        match play.skill() {
            Some(Skill::Freeze) => self.send(
                &mut out,
                Message::FreezeStatus(FreezeStatus {
                    player_index: actor.other(),
                    is_frozen: true,
                }),
            ),
            Some(Skill::Mirror) => {
                let player_scores = self.state.scores();
                self.send(
                    &mut out,
                    Message::ScoreSync(ScoreSync {
                        player_index: actor,
                        player_scores,
                    }),
                );
            }
            None => {}
        }

        self.report_play(actor, &play, &mut out);
        self.after_play(actor, &play, true, &mut out);
        Ok(out)
    }

    /// Draw cards: directly from the deck on the host, by request on the
    /// client. Once per turn.
    pub fn draw(&mut self) -> Result<Vec<Output>, ActionError> {
        self.check_can_act()?;
        if self.state.has_drawn() {
            return Err(ActionError::AlreadyDrawn);
        }
        self.state.mark_drawn();

        let mut out = Vec::new();
        match self.role {
            Role::Host => {
                let cards = self.host_draw(self.rules.draw_count);
                if cards.is_empty() {
                    emit(&mut out, GameEvent::ShowResult("the deck is empty".into()));
                }
                for card in &cards {
                    emit(&mut out, GameEvent::AddCard(*card));
                }
                self.hand.extend(cards.iter().copied());
                self.send(
                    &mut out,
                    Message::DrawCard(DrawCard {
                        player_index: self.local,
                        cards_drawn: cards.len() as u32,
                    }),
                );
                emit(&mut out, GameEvent::CardCounts(self.deck_counts()));
            }
            Role::Client => {
                self.pending_draw = true;
                self.send(
                    &mut out,
                    Message::DrawCard(DrawCard {
                        player_index: self.local,
                        cards_drawn: self.rules.draw_count,
                    }),
                );
            }
        }
        Ok(out)
    }

    /// Give up the turn. Only allowed when the hand holds no legal play.
    pub fn pass(&mut self) -> Result<Vec<Output>, ActionError> {
        self.check_can_act()?;
        if has_legal_play(&self.hand) {
            return Err(ActionError::LegalPlayAvailable);
        }

        let mut out = Vec::new();
        self.send(
            &mut out,
            Message::SkipTurn(SkipTurn {
                player_index: self.local,
                skip_turn: false,
            }),
        );
        emit(
            &mut out,
            GameEvent::ShowResult(format!("{} passes", self.local)),
        );
        self.pass_turn(true, &mut out);
        Ok(out)
    }

    /// Abandon the session. Returns nothing if it already ended.
    pub fn abort(&mut self, reason: AbortReason) -> Vec<Output> {
        if !self.state.abort(reason.clone()) {
            return Vec::new();
        }
        self.pending_draw = false;
        self.pending_target = false;
        tracing::warn!(role = %self.role, %reason, "session aborted");
        vec![Output::Event(GameEvent::Aborted(reason))]
    }

    fn check_can_act(&self) -> Result<(), ActionError> {
        match self.state.phase() {
            Phase::AwaitingSetup => return Err(ActionError::NotStarted),
            Phase::GameOver(_) | Phase::Aborted(_) => return Err(ActionError::GameOver),
            Phase::AwaitingAction { .. } => {}
        }
        match self.state.gate(self.local, self.pending()) {
            Gate::Waiting => Err(ActionError::NotYourTurn),
            Gate::Frozen => Err(ActionError::Frozen),
            Gate::AwaitingDraw => Err(ActionError::RequestPending),
            Gate::CanPlay if self.target.is_none() => Err(ActionError::RequestPending),
            Gate::CanPlay => Ok(()),
        }
    }

    fn take_from_hand(&mut self, cards: &[Card]) -> Result<(), ActionError> {
        let mut remaining = self.hand.clone();
        for card in cards {
            let pos = remaining
                .iter()
                .position(|c| c == card)
                .ok_or(ActionError::NotInHand(*card))?;
            remaining.remove(pos);
        }
        self.hand = remaining;
        Ok(())
    }

    // ===========================================
    // Remote envelopes
    // ===========================================

    /// Apply an envelope from the peer.
    ///
    /// Envelopes whose `seq` is not newer than the last one applied are
    /// dropped. On a protocol violation the session is aborted and the
    /// error returned.
    pub fn apply(&mut self, envelope: Envelope) -> Result<Vec<Output>, SessionError> {
        let message_type = envelope.message_type();
        if envelope.seq <= self.last_seen {
            tracing::warn!(
                seq = %envelope.seq,
                last = %self.last_seen,
                %message_type,
                "dropping replayed envelope"
            );
            return Ok(Vec::new());
        }
        self.last_seen = envelope.seq;

        if self.state.phase().is_terminal() {
            tracing::debug!(%message_type, "session over, ignoring envelope");
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        match self.dispatch(envelope, &mut out) {
            Ok(()) => Ok(out),
            Err(reason) => {
                tracing::warn!(%message_type, %reason, "protocol violation");
                self.state.abort(AbortReason::ProtocolViolation(format!(
                    "{message_type}: {reason}"
                )));
                self.pending_draw = false;
                self.pending_target = false;
                Err(SessionError::ProtocolViolation {
                    message_type,
                    reason,
                })
            }
        }
    }

    fn dispatch(&mut self, envelope: Envelope, out: &mut Vec<Output>) -> Checked {
        let sender = envelope.sender;
        if sender != self.local.other() {
            return Err(format!("envelope claims to come from {sender}"));
        }
        tracing::debug!(
            seq = %envelope.seq,
            message_type = %envelope.message_type(),
            "applying envelope"
        );

        if let (Some(counts), Pile::Client { mirror }) = (envelope.deck_counts, &mut self.pile) {
            if mirror.counts() != counts {
                mirror.update(counts);
                emit(out, GameEvent::CardCounts(counts));
            }
        }

        match (self.role, envelope.message) {
            (Role::Host, Message::PlayerReady(_)) => match self.peer_ready() {
                Ok(outputs) => {
                    out.extend(outputs);
                    Ok(())
                }
                Err(err) => {
                    tracing::warn!(%err, "ignoring repeated PlayerReady");
                    Ok(())
                }
            },
            (Role::Client, Message::GameStart(msg)) => self.on_game_start(msg, out),
            (Role::Client, Message::TargetNumber(msg)) => self.on_target(msg, out),
            (Role::Host, Message::RequestTargetNumber(_)) => {
                if let Some(target) = self.target {
                    self.send(
                        out,
                        Message::TargetNumber(TargetNumber {
                            player_index: self.local,
                            target_number: target,
                        }),
                    );
                }
                Ok(())
            }
            (_, Message::DrawCard(msg)) => self.on_draw(sender, msg, out),
            (Role::Client, Message::DrawCardResponse(msg)) => self.on_draw_response(msg, out),
            (Role::Client, Message::DeckUpdate(_)) => Ok(()),
            (_, Message::Turn(msg)) => self.on_turn(sender, msg, out),
            (_, Message::Skill(msg)) => self.on_skill(sender, msg, out),
            (_, Message::FreezeStatus(msg)) => self.on_freeze_status(msg),
            (_, Message::ScoreSync(msg)) => self.on_score_sync(msg, out),
            (_, Message::SkipTurn(msg)) => self.on_skip(sender, msg, out),
            (_, Message::GameOver(msg)) => self.on_game_over(msg, out),
            (role, message) => Err(format!(
                "{} is not accepted by the {role}",
                message.message_type()
            )),
        }
    }

    fn on_game_start(&mut self, msg: GameStart, out: &mut Vec<Output>) -> Checked {
        if *self.state.phase() != Phase::AwaitingSetup {
            return Err("game already started".into());
        }
        self.hand = msg.initial_hand;
        self.opponent_hand = msg.host_hand_size as usize;
        self.state.start(msg.player_index, msg.field_schedule);
        if self.target.is_none() {
            self.pending_target = true;
        }
        tracing::info!(
            hand = self.hand.len(),
            field_round = msg.field_schedule.round,
            "game started"
        );

        emit(out, GameEvent::ShowHand(self.hand.clone()));
        emit(
            out,
            GameEvent::GameStarted {
                first: msg.player_index,
                hand: self.hand.clone(),
                schedule: msg.field_schedule,
            },
        );
        self.emit_turn(out);
        Ok(())
    }

    fn on_target(&mut self, msg: TargetNumber, out: &mut Vec<Output>) -> Checked {
        match self.target {
            Some(target) if target == msg.target_number => {}
            Some(target) => {
                return Err(format!(
                    "target changed from {target} to {}",
                    msg.target_number
                ))
            }
            None => {
                self.target = Some(msg.target_number);
                emit(out, GameEvent::TargetSet(msg.target_number));
            }
        }
        self.pending_target = false;
        Ok(())
    }

    fn on_draw(&mut self, sender: PlayerIndex, msg: DrawCard, out: &mut Vec<Output>) -> Checked {
        self.expect_actor(sender, msg.player_index)?;
        if self.state.has_drawn() {
            return Err("second draw in one turn".into());
        }
        self.state.mark_drawn();
        emit(out, GameEvent::OpponentAction(Message::DrawCard(msg.clone())));

        match self.role {
            Role::Host => {
                let cards = self.host_draw(msg.cards_drawn.min(self.rules.draw_count));
                self.opponent_hand += cards.len();
                let counts = self.deck_counts();
                self.send(
                    out,
                    Message::DrawCardResponse(DrawCardResponse {
                        player_index: sender,
                        cards_drawn: cards.len() as u32,
                        drawn_cards: cards,
                    }),
                );
                self.send(out, Message::DeckUpdate(counts));
                emit(out, GameEvent::CardCounts(counts));
            }
            Role::Client => {
                self.opponent_hand += msg.cards_drawn as usize;
            }
        }
        Ok(())
    }

    fn on_draw_response(&mut self, msg: DrawCardResponse, out: &mut Vec<Output>) -> Checked {
        if !self.pending_draw {
            return Err("no draw was requested".into());
        }
        if msg.drawn_cards.len() != msg.cards_drawn as usize {
            return Err(format!(
                "{} cards announced, {} sent",
                msg.cards_drawn,
                msg.drawn_cards.len()
            ));
        }
        self.pending_draw = false;
        if msg.drawn_cards.is_empty() {
            emit(out, GameEvent::ShowResult("the deck is empty".into()));
        }
        for card in &msg.drawn_cards {
            emit(out, GameEvent::AddCard(*card));
        }
        self.hand.extend(msg.drawn_cards);
        Ok(())
    }

    fn on_turn(&mut self, sender: PlayerIndex, msg: Turn, out: &mut Vec<Output>) -> Checked {
        self.expect_actor(sender, msg.player_index)?;
        let play = Play::from_cards(msg.played_cards.clone()).map_err(|e| e.to_string())?;
        if !play.is_arithmetic() {
            return Err("turn without a number and an operator".into());
        }
        let verify = self.rules.verify_remote_results;
        if verify && msg.current_field != self.state.field() {
            return Err(format!(
                "scored under a {} but the round has a {}",
                msg.current_field,
                self.state.field()
            ));
        }

        let score = self.apply_play(sender, &play);
        if verify && score != msg.result {
            return Err(format!(
                "result {} does not match recomputed {score}",
                msg.result
            ));
        }
        if !verify {
            self.state.set_score(sender, msg.result);
        }
        self.opponent_hand = self.opponent_hand.saturating_sub(play.cards().len());

        emit(out, GameEvent::OpponentAction(Message::Turn(msg)));
        self.report_play(sender, &play, out);
        self.after_play(sender, &play, false, out);
        Ok(())
    }

    fn on_skill(&mut self, sender: PlayerIndex, msg: SkillCast, out: &mut Vec<Output>) -> Checked {
        self.expect_actor(sender, msg.player_index)?;
        if msg.skill_card.skill().is_none() {
            return Err(format!("{} is not a skill card", msg.skill_card));
        }
        let play = Play::from_cards(vec![msg.skill_card]).map_err(|e| e.to_string())?;
        self.apply_play(sender, &play);
        self.opponent_hand = self.opponent_hand.saturating_sub(1);

        emit(out, GameEvent::OpponentAction(Message::Skill(msg)));
        self.report_play(sender, &play, out);
        self.after_play(sender, &play, false, out);
        Ok(())
    }

    fn on_freeze_status(&mut self, msg: FreezeStatus) -> Checked {
        let current = self.state.is_frozen(msg.player_index);
        if current != msg.is_frozen && self.rules.verify_remote_results {
            return Err(format!(
                "{} frozen={} but replica has {current}",
                msg.player_index, msg.is_frozen
            ));
        }
        self.state.set_frozen(msg.player_index, msg.is_frozen);
        Ok(())
    }

    fn on_score_sync(&mut self, msg: ScoreSync, out: &mut Vec<Output>) -> Checked {
        let local = self.state.scores();
        if local != msg.player_scores {
            if self.rules.verify_remote_results {
                return Err(format!(
                    "scores {:?} do not match replica {local:?}",
                    msg.player_scores
                ));
            }
            self.state.set_scores(msg.player_scores);
            emit(out, GameEvent::ScoresChanged(msg.player_scores));
        }
        Ok(())
    }

    /// Every play and skip is replayed locally, so a verifying replica has
    /// always finished on its own before the peer's `GameOver` arrives.
    fn on_game_over(&mut self, msg: GameOver, out: &mut Vec<Output>) -> Checked {
        if self.rules.verify_remote_results {
            return Err(format!(
                "game over with scores {:?} while the replica at {:?} is still running",
                msg.player_scores,
                self.state.scores()
            ));
        }
        let outcome = Outcome {
            winner: msg.winner,
            scores: msg.player_scores,
            reason: msg.reason,
        };
        self.state.set_scores(msg.player_scores);
        self.finish(outcome, false, out);
        Ok(())
    }

    fn on_skip(&mut self, sender: PlayerIndex, msg: SkipTurn, out: &mut Vec<Output>) -> Checked {
        if msg.player_index != sender || self.state.current() != Some(sender) {
            return Err(format!("{sender} skipped out of turn"));
        }
        if msg.skip_turn {
            if !self.state.is_frozen(sender) && self.rules.verify_remote_results {
                return Err(format!("{sender} skipped as frozen but is not frozen"));
            }
            self.state.set_frozen(sender, false);
        } else if self.state.is_frozen(sender) {
            return Err(format!("{sender} is frozen and cannot pass"));
        }

        let text = if msg.skip_turn {
            format!("{sender} is frozen; turn skipped")
        } else {
            format!("{sender} passes")
        };
        emit(out, GameEvent::OpponentAction(Message::SkipTurn(msg)));
        emit(out, GameEvent::ShowResult(text));
        self.pass_turn(false, out);
        Ok(())
    }

    fn expect_actor(&self, sender: PlayerIndex, claimed: PlayerIndex) -> Checked {
        if claimed != sender {
            return Err(format!("{sender} acted as {claimed}"));
        }
        if self.state.current() != Some(sender) {
            return Err(format!("{sender} acted out of turn"));
        }
        if self.state.is_frozen(sender) {
            return Err(format!("{sender} acted while frozen"));
        }
        Ok(())
    }

    // ===========================================
    // Shared transitions
    // ===========================================

    /// Skill effect first, then scoring. Returns the actor's new score.
    fn apply_play(&mut self, actor: PlayerIndex, play: &Play) -> i64 {
        match play.skill() {
            Some(Skill::Freeze) => self.state.set_frozen(actor.other(), true),
            Some(Skill::Mirror) => self.state.swap_scores(),
            None => {}
        }
        if play.is_arithmetic() {
            let score = resolve(self.state.score(actor), play.cards(), self.state.field());
            self.state.set_score(actor, score);
        }
        self.played[actor.index()].extend(play.cards().iter().copied());
        self.state.score(actor)
    }

    fn report_play(&self, actor: PlayerIndex, play: &Play, out: &mut Vec<Output>) {
        let cards = play
            .cards()
            .iter()
            .map(Card::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        let text = match play.skill() {
            Some(Skill::Freeze) if play.is_skill_only() => {
                format!("{actor} froze {}", actor.other())
            }
            Some(Skill::Mirror) if play.is_skill_only() => format!("{actor} swapped the scores"),
            _ => format!("{actor} played {cards} = {}", self.state.score(actor)),
        };
        emit(out, GameEvent::ShowResult(text));
        emit(out, GameEvent::ScoresChanged(self.state.scores()));
    }

    /// Win check, then the turn passes unless a Freeze was in the play.
    fn after_play(&mut self, actor: PlayerIndex, play: &Play, announce: bool, out: &mut Vec<Output>) {
        if self.state.reached(actor, self.target) {
            let outcome = Outcome {
                winner: Some(actor),
                scores: self.state.scores(),
                reason: GameOverReason::TargetReached,
            };
            self.finish(outcome, announce, out);
            return;
        }
        if play.is_arithmetic() && play.skill() != Some(Skill::Freeze) {
            self.pass_turn(announce, out);
        }
    }

    fn pass_turn(&mut self, announce: bool, out: &mut Vec<Output>) {
        match self.state.advance(self.target) {
            Advance::Next { player, frozen } => {
                self.emit_turn(out);
                if frozen && player == self.local {
                    self.skip_frozen_turn(out);
                }
            }
            Advance::RoundsExhausted => {
                if let Phase::GameOver(outcome) = self.state.phase().clone() {
                    self.announce_game_over(outcome, announce, out);
                }
            }
            Advance::Stopped => {}
        }
    }

    fn skip_frozen_turn(&mut self, out: &mut Vec<Output>) {
        let me = self.local;
        tracing::info!(player = %me, "frozen, skipping turn");
        self.state.set_frozen(me, false);
        self.send(
            out,
            Message::SkipTurn(SkipTurn {
                player_index: me,
                skip_turn: true,
            }),
        );
        self.send(
            out,
            Message::FreezeStatus(FreezeStatus {
                player_index: me,
                is_frozen: false,
            }),
        );
        emit(
            out,
            GameEvent::ShowResult(format!("{me} is frozen; turn skipped")),
        );
        self.pass_turn(true, out);
    }

    fn finish(&mut self, outcome: Outcome, announce: bool, out: &mut Vec<Output>) {
        if self.state.finish(outcome.clone()) {
            self.announce_game_over(outcome, announce, out);
        }
    }

    fn announce_game_over(&mut self, outcome: Outcome, announce: bool, out: &mut Vec<Output>) {
        tracing::info!(%outcome, "game over");
        self.pending_draw = false;
        self.pending_target = false;
        if announce {
            self.send(
                out,
                Message::GameOver(GameOver {
                    winner: outcome.winner,
                    player_scores: outcome.scores,
                    reason: outcome.reason,
                }),
            );
        }
        emit(out, GameEvent::ShowResult(outcome.to_string()));
        emit(out, GameEvent::GameOver(outcome));
    }

    fn emit_turn(&self, out: &mut Vec<Output>) {
        if let Some(player) = self.state.current() {
            emit(
                out,
                GameEvent::TurnChanged {
                    player,
                    round: self.state.round(),
                    field: self.state.field(),
                },
            );
        }
    }

    /// Host draw. When both piles are empty, played cards are reclaimed into
    /// the discard pile first.
    fn host_draw(&mut self, count: u32) -> Vec<Card> {
        let Pile::Host { deck, .. } = &mut self.pile else {
            return Vec::new();
        };
        if deck.is_empty() && deck.discard_len() == 0 {
            for played in &mut self.played {
                deck.discard_all(played.drain(..));
            }
            tracing::debug!(cards = deck.discard_len(), "reclaimed played cards");
        }
        deck.draw_many(count)
    }

    fn send(&mut self, out: &mut Vec<Output>, message: Message) {
        self.next_seq = self.next_seq.next();
        let envelope = Envelope::new(self.next_seq, self.local, message);
        let envelope = match &self.pile {
            Pile::Host { deck, .. } => envelope.with_counts(deck.counts()),
            Pile::Client { .. } => envelope,
        };
        out.push(Output::Send(envelope));
    }
}

fn emit(out: &mut Vec<Output>, event: GameEvent) {
    out.push(Output::Event(event));
}

#[cfg(test)]
mod tests {
    use super::*;
    use numduel_types::{CardKind, MessageType, Operator};
    use std::collections::VecDeque;

    const ADD: Card = Card::Operator(Operator::Add);
    const MUL: Card = Card::Operator(Operator::Multiply);
    const FREEZE: Card = Card::Skill(Skill::Freeze);
    const MIRROR: Card = Card::Skill(Skill::Mirror);

    /// Two replicas wired back to back.
    struct Table {
        host: GameSession,
        client: GameSession,
        events: [Vec<GameEvent>; 2],
        sent: [Vec<Envelope>; 2],
    }

    impl Table {
        fn new(rules: RulesConfig) -> Self {
            let mut table = Self {
                host: GameSession::host(rules.clone(), DeckConfig::default(), Some(42)),
                client: GameSession::client(rules),
                events: [Vec::new(), Vec::new()],
                sent: [Vec::new(), Vec::new()],
            };
            let out = table.client.join().unwrap();
            table.deliver(PlayerIndex::CLIENT, out);
            table
        }

        fn seat(&mut self, player: PlayerIndex) -> &mut GameSession {
            if player.is_host() {
                &mut self.host
            } else {
                &mut self.client
            }
        }

        fn act(
            &mut self,
            player: PlayerIndex,
            action: impl FnOnce(&mut GameSession) -> Result<Vec<Output>, ActionError>,
        ) -> Result<(), ActionError> {
            let out = action(self.seat(player))?;
            self.deliver(player, out);
            Ok(())
        }

        fn deliver(&mut self, from: PlayerIndex, outputs: Vec<Output>) {
            let mut queue = VecDeque::new();
            self.collect(from, outputs, &mut queue);
            while let Some((to, envelope)) = queue.pop_front() {
                let out = self.seat(to).apply(envelope).unwrap();
                self.collect(to, out, &mut queue);
            }
        }

        fn collect(
            &mut self,
            from: PlayerIndex,
            outputs: Vec<Output>,
            queue: &mut VecDeque<(PlayerIndex, Envelope)>,
        ) {
            for output in outputs {
                match output {
                    Output::Send(envelope) => {
                        self.sent[from.index()].push(envelope.clone());
                        queue.push_back((from.other(), envelope));
                    }
                    Output::Event(event) => self.events[from.index()].push(event),
                }
            }
        }

        /// Give both seats known hands and the same target.
        fn rig(&mut self, host_hand: Vec<Card>, client_hand: Vec<Card>, target: i64) {
            self.host.opponent_hand = client_hand.len();
            self.client.opponent_hand = host_hand.len();
            self.host.hand = host_hand;
            self.client.hand = client_hand;
            self.host.target = Some(target);
            self.client.target = Some(target);
        }

        fn game_overs(&self, player: PlayerIndex) -> usize {
            self.events[player.index()]
                .iter()
                .filter(|e| matches!(e, GameEvent::GameOver(_)))
                .count()
        }

        fn sent_types(&self, player: PlayerIndex) -> Vec<MessageType> {
            self.sent[player.index()]
                .iter()
                .map(Envelope::message_type)
                .collect()
        }
    }

    fn table() -> Table {
        Table::new(RulesConfig::default())
    }

    fn conserved(table: &Table) -> usize {
        let Pile::Host { deck, .. } = &table.host.pile else {
            unreachable!()
        };
        deck.len()
            + deck.discard_len()
            + table.host.hand.len()
            + table.host.opponent_hand
            + table.host.played.iter().map(Vec::len).sum::<usize>()
    }

    // ===========================================
    // Setup
    // ===========================================

    #[test]
    fn handshake_starts_both_replicas() {
        let table = table();
        let first = Phase::AwaitingAction {
            player: PlayerIndex::HOST,
        };
        assert_eq!(table.host.phase(), &first);
        assert_eq!(table.client.phase(), &first);
        assert_eq!(table.host.hand().len(), 6);
        assert_eq!(table.client.hand().len(), 6);
        assert_eq!(table.host.target_number(), table.client.target_number());
        assert!((1..=99).contains(&table.host.target_number().unwrap()));
        assert_eq!(table.client.pending(), None);
        assert_eq!(table.client.deck_counts(), table.host.deck_counts());
        assert_eq!(
            table.sent_types(PlayerIndex::HOST),
            vec![
                MessageType::GameStart,
                MessageType::TargetNumber,
                MessageType::DeckUpdate
            ]
        );
    }

    #[test]
    fn deck_count_after_initial_hands() {
        let table = table();
        let total = DeckConfig::default().total();
        let hand_size = RulesConfig::default().hand_size();
        assert_eq!(
            table.client.deck_counts().total() as usize,
            total - 2 * hand_size
        );
        assert_eq!(conserved(&table), total);
    }

    #[test]
    fn initial_hands_have_fixed_shape() {
        let table = table();
        for hand in [table.host.hand(), table.client.hand()] {
            let count = |k| hand.iter().filter(|c| c.kind() == k).count();
            assert_eq!(count(CardKind::Number), 3);
            assert_eq!(count(CardKind::Operator), 2);
            assert_eq!(count(CardKind::Skill) + count(CardKind::ExtraOperator), 1);
        }
    }

    #[test]
    fn client_cannot_deal_and_host_cannot_join() {
        let mut client = GameSession::client(RulesConfig::default());
        assert_eq!(
            client.peer_ready().unwrap_err(),
            ActionError::WrongRole("host")
        );
        let mut host = GameSession::host(RulesConfig::default(), DeckConfig::default(), Some(1));
        assert_eq!(host.join().unwrap_err(), ActionError::WrongRole("client"));
    }

    #[test]
    fn actions_before_start_are_refused() {
        let mut client = GameSession::client(RulesConfig::default());
        assert_eq!(client.draw().unwrap_err(), ActionError::NotStarted);
    }

    #[test]
    fn target_request_is_answered_with_same_value() {
        let mut table = table();
        let target = table.host.target_number();
        table.client.target = None;
        table.act(PlayerIndex::CLIENT, GameSession::request_target).unwrap();
        assert_eq!(table.client.target_number(), target);
        assert_eq!(table.client.pending(), None);
    }

    // ===========================================
    // Turn gating
    // ===========================================

    #[test]
    fn out_of_turn_action_generates_no_traffic() {
        let mut table = table();
        let hand = table.client.hand().to_vec();
        assert_eq!(
            table.client.play(hand[..2].to_vec()).unwrap_err(),
            ActionError::NotYourTurn
        );
        assert_eq!(table.client.draw().unwrap_err(), ActionError::NotYourTurn);
        assert!(table.sent[PlayerIndex::CLIENT.index()].len() == 1);
        assert_eq!(table.client.next_seq, Seq::new(1));
    }

    #[test]
    fn play_requires_cards_in_hand() {
        let mut table = table();
        table.rig(vec![Card::Number(3), ADD], vec![], 50);
        assert_eq!(
            table.host.play(vec![Card::Number(9), ADD]).unwrap_err(),
            ActionError::NotInHand(Card::Number(9))
        );
        assert_eq!(table.host.hand().len(), 2);
    }

    #[test]
    fn pass_only_without_legal_play() {
        let mut table = table();
        table.rig(vec![Card::Number(3), ADD], vec![], 50);
        assert_eq!(
            table.host.pass().unwrap_err(),
            ActionError::LegalPlayAvailable
        );

        table.rig(vec![Card::Number(3)], vec![], 50);
        table.act(PlayerIndex::HOST, GameSession::pass).unwrap();
        assert_eq!(
            table.client.phase(),
            &Phase::AwaitingAction {
                player: PlayerIndex::CLIENT
            }
        );
    }

    // ===========================================
    // Scoring replication
    // ===========================================

    #[test]
    fn play_replicates_score_and_turn() {
        let mut table = table();
        table.rig(vec![Card::Number(4), ADD], vec![], 50);
        table
            .act(PlayerIndex::HOST, |s| s.play(vec![Card::Number(4), ADD]))
            .unwrap();

        assert_eq!(table.host.scores(), [5, 1]);
        assert_eq!(table.client.scores(), [5, 1]);
        assert_eq!(table.client.opponent_hand, 0);
        assert_eq!(
            table.client.phase(),
            &Phase::AwaitingAction {
                player: PlayerIndex::CLIENT
            }
        );
        assert!(table.events[PlayerIndex::CLIENT.index()]
            .iter()
            .any(|e| matches!(e, GameEvent::OpponentAction(Message::Turn(_)))));
    }

    #[test]
    fn mismatched_result_aborts_when_verifying() {
        let mut table = table();
        table.rig(vec![], vec![], 50);
        let forged = Envelope::new(
            Seq::new(99),
            PlayerIndex::HOST,
            Message::Turn(Turn {
                player_index: PlayerIndex::HOST,
                played_cards: vec![Card::Number(4), ADD],
                result: 40,
                current_number: 40,
                current_field: FieldModifier::Normal,
            }),
        );
        let err = table.client.apply(forged).unwrap_err();
        assert!(matches!(
            err,
            SessionError::ProtocolViolation {
                message_type: MessageType::Turn,
                ..
            }
        ));
        assert!(matches!(
            table.client.abort_reason(),
            Some(AbortReason::ProtocolViolation(_))
        ));
        assert_eq!(table.client.draw().unwrap_err(), ActionError::GameOver);
    }

    #[test]
    fn mismatched_result_is_trusted_without_verification() {
        let rules = RulesConfig {
            verify_remote_results: false,
            ..RulesConfig::default()
        };
        let mut table = Table::new(rules);
        table.rig(vec![], vec![], 50);
        let forged = Envelope::new(
            Seq::new(99),
            PlayerIndex::HOST,
            Message::Turn(Turn {
                player_index: PlayerIndex::HOST,
                played_cards: vec![Card::Number(4), ADD],
                result: 40,
                current_number: 40,
                current_field: FieldModifier::Normal,
            }),
        );
        table.client.apply(forged).unwrap();
        assert_eq!(table.client.scores(), [40, 1]);
    }

    #[test]
    fn inconsistent_card_kinds_are_a_violation() {
        let mut table = table();
        let forged = Envelope::new(
            Seq::new(99),
            PlayerIndex::HOST,
            Message::Skill(SkillCast {
                player_index: PlayerIndex::HOST,
                skill_card: Card::Number(3),
                is_skill_success: true,
            }),
        );
        assert!(table.client.apply(forged).is_err());
        assert!(table.client.phase().is_terminal());
    }

    #[test]
    fn host_only_messages_from_client_are_violations() {
        let mut table = table();
        let forged = Envelope::new(
            Seq::new(99),
            PlayerIndex::CLIENT,
            Message::DeckUpdate(DeckCounts::default()),
        );
        assert!(table.host.apply(forged).is_err());
    }

    #[test]
    fn replayed_envelope_is_dropped() {
        let mut table = table();
        table.rig(vec![Card::Number(4), ADD], vec![], 50);
        let out = table.host.play(vec![Card::Number(4), ADD]).unwrap();
        let turn = out
            .iter()
            .find_map(|o| match o {
                Output::Send(env) if env.message_type() == MessageType::Turn => Some(env.clone()),
                _ => None,
            })
            .unwrap();

        table.client.apply(turn.clone()).unwrap();
        assert_eq!(table.client.scores(), [5, 1]);
        assert!(table.client.apply(turn).unwrap().is_empty());
        assert_eq!(table.client.scores(), [5, 1]);
    }

    // ===========================================
    // Win detection
    // ===========================================

    #[test]
    fn reaching_target_ends_game_exactly_once() {
        let mut table = table();
        table.rig(vec![Card::Number(4), ADD, Card::Number(2), MUL], vec![], 5);
        table
            .act(PlayerIndex::HOST, |s| s.play(vec![Card::Number(4), ADD]))
            .unwrap();

        let expected = Outcome {
            winner: Some(PlayerIndex::HOST),
            scores: [5, 1],
            reason: GameOverReason::TargetReached,
        };
        assert_eq!(table.host.phase(), &Phase::GameOver(expected.clone()));
        assert_eq!(table.client.phase(), &Phase::GameOver(expected));
        assert_eq!(table.game_overs(PlayerIndex::HOST), 1);
        assert_eq!(table.game_overs(PlayerIndex::CLIENT), 1);

        // no turn advance was queued behind the win
        assert!(!table.events[0]
            .iter()
            .skip_while(|e| !matches!(e, GameEvent::GameOver(_)))
            .any(|e| matches!(e, GameEvent::TurnChanged { .. })));

        assert_eq!(
            table.host.play(vec![Card::Number(2), MUL]).unwrap_err(),
            ActionError::GameOver
        );
    }

    #[test]
    fn overshooting_target_also_wins() {
        let mut table = table();
        table.rig(vec![Card::Number(12), MUL], vec![], 10);
        table
            .act(PlayerIndex::HOST, |s| s.play(vec![Card::Number(12), MUL]))
            .unwrap();
        assert!(matches!(
            table.client.phase(),
            Phase::GameOver(Outcome {
                winner: Some(PlayerIndex::HOST),
                ..
            })
        ));
    }

    #[test]
    fn rounds_exhausted_picks_closest() {
        let rules = RulesConfig {
            max_rounds: 2,
            ..RulesConfig::default()
        };
        let mut table = Table::new(rules);
        table.rig(vec![], vec![], 50);
        table.host.state.set_scores([10, 45]);
        table.client.state.set_scores([10, 45]);

        for _ in 0..2 {
            table.act(PlayerIndex::HOST, GameSession::pass).unwrap();
            table.act(PlayerIndex::CLIENT, GameSession::pass).unwrap();
        }

        let expected = Outcome {
            winner: Some(PlayerIndex::CLIENT),
            scores: [10, 45],
            reason: GameOverReason::RoundsExhausted,
        };
        assert_eq!(table.host.phase(), &Phase::GameOver(expected.clone()));
        assert_eq!(table.client.phase(), &Phase::GameOver(expected));
        assert_eq!(table.game_overs(PlayerIndex::HOST), 1);
        assert_eq!(table.game_overs(PlayerIndex::CLIENT), 1);
    }

    #[test]
    fn unearned_game_over_aborts_when_verifying() {
        let mut table = table();
        let forged = Envelope::new(
            Seq::new(99),
            PlayerIndex::HOST,
            Message::GameOver(GameOver {
                winner: Some(PlayerIndex::HOST),
                player_scores: [1000, -5],
                reason: GameOverReason::TargetReached,
            }),
        );
        let err = table.client.apply(forged).unwrap_err();
        assert!(matches!(
            err,
            SessionError::ProtocolViolation {
                message_type: MessageType::GameOver,
                ..
            }
        ));
        assert_eq!(table.client.scores(), [1, 1]);
        assert!(matches!(
            table.client.abort_reason(),
            Some(AbortReason::ProtocolViolation(_))
        ));
    }

    #[test]
    fn game_over_is_trusted_without_verification() {
        let rules = RulesConfig {
            verify_remote_results: false,
            ..RulesConfig::default()
        };
        let mut table = Table::new(rules);
        let announced = Envelope::new(
            Seq::new(99),
            PlayerIndex::HOST,
            Message::GameOver(GameOver {
                winner: None,
                player_scores: [40, 60],
                reason: GameOverReason::RoundsExhausted,
            }),
        );
        let out = table.client.apply(announced).unwrap();
        assert!(out
            .iter()
            .any(|o| matches!(o, Output::Event(GameEvent::GameOver(_)))));
        assert_eq!(
            table.client.phase(),
            &Phase::GameOver(Outcome {
                winner: None,
                scores: [40, 60],
                reason: GameOverReason::RoundsExhausted,
            })
        );
    }

    // ===========================================
    // Field rounds
    // ===========================================

    #[test]
    fn field_round_scores_identically_on_both_replicas() {
        let rules = RulesConfig {
            field_round: 2,
            ..RulesConfig::default()
        };
        let mut table = Table::new(rules);
        table.rig(vec![], vec![], 99);
        table.act(PlayerIndex::HOST, GameSession::pass).unwrap();
        table.act(PlayerIndex::CLIENT, GameSession::pass).unwrap();

        let field = table.host.state.field();
        assert_ne!(field, FieldModifier::Normal);
        assert_eq!(table.client.state.field(), field);

        let play = vec![Card::Number(9), ADD];
        table.rig(play.clone(), vec![], 99);
        table.act(PlayerIndex::HOST, |s| s.play(play.clone())).unwrap();

        // 1 + 81 under a square field, 1 + 3 under a square-root field
        let expected = match field {
            FieldModifier::Square => 82,
            _ => 4,
        };
        assert_eq!(resolve(1, &play, field), expected);
        assert_eq!(table.host.scores(), [expected, 1]);
        assert_eq!(table.client.scores(), [expected, 1]);
        assert!(table.sent[PlayerIndex::HOST.index()].iter().any(|env| matches!(
            &env.message,
            Message::Turn(turn) if turn.current_field == field
        )));
    }

    #[test]
    fn forged_field_is_a_violation() {
        let mut table = table();
        table.rig(vec![], vec![], 99);
        assert_eq!(table.client.state.field(), FieldModifier::Normal);
        let forged = Envelope::new(
            Seq::new(99),
            PlayerIndex::HOST,
            Message::Turn(Turn {
                player_index: PlayerIndex::HOST,
                played_cards: vec![Card::Number(4), ADD],
                result: 17,
                current_number: 17,
                current_field: FieldModifier::Square,
            }),
        );
        let err = table.client.apply(forged).unwrap_err();
        assert!(matches!(
            err,
            SessionError::ProtocolViolation {
                message_type: MessageType::Turn,
                ..
            }
        ));
        assert_eq!(table.client.scores(), [1, 1]);
    }

    // ===========================================
    // Skills
    // ===========================================

    #[test]
    fn freeze_skips_next_turn_without_consuming_cards() {
        let mut table = table();
        let client_hand = vec![Card::Number(7), ADD];
        table.rig(vec![FREEZE, Card::Number(2), ADD], client_hand.clone(), 50);

        table
            .act(PlayerIndex::HOST, |s| s.play(vec![FREEZE]))
            .unwrap();
        assert!(table.client.state.is_frozen(PlayerIndex::CLIENT));
        assert!(table.host.state.is_frozen(PlayerIndex::CLIENT));
        assert_eq!(table.host.state.current(), Some(PlayerIndex::HOST));

        table
            .act(PlayerIndex::HOST, |s| s.play(vec![Card::Number(2), ADD]))
            .unwrap();

        assert_eq!(table.client.hand(), client_hand.as_slice());
        assert!(!table.client.state.is_frozen(PlayerIndex::CLIENT));
        assert!(!table.host.state.is_frozen(PlayerIndex::CLIENT));
        assert_eq!(table.host.state.current(), Some(PlayerIndex::HOST));
        assert_eq!(table.client.state.current(), Some(PlayerIndex::HOST));
        assert_eq!(table.host.state.round(), 2);
        assert_eq!(
            table.sent_types(PlayerIndex::CLIENT)[1..],
            [MessageType::SkipTurn, MessageType::FreezeStatus]
        );
    }

    #[test]
    fn frozen_player_cannot_act() {
        let mut table = table();
        table.rig(vec![], vec![Card::Number(1), ADD], 50);
        table.host.state.set_frozen(PlayerIndex::HOST, true);
        assert_eq!(table.host.draw().unwrap_err(), ActionError::Frozen);
    }

    #[test]
    fn mirror_swaps_scores_and_keeps_sum() {
        let mut table = table();
        table.rig(vec![MIRROR], vec![], 50);
        table.host.state.set_scores([10, 3]);
        table.client.state.set_scores([10, 3]);

        table
            .act(PlayerIndex::HOST, |s| s.play(vec![MIRROR]))
            .unwrap();

        assert_eq!(table.host.scores(), [3, 10]);
        assert_eq!(table.client.scores(), [3, 10]);
        assert_eq!(table.host.scores().iter().sum::<i64>(), 13);
        assert_eq!(table.host.state.current(), Some(PlayerIndex::HOST));
        assert!(table.sent_types(PlayerIndex::HOST).contains(&MessageType::ScoreSync));
    }

    #[test]
    fn mirror_applies_before_arithmetic() {
        let mut table = table();
        table.rig(vec![MIRROR, Card::Number(2), MUL], vec![], 99);
        table.host.state.set_scores([1, 20]);
        table.client.state.set_scores([1, 20]);

        table
            .act(PlayerIndex::HOST, |s| {
                s.play(vec![MIRROR, Card::Number(2), MUL])
            })
            .unwrap();

        assert_eq!(table.host.scores(), [40, 1]);
        assert_eq!(table.client.scores(), [40, 1]);
        assert_eq!(table.client.state.current(), Some(PlayerIndex::CLIENT));
    }

    // ===========================================
    // Draws
    // ===========================================

    #[test]
    fn client_draw_round_trips_through_host() {
        let mut table = table();
        table.rig(vec![], vec![Card::Number(1)], 50);
        table.act(PlayerIndex::HOST, GameSession::pass).unwrap();

        let out = table.client.draw().unwrap();
        assert_eq!(table.client.pending(), Some(PendingRequest::Draw));
        assert_eq!(table.client.draw().unwrap_err(), ActionError::RequestPending);

        let before = table.host.deck_counts().total();
        table.deliver(PlayerIndex::CLIENT, out);
        assert_eq!(table.client.pending(), None);
        assert_eq!(table.client.hand().len(), 3);
        assert_eq!(table.host.opponent_hand, 3);
        assert_eq!(table.host.deck_counts().total(), before - 2);
        assert_eq!(table.client.deck_counts(), table.host.deck_counts());
        assert_eq!(table.client.draw().unwrap_err(), ActionError::AlreadyDrawn);
    }

    #[test]
    fn host_draw_is_announced() {
        let mut table = table();
        table.act(PlayerIndex::HOST, GameSession::draw).unwrap();
        assert_eq!(table.host.hand().len(), 8);
        assert_eq!(table.client.opponent_hand, 8);
        assert_eq!(table.client.deck_counts(), table.host.deck_counts());
        assert_eq!(table.host.draw().unwrap_err(), ActionError::AlreadyDrawn);
    }

    #[test]
    fn unrequested_draw_response_is_a_violation() {
        let mut table = table();
        let forged = Envelope::new(
            Seq::new(99),
            PlayerIndex::HOST,
            Message::DrawCardResponse(DrawCardResponse {
                player_index: PlayerIndex::CLIENT,
                cards_drawn: 1,
                drawn_cards: vec![Card::Number(12)],
            }),
        );
        assert!(table.client.apply(forged).is_err());
    }

    // ===========================================
    // Conservation
    // ===========================================

    #[test]
    fn cards_are_conserved_through_a_full_game() {
        let mut table = table();
        let total = DeckConfig::default().total();

        for _ in 0..200 {
            if table.host.phase().is_terminal() {
                break;
            }
            let Some(player) = table.host.state.current() else {
                break;
            };
            let hand = table.seat(player).hand().to_vec();
            let number = hand.iter().find(|c| c.kind() == CardKind::Number).copied();
            let operator = hand.iter().find(|c| c.kind() == CardKind::Operator).copied();

            let result = match (number, operator) {
                (Some(n), Some(op)) => table.act(player, |s| s.play(vec![n, op])),
                _ if !table.seat(player).state.has_drawn() => table.act(player, GameSession::draw),
                _ if has_legal_play(&hand) => {
                    let skill = hand.iter().find(|c| c.kind() == CardKind::Skill).copied();
                    table.act(player, |s| s.play(skill.into_iter().collect()))
                }
                _ => table.act(player, GameSession::pass),
            };
            result.unwrap();
            assert_eq!(conserved(&table), total);
            assert_eq!(table.host.scores(), table.client.scores());
        }
        assert!(table.host.phase().is_terminal());
        assert_eq!(table.host.phase(), table.client.phase());
    }

    // ===========================================
    // Abort
    // ===========================================

    #[test]
    fn abort_is_reported_once() {
        let mut table = table();
        let out = table.host.abort(AbortReason::ConnectionLost);
        assert_eq!(
            out,
            vec![Output::Event(GameEvent::Aborted(AbortReason::ConnectionLost))]
        );
        assert!(table.host.abort(AbortReason::PeerUnresponsive).is_empty());
    }

    #[test]
    fn envelopes_after_game_over_are_ignored() {
        let mut table = table();
        table.client.abort(AbortReason::ConnectionLost);
        let late = Envelope::new(
            Seq::new(50),
            PlayerIndex::HOST,
            Message::ScoreSync(ScoreSync {
                player_index: PlayerIndex::HOST,
                player_scores: [9, 9],
            }),
        );
        assert!(table.client.apply(late).unwrap().is_empty());
        assert_eq!(table.client.scores(), [1, 1]);
    }

    #[test]
    fn snapshot_reflects_state() {
        let table = table();
        let snap = table.client.snapshot();
        assert_eq!(snap.role, Role::Client);
        assert_eq!(snap.hand.len(), 6);
        assert_eq!(snap.opponent_hand_size, 6);
        assert_eq!(snap.scores, [1, 1]);
        assert_eq!(snap.frozen, [false, false]);
        assert_eq!(snap.round, 1);
    }
}
