//! The interactive game loop shared by `host` and `join`.
//!
//! Reads commands from stdin and prints session events as they arrive.

use anyhow::Result;
use numduel_core::{GameEvent, Phase, SessionSnapshot};
use numduel_peer::{Events, PeerError, PeerHandle};
use numduel_types::{Card, Message, PlayerIndex};
use tokio::io::{AsyncBufReadExt, BufReader};

/// One line of player input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    /// 1-based positions in the displayed hand.
    Play(Vec<usize>),
    Draw,
    Pass,
    Status,
    Target,
    Help,
    Quit,
}

/// Run until the game ends, the session stops or the player quits.
pub async fn run(handle: PeerHandle, mut events: Events) -> Result<()> {
    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if let Some(text) = render(&event) {
                    println!("{text}");
                }
                match &event {
                    GameEvent::GameOver(_) | GameEvent::Aborted(_) => break,
                    GameEvent::TurnChanged { .. } | GameEvent::GameStarted { .. } => {
                        let snapshot = handle.snapshot().await?;
                        if is_my_turn(&snapshot) {
                            println!("Your turn. {}", format_hand(&snapshot.hand));
                        }
                    }
                    _ => {}
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(&handle, &line).await? {
                    break;
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

/// Returns `false` when the player asked to quit.
async fn handle_line(handle: &PeerHandle, line: &str) -> Result<bool> {
    let input = match parse_input(line) {
        Ok(Some(input)) => input,
        Ok(None) => return Ok(true),
        Err(e) => {
            println!("! {e}");
            return Ok(true);
        }
    };

    let result = match input {
        Input::Play(picks) => {
            let snapshot = handle.snapshot().await?;
            match select_cards(&snapshot.hand, &picks) {
                Ok(cards) => handle.play(cards).await,
                Err(e) => {
                    println!("! {e}");
                    return Ok(true);
                }
            }
        }
        Input::Draw => handle.draw().await,
        Input::Pass => handle.pass().await,
        Input::Status => {
            print_status(&handle.snapshot().await?);
            Ok(())
        }
        Input::Target => {
            match handle.target_number().await? {
                Some(target) => println!("Target number: {target}"),
                None => println!("Target number not known yet; asked the host again."),
            }
            Ok(())
        }
        Input::Help => {
            print_help();
            Ok(())
        }
        Input::Quit => return Ok(false),
    };

    match result {
        Ok(()) => Ok(true),
        Err(PeerError::Action(e)) => {
            println!("! {e}");
            Ok(true)
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_input(line: &str) -> Result<Option<Input>, String> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };

    let input = match first.to_ascii_lowercase().as_str() {
        "d" | "draw" => Input::Draw,
        "p" | "pass" => Input::Pass,
        "s" | "status" => Input::Status,
        "t" | "target" => Input::Target,
        "h" | "help" | "?" => Input::Help,
        "q" | "quit" | "exit" => Input::Quit,
        "play" => Input::Play(parse_picks(words)?),
        _ => Input::Play(parse_picks(line.split_whitespace())?),
    };
    Ok(Some(input))
}

fn parse_picks<'a>(words: impl Iterator<Item = &'a str>) -> Result<Vec<usize>, String> {
    let picks = words
        .map(|w| {
            w.parse::<usize>()
                .map_err(|_| format!("not a card position: {w}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if picks.is_empty() {
        return Err("choose cards by their position, e.g. `play 1 3`".to_string());
    }
    Ok(picks)
}

/// Map 1-based positions to the cards they name.
fn select_cards(hand: &[Card], picks: &[usize]) -> Result<Vec<Card>, String> {
    let mut seen = Vec::with_capacity(picks.len());
    for &pick in picks {
        if pick == 0 || pick > hand.len() {
            return Err(format!("no card at position {pick}"));
        }
        if seen.contains(&pick) {
            return Err(format!("position {pick} chosen twice"));
        }
        seen.push(pick);
    }
    Ok(seen.into_iter().map(|pick| hand[pick - 1]).collect())
}

fn is_my_turn(snapshot: &SessionSnapshot) -> bool {
    snapshot.phase
        == Phase::AwaitingAction {
            player: snapshot.role.seat(),
        }
}

fn format_hand(hand: &[Card]) -> String {
    if hand.is_empty() {
        return "Your hand is empty.".to_string();
    }
    let cards = hand
        .iter()
        .enumerate()
        .map(|(i, card)| format!("[{}] {}", i + 1, card))
        .collect::<Vec<_>>()
        .join("  ");
    format!("Your hand: {cards}")
}

/// Text for an event, or `None` for events only the status view shows.
fn render(event: &GameEvent) -> Option<String> {
    match event {
        GameEvent::ShowHand(hand) => Some(format_hand(hand)),
        GameEvent::AddCard(card) => Some(format!("You drew {card}")),
        GameEvent::RemoveCard(_) | GameEvent::CardCounts(_) => None,
        GameEvent::ShowResult(text) => Some(text.clone()),
        GameEvent::GameStarted {
            first, schedule, ..
        } => {
            let field = if schedule.round == 0 {
                "no special field".to_string()
            } else {
                format!("{} in round {}", schedule.modifier, schedule.round)
            };
            Some(format!("Game started: {first} plays first, {field}."))
        }
        GameEvent::TargetSet(target) => Some(format!("Target number: {target}")),
        GameEvent::OpponentAction(Message::DrawCard(draw)) => Some(format!(
            "{} drew {} card(s)",
            draw.player_index, draw.cards_drawn
        )),
        GameEvent::OpponentAction(_) => None,
        GameEvent::TurnChanged {
            player,
            round,
            field,
        } => Some(format!("-- Round {round}, {player}'s turn ({field}) --")),
        GameEvent::ScoresChanged(scores) => Some(format_scores(scores)),
        GameEvent::GameOver(outcome) => Some(format!("Game over: {outcome}")),
        GameEvent::Aborted(reason) => Some(format!("Session aborted: {reason}")),
    }
}

fn format_scores(scores: &[i64; 2]) -> String {
    format!(
        "Scores: {} = {}, {} = {}",
        PlayerIndex::HOST,
        scores[0],
        PlayerIndex::CLIENT,
        scores[1]
    )
}

fn print_status(snapshot: &SessionSnapshot) {
    let me = snapshot.role.seat();
    println!("=== status ({me}, {}) ===", snapshot.role);
    match &snapshot.phase {
        Phase::AwaitingSetup => println!("Waiting for the game to start"),
        Phase::AwaitingAction { player } => println!(
            "Round {} | {} | {player}'s turn",
            snapshot.round, snapshot.field
        ),
        Phase::GameOver(outcome) => println!("Game over: {outcome}"),
        Phase::Aborted(reason) => println!("Aborted: {reason}"),
    }
    println!("{}", format_scores(&snapshot.scores));
    for player in PlayerIndex::BOTH {
        if snapshot.frozen[player.index()] {
            println!("{player} is frozen");
        }
    }
    match snapshot.target {
        Some(target) => println!("Target number: {target}"),
        None => println!("Target number: unknown"),
    }
    let counts = &snapshot.deck_counts;
    println!(
        "Deck: {} left (numbers {}, operators {}, extra operators {}, skills {})",
        counts.total(),
        counts.number_card_count,
        counts.operator_card_count,
        counts.extra_operator_card_count,
        counts.skill_card_count
    );
    println!("Opponent holds {} card(s)", snapshot.opponent_hand_size);
    if snapshot.has_drawn && is_my_turn(snapshot) {
        println!("You already drew this turn");
    }
    println!("{}", format_hand(&snapshot.hand));
}

fn print_help() {
    println!("Commands:");
    println!("  play 1 3   play the cards at positions 1 and 3 (or just `1 3`)");
    println!("  draw       draw cards (once per turn)");
    println!("  pass       pass when no legal play is left");
    println!("  status     show scores, deck and hand");
    println!("  target     show the target number");
    println!("  quit       leave the game");
}
