//! The session aggregate: one game of Farkle from creation to winner.
//!
//! A [`Session`] owns every piece of game truth. Each operation validates
//! its preconditions, mutates, and returns the `(Recipient, ServerEvent)`
//! pairs the connection layer should deliver. A rejected operation returns
//! a [`GameError`] and leaves the session untouched.
//!
//! Every successful operation ends with a `game_state` broadcast.

use farkle_protocol::{
    Die, GameCode, GameStateView, ParticipantId, PlayerView, Recipient,
    ScoredMove, ServerEvent, StatusView,
};
use farkle_scoring::ScoringRules;
use tokio::time::Instant;

use crate::{DiceRoller, GameConfig, GameError, GameStatus};

/// Events produced by one operation, in delivery order.
pub type Outbound = Vec<(Recipient, ServerEvent)>;

/// What a departure did to the session.
#[derive(Debug)]
pub enum DisconnectOutcome {
    /// The session lives on; deliver these events (possibly none).
    Continue(Outbound),
    /// No slot is occupied any more. The session should be deleted.
    Abandoned,
}

/// One player slot. The name and total outlive the binding so the
/// scoreboard stays readable after someone leaves.
#[derive(Debug, Clone, Default)]
struct Seat {
    participant: Option<ParticipantId>,
    name: String,
    total: u32,
    extra_turn_taken: bool,
}

impl Seat {
    fn is_occupied(&self) -> bool {
        self.participant.is_some()
    }
}

/// One game of Farkle.
pub struct Session {
    code: GameCode,
    config: GameConfig,
    scoring: ScoringRules,
    seats: Vec<Seat>,
    current_turn: usize,

    // -- Current hand --
    dice: Vec<Die>,
    selected: Vec<usize>,
    turn_points: u32,
    turn_moves: Vec<ScoredMove>,
    has_set_aside_this_roll: bool,

    // -- Ending --
    victory_target: u32,
    final_round_trigger: Option<usize>,
    winner: Option<usize>,
    finished_at: Option<Instant>,

    roller: Box<dyn DiceRoller>,
}

impl Session {
    /// Creates an empty session. Nobody is seated yet.
    pub fn new(
        code: GameCode,
        config: GameConfig,
        requested_target: Option<i64>,
        roller: Box<dyn DiceRoller>,
    ) -> Self {
        Self {
            victory_target: config.victory_target(requested_target),
            scoring: ScoringRules::new(config.dice_per_hand),
            seats: vec![Seat::default(); config.slots],
            code,
            config,
            current_turn: 0,
            dice: Vec::new(),
            selected: Vec::new(),
            turn_points: 0,
            turn_moves: Vec::new(),
            has_set_aside_this_roll: false,
            final_round_trigger: None,
            winner: None,
            finished_at: None,
            roller,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn code(&self) -> &GameCode {
        &self.code
    }

    pub fn victory_target(&self) -> u32 {
        self.victory_target
    }

    pub fn status(&self) -> GameStatus {
        if self.winner.is_some() {
            GameStatus::Finished
        } else if self.final_round_trigger.is_some() {
            GameStatus::FinalRound
        } else {
            GameStatus::Active
        }
    }

    /// When the winner was fixed. Set exactly once.
    pub fn finished_at(&self) -> Option<Instant> {
        self.finished_at
    }

    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    pub fn current_turn(&self) -> usize {
        self.current_turn
    }

    /// Banked totals per slot.
    pub fn totals(&self) -> Vec<u32> {
        self.seats.iter().map(|s| s.total).collect()
    }

    /// The slot `who` is bound to, if any.
    pub fn slot_of(&self, who: ParticipantId) -> Option<usize> {
        self.seats.iter().position(|s| s.participant == Some(who))
    }

    pub fn occupied_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_occupied()).count()
    }

    /// Every bound participant with its slot, in slot order.
    pub fn participants(&self) -> impl Iterator<Item = (usize, ParticipantId)> + '_ {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(slot, s)| s.participant.map(|p| (slot, p)))
    }

    pub fn participant_at(&self, slot: usize) -> Option<ParticipantId> {
        self.seats.get(slot).and_then(|s| s.participant)
    }

    /// Builds the client-facing snapshot.
    pub fn snapshot(&self) -> GameStateView {
        GameStateView {
            players: self
                .seats
                .iter()
                .map(|s| PlayerView {
                    name: s.name.clone(),
                    total: s.total,
                    active: s.is_occupied(),
                })
                .collect(),
            current_turn: self.current_turn,
            dice: self.dice.clone(),
            selected: self.selected.clone(),
            remaining_active_dice_count: self.dice.iter().filter(|d| !d.held).count(),
            turn_points: self.turn_points,
            turn_moves: self.turn_moves.clone(),
            victory_target: self.victory_target,
            final_round_trigger_slot: wire_slot(self.final_round_trigger),
            winner_slot: wire_slot(self.winner),
            status: if self.winner.is_some() {
                StatusView::Finished
            } else {
                StatusView::Playing
            },
        }
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Binds `who` to the first empty slot.
    ///
    /// The very first binding gets a private `game_created`; later ones get
    /// a private `game_joined` and everyone hears `player_joined`.
    pub fn join(
        &mut self,
        who: ParticipantId,
        name: &str,
    ) -> Result<(usize, Outbound), GameError> {
        if self.winner.is_some() {
            return Err(GameError::Finished);
        }
        if self.slot_of(who).is_some() {
            return Err(GameError::AlreadySeated);
        }
        let slot = self
            .seats
            .iter()
            .position(|s| !s.is_occupied())
            .ok_or(GameError::Full)?;

        let brand_new = self.seats.iter().all(|s| s.name.is_empty());
        let name = match name.trim() {
            "" => format!("Player {}", slot + 1),
            trimmed => trimmed.to_string(),
        };
        // The total stays with the slot; the final-round turn does not.
        let seat = &mut self.seats[slot];
        seat.participant = Some(who);
        seat.name = name.clone();
        seat.extra_turn_taken = false;

        tracing::info!(
            code = %self.code,
            participant = %who,
            slot,
            players = self.occupied_count(),
            "player joined"
        );

        let mut events = Vec::new();
        if brand_new {
            events.push((
                Recipient::Slot(slot),
                ServerEvent::GameCreated {
                    game_code: self.code.clone(),
                },
            ));
        } else {
            events.push((
                Recipient::Slot(slot),
                ServerEvent::GameJoined {
                    game_code: self.code.clone(),
                    slot_index: slot,
                },
            ));
            events.push((
                Recipient::All,
                ServerEvent::PlayerJoined {
                    slot_index: slot,
                    name,
                },
            ));
        }
        self.push_state(&mut events);
        Ok((slot, events))
    }

    /// Unbinds `who` and applies the consequences of their departure.
    pub fn disconnect(&mut self, who: ParticipantId) -> DisconnectOutcome {
        let Some(slot) = self.slot_of(who) else {
            return DisconnectOutcome::Continue(Vec::new());
        };
        self.seats[slot].participant = None;
        let remaining = self.occupied_count();

        tracing::info!(
            code = %self.code,
            participant = %who,
            slot,
            remaining,
            "player left"
        );

        if remaining == 0 {
            return DisconnectOutcome::Abandoned;
        }
        if self.winner.is_some() {
            return DisconnectOutcome::Continue(Vec::new());
        }

        let mut events = Vec::new();
        if let (1, Some(survivor)) =
            (remaining, self.seats.iter().position(Seat::is_occupied))
        {
            self.clear_turn_state();
            self.current_turn = survivor;
            self.declare_winner(survivor);
            events.push((
                Recipient::All,
                ServerEvent::PlayerDisconnected {
                    slot_index: slot,
                    winner_slot: wire_slot(Some(survivor)),
                },
            ));
            events.push((
                Recipient::All,
                ServerEvent::GameOver {
                    winner_slot: survivor,
                    message: format!("{} wins by forfeit", self.seats[survivor].name),
                },
            ));
        } else {
            events.push((
                Recipient::All,
                ServerEvent::PlayerDisconnected {
                    slot_index: slot,
                    winner_slot: -1,
                },
            ));
            if self.current_turn == slot {
                self.clear_turn_state();
                if self.final_round_complete() {
                    self.finish(&mut events);
                } else {
                    self.advance_turn(&mut events);
                }
            } else if self.final_round_complete() {
                self.finish(&mut events);
            }
        }
        self.push_state(&mut events);
        DisconnectOutcome::Continue(events)
    }

    // -----------------------------------------------------------------------
    // Turn operations
    // -----------------------------------------------------------------------

    /// Creator-only advisory signal. Changes nothing.
    pub fn start(&self, who: ParticipantId) -> Result<Outbound, GameError> {
        if self.winner.is_some() {
            return Err(GameError::Finished);
        }
        let slot = self.slot_of(who).ok_or(GameError::NotSeated)?;
        if slot != 0 {
            return Err(GameError::NotCreator);
        }
        let mut events = vec![(Recipient::All, ServerEvent::GameStarted)];
        self.push_state(&mut events);
        Ok(events)
    }

    /// Rolls a fresh hand, or rerolls the dice that aren't held.
    pub fn roll(&mut self, who: ParticipantId) -> Result<Outbound, GameError> {
        let slot = self.acting_slot(who)?;
        if !self.dice.is_empty() && !self.has_set_aside_this_roll {
            return Err(GameError::MustSetAsideBeforeRoll);
        }

        if self.dice.is_empty() {
            let count = self.config.dice_per_hand;
            self.dice = (0..count)
                .map(|_| Die {
                    value: self.roller.roll(),
                    held: false,
                })
                .collect();
        } else {
            for die in self.dice.iter_mut().filter(|d| !d.held) {
                die.value = self.roller.roll();
            }
        }
        self.selected.clear();
        self.has_set_aside_this_roll = false;

        let mut events = vec![(
            Recipient::All,
            ServerEvent::RollResult {
                dice: self.dice.clone(),
            },
        )];

        let active: Vec<u8> = self
            .dice
            .iter()
            .filter(|d| !d.held)
            .map(|d| d.value)
            .collect();
        if !self.scoring.has_any_scoring_option(&active) {
            tracing::debug!(
                code = %self.code,
                slot,
                lost = self.turn_points,
                "farkle"
            );
            events.push((
                Recipient::All,
                ServerEvent::Farkle {
                    message: format!(
                        "Farkle! {} loses {} points this turn",
                        self.seats[slot].name, self.turn_points
                    ),
                },
            ));
            self.end_turn(slot, &mut events);
        }

        self.push_state(&mut events);
        Ok(events)
    }

    /// Flips die `index` in or out of the pending selection.
    pub fn toggle_select(
        &mut self,
        who: ParticipantId,
        index: i64,
    ) -> Result<Outbound, GameError> {
        self.acting_slot(who)?;
        if self.dice.is_empty() {
            return Err(GameError::MustRollFirst);
        }
        let index = usize::try_from(index)
            .ok()
            .filter(|&i| i < self.dice.len())
            .ok_or(GameError::InvalidIndex)?;
        if self.dice[index].held {
            return Err(GameError::DieAlreadyHeld);
        }

        match self.selected.iter().position(|&i| i == index) {
            Some(pos) => {
                self.selected.remove(pos);
            }
            None => {
                self.selected.push(index);
                self.selected.sort_unstable();
            }
        }

        let mut events = Vec::new();
        self.push_state(&mut events);
        Ok(events)
    }

    /// Scores the pending selection and holds those dice.
    pub fn set_aside(&mut self, who: ParticipantId) -> Result<Outbound, GameError> {
        let slot = self.acting_slot(who)?;
        if self.dice.is_empty() {
            return Err(GameError::MustRollFirst);
        }
        if self.selected.is_empty() {
            return Err(GameError::NothingSelected);
        }

        let picks: Vec<usize> = self
            .selected
            .iter()
            .copied()
            .filter(|&i| self.dice.get(i).is_some_and(|d| !d.held))
            .collect();
        if picks.is_empty() {
            return Err(GameError::SelectionAlreadyHeld);
        }
        let mut values: Vec<u8> = picks.iter().map(|&i| self.dice[i].value).collect();
        values.sort_unstable();
        let points = self
            .scoring
            .score_selection(&values)
            .ok_or(GameError::InvalidSelection)?;

        self.turn_points += points;
        let sequence_id = u32::try_from(self.turn_moves.len() + 1).unwrap_or(u32::MAX);
        self.turn_moves.push(ScoredMove {
            sequence_id,
            values,
            points,
        });
        for &i in &picks {
            self.dice[i].held = true;
        }
        self.selected.clear();
        self.has_set_aside_this_roll = true;

        let mut events = Vec::new();
        if self.dice.iter().all(|d| d.held) {
            self.dice.clear();
            self.has_set_aside_this_roll = false;
            events.push((
                Recipient::All,
                ServerEvent::HotDice {
                    message: format!(
                        "Hot dice! {} rolls all {} dice again",
                        self.seats[slot].name, self.config.dice_per_hand
                    ),
                },
            ));
        }

        self.push_state(&mut events);
        Ok(events)
    }

    /// Adds the turn's points to the slot total and passes the turn.
    pub fn bank(&mut self, who: ParticipantId) -> Result<Outbound, GameError> {
        let slot = self.acting_slot(who)?;
        if self.turn_points == 0 {
            return Err(GameError::NothingToBank);
        }
        let active_remaining = self.dice.iter().any(|d| !d.held);
        if active_remaining && !self.has_set_aside_this_roll {
            return Err(GameError::MustSetAsideBeforeBank);
        }

        let seat = &mut self.seats[slot];
        seat.total = seat.total.saturating_add(self.turn_points);
        let total = seat.total;

        let mut events = Vec::new();
        if self.final_round_trigger.is_none() && total >= self.victory_target {
            self.final_round_trigger = Some(slot);
            for seat in &mut self.seats {
                seat.extra_turn_taken = false;
            }
            tracing::info!(code = %self.code, slot, total, "final round triggered");
            events.push((
                Recipient::All,
                ServerEvent::FinalRound {
                    message: format!(
                        "{} reached {} points! Everyone else gets one last turn",
                        self.seats[slot].name, self.victory_target
                    ),
                },
            ));
        }

        self.end_turn(slot, &mut events);
        self.push_state(&mut events);
        Ok(events)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Common preconditions for roll/toggle/set-aside/bank.
    fn acting_slot(&self, who: ParticipantId) -> Result<usize, GameError> {
        if self.winner.is_some() {
            return Err(GameError::Finished);
        }
        let slot = self.slot_of(who).ok_or(GameError::NotSeated)?;
        if self.occupied_count() < 2 {
            return Err(GameError::WaitingForPlayers);
        }
        if slot != self.current_turn {
            return Err(GameError::NotYourTurn);
        }
        Ok(slot)
    }

    fn clear_turn_state(&mut self) {
        self.dice.clear();
        self.selected.clear();
        self.turn_points = 0;
        self.turn_moves.clear();
        self.has_set_aside_this_roll = false;
    }

    /// Ends `slot`'s turn after a bust or a bank.
    fn end_turn(&mut self, slot: usize, events: &mut Outbound) {
        self.clear_turn_state();
        if self.final_round_trigger.is_some_and(|t| t != slot) {
            self.seats[slot].extra_turn_taken = true;
        }
        if self.final_round_complete() {
            self.finish(events);
        } else {
            self.advance_turn(events);
        }
    }

    /// Moves the turn to the next occupied slot, wrapping around.
    fn advance_turn(&mut self, events: &mut Outbound) {
        let n = self.seats.len();
        let next = (1..=n)
            .map(|step| (self.current_turn + step) % n)
            .find(|&s| self.seats[s].is_occupied());
        if let Some(next) = next {
            self.current_turn = next;
            events.push((
                Recipient::All,
                ServerEvent::TurnChanged {
                    message: format!("Turn of {}", self.seats[next].name),
                },
            ));
        }
    }

    fn final_round_complete(&self) -> bool {
        let Some(trigger) = self.final_round_trigger else {
            return false;
        };
        self.seats
            .iter()
            .enumerate()
            .filter(|(slot, s)| *slot != trigger && s.is_occupied())
            .all(|(_, s)| s.extra_turn_taken)
    }

    fn finish(&mut self, events: &mut Outbound) {
        let winner = self.resolve_winner();
        self.clear_turn_state();
        self.declare_winner(winner);
        let seat = &self.seats[winner];
        events.push((
            Recipient::All,
            ServerEvent::GameOver {
                winner_slot: winner,
                message: format!("{} wins with {} points!", seat.name, seat.total),
            },
        ));
    }

    fn declare_winner(&mut self, slot: usize) {
        self.winner = Some(slot);
        self.finished_at = Some(Instant::now());
        tracing::info!(
            code = %self.code,
            winner = slot,
            total = self.seats[slot].total,
            "game finished"
        );
    }

    /// Highest total among occupied slots. Ties go to the trigger slot if
    /// it is among the leaders, else to the lowest slot index.
    fn resolve_winner(&self) -> usize {
        let seats = &self.seats;
        let occupied = move || seats.iter().enumerate().filter(|(_, s)| s.is_occupied());
        let Some(best) = occupied().map(|(_, s)| s.total).max() else {
            return self.final_round_trigger.unwrap_or(0);
        };
        let leaders: Vec<usize> = occupied()
            .filter(|(_, s)| s.total == best)
            .map(|(slot, _)| slot)
            .collect();
        match self.final_round_trigger {
            Some(trigger) if leaders.contains(&trigger) => trigger,
            _ => leaders.first().copied().unwrap_or(0),
        }
    }

    fn push_state(&self, events: &mut Outbound) {
        events.push((Recipient::All, ServerEvent::GameState(self.snapshot())));
    }
}

/// `-1` stands for "unset" on the wire.
fn wire_slot(slot: Option<usize>) -> i32 {
    slot.and_then(|s| i32::try_from(s).ok()).unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SequenceRoller;

    const SCORING_HAND: [u8; 6] = [1, 5, 2, 2, 3, 4];
    const BUST_HAND: [u8; 6] = [2, 2, 3, 4, 6, 6];

    fn pid(n: u64) -> ParticipantId {
        ParticipantId(n)
    }

    fn config(slots: usize) -> GameConfig {
        GameConfig {
            slots,
            ..GameConfig::default()
        }
    }

    fn session(slots: usize, target: i64, faces: &[u8]) -> Session {
        Session::new(
            GameCode::new("ABCDE"),
            config(slots),
            Some(target),
            Box::new(SequenceRoller::new(faces.to_vec())),
        )
    }

    /// A two-slot session with both players seated.
    fn two_player(target: i64, faces: &[u8]) -> Session {
        let mut s = session(2, target, faces);
        s.join(pid(1), "Ana").unwrap();
        s.join(pid(2), "Ben").unwrap();
        s
    }

    fn kinds(events: &Outbound) -> Vec<&'static str> {
        events.iter().map(|(_, e)| e.kind()).collect()
    }

    /// Rolls, sets aside the dice at `picks`, and banks.
    fn bank_turn(s: &mut Session, who: ParticipantId, picks: &[i64]) -> Outbound {
        s.roll(who).unwrap();
        for &i in picks {
            s.toggle_select(who, i).unwrap();
        }
        s.set_aside(who).unwrap();
        s.bank(who).unwrap()
    }

    // =====================================================================
    // Join
    // =====================================================================

    #[test]
    fn test_join_first_participant_gets_game_created() {
        let mut s = session(2, 0, &SCORING_HAND);
        let (slot, events) = s.join(pid(1), "Ana").unwrap();
        assert_eq!(slot, 0);
        assert_eq!(kinds(&events), vec!["game_created", "game_state"]);
        assert_eq!(events[0].0, Recipient::Slot(0));
        assert_eq!(s.victory_target(), 2000);
    }

    #[test]
    fn test_join_second_participant_is_announced() {
        let mut s = session(2, 0, &SCORING_HAND);
        s.join(pid(1), "Ana").unwrap();
        let (slot, events) = s.join(pid(2), "  ").unwrap();
        assert_eq!(slot, 1);
        assert_eq!(
            kinds(&events),
            vec!["game_joined", "player_joined", "game_state"]
        );
        assert_eq!(events[0].0, Recipient::Slot(1));
        assert_eq!(
            events[1].1,
            ServerEvent::PlayerJoined {
                slot_index: 1,
                name: "Player 2".into()
            }
        );
    }

    #[test]
    fn test_join_rejects_when_full() {
        let mut s = two_player(300, &SCORING_HAND);
        assert_eq!(s.join(pid(3), "Cy").unwrap_err(), GameError::Full);
    }

    #[test]
    fn test_join_rejects_same_participant_twice() {
        let mut s = session(3, 300, &SCORING_HAND);
        s.join(pid(1), "Ana").unwrap();
        assert_eq!(s.join(pid(1), "Ana").unwrap_err(), GameError::AlreadySeated);
    }

    #[test]
    fn test_join_rejects_finished_session() {
        let mut s = two_player(300, &SCORING_HAND);
        s.disconnect(pid(2));
        assert_eq!(s.status(), GameStatus::Finished);
        assert_eq!(s.join(pid(4), "Dee").unwrap_err(), GameError::Finished);
    }

    // =====================================================================
    // Preconditions
    // =====================================================================

    #[test]
    fn test_roll_waits_for_second_player() {
        let mut s = session(2, 300, &SCORING_HAND);
        s.join(pid(1), "Ana").unwrap();
        assert_eq!(s.roll(pid(1)).unwrap_err(), GameError::WaitingForPlayers);
    }

    #[test]
    fn test_roll_rejects_out_of_turn_without_side_effects() {
        let mut s = two_player(300, &SCORING_HAND);
        let before = s.snapshot();
        assert_eq!(s.roll(pid(2)).unwrap_err(), GameError::NotYourTurn);
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn test_roll_rejects_stranger() {
        let mut s = two_player(300, &SCORING_HAND);
        assert_eq!(s.roll(pid(9)).unwrap_err(), GameError::NotSeated);
    }

    #[test]
    fn test_start_is_creator_only() {
        let s = two_player(300, &SCORING_HAND);
        assert_eq!(s.start(pid(2)).unwrap_err(), GameError::NotCreator);
        let events = s.start(pid(1)).unwrap();
        assert_eq!(kinds(&events), vec!["game_started", "game_state"]);
    }

    // =====================================================================
    // Roll
    // =====================================================================

    #[test]
    fn test_roll_fills_fresh_hand() {
        let mut s = two_player(300, &SCORING_HAND);
        let events = s.roll(pid(1)).unwrap();
        assert_eq!(kinds(&events), vec!["roll_result", "game_state"]);
        let ServerEvent::RollResult { dice } = &events[0].1 else {
            panic!("expected roll_result");
        };
        let faces: Vec<u8> = dice.iter().map(|d| d.value).collect();
        assert_eq!(faces, SCORING_HAND.to_vec());
        assert!(dice.iter().all(|d| !d.held));
    }

    #[test]
    fn test_reroll_requires_set_aside() {
        let mut s = two_player(300, &SCORING_HAND);
        s.roll(pid(1)).unwrap();
        assert_eq!(
            s.roll(pid(1)).unwrap_err(),
            GameError::MustSetAsideBeforeRoll
        );
    }

    #[test]
    fn test_reroll_keeps_held_dice() {
        let mut s = two_player(300, &SCORING_HAND);
        s.roll(pid(1)).unwrap();
        s.toggle_select(pid(1), 0).unwrap();
        s.set_aside(pid(1)).unwrap();
        s.roll(pid(1)).unwrap();

        let view = s.snapshot();
        assert_eq!(view.dice[0], Die { value: 1, held: true });
        let rerolled: Vec<u8> = view.dice[1..].iter().map(|d| d.value).collect();
        assert_eq!(rerolled, vec![1, 5, 2, 2, 3]);
        assert_eq!(view.remaining_active_dice_count, 5);
        assert_eq!(view.turn_points, 100);
    }

    #[test]
    fn test_roll_bust_passes_turn_and_drops_points() {
        let mut faces = SCORING_HAND.to_vec();
        faces.extend_from_slice(&[2, 3, 4, 6, 6]);
        let mut s = two_player(300, &faces);
        s.roll(pid(1)).unwrap();
        s.toggle_select(pid(1), 0).unwrap();
        s.set_aside(pid(1)).unwrap();

        let events = s.roll(pid(1)).unwrap();
        assert_eq!(
            kinds(&events),
            vec!["roll_result", "farkle", "turn_changed", "game_state"]
        );
        let view = s.snapshot();
        assert_eq!(view.current_turn, 1);
        assert_eq!(view.turn_points, 0);
        assert!(view.dice.is_empty());
        assert!(view.turn_moves.is_empty());
        assert_eq!(s.totals(), vec![0, 0]);
    }

    #[test]
    fn test_roll_faces_stay_in_range_with_many_dice() {
        for _ in 0..50 {
            let mut s = Session::new(
                GameCode::new("MANYD"),
                GameConfig {
                    dice_per_hand: 10,
                    ..GameConfig::default()
                },
                None,
                Box::new(crate::RandomRoller),
            );
            s.join(pid(1), "Ana").unwrap();
            s.join(pid(2), "Ben").unwrap();
            let events = s.roll(pid(1)).unwrap();
            let ServerEvent::RollResult { dice } = &events[0].1 else {
                panic!("expected roll_result");
            };
            assert_eq!(dice.len(), 10);
            assert!(dice.iter().all(|d| (1..=6).contains(&d.value)));
        }
    }

    // =====================================================================
    // Toggle / set aside
    // =====================================================================

    #[test]
    fn test_toggle_before_roll_is_rejected() {
        let mut s = two_player(300, &SCORING_HAND);
        assert_eq!(s.toggle_select(pid(1), 0).unwrap_err(), GameError::MustRollFirst);
    }

    #[test]
    fn test_toggle_rejects_bad_index() {
        let mut s = two_player(300, &SCORING_HAND);
        s.roll(pid(1)).unwrap();
        assert_eq!(s.toggle_select(pid(1), -1).unwrap_err(), GameError::InvalidIndex);
        assert_eq!(s.toggle_select(pid(1), 6).unwrap_err(), GameError::InvalidIndex);
    }

    #[test]
    fn test_toggle_twice_deselects() {
        let mut s = two_player(300, &SCORING_HAND);
        s.roll(pid(1)).unwrap();
        s.toggle_select(pid(1), 3).unwrap();
        s.toggle_select(pid(1), 1).unwrap();
        assert_eq!(s.snapshot().selected, vec![1, 3]);
        s.toggle_select(pid(1), 3).unwrap();
        assert_eq!(s.snapshot().selected, vec![1]);
    }

    #[test]
    fn test_toggle_held_die_is_rejected() {
        let mut s = two_player(300, &SCORING_HAND);
        s.roll(pid(1)).unwrap();
        s.toggle_select(pid(1), 0).unwrap();
        s.set_aside(pid(1)).unwrap();
        assert_eq!(s.toggle_select(pid(1), 0).unwrap_err(), GameError::DieAlreadyHeld);
    }

    #[test]
    fn test_set_aside_requires_selection() {
        let mut s = two_player(300, &SCORING_HAND);
        assert_eq!(s.set_aside(pid(1)).unwrap_err(), GameError::MustRollFirst);
        s.roll(pid(1)).unwrap();
        assert_eq!(s.set_aside(pid(1)).unwrap_err(), GameError::NothingSelected);
    }

    #[test]
    fn test_set_aside_rejects_non_scoring_die_without_side_effects() {
        let mut s = two_player(300, &SCORING_HAND);
        s.roll(pid(1)).unwrap();
        s.toggle_select(pid(1), 0).unwrap();
        s.toggle_select(pid(1), 2).unwrap();
        let before = s.snapshot();
        assert_eq!(s.set_aside(pid(1)).unwrap_err(), GameError::InvalidSelection);
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn test_set_aside_records_move_and_holds_dice() {
        let mut s = two_player(300, &SCORING_HAND);
        s.roll(pid(1)).unwrap();
        s.toggle_select(pid(1), 1).unwrap();
        s.toggle_select(pid(1), 0).unwrap();
        let events = s.set_aside(pid(1)).unwrap();
        assert_eq!(kinds(&events), vec!["game_state"]);

        let view = s.snapshot();
        assert_eq!(view.turn_points, 150);
        assert_eq!(
            view.turn_moves,
            vec![ScoredMove {
                sequence_id: 1,
                values: vec![1, 5],
                points: 150
            }]
        );
        assert!(view.dice[0].held && view.dice[1].held);
        assert!(view.selected.is_empty());
        assert_eq!(view.remaining_active_dice_count, 4);
    }

    #[test]
    fn test_set_aside_all_dice_is_hot_dice() {
        let mut s = two_player(5000, &[1, 1, 1, 5, 5, 5]);
        s.roll(pid(1)).unwrap();
        for i in 0..6 {
            s.toggle_select(pid(1), i).unwrap();
        }
        let events = s.set_aside(pid(1)).unwrap();
        assert_eq!(kinds(&events), vec!["hot_dice", "game_state"]);

        let view = s.snapshot();
        assert_eq!(view.turn_points, 2500);
        assert!(view.dice.is_empty());
        assert_eq!(view.current_turn, 0);

        // A fresh full hand is rolled, not a reroll.
        s.roll(pid(1)).unwrap();
        assert_eq!(s.snapshot().dice.len(), 6);
        assert!(s.snapshot().dice.iter().all(|d| !d.held));
    }

    // =====================================================================
    // Bank
    // =====================================================================

    #[test]
    fn test_bank_without_points_is_rejected() {
        let mut s = two_player(300, &SCORING_HAND);
        assert_eq!(s.bank(pid(1)).unwrap_err(), GameError::NothingToBank);
    }

    #[test]
    fn test_bank_after_reroll_needs_set_aside() {
        let mut s = two_player(300, &SCORING_HAND);
        s.roll(pid(1)).unwrap();
        s.toggle_select(pid(1), 0).unwrap();
        s.set_aside(pid(1)).unwrap();
        s.roll(pid(1)).unwrap();
        assert_eq!(s.bank(pid(1)).unwrap_err(), GameError::MustSetAsideBeforeBank);
    }

    #[test]
    fn test_bank_adds_total_and_passes_turn() {
        let mut s = two_player(2000, &SCORING_HAND);
        let events = bank_turn(&mut s, pid(1), &[0, 1]);
        assert_eq!(kinds(&events), vec!["turn_changed", "game_state"]);
        assert_eq!(
            events[0].1,
            ServerEvent::TurnChanged {
                message: "Turn of Ben".into()
            }
        );
        assert_eq!(s.totals(), vec![150, 0]);
        assert_eq!(s.current_turn(), 1);
        assert_eq!(s.status(), GameStatus::Active);
    }

    // =====================================================================
    // Final round and winner
    // =====================================================================

    #[test]
    fn test_final_round_tie_goes_to_trigger_slot() {
        let mut s = two_player(300, &SCORING_HAND);
        bank_turn(&mut s, pid(1), &[0, 1]);
        bank_turn(&mut s, pid(2), &[0, 1]);

        let events = bank_turn(&mut s, pid(1), &[0, 1]);
        assert_eq!(kinds(&events), vec!["final_round", "turn_changed", "game_state"]);
        assert_eq!(s.status(), GameStatus::FinalRound);
        assert_eq!(s.snapshot().final_round_trigger_slot, 0);

        let events = bank_turn(&mut s, pid(2), &[0, 1]);
        assert_eq!(kinds(&events), vec!["game_over", "game_state"]);
        assert_eq!(s.totals(), vec![300, 300]);
        assert_eq!(s.winner(), Some(0));
        assert!(s.finished_at().is_some());

        let view = s.snapshot();
        assert_eq!(view.winner_slot, 0);
        assert_eq!(view.status, StatusView::Finished);
        assert_eq!(s.roll(pid(1)).unwrap_err(), GameError::Finished);
    }

    #[test]
    fn test_final_round_challenger_can_overtake() {
        let mut s = two_player(200, &SCORING_HAND);
        bank_turn(&mut s, pid(1), &[0]);
        bank_turn(&mut s, pid(2), &[0, 1]);
        bank_turn(&mut s, pid(1), &[0]);
        assert_eq!(s.status(), GameStatus::FinalRound);

        bank_turn(&mut s, pid(2), &[0, 1]);
        assert_eq!(s.totals(), vec![200, 300]);
        assert_eq!(s.winner(), Some(1));
    }

    #[test]
    fn test_final_round_bust_counts_as_extra_turn() {
        let mut faces = SCORING_HAND.to_vec();
        faces.extend_from_slice(&BUST_HAND);
        let mut s = two_player(150, &faces);
        bank_turn(&mut s, pid(1), &[0, 1]);
        assert_eq!(s.status(), GameStatus::FinalRound);

        let events = s.roll(pid(2)).unwrap();
        assert_eq!(
            kinds(&events),
            vec!["roll_result", "farkle", "game_over", "game_state"]
        );
        assert_eq!(s.winner(), Some(0));
    }

    #[test]
    fn test_totals_never_decrease() {
        let mut faces = SCORING_HAND.to_vec();
        faces.extend_from_slice(&BUST_HAND);
        let mut s = two_player(5000, &faces);
        let mut last = s.totals();
        for _ in 0..6 {
            let who = s.participant_at(s.current_turn()).unwrap();
            if s.roll(who).is_ok() && s.snapshot().dice.len() == 6 {
                s.toggle_select(who, 0).unwrap();
                s.set_aside(who).unwrap();
                s.bank(who).unwrap();
            }
            let now = s.totals();
            assert!(now.iter().zip(&last).all(|(n, l)| n >= l));
            last = now;
        }
    }

    // =====================================================================
    // Disconnect
    // =====================================================================

    #[test]
    fn test_disconnect_forfeit_then_abandon() {
        let mut s = two_player(300, &SCORING_HAND);
        let DisconnectOutcome::Continue(events) = s.disconnect(pid(2)) else {
            panic!("session should survive the first departure");
        };
        assert_eq!(
            kinds(&events),
            vec!["player_disconnected", "game_over", "game_state"]
        );
        assert_eq!(
            events[0].1,
            ServerEvent::PlayerDisconnected {
                slot_index: 1,
                winner_slot: 0
            }
        );
        assert_eq!(s.winner(), Some(0));

        assert!(matches!(s.disconnect(pid(1)), DisconnectOutcome::Abandoned));
    }

    #[test]
    fn test_disconnect_of_lone_creator_abandons() {
        let mut s = session(2, 300, &SCORING_HAND);
        s.join(pid(1), "Ana").unwrap();
        assert!(matches!(s.disconnect(pid(1)), DisconnectOutcome::Abandoned));
    }

    #[test]
    fn test_disconnect_on_finished_game_is_silent() {
        let mut s = two_player(150, &SCORING_HAND);
        bank_turn(&mut s, pid(1), &[0, 1]);
        bank_turn(&mut s, pid(2), &[0]);
        assert_eq!(s.status(), GameStatus::Finished);

        let DisconnectOutcome::Continue(events) = s.disconnect(pid(2)) else {
            panic!("one participant is still bound");
        };
        assert!(events.is_empty());
        assert_eq!(s.winner(), Some(0));
        assert!(matches!(s.disconnect(pid(1)), DisconnectOutcome::Abandoned));
    }

    #[test]
    fn test_disconnect_current_slot_advances_turn() {
        let mut s = session(3, 300, &SCORING_HAND);
        s.join(pid(1), "Ana").unwrap();
        s.join(pid(2), "Ben").unwrap();
        s.join(pid(3), "Cy").unwrap();
        s.roll(pid(1)).unwrap();

        let DisconnectOutcome::Continue(events) = s.disconnect(pid(1)) else {
            panic!("two players remain");
        };
        assert_eq!(
            kinds(&events),
            vec!["player_disconnected", "turn_changed", "game_state"]
        );
        let view = s.snapshot();
        assert_eq!(view.current_turn, 1);
        assert!(view.dice.is_empty());
        assert!(!view.players[0].active);
        assert_eq!(view.players[0].name, "Ana");
    }

    #[test]
    fn test_disconnect_other_slot_keeps_turn() {
        let mut s = session(3, 300, &SCORING_HAND);
        s.join(pid(1), "Ana").unwrap();
        s.join(pid(2), "Ben").unwrap();
        s.join(pid(3), "Cy").unwrap();
        s.roll(pid(1)).unwrap();

        s.disconnect(pid(2));
        let view = s.snapshot();
        assert_eq!(view.current_turn, 0);
        assert_eq!(view.dice.len(), 6);

        // Slot 1 is skipped from now on.
        s.toggle_select(pid(1), 0).unwrap();
        s.set_aside(pid(1)).unwrap();
        s.bank(pid(1)).unwrap();
        assert_eq!(s.current_turn(), 2);
    }

    #[test]
    fn test_disconnect_can_complete_final_round() {
        let mut s = session(3, 150, &SCORING_HAND);
        s.join(pid(1), "Ana").unwrap();
        s.join(pid(2), "Ben").unwrap();
        s.join(pid(3), "Cy").unwrap();
        bank_turn(&mut s, pid(1), &[0, 1]);
        bank_turn(&mut s, pid(2), &[0]);
        assert_eq!(s.status(), GameStatus::FinalRound);

        // Slot 2 still owed a turn; its departure ends the game.
        let DisconnectOutcome::Continue(events) = s.disconnect(pid(3)) else {
            panic!("two players remain");
        };
        assert_eq!(
            kinds(&events),
            vec!["player_disconnected", "game_over", "game_state"]
        );
        assert_eq!(s.winner(), Some(0));
    }

    #[test]
    fn test_reclaimed_slot_owes_its_own_final_turn() {
        let mut s = session(3, 150, &SCORING_HAND);
        s.join(pid(1), "Ana").unwrap();
        s.join(pid(2), "Ben").unwrap();
        s.join(pid(3), "Cy").unwrap();
        bank_turn(&mut s, pid(1), &[0, 1]);
        bank_turn(&mut s, pid(2), &[0]);
        assert_eq!(s.status(), GameStatus::FinalRound);

        // Ben used his last turn, then leaves; Dee takes his slot.
        assert!(matches!(s.disconnect(pid(2)), DisconnectOutcome::Continue(_)));
        assert_eq!(s.join(pid(4), "Dee").unwrap().0, 1);

        bank_turn(&mut s, pid(3), &[0]);
        assert_eq!(s.status(), GameStatus::FinalRound);
        assert_eq!(s.winner(), None);

        bank_turn(&mut s, pid(1), &[0]);
        assert_eq!(s.participant_at(s.current_turn()), Some(pid(4)));
        let events = bank_turn(&mut s, pid(4), &[0]);
        assert_eq!(kinds(&events), vec!["game_over", "game_state"]);
        assert_eq!(s.winner(), Some(0));
    }

    #[test]
    fn test_current_turn_is_always_occupied_while_playing() {
        let mut s = session(4, 5000, &SCORING_HAND);
        for n in 1..=4 {
            s.join(pid(n), "").unwrap();
        }
        s.disconnect(pid(2));
        for _ in 0..5 {
            let who = s.participant_at(s.current_turn()).expect("turn slot occupied");
            bank_turn(&mut s, who, &[0, 1]);
            assert!(s.participant_at(s.current_turn()).is_some());
        }
        s.disconnect(pid(3));
        assert!(s.participant_at(s.current_turn()).is_some());
    }
}
