use std::collections::BTreeSet;

use crate::constants::{AVATARS, RESPAWN_DELAY_MS, ROOM_SIZE};
use crate::grid;
use crate::maze;
use crate::rng::Rng;
use crate::types::{Direction, LifeState, PlayerView, RevealedPlayer, ServerEvent};

mod registry;
mod reveal;
mod spawn;
mod visibility;

pub use registry::{Player, PlayerRegistry};
pub use reveal::{RevealCycle, RevealTransition};
pub use visibility::{can_catch, flashlight_cells};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recipient {
    Player(String),
    Broadcast { except: Vec<String> },
}

#[derive(Clone, Debug)]
pub struct Outbound {
    pub to: Recipient,
    pub event: ServerEvent,
}

impl Outbound {
    fn to_player(id: &str, event: ServerEvent) -> Self {
        Self {
            to: Recipient::Player(id.to_string()),
            event,
        }
    }

    fn to_everyone(event: ServerEvent) -> Self {
        Self {
            to: Recipient::Broadcast { except: Vec::new() },
            event,
        }
    }

    fn to_others(id: &str, event: ServerEvent) -> Self {
        Self {
            to: Recipient::Broadcast {
                except: vec![id.to_string()],
            },
            event,
        }
    }
}

#[derive(Clone, Debug)]
struct PendingRespawn {
    player_id: String,
    due_at_ms: u64,
}

/// The authoritative session state machine: walls, players, respawn
/// deadlines, and the reveal cycle, advanced by connection events and a
/// fixed tick. Methods return addressed events for the transport to deliver
/// and never touch sockets themselves.
pub struct GameSession {
    walls: BTreeSet<(i32, i32)>,
    players: PlayerRegistry,
    pending_respawns: Vec<PendingRespawn>,
    reveal: RevealCycle,
    rng: Rng,
    elapsed_ms: u64,
}

impl GameSession {
    pub fn new(seed: u32) -> Self {
        let mut rng = Rng::new(seed);
        let walls = maze::generate_walls(&mut rng);
        Self {
            walls,
            players: PlayerRegistry::new(),
            pending_respawns: Vec::new(),
            reveal: RevealCycle::new(),
            rng,
            elapsed_ms: 0,
        }
    }

    pub fn walls(&self) -> &BTreeSet<(i32, i32)> {
        &self.walls
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn is_revealing(&self) -> bool {
        self.reveal.is_revealing()
    }

    pub fn join(&mut self, id: &str, requested_avatar: Option<&str>) -> Vec<Outbound> {
        if self.players.contains(id) {
            return Vec::new();
        }

        let avatar = self.choose_avatar(requested_avatar);
        let (x, y) = self.pick_edge_spawn();
        let snapshot: Vec<PlayerView> = self
            .players
            .iter()
            .filter(|player| player.is_alive())
            .map(player_view)
            .collect();

        self.players.insert(Player {
            id: id.to_string(),
            x,
            y,
            avatar: avatar.clone(),
            dir: Direction::Down,
            life: LifeState::Alive,
            kills: 0,
        });

        vec![
            Outbound::to_player(
                id,
                ServerEvent::Init {
                    id: id.to_string(),
                    x,
                    y,
                    avatar: avatar.clone(),
                    room_size: ROOM_SIZE,
                    walls: self.walls.iter().copied().collect(),
                },
            ),
            Outbound::to_player(id, ServerEvent::Players { players: snapshot }),
            Outbound::to_others(
                id,
                ServerEvent::PlayerJoined {
                    id: id.to_string(),
                    x,
                    y,
                    avatar,
                    kills: 0,
                },
            ),
        ]
    }

    pub fn leave(&mut self, id: &str) -> Vec<Outbound> {
        if self.players.remove(id).is_none() {
            return Vec::new();
        }
        vec![Outbound::to_others(
            id,
            ServerEvent::PlayerLeft { id: id.to_string() },
        )]
    }

    /// One requested step. Facing always turns once the player passed the
    /// alive gate; walls and the boundary block the step silently.
    pub fn handle_move(&mut self, id: &str, dir: Direction) -> Vec<Outbound> {
        let Some(player) = self.players.get_mut(id) else {
            return Vec::new();
        };
        if !player.is_alive() {
            return Vec::new();
        }
        player.dir = dir;

        let (nx, ny) = grid::clamp_step(player.x, player.y, dir);
        if (nx, ny) == (player.x, player.y) || self.walls.contains(&(nx, ny)) {
            return Vec::new();
        }
        player.x = nx;
        player.y = ny;

        let mover = player.clone();
        let victim_id = self
            .players
            .iter()
            .find(|other| visibility::can_catch(&mover, other))
            .map(|other| other.id.clone());

        match victim_id {
            Some(victim_id) => self.resolve_catch(id, &victim_id),
            None => vec![Outbound::to_others(
                id,
                ServerEvent::PlayerMoved {
                    id: id.to_string(),
                    x: nx,
                    y: ny,
                },
            )],
        }
    }

    /// Advances session time: fires due respawn deadlines, then the reveal
    /// cycle. Deadlines re-validate registry membership when they fire.
    pub fn step(&mut self, dt_ms: u64) -> Vec<Outbound> {
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        let mut out = Vec::new();

        let now = self.elapsed_ms;
        let pending = std::mem::take(&mut self.pending_respawns);
        let (due, later): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(|entry| entry.due_at_ms <= now);
        self.pending_respawns = later;
        for entry in due {
            out.extend(self.respawn_player(&entry.player_id));
        }

        for transition in self.reveal.step(dt_ms) {
            match transition {
                RevealTransition::Started => {
                    let players = self
                        .players
                        .iter()
                        .map(|player| RevealedPlayer {
                            id: player.id.clone(),
                            x: player.x,
                            y: player.y,
                        })
                        .collect();
                    out.push(Outbound::to_everyone(ServerEvent::RevealStart { players }));
                }
                RevealTransition::Ended => {
                    out.push(Outbound::to_everyone(ServerEvent::RevealEnd));
                }
            }
        }

        out
    }

    fn resolve_catch(&mut self, catcher_id: &str, victim_id: &str) -> Vec<Outbound> {
        let Some(victim) = self.players.get_mut(victim_id) else {
            return Vec::new();
        };
        victim.life = LifeState::Dead;

        let Some(catcher) = self.players.get_mut(catcher_id) else {
            return Vec::new();
        };
        catcher.kills += 1;
        let kills = catcher.kills;

        self.pending_respawns.push(PendingRespawn {
            player_id: victim_id.to_string(),
            due_at_ms: self.elapsed_ms + RESPAWN_DELAY_MS,
        });

        vec![
            Outbound::to_player(
                catcher_id,
                ServerEvent::Caught {
                    player_id: victim_id.to_string(),
                    kills,
                },
            ),
            Outbound::to_player(victim_id, ServerEvent::Died),
            Outbound {
                to: Recipient::Broadcast {
                    except: vec![catcher_id.to_string(), victim_id.to_string()],
                },
                event: ServerEvent::PlayerKilled {
                    killer_id: catcher_id.to_string(),
                    killed_id: victim_id.to_string(),
                    kills,
                },
            },
        ]
    }

    fn respawn_player(&mut self, id: &str) -> Vec<Outbound> {
        if !self.players.contains(id) {
            log::debug!("respawn deadline fired for departed player {id}");
            return Vec::new();
        }

        let (x, y) = self.pick_edge_spawn();
        let Some(player) = self.players.get_mut(id) else {
            return Vec::new();
        };
        player.x = x;
        player.y = y;
        player.life = LifeState::Alive;
        let avatar = player.avatar.clone();

        vec![
            Outbound::to_player(id, ServerEvent::Respawn { x, y }),
            Outbound::to_others(
                id,
                ServerEvent::PlayerRespawned {
                    id: id.to_string(),
                    x,
                    y,
                    avatar,
                },
            ),
        ]
    }

    fn choose_avatar(&mut self, requested: Option<&str>) -> String {
        match requested {
            Some(symbol) if AVATARS.contains(&symbol) => symbol.to_string(),
            _ => AVATARS[self.rng.pick_index(AVATARS.len())].to_string(),
        }
    }
}

fn player_view(player: &Player) -> PlayerView {
    PlayerView {
        id: player.id.clone(),
        x: player.x,
        y: player.y,
        avatar: player.avatar.clone(),
        kills: player.kills,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{REVEAL_DURATION_MS, REVEAL_PERIOD_MS};

    fn open_session() -> GameSession {
        let mut session = GameSession::new(404);
        session.walls.clear();
        session
    }

    fn place(session: &mut GameSession, id: &str, x: i32, y: i32, dir: Direction) {
        let player = session.players.get_mut(id).expect("player should exist");
        player.x = x;
        player.y = y;
        player.dir = dir;
    }

    fn event_types(events: &[Outbound]) -> Vec<String> {
        events
            .iter()
            .map(|outbound| {
                serde_json::to_value(&outbound.event)
                    .expect("event should serialize")
                    .get("type")
                    .and_then(|v| v.as_str())
                    .expect("event should carry a type tag")
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn join_sends_init_snapshot_and_announcement() {
        let mut session = GameSession::new(1);
        let events = session.join("p1", Some("👻"));
        assert_eq!(event_types(&events), ["init", "players", "playerJoined"]);

        match &events[0] {
            Outbound {
                to: Recipient::Player(target),
                event:
                    ServerEvent::Init {
                        id,
                        x,
                        y,
                        avatar,
                        room_size,
                        walls,
                    },
            } => {
                assert_eq!(target, "p1");
                assert_eq!(id, "p1");
                assert!(grid::on_edge_ring(*x, *y));
                assert_eq!(avatar, "👻");
                assert_eq!(*room_size, ROOM_SIZE);
                assert_eq!(walls.len(), session.walls.len());
            }
            other => panic!("expected init to the joiner, got {other:?}"),
        }

        match &events[1].event {
            ServerEvent::Players { players } => assert!(players.is_empty()),
            other => panic!("expected empty snapshot, got {other:?}"),
        }

        let events = session.join("p2", None);
        match &events[1].event {
            ServerEvent::Players { players } => {
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].id, "p1");
            }
            other => panic!("expected snapshot with p1, got {other:?}"),
        }
    }

    #[test]
    fn off_palette_avatar_requests_get_a_palette_pick() {
        let mut session = GameSession::new(2);
        session.join("p1", Some("not-an-avatar"));
        let avatar = session.players.get("p1").map(|p| p.avatar.clone());
        assert!(AVATARS.contains(&avatar.expect("player should exist").as_str()));
    }

    #[test]
    fn duplicate_join_is_a_no_op() {
        let mut session = GameSession::new(3);
        session.join("p1", None);
        let events = session.join("p1", None);
        assert!(events.is_empty());
        assert_eq!(session.players.len(), 1);
    }

    #[test]
    fn blocked_move_turns_the_player_but_never_moves_it() {
        let mut session = open_session();
        session.join("p1", None);
        place(&mut session, "p1", 5, 5, Direction::Up);
        session.walls.insert((5, 6));

        for _ in 0..2 {
            let events = session.handle_move("p1", Direction::Down);
            assert!(events.is_empty());
            let player = session.players.get("p1").expect("player should exist");
            assert_eq!((player.x, player.y), (5, 5));
            assert_eq!(player.dir, Direction::Down);
        }
    }

    #[test]
    fn boundary_bump_is_silent_but_still_turns() {
        let mut session = open_session();
        session.join("p1", None);
        place(&mut session, "p1", 4, 0, Direction::Down);

        let events = session.handle_move("p1", Direction::Up);
        assert!(events.is_empty());
        let player = session.players.get("p1").expect("player should exist");
        assert_eq!((player.x, player.y), (4, 0));
        assert_eq!(player.dir, Direction::Up);
    }

    #[test]
    fn moves_for_unknown_players_are_ignored() {
        let mut session = open_session();
        assert!(session.handle_move("nobody", Direction::Left).is_empty());
    }

    #[test]
    fn plain_move_broadcasts_the_new_position_to_others() {
        let mut session = open_session();
        session.join("p1", None);
        place(&mut session, "p1", 5, 5, Direction::Down);

        let events = session.handle_move("p1", Direction::Right);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].to,
            Recipient::Broadcast {
                except: vec!["p1".to_string()]
            }
        );
        match &events[0].event {
            ServerEvent::PlayerMoved { id, x, y } => {
                assert_eq!(id, "p1");
                assert_eq!((*x, *y), (6, 5));
            }
            other => panic!("expected playerMoved, got {other:?}"),
        }
    }

    #[test]
    fn catching_move_kills_exactly_once_and_skips_the_move_broadcast() {
        let mut session = open_session();
        session.join("hunter", None);
        session.join("prey", None);
        place(&mut session, "hunter", 5, 4, Direction::Down);
        place(&mut session, "prey", 5, 7, Direction::Up);

        let events = session.handle_move("hunter", Direction::Down);
        assert_eq!(event_types(&events), ["caught", "died", "playerKilled"]);

        assert_eq!(events[0].to, Recipient::Player("hunter".to_string()));
        match &events[0].event {
            ServerEvent::Caught { player_id, kills } => {
                assert_eq!(player_id, "prey");
                assert_eq!(*kills, 1);
            }
            other => panic!("expected caught, got {other:?}"),
        }
        assert_eq!(events[1].to, Recipient::Player("prey".to_string()));
        assert_eq!(
            events[2].to,
            Recipient::Broadcast {
                except: vec!["hunter".to_string(), "prey".to_string()]
            }
        );

        let prey = session.players.get("prey").expect("prey should exist");
        assert!(!prey.is_alive());
        assert_eq!(
            session.players.get("hunter").map(|p| p.kills),
            Some(1)
        );
    }

    #[test]
    fn two_targets_in_range_cost_only_the_first_its_life() {
        let mut session = open_session();
        session.join("hunter", None);
        session.join("first", None);
        session.join("second", None);
        place(&mut session, "hunter", 5, 4, Direction::Down);
        place(&mut session, "first", 5, 6, Direction::Up);
        place(&mut session, "second", 5, 7, Direction::Up);

        let events = session.handle_move("hunter", Direction::Down);
        let types = event_types(&events);
        assert_eq!(types.iter().filter(|t| *t == "caught").count(), 1);
        assert_eq!(types.iter().filter(|t| *t == "died").count(), 1);

        assert!(!session.players.get("first").expect("exists").is_alive());
        assert!(session.players.get("second").expect("exists").is_alive());
    }

    #[test]
    fn dead_players_cannot_move_or_turn() {
        let mut session = open_session();
        session.join("hunter", None);
        session.join("prey", None);
        place(&mut session, "hunter", 5, 4, Direction::Down);
        place(&mut session, "prey", 5, 6, Direction::Up);
        session.handle_move("hunter", Direction::Down);

        let events = session.handle_move("prey", Direction::Left);
        assert!(events.is_empty());
        let prey = session.players.get("prey").expect("prey should exist");
        assert_eq!((prey.x, prey.y), (5, 6));
        assert_eq!(prey.dir, Direction::Up);
    }

    #[test]
    fn respawn_round_trip_returns_the_victim_to_the_edge_ring() {
        let mut session = GameSession::new(8);
        session.join("hunter", None);
        session.join("prey", None);
        session.walls.clear();
        place(&mut session, "hunter", 5, 4, Direction::Down);
        place(&mut session, "prey", 5, 6, Direction::Up);
        session.handle_move("hunter", Direction::Down);

        assert!(session.step(RESPAWN_DELAY_MS - 1).is_empty());

        let events = session.step(1);
        assert_eq!(event_types(&events), ["respawn", "playerRespawned"]);
        match &events[0].event {
            ServerEvent::Respawn { x, y } => {
                assert!(grid::on_edge_ring(*x, *y));
                assert!(!session.walls.contains(&(*x, *y)));
            }
            other => panic!("expected respawn, got {other:?}"),
        }

        let prey = session.players.get("prey").expect("prey should exist");
        assert!(prey.is_alive());
        assert!(grid::on_edge_ring(prey.x, prey.y));
    }

    #[test]
    fn respawn_deadline_for_a_departed_player_is_dropped() {
        let mut session = open_session();
        session.join("hunter", None);
        session.join("prey", None);
        place(&mut session, "hunter", 5, 4, Direction::Down);
        place(&mut session, "prey", 5, 6, Direction::Up);
        session.handle_move("hunter", Direction::Down);
        session.leave("prey");

        let events = session.step(RESPAWN_DELAY_MS);
        assert!(events.is_empty());
        assert!(!session.players.contains("prey"));
        assert!(session.pending_respawns.is_empty());
    }

    #[test]
    fn reveal_window_broadcasts_every_position_then_closes() {
        let mut session = open_session();
        session.join("p1", None);
        session.join("p2", None);
        place(&mut session, "p1", 3, 3, Direction::Down);
        place(&mut session, "p2", 9, 9, Direction::Up);

        let events = session.step(REVEAL_PERIOD_MS);
        assert_eq!(event_types(&events), ["revealStart"]);
        assert_eq!(events[0].to, Recipient::Broadcast { except: Vec::new() });
        match &events[0].event {
            ServerEvent::RevealStart { players } => {
                let mut ids: Vec<&str> = players.iter().map(|p| p.id.as_str()).collect();
                ids.sort_unstable();
                assert_eq!(ids, ["p1", "p2"]);
                assert!(players.iter().any(|p| p.id == "p1" && p.x == 3 && p.y == 3));
            }
            other => panic!("expected revealStart, got {other:?}"),
        }
        assert!(session.is_revealing());

        let events = session.step(REVEAL_DURATION_MS);
        assert_eq!(event_types(&events), ["revealEnd"]);
        assert!(!session.is_revealing());
    }

    #[test]
    fn join_then_immediate_leave_never_resurfaces_the_id() {
        let mut session = open_session();
        session.join("p1", None);
        session.join("ghost", None);
        session.leave("ghost");

        let mut events = session.step(REVEAL_PERIOD_MS + REVEAL_DURATION_MS);
        events.extend(session.step(REVEAL_PERIOD_MS));
        for outbound in &events {
            let raw = serde_json::to_string(&outbound.event).expect("event should serialize");
            assert!(!raw.contains("ghost"), "broadcast still references ghost: {raw}");
        }
    }
}
