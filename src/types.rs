use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn offset(self, x: i32, y: i32) -> (i32, i32) {
        match self {
            Self::Up => (x, y - 1),
            Self::Down => (x, y + 1),
            Self::Left => (x - 1, y),
            Self::Right => (x + 1, y),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifeState {
    Alive,
    Dead,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub avatar: String,
    pub kills: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct RevealedPlayer {
    pub id: String,
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    Init {
        id: String,
        x: i32,
        y: i32,
        avatar: String,
        #[serde(rename = "roomSize")]
        room_size: i32,
        walls: Vec<(i32, i32)>,
    },
    Players {
        players: Vec<PlayerView>,
    },
    PlayerJoined {
        id: String,
        x: i32,
        y: i32,
        avatar: String,
        kills: u32,
    },
    PlayerMoved {
        id: String,
        x: i32,
        y: i32,
    },
    PlayerLeft {
        id: String,
    },
    Caught {
        #[serde(rename = "playerId")]
        player_id: String,
        kills: u32,
    },
    Died,
    PlayerKilled {
        #[serde(rename = "killerId")]
        killer_id: String,
        #[serde(rename = "killedId")]
        killed_id: String,
        kills: u32,
    },
    Respawn {
        x: i32,
        y: i32,
    },
    PlayerRespawned {
        id: String,
        x: i32,
        y: i32,
        avatar: String,
    },
    RevealStart {
        players: Vec<RevealedPlayer>,
    },
    RevealEnd,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_camel_case_type_tags() {
        let event = ServerEvent::PlayerKilled {
            killer_id: "player_1".to_string(),
            killed_id: "player_2".to_string(),
            kills: 3,
        };
        let raw = serde_json::to_string(&event).expect("event should serialize");
        assert!(raw.contains(r#""type":"playerKilled""#));
        assert!(raw.contains(r#""killerId":"player_1""#));
        assert!(raw.contains(r#""killedId":"player_2""#));
    }

    #[test]
    fn died_event_is_a_bare_tag() {
        let raw = serde_json::to_string(&ServerEvent::Died).expect("event should serialize");
        assert_eq!(raw, r#"{"type":"died"}"#);
    }

    #[test]
    fn init_event_carries_room_size_and_wall_pairs() {
        let event = ServerEvent::Init {
            id: "player_1".to_string(),
            x: 0,
            y: 4,
            avatar: "👻".to_string(),
            room_size: 30,
            walls: vec![(5, 5), (6, 5)],
        };
        let raw = serde_json::to_string(&event).expect("event should serialize");
        assert!(raw.contains(r#""roomSize":30"#));
        assert!(raw.contains(r#""walls":[[5,5],[6,5]]"#));
    }

    #[test]
    fn parse_move_rejects_unknown_directions() {
        assert_eq!(Direction::parse_move("up"), Some(Direction::Up));
        assert_eq!(Direction::parse_move("diagonal"), None);
        assert_eq!(Direction::parse_move(""), None);
    }
}
