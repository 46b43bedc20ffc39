use crate::constants::{ROOM_SIZE, SPAWN_SAMPLE_ATTEMPTS};
use crate::rng::Rng;

use super::GameSession;

impl GameSession {
    /// Random edge-ring point that is not a wall cell, by rejection
    /// sampling. After 100 misses the first sample is accepted as-is, even
    /// if it sits on a wall; retrying further would skew the spawn
    /// distribution.
    pub(super) fn pick_edge_spawn(&mut self) -> (i32, i32) {
        let first = random_edge_point(&mut self.rng);
        if !self.walls.contains(&first) {
            return first;
        }
        for _ in 1..SPAWN_SAMPLE_ATTEMPTS {
            let point = random_edge_point(&mut self.rng);
            if !self.walls.contains(&point) {
                return point;
            }
        }
        first
    }
}

fn random_edge_point(rng: &mut Rng) -> (i32, i32) {
    match rng.int(0, 3) {
        0 => (rng.int(0, ROOM_SIZE - 1), 0),
        1 => (ROOM_SIZE - 1, rng.int(0, ROOM_SIZE - 1)),
        2 => (rng.int(0, ROOM_SIZE - 1), ROOM_SIZE - 1),
        _ => (0, rng.int(0, ROOM_SIZE - 1)),
    }
}
