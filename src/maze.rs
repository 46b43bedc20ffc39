use std::collections::BTreeSet;

use crate::constants::{
    MIN_WALL_SPACING, ROOM_SIZE, WALL_SEGMENT_CHANCE, WALL_SEGMENT_MAX_LEN, WALL_SEGMENT_MIN_LEN,
};
use crate::grid;
use crate::rng::Rng;

#[derive(Clone, Copy, Debug)]
enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    fn cell(self, track: i32, along: i32) -> (i32, i32) {
        match self {
            Self::Horizontal => (along, track),
            Self::Vertical => (track, along),
        }
    }
}

/// Builds the wall set for one session. Deterministic for a given RNG state;
/// the caller swaps the returned set in whole, so no partially built maze is
/// ever observable.
pub fn generate_walls(rng: &mut Rng) -> BTreeSet<(i32, i32)> {
    let mut walls = BTreeSet::new();
    let track_step = MIN_WALL_SPACING + 1;

    let mut track = track_step;
    while track < ROOM_SIZE - 1 {
        lay_track(rng, &mut walls, track, Axis::Horizontal);
        lay_track(rng, &mut walls, track, Axis::Vertical);
        track += track_step;
    }

    // The edge ring is the spawn region and stays wall-free.
    walls.retain(|&(x, y)| !grid::on_edge_ring(x, y));
    walls
}

/// Walks one track, placing segments or skipping a cell, always advancing at
/// least MIN_WALL_SPACING afterwards so corridors between segments keep their
/// minimum width. The walk position strictly increases, so the loop is
/// bounded by the grid side.
fn lay_track(rng: &mut Rng, walls: &mut BTreeSet<(i32, i32)>, track: i32, axis: Axis) {
    let mut along = 0;
    while along < ROOM_SIZE {
        if rng.chance(WALL_SEGMENT_CHANCE) {
            let len = rng.int(WALL_SEGMENT_MIN_LEN, WALL_SEGMENT_MAX_LEN);
            for step in 0..len {
                let cell = along + step;
                if cell >= ROOM_SIZE {
                    break;
                }
                walls.insert(axis.cell(track, cell));
            }
            along += len;
        } else {
            along += 1;
        }
        along += MIN_WALL_SPACING;
    }
}
