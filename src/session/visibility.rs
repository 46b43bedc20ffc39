use crate::constants::FLASHLIGHT_RANGE;
use crate::grid;
use crate::types::Direction;

use super::registry::Player;

/// The cells a player at (x, y) can currently see: the own cell plus a
/// 3-cell-wide band for each step of depth ahead, clipped to the grid.
/// Catch checks and client render gating both run on this exact set.
pub fn flashlight_cells(x: i32, y: i32, dir: Direction) -> Vec<(i32, i32)> {
    let mut cells = vec![(x, y)];
    for depth in 1..=FLASHLIGHT_RANGE {
        for side in -1..=1 {
            let (cx, cy) = match dir {
                Direction::Up => (x + side, y - depth),
                Direction::Down => (x + side, y + depth),
                Direction::Left => (x - depth, y + side),
                Direction::Right => (x + depth, y + side),
            };
            if grid::in_bounds(cx, cy) {
                cells.push((cx, cy));
            }
        }
    }
    cells
}

/// True when the catcher's flashlight covers an alive target strictly ahead
/// of it. Standing on the same cell never counts.
pub fn can_catch(catcher: &Player, target: &Player) -> bool {
    target.is_alive()
        && target.id != catcher.id
        && (target.x, target.y) != (catcher.x, catcher.y)
        && flashlight_cells(catcher.x, catcher.y, catcher.dir).contains(&(target.x, target.y))
}
