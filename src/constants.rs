pub const ROOM_SIZE: i32 = 30;
pub const FLASHLIGHT_RANGE: i32 = 2;

pub const MIN_WALL_SPACING: i32 = 4;
pub const WALL_SEGMENT_CHANCE: f32 = 0.7;
pub const WALL_SEGMENT_MIN_LEN: i32 = 2;
pub const WALL_SEGMENT_MAX_LEN: i32 = 5;

pub const RESPAWN_DELAY_MS: u64 = 2_000;
pub const REVEAL_PERIOD_MS: u64 = 7_000;
pub const REVEAL_DURATION_MS: u64 = 3_000;

pub const TICK_MS: u64 = 100;

pub const SPAWN_SAMPLE_ATTEMPTS: u32 = 100;

pub const AVATARS: &[&str] = &["👤", "👻", "🧟", "🦇", "🐺", "🕷️", "💀", "👹"];
