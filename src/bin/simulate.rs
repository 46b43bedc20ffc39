use clap::Parser;
use hide_tag_server::constants::TICK_MS;
use hide_tag_server::rng::Rng;
use hide_tag_server::session::{GameSession, Outbound};
use hide_tag_server::types::{Direction, ServerEvent};
use rand::Rng as _;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Number of scripted bots.
    #[arg(long, default_value_t = 8)]
    bots: usize,
    /// Simulated duration in seconds.
    #[arg(long, default_value_t = 120)]
    seconds: u64,
    /// Session seed; drawn at random when omitted.
    #[arg(long)]
    seed: Option<u32>,
    /// Probability that a bot issues a move on a given tick.
    #[arg(long, default_value_t = 0.35)]
    move_rate: f32,
}

#[derive(Default)]
struct Tally {
    moves: u64,
    kills: u64,
    respawns: u64,
    reveals: u64,
}

impl Tally {
    fn absorb(&mut self, events: &[Outbound]) {
        for outbound in events {
            match &outbound.event {
                ServerEvent::PlayerMoved { .. } => self.moves += 1,
                ServerEvent::PlayerKilled { .. } => self.kills += 1,
                ServerEvent::Respawn { .. } => self.respawns += 1,
                ServerEvent::RevealStart { .. } => self.reveals += 1,
                _ => {}
            }
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let seed = cli.seed.unwrap_or_else(|| rand::rng().random());

    let mut session = GameSession::new(seed);
    let mut bot_rng = Rng::new(seed ^ 0x5eed_b075);
    let mut tally = Tally::default();

    let bot_ids: Vec<String> = (1..=cli.bots).map(|index| format!("bot_{index}")).collect();
    for id in &bot_ids {
        let events = session.join(id, None);
        tally.absorb(&events);
    }

    let ticks = cli.seconds * 1_000 / TICK_MS;
    for _ in 0..ticks {
        for id in &bot_ids {
            if bot_rng.chance(cli.move_rate) {
                let events = session.handle_move(id, random_direction(&mut bot_rng));
                tally.absorb(&events);
            }
        }
        let events = session.step(TICK_MS);
        tally.absorb(&events);
    }

    let alive_at_end = session.players().iter().filter(|p| p.is_alive()).count();
    let dead_at_end = session.players().len() - alive_at_end;
    let kill_counters: u64 = session.players().iter().map(|p| u64::from(p.kills)).sum();

    let mut anomalies: Vec<String> = Vec::new();
    if kill_counters != tally.kills {
        anomalies.push(format!(
            "kill counters ({kill_counters}) disagree with kill events ({})",
            tally.kills
        ));
    }
    if tally.respawns + dead_at_end as u64 != tally.kills {
        anomalies.push(format!(
            "respawns ({}) plus pending dead ({dead_at_end}) disagree with kills ({})",
            tally.respawns, tally.kills
        ));
    }

    let summary = json!({
        "seed": seed,
        "bots": cli.bots,
        "simulatedMs": ticks * TICK_MS,
        "moves": tally.moves,
        "kills": tally.kills,
        "respawns": tally.respawns,
        "reveals": tally.reveals,
        "aliveAtEnd": alive_at_end,
        "anomalies": anomalies,
    });
    println!("{summary}");
}

fn random_direction(rng: &mut Rng) -> Direction {
    match rng.int(0, 3) {
        0 => Direction::Up,
        1 => Direction::Down,
        2 => Direction::Left,
        _ => Direction::Right,
    }
}
