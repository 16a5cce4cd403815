//! Blockworld Client
//!
//! Headless host loop. Drives one session at a fixed tick rate, applies
//! server events between ticks and takes commands from stdin:
//!
//! ```text
//!   up | down | left | right   toggle a held direction
//!   stop                       release all directions
//!   click <sx> <sy>            toggle the block under a screen point
//!   block <wx> <wy>            toggle the block under a world point
//!   stats                      log sync counters
//!   quit
//! ```

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, info_span, warn, Instrument};

use blockworld::{
    config::ClientConfig,
    network::{connect, BlockPoint, Loopback, Outbound},
    render::{RenderSync, TracingRenderer},
    sim::input::Direction,
    ClientMessage, DirectionalInput, ServerMessage, Session, Vec2, VERSION,
};

/// Ticks between periodic status logs.
const STATUS_EVERY_TICKS: u64 = 600;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// One stdin command.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Toggle(Direction),
    Stop,
    Click(Vec2),
    Block(Vec2),
    Stats,
    Quit,
}

fn parse_command(line: &str) -> Result<Command> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        bail!("empty command");
    };
    let mut coords = || -> Result<Vec2> {
        let x: f64 = parts.next().context("missing x")?.parse().context("bad x")?;
        let y: f64 = parts.next().context("missing y")?.parse().context("bad y")?;
        Ok(Vec2::new(x, y))
    };
    let cmd = match head {
        "stop" => Command::Stop,
        "click" => Command::Click(coords()?),
        "block" => Command::Block(coords()?),
        "stats" => Command::Stats,
        "quit" | "exit" => Command::Quit,
        other => Command::Toggle(other.parse::<Direction>().map_err(anyhow::Error::msg)?),
    };
    Ok(cmd)
}

/// Stand-in for the server when running offline: every block intent is
/// confirmed straight back.
fn offline_echo(msg: ClientMessage) -> Option<ServerMessage> {
    match msg {
        ClientMessage::PositionUpdate { .. } => None,
        ClientMessage::CreateBlock { x, y } => Some(ServerMessage::BlockCreated(BlockPoint { x, y })),
        ClientMessage::DeleteBlock { x, y } => Some(ServerMessage::BlockDeleted(BlockPoint { x, y })),
    }
}

/// Drive `session` until quit, ctrl-c or the server goes away.
///
/// `after_tick` runs once per tick after the session has reported, with
/// the session as the only argument. Callers run this inside
/// [`session_span`].
async fn run_loop<T, F>(
    mut session: Session<T>,
    mut incoming: mpsc::Receiver<String>,
    config: &ClientConfig,
    mut after_tick: F,
) -> Result<()>
where
    T: Outbound,
    F: FnMut(&mut Session<T>),
{
    let mut ticker = interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let mut input = DirectionalInput::IDLE;
    let mut render = RenderSync::new();
    let mut renderer = TracingRenderer::default();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = session.tick(&input);
                after_tick(&mut session);
                render.sync(session.player().position, session.world(), &config.viewport, &mut renderer);

                if outcome.collided_x || outcome.collided_y {
                    debug!(x = outcome.collided_x, y = outcome.collided_y, "collision");
                }
                if session.tick_count() % STATUS_EVERY_TICKS == 0 {
                    let stats = session.sync().stats();
                    info!(
                        tick = session.tick_count(),
                        x = outcome.position.x,
                        y = outcome.position.y,
                        blocks = session.world().blocks.len(),
                        players = session.world().roster.len(),
                        pending = session.sync().pending_len(),
                        positions_sent = stats.positions_sent,
                        events_applied = stats.events_applied,
                        "status"
                    );
                }
            }

            frame = incoming.recv() => {
                match frame {
                    // Malformed frames are logged and counted by the sync client.
                    Some(text) => { let _ = session.handle_inbound(&text); }
                    None => bail!("server connection closed"),
                }
            }

            line = stdin.next_line(), if stdin_open => {
                let line = match line.context("reading stdin")? {
                    Some(line) => line,
                    None => {
                        debug!("stdin closed");
                        stdin_open = false;
                        continue;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(Command::Toggle(direction)) => input.toggle(direction),
                    Ok(Command::Stop) => input = DirectionalInput::IDLE,
                    Ok(Command::Click(screen)) => {
                        let world = config.viewport.to_world(screen, session.player().position);
                        session.toggle_block(world);
                    }
                    Ok(Command::Block(world)) => {
                        session.toggle_block(world);
                    }
                    Ok(Command::Stats) => {
                        info!(stats = ?session.sync().stats(), "sync stats");
                    }
                    Ok(Command::Quit) => break,
                    Err(e) => warn!("Ignoring command {:?}: {:#}", line, e),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    info!(session = %session.id(), ticks = session.tick_count(), "session ended");
    Ok(())
}

/// Span carrying the session id on every event the host loop logs.
fn session_span<T: Outbound>(session: &Session<T>) -> tracing::Span {
    info_span!("session", id = %session.id())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = ClientConfig::from_env().context("loading configuration")?;
    info!("Blockworld client v{}", VERSION);
    info!(tick_rate = config.tick_rate, offline = config.offline, "configuration loaded");

    if config.offline {
        let mut session = Session::from_config(Loopback::new(), &config);
        let (cols, rows) = config.viewport.tile_cover();
        let seeded = session.world_mut().blocks.seed_ground(cols, rows);
        info!(blocks = seeded, "offline world seeded");

        // Keep the sender alive so the inbound branch stays pending.
        let (_inbound_tx, inbound_rx) = mpsc::channel::<String>(1);
        let span = session_span(&session);
        return run_loop(session, inbound_rx, &config, |session| {
            let sent = session.sync_mut().outbound_mut().drain();
            for reply in sent.into_iter().filter_map(offline_echo) {
                session.apply(reply);
            }
        })
        .instrument(span)
        .await;
    }

    let connection = connect(&config.server_url, config.queue_capacity)
        .await
        .with_context(|| format!("connecting to {}", config.server_url))?;
    let (outgoing, incoming, tasks) = connection.into_parts();

    let session = Session::from_config(outgoing, &config);
    let span = session_span(&session);
    let result = run_loop(session, incoming, &config, |_| {})
        .instrument(span)
        .await;
    tasks.shutdown();
    result
}
