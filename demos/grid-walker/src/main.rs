//! Connects to a game server and wanders the grid one random step at a
//! time until Ctrl-C.
//!
//! ```text
//! grid-walker [ENDPOINT] [STEPS]
//! ```
//!
//! `ENDPOINT` is either a host (`grid.example.com`, resolved to
//! `wss://<host>/websocket`) or a full `ws://`/`wss://` URL. Defaults to
//! `ws://127.0.0.1:8080/websocket`. Secure endpoints need
//! `--features gridlink/tls`.

use std::sync::Arc;
use std::time::Duration;

use gridlink::prelude::*;
use gridlink::StaticUpstream;
use rand::Rng;

const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8080/websocket";

fn game_config() -> GameConfig {
    GameConfig {
        world_grid_size: [32, 32],
        max_active_players: 100,
        player_size: 48,
        grid_cell_size: 64,
        player_move_duration_ms: 300,
    }
}

/// The in-bounds neighbours of `pos`.
fn neighbours(pos: GridPos, world: [u32; 2]) -> Vec<GridPos> {
    let mut cells = Vec::with_capacity(8);
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let x = i64::from(pos.x) + dx;
            let y = i64::from(pos.y) + dy;
            if (0..i64::from(world[0])).contains(&x) && (0..i64::from(world[1])).contains(&y) {
                cells.push(GridPos::new(x as u32, y as u32));
            }
        }
    }
    cells
}

fn random_step(pos: GridPos, world: [u32; 2], rng: &mut impl Rng) -> Option<GridPos> {
    let cells = neighbours(pos, world);
    if cells.is_empty() {
        return None;
    }
    Some(cells[rng.random_range(0..cells.len())])
}

fn client_config(endpoint: &str) -> ClientConfig {
    if endpoint.contains("://") {
        ClientConfig {
            url: Some(endpoint.to_owned()),
            allow_insecure: endpoint.starts_with("ws://"),
            ..ClientConfig::default()
        }
    } else {
        ClientConfig {
            host: Some(endpoint.to_owned()),
            ..ClientConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    gridlink::init_tracing();

    let mut args = std::env::args().skip(1);
    let endpoint = args.next().unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned());
    let steps: Option<u64> = args.next().map(|s| s.parse()).transpose()?;

    let client = GridClient::builder()
        .config(client_config(&endpoint))
        .upstream(StaticUpstream::new(game_config()))
        .connect()?;
    let config = client.get_config().await?;
    let initial = client
        .get_state(false)
        .await?
        .unwrap_or_else(|| ServerState::new(0, PlayerState::new("walker", 16, 16)));

    let world = Arc::new(GameState::new(config.clone(), initial));
    let w = Arc::clone(&world);
    client.on_new_state(move |state| {
        w.apply(state);
        tracing::info!(
            time = state.time,
            x = state.me.grid_x,
            y = state.me.grid_y,
            players = state.players.len(),
            "new state"
        );
    });

    let governor = client.governor(Arc::clone(&world));
    let pace = Duration::from_millis(config.player_move_duration_ms.max(100));
    let mut rng = rand::rng();
    let mut taken = 0u64;

    loop {
        if steps.is_some_and(|limit| taken >= limit) {
            break;
        }
        let Some(target) = random_step(world.player_pos(), config.world_grid_size, &mut rng)
        else {
            tracing::warn!("nowhere to go");
            break;
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            outcome = governor.on_gesture(target) => {
                tracing::info!(%target, ?outcome, "step");
                taken += 1;
            }
        }
        tokio::time::sleep(pace).await;
    }

    tracing::info!(steps = taken, "walker done");
    client.close();
    Ok(())
}
