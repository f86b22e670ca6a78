//! The local view of the world that gestures are checked against.

use std::sync::{Mutex, MutexGuard, PoisonError};

use gridlink_protocol::{FieldOfView, GameConfig, GridPos, PlayerState, ServerState};

/// What the [`MoveGovernor`](crate::MoveGovernor) needs from the UI side.
///
/// Methods take `&self`: the world is shared between the governor and a
/// state observer, so implementations use interior mutability.
pub trait LocalWorld: Send + Sync + 'static {
    /// The cell the local player stands on.
    fn player_pos(&self) -> GridPos;

    /// Checks local legality of a move and, if legal, applies it
    /// optimistically. Returns `false` for an illegal target.
    fn try_move_me_to(&self, target: GridPos) -> bool;

    /// The cells currently on screen, sent with each move request.
    fn field_of_view(&self) -> FieldOfView;

    /// Highlights a cell, or clears the highlight with `None`.
    fn select(&self, cell: Option<GridPos>);
}

/// A pixel rectangle of the world currently on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

#[derive(Debug)]
struct WorldInner {
    state: ServerState,
    viewport: Option<Viewport>,
    selected: Option<GridPos>,
}

/// [`LocalWorld`] backed by the latest accepted [`ServerState`].
///
/// Register [`apply`](Self::apply) as a state observer to keep it current:
///
/// ```rust,ignore
/// let world = Arc::new(GameState::new(config, initial));
/// let w = Arc::clone(&world);
/// client.on_new_state(move |state| w.apply(state));
/// ```
#[derive(Debug)]
pub struct GameState {
    config: GameConfig,
    inner: Mutex<WorldInner>,
}

impl GameState {
    pub fn new(config: GameConfig, state: ServerState) -> Self {
        Self {
            config,
            inner: Mutex::new(WorldInner {
                state,
                viewport: None,
                selected: None,
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, WorldInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Replaces the snapshot. Freshness is the notifier's job, so this
    /// accepts whatever it is given.
    pub fn apply(&self, state: &ServerState) {
        self.inner().state = state.clone();
    }

    /// A copy of the current snapshot.
    pub fn snapshot(&self) -> ServerState {
        self.inner().state.clone()
    }

    pub fn me(&self) -> PlayerState {
        self.inner().state.me.clone()
    }

    pub fn time(&self) -> u64 {
        self.inner().state.time
    }

    pub fn selected(&self) -> Option<GridPos> {
        self.inner().selected
    }

    /// Sets the on-screen pixel rectangle used for [`field_of_view`](LocalWorld::field_of_view).
    pub fn set_viewport(&self, viewport: Viewport) {
        self.inner().viewport = Some(viewport);
    }
}

impl LocalWorld for GameState {
    fn player_pos(&self) -> GridPos {
        self.inner().state.me.grid_pos()
    }

    fn try_move_me_to(&self, target: GridPos) -> bool {
        if !self.config.contains(target) {
            tracing::debug!(%target, "target outside the world");
            return false;
        }
        let mut inner = self.inner();
        let from = inner.state.me.grid_pos();
        if !from.is_adjacent(&target) {
            tracing::debug!(%from, %target, "target not adjacent");
            return false;
        }
        inner.state.me.grid_x = target.x;
        inner.state.me.grid_y = target.y;
        true
    }

    /// Without a viewport, the whole world is in view.
    fn field_of_view(&self) -> FieldOfView {
        let [w, h] = self.config.world_grid_size;
        match self.inner().viewport {
            Some(v) => FieldOfView::from_viewport(
                v.left,
                v.top,
                v.right,
                v.bottom,
                self.config.grid_cell_size,
                self.config.world_grid_size,
            ),
            None => FieldOfView::new(0, 0, w.saturating_sub(1), h.saturating_sub(1)),
        }
    }

    fn select(&self, cell: Option<GridPos>) {
        self.inner().selected = cell;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        GameConfig {
            world_grid_size: [10, 8],
            max_active_players: 100,
            player_size: 48,
            grid_cell_size: 64,
            player_move_duration_ms: 300,
        }
    }

    fn world_at(x: u32, y: u32) -> GameState {
        GameState::new(config(), ServerState::new(1, PlayerState::new("me", x, y)))
    }

    #[test]
    fn test_adjacent_move_is_applied_optimistically() {
        let world = world_at(2, 2);
        assert!(world.try_move_me_to(GridPos::new(3, 3)));
        assert_eq!(world.player_pos(), GridPos::new(3, 3));
        assert_eq!(world.time(), 1, "only the position changes");
    }

    #[test]
    fn test_non_adjacent_move_is_rejected() {
        let world = world_at(2, 2);
        assert!(!world.try_move_me_to(GridPos::new(4, 2)));
        assert!(!world.try_move_me_to(GridPos::new(2, 2)));
        assert_eq!(world.player_pos(), GridPos::new(2, 2));
    }

    #[test]
    fn test_move_off_the_grid_is_rejected() {
        let world = world_at(9, 7);
        assert!(!world.try_move_me_to(GridPos::new(10, 7)));
        assert!(!world.try_move_me_to(GridPos::new(9, 8)));
        assert!(world.try_move_me_to(GridPos::new(8, 6)));
    }

    #[test]
    fn test_apply_replaces_snapshot() {
        let world = world_at(2, 2);
        let mut next = ServerState::new(5, PlayerState::new("me", 6, 1));
        next.players.push(PlayerState::new("other", 6, 2));
        world.apply(&next);

        assert_eq!(world.player_pos(), GridPos::new(6, 1));
        assert_eq!(world.snapshot().players.len(), 1);
        assert_eq!(world.time(), 5);
    }

    #[test]
    fn test_field_of_view_defaults_to_whole_world() {
        assert_eq!(world_at(0, 0).field_of_view(), FieldOfView::new(0, 0, 9, 7));
    }

    #[test]
    fn test_field_of_view_follows_viewport() {
        let world = world_at(0, 0);
        world.set_viewport(Viewport {
            left: -20.0,
            top: 64.0,
            right: 300.0,
            bottom: 10_000.0,
        });
        assert_eq!(world.field_of_view(), FieldOfView::new(0, 1, 4, 7));
    }

    #[test]
    fn test_selection() {
        let world = world_at(0, 0);
        world.select(Some(GridPos::new(1, 0)));
        assert_eq!(world.selected(), Some(GridPos::new(1, 0)));
        world.select(None);
        assert_eq!(world.selected(), None);
    }
}
