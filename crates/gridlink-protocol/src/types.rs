//! Core protocol types for gridlink's wire format.
//!
//! Everything here travels on the wire between the game server and the
//! client. Field names are camelCase on the wire (`gridX`, `cellsCount`,
//! ...) because the server speaks that dialect.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity and coordinates
// ---------------------------------------------------------------------------

/// A unique identifier for a player, as assigned by the server.
///
/// `#[serde(transparent)]` keeps it a plain string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// A cell position on the world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
}

impl GridPos {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Returns `true` if `other` is one of the eight neighbours of `self`.
    ///
    /// Diagonal neighbours count; the cell itself does not.
    pub fn is_adjacent(&self, other: &GridPos) -> bool {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx.max(dy) == 1
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(u32, u32)> for GridPos {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

/// The rectangle of grid cells the player currently sees.
///
/// On the wire: `[[minX, minY], [maxX, maxY]]`, both corners inclusive.
/// The server uses it to decide which cells to include in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldOfView(pub [[u32; 2]; 2]);

impl FieldOfView {
    /// Builds a rectangle from two corners in any order.
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self([[x0.min(x1), y0.min(y1)], [x0.max(x1), y0.max(y1)]])
    }

    /// Converts a pixel viewport into the grid cells it covers.
    ///
    /// Negative pixel coordinates clamp to 0, and the far corner clamps to
    /// the last cell of a `world_size` grid.
    pub fn from_viewport(
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        cell_size: u32,
        world_size: [u32; 2],
    ) -> Self {
        let cell = cell_size.max(1) as f32;
        let max_x = world_size[0].saturating_sub(1);
        let max_y = world_size[1].saturating_sub(1);
        let to_cell = |px: f32, limit: u32| -> u32 {
            if px <= 0.0 {
                0
            } else {
                ((px / cell).floor() as u32).min(limit)
            }
        };
        Self::new(
            to_cell(left, max_x),
            to_cell(top, max_y),
            to_cell(right, max_x),
            to_cell(bottom, max_y),
        )
    }

    pub fn min(&self) -> GridPos {
        GridPos::new(self.0[0][0], self.0[0][1])
    }

    pub fn max(&self) -> GridPos {
        GridPos::new(self.0[1][0], self.0[1][1])
    }

    /// Returns `true` if `pos` lies inside the rectangle.
    pub fn contains(&self, pos: GridPos) -> bool {
        let (min, max) = (self.min(), self.max());
        (min.x..=max.x).contains(&pos.x) && (min.y..=max.y).contains(&pos.y)
    }
}

// ---------------------------------------------------------------------------
// World state
// ---------------------------------------------------------------------------

/// What a player is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    #[default]
    Default,
    /// Standing on a cell while it is being captured.
    Capturing,
}

/// One player's state inside a [`ServerState`] snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: PlayerId,
    pub grid_x: u32,
    pub grid_y: u32,
    /// RGB hex color without the leading `#`, e.g. `"ff8800"`.
    pub color: String,
    #[serde(default)]
    pub state: PlayerStatus,
    #[serde(default)]
    pub cells_count: u32,
    #[serde(default)]
    pub image_type: u8,
    #[serde(default)]
    pub tg_username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tg_avatar: Option<String>,
}

impl PlayerState {
    /// A player at `(grid_x, grid_y)` with every other field defaulted.
    pub fn new(id: impl Into<PlayerId>, grid_x: u32, grid_y: u32) -> Self {
        Self {
            id: id.into(),
            grid_x,
            grid_y,
            color: "ffffff".to_owned(),
            state: PlayerStatus::Default,
            cells_count: 0,
            image_type: 1,
            tg_username: String::new(),
            tg_avatar: None,
        }
    }

    pub fn grid_pos(&self) -> GridPos {
        GridPos::new(self.grid_x, self.grid_y)
    }
}

/// A captured cell and its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCellState {
    pub x: u32,
    pub y: u32,
    pub owner_id: PlayerId,
}

/// Aggregate numbers, only present when explicitly requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStats {
    pub online_players: u32,
    pub total_cells: u32,
}

/// A full world snapshot as seen by this client.
///
/// `time` increases monotonically on the server; the client uses it as a
/// freshness watermark to reject stale or duplicate snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerState {
    pub time: u64,
    /// The local player.
    pub me: PlayerState,
    /// Other players in the field of view.
    #[serde(default)]
    pub players: Vec<PlayerState>,
    /// Owned cells in the field of view.
    #[serde(default)]
    pub grid: Vec<GridCellState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ServerStats>,
}

impl ServerState {
    /// A snapshot with only `time` and the local player filled in.
    pub fn new(time: u64, me: PlayerState) -> Self {
        Self {
            time,
            me,
            players: Vec::new(),
            grid: Vec::new(),
            stats: None,
        }
    }
}

/// Static game parameters served once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    /// Grid width and height in cells.
    pub world_grid_size: [u32; 2],
    pub max_active_players: u32,
    /// Player sprite size in pixels.
    pub player_size: u32,
    /// Cell edge length in pixels.
    pub grid_cell_size: u32,
    pub player_move_duration_ms: u64,
}

impl GameConfig {
    /// Returns `true` if `pos` lies on the world grid.
    pub fn contains(&self, pos: GridPos) -> bool {
        pos.x < self.world_grid_size[0] && pos.y < self.world_grid_size[1]
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Payload of a move request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequestData {
    pub grid_x: u32,
    pub grid_y: u32,
    pub fov: FieldOfView,
}

/// Every message on the wire.
///
/// A closed set: adding a kind is a compile-time change, and every `match`
/// on it is exhaustive. On the wire it is adjacently tagged:
///
/// ```text
/// { "type": "move-request", "payload": { "gridX": 2, "gridY": 3, "fov": [[0,0],[10,10]] } }
/// ```
///
/// A frame with any other `type` fails to decode and is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Envelope {
    /// Server → client push.
    StateUpdate(ServerState),
    /// Client → server.
    MoveRequest(MoveRequestData),
    /// Server → client answer to the outstanding move request.
    MoveResponse(ServerState),
}

impl Envelope {
    /// The wire tag of this envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StateUpdate(_) => "state-update",
            Self::MoveRequest(_) => "move-request",
            Self::MoveResponse(_) => "move-response",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The server dictates the JSON shapes; these tests pin them.

    use super::*;

    fn me() -> PlayerState {
        PlayerState::new("p-1", 2, 2)
    }

    // =====================================================================
    // GridPos
    // =====================================================================

    #[test]
    fn test_grid_pos_adjacency_includes_diagonals() {
        let center = GridPos::new(2, 2);
        assert!(center.is_adjacent(&GridPos::new(2, 3)));
        assert!(center.is_adjacent(&GridPos::new(1, 1)));
        assert!(center.is_adjacent(&GridPos::new(3, 1)));
        assert!(!center.is_adjacent(&GridPos::new(2, 2)));
        assert!(!center.is_adjacent(&GridPos::new(2, 4)));
        assert!(!center.is_adjacent(&GridPos::new(0, 0)));
    }

    #[test]
    fn test_grid_pos_adjacency_at_origin() {
        let origin = GridPos::new(0, 0);
        assert!(origin.is_adjacent(&GridPos::new(1, 0)));
        assert!(origin.is_adjacent(&GridPos::new(1, 1)));
    }

    // =====================================================================
    // FieldOfView
    // =====================================================================

    #[test]
    fn test_fov_serializes_as_nested_pairs() {
        let fov = FieldOfView::new(0, 0, 10, 10);
        let json = serde_json::to_string(&fov).unwrap();
        assert_eq!(json, "[[0,0],[10,10]]");
    }

    #[test]
    fn test_fov_new_normalizes_corners() {
        let fov = FieldOfView::new(10, 3, 1, 7);
        assert_eq!(fov.min(), GridPos::new(1, 3));
        assert_eq!(fov.max(), GridPos::new(10, 7));
    }

    #[test]
    fn test_fov_from_viewport_converts_and_clamps() {
        // 80 px cells on a 20x20 world.
        let fov = FieldOfView::from_viewport(-40.0, 100.0, 830.0, 5000.0, 80, [20, 20]);
        assert_eq!(fov.min(), GridPos::new(0, 1));
        assert_eq!(fov.max(), GridPos::new(10, 19));
    }

    #[test]
    fn test_fov_contains() {
        let fov = FieldOfView::new(0, 0, 10, 10);
        assert!(fov.contains(GridPos::new(10, 0)));
        assert!(!fov.contains(GridPos::new(11, 5)));
    }

    // =====================================================================
    // Players and state
    // =====================================================================

    #[test]
    fn test_player_state_uses_camel_case() {
        let json = serde_json::to_value(me()).unwrap();
        assert_eq!(json["gridX"], 2);
        assert_eq!(json["gridY"], 2);
        assert_eq!(json["cellsCount"], 0);
        assert_eq!(json["state"], "default");
        assert!(json.get("tgAvatar").is_none());
    }

    #[test]
    fn test_player_state_optional_fields_default() {
        let json = r#"{ "id": "u1", "gridX": 4, "gridY": 5, "color": "ff0000" }"#;
        let player: PlayerState = serde_json::from_str(json).unwrap();
        assert_eq!(player.grid_pos(), GridPos::new(4, 5));
        assert_eq!(player.state, PlayerStatus::Default);
        assert_eq!(player.tg_avatar, None);
    }

    #[test]
    fn test_player_status_capturing_wire_name() {
        let json = serde_json::to_string(&PlayerStatus::Capturing).unwrap();
        assert_eq!(json, "\"capturing\"");
    }

    #[test]
    fn test_server_state_without_optional_lists() {
        let json = r#"{
            "time": 42,
            "me": { "id": "u1", "gridX": 2, "gridY": 3, "color": "00ff00" }
        }"#;
        let state: ServerState = serde_json::from_str(json).unwrap();
        assert_eq!(state.time, 42);
        assert!(state.players.is_empty());
        assert!(state.grid.is_empty());
        assert!(state.stats.is_none());
    }

    #[test]
    fn test_game_config_contains() {
        let config = GameConfig {
            world_grid_size: [10, 5],
            max_active_players: 100,
            player_size: 64,
            grid_cell_size: 80,
            player_move_duration_ms: 300,
        };
        assert!(config.contains(GridPos::new(9, 4)));
        assert!(!config.contains(GridPos::new(10, 4)));
        assert!(!config.contains(GridPos::new(0, 5)));
    }

    // =====================================================================
    // Envelope
    // =====================================================================

    #[test]
    fn test_move_request_json_format() {
        let envelope = Envelope::MoveRequest(MoveRequestData {
            grid_x: 2,
            grid_y: 3,
            fov: FieldOfView::new(0, 0, 10, 10),
        });
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "type": "move-request",
                "payload": { "gridX": 2, "gridY": 3, "fov": [[0, 0], [10, 10]] }
            })
        );
    }

    #[test]
    fn test_state_update_and_move_response_tags() {
        let update = Envelope::StateUpdate(ServerState::new(1, me()));
        let response = Envelope::MoveResponse(ServerState::new(2, me()));

        assert_eq!(serde_json::to_value(&update).unwrap()["type"], "state-update");
        assert_eq!(serde_json::to_value(&response).unwrap()["type"], "move-response");
        assert_eq!(update.kind(), "state-update");
        assert_eq!(response.kind(), "move-response");
    }

    #[test]
    fn test_unknown_envelope_type_fails_to_decode() {
        let unknown = r#"{ "type": "fly-to-moon", "payload": {} }"#;
        let result: Result<Envelope, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    #[test]
    fn test_envelope_missing_payload_fails_to_decode() {
        let result: Result<Envelope, _> = serde_json::from_str(r#"{ "type": "state-update" }"#);
        assert!(result.is_err());
    }
}
