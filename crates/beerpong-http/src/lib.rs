//! HTTP surface of the beerpong bridge.
//!
//! - `GET /version`: build version
//! - `GET /status`: latest sensor reading
//! - `POST /begin`: register the player and start a game
//! - `POST /end`: score the game and store the result
//!
//! Any other path is served from the front-end directory when one is
//! configured.

pub mod error;
pub mod game;
pub mod routes;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use game::{GameData, GameState, StatusData};
pub use server::{router, serve, AppState, HttpConfig, DEFAULT_LISTEN_PORT};
