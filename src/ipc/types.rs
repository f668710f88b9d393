use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    /// Randomness source for the picker. Held on the state so tests and the
    /// daemon share one injection point.
    pub rng: StdRng,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            workspace: None,
            db: None,
            rng: StdRng::from_entropy(),
        }
    }
}
