//! Aggregate status view assembled from several status calls.

use std::collections::BTreeMap;

use {serde::Serialize, serde_json::Value, tracing::debug};

use crate::{
    client::ScoreboardClient,
    error::{ErrorKind, Result},
};

/// What the scoreboard reported, one field per status call.
///
/// A field is `None` when its call failed; the failure class is kept in
/// `errors` under the same name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub game: Option<Value>,
    pub players: Option<Value>,
    pub scores: Option<Value>,
    pub tournament: Option<Value>,
    pub can_start: Option<bool>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<&'static str, ErrorKind>,
}

impl StatusSnapshot {
    /// True when every call answered.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    fn degrade<T>(&mut self, field: &'static str, outcome: Result<T>) -> Option<T> {
        match outcome {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(field, kind = ?e.kind(), "status field unavailable");
                self.errors.insert(field, e.kind());
                None
            },
        }
    }
}

impl ScoreboardClient {
    /// Issue the status calls concurrently and collect what answered.
    pub async fn status_snapshot(&self) -> StatusSnapshot {
        let (game, players, scores, tournament, can_start) = tokio::join!(
            self.game_status(),
            self.player_status(),
            self.score_status(),
            self.tournament_active(),
            self.game_can_start(),
        );

        let mut snapshot = StatusSnapshot::default();
        snapshot.game = snapshot.degrade("game", game);
        snapshot.players = snapshot.degrade("players", players);
        snapshot.scores = snapshot.degrade("scores", scores);
        snapshot.tournament = snapshot.degrade("tournament", tournament);
        snapshot.can_start = snapshot.degrade("can_start", can_start);
        snapshot
    }
}
