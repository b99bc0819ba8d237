//! Static table of the calls the scoreboard server understands, with the
//! default parameters each one is sent with.

use std::{collections::HashMap, fmt, str::FromStr, sync::LazyLock};

use {
    chainball_protocol::Params,
    serde_json::{Value, json},
};

use crate::error::{Error, Result};

// ── Call kinds ───────────────────────────────────────────────────────────────

/// Every call the gateway can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    GameCanStart,
    GameBegin,
    GameEnd,
    GameStatus,
    ScoreStatus,
    PlayerStatus,
    TournamentActive,
    ActivateTournament,
    DeactivateTournament,
    ActivateGame,
    UpdateRegistry,
    RetrieveRegistry,
    PlayerRegister,
    PlayerUnregister,
    RemotePair,
    RemoteUnpair,
    ScoreEvent,
    SetTurn,
    SetScore,
}

impl CallKind {
    pub const ALL: [Self; 19] = [
        Self::GameCanStart,
        Self::GameBegin,
        Self::GameEnd,
        Self::GameStatus,
        Self::ScoreStatus,
        Self::PlayerStatus,
        Self::TournamentActive,
        Self::ActivateTournament,
        Self::DeactivateTournament,
        Self::ActivateGame,
        Self::UpdateRegistry,
        Self::RetrieveRegistry,
        Self::PlayerRegister,
        Self::PlayerUnregister,
        Self::RemotePair,
        Self::RemoteUnpair,
        Self::ScoreEvent,
        Self::SetTurn,
        Self::SetScore,
    ];

    /// Name on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Self::GameCanStart => "game_can_start",
            Self::GameBegin => "game_begin",
            Self::GameEnd => "game_end",
            Self::GameStatus => "game_status",
            Self::ScoreStatus => "score_status",
            Self::PlayerStatus => "player_status",
            Self::TournamentActive => "tournament_active",
            Self::ActivateTournament => "activate_tournament",
            Self::DeactivateTournament => "deactivate_tournament",
            Self::ActivateGame => "activate_game",
            Self::UpdateRegistry => "update_registry",
            Self::RetrieveRegistry => "retrieve_registry",
            Self::PlayerRegister => "player_register",
            Self::PlayerUnregister => "player_unregister",
            Self::RemotePair => "remote_pair",
            Self::RemoteUnpair => "remote_unpair",
            Self::ScoreEvent => "score_event",
            Self::SetTurn => "set_turn",
            Self::SetScore => "set_score",
        }
    }

    fn defaults(self) -> Value {
        match self {
            Self::ActivateTournament => json!({ "tournament_id": 0 }),
            Self::ActivateGame => json!({ "game_id": 0 }),
            Self::RetrieveRegistry => json!({ "registry_id": "player" }),
            Self::PlayerRegister => json!({ "web_txt": "", "panel_txt": "" }),
            Self::PlayerUnregister | Self::RemotePair | Self::RemoteUnpair => {
                json!({ "player_number": 0 })
            },
            Self::ScoreEvent => json!({ "evt_type": "", "player_num": 0 }),
            Self::SetTurn => json!({ "player_num": 0 }),
            Self::SetScore => json!({ "player_num": 0, "score": 0 }),
            Self::GameCanStart
            | Self::GameBegin
            | Self::GameEnd
            | Self::GameStatus
            | Self::ScoreStatus
            | Self::PlayerStatus
            | Self::TournamentActive
            | Self::DeactivateTournament
            | Self::UpdateRegistry => json!({}),
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CallKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CallRegistry::shared()
            .get(s)
            .map(|d| d.kind)
            .ok_or_else(|| Error::UnknownCall(s.to_string()))
    }
}

// ── Descriptors ──────────────────────────────────────────────────────────────

/// A registered call and the parameters it is sent with by default.
#[derive(Debug, Clone, PartialEq)]
pub struct CallDescriptor {
    pub kind: CallKind,
    pub name: &'static str,
    pub defaults: Params,
}

impl CallDescriptor {
    fn new(kind: CallKind) -> Self {
        let defaults = match kind.defaults() {
            Value::Object(map) => map,
            _ => Params::new(),
        };
        Self {
            kind,
            name: kind.name(),
            defaults,
        }
    }

    /// Registered defaults with `overrides` applied key by key.
    pub fn resolve(&self, overrides: Params) -> Params {
        let mut params = self.defaults.clone();
        params.extend(overrides);
        params
    }
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// Read-only lookup of call descriptors by wire name.
#[derive(Debug)]
pub struct CallRegistry {
    descriptors: HashMap<&'static str, CallDescriptor>,
}

impl Default for CallRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CallRegistry {
    pub fn new() -> Self {
        Self {
            descriptors: CallKind::ALL
                .into_iter()
                .map(|kind| (kind.name(), CallDescriptor::new(kind)))
                .collect(),
        }
    }

    /// Process-wide registry, built on first use.
    pub fn shared() -> &'static CallRegistry {
        static REGISTRY: LazyLock<CallRegistry> = LazyLock::new(CallRegistry::new);
        &REGISTRY
    }

    pub fn get(&self, name: &str) -> Option<&CallDescriptor> {
        self.descriptors.get(name)
    }

    pub fn descriptor(&self, kind: CallKind) -> &CallDescriptor {
        // Every kind is inserted by `new`.
        self.descriptors
            .get(kind.name())
            .unwrap_or_else(|| unreachable!("call {kind} missing from registry"))
    }

    /// Resolve the final parameters for `name`.
    pub fn resolve(&self, name: &str, overrides: Params) -> Result<Params> {
        self.get(name)
            .map(|d| d.resolve(overrides))
            .ok_or_else(|| Error::UnknownCall(name.to_string()))
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.descriptors.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
