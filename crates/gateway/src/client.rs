//! Scoreboard client: the single entry point for issuing calls.

use std::{sync::Arc, time::Duration};

use {
    chainball_config::ScoreboardConfig,
    chainball_protocol::{Params, RegistryKind, RequestFrame},
    serde_json::{Value, json},
    tracing::{debug, error, warn},
};

use crate::{
    error::{Error, ErrorKind, Result},
    registry::{CallKind, CallRegistry},
    transport::{RequestTransport, ZmqTransport, exchange},
};

/// Identifier field used to key registry records.
pub const RECORD_ID_FIELD: &str = "id";

/// Issues calls to the scoreboard server. Cheap to clone.
#[derive(Clone)]
pub struct ScoreboardClient {
    transport: Arc<dyn RequestTransport>,
    registry: &'static CallRegistry,
    timeout: Duration,
}

impl std::fmt::Debug for ScoreboardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreboardClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ScoreboardClient {
    pub fn new(transport: Arc<dyn RequestTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            registry: CallRegistry::shared(),
            timeout,
        }
    }

    /// Client speaking ZeroMQ to the configured request endpoint.
    pub fn from_config(config: &ScoreboardConfig) -> Self {
        Self::new(
            Arc::new(ZmqTransport::new(config.request_endpoint.clone())),
            config.call_timeout(),
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // ── Generic entry points ─────────────────────────────────────────────

    /// Issue `kind` with its registered defaults overridden by `overrides`.
    pub async fn call(&self, kind: CallKind, overrides: Params) -> Result<Value> {
        let params = self.registry.descriptor(kind).resolve(overrides);
        let request = RequestFrame::new(kind.name(), params);

        debug!(call = %kind, "scoreboard call");
        let outcome = exchange(self.transport.as_ref(), &request, self.timeout)
            .await
            .and_then(|payload| post_process(kind, payload));

        if let Err(e) = &outcome {
            match e.kind() {
                ErrorKind::Protocol => error!(call = %kind, error = %e, "scoreboard contract mismatch"),
                _ => warn!(call = %kind, kind = ?e.kind(), error = %e, "scoreboard call failed"),
            }
        }
        outcome
    }

    /// Issue a call named at runtime.
    ///
    /// Names outside the registered vocabulary fail with
    /// [`Error::UnknownCall`] without touching the transport.
    pub async fn dispatch(&self, name: &str, kwargs: Params) -> Result<Value> {
        let kind = match name.parse::<CallKind>() {
            Ok(kind) => kind,
            Err(e) => {
                error!(call = name, "invalid call type");
                return Err(e);
            },
        };
        self.call(kind, kwargs).await
    }

    // ── Game lifecycle ───────────────────────────────────────────────────

    pub async fn game_can_start(&self) -> Result<bool> {
        // `post_process` has already rejected anything but a boolean.
        let payload = self.call(CallKind::GameCanStart, Params::new()).await?;
        Ok(payload == Value::Bool(true))
    }

    pub async fn game_begin(&self) -> Result<Value> {
        self.call(CallKind::GameBegin, Params::new()).await
    }

    pub async fn game_end(&self) -> Result<Value> {
        self.call(CallKind::GameEnd, Params::new()).await
    }

    pub async fn game_status(&self) -> Result<Value> {
        self.call(CallKind::GameStatus, Params::new()).await
    }

    pub async fn score_status(&self) -> Result<Value> {
        self.call(CallKind::ScoreStatus, Params::new()).await
    }

    pub async fn player_status(&self) -> Result<Value> {
        self.call(CallKind::PlayerStatus, Params::new()).await
    }

    pub async fn activate_game(&self, game_id: i64) -> Result<Value> {
        self.call(CallKind::ActivateGame, params(json!({ "game_id": game_id })))
            .await
    }

    // ── Tournaments ──────────────────────────────────────────────────────

    pub async fn tournament_active(&self) -> Result<Value> {
        self.call(CallKind::TournamentActive, Params::new()).await
    }

    pub async fn activate_tournament(&self, tournament_id: i64) -> Result<Value> {
        self.call(
            CallKind::ActivateTournament,
            params(json!({ "tournament_id": tournament_id })),
        )
        .await
    }

    pub async fn deactivate_tournament(&self) -> Result<Value> {
        self.call(CallKind::DeactivateTournament, Params::new())
            .await
    }

    // ── Registries ───────────────────────────────────────────────────────

    pub async fn update_registry(&self) -> Result<Value> {
        self.call(CallKind::UpdateRegistry, Params::new()).await
    }

    /// Records of one registry, keyed by their identifier.
    pub async fn retrieve_registry(&self, kind: RegistryKind) -> Result<Params> {
        let payload = self
            .call(
                CallKind::RetrieveRegistry,
                params(json!({ "registry_id": kind.as_str() })),
            )
            .await?;
        match payload {
            Value::Object(map) => Ok(map),
            _ => Err(Error::protocol("registry payload is not a mapping")),
        }
    }

    // ── Players ──────────────────────────────────────────────────────────

    pub async fn player_register(&self, web_txt: &str, panel_txt: &str) -> Result<Value> {
        self.call(
            CallKind::PlayerRegister,
            params(json!({ "web_txt": web_txt, "panel_txt": panel_txt })),
        )
        .await
    }

    pub async fn player_unregister(&self, player_number: u32) -> Result<Value> {
        self.call(
            CallKind::PlayerUnregister,
            params(json!({ "player_number": player_number })),
        )
        .await
    }

    pub async fn remote_pair(&self, player_number: u32) -> Result<Value> {
        self.call(
            CallKind::RemotePair,
            params(json!({ "player_number": player_number })),
        )
        .await
    }

    pub async fn remote_unpair(&self, player_number: u32) -> Result<Value> {
        self.call(
            CallKind::RemoteUnpair,
            params(json!({ "player_number": player_number })),
        )
        .await
    }

    // ── Scoring ──────────────────────────────────────────────────────────

    pub async fn score_event(&self, evt_type: &str, player_num: u32) -> Result<Value> {
        self.call(
            CallKind::ScoreEvent,
            params(json!({ "evt_type": evt_type, "player_num": player_num })),
        )
        .await
    }

    pub async fn set_turn(&self, player_num: u32) -> Result<Value> {
        self.call(CallKind::SetTurn, params(json!({ "player_num": player_num })))
            .await
    }

    pub async fn set_score(&self, player_num: u32, score: i64) -> Result<Value> {
        self.call(
            CallKind::SetScore,
            params(json!({ "player_num": player_num, "score": score })),
        )
        .await
    }
}

fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

/// Per-call transform of a successful payload.
fn post_process(kind: CallKind, payload: Value) -> Result<Value> {
    match kind {
        CallKind::RetrieveRegistry => key_records(payload),
        CallKind::GameCanStart => match payload {
            Value::Bool(_) => Ok(payload),
            other => Err(Error::protocol(format!(
                "game_can_start payload is not a boolean: {other}"
            ))),
        },
        CallKind::GameBegin
        | CallKind::GameEnd
        | CallKind::GameStatus
        | CallKind::ScoreStatus
        | CallKind::PlayerStatus
        | CallKind::TournamentActive
        | CallKind::ActivateTournament
        | CallKind::DeactivateTournament
        | CallKind::ActivateGame
        | CallKind::UpdateRegistry
        | CallKind::PlayerRegister
        | CallKind::PlayerUnregister
        | CallKind::RemotePair
        | CallKind::RemoteUnpair
        | CallKind::ScoreEvent
        | CallKind::SetTurn
        | CallKind::SetScore => Ok(payload),
    }
}

/// Turn a list of records into a mapping keyed by [`RECORD_ID_FIELD`].
///
/// A mapping passes through untouched. Numeric ids are keyed by their
/// decimal text, so `1` and `"1"` collide and are rejected like any other
/// duplicate.
fn key_records(payload: Value) -> Result<Value> {
    let records = match payload {
        Value::Object(_) => return Ok(payload),
        Value::Array(records) => records,
        other => {
            return Err(Error::protocol(format!(
                "registry payload is neither a list nor a mapping: {other}"
            )));
        },
    };

    let mut keyed = Params::new();
    for record in records {
        let key = match record.get(RECORD_ID_FIELD) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(Error::protocol(format!(
                    "registry record has no usable \"{RECORD_ID_FIELD}\": {record}"
                )));
            },
        };
        if keyed.contains_key(&key) {
            return Err(Error::protocol(format!("duplicate registry id \"{key}\"")));
        }
        keyed.insert(key, record);
    }
    Ok(Value::Object(keyed))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::Ordering;

    use {
        super::*,
        crate::transport::tests::{ScriptedTransport, ok_frame},
        bytes::Bytes,
    };

    const DEADLINE: Duration = Duration::from_millis(100);

    fn client(transport: Arc<ScriptedTransport>) -> ScoreboardClient {
        ScoreboardClient::new(transport, DEADLINE)
    }

    /// Transport echoing `[call, params]` back as the payload.
    fn echo() -> Arc<ScriptedTransport> {
        ScriptedTransport::new(|frame| Ok(ok_frame(json!([frame.call, frame.params]))))
    }

    #[tokio::test]
    async fn call_sends_resolved_defaults() {
        let got = client(echo())
            .call(CallKind::SetScore, params(json!({"score": 4})))
            .await
            .unwrap();
        assert_eq!(got, json!(["set_score", {"player_num": 0, "score": 4}]));
    }

    #[tokio::test]
    async fn dispatch_by_name() {
        let got = client(echo())
            .dispatch("activate_tournament", params(json!({"tournament_id": 9})))
            .await
            .unwrap();
        assert_eq!(got, json!(["activate_tournament", {"tournament_id": 9}]));
    }

    #[tokio::test]
    async fn dispatch_unknown_name_never_reaches_transport() {
        let transport = echo();
        let err = client(Arc::clone(&transport))
            .dispatch("not_a_real_call", Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownCall(ref n) if n == "not_a_real_call"));
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("invalid call type"));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn typed_helpers_fill_parameters() {
        let c = client(echo());
        assert_eq!(
            c.player_register("Ana", "ANA").await.unwrap(),
            json!(["player_register", {"web_txt": "Ana", "panel_txt": "ANA"}])
        );
        assert_eq!(
            c.score_event("chainball", 2).await.unwrap(),
            json!(["score_event", {"evt_type": "chainball", "player_num": 2}])
        );
        assert_eq!(
            c.set_turn(1).await.unwrap(),
            json!(["set_turn", {"player_num": 1}])
        );
        assert_eq!(
            c.remote_unpair(3).await.unwrap(),
            json!(["remote_unpair", {"player_number": 3}])
        );
        assert_eq!(
            c.activate_game(17).await.unwrap(),
            json!(["activate_game", {"game_id": 17}])
        );
    }

    #[tokio::test]
    async fn registry_list_is_keyed_by_id() {
        let transport = ScriptedTransport::replying(
            "ok",
            json!([
                {"id": "p1", "name": "Ana"},
                {"id": 7, "name": "Bo"},
            ]),
        );
        let registry = client(transport)
            .retrieve_registry(RegistryKind::Player)
            .await
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry["p1"], json!({"id": "p1", "name": "Ana"}));
        assert_eq!(registry["7"], json!({"id": 7, "name": "Bo"}));
    }

    #[tokio::test]
    async fn registry_request_names_the_kind() {
        let transport = ScriptedTransport::new(|frame| {
            let kind = frame.params["registry_id"].clone();
            Ok(ok_frame(json!({ "requested": kind })))
        });
        let registry = client(transport)
            .retrieve_registry(RegistryKind::Tournament)
            .await
            .unwrap();
        assert_eq!(registry["requested"], json!("tournament"));
    }

    #[tokio::test]
    async fn registry_record_without_id_is_protocol_error() {
        let transport = ScriptedTransport::replying("ok", json!([{"name": "nobody"}]));
        let err = client(transport)
            .retrieve_registry(RegistryKind::Game)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn can_start_must_be_boolean() {
        let ok = ScriptedTransport::replying("ok", json!(true));
        assert!(client(ok).game_can_start().await.unwrap());

        let bad = ScriptedTransport::replying("ok", json!("yes"));
        let err = client(bad).game_can_start().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn remote_error_is_not_swallowed() {
        let transport = ScriptedTransport::replying("error", json!({"reason": "game running"}));
        let err = client(transport).game_begin().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert_eq!(err.data(), Some(&json!({"reason": "game running"})));
    }

    #[tokio::test]
    async fn timeout_surfaces_as_timeout() {
        let transport = ScriptedTransport::new(|_| Err(Error::Timeout(DEADLINE)));
        let err = client(transport)
            .retrieve_registry(RegistryKind::Player)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn non_ok_status_strings_are_remote_errors() {
        let transport = ScriptedTransport::new(|_| {
            Ok(vec![Bytes::from_static(br#"["busy", null]"#)])
        });
        let err = client(transport).game_status().await.unwrap_err();
        assert!(matches!(err, Error::Remote { data: None }));
    }

    #[tokio::test]
    async fn colliding_registry_ids_are_rejected() {
        let transport = ScriptedTransport::replying(
            "ok",
            json!([{"id": 1, "n": "a"}, {"id": "1", "n": "b"}]),
        );
        let err = client(transport)
            .retrieve_registry(RegistryKind::Player)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("duplicate registry id"));

        let repeated = json!([{"id": "p1"}, {"id": "p2"}, {"id": "p1"}]);
        assert!(key_records(repeated).is_err());
    }

    #[test]
    fn key_records_passes_mappings_through() {
        let map = json!({"a": {"id": "a"}});
        assert_eq!(key_records(map.clone()).unwrap(), map);
        assert!(key_records(json!(null)).is_err());
    }
}
