use std::time::Duration;

use {
    anyhow::{Context, Result, bail},
    chainball_config::ChainballConfig,
    chainball_gateway::{CallRegistry, Event, EventSubscriber, ReconnectPolicy, ScoreboardClient},
    chainball_protocol::Params,
    serde_json::Value,
    tracing::info,
};

const FINISHED_POLL: Duration = Duration::from_millis(250);

/// Issue one call by name and print its payload.
pub async fn call(config: &ChainballConfig, name: &str, args: &[String]) -> Result<()> {
    let kwargs = parse_kwargs(args)?;
    let client = ScoreboardClient::from_config(&config.scoreboard);
    let payload = client
        .dispatch(name, kwargs)
        .await
        .with_context(|| format!("{name} failed"))?;
    print_json(&payload)
}

pub async fn status(config: &ChainballConfig) -> Result<()> {
    let client = ScoreboardClient::from_config(&config.scoreboard);
    let snapshot = client.status_snapshot().await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Print every registered call with its default parameters.
pub fn list_calls() -> Result<()> {
    let registry = CallRegistry::shared();
    for name in registry.names() {
        let defaults = registry
            .get(name)
            .map(|d| Value::Object(d.defaults.clone()))
            .unwrap_or_default();
        println!("{name:<24} {defaults}");
    }
    Ok(())
}

/// Subscribe to the event channel and print events until `count` arrived
/// or Ctrl-C is pressed.
pub async fn events(config: &ChainballConfig, count: Option<usize>) -> Result<()> {
    let handle = EventSubscriber::zmq(
        config.scoreboard.event_endpoint.clone(),
        ReconnectPolicy::from(&config.events),
    )
    .spawn();
    let queue = handle.queue();
    info!(endpoint = %config.scoreboard.event_endpoint, "listening for scoreboard events");

    let mut seen = 0usize;
    while count.is_none_or(|limit| seen < limit) {
        tokio::select! {
            event = queue.next() => {
                println!("{}", render_event(&event));
                seen += 1;
            },
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(FINISHED_POLL) => {},
        }
        if handle.is_finished() && queue.is_empty() {
            break;
        }
    }

    handle.shutdown().await.context("event subscriber failed")
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One line per event: JSON frames as JSON, anything else as lossy text.
fn render_event(event: &Event) -> String {
    let frames: Vec<Value> = event
        .frames()
        .iter()
        .map(|frame| {
            serde_json::from_slice(frame)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(frame).into_owned()))
        })
        .collect();
    Value::Array(frames).to_string()
}

/// Parse `key=value` arguments. Values are read as JSON when they parse,
/// otherwise kept as plain strings.
pub fn parse_kwargs(args: &[String]) -> Result<Params> {
    let mut kwargs = Params::new();
    for arg in args {
        let Some((key, raw)) = arg.split_once('=') else {
            bail!("expected key=value, got {arg:?}");
        };
        if key.is_empty() {
            bail!("empty parameter name in {arg:?}");
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        kwargs.insert(key.to_string(), value);
    }
    Ok(kwargs)
}
