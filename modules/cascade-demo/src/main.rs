use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cascade_common::{array, load_config, tree, CascadeConfig, EngineConfig, TreeKeys};
use cascade_engine::{Action, Dispatcher, Engine, HandlerTable, Resolution};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cascade=info".parse()?))
        .init();

    // Optional config path as the first argument; otherwise env only.
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path))
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => CascadeConfig {
            engine: EngineConfig::from_env()?,
            ..CascadeConfig::default()
        },
    };
    config.engine.log_settings();

    let mut engine = Engine::new().with_config(config.engine.clone());
    engine.register_generic(|_: &Value, action: &Action, d: &mut Dispatcher<Value>| {
        info!(action_type = %action.action_type, pending = d.pending(), "Dispatching");
        Ok(None)
    });
    engine.register_method_dispatch(page_handler(config.tree.clone()));

    engine.handle(Some(Action::new("REQUEST").with_payload(json!({
        "website": 123,
        "page": {
            "id": "home",
            "resource": "layout",
            "children": [
                {"id": "hero", "resource": "foo"},
                {
                    "id": "listing",
                    "resource": "bar",
                    "children": [{"id": "price", "resource": "foo"}]
                }
            ]
        }
    }))))?;

    let state = engine.into_state();
    info!(
        nodes = state["nodes"].as_array().map_or(0, Vec::len),
        calls = state["responses"].as_object().map_or(0, |r| r.len()),
        "Request resolved"
    );
    println!("{}", serde_json::to_string_pretty(&state["page"])?);

    Ok(())
}

/// Handler table for the page request workflow.
///
/// REQUEST flattens the page tree, then schedules the fetch next and the
/// per-resource calls plus the final merge after it.
fn page_handler(keys: TreeKeys) -> HandlerTable<Value> {
    let request_keys = keys.clone();
    let merge_keys = keys;

    HandlerTable::new("PageHandler")
        .action(
            "REQUEST",
            move |state: &Value, payload: &Value, d: &mut Dispatcher<Value>| {
                let nodes = tree::normalize(&payload["page"], &request_keys);
                d.push(Action::new("FETCH_RESOURCES"));
                d.unshift(Action::new("EXTRACT_RESOURCES_TO_CALL"));
                d.unshift(Action::new("MERGE"));

                let mut next = state.clone();
                array::set(&mut next, Some("nodes"), Value::Array(nodes));
                Ok(Some(next))
            },
        )
        .action("FETCH_RESOURCES", fetch_resources)
        .action("EXTRACT_RESOURCES_TO_CALL", extract_resources_to_call)
        .action("CALL", call)
        .action(
            "MERGE",
            move |state: &Value, _: &Value, _: &mut Dispatcher<Value>| {
                let nodes: Vec<Value> = nodes_of(state)
                    .iter()
                    .map(|node| {
                        let mut node = node.clone();
                        let resource = node["resource"].as_str().unwrap_or_default().to_string();
                        if let Some(response) = array::get_dot(state, &format!("responses.{resource}")) {
                            array::set(&mut node, Some("response"), response.clone());
                        }
                        node
                    })
                    .collect();

                let page = tree::denormalize(&nodes, &merge_keys, None)?;
                let mut next = state.clone();
                array::set(&mut next, Some("page"), page);
                Ok(Some(next))
            },
        )
}

fn fetch_resources(state: &Value, _: &Value, _: &mut Dispatcher<Value>) -> Resolution<Value> {
    let resources = tree::unique(nodes_of(state), "resource", &[Value::Null]);
    let mut next = state.clone();
    array::set(&mut next, Some("resources"), Value::Array(resources));
    Ok(Some(next))
}

fn extract_resources_to_call(
    state: &Value,
    _: &Value,
    d: &mut Dispatcher<Value>,
) -> Resolution<Value> {
    for resource in state["resources"].as_array().into_iter().flatten() {
        d.push(Action::new("CALL").with_payload(json!({"resource": resource})));
    }
    Ok(None)
}

fn call(state: &Value, payload: &Value, _: &mut Dispatcher<Value>) -> Resolution<Value> {
    let resource = payload["resource"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("CALL without a resource: {payload}"))?;

    let mut next = state.clone();
    array::set(
        &mut next,
        Some(format!("responses.{resource}").as_str()),
        json!({"title": format!("{resource} response")}),
    );
    Ok(Some(next))
}

fn nodes_of(state: &Value) -> &[Value] {
    state["nodes"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
}
