//! Integration tests for the Engine drain loop.
//!
//! The REQUEST workflow is driven three ways (one generic switch, per-type
//! callbacks, a handler table) and must produce the same processing order.

use cascade_common::{array, CascadeConfig};
use cascade_engine::{
    Action, DispatchError, Dispatcher, Engine, HandlerTable, Resolution,
};
use serde_json::{json, Value};

const EXPECTED_FLOW: [&str; 8] = [
    "REQUEST",
    "FETCH_RELATIONS",
    "FETCH_FIELDS",
    "FETCH_RESOURCES",
    "EXTRACT_RESOURCES_TO_CALL",
    "CALL",
    "CALL",
    "MERGE",
];

// ---------------------------------------------------------------------------
// Shared workflow steps
// ---------------------------------------------------------------------------

fn request_action() -> Action {
    Action::new("REQUEST").with_payload(json!({
        "website": 123,
        "resource": "foo",
        "params": {"title": "test title"}
    }))
}

/// Appends every action type to `state.log`.
fn log_action(state: &Value, action: &Action, _: &mut Dispatcher<Value>) -> Resolution<Value> {
    let mut next = state.clone();
    let mut log = next.get("log").cloned().unwrap_or_else(|| json!([]));
    if let Some(entries) = log.as_array_mut() {
        entries.push(json!(action.action_type));
    }
    array::set(&mut next, Some("log"), log);
    Ok(Some(next))
}

fn logged_types(state: &Value) -> Vec<String> {
    state["log"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Adds `key` only when the state does not have it yet.
fn with_default(state: &Value, key: &str, value: Value) -> Value {
    let mut next = state.clone();
    if array::get_dot(&next, key).is_none() {
        array::set(&mut next, Some(key), value);
    }
    next
}

struct SomeHandler;

impl SomeHandler {
    fn request(_: &Value, payload: &Value, d: &mut Dispatcher<Value>) -> Resolution<Value> {
        d.push(Action::new("FETCH_RESOURCES").with_payload(payload.clone()));
        d.push(Action::new("FETCH_FIELDS").with_payload(payload.clone()));
        d.push(Action::new("FETCH_RELATIONS").with_payload(payload.clone()));
        d.unshift(Action::new("EXTRACT_RESOURCES_TO_CALL").with_payload(payload.clone()));
        d.unshift(Action::new("MERGE"));
        Ok(None)
    }

    fn fetch_resources(state: &Value, _: &Value, _: &mut Dispatcher<Value>) -> Resolution<Value> {
        Ok(Some(with_default(
            state,
            "resources",
            json!([{"name": "foo"}, {"name": "bar"}]),
        )))
    }

    fn fetch_fields(state: &Value, _: &Value, _: &mut Dispatcher<Value>) -> Resolution<Value> {
        Ok(Some(with_default(
            state,
            "fields",
            json!([
                {"resource": "foo", "name": "title", "type": "text"},
                {"resource": "bar", "name": "price", "type": "price"}
            ]),
        )))
    }

    fn fetch_relations(state: &Value, _: &Value, _: &mut Dispatcher<Value>) -> Resolution<Value> {
        Ok(Some(with_default(
            state,
            "relations",
            json!([{
                "from": {"resource": "bar", "field": "price"},
                "to": {"resource": "foo", "field": "price"}
            }]),
        )))
    }

    fn extract_resources_to_call(
        _: &Value,
        _: &Value,
        d: &mut Dispatcher<Value>,
    ) -> Resolution<Value> {
        let children = [
            json!({"resource": "foo", "params": {"title": "test"}}),
            json!({"resource": "bar", "params": {}}),
        ];
        for child in children {
            d.push(Action::new("CALL").with_payload(child));
        }
        Ok(None)
    }

    fn call(state: &Value, payload: &Value, _: &mut Dispatcher<Value>) -> Resolution<Value> {
        let resource = payload["resource"].as_str().unwrap_or("unknown");
        let mut next = state.clone();
        array::set(
            &mut next,
            Some(format!("responses.{resource}").as_str()),
            json!({"response": {"title": "test"}}),
        );
        Ok(Some(next))
    }

    fn merge(state: &Value, _: &Value, _: &mut Dispatcher<Value>) -> Resolution<Value> {
        Ok(Some(state.clone()))
    }

    fn table() -> HandlerTable<Value> {
        HandlerTable::new("SomeHandler")
            .method("request", Self::request)
            .method("fetchResources", Self::fetch_resources)
            .method("fetchFields", Self::fetch_fields)
            .method("fetchRelations", Self::fetch_relations)
            .method("extractResourcesToCall", Self::extract_resources_to_call)
            .method("call", Self::call)
            .method("merge", Self::merge)
    }
}

fn assert_workflow_outcome(state: &Value) {
    assert_eq!(logged_types(state), EXPECTED_FLOW);
    assert_eq!(state["resources"], json!([{"name": "foo"}, {"name": "bar"}]));
    assert_eq!(state["fields"].as_array().map(Vec::len), Some(2));
    assert_eq!(state["relations"][0]["to"]["resource"], json!("foo"));
    assert_eq!(
        state["responses"],
        json!({
            "bar": {"response": {"title": "test"}},
            "foo": {"response": {"title": "test"}}
        })
    );
}

// ---------------------------------------------------------------------------
// REQUEST workflow, three registration styles
// ---------------------------------------------------------------------------

#[test]
fn request_flow_with_single_switch_resolver() {
    let mut engine = Engine::new();
    engine.register_generic(log_action);
    engine.register_generic(|state: &Value, action: &Action, d: &mut Dispatcher<Value>| {
        let payload = action.payload_or_default();
        match action.action_type.as_str() {
            "REQUEST" => SomeHandler::request(state, &payload, d),
            "FETCH_RESOURCES" => SomeHandler::fetch_resources(state, &payload, d),
            "FETCH_FIELDS" => SomeHandler::fetch_fields(state, &payload, d),
            "FETCH_RELATIONS" => SomeHandler::fetch_relations(state, &payload, d),
            "EXTRACT_RESOURCES_TO_CALL" => SomeHandler::extract_resources_to_call(state, &payload, d),
            "CALL" => SomeHandler::call(state, &payload, d),
            "MERGE" => SomeHandler::merge(state, &payload, d),
            _ => Ok(None),
        }
    });

    engine.handle(Some(request_action())).unwrap();

    assert_eq!(engine.pending(), 0);
    assert_workflow_outcome(engine.state());
}

#[test]
fn request_flow_with_type_filtered_resolvers() {
    let mut engine = Engine::new();
    engine.register_generic(log_action);
    engine.register_type_filtered("MERGE", SomeHandler::merge);
    engine.register_type_filtered("FETCH_RESOURCES", SomeHandler::fetch_resources);
    engine.register_type_filtered("FETCH_FIELDS", SomeHandler::fetch_fields);
    engine.register_type_filtered("FETCH_RELATIONS", SomeHandler::fetch_relations);
    engine.register_type_filtered("REQUEST", SomeHandler::request);
    engine.register_type_filtered("EXTRACT_RESOURCES_TO_CALL", SomeHandler::extract_resources_to_call);
    engine.register_type_filtered("CALL", SomeHandler::call);

    engine.handle(Some(request_action())).unwrap();

    assert_workflow_outcome(engine.state());
}

#[test]
fn request_flow_with_handler_table() {
    let mut engine = Engine::new();
    engine.register_generic(log_action);
    engine.register_method_dispatch(SomeHandler::table());

    engine.handle(Some(request_action())).unwrap();

    assert_workflow_outcome(engine.state());
}

#[test]
fn handler_table_covers_every_workflow_step() {
    let table = SomeHandler::table();
    for action_type in EXPECTED_FLOW {
        assert!(table.handles(action_type), "{action_type} has no method");
    }
}

// ---------------------------------------------------------------------------
// State updates
// ---------------------------------------------------------------------------

#[test]
fn call_updates_state_once() {
    let mut engine = Engine::new();
    engine.set_state(json!({"foo": "some data"}));
    engine.register_generic(|state: &Value, action: &Action, _: &mut Dispatcher<Value>| {
        if action.action_type != "bar" {
            return Ok(Some(state.clone()));
        }
        Ok(Some(with_default(state, "bar", action.payload_or_default().into_owned())))
    });

    engine
        .call(&Action::new("bar").with_payload(json!({"test": "hahaha"})))
        .unwrap();

    assert_eq!(
        *engine.state(),
        json!({"foo": "some data", "bar": {"test": "hahaha"}})
    );
}

#[test]
fn resolvers_can_record_calls_to_resources() {
    let mut engine = Engine::new();
    engine.set_state(json!({"foo": "some data"}));
    engine.register_type_filtered("call", |state: &Value, payload: &Value, _: &mut Dispatcher<Value>| {
        let resource = payload["resource"].as_str().unwrap_or_default().to_string();
        let mut next = state.clone();
        next[resource] = json!({
            "request": payload["request"].clone(),
            "response": {"id": 123, "name": "test"}
        });
        Ok(Some(next))
    });

    engine
        .call(&Action::new("call").with_payload(json!({"resource": "bar", "request": {"id": 123}})))
        .unwrap();

    assert_eq!(
        *engine.state(),
        json!({
            "foo": "some data",
            "bar": {"request": {"id": 123}, "response": {"id": 123, "name": "test"}}
        })
    );
}

#[test]
fn nested_messages_see_state_set_mid_drain() {
    let mut engine = Engine::new();
    engine.register_generic(|state: &Value, action: &Action, d: &mut Dispatcher<Value>| {
        if action.action_type != "request" {
            return Ok(None);
        }
        let payload = action.payload_or_default();
        let resource = payload["resource"].as_str().unwrap_or_default();
        d.set_state(with_default(state, resource, json!({"test": 456})));
        for nested in payload["actions"].as_array().into_iter().flatten() {
            d.push(serde_json::from_value(nested.clone())?);
        }
        Ok(None)
    });
    engine.register_type_filtered("merge", |state: &Value, payload: &Value, _: &mut Dispatcher<Value>| {
        let from = &payload["from"];
        let to = &payload["to"];
        let value = state[from["resource"].as_str().unwrap_or_default()]
            [from["field"].as_str().unwrap_or_default()]
        .clone();
        let mut next = state.clone();
        let path = format!(
            "{}.{}",
            to["resource"].as_str().unwrap_or_default(),
            to["field"].as_str().unwrap_or_default()
        );
        array::set(&mut next, Some(path.as_str()), value);
        Ok(Some(next))
    });

    engine.push(Action::new("request").with_payload(json!({
        "resource": "foo",
        "request": {"id": 123},
        "actions": [{
            "type": "merge",
            "payload": {
                "from": {"resource": "foo", "field": "test"},
                "to": {"resource": "bar", "field": "test"}
            }
        }]
    })));
    engine.handle(None).unwrap();

    assert_eq!(*engine.state(), json!({"foo": {"test": 456}, "bar": {"test": 456}}));
}

#[test]
fn pushed_action_is_drained_by_handle() {
    let mut engine = Engine::new();
    engine.set_state(json!({"foo": "some data"}));
    engine.register_generic(|state: &Value, _: &Action, _: &mut Dispatcher<Value>| {
        Ok(Some(with_default(state, "bar", json!(123))))
    });

    engine.push(Action::new("some action"));
    assert_eq!(engine.pending(), 1);
    engine.handle(None).unwrap();

    assert_eq!(engine.pending(), 0);
    assert_eq!(*engine.state(), json!({"foo": "some data", "bar": 123}));
}

#[test]
fn returning_current_state_is_a_noop() {
    let mut engine = Engine::new();
    engine.set_state(json!({"foo": 1}));
    engine.register_generic(|state: &Value, _: &Action, _: &mut Dispatcher<Value>| {
        Ok(Some(state.clone()))
    });
    engine.register_generic(|state: &Value, _: &Action, _: &mut Dispatcher<Value>| {
        assert_eq!(*state, json!({"foo": 1}));
        Ok(None)
    });

    engine.handle(Some(Action::new("ANY"))).unwrap();
    assert_eq!(*engine.state(), json!({"foo": 1}));
}

// Open question: an explicit empty state cannot be installed through a
// resolver return. Kept as-is; callers may depend on the suppression.
#[test]
fn falsy_return_does_not_replace_state() {
    let mut engine = Engine::new();
    engine.set_state(json!({"foo": 1}));
    engine.register_type_filtered("RESET", |_: &Value, _: &Value, _: &mut Dispatcher<Value>| {
        Ok(Some(json!({})))
    });
    engine.register_type_filtered("ZERO", |_: &Value, _: &Value, _: &mut Dispatcher<Value>| {
        Ok(Some(json!(0)))
    });

    engine.handle(Some(Action::new("RESET"))).unwrap();
    engine.handle(Some(Action::new("ZERO"))).unwrap();
    assert_eq!(*engine.state(), json!({"foo": 1}));

    // Direct replacement is unconditional.
    engine.set_state(json!({}));
    assert_eq!(*engine.state(), json!({}));
}

// ---------------------------------------------------------------------------
// Scheduling order
// ---------------------------------------------------------------------------

fn recording_engine() -> Engine {
    let mut engine = Engine::new();
    engine.register_generic(log_action);
    engine
}

#[test]
fn pushes_drain_last_in_first_out() {
    let mut engine = recording_engine();
    engine.push(Action::new("A1"));
    engine.push(Action::new("A2"));
    engine.push(Action::new("A3"));

    let queued: Vec<&str> = engine.stack().iter().map(|a| a.action_type.as_str()).collect();
    assert_eq!(queued, ["A3", "A2", "A1"]);

    engine.handle(None).unwrap();
    assert_eq!(logged_types(engine.state()), ["A3", "A2", "A1"]);
}

#[test]
fn unshifts_drain_in_call_order_after_everything_else() {
    let mut engine = recording_engine();
    engine.push(Action::new("X"));
    engine.unshift(Action::new("B1"));
    engine.unshift(Action::new("B2"));
    engine.unshift(Action::new("B3"));

    engine.handle(None).unwrap();
    assert_eq!(logged_types(engine.state()), ["X", "B1", "B2", "B3"]);
}

#[test]
fn call_does_not_drain_what_it_schedules() {
    let mut engine = recording_engine();
    engine.register_type_filtered("START", |_: &Value, _: &Value, d: &mut Dispatcher<Value>| {
        d.push(Action::new("NEXT"));
        d.unshift(Action::new("LAST"));
        Ok(None)
    });

    engine.call(&Action::new("START")).unwrap();
    assert_eq!(engine.pending(), 2);
    assert_eq!(logged_types(engine.state()), ["START"]);

    engine.handle(None).unwrap();
    assert_eq!(engine.pending(), 0);
    assert_eq!(logged_types(engine.state()), ["START", "NEXT", "LAST"]);
}

#[test]
fn unmatched_action_passes_through() {
    let mut engine = Engine::new();
    engine.set_state(json!({"foo": 1}));
    engine.register_type_filtered("KNOWN", |_: &Value, _: &Value, _: &mut Dispatcher<Value>| {
        Ok(Some(json!({"known": true})))
    });

    engine.handle(Some(Action::new("UNKNOWN"))).unwrap();
    assert_eq!(*engine.state(), json!({"foo": 1}));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn missing_method_aborts_drain_and_keeps_pending() {
    let mut engine = Engine::new();
    engine.register_method_dispatch(
        HandlerTable::new("PartialHandler").method("request", SomeHandler::request),
    );

    let err = engine.handle(Some(request_action())).unwrap_err();
    match err {
        DispatchError::MissingMethod { method, action_type, .. } => {
            assert_eq!(method, "fetchRelations");
            assert_eq!(action_type, "FETCH_RELATIONS");
        }
        other => panic!("unexpected error: {other}"),
    }
    // FETCH_FIELDS, FETCH_RESOURCES, EXTRACT_RESOURCES_TO_CALL, MERGE
    assert_eq!(engine.pending(), 4);
}

#[test]
fn resolver_error_propagates_out_of_handle() {
    let mut engine = recording_engine();
    engine.register_type_filtered("BOOM", |_: &Value, _: &Value, _: &mut Dispatcher<Value>| {
        anyhow::bail!("resource call failed")
    });

    engine.push(Action::new("AFTER"));
    let err = engine.handle(Some(Action::new("BOOM"))).unwrap_err();

    assert!(matches!(err, DispatchError::Resolver(_)));
    assert_eq!(logged_types(engine.state()), ["BOOM"]);
    assert_eq!(engine.pending(), 1);
}

#[test]
fn toml_zero_drain_limit_runs_the_full_workflow() {
    let config = CascadeConfig::from_toml_str("[engine]\nmax_drain = 0\n").unwrap();
    let mut engine = Engine::new().with_config(config.engine);
    engine.register_generic(log_action);
    engine.register_method_dispatch(SomeHandler::table());

    engine.handle(Some(request_action())).unwrap();
    assert_workflow_outcome(engine.state());
}
