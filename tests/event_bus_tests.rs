use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use frog_adventure::{
    ActionKind, ActionQueue, EventBus, EventHandler, EventRecord, FnMiddleware, GameEvent,
    HandlerContext, Priority,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

/// Counts how often it runs and always succeeds
struct Counter {
    hits: Arc<Mutex<u32>>,
}

impl EventHandler for Counter {
    fn handle(&mut self, _event: &EventRecord, _ctx: &mut HandlerContext<'_>) -> anyhow::Result<Value> {
        let mut hits = self.hits.lock().unwrap();
        *hits += 1;
        Ok(json!(*hits))
    }

    fn name(&self) -> &str {
        "counter"
    }
}

#[test]
fn failing_handler_is_isolated() {
    let mut bus = EventBus::new("g");
    let hits = Arc::new(Mutex::new(0));
    bus.register_handler("frog_sad", Counter { hits: Arc::clone(&hits) })
        .unwrap();
    bus.register_fn("frog_sad", "grumpy", |_, _| Err(anyhow!("handler exploded")))
        .unwrap();
    bus.register_handler("frog_sad", Counter { hits: Arc::clone(&hits) })
        .unwrap();

    let record = bus.trigger(GameEvent::FrogSad { happiness: 12 });

    let successes: Vec<bool> = record.handler_results.iter().map(|r| r.success).collect();
    assert_eq!(successes, vec![true, false, true]);
    assert_eq!(record.handler_results[1].handler, "grumpy");
    assert_eq!(
        record.handler_results[1].error.as_deref(),
        Some("handler exploded")
    );
    assert_eq!(*hits.lock().unwrap(), 2);
    assert!(record.processed_at.is_some());
    assert_eq!(bus.history().len(), 1);
}

#[test]
fn middleware_runs_before_handlers_for_every_type() {
    let mut bus = EventBus::new("g");
    let log = Arc::new(Mutex::new(Vec::new()));

    let mw_log = Arc::clone(&log);
    bus.register_middleware(FnMiddleware::new("audit", move |e: &mut EventRecord| {
        mw_log.lock().unwrap().push(format!("mw:{}", e.event_type));
        Ok(())
    }));
    let handler_log = Arc::clone(&log);
    bus.register_fn("frog_moved", "follow", move |e, _| {
        handler_log.lock().unwrap().push(format!("handler:{}", e.event_type));
        Ok(Value::Null)
    })
    .unwrap();

    bus.trigger(GameEvent::FrogMoved {
        direction: "north".into(),
    });
    bus.trigger(GameEvent::custom("frog_sang", json!({"notes": 3})));

    assert_eq!(
        *log.lock().unwrap(),
        vec!["mw:frog_moved", "handler:frog_moved", "mw:frog_sang"]
    );
}

#[test]
fn nested_triggers_finish_before_outer_returns() {
    let mut bus = EventBus::new("g");
    let mut queue = ActionQueue::new("g");
    bus.register_fn("adventure_completed", "celebrate", |_, ctx| {
        let nested = ctx.trigger(GameEvent::FrogHappy { happiness: 80 })?;
        Ok(nested.handler_results[0].result.clone().unwrap_or(Value::Null))
    })
    .unwrap();
    bus.register_fn("frog_happy", "reward", |_, ctx| {
        let id = ctx.enqueue(
            ActionKind::Interact {
                target: "friend".into(),
            },
            Priority::Low,
        )?;
        Ok(Value::String(id))
    })
    .unwrap();

    let record = bus.trigger_with(
        GameEvent::AdventureCompleted {
            scenario_id: "lily".into(),
            adventures_completed: 1,
        },
        &mut queue,
    );

    assert_eq!(record.event_type, "adventure_completed");
    let types: Vec<&str> = bus.history().iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, vec!["adventure_completed", "frog_happy"]);
    assert_eq!(queue.len(), 1);
    let queued_id = queue.peek().unwrap().id.clone();
    assert_eq!(record.handler_results[0].result, Some(json!(queued_id)));
    assert!(bus.events_by_type("frog_happy")[0].all_succeeded());
}

#[test]
fn records_serialize_with_wire_names() {
    let mut bus = EventBus::new("pond");
    bus.register_fn("weather_change", "noop", |_, _| Ok(json!("ok")))
        .unwrap();
    let record = bus.trigger(GameEvent::WeatherChange {
        weather: "foggy".into(),
    });

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["type"], "weather_change");
    assert_eq!(value["payload"], json!({"weather": "foggy"}));
    assert_eq!(value["importance"], "low");
    assert_eq!(value["game_id"], "pond");
    assert_eq!(value["handler_results"][0]["result"], "ok");
    assert!(value["id"].as_str().unwrap().starts_with("event_"));
}
