//! Tests for the dispatcher's resolve, match, gate, invoke and respond cycle
//!
//! # Test Coverage
//!
//! - Positional parameter extraction through a real dispatch
//! - NotFound envelope for unmatched paths, methods and segment counts
//! - Gate halts: the halting gate's response is final, the handler never runs
//! - Reply mapping: JSON for objects and arrays, raw strings, empty bodies
//! - Handler-chosen statuses and headers
//! - Echoed JSON keeps the client's key order
//! - Handler faults propagate as `DispatchError`
//! - Table replacement

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use cardikit::dispatcher::{DispatchError, Dispatcher, Handler, Outcome, Reply};
use cardikit::middleware::{Chain, SecurityHeadersGate};
use cardikit::router::{Method, RouteTable};
use cardikit::server::Request;
use http::Method as HttpMethod;
use serde_json::{json, Value};

mod common;
use common::fixtures::{recorder, values};

fn get(path: &str) -> Request {
    Request::builder(HttpMethod::GET, path).build()
}

#[test]
fn test_nested_params_in_declared_order() {
    let mut table = RouteTable::new();
    table
        .get(
            "/posts/:postId/comments/:commentId",
            Handler::new(|_req, p| Ok(format!("{}-{}", &p[0], &p[1]))),
        )
        .unwrap();
    let dispatcher = Dispatcher::new(table);

    let res = dispatcher.dispatch(&get("/posts/5/comments/8")).unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.body_str(), "5-8");
}

#[test]
fn test_echo_json_body() {
    let mut table = RouteTable::new();
    table
        .post("/echo", Handler::new(|req, _p| Ok(req.body().clone())))
        .unwrap();
    let dispatcher = Dispatcher::new(table);

    let req = Request::builder(HttpMethod::POST, "/echo")
        .header("Content-Type", "application/json")
        .body(r#"{"foo":"bar"}"#)
        .build();
    let res = dispatcher.dispatch(&req).unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.header("content-type"), Some("application/json"));
    assert_eq!(res.body_str(), r#"{"foo":"bar"}"#);
}

#[test]
fn test_echo_keeps_key_order() {
    let mut table = RouteTable::new();
    table
        .post("/echo", Handler::new(|req, _p| Ok(req.body().clone())))
        .unwrap();
    let dispatcher = Dispatcher::new(table);

    for body in [
        r#"{"zeta":1,"alpha":2}"#,
        r#"{"b":{"y":1,"x":2},"a":[{"d":0,"c":0}]}"#,
    ] {
        let req = Request::builder(HttpMethod::POST, "/echo")
            .header("Content-Type", "application/json")
            .body(body)
            .build();
        assert_eq!(dispatcher.dispatch(&req).unwrap().body_str(), body);
    }
}

#[test]
fn test_handler_sets_status_and_headers() {
    let mut table = RouteTable::new();
    table
        .post(
            "/things",
            Handler::new(|_req, _p| {
                Ok(Reply::Json(json!({"id": 7}))
                    .with_status(201)
                    .with_header("Location", "/things/7"))
            }),
        )
        .unwrap()
        .get(
            "/things/:id",
            Handler::new(|_req, _p| Ok(Reply::error(404, "Thing not found"))),
        )
        .unwrap();
    let dispatcher = Dispatcher::new(table);

    let created = dispatcher
        .dispatch(&Request::builder(HttpMethod::POST, "/things").build())
        .unwrap();
    assert_eq!(created.status(), 201);
    assert_eq!(created.header("location"), Some("/things/7"));
    assert_eq!(created.header("content-type"), Some("application/json"));
    assert_eq!(created.body_str(), r#"{"id":7}"#);

    let missing = dispatcher.dispatch(&get("/things/8")).unwrap();
    assert_eq!(missing.status(), 404);
    assert_eq!(missing.body_str(), r#"{"error":"Thing not found"}"#);
}

#[test]
fn test_missing_route_is_404_envelope() {
    let dispatcher = Dispatcher::new(RouteTable::new());
    let (outcome, res) = dispatcher.dispatch_with_outcome(&get("/missing")).unwrap();
    assert_eq!(outcome, Outcome::NotFound);
    assert_eq!(res.status(), 404);
    assert_eq!(res.body_str(), r#"{"error":"Route not found"}"#);
}

#[test]
fn test_rejecting_gate_blocks_handler() {
    let ran = Arc::new(AtomicBool::new(false));
    let log = Arc::new(Mutex::new(Vec::new()));

    struct Unauthorized;
    impl cardikit::middleware::Gate for Unauthorized {
        fn handle(&self, _req: &Request, res: &mut cardikit::server::Response) -> bool {
            res.reject(401, "Unauthorized");
            false
        }
    }

    let mut table = RouteTable::new();
    let flag = Arc::clone(&ran);
    table
        .register(
            Method::Get,
            "/secure",
            Handler::new(move |_req, _p| -> anyhow::Result<()> {
                flag.store(true, Ordering::SeqCst);
                anyhow::bail!("handler must not run")
            }),
            Chain::new()
                .with(Arc::new(Unauthorized))
                .with(recorder("after", true, &log)),
        )
        .unwrap();
    let dispatcher = Dispatcher::new(table);

    let (outcome, res) = dispatcher.dispatch_with_outcome(&get("/secure")).unwrap();
    assert!(matches!(outcome, Outcome::Halted { .. }));
    assert_eq!(res.status(), 401);
    assert_eq!(res.body_str(), r#"{"error":"Unauthorized"}"#);
    assert!(!ran.load(Ordering::SeqCst));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_gate_order_stops_at_first_false() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut table = RouteTable::new();
    table
        .register(
            Method::Get,
            "/chain",
            Handler::new(move |_req, _p| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("handled")
            }),
            Chain::new()
                .with(recorder("A", true, &log))
                .with(recorder("B", false, &log))
                .with(recorder("C", true, &log)),
        )
        .unwrap();
    let dispatcher = Dispatcher::new(table);

    let (outcome, res) = dispatcher.dispatch_with_outcome(&get("/chain")).unwrap();
    assert_eq!(outcome, Outcome::Halted { gate: "B".into() });
    assert_eq!(*log.lock().unwrap(), vec!["A", "B"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(res.status(), 403);
    assert_eq!(res.body_str(), r#"{"error":"B rejected"}"#);
}

#[test]
fn test_all_gates_pass_then_handler_runs() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut table = RouteTable::new();
    table
        .register(
            Method::Get,
            "/open",
            Handler::new(|_req, _p| Ok("ok")),
            Chain::new()
                .with(recorder("A", true, &log))
                .with(recorder("B", true, &log)),
        )
        .unwrap();

    let (outcome, res) = Dispatcher::new(table)
        .dispatch_with_outcome(&get("/open"))
        .unwrap();
    assert_eq!(outcome, Outcome::Responded);
    assert_eq!(*log.lock().unwrap(), vec!["A", "B"]);
    assert_eq!(res.body_str(), "ok");
}

#[test]
fn test_reply_mapping() {
    let mut table = RouteTable::new();
    table
        .get("/object", Handler::new(|_req, _p| Ok(json!({"id": 1, "tags": ["a"]}))))
        .unwrap()
        .get("/array", Handler::new(|_req, _p| Ok(json!([1, 2, 3]))))
        .unwrap()
        .get("/text", Handler::new(|_req, _p| Ok("  <b>raw</b>\n")))
        .unwrap()
        .get("/nothing", Handler::new(|_req, _p| Ok(())))
        .unwrap()
        .get("/built", Handler::new(|_req, _p| Reply::json(&vec!["x", "y"])))
        .unwrap();
    let dispatcher = Dispatcher::new(table);

    let res = dispatcher.dispatch(&get("/object")).unwrap();
    assert_eq!(res.header("content-type"), Some("application/json"));
    let parsed: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(parsed, json!({"id": 1, "tags": ["a"]}));

    let res = dispatcher.dispatch(&get("/array")).unwrap();
    assert_eq!(res.body_str(), "[1,2,3]");

    let res = dispatcher.dispatch(&get("/text")).unwrap();
    assert_eq!(res.body(), b"  <b>raw</b>\n");
    assert_eq!(res.header("content-type"), None);

    let res = dispatcher.dispatch(&get("/nothing")).unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.body().is_empty());

    let res = dispatcher.dispatch(&get("/built")).unwrap();
    assert_eq!(res.body_str(), r#"["x","y"]"#);
}

#[test]
fn test_segment_count_mismatch_is_404() {
    let mut table = RouteTable::new();
    table
        .get("/cards/:id", Handler::new(|_req, _p| Ok("card")))
        .unwrap();
    let dispatcher = Dispatcher::new(table);

    for path in ["/cards", "/cards/1/extra", "/cards/1/2/3"] {
        let res = dispatcher.dispatch(&get(path)).unwrap();
        assert_eq!(res.status(), 404, "{path}");
        assert_eq!(res.body_str(), r#"{"error":"Route not found"}"#);
    }
    assert_eq!(dispatcher.dispatch(&get("/cards/1")).unwrap().body_str(), "card");
}

#[test]
fn test_method_buckets_are_isolated() {
    let mut table = RouteTable::new();
    table
        .post("/cards", Handler::new(|_req, _p| Ok("created")))
        .unwrap();
    let dispatcher = Dispatcher::new(table);

    assert_eq!(dispatcher.dispatch(&get("/cards")).unwrap().status(), 404);
    let head = Request::builder(HttpMethod::HEAD, "/cards").build();
    assert_eq!(dispatcher.dispatch(&head).unwrap().status(), 404);
    let post = Request::builder(HttpMethod::POST, "/cards").build();
    assert_eq!(dispatcher.dispatch(&post).unwrap().body_str(), "created");
}

#[test]
fn test_first_registered_match_wins() {
    let mut table = RouteTable::new();
    table
        .get("/cards/new", Handler::new(|_req, _p| Ok("form")))
        .unwrap()
        .get("/cards/:id", Handler::new(|_req, p| Ok(format!("card {}", &p[0]))))
        .unwrap()
        .get("/cards/:other", Handler::new(|_req, _p| Ok("shadowed")))
        .unwrap();
    let dispatcher = Dispatcher::new(table);

    assert_eq!(dispatcher.dispatch(&get("/cards/new")).unwrap().body_str(), "form");
    assert_eq!(dispatcher.dispatch(&get("/cards/7")).unwrap().body_str(), "card 7");
}

#[test]
fn test_handler_error_propagates() {
    let mut table = RouteTable::new();
    table
        .delete(
            "/cards/:id",
            Handler::new(|_req, _p| -> anyhow::Result<()> { anyhow::bail!("store offline") }),
        )
        .unwrap();
    let dispatcher = Dispatcher::new(table);

    let req = Request::builder(HttpMethod::DELETE, "/cards/3").build();
    match dispatcher.dispatch(&req) {
        Err(DispatchError::Handler {
            method,
            pattern,
            source,
        }) => {
            assert_eq!(method, Method::Delete);
            assert_eq!(pattern, "/cards/:id");
            assert_eq!(source.to_string(), "store offline");
        }
        other => panic!("expected handler error, got {other:?}"),
    }
}

#[test]
fn test_passing_gate_decorations_reach_response() {
    let mut table = RouteTable::new();
    table
        .register(
            Method::Get,
            "/cards",
            Handler::new(|_req, _p| Ok(json!([]))),
            Chain::new().with(Arc::new(SecurityHeadersGate::new())),
        )
        .unwrap();

    let res = Dispatcher::new(table).dispatch(&get("/cards")).unwrap();
    assert_eq!(res.header("x-content-type-options"), Some("nosniff"));
    assert_eq!(res.header("x-frame-options"), Some("DENY"));
    assert_eq!(res.header("content-type"), Some("application/json"));
}

#[test]
fn test_handler_sees_params_by_name_and_position() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut table = RouteTable::new();
    table
        .get(
            "/users/:userId/cards/:cardId",
            Handler::new(move |_req, p| {
                sink.lock().unwrap().extend(values(p));
                Ok(p.by_name("cardId").map(str::to_string))
            }),
        )
        .unwrap();

    let res = Dispatcher::new(table)
        .dispatch(&get("/users/u-1/cards/c%202"))
        .unwrap();
    assert_eq!(res.body_str(), "c%202");
    assert_eq!(*seen.lock().unwrap(), vec!["u-1", "c%202"]);
}

#[test]
fn test_replace_table() {
    let dispatcher = Dispatcher::new(RouteTable::new());
    assert_eq!(dispatcher.dispatch(&get("/ping")).unwrap().status(), 404);

    let mut table = RouteTable::new();
    table.get("/ping", Handler::new(|_req, _p| Ok("pong"))).unwrap();
    dispatcher.replace_table(table);

    assert_eq!(dispatcher.dispatch(&get("/ping")).unwrap().body_str(), "pong");
    assert_eq!(dispatcher.table().len(), 1);
}

#[test]
fn test_concurrent_dispatch() {
    let mut table = RouteTable::new();
    table
        .get("/n/:n", Handler::new(|_req, p| Ok(p[0].to_string())))
        .unwrap();
    let dispatcher = Arc::new(Dispatcher::new(table));

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || {
                for j in 0..50 {
                    let path = format!("/n/{i}-{j}");
                    let res = dispatcher.dispatch(&get(&path)).unwrap();
                    assert_eq!(res.body_str(), format!("{i}-{j}"));
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
}
