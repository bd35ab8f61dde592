//! Unit tests for the dispatch cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use mockall::mock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::builtins::{QUIT_METHOD, QuitHandler, STATUS_METHOD, StatusHandler};
use super::{CommandQueue, Dispatcher, HandlerError, HandlerResult, LogSink, Request, Response};
use crate::transport::{Frame, ResponseSink, WriteError};

mock! {
    Sink {}
    impl ResponseSink for Sink {
        fn send(&self, bytes: &[u8]) -> Result<(), WriteError>;
    }
}

struct Harness {
    dispatcher: Dispatcher,
    queue: Arc<CommandQueue>,
    running: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<Value>>>,
}

impl Harness {
    fn with_sink(sink: MockSink, exit_on_quit: bool) -> Self {
        let queue = Arc::new(CommandQueue::new(None, 64));
        let running = Arc::new(AtomicBool::new(true));
        let dispatcher = Dispatcher::new(Arc::clone(&queue), Arc::new(sink), Arc::clone(&running));
        dispatcher.register(
            QUIT_METHOD,
            Arc::new(QuitHandler::new(Arc::clone(&running), exit_on_quit)),
        );
        dispatcher.register(STATUS_METHOD, Arc::new(StatusHandler::new()));
        Self {
            dispatcher,
            queue,
            running,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn new(exit_on_quit: bool) -> Self {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&sent);
        let mut sink = MockSink::new();
        sink.expect_send().returning(move |bytes: &[u8]| {
            assert_eq!(bytes.last(), Some(&b'\n'), "responses end with a newline");
            let value = serde_json::from_slice(bytes).expect("response is JSON");
            captured.lock().expect("sent lock").push(value);
            Ok(())
        });
        let mut harness = Self::with_sink(sink, exit_on_quit);
        harness.sent = sent;
        harness
    }

    fn submit(&self, text: &str) -> Value {
        self.queue.push(Frame::from(text)).expect("queue frame");
        assert!(self.dispatcher.do_work());
        self.sent
            .lock()
            .expect("sent lock")
            .last()
            .cloned()
            .expect("a response was sent")
    }
}

fn error_code(response: &Value) -> Option<i64> {
    response["result"]["error_code"].as_i64()
}

#[fixture]
fn harness() -> Harness {
    Harness::new(true)
}

#[rstest]
fn status_echoes_the_request_id(harness: Harness) {
    let response = harness.submit(r#"{"id":7,"method":"status"}"#);
    assert_eq!(response["id"], json!(7));
    assert_eq!(response["result"]["success"], json!(true));
    assert_eq!(response["result"]["status"], json!("ok"));
    assert_eq!(response["log_msgs"], json!([]));
}

#[rstest]
fn missing_method_reports_992(harness: Harness) {
    let response = harness.submit(r#"{"id":3}"#);
    assert_eq!(response["id"], json!(3));
    assert_eq!(response["result"]["success"], json!(false));
    assert_eq!(error_code(&response), Some(-992));
    assert!(
        response["log_msgs"]
            .as_array()
            .is_some_and(|lines| !lines.is_empty())
    );
}

#[rstest]
fn unmatched_method_reports_994(harness: Harness) {
    let response = harness.submit(r#"{"id":4,"method":"launch"}"#);
    assert_eq!(response["id"], json!(4));
    assert_eq!(error_code(&response), Some(-994));
}

#[rstest]
#[case("this is not json")]
#[case("[1,2,3]")]
#[case("")]
fn undecodable_frames_report_993(harness: Harness, #[case] frame: &str) {
    let response = harness.submit(frame);
    assert_eq!(response["id"], json!("unknown"));
    assert_eq!(error_code(&response), Some(-993));
}

#[rstest]
fn missing_id_is_reported_as_sentinel(harness: Harness) {
    let response = harness.submit(r#"{"method":"status"}"#);
    assert_eq!(response["id"], json!(-9999));
    assert_eq!(response["result"]["success"], json!(true));
}

#[rstest]
#[case(true, false)]
#[case(false, true)]
fn quit_honours_exit_on_quit(#[case] exit_on_quit: bool, #[case] still_running: bool) {
    let harness = Harness::new(exit_on_quit);
    let response = harness.submit(r#"{"id":9,"method":"quit"}"#);
    assert_eq!(response["id"], json!(9));
    assert_eq!(response["result"]["success"], json!(true));
    assert_eq!(harness.running.load(Ordering::SeqCst), still_running);
}

#[rstest]
fn handler_errors_report_991(harness: Harness) {
    harness.dispatcher.register(
        "explode",
        Arc::new(|_: &Request, log: &mut LogSink| -> HandlerResult {
            log.push("about to fail");
            Err(HandlerError::new("ran out of widgets"))
        }),
    );
    let response = harness.submit(r#"{"id":11,"method":"explode"}"#);
    assert_eq!(response["id"], json!(11));
    assert_eq!(error_code(&response), Some(-991));
    let log = response["log_msgs"].to_string();
    assert!(log.contains("about to fail"));
    assert!(log.contains("ran out of widgets"));
}

#[rstest]
fn handler_panics_report_991(harness: Harness) {
    harness.dispatcher.register(
        "panic",
        Arc::new(|_: &Request, _: &mut LogSink| -> HandlerResult {
            panic!("handler blew up");
        }),
    );
    let response = harness.submit(r#"{"id":12,"method":"panic"}"#);
    assert_eq!(error_code(&response), Some(-991));
    assert!(response["log_msgs"].to_string().contains("handler blew up"));

    let next = harness.submit(r#"{"id":13,"method":"status"}"#);
    assert_eq!(next["result"]["success"], json!(true));
}

#[rstest]
fn handler_id_is_overridden_by_the_request(harness: Harness) {
    harness.dispatcher.register(
        "liar",
        Arc::new(|_: &Request, _: &mut LogSink| -> HandlerResult {
            Ok(Some(Response::success(555)))
        }),
    );
    let response = harness.submit(r#"{"id":14,"method":"liar"}"#);
    assert_eq!(response["id"], json!(14));
}

#[rstest]
fn declining_handler_reports_994(harness: Harness) {
    harness.dispatcher.register(
        "shy",
        Arc::new(|_: &Request, _: &mut LogSink| -> HandlerResult { Ok(None) }),
    );
    let response = harness.submit(r#"{"id":15,"method":"shy"}"#);
    assert_eq!(error_code(&response), Some(-994));
}

#[rstest]
fn params_and_notes_reach_the_response(harness: Harness) {
    harness.dispatcher.register(
        "sum",
        Arc::new(|request: &Request, _: &mut LogSink| -> HandlerResult {
            let total = request.params().get_i64("a").unwrap_or(0)
                + request.params().get_i64("b").unwrap_or(0);
            Ok(Some(Response::success(request.id()).with_result("total", total)))
        }),
    );
    let response = harness.submit(r#"{"id":16,"method":"sum","params":{"a":2,"b":3}}"#);
    assert_eq!(response["result"]["total"], json!(5));

    let response = harness.submit(r#"{"id":17,"method":"sum","params":[1,2]}"#);
    assert_eq!(response["result"]["total"], json!(0));
    assert!(
        response["log_msgs"]
            .as_array()
            .is_some_and(|lines| !lines.is_empty())
    );
}

#[rstest]
fn stopped_dispatcher_leaves_the_queue_alone(harness: Harness) {
    harness.running.store(false, Ordering::SeqCst);
    harness
        .queue
        .push(Frame::from(r#"{"id":1,"method":"status"}"#))
        .expect("queue frame");
    assert!(!harness.dispatcher.do_work());
    assert_eq!(harness.queue.len(), 1);
    assert!(harness.sent.lock().expect("sent lock").is_empty());
}

#[rstest]
fn empty_queue_is_not_work(harness: Harness) {
    assert!(!harness.dispatcher.do_work());
}

#[rstest]
fn frames_are_answered_in_arrival_order(harness: Harness) {
    for id in 1..=5 {
        harness
            .queue
            .push(Frame::from(format!(r#"{{"id":{id},"method":"status"}}"#).as_str()))
            .expect("queue frame");
    }
    while harness.dispatcher.do_work() {}
    let ids: Vec<_> = harness
        .sent
        .lock()
        .expect("sent lock")
        .iter()
        .map(|response| response["id"].clone())
        .collect();
    assert_eq!(ids, [json!(1), json!(2), json!(3), json!(4), json!(5)]);
}

#[test]
fn write_failures_do_not_stop_the_loop() {
    let mut sink = MockSink::new();
    sink.expect_send()
        .times(2)
        .returning(|_: &[u8]| Err(WriteError::NotConnected));
    let harness = Harness::with_sink(sink, true);
    for id in 1..=2 {
        harness
            .queue
            .push(Frame::from(format!(r#"{{"id":{id},"method":"status"}}"#).as_str()))
            .expect("queue frame");
    }
    assert!(harness.dispatcher.do_work());
    assert!(harness.dispatcher.do_work());
    assert!(!harness.dispatcher.do_work());
}
