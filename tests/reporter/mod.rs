use std::{io::Write, sync::Arc, time::Duration};

use mockito::{Matcher, Server};
use reportportal_client::{
    context, AsyncClient, BatchedReporter, ExecutionStrategy, ItemFinishRequest,
    ItemStartRequest, LaunchFinishRequest, LaunchStartRequest, LogLevel, Reporter, RpFile,
    TaskConfig, Threaded, ThreadedReporter,
};
use serde_json::json;

use crate::types::{self, config, config_with_retries, v1, v2};

fn launch() -> LaunchStartRequest {
    LaunchStartRequest::builder().name("Nightly").build()
}

fn step(name: &str) -> ItemStartRequest {
    ItemStartRequest::builder()
        .name(name)
        .item_type("STEP")
        .build()
}

fn passed() -> ItemFinishRequest {
    ItemFinishRequest::builder().status("PASSED").build()
}

/// Report one launch with one item and two logs, returning the results of every call.
fn report<S: ExecutionStrategy>(reporter: &mut Reporter<S>) -> Vec<Option<String>> {
    let launch = reporter.start_launch(launch());
    let item = reporter.start_test_item(step("login works"), None);
    reporter
        .log()
        .message("Launch log")
        .level(LogLevel::Info)
        .call();
    reporter
        .log()
        .message("Item log")
        .level(LogLevel::Debug)
        .item_id(&item)
        .attachment(RpFile::new(
            Some("screenshot.png".to_owned()),
            vec![1, 2, 3],
            Some("image/png".to_owned()),
        ))
        .call();
    let finish_item = reporter.finish_test_item(&item, passed());
    let finish_launch = reporter.finish_launch(LaunchFinishRequest::builder().build());

    [launch, item, finish_item, finish_launch]
        .iter()
        .map(|task| task.blocking_result().unwrap())
        .collect()
}

/// Given a threaded reporter
/// When a launch is reported without waiting for any ids
/// Then every request should be sent with the ids returned by the server
#[test]
fn threaded_reporter_reports_a_launch() {
    let mut server = Server::new();
    let start_launch = types::start_launch(&mut server, "launch-1");
    let start_item = types::start_item(&mut server, "launch-1", "item-1");
    let finish_item = server
        .mock("PUT", v2("item/item-1").as_str())
        .match_body(Matcher::PartialJson(
            json!({ "launchUuid": "launch-1", "status": "PASSED" }),
        ))
        .with_body(r#"{"message": "Item item-1 finished"}"#)
        .create();
    let logs = types::logs(&mut server);
    let finish_launch = types::finish_launch(&mut server, "launch-1");

    let mut reporter = ThreadedReporter::start(config(&server), TaskConfig::default()).unwrap();
    let results = report(&mut reporter);

    assert_eq!(
        results,
        vec![
            Some("launch-1".to_owned()),
            Some("item-1".to_owned()),
            Some("Item item-1 finished".to_owned()),
            Some("Launch launch-1 finished".to_owned()),
        ]
    );
    assert!(reporter.current_item().is_none());
    start_launch.assert();
    start_item.assert();
    finish_item.assert();
    logs.assert();
    finish_launch.assert();
}

/// Given a batched reporter
/// When a launch is reported without waiting for any ids
/// Then every request should be sent with the ids returned by the server
#[test]
fn batched_reporter_reports_a_launch() {
    let mut server = Server::new();
    let start_launch = types::start_launch(&mut server, "launch-1");
    let start_item = types::start_item(&mut server, "launch-1", "item-1");
    let finish_item = types::finish_item(&mut server, "item-1");
    let logs = types::logs(&mut server);
    let finish_launch = types::finish_launch(&mut server, "launch-1");

    let mut reporter = BatchedReporter::start(config(&server), TaskConfig::default()).unwrap();
    let results = report(&mut reporter);

    assert_eq!(
        results,
        vec![
            Some("launch-1".to_owned()),
            Some("item-1".to_owned()),
            Some("Item item-1 finished".to_owned()),
            Some("Launch launch-1 finished".to_owned()),
        ]
    );
    start_launch.assert();
    start_item.assert();
    finish_item.assert();
    logs.assert();
    finish_launch.assert();
}

/// Given a batched reporter
/// When a launch is started
/// Then nothing should be sent until the caller blocks on it
#[test]
fn batched_reporter_sends_on_demand() {
    let mut server = Server::new();
    let start_launch = types::start_launch(&mut server, "launch-1");

    let mut reporter = BatchedReporter::start(config(&server), TaskConfig::default()).unwrap();
    let launch = reporter.start_launch(launch());

    assert!(!launch.is_done());
    assert!(!start_launch.matched());

    assert_eq!(launch.blocking_result(), Ok(Some("launch-1".to_owned())));
}

/// Given a threaded reporter
/// When a request fails even after retrying
/// Then the task should complete without a value
#[test]
fn failed_request_completes_empty() {
    let mut server = Server::new();
    let start_launch = server
        .mock("POST", v2("launch").as_str())
        .with_status(500)
        .expect(2)
        .create();

    let mut reporter =
        ThreadedReporter::start(config_with_retries(&server, 1), TaskConfig::default()).unwrap();
    let launch = reporter.start_launch(launch());

    assert_eq!(launch.blocking_result(), Ok(None));
    start_launch.assert();

    // Items of a launch which failed to start are skipped.
    let item = reporter.start_test_item(step("skipped"), None);
    assert_eq!(item.blocking_result(), Ok(None));
}

/// Given a reporter for a launch started elsewhere
/// When it starts and finishes the launch
/// Then neither request should be sent
#[test]
fn reporter_with_existing_launch() {
    let mut server = Server::new();
    let start_launch = types::start_launch(&mut server, "other");
    let finish_launch = types::finish_launch(&mut server, "external");
    let start_item = types::start_item(&mut server, "external", "item-1");

    let config = config(&server);
    let mut reporter = Reporter::builder()
        .client(AsyncClient::new(config).unwrap())
        .strategy(Arc::new(Threaded::new(TaskConfig::default()).unwrap()))
        .launch_uuid("external")
        .build();

    let launch = reporter.start_launch(launch());
    let item = reporter.start_test_item(step("test"), None);
    let finish = reporter.finish_launch(LaunchFinishRequest::builder().build());

    assert_eq!(launch.blocking_result(), Ok(Some("external".to_owned())));
    assert_eq!(item.blocking_result(), Ok(Some("item-1".to_owned())));
    assert_eq!(finish.blocking_result(), Ok(None));
    assert!(!start_launch.matched());
    assert!(!finish_launch.matched());
    start_item.assert();
}

/// Given a reporter with a current item
/// When it is cloned
/// Then the clone should report children of that item into the same launch
#[test]
fn cloned_reporter_shares_the_current_item() {
    let mut server = Server::new();
    let _start_launch = types::start_launch(&mut server, "launch-1");
    let _start_suite = types::start_item(&mut server, "launch-1", "suite-1");
    let start_child = server
        .mock("POST", v2("item/suite-1").as_str())
        .with_body(r#"{"id": "child-1"}"#)
        .create();
    let finish_launch = types::finish_launch(&mut server, "launch-1");

    let mut reporter = ThreadedReporter::start(config(&server), TaskConfig::default()).unwrap();
    reporter.start_launch(launch());
    let suite = reporter.start_test_item(step("suite"), None);

    let mut clone = reporter.clone();
    let current = clone.current_item().cloned().unwrap();
    assert_eq!(current.blocking_result(), Ok(Some("suite-1".to_owned())));

    let child = clone.start_test_item(step("child"), Some((&suite).into()));
    assert_eq!(child.blocking_result(), Ok(Some("child-1".to_owned())));

    // Only the reporter which started the launch finishes it.
    let finished = clone.finish_launch(LaunchFinishRequest::builder().build());
    assert_eq!(finished.blocking_result(), Ok(None));
    start_child.assert();
    assert!(!finish_launch.matched());
}

/// Given a reporter cloned before any launch was started
/// When the clone starts and finishes a launch
/// Then no launch should be created or finished
#[test]
fn clone_never_owns_a_launch() {
    let mut server = Server::new();
    let start_launch = types::start_launch(&mut server, "launch-1");
    let finish_launch = types::finish_launch(&mut server, "launch-1");

    let reporter = ThreadedReporter::start(config(&server), TaskConfig::default()).unwrap();
    let mut clone = reporter.clone();

    let started = clone.start_launch(launch());
    assert_eq!(started.blocking_result(), Ok(None));
    assert!(clone.launch_uuid().is_none());

    let finished = clone.finish_launch(LaunchFinishRequest::builder().build());
    assert_eq!(finished.blocking_result(), Ok(None));
    assert!(!start_launch.matched());
    assert!(!finish_launch.matched());
}

/// Given a threaded reporter with a started launch
/// When we ask for the launch page
/// Then its address should be built from the launch info
#[test]
fn launch_ui_url() {
    let mut server = Server::new();
    let _start_launch = types::start_launch(&mut server, "launch-1");
    let launch_info = types::launch_info(&mut server, "launch-1", 42, "DEBUG", 2);

    let mut reporter = ThreadedReporter::start(config(&server), TaskConfig::default()).unwrap();
    reporter.start_launch(launch());

    assert_eq!(reporter.get_launch_ui_id().blocking_result(), Ok(Some(42)));
    assert_eq!(
        reporter.get_launch_ui_url().blocking_result(),
        Ok(Some(format!("{}/ui/#demo/userdebug/all/42", server.url())))
    );
    launch_info.assert();
}

/// Given a reporter without a launch
/// When we ask for launch info
/// Then no request should be sent
#[test]
fn launch_info_without_launch() {
    let server = Server::new();
    let reporter = ThreadedReporter::start(config(&server), TaskConfig::default()).unwrap();

    assert_eq!(reporter.get_launch_info().blocking_result(), Ok(None));
    assert_eq!(reporter.get_launch_ui_url().blocking_result(), Ok(None));
}

/// Given a reporter with items in progress
/// When it is suspended and resumed
/// Then the resumed reporter should continue with the same launch and items
#[test]
fn suspend_and_resume() {
    let mut server = Server::new();
    let _start_launch = types::start_launch(&mut server, "launch-1");
    let _start_suite = types::start_item(&mut server, "launch-1", "suite-1");
    let finish_suite = types::finish_item(&mut server, "suite-1");
    let _settings = server
        .mock("GET", v1("settings").as_str())
        .with_body(r#"{"project": 1}"#)
        .create();

    let mut reporter = ThreadedReporter::start(config(&server), TaskConfig::default()).unwrap();
    reporter.start_launch(launch());
    reporter.start_test_item(step("suite"), None);

    let state = reporter.suspend();
    assert_eq!(state.launch_uuid.as_deref(), Some("launch-1"));
    assert_eq!(state.item_stack, vec!["suite-1".to_owned()]);
    assert!(state.own_launch);

    let mut resumed = ThreadedReporter::resume(state).unwrap();
    let current = resumed.current_item().cloned().unwrap();
    let finished = resumed.finish_test_item(&current, passed());

    assert_eq!(
        finished.blocking_result(),
        Ok(Some("Item suite-1 finished".to_owned()))
    );
    assert_eq!(
        resumed.get_project_settings().blocking_result(),
        Ok(Some(json!({ "project": 1 })))
    );
    finish_suite.assert();
}

/// Given a reporter registered as the active client
/// When we look it up from the same thread
/// Then it should be found
#[test]
fn active_reporter() {
    let server = Server::new();
    let reporter = ThreadedReporter::start(config(&server), TaskConfig::default()).unwrap();

    reporter.register_active();

    assert!(context::active_client::<ThreadedReporter>().is_some());
    assert!(context::active_client::<BatchedReporter>().is_none());
    context::clear_active_client();
}

/// Given a threaded reporter with a short task timeout
/// When the server is slow to respond
/// Then blocking on the task should time out, while the request carries on
#[test]
fn task_timeout() {
    let mut server = Server::new();
    let _start_launch = server
        .mock("POST", v2("launch").as_str())
        .with_chunked_body(|writer| {
            std::thread::sleep(Duration::from_millis(300));
            writer.write_all(br#"{"id": "launch-1"}"#)
        })
        .create();

    let task_config = TaskConfig::builder()
        .task_timeout(Duration::from_millis(50))
        .build();
    let mut reporter = ThreadedReporter::start(config(&server), task_config).unwrap();
    let launch = reporter.start_launch(launch());

    assert_eq!(
        launch.blocking_result(),
        Err(reportportal_client::TaskError::Timeout(Duration::from_millis(50)))
    );
}
