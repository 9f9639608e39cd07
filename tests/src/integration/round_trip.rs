//! # Request / Reply Round Trips
//!
//! A renderer client asks a main-process controller and gets exactly one
//! answer on `<channel>-reply`, while every window sees the request channel
//! broadcast.

#[cfg(test)]
mod tests {
    use super::super::support::{next, started, WAIT};
    use desk_bus::Registration;
    use desk_runtime::controllers::circuit::{self, CircuitState, LearningCircuit};
    use desk_runtime::controllers::journal::{self, Intention, Task};
    use desk_runtime::DeskConfig;
    use desk_types::{catalog, Channel, ErrorKind};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_start_circuit_reaches_every_window() {
        let runtime = started(DeskConfig::default());
        let console = runtime.open_renderer();
        let overlay = runtime.open_renderer();

        let mut console_requests = console.events().subscribe(catalog::CIRCUIT_CLIENT);
        let mut overlay_requests = overlay.events().subscribe(catalog::CIRCUIT_CLIENT);
        let mut overlay_views = overlay.events().subscribe(catalog::VIEW_CONSOLE_CIRCUIT_START_STOP);

        let circuits = console.client(catalog::CIRCUIT_CLIENT, "Console");
        let reply = timeout(
            WAIT,
            circuits.call(json!({"action": circuit::START_WTF, "circuitName": "angry_teapot"})),
        )
        .await
        .expect("answered in time")
        .expect("delivered");

        let started_circuit: LearningCircuit = reply.data_as().expect("decodes").expect("circuit");
        assert_eq!(started_circuit.circuit_name, "angry_teapot");
        assert_eq!(started_circuit.circuit_state, CircuitState::Troubleshoot);

        // the request itself is broadcast after the controller ran
        let seen_by_console = next(&mut console_requests).await;
        let seen_by_overlay = next(&mut overlay_requests).await;
        assert_eq!(seen_by_console.id, reply.id);
        assert_eq!(seen_by_overlay.data, reply.data);

        let view = next(&mut overlay_views).await;
        let announced: LearningCircuit = serde_json::from_value(view.args).expect("circuit args");
        assert_eq!(announced.id, started_circuit.id);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_action_answers_once_with_callback_error() {
        let runtime = started(DeskConfig::default());
        let renderer = runtime.open_renderer();
        let circuits = renderer.client(catalog::CIRCUIT_CLIENT, "Console");

        circuits
            .call(json!({"action": circuit::START_WTF}))
            .await
            .expect("first start");

        let answers = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let sink = answers.clone();
        circuits
            .request("Console", json!({"action": circuit::START_WTF}), move |envelope| {
                sink.lock().push(envelope);
                let _ = done_tx.send(());
            })
            .expect("sent");

        timeout(WAIT, done_rx).await.expect("answered").expect("callback ran");
        let answers = answers.lock();
        assert_eq!(answers.len(), 1);
        let err = answers[0].error.as_ref().expect("already active");
        assert_eq!(err.kind, ErrorKind::Callback);
        assert_eq!(answers[0].data, None);

        drop(answers);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_action_is_reported() {
        let runtime = started(DeskConfig::default());
        let renderer = runtime.open_renderer();
        let circuits = renderer.client(catalog::CIRCUIT_CLIENT, "Console");

        let reply = timeout(WAIT, circuits.call(json!({"action": "join-wtf"})))
            .await
            .expect("answered in time")
            .expect("delivered");

        let err = reply.error.expect("unknown action");
        assert_eq!(err.kind, ErrorKind::Callback);
        assert!(err.message.contains("join-wtf"));

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_request_sync_answers_inline() {
        let runtime = started(DeskConfig::default());
        runtime.bus().register(Registration::new(catalog::APP_HEARTBEAT, "Heartbeat", |_, args| {
            Ok(json!({"pong": args["ping"]}))
        }));
        let renderer = runtime.open_renderer();
        let heartbeat = renderer.client(catalog::APP_HEARTBEAT, "Pulse");

        let answer = heartbeat.request_sync(json!({"ping": 9})).expect("answered");

        assert_eq!(answer.data, Some(json!({"pong": 9})));
        assert_eq!(heartbeat.correlator().pending_count(), 0);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_call_resolves_on_inline_channel() {
        let runtime = started(DeskConfig::default());
        runtime.bus().register(Registration::new(catalog::APP_HEARTBEAT, "Heartbeat", |_, args| {
            Ok(json!({"pong": args["ping"]}))
        }));
        let renderer = runtime.open_renderer();
        let heartbeat = renderer.client(catalog::APP_HEARTBEAT, "Pulse");

        let reply = timeout(WAIT, heartbeat.call(json!({"ping": 3})))
            .await
            .expect("answered in time")
            .expect("delivered");

        assert_eq!(reply.data, Some(json!({"pong": 3})));
        assert!(reply.error.is_none());
        assert_eq!(heartbeat.correlator().pending_count(), 0);
        assert_eq!(heartbeat.correlator().stats().completed, 1);

        runtime.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sync_and_async_requests_never_overlap() {
        let runtime = started(DeskConfig::default());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (running, max) = (in_flight.clone(), peak.clone());
        runtime.bus().register(
            Registration::new(catalog::TEAM_CLIENT, "TeamController", move |_, args| {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(100));
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(args.clone())
            })
            .deferred(),
        );
        let first = runtime.open_renderer();
        let second = runtime.open_renderer();
        let async_client = first.client(catalog::TEAM_CLIENT, "TeamPanel");
        let sync_client = second.client(catalog::TEAM_CLIENT, "TeamSidebar");

        let called = tokio::spawn(async move { async_client.call(json!({"n": 1})).await });
        let synced = tokio::task::spawn_blocking(move || sync_client.request_sync(json!({"n": 2})));

        let reply = timeout(WAIT, called)
            .await
            .expect("answered in time")
            .expect("task ran")
            .expect("delivered");
        let answer = synced.await.expect("task ran").expect("answered");

        assert_eq!(reply.data, Some(json!({"n": 1})));
        assert_eq!(answer.data, Some(json!({"n": 2})));
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(runtime.bus().stats().handler_invocations, 2);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_journal_intention_refreshes_other_windows() {
        let runtime = started(DeskConfig::default());
        let project = runtime.stores().journal.add_project("circuit-desk");
        let writer = runtime.open_renderer();
        let reader = runtime.open_renderer();
        let mut refreshes = reader.events().subscribe(catalog::JOURNAL_DATA_REFRESH);

        let journal_client = writer.client(catalog::JOURNAL_CLIENT, "Journal");
        let task: Task = journal_client
            .call(json!({"action": journal::CREATE_TASK_REFERENCE, "taskName": "DESK-12"}))
            .await
            .expect("task reference")
            .data_as()
            .expect("decodes")
            .expect("task");

        let created = journal_client
            .call(json!({
                "action": journal::CREATE_INTENTION,
                "projectId": project.id,
                "taskId": task.id,
                "description": "wire up the journal",
            }))
            .await
            .expect("intention");
        assert!(created.error.is_none());

        let refresh = next(&mut refreshes).await;
        let intention: Intention =
            serde_json::from_value(refresh.args.clone()).expect("intention args");
        assert_eq!(intention.description, "wire up the journal");
        assert_eq!(refresh.channel, Channel::new(catalog::JOURNAL_DATA_REFRESH));

        runtime.shutdown().await;
    }
}
