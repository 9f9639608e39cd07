//! # Teardown and Late Replies
//!
//! Requests whose caller went away are never answered twice, and never
//! answered into a torn-down scope.

#[cfg(test)]
mod tests {
    use super::super::support::{started, WAIT};
    use desk_bus::Registration;
    use desk_runtime::{DeskConfig, DeskRuntime};
    use desk_types::{catalog, ErrorKind};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    const SETTLE: Duration = Duration::from_millis(50);

    fn counting_fervie(runtime: &DeskRuntime) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        runtime.bus().register(
            Registration::new(catalog::FERVIE_CLIENT, "FervieController", move |_, _| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"color": "#FF9AAB"}))
            })
            .deferred(),
        );
        calls
    }

    #[tokio::test]
    async fn test_teardown_before_reply_never_calls_back() {
        let runtime = started(DeskConfig::default());
        let handled = counting_fervie(&runtime);
        let renderer = runtime.open_renderer();
        let fervie = renderer.client(catalog::FERVIE_CLIENT, "FervieSprite");

        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        fervie
            .request("abc", json!({"action": "load-fervie-details"}), move |_| {
                flag.store(true, Ordering::SeqCst);
            })
            .expect("sent");

        assert_eq!(fervie.teardown(), 1);
        sleep(SETTLE).await;

        assert_eq!(handled.load(Ordering::SeqCst), 1);
        assert!(!called.load(Ordering::SeqCst));
        assert_eq!(fervie.correlator().stats().cancelled, 1);
        assert_eq!(fervie.correlator().stats().completed, 0);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_reply_for_cancelled_request_is_discarded() {
        let runtime = started(DeskConfig::default());
        counting_fervie(&runtime);
        let renderer = runtime.open_renderer();
        let fervie = renderer.client(catalog::FERVIE_CLIENT, "FervieSprite");

        let id = fervie
            .request("abc", json!({}), |_| panic!("cancelled request answered"))
            .expect("sent");
        assert!(fervie.correlator().cancel(&id));
        sleep(SETTLE).await;

        let stats = fervie.correlator().stats();
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.completed, 0);
        assert_eq!(fervie.correlator().pending_count(), 0);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancel_scope_keeps_other_scopes() {
        let runtime = started(DeskConfig::default());
        counting_fervie(&runtime);
        let renderer = runtime.open_renderer();
        let fervie = renderer.client(catalog::FERVIE_CLIENT, "FervieSprite");

        let (tx, rx) = tokio::sync::oneshot::channel();
        fervie
            .request("abc", json!({}), |_| panic!("torn-down scope answered"))
            .expect("sent");
        fervie
            .request("FervieButton", json!({}), move |envelope| {
                let _ = tx.send(envelope);
            })
            .expect("sent");

        assert_eq!(fervie.cancel_scope(&"abc".into()), 1);
        let answer = timeout(WAIT, rx).await.expect("answered").expect("callback ran");

        assert_eq!(answer.data, Some(json!({"color": "#FF9AAB"})));
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_unanswered_request_expires() {
        let config = DeskConfig {
            request_timeout: Some(Duration::from_millis(30)),
            cleanup_interval: Duration::from_millis(10),
            ..DeskConfig::default()
        };
        // main loop never started: async sends stay queued and unanswered
        let runtime = DeskRuntime::new(config).expect("valid config");
        let renderer = runtime.open_renderer();
        let notifications = renderer.client(catalog::NOTIFICATION_CLIENT, "Toasts");

        let reply = timeout(WAIT, notifications.call(json!({})))
            .await
            .expect("expired in time")
            .expect("delivered");

        let err = reply.error.expect("expired");
        assert_eq!(err.kind, ErrorKind::Expired);
        assert_eq!(notifications.correlator().stats().expired, 1);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_unregistered_handler_is_not_invoked() {
        let runtime = started(DeskConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let handler = runtime.bus().register(
            Registration::new(catalog::DICTIONARY_CLIENT, "Dictionary", move |_, _| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(json!([]))
            })
            .deferred(),
        );

        assert!(runtime.bus().unregister(&handler).is_some());
        assert!(runtime.bus().unregister(&handler).is_none());

        let renderer = runtime.open_renderer();
        let dictionary = renderer.client(catalog::DICTIONARY_CLIENT, "Dictionary");
        let reply = timeout(WAIT, dictionary.call(json!({})))
            .await
            .expect("answered in time")
            .expect("delivered");

        assert_eq!(reply.error.map(|e| e.kind), Some(ErrorKind::UnknownChannel));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        runtime.shutdown().await;
    }
}
