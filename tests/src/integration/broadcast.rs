//! # Fan-out
//!
//! Broadcasts follow local handlers, reach every open window even when no
//! handler matched, and skip reply-only channels.

#[cfg(test)]
mod tests {
    use super::super::support::{next, started, stays_quiet};
    use desk_runtime::controllers::journal;
    use desk_runtime::DeskConfig;
    use desk_types::catalog;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_broadcast_without_handlers() {
        let runtime = started(DeskConfig::default());
        let first = runtime.open_renderer();
        let second = runtime.open_renderer();
        let mut first_room = first.events().subscribe(catalog::TALK_MESSAGE_ROOM);
        let mut second_room = second.events().subscribe(catalog::TALK_MESSAGE_ROOM);

        let report = runtime
            .bus()
            .emit(catalog::TALK_MESSAGE_ROOM, json!({"text": "standup in 5"}));

        assert!(!report.matched());
        assert_eq!(report.windows_reached, vec![first.window(), second.window()]);
        assert_eq!(next(&mut first_room).await.args["text"], "standup in 5");
        assert_eq!(next(&mut second_room).await.id, report.envelope.id);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_closed_window_is_skipped() {
        let runtime = started(DeskConfig::default());
        let open = runtime.open_renderer();
        let closed = runtime.open_renderer();

        assert!(runtime.close_window(closed.window()));
        let report = runtime.bus().emit(catalog::APP_PULSE, json!({}));

        assert_eq!(report.windows_reached, vec![open.window()]);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_reply_only_channel_answers_sender_alone() {
        let config = DeskConfig {
            reply_only_channels: vec!["journal-client".to_string()],
            ..DeskConfig::default()
        };
        let runtime = started(config);
        let writer = runtime.open_renderer();
        let reader = runtime.open_renderer();
        let mut writer_requests = writer.events().subscribe(catalog::JOURNAL_CLIENT);
        let mut reader_requests = reader.events().subscribe(catalog::JOURNAL_CLIENT);

        let journal_client = writer.client(catalog::JOURNAL_CLIENT, "Journal");
        let reply = journal_client
            .call(json!({"action": journal::GET_RECENT_PROJECTS}))
            .await
            .expect("answered");

        assert_eq!(reply.data, Some(json!([])));
        assert!(stays_quiet(&mut writer_requests, Duration::from_millis(50)).await);
        assert!(stays_quiet(&mut reader_requests, Duration::from_millis(50)).await);

        runtime.shutdown().await;
    }
}
