//! Channel names used by the desktop client.
//!
//! Main-process controllers and renderer clients both look their channels
//! up here, so a channel name is defined in exactly one place.

macro_rules! channels {
    ($($name:ident => $value:literal),* $(,)?) => {
        $(pub const $name: &str = concat!("ipc-", $value);)*

        /// Every catalogued channel, in declaration order.
        pub const ALL: &[&str] = &[$($name),*];
    };
}

channels! {
    // App lifecycle
    APP_HEARTBEAT => "app-heartbeat",
    APP_PULSE => "app-pulse",
    APPLOADER_LOAD => "apploader-load",
    APP_LOADED => "app-loaded",
    APP_QUIT => "app-quit",

    // Windows
    WINDOW_LOADING_LOGIN_FAILED => "window-loading-login-failed",
    WINDOW_CONSOLE_SHOWN => "window-console-shown",
    WINDOW_CONSOLE_SHOW_HIDE => "window-console-show-hide",
    WINDOW_CHAT_CONSOLE_SHOW_HIDE => "window-chat-console-show-hide",
    WINDOW_CHAT_CONSOLE_SHOWN => "window-chat-console-shown",
    WINDOW_CHAT_CONSOLE_HIDDEN => "window-chat-console-hidden",
    WINDOW_ACTIVATOR_CLOSE => "window-activator-close",
    WINDOW_OPEN_CHART => "window-open-chart",
    WINDOW_CLOSE_CHART => "window-close-chart",
    WINDOW_OPEN_MOOVIE => "window-open-moovie",
    WINDOW_CLOSE_MOOVIE => "window-close-moovie",

    // Talk (chat) presence
    TALK_CONNECTED => "talk-connected",
    TALK_CONNECT_FAILED => "talk-connect-failed",
    TALK_MESSAGE_CLIENT => "talk-message-client",
    TALK_MESSAGE_ROOM => "talk-message-room",
    TALK_JOIN_ROOM => "talk-join-room",
    TALK_LEAVE_ROOM => "talk-leave-room",

    // Feature clients (request/reply)
    TEAM_CLIENT => "team-client",
    MEMBER_CLIENT => "member-client",
    JOURNAL_CLIENT => "journal-client",
    CIRCUIT_CLIENT => "circuit-client",
    FERVIE_CLIENT => "fervie-client",
    MOOVIE_CLIENT => "moovie-client",
    NOTIFICATION_CLIENT => "notification-client",
    DICTIONARY_CLIENT => "dictionary-client",

    // View notifications (pub/sub)
    VIEW_CONSOLE_CIRCUIT_JOIN_LEAVE => "view-console-circuit-join-leave",
    VIEW_CONSOLE_CIRCUIT_START_STOP => "view-console-circuit-start-stop",
    VIEW_CONSOLE_CIRCUIT_PAUSE_RESUME => "view-console-circuit-pause-resume",
    VIEW_CONSOLE_CIRCUIT_SOLVE => "view-console-circuit-solve",
    VIEW_CONSOLE_ME_UPDATE => "view-console-me-update",

    // Data refresh
    ME_DATA_REFRESH => "me-data-refresh",
    TEAM_DATA_REFRESH => "team-data-refresh",
    CIRCUIT_DATA_REFRESH => "circuit-data-refresh",
    JOURNAL_DATA_REFRESH => "journal-data-refresh",

    // Screenshots
    PREPARE_FOR_SCREENSHOT => "prepare-for-screenshot",
    READY_FOR_SCREENSHOT => "ready-for-screenshot",
    SCREENSHOT_COMPLETE => "screenshot-complete",
}
