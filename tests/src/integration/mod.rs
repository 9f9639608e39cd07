//! Integration tests over [`desk_runtime::DeskRuntime`].

mod broadcast;
mod round_trip;
mod teardown;

#[cfg(test)]
pub(crate) mod support {
    use desk_runtime::{DeskConfig, DeskRuntime};
    use desk_types::Envelope;
    use std::time::Duration;
    use tokio_stream::wrappers::UnboundedReceiverStream;
    use tokio_stream::StreamExt;

    pub const WAIT: Duration = Duration::from_secs(2);

    pub fn started(config: DeskConfig) -> DeskRuntime {
        let runtime = DeskRuntime::new(config).expect("valid config");
        runtime.start().expect("started");
        runtime
    }

    /// Next envelope on `stream`, failing the test after [`WAIT`].
    pub async fn next(stream: &mut UnboundedReceiverStream<Envelope>) -> Envelope {
        tokio::time::timeout(WAIT, stream.next())
            .await
            .expect("delivered in time")
            .expect("stream open")
    }

    /// Whether anything arrives on `stream` within `window`.
    pub async fn stays_quiet(stream: &mut UnboundedReceiverStream<Envelope>, window: Duration) -> bool {
        tokio::time::timeout(window, stream.next()).await.is_err()
    }
}
