pub(crate) mod receive;
pub(crate) mod send;

pub(crate) use receive::{spawn_receive_loop, InboundHandshake};
pub(crate) use send::SendSocket;

/// An inbound connection's receive-side task handle. `close` aborts the
/// framed read loop and waits for it to unwind.
pub(crate) struct ReceiveSocket {
    task: tokio::task::JoinHandle<()>,
}

impl ReceiveSocket {
    pub(crate) fn new(task: tokio::task::JoinHandle<()>) -> Self {
        Self { task }
    }

    pub(crate) async fn close(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}
