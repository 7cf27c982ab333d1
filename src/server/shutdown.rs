use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

pub fn shutdown_signal() -> (ServerShutdownHandle, ServerShutdownSignal) {
    let (tx, rx) = oneshot::channel();

    (ServerShutdownHandle { tx: Some(tx) }, ServerShutdownSignal { rx })
}

/// Stops the paired server when told to, or when dropped.
pub struct ServerShutdownHandle {
    tx: Option<oneshot::Sender<()>>,
}

impl ServerShutdownHandle {
    pub fn shutdown(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Resolves once the paired handle asks for shutdown or goes away.
pub struct ServerShutdownSignal {
    rx: oneshot::Receiver<()>,
}

impl Future for ServerShutdownSignal {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Pending => Poll::Pending,
            // Sent or dropped, either way the server stops.
            Poll::Ready(_) => Poll::Ready(()),
        }
    }
}
