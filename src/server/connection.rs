//! Make-service wrapper that holds a [`ConnectionTicket`] for the lifetime
//! of every accepted connection, so shutdown can wait for them to drain.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;

use crate::server::shutdown::{ConnectionTicket, ShutdownManager};

pub struct ConnectionCounter<M> {
    inner: M,
    shutdown: Arc<ShutdownManager>,
}

impl<M> ConnectionCounter<M> {
    pub fn new(inner: M, shutdown: Arc<ShutdownManager>) -> Self {
        Self { inner, shutdown }
    }
}

impl<M: Clone> Clone for ConnectionCounter<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<M, T> Service<T> for ConnectionCounter<M>
where
    M: Service<T> + Send,
    M::Future: Send + 'static,
    M::Response: Send + 'static,
{
    type Response = Tracked<M::Response>;
    type Error = M::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, target: T) -> Self::Future {
        // A failed make-service drops the ticket, which undoes the count.
        let ticket = self.shutdown.track();
        let fut = self.inner.call(target);

        Box::pin(async move {
            let service = fut.await?;
            Ok(Tracked {
                inner: service,
                _ticket: Arc::new(ticket),
            })
        })
    }
}

/// Per-connection service. Clones share the ticket; the count drops when
/// the last clone goes away with the connection.
pub struct Tracked<S> {
    inner: S,
    _ticket: Arc<ConnectionTicket>,
}

impl<S: Clone> Clone for Tracked<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _ticket: self._ticket.clone(),
        }
    }
}

impl<S, Req> Service<Req> for Tracked<S>
where
    S: Service<Req>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        self.inner.call(req)
    }
}
