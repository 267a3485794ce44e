use std::sync::Arc;

use super::request::Request;
use super::response::Response;

/// Produces a response for one request. Called concurrently from worker
/// threads.
pub trait Handler: Send + Sync {
    fn handle(&self, req: &Request) -> Response;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn handle(&self, req: &Request) -> Response {
        (**self).handle(req)
    }
}
