//! A queued-response mock transport for exercising the client/pool without
//! a live Zabbix server, grounded on the teacher's `MockClient` test double.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use http::{Request, Response};
use zabbix_rpc_core::HttpClient;

/// Implements [`HttpClient`] by popping canned responses off a queue in
/// order, and recording every request sent for later assertions.
#[derive(Clone)]
pub struct MockClient {
    queue: Arc<Mutex<VecDeque<Response<Vec<u8>>>>>,
    log: Arc<Mutex<Vec<Request<Vec<u8>>>>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a response to be returned by the next `send_http` call.
    pub fn push(&self, response: Response<Vec<u8>>) {
        self.queue.lock().unwrap().push_back(response);
    }

    /// Drain and return the log of every request sent so far.
    pub fn take_log(&self) -> Vec<Request<Vec<u8>>> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("mock transport queue exhausted")]
pub struct MockClientError;

impl HttpClient for MockClient {
    type Error = MockClientError;

    async fn send_http(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<Response<Vec<u8>>, Self::Error> {
        self.log.lock().unwrap().push(clone_request(&request));
        self.queue.lock().unwrap().pop_front().ok_or(MockClientError)
    }
}

fn clone_request(req: &Request<Vec<u8>>) -> Request<Vec<u8>> {
    let mut builder = Request::builder().method(req.method()).uri(req.uri());
    for (name, value) in req.headers() {
        builder = builder.header(name, value);
    }
    builder.body(req.body().clone()).unwrap()
}
