//! In-memory transports and sleepers for unit tests.

use crate::error::TransportError;
use crate::models::{NotificationRequest, QueryBody};
use crate::notify::PushGateway;
use crate::query::RecordSource;
use crate::retry::{HttpReply, Sleeper};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::{ready, Ready};
use std::time::Duration;

/// Replays canned replies in order.
pub struct Script {
    replies: RefCell<VecDeque<Result<HttpReply, TransportError>>>,
    calls: RefCell<usize>,
}

impl Script {
    pub fn new(replies: Vec<Result<HttpReply, TransportError>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            calls: RefCell::new(0),
        }
    }

    pub fn pop(&self) -> Result<HttpReply, TransportError> {
        *self.calls.borrow_mut() += 1;
        self.replies
            .borrow_mut()
            .pop_front()
            .expect("script ran out of replies")
    }

    pub fn next(&self) -> Ready<Result<HttpReply, TransportError>> {
        ready(self.pop())
    }

    pub fn calls(&self) -> usize {
        *self.calls.borrow()
    }
}

/// Records requested delays instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn secs(&self) -> Vec<u64> {
        self.delays.borrow().iter().map(Duration::as_secs).collect()
    }
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.borrow_mut().push(delay);
    }
}

/// Record source backed by a script; keeps every request body.
pub struct ScriptedSource {
    pub script: Script,
    pub bodies: RefCell<Vec<QueryBody>>,
}

impl ScriptedSource {
    pub fn new(replies: Vec<Result<HttpReply, TransportError>>) -> Self {
        Self {
            script: Script::new(replies),
            bodies: RefCell::new(Vec::new()),
        }
    }

    pub fn pages(pages: Vec<Value>) -> Self {
        Self::new(
            pages
                .into_iter()
                .map(|page| Ok(HttpReply::new(200, page.to_string())))
                .collect(),
        )
    }
}

impl RecordSource for ScriptedSource {
    async fn query(&self, body: &QueryBody) -> Result<HttpReply, TransportError> {
        self.bodies.borrow_mut().push(body.clone());
        self.script.pop()
    }
}

/// Push gateway backed by a script; keeps every delivered request.
pub struct ScriptedGateway {
    pub script: Script,
    pub sent: RefCell<Vec<NotificationRequest>>,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<Result<HttpReply, TransportError>>) -> Self {
        Self {
            script: Script::new(replies),
            sent: RefCell::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        Self::new(vec![Ok(ack(1))])
    }
}

impl PushGateway for ScriptedGateway {
    async fn push(&self, request: &NotificationRequest) -> Result<HttpReply, TransportError> {
        self.sent.borrow_mut().push(request.clone());
        self.script.pop()
    }
}

impl RecordSource for &ScriptedSource {
    async fn query(&self, body: &QueryBody) -> Result<HttpReply, TransportError> {
        (**self).query(body).await
    }
}

impl PushGateway for &ScriptedGateway {
    async fn push(&self, request: &NotificationRequest) -> Result<HttpReply, TransportError> {
        (**self).push(request).await
    }
}

/// A 200 reply carrying a push acknowledgement.
pub fn ack(status: i64) -> HttpReply {
    HttpReply::new(200, json!({ "status": status, "request": "req-1" }).to_string())
}

/// A record whose amount is a plain number.
pub fn number_record(amount: f64) -> Value {
    json!({
        "object": "page",
        "properties": {
            "actual_money": { "id": "a1", "type": "number", "number": amount }
        }
    })
}

/// A record whose amount is a numeric formula.
pub fn formula_record(amount: f64) -> Value {
    json!({
        "object": "page",
        "properties": {
            "actual_money": {
                "id": "a1",
                "type": "formula",
                "formula": { "type": "number", "number": amount }
            }
        }
    })
}

/// A record whose formula evaluates to text.
pub fn text_formula_record(text: &str) -> Value {
    json!({
        "object": "page",
        "properties": {
            "actual_money": {
                "id": "a1",
                "type": "formula",
                "formula": { "type": "string", "string": text }
            }
        }
    })
}

/// A query page.
pub fn page(records: Vec<Value>, next_cursor: Option<&str>) -> Value {
    json!({
        "object": "list",
        "results": records,
        "has_more": next_cursor.is_some(),
        "next_cursor": next_cursor,
    })
}
