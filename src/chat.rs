//! Chat session — an append-only message log over the chat collaborator,
//! with safety filtering on every assistant reply and strict turn
//! ordering.
//!
//! Turns may be pipelined: each `send` issues a sequence number, and a
//! reply is appended only after every earlier turn has settled, so
//! network jitter can never reorder the log. An abandoned turn (its
//! pending future dropped) settles as a gap instead of blocking later
//! replies.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::api::ChatApi;
use crate::models::{ChatMessage, MessageRole, Report};
use crate::safety::{ContentSafetyFilter, FlagContext, PolicyStore};

/// Shown when the reply request fails; the session stays usable.
pub const FALLBACK_REPLY: &str =
    "I'm having trouble connecting to the medical database right now.";

enum TurnOutcome {
    Reply(String),
    Abandoned,
}

struct SessionLog {
    messages: Vec<ChatMessage>,
    /// Next turn number handed out by `send`.
    next_turn: u64,
    /// Next turn number allowed to append its reply.
    next_append: u64,
    /// Settled turns waiting for their predecessors.
    settled: BTreeMap<u64, TurnOutcome>,
}

pub struct ChatSession<C: ChatApi> {
    api: Arc<C>,
    policy: Arc<PolicyStore>,
    filter: ContentSafetyFilter,
    report_id: Option<Uuid>,
    log: Mutex<SessionLog>,
}

impl<C: ChatApi> ChatSession<C> {
    pub fn new(
        api: Arc<C>,
        filter: ContentSafetyFilter,
        policy: Arc<PolicyStore>,
        report_id: Option<Uuid>,
    ) -> Self {
        Self {
            api,
            policy,
            filter,
            report_id,
            log: Mutex::new(SessionLog {
                messages: Vec::new(),
                next_turn: 0,
                next_append: 0,
                settled: BTreeMap::new(),
            }),
        }
    }

    /// Session bound to a freshly analyzed report, seeded with the
    /// assistant greeting that references its overall risk.
    pub fn open_with_report(
        api: Arc<C>,
        filter: ContentSafetyFilter,
        policy: Arc<PolicyStore>,
        report: &Report,
    ) -> Self {
        let session = Self::new(api, filter, policy, Some(report.id));
        let greeting = format!(
            "I've analyzed your report. You can ask me about your {} risk factors \
             or specific test results.",
            report.risk_summary.overall_risk
        );
        session
            .lock()
            .messages
            .push(ChatMessage::new(MessageRole::Assistant, greeting));
        session
    }

    /// Snapshot of the message log.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().messages.clone()
    }

    pub fn report_id(&self) -> Option<Uuid> {
        self.report_id
    }

    /// Append the user message synchronously and open a turn for its
    /// reply. Resolve the returned turn to perform the request; multiple
    /// turns may be in flight at once.
    pub fn send(&self, text: &str) -> (ChatMessage, PendingTurn<'_, C>) {
        let message = ChatMessage::new(MessageRole::User, text);
        let turn = {
            let mut log = self.lock();
            log.messages.push(message.clone());
            let turn = log.next_turn;
            log.next_turn += 1;
            turn
        };
        tracing::debug!(turn, "Chat turn opened");
        (
            message,
            PendingTurn {
                session: self,
                text: text.to_string(),
                turn,
                done: false,
            },
        )
    }

    /// Deliver the reply for a turn. The reply passes through the safety
    /// filter, and its display text is appended once every earlier turn
    /// has settled. Returns the messages appended by this delivery —
    /// empty when the reply is buffered behind an outstanding turn.
    /// A turn settles at most once; repeat deliveries are ignored.
    pub fn on_reply(&self, turn: u64, text: &str) -> Vec<ChatMessage> {
        if self.is_settled(turn) {
            return Vec::new();
        }

        let policy = self.policy.current();
        let evaluation = self.filter.evaluate(
            text,
            &policy,
            FlagContext::ChatTurn {
                report_id: self.report_id,
                turn,
            },
        );

        let mut log = self.lock();
        log.settled.insert(turn, TurnOutcome::Reply(evaluation.annotated));
        drain(&mut log)
    }

    fn on_abandoned(&self, turn: u64) {
        if self.is_settled(turn) {
            return;
        }
        tracing::debug!(turn, "Chat turn abandoned");
        let mut log = self.lock();
        log.settled.insert(turn, TurnOutcome::Abandoned);
        drain(&mut log);
    }

    fn is_settled(&self, turn: u64) -> bool {
        let log = self.lock();
        turn < log.next_append || log.settled.contains_key(&turn)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionLog> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Append every consecutively settled reply starting at `next_append`.
fn drain(log: &mut SessionLog) -> Vec<ChatMessage> {
    let mut appended = Vec::new();
    while let Some(outcome) = log.settled.remove(&log.next_append) {
        if let TurnOutcome::Reply(content) = outcome {
            let message = ChatMessage::new(MessageRole::Assistant, content);
            log.messages.push(message.clone());
            appended.push(message);
        }
        log.next_append += 1;
    }
    appended
}

/// One outstanding chat turn. Dropping it without resolving settles the
/// turn as a gap so later replies are not blocked.
pub struct PendingTurn<'a, C: ChatApi> {
    session: &'a ChatSession<C>,
    text: String,
    turn: u64,
    done: bool,
}

impl<C: ChatApi> PendingTurn<'_, C> {
    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Request the reply and deliver it into the session log. A transport
    /// failure degrades to the fallback notice instead of erroring the
    /// session.
    pub async fn resolve(mut self) -> Vec<ChatMessage> {
        let result = self
            .session
            .api
            .send_chat(&self.text, self.session.report_id)
            .await;
        self.done = true;

        let reply = match result {
            Ok(reply) => reply.reply,
            Err(error) => {
                tracing::warn!(turn = self.turn, error = %error, "Chat reply failed");
                FALLBACK_REPLY.to_string()
            }
        };
        self.session.on_reply(self.turn, &reply)
    }
}

impl<C: ChatApi> Drop for PendingTurn<'_, C> {
    fn drop(&mut self) {
        if !self.done {
            self.session.on_abandoned(self.turn);
        }
    }
}
