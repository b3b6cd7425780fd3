//! Per-channel broadcast hub. One actor owns the session registry and the
//! channel rooms; publishes fan out to each joined session with `do_send`,
//! so a slow or dead subscriber never stalls the publisher. Events are not
//! replayed: a session that joins after a publish has missed it and catches
//! up via a page fetch.
//!
//! FIFO per channel holds for events published by this process: the hub's
//! mailbox serializes `Publish` messages and each session's mailbox
//! preserves delivery order.

use actix::{Actor, Context, Handler, Message, Recipient};
use std::collections::{HashMap, HashSet};

use crate::models::MessageEvent;

/// Serialized event pushed down one websocket session.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct Outbound {
    pub payload: String,
}

#[derive(Message)]
#[rtype(result = "usize")]
pub struct Connect {
    pub addr: Recipient<Outbound>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub session_id: usize,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Join {
    pub session_id: usize,
    pub channel_id: String,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Leave {
    pub session_id: usize,
    pub channel_id: String,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Publish {
    pub event: MessageEvent,
}

pub struct BroadcastHub {
    sessions: HashMap<usize, Recipient<Outbound>>,
    rooms: HashMap<String, HashSet<usize>>,
    next_id: usize,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            rooms: HashMap::new(),
            next_id: 1,
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for BroadcastHub {
    type Context = Context<Self>;
}

impl Handler<Connect> for BroadcastHub {
    type Result = usize;
    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.sessions.insert(id, msg.addr);
        id
    }
}

impl Handler<Disconnect> for BroadcastHub {
    type Result = ();
    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        self.sessions.remove(&msg.session_id);
        for members in self.rooms.values_mut() {
            members.remove(&msg.session_id);
        }
    }
}

impl Handler<Join> for BroadcastHub {
    type Result = ();
    fn handle(&mut self, msg: Join, _: &mut Context<Self>) {
        self.rooms.entry(msg.channel_id).or_default().insert(msg.session_id);
    }
}

impl Handler<Leave> for BroadcastHub {
    type Result = ();
    // Idempotent: leaving a room you are not in is a no-op.
    fn handle(&mut self, msg: Leave, _: &mut Context<Self>) {
        if let Some(members) = self.rooms.get_mut(&msg.channel_id) {
            members.remove(&msg.session_id);
        }
    }
}

impl Handler<Publish> for BroadcastHub {
    type Result = ();
    fn handle(&mut self, msg: Publish, _: &mut Context<Self>) {
        let channel_id = msg.event.channel_id().to_string();
        let payload = match serde_json::to_string(&msg.event) {
            Ok(p) => p,
            Err(e) => {
                log::error!("failed to serialize broadcast event: {e}");
                return;
            }
        };
        if let Some(members) = self.rooms.get(&channel_id) {
            for sid in members {
                if let Some(addr) = self.sessions.get(sid) {
                    addr.do_send(Outbound { payload: payload.clone() });
                }
            }
        }
    }
}
