use actix::{
    Actor, ActorContext, ActorFutureExt, Addr, AsyncContext, ContextFutureSpawner, Handler,
    Running, StreamHandler, WrapFuture,
};
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_web_actors::ws;
use serde::{Deserialize, Serialize};

use super::server::{BroadcastHub, Connect, Disconnect, Join, Leave, Outbound};
use crate::{auth, config::Config};

/// Upgrade `/ws?token=…` to a websocket session. The token is the same
/// bearer token the HTTP surface takes; a bad or missing token rejects the
/// upgrade before any actor is started.
pub async fn ws_route(
    req: HttpRequest,
    stream: web::Payload,
    cfg: web::Data<Config>,
    hub: web::Data<Addr<BroadcastHub>>,
) -> Result<HttpResponse, Error> {
    let token = req
        .query_string()
        .split('&')
        .find_map(|kv| kv.split_once('='))
        .filter(|(k, _)| *k == "token")
        .map(|(_, v)| v.to_string());

    let claims = match token {
        Some(t) => auth::verify_access_token(&t, &cfg)
            .map_err(|_| actix_web::error::ErrorUnauthorized("bad token"))?,
        None => return Err(actix_web::error::ErrorUnauthorized("missing token")),
    };

    let session = WsSession {
        profile_id: claims.sub,
        session_id: 0,
        hub: hub.get_ref().clone(),
        joined: None,
    };
    ws::start(session, &req, stream)
}

pub struct WsSession {
    pub profile_id: String,
    /// Assigned by the hub on connect; 0 until registration completes.
    session_id: usize,
    hub: Addr<BroadcastHub>,
    joined: Option<String>,
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let addr = ctx.address().recipient();
        self.hub
            .send(Connect { addr })
            .into_actor(self)
            .then(|res, act, ctx| {
                match res {
                    Ok(id) => act.session_id = id,
                    // Hub gone; nothing to stream.
                    Err(_) => ctx.stop(),
                }
                actix::fut::ready(())
            })
            .wait(ctx);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        self.hub.do_send(Disconnect { session_id: self.session_id });
        Running::Stop
    }
}

impl Handler<Outbound> for WsSession {
    type Result = ();
    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.payload);
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    Join { channel_id: String },
    Leave { channel_id: String },
    Ping,
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                if let Ok(frame) = serde_json::from_str::<ClientFrame>(&text) {
                    match frame {
                        ClientFrame::Join { channel_id } => {
                            // One channel view per session; switching views
                            // implicitly leaves the previous room.
                            if let Some(prev) = self.joined.take() {
                                self.hub.do_send(Leave {
                                    session_id: self.session_id,
                                    channel_id: prev,
                                });
                            }
                            self.joined = Some(channel_id.clone());
                            self.hub.do_send(Join {
                                session_id: self.session_id,
                                channel_id,
                            });
                        }
                        ClientFrame::Leave { channel_id } => {
                            if self.joined.as_deref() == Some(&channel_id) {
                                self.joined = None;
                            }
                            self.hub.do_send(Leave {
                                session_id: self.session_id,
                                channel_id,
                            });
                        }
                        ClientFrame::Ping => {
                            ctx.text(r#"{"type":"pong"}"#);
                        }
                    }
                }
            }
            Ok(ws::Message::Ping(bytes)) => ctx.pong(&bytes),
            Ok(ws::Message::Close(_)) => ctx.stop(),
            _ => {}
        }
    }
}
