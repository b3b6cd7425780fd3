pub mod health;
pub mod messages;

use actix_web::web;

/// Route table, shared by the binary and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route(
                "/servers/{server_id}/channels/{channel_id}/messages",
                web::get().to(messages::list_messages),
            )
            .route(
                "/servers/{server_id}/channels/{channel_id}/messages",
                web::post().to(messages::post_message),
            )
            .route("/messages/{id}", web::patch().to(messages::edit_message))
            .route("/messages/{id}", web::delete().to(messages::delete_message))
            .route("/health", web::get().to(health::health)),
    );
}
