use actix::Actor;
use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::http::header;
use actix_web::web::Data;
use actix_web::{App, HttpServer, web};
use env_logger::Env;

use huddle::config::Config;
use huddle::db::Db;
use huddle::routes;
use huddle::ws::{self, server::BroadcastHub};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Info by default, overridable via RUST_LOG.
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cfg = Config::from_env_config();

    let db = Db::connect_and_migrate(&cfg.database_path)
        .await
        .expect("database init failed");

    let hub = BroadcastHub::new().start();
    log::info!("Starting server at {}", cfg.listen);

    let listen_addr = cfg.listen.clone();
    HttpServer::new(move || {
        let cors = Cors::permissive()
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(Data::new(cfg.clone()))
            .app_data(Data::new(db.clone()))
            .app_data(Data::new(hub.clone()))
            .configure(routes::configure)
            .route("/ws", web::get().to(ws::session::ws_route))
    })
    .bind(listen_addr)?
    .run()
    .await
}
