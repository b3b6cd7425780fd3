//! huddle — live messaging synchronization for a server → channel → message
//! hierarchy. The server side is the authorization guard, the durable
//! message log, the mutation API, and the per-channel broadcast hub; the
//! `sync` module holds the client-side state machines that merge pages and
//! live events into one consistent view.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod guard;
pub mod models;
pub mod routes;
pub mod store;
pub mod sync;
pub mod ws;
