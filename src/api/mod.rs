//! HTTP surface: the server-rendered chat page and a small JSON API.

mod chat;
mod page;
mod routes;
pub mod session_store;
pub mod types;

pub use chat::SESSION_COOKIE;
pub use page::render_page;
pub use routes::{router, serve, AppState};
