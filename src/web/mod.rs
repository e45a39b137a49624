//! Minimal HTTP front end: chat page, `POST /chat` and `POST /teach`.

mod api;
mod error;
mod handlers;
mod server;

pub use api::*;
pub use error::ServerError;
pub use handlers::{get_index, post_chat, post_teach, AppState, INDEX_HTML};
pub use server::ChatServer;
