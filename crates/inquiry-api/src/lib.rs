pub mod error;
pub mod lifecycle;
pub mod messages;
pub mod messaging;
pub mod routes;
pub mod slug;
pub mod state;
pub mod threads;
