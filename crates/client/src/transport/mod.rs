pub mod socketio;
mod websocket;

pub use websocket::{WebSocketChannel, socket_url};
