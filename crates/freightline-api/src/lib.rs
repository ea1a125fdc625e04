// freightline-api: Async HTTP + WebSocket client for the marketplace notification endpoints

pub mod error;
pub mod models;
pub mod push;
pub mod rest;
pub mod transport;
pub mod websocket;

pub use error::Error;
pub use models::{NotificationRecord, PushEvent, RecordId};
pub use push::{PushConnection, PushTransport};
pub use rest::RestClient;
pub use transport::{TlsMode, TransportConfig};
pub use websocket::{WsConnection, WsTransport};
