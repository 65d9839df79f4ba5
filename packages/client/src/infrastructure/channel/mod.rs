//! BroadcastChannel 実装
//!
//! - `websocket`: Tandem room server に WebSocket で接続する実装
//! - `memory`: 同一プロセス内のハブを使う実装（組み込み・テスト用）

pub mod memory;
pub mod websocket;

pub use memory::{InMemoryChannel, InMemoryHub};
pub use websocket::WebSocketChannel;
