//! Domain層: レイヤーの中心ロジック
//!
//! 外部依存を持たない純粋なRust型とtrait定義。
//! Applicationから注入され、Infrastructureで実装される。

pub mod channel;
pub mod config;
pub mod error;
pub mod ports;
pub mod tracked;
pub mod types;

pub use channel::*;
pub use config::*;
pub use error::*;
pub use ports::*;
pub use tracked::*;
pub use types::*;
