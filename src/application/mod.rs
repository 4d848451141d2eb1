//! Application層: レイヤー本体
//!
//! ローダー交渉・チェーン構築・ディスパッチと、インスタンス毎の
//! コンテキストライフサイクルを担う。

pub mod context;
pub mod dispatch;
pub mod negotiation;
