//! エラー型定義
//!
//! Domain層の統一エラー型。thiserrorを使用して型安全なエラー処理を提供します。
//!
//! # 設計方針
//! - unwrap()の使用を禁止し、明示的なエラーハンドリングを強制
//! - ホストプロセスに到達する境界ではrawなXrResultコードに変換する
//!   （このエラー型はレイヤー内部の構築パスでのみ使用）
//! - 回復可能性をエラー型で表現（ChannelUnavailable は正常系に近いソフト障害）

use thiserror::Error;

/// Domain層の統一エラー型
#[derive(Error, Debug)]
pub enum LayerError {
    /// 設定関連のエラー（ファイル読み込み・パース失敗）
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 速度チャネル（共有メモリ）関連のエラー
    ///
    /// プロデューサ未起動など、すぐに復旧しうるソフト障害。
    /// 呼び出し元の処理を失敗させてはならない。
    #[error("Velocity channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// チェーン構築関連のエラー（次レイヤーのポインタ欠落など）
    #[error("Chain initialization failed: {0}")]
    ChainInitialization(String),

    /// ログ基盤関連のエラー（常に握りつぶされる）
    #[error("Diagnostics error: {0}")]
    Diagnostics(String),
}

/// Domain層の統一Result型
pub type LayerResult<T> = Result<T, LayerError>;
