//! ログ・トレーシング基盤
//!
//! tracingを使用した診断ログ。レイヤーは任意のホストプロセス内で動くため
//! 標準出力は使えず、固定のユーザー毎パス
//! （%LOCALAPPDATA%\TreadmillDriver\OpenXRLayer\layer_log.txt）へ
//! 非同期ファイル出力する。
//!
//! # 設計意図
//! - ログはあくまでベストエフォート: ディレクトリ作成・オープン・書き込みの
//!   失敗はすべて握りつぶし、ホスト呼び出しを失敗させない。
//! - tracing-appenderの非同期ライター経由のため、Hot Path（フレーム毎の
//!   クエリ）からの出力もメモリコピーのみでブロックしない。

use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ログスレッドの生存を保証するガード（プロセス終了まで保持）
static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// ログシステムを初期化する（冪等・ベストエフォート）
///
/// 交渉エントリポイントから呼ばれる。2回目以降の呼び出しは何もしない。
/// いかなる失敗も呼び出し元へは伝播しない。
///
/// # Arguments
/// - `log_level`: デフォルトのログレベル（環境変数RUST_LOGが優先）
pub fn init_layer_logging(log_level: &str) {
    if GUARD.get().is_some() {
        return;
    }

    let Some(dir) = crate::domain::config::layer_data_dir() else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let file_appender = tracing_appender::rolling::never(dir, "layer_log.txt");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .try_init();

    // ホスト側が既にグローバルsubscriberを持つ場合も失敗は無視
    if result.is_ok() {
        let _ = GUARD.set(guard);
    }
}
