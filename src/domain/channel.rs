//! 速度チャネルの再接続ゲート
//!
//! オープン試行のクールダウン制御をプラットフォーム非依存のロジックとして
//! 切り出したもの。共有メモリアダプタ（infrastructure/shared_memory.rs）が
//! 状態ロック配下で使用する。

use std::time::{Duration, Instant};

/// 再接続ゲート
///
/// - マッピング保持中は再オープンを試行しない
/// - 試行失敗後はクールダウン経過まで再試行を抑制する
#[derive(Debug)]
pub struct ReopenGate {
    cooldown: Duration,
    last_attempt: Option<Instant>,
    open: bool,
}

impl ReopenGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_attempt: None,
            open: false,
        }
    }

    /// オープンを試行してよいか判定する
    ///
    /// trueを返す場合、この時点を試行時刻として記録する
    /// （試行の成否は呼び出し元がmark_open()で報告する）。
    pub fn should_attempt(&mut self, now: Instant) -> bool {
        if self.open {
            return false;
        }
        if let Some(last) = self.last_attempt {
            if now.duration_since(last) < self.cooldown {
                return false;
            }
        }
        self.last_attempt = Some(now);
        true
    }

    /// オープン成功を記録する（以後should_attemptは常にfalse）
    pub fn mark_open(&mut self) {
        self.open = true;
    }

    /// クローズを記録する（次の試行は即時許可）
    pub fn mark_closed(&mut self) {
        self.open = false;
        self.last_attempt = None;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}
