//! モック速度チャネルアダプタ
//!
//! テスト・開発用のVelocitySourceモック実装。
//! 共有メモリの代わりにインメモリのレコードを読む。

use std::sync::Mutex;

use crate::domain::ports::VelocitySource;
use crate::domain::types::VelocityRecord;

/// モック速度チャネル
pub struct MockVelocityAdapter {
    record: Mutex<VelocityRecord>,
    closed: Mutex<bool>,
}

impl MockVelocityAdapter {
    /// activeな速度値で作成
    pub fn with_velocity(velocity: f32) -> Self {
        Self {
            record: Mutex::new(VelocityRecord { velocity, active: 1 }),
            closed: Mutex::new(false),
        }
    }

    /// 停止状態（active = 0）で作成
    pub fn inactive(velocity: f32) -> Self {
        Self {
            record: Mutex::new(VelocityRecord { velocity, active: 0 }),
            closed: Mutex::new(false),
        }
    }

    /// レコードを更新する（プロデューサ側の書き込み相当）
    pub fn set_record(&self, velocity: f32, active: bool) {
        let mut record = self.record.lock().unwrap_or_else(|p| p.into_inner());
        record.velocity = velocity;
        record.active = if active { 1 } else { 0 };
    }

    /// close()が呼ばれたか
    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for MockVelocityAdapter {
    fn default() -> Self {
        Self::with_velocity(0.0)
    }
}

impl VelocitySource for MockVelocityAdapter {
    fn read_velocity(&self) -> f32 {
        if self.is_closed() {
            return 0.0;
        }
        let record = self.record.lock().unwrap_or_else(|p| p.into_inner());
        record.effective_velocity()
    }

    fn close(&self) {
        *self.closed.lock().unwrap_or_else(|p| p.into_inner()) = true;
    }
}
