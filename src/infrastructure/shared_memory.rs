//! 共有メモリ速度チャネルアダプタ
//!
//! 外部プロデューサ（コンパニオンアプリ）が名前付きファイルマッピングで
//! 公開する8バイトの速度レコードを読み取り専用でマップする。
//!
//! # 接続ポリシー
//! - オープンは遅延実行。プロデューサ未起動は正常状態であり、
//!   失敗してもクールダウン経過後に再試行するのみ。
//! - マッピングは明示的にclose()されるまで最大1回だけ開かれる。
//! - すべての操作は非ブロッキングかつ有界（レンダリングスレッドから呼ばれる）。

use std::sync::Mutex;
use std::time::{Duration, Instant};

use windows::core::HSTRING;
use windows::Win32::Foundation::{CloseHandle, BOOL, HANDLE};
use windows::Win32::System::Memory::{
    MapViewOfFile, OpenFileMappingW, UnmapViewOfFile, FILE_MAP_READ,
    MEMORY_MAPPED_VIEW_ADDRESS,
};

use crate::domain::channel::ReopenGate;
use crate::domain::ports::VelocitySource;
use crate::domain::types::VelocityRecord;

/// 開かれたマッピング（ハンドル + ビュー）
struct Mapping {
    handle: HANDLE,
    view: MEMORY_MAPPED_VIEW_ADDRESS,
}

// ビューは読み取り専用で、アクセスは常にMutex越し
unsafe impl Send for Mapping {}

/// チャネル接続状態
struct ChannelState {
    mapping: Option<Mapping>,
    gate: ReopenGate,
}

/// 共有メモリ速度チャネル
pub struct SharedMemoryVelocitySource {
    name: HSTRING,
    state: Mutex<ChannelState>,
}

impl SharedMemoryVelocitySource {
    /// 新しいチャネルアダプタを作成（この時点ではまだ開かない）
    ///
    /// # Arguments
    /// - `name`: ファイルマッピングの公開名（プロデューサ側と一致させる）
    /// - `cooldown`: オープン失敗後の再試行クールダウン
    pub fn new(name: &str, cooldown: Duration) -> Self {
        Self {
            name: HSTRING::from(name),
            state: Mutex::new(ChannelState {
                mapping: None,
                gate: ReopenGate::new(cooldown),
            }),
        }
    }

    /// インスタンス生成時の即時オープン試行（非致命）
    pub fn open_now(&self) {
        let mut state = self.lock_state();
        if state.gate.should_attempt(Instant::now()) {
            self.try_open(&mut state);
        }
    }

    /// ポイズンを無視して状態ロックを取得する
    ///
    /// ホストスレッドのパニックでポイズンされても読み取りは続行可能。
    fn lock_state(&self) -> std::sync::MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_open(&self, state: &mut ChannelState) {
        if state.mapping.is_some() {
            return;
        }
        let handle = match unsafe { OpenFileMappingW(FILE_MAP_READ.0, BOOL::from(false), &self.name) } {
            Ok(handle) => handle,
            Err(_) => {
                // プロデューサ未起動は正常状態
                tracing::debug!("Velocity channel not available (producer not running?)");
                return;
            }
        };
        let view = unsafe {
            MapViewOfFile(
                handle,
                FILE_MAP_READ,
                0,
                0,
                std::mem::size_of::<VelocityRecord>(),
            )
        };
        if view.Value.is_null() {
            tracing::warn!("MapViewOfFile failed for velocity channel");
            let _ = unsafe { CloseHandle(handle) };
            return;
        }
        tracing::info!("Velocity channel mapped");
        state.mapping = Some(Mapping { handle, view });
        state.gate.mark_open();
    }

    fn close_mapping(state: &mut ChannelState) {
        if let Some(mapping) = state.mapping.take() {
            let _ = unsafe { UnmapViewOfFile(mapping.view) };
            let _ = unsafe { CloseHandle(mapping.handle) };
            state.gate.mark_closed();
            tracing::info!("Velocity channel closed");
        }
    }
}

impl VelocitySource for SharedMemoryVelocitySource {
    fn read_velocity(&self) -> f32 {
        let mut state = self.lock_state();

        // クールダウン経過時のみ再オープンを試行（ゲートが抑制する）
        if state.mapping.is_none() && state.gate.should_attempt(Instant::now()) {
            self.try_open(&mut state);
        }

        match &state.mapping {
            Some(mapping) => {
                // プロデューサが並行更新するためvolatile読み取り
                let record =
                    unsafe { (mapping.view.Value as *const VelocityRecord).read_volatile() };
                record.effective_velocity()
            }
            None => 0.0,
        }
    }

    fn close(&self) {
        let mut state = self.lock_state();
        Self::close_mapping(&mut state);
    }
}

impl Drop for SharedMemoryVelocitySource {
    fn drop(&mut self) {
        let mut state = self.lock_state();
        Self::close_mapping(&mut state);
    }
}
