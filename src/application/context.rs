//! レイヤーコンテキスト（Application層）
//!
//! インスタンス生成から破棄までの全可変状態を1つの明示的なコンテキストに
//! まとめる。ローダープロトコルがフラットなエクスポート関数であるため
//! プロセス全体で共有される状態は避けられないが、散在したグローバルではなく
//! 単一のスロット + 単一のロックに集約する。
//!
//! # ロック規律
//! 追跡集合のMutexはlookup/insert/clearの間だけ保持し、チェーン先呼び出しを
//! またいで保持しない（チェーン先ランタイムがこのレイヤーへ再入しうるため）。

use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::ports::{PathResolver, VelocitySource};
use crate::domain::tracked::{InsertOutcome, TrackedActions};
use crate::domain::types::{classify_binding_path, ActionKey, PathKey, PATH_UNSPECIFIED};
use crate::infrastructure::chain::NextChain;
use crate::infrastructure::xr_ffi::XrInstance;

/// インスタンス毎のレイヤーコンテキスト
pub struct LayerContext {
    instance: XrInstance,
    chain: NextChain,
    /// 解決済み左手サブアクションパス（string-to-path欠落時はNone =
    /// サブアクションフィルタ無効、全ハンドに注入）
    left_hand_path: Option<PathKey>,
    /// バインディング学習前のフォールバック注入ポリシー
    fallback_before_bindings: bool,
    tracked: Mutex<TrackedActions>,
    velocity: Box<dyn VelocitySource>,
}

impl LayerContext {
    pub fn new(
        instance: XrInstance,
        chain: NextChain,
        left_hand_path: Option<PathKey>,
        velocity: Box<dyn VelocitySource>,
        fallback_before_bindings: bool,
    ) -> Self {
        Self {
            instance,
            chain,
            left_hand_path,
            fallback_before_bindings,
            tracked: Mutex::new(TrackedActions::new()),
            velocity,
        }
    }

    pub fn instance(&self) -> XrInstance {
        self.instance
    }

    pub fn chain(&self) -> &NextChain {
        &self.chain
    }

    /// ポイズンを無視して追跡状態ロックを取得する
    fn lock_tracked(&self) -> MutexGuard<'_, TrackedActions> {
        self.tracked.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 提案されたバインディング群を分類して追跡集合へ記録する
    ///
    /// パス解決（チェーン先呼び出し）はロック外で済ませてから、
    /// 1回のロックでまとめて挿入する。解決不能・空文字列のパスは
    /// 静かにスキップする。
    pub fn classify_suggested<I>(&self, resolver: &dyn PathResolver, pairs: I)
    where
        I: IntoIterator<Item = (ActionKey, PathKey)>,
    {
        // ロック外でパス解決と分類を行う
        let mut classified = Vec::new();
        for (action, binding) in pairs {
            let Some(text) = resolver.path_to_string(binding) else {
                continue;
            };
            if let Some(class) = classify_binding_path(&text) {
                tracing::info!("Tracked binding: {text} (action={action:#x})");
                classified.push((action, class));
            }
        }
        if classified.is_empty() {
            return;
        }

        let mut tracked = self.lock_tracked();
        for (action, class) in classified {
            if tracked.record(class, action) == InsertOutcome::Dropped {
                // 容量超過はドキュメント化された制限（障害ではない）
                tracing::warn!("Tracked action set full; dropping action {action:#x}");
            }
        }
    }

    /// サブアクションパスが注入を許すか
    ///
    /// 未指定（XR_NULL_PATH）または解決済み左手パスのみ許可。
    /// 左手パスが未解決の場合はフィルタ自体が無効（常に許可）。
    fn subaction_allows(&self, subaction: PathKey) -> bool {
        if subaction == PATH_UNSPECIFIED {
            return true;
        }
        match self.left_hand_path {
            Some(left) => subaction == left,
            None => true,
        }
    }

    /// Vector2fクエリへの注入速度を決定する
    ///
    /// # Returns
    /// - `Some(velocity)`: Y成分へ加算すべき速度
    /// - `None`: 注入しない（パススルー）
    pub fn vector2f_injection(&self, action: ActionKey, subaction: PathKey) -> Option<f32> {
        if !self.subaction_allows(subaction) {
            return None;
        }
        let velocity = self.velocity.read_velocity();
        if velocity == 0.0 {
            return None;
        }
        let tracked = self.lock_tracked();
        let inject = tracked.vector.contains(action)
            || (!tracked.bindings_received && self.fallback_before_bindings);
        drop(tracked);
        inject.then_some(velocity)
    }

    /// Floatクエリへの注入速度を決定する
    ///
    /// Y軸バインディングとして分類済みのアクションのみ対象。
    /// フォールバックは適用しない（単独のfloat軸はY軸バインディングの
    /// 学習なしには曖昧なため）。
    pub fn float_injection(&self, action: ActionKey, subaction: PathKey) -> Option<f32> {
        if !self.subaction_allows(subaction) {
            return None;
        }
        let velocity = self.velocity.read_velocity();
        if velocity == 0.0 {
            return None;
        }
        let tracked = self.lock_tracked();
        let inject = tracked.scalar_y.contains(action);
        drop(tracked);
        inject.then_some(velocity)
    }

    /// destroy時の完全リセット
    ///
    /// 速度チャネルを閉じ、追跡集合とbindings_receivedフラグを初期化する。
    /// 同一プロセス内で後続のcreateが来た場合、再びフォールバック注入から
    /// 始まる。
    pub fn reset(&self) {
        self.velocity.close();
        self.lock_tracked().reset();
    }
}

// ─── プロセスグローバルのコンテキストスロット ──────────────

static CONTEXT: Mutex<Option<Arc<LayerContext>>> = Mutex::new(None);

fn lock_slot() -> MutexGuard<'static, Option<Arc<LayerContext>>> {
    CONTEXT.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 生成済みコンテキストをグローバルスロットへ設置する
pub fn install_context(context: Arc<LayerContext>) {
    *lock_slot() = Some(context);
}

/// 現在のコンテキストを取得する（Arcクローン、ロックは即時解放）
pub fn current_context() -> Option<Arc<LayerContext>> {
    lock_slot().clone()
}

/// コンテキストをスロットから取り外す（destroy時）
pub fn take_context() -> Option<Arc<LayerContext>> {
    lock_slot().take()
}
