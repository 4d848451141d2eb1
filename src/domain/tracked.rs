//! 追跡アクション集合
//!
//! バインディング分類で検出したアクションハンドルを保持する固定容量集合。
//! ホストプロセス内に常駐するため、メモリフットプリントを予測可能に保つ
//! 必要があり、動的確保のコンテナは使わない。
//!
//! # 容量制限
//! 各集合は最大 `MAX_TRACKED_ACTIONS` 件。超過した挿入は静かに破棄される
//! （ログには残す）。これは仕様上のドキュメント化された制限であり障害ではない。

use crate::domain::types::{ActionKey, BindingClass};

/// 追跡可能なアクション数の上限（集合毎）
pub const MAX_TRACKED_ACTIONS: usize = 64;

/// 挿入操作の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// 新規に挿入された
    Inserted,
    /// 既に存在（集合セマンティクスにより変化なし）
    Duplicate,
    /// 容量超過により破棄された
    Dropped,
}

/// 固定容量のアクション集合
///
/// 挿入は冪等。要素の削除はclear()による全消去のみ（個別削除は不要）。
#[derive(Debug)]
pub struct BoundedActionSet {
    keys: [ActionKey; MAX_TRACKED_ACTIONS],
    len: usize,
}

impl BoundedActionSet {
    pub const fn new() -> Self {
        Self {
            keys: [0; MAX_TRACKED_ACTIONS],
            len: 0,
        }
    }

    /// キーを挿入する（冪等・容量制限付き）
    pub fn insert(&mut self, key: ActionKey) -> InsertOutcome {
        if self.contains(key) {
            return InsertOutcome::Duplicate;
        }
        if self.len >= MAX_TRACKED_ACTIONS {
            return InsertOutcome::Dropped;
        }
        self.keys[self.len] = key;
        self.len += 1;
        InsertOutcome::Inserted
    }

    pub fn contains(&self, key: ActionKey) -> bool {
        self.keys[..self.len].contains(&key)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for BoundedActionSet {
    fn default() -> Self {
        Self::new()
    }
}

/// インスタンス毎の追跡状態
///
/// 単一のMutex配下に置かれ、ロックはlookup/insert/clearの間だけ保持される。
/// チェーン先呼び出し中は決して保持しない（再入デッドロック回避）。
#[derive(Debug, Default)]
pub struct TrackedActions {
    /// 2軸サムスティック全体にバインドされたアクション
    pub vector: BoundedActionSet,
    /// サムスティックY軸単体にバインドされたアクション
    pub scalar_y: BoundedActionSet,
    /// 最初の左サムスティックバインディングを分類した時点でtrue、
    /// 以後インスタンス生存中は恒久的にtrue。
    /// falseの間はVector2fクエリへのフォールバック注入（全未分類対象）が有効。
    pub bindings_received: bool,
}

impl TrackedActions {
    pub const fn new() -> Self {
        Self {
            vector: BoundedActionSet::new(),
            scalar_y: BoundedActionSet::new(),
            bindings_received: false,
        }
    }

    /// 分類結果を対応する集合へ記録し、bindings_receivedを立てる
    pub fn record(&mut self, class: BindingClass, key: ActionKey) -> InsertOutcome {
        let outcome = match class {
            BindingClass::Vector => self.vector.insert(key),
            BindingClass::ScalarY => self.scalar_y.insert(key),
        };
        self.bindings_received = true;
        outcome
    }

    /// 全状態を初期値へ戻す（destroy時の完全リセット）
    pub fn reset(&mut self) {
        self.vector.clear();
        self.scalar_y.clear();
        self.bindings_received = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut set = BoundedActionSet::new();
        assert_eq!(set.insert(42), InsertOutcome::Inserted);
        // 同一キーの再挿入はサイズを変えない
        assert_eq!(set.insert(42), InsertOutcome::Duplicate);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_overflow_is_dropped_silently() {
        let mut set = BoundedActionSet::new();
        for i in 0..MAX_TRACKED_ACTIONS as u64 {
            assert_eq!(set.insert(i + 1), InsertOutcome::Inserted);
        }
        // 容量超過は破棄（障害にはしない）
        assert_eq!(set.insert(9999), InsertOutcome::Dropped);
        assert_eq!(set.len(), MAX_TRACKED_ACTIONS);
        assert!(!set.contains(9999));
    }

    #[test]
    fn test_clear_empties_set() {
        let mut set = BoundedActionSet::new();
        set.insert(1);
        set.insert(2);
        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains(1));
    }

    #[test]
    fn test_record_sets_bindings_received() {
        let mut tracked = TrackedActions::new();
        assert!(!tracked.bindings_received);

        tracked.record(BindingClass::Vector, 10);
        assert!(tracked.bindings_received);
        assert!(tracked.vector.contains(10));
        assert!(!tracked.scalar_y.contains(10));

        tracked.record(BindingClass::ScalarY, 11);
        assert!(tracked.scalar_y.contains(11));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut tracked = TrackedActions::new();
        tracked.record(BindingClass::Vector, 10);
        tracked.record(BindingClass::ScalarY, 11);

        tracked.reset();

        // destroy後は再びフォールバック注入の状態に戻る
        assert!(!tracked.bindings_received);
        assert!(tracked.vector.is_empty());
        assert!(tracked.scalar_y.is_empty());
    }
}
