//! Port定義（Clean Architectureのインターフェース）
//!
//! Domain層が外部実装に依存するための抽象trait。
//! Infrastructure層がこれらを実装し、Application層がDIで注入する。

use crate::domain::types::PathKey;

/// 速度チャネルポート: 外部プロデューサの速度値取得を抽象化
///
/// 実装はリアルタイムレンダリングスレッドから呼ばれる前提で、
/// ブロックせず、呼び出し元を失敗させてはならない。
pub trait VelocitySource: Send + Sync {
    /// 現在の速度を読む
    ///
    /// プロデューサ不在・チャネル未接続・activeフラグ0はいずれも正常系で、
    /// 0.0を返す。再接続試行は実装側のクールダウンで抑制される。
    fn read_velocity(&self) -> f32;

    /// チャネルを閉じてリソースを解放する（destroy時）
    ///
    /// 閉じた後のread_velocity()は再オープンを試みてよい。
    fn close(&self);
}

/// パス解決ポート: XrPathと文字列の相互変換を抽象化
///
/// 変換はチェーン先ランタイムの機能であり、解決に失敗しうる。
/// どちらの方向も欠落可能（欠落時は分類・フィルタリングが縮退する）。
pub trait PathResolver: Send + Sync {
    /// パスハンドルをテキスト表現へ変換する
    ///
    /// # Returns
    /// - `Some(String)`: 変換成功（非空）
    /// - `None`: 機能欠落・変換失敗・空文字列
    fn path_to_string(&self, path: PathKey) -> Option<String>;

    /// テキスト表現をパスハンドルへ変換する
    fn string_to_path(&self, path: &str) -> Option<PathKey>;
}
