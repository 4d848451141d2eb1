//! コア型定義
//!
//! Domain層の中心となるデータ構造と純粋ロジック。
//! バインディングパスの分類と速度注入の数値計算はすべてここに集約し、
//! FFI境界（infrastructure層）から独立してテストできるようにする。

/// アクションハンドルの不透明キー
///
/// OpenXRのXrActionハンドル値をポインタ幅の整数として扱う。
/// レイヤーはハンドルの中身を一切解釈しない。
pub type ActionKey = u64;

/// パスハンドルの不透明キー（XrPath相当）
pub type PathKey = u64;

/// 「サブアクション未指定」を表すパスキー（XR_NULL_PATH相当）
pub const PATH_UNSPECIFIED: PathKey = 0;

/// 左手サブアクションパスの正規文字列
pub const LEFT_HAND_PATH: &str = "/user/hand/left";

/// バインディングパスの分類結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingClass {
    /// 2軸サムスティック全体へのバインディング（Vector2fクエリ対象）
    Vector,
    /// サムスティックY軸単体へのバインディング（Floatクエリ対象）
    ScalarY,
}

/// バインディングパス文字列を分類する
///
/// 候補条件: 左手パスセグメントと "thumbstick" の両方を含むこと。
/// 候補のうち、Yサブコンポーネントを指すものは `ScalarY`、
/// Xサブコンポーネントを指さないもの（= 2Dコントロール全体）は `Vector`。
/// Xのみを指すパスは対象外（X軸に速度を注入する意味がないため）。
///
/// # Returns
/// - `Some(BindingClass)`: 追跡対象
/// - `None`: 追跡対象外（右手・サムスティック以外・X軸単体）
pub fn classify_binding_path(path: &str) -> Option<BindingClass> {
    if !path.contains(LEFT_HAND_PATH) || !path.contains("thumbstick") {
        return None;
    }
    if path.contains("thumbstick/y") {
        Some(BindingClass::ScalarY)
    } else if path.contains("thumbstick/x") {
        None
    } else {
        Some(BindingClass::Vector)
    }
}

/// 速度を軸値に加算し、クエリの自然レンジ [-1, 1] にクランプする
///
/// 注入値は必ずクランプしてからホストへ返す。ランタイム由来の
/// 元値がレンジ外でも、結果は常にレンジ内に収まる。
#[inline]
pub fn inject_axis(current: f32, velocity: f32) -> f32 {
    (current + velocity).clamp(-1.0, 1.0)
}

/// 共有速度レコード（外部プロデューサが公開する8バイト固定レイアウト）
///
/// リトルエンディアンのIEEE-754 float（速度、慣例的に[-1,1]）に続いて
/// 4バイトの符号なし整数（activeフラグ）。このレイヤーからは読み取り専用。
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VelocityRecord {
    /// 正規化済み速度
    pub velocity: f32,
    /// 非ゼロならプロデューサが送信中
    pub active: u32,
}

impl VelocityRecord {
    /// activeフラグが立っている場合のみ速度を返す
    #[inline]
    pub fn effective_velocity(&self) -> f32 {
        if self.active != 0 {
            self.velocity
        } else {
            0.0
        }
    }
}

// レコードは外部プロトコルの8バイト固定
const _: () = assert!(std::mem::size_of::<VelocityRecord>() == 8);
