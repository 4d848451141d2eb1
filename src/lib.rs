//! Treadmill OpenXR Implicit API Layer
//!
//! トレッドミル型ロコモーションデバイスの速度を、OpenXRアプリケーションの
//! 左サムスティック入力へ注入する暗黙APIレイヤー。
//! ローダーチェーンに割り込み、アプリケーション自身のバインディング宣言から
//! 対象アクションを受動的に学習する。
//!
//! cdylibとしてビルドされ、唯一のエクスポートは
//! `xrNegotiateLoaderApiLayerInterface`（application::dispatch）。
//! rlibターゲットはテストとtools（schema生成）のために提供される。

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod logging;
