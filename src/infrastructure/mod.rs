//! Infrastructure層: 外部システムアダプタ
//!
//! OpenXRのABI境界（xr_ffi / chain）、Win32共有メモリ、および
//! テスト用モック実装を提供する。

pub mod chain;
pub mod mock_runtime;
pub mod mock_velocity;
#[cfg(windows)]
pub mod shared_memory;
pub mod xr_ffi;
