//! 設定管理
//!
//! TOML設定ファイルの読み込みとDomain型への変換。
//!
//! レイヤーは任意のホストプロセス内で動くため、設定は常にベストエフォート:
//! ファイルが無い・壊れている場合はコンパイル時デフォルトで動作を続行し、
//! ホスト呼び出しを失敗させることは決してない。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{LayerError, LayerResult};

/// 共有メモリレコードの既定の公開名
pub const DEFAULT_SHARED_MEMORY_NAME: &str = "TreadmillDriverVelocity";

/// チャネル再接続クールダウンの既定値（ミリ秒）
pub const DEFAULT_REOPEN_COOLDOWN_MS: u64 = 2000;

/// レイヤー設定のルート構造
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LayerConfig {
    /// 診断ログ設定
    #[serde(default)]
    pub log: LogConfig,
    /// 速度チャネル設定
    #[serde(default)]
    pub channel: ChannelConfig,
    /// 注入ポリシー設定
    #[serde(default)]
    pub injection: InjectionConfig,
}

/// 診断ログ設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LogConfig {
    /// ログレベル（"error", "warn", "info", "debug", "trace"）
    ///
    /// デフォルト: "info"
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 速度チャネル設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChannelConfig {
    /// 共有メモリレコードの公開名
    ///
    /// プロデューサ（コンパニオンアプリ）側と一致している必要がある。
    /// デフォルト: "TreadmillDriverVelocity"
    #[serde(default = "default_shared_memory_name")]
    pub shared_memory_name: String,

    /// チャネルオープン失敗後の再試行クールダウン（ミリ秒）
    ///
    /// デフォルト: 2000ms
    #[serde(default = "default_reopen_cooldown_ms")]
    pub reopen_cooldown_ms: u64,
}

/// 注入ポリシー設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InjectionConfig {
    /// バインディング学習前のフォールバック注入
    ///
    /// trueの間、最初のバインディング分類が起きるまでは未分類の
    /// Vector2fアクション全てに注入する（ブートストラップ・ヒューリスティック）。
    /// Floatクエリには適用されない。
    /// デフォルト: true
    #[serde(default = "default_fallback_before_bindings")]
    pub fallback_before_bindings: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_shared_memory_name() -> String {
    DEFAULT_SHARED_MEMORY_NAME.to_string()
}

fn default_reopen_cooldown_ms() -> u64 {
    DEFAULT_REOPEN_COOLDOWN_MS
}

fn default_fallback_before_bindings() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            shared_memory_name: default_shared_memory_name(),
            reopen_cooldown_ms: default_reopen_cooldown_ms(),
        }
    }
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            fallback_before_bindings: default_fallback_before_bindings(),
        }
    }
}

impl LayerConfig {
    /// TOMLファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> LayerResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| LayerError::Configuration(format!("Failed to read config file: {e}")))?;
        let config: LayerConfig = toml::from_str(&content)
            .map_err(|e| LayerError::Configuration(format!("Failed to parse config file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// 既定の配置場所から設定をベストエフォートで読み込む
    ///
    /// ファイルが無い・読めない・不正な場合はデフォルト設定を返す。
    /// この関数は失敗しない。
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        match Self::from_file(&path) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                tracing::debug!("Config not loaded ({e}), using defaults");
                Self::default()
            }
        }
    }

    /// 既定の設定ファイルパス
    /// （%LOCALAPPDATA%\TreadmillDriver\OpenXRLayer\layer.toml）
    pub fn default_path() -> Option<PathBuf> {
        Some(crate::domain::config::layer_data_dir()?.join("layer.toml"))
    }

    /// 設定値の検証
    pub fn validate(&self) -> LayerResult<()> {
        if self.channel.shared_memory_name.is_empty() {
            return Err(LayerError::Configuration(
                "channel.shared_memory_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// 再接続クールダウンをDurationで取得
    pub fn reopen_cooldown(&self) -> Duration {
        Duration::from_millis(self.channel.reopen_cooldown_ms)
    }
}

/// レイヤーのデータディレクトリ
/// （%LOCALAPPDATA%\TreadmillDriver\OpenXRLayer）
pub fn layer_data_dir() -> Option<PathBuf> {
    Some(dirs::data_local_dir()?.join("TreadmillDriver").join("OpenXRLayer"))
}
