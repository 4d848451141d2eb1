//! JSON Schema + Markdown生成ツール
//!
//! src/domain/config.rsの設定構造から以下を自動生成します：
//! 1. JSON Schema (schema/layer.json)
//! 2. Markdownドキュメント (CONFIGURATION.md)
//!
//! 実行方法:
//! ```
//! cargo run --bin generate_schema
//! ```

use anyhow::{Context, Result};
use schemars::schema_for;
use serde_json::Value;
use std::fs;
use treadmill_layer::domain::config::LayerConfig;

fn main() -> Result<()> {
    println!("JSON Schema + Markdown生成中...");

    let schema = schema_for!(LayerConfig);
    let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;

    fs::create_dir_all("schema").context("Failed to create schema/ directory")?;
    fs::write("schema/layer.json", &json).context("Failed to write schema/layer.json")?;
    println!("  ✓ schema/layer.json");

    let schema_value: Value = serde_json::from_str(&json).context("Failed to parse schema")?;
    let markdown = generate_markdown(&schema_value);
    fs::write("CONFIGURATION.md", markdown).context("Failed to write CONFIGURATION.md")?;
    println!("  ✓ CONFIGURATION.md");

    println!("✅ 生成完了: schema/layer.json + CONFIGURATION.md");
    Ok(())
}

/// JSON Schemaからマークダウンドキュメントを生成
fn generate_markdown(schema: &Value) -> String {
    let mut md = String::new();

    md.push_str("# 設定リファレンス (Configuration Reference)\n\n");
    md.push_str("layer.toml（%LOCALAPPDATA%\\TreadmillDriver\\OpenXRLayer\\layer.toml）\n");
    md.push_str("の設定項目。ファイルが無い場合はすべてデフォルト値で動作します。\n\n");

    if let Some(defs) = schema.get("$defs").and_then(|d| d.as_object()) {
        for (name, def) in defs {
            md.push_str(&format!("## {name}\n\n"));
            if let Some(desc) = def.get("description").and_then(|d| d.as_str()) {
                md.push_str(desc);
                md.push_str("\n\n");
            }
            if let Some(props) = def.get("properties").and_then(|p| p.as_object()) {
                md.push_str("| キー | 型 | 説明 |\n|---|---|---|\n");
                for (key, prop) in props {
                    let ty = prop
                        .get("type")
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "object".to_string());
                    let desc = prop
                        .get("description")
                        .and_then(|d| d.as_str())
                        .unwrap_or("")
                        .replace('\n', " ");
                    md.push_str(&format!("| `{key}` | {ty} | {desc} |\n"));
                }
                md.push('\n');
            }
        }
    }

    md
}
