use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_ODOO_URL: &str = "https://www.test.odoo.com";

/// 環境変数から読み込む設定。
///
///  - `ODOO_URL`: OdooのURL
///  - `ODOO_SESSION_ID`: ブラウザでログインした際の`session_id`クッキー
///  - `ODOO_TIMERS_STATE`: タイマーを保存するファイルのパス
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub odoo_url: String,
    pub session_id: Option<String>,
    pub state_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// `lookup`で取得した値から設定を組み立てる。空文字は未設定として扱う。
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let state_path = match get("ODOO_TIMERS_STATE") {
            Some(path) => PathBuf::from(path),
            None => dirs::data_dir()
                .context("Cannot determine data directory, set ODOO_TIMERS_STATE")?
                .join("odoo-timers")
                .join("state.json"),
        };

        Ok(Self {
            odoo_url: get("ODOO_URL").unwrap_or_else(|| DEFAULT_ODOO_URL.to_string()),
            session_id: get("ODOO_SESSION_ID"),
            state_path,
        })
    }

    /// Odooと通信するコマンドで使う。未設定の場合はエラーを返す。
    pub fn require_session_id(&self) -> Result<&str> {
        self.session_id
            .as_deref()
            .context("ODOO_SESSION_ID must be set")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::Config;

    #[test]
    fn test_from_lookup() {
        let vars = HashMap::from([
            ("ODOO_URL", "https://erp.example.com"),
            ("ODOO_SESSION_ID", "abc"),
            ("ODOO_TIMERS_STATE", "/tmp/timers.json"),
        ]);

        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(
            config,
            Config {
                odoo_url: "https://erp.example.com".to_string(),
                session_id: Some("abc".to_string()),
                state_path: PathBuf::from("/tmp/timers.json"),
            }
        );
    }

    /// 空の値は未設定として扱い、既定値を使う。
    #[test]
    fn test_from_lookup_defaults() {
        let vars = HashMap::from([("ODOO_SESSION_ID", " "), ("ODOO_TIMERS_STATE", "state.json")]);

        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.odoo_url, "https://www.test.odoo.com");
        assert_eq!(config.session_id, None);
        assert!(config.require_session_id().is_err());
    }
}
