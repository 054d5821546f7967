//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_parse() {
        let error = Error::Parse("サイズ指定が不正です".to_string());
        assert_eq!(format!("{}", error), "Parse error: サイズ指定が不正です");
    }

    #[test]
    fn test_error_display_config() {
        let error = Error::Config("不明なプロンプト形式".to_string());
        assert_eq!(format!("{}", error), "Config error: 不明なプロンプト形式");
    }

    #[test]
    fn test_error_debug() {
        let error = Error::Config("テスト".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("Config"));
        assert!(debug.contains("テスト"));
    }
}
