//! REPL command parsing.

use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

/// One line of REPL input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Edit { field: String, value: Value },
    Cursor { x: f64, y: f64, field: Option<String> },
    Lock(String),
    Unlock(String),
    Who,
    Fields,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type 'help' for commands.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        match name {
            "edit" => {
                let (field, raw) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(CommandError::Usage("edit <field> <value>"))?;
                let raw = raw.trim();
                // JSON として読めない値は文字列として送る
                let value =
                    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
                Ok(Command::Edit {
                    field: field.to_string(),
                    value,
                })
            }
            "cursor" => {
                const USAGE: &str = "cursor <x> <y> [field]";
                let mut args = rest.split_whitespace();
                let x = parse_coordinate(args.next(), USAGE)?;
                let y = parse_coordinate(args.next(), USAGE)?;
                let field = args.next().map(str::to_string);
                if args.next().is_some() {
                    return Err(CommandError::Usage(USAGE));
                }
                Ok(Command::Cursor { x, y, field })
            }
            "lock" => single_field(rest, "lock <field>").map(Command::Lock),
            "unlock" => single_field(rest, "unlock <field>").map(Command::Unlock),
            "who" => Ok(Command::Who),
            "fields" => Ok(Command::Fields),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_coordinate(arg: Option<&str>, usage: &'static str) -> Result<f64, CommandError> {
    arg.and_then(|a| a.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or(CommandError::Usage(usage))
}

fn single_field(rest: &str, usage: &'static str) -> Result<String, CommandError> {
    if rest.is_empty() || rest.contains(char::is_whitespace) {
        return Err(CommandError::Usage(usage));
    }
    Ok(rest.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_edit_with_json_value() {
        // テスト項目: edit コマンドの値が JSON として解釈される
        // given (前提条件):
        let line = "edit price 100";

        // when (操作):
        let result = line.parse::<Command>();

        // then (期待する結果):
        assert_eq!(
            result,
            Ok(Command::Edit {
                field: "price".to_string(),
                value: json!(100),
            })
        );
    }

    #[test]
    fn test_parse_edit_with_text_value() {
        // テスト項目: JSON として読めない値は空白を含めて文字列として扱われる
        // given (前提条件):
        let line = "edit name  Acme Corp ";

        // when (操作):
        let result = line.parse::<Command>();

        // then (期待する結果):
        assert_eq!(
            result,
            Ok(Command::Edit {
                field: "name".to_string(),
                value: json!("Acme Corp"),
            })
        );
    }

    #[test]
    fn test_parse_edit_without_value_is_usage_error() {
        // テスト項目: 値のない edit は使い方のエラーになる
        // given (前提条件):
        let line = "edit price";

        // when (操作):
        let result = line.parse::<Command>();

        // then (期待する結果):
        assert_eq!(result, Err(CommandError::Usage("edit <field> <value>")));
    }

    #[test]
    fn test_parse_cursor_with_optional_field() {
        // テスト項目: cursor コマンドはフィールドを省略できる
        // given (前提条件):
        let with_field = "cursor 10 20.5 price";
        let without_field = "cursor 1 2";

        // when (操作):
        let with_field = with_field.parse::<Command>();
        let without_field = without_field.parse::<Command>();

        // then (期待する結果):
        assert_eq!(
            with_field,
            Ok(Command::Cursor {
                x: 10.0,
                y: 20.5,
                field: Some("price".to_string()),
            })
        );
        assert_eq!(
            without_field,
            Ok(Command::Cursor {
                x: 1.0,
                y: 2.0,
                field: None,
            })
        );
    }

    #[test]
    fn test_parse_cursor_rejects_non_numbers() {
        // テスト項目: 数値でない座標は使い方のエラーになる
        // given (前提条件):
        let lines = ["cursor x 1", "cursor 1", "cursor NaN 1", "cursor 1 2 a b"];

        // when (操作):
        let results: Vec<_> = lines.iter().map(|l| l.parse::<Command>()).collect();

        // then (期待する結果):
        assert!(results.iter().all(|r| matches!(r, Err(CommandError::Usage(_)))));
    }

    #[test]
    fn test_parse_lock_and_unlock() {
        // テスト項目: lock / unlock はフィールドを 1 つだけ受け取る
        // given (前提条件):
        let lock = "lock name";
        let unlock = "unlock name";
        let missing = "lock";

        // when (操作):
        let lock = lock.parse::<Command>();
        let unlock = unlock.parse::<Command>();
        let missing = missing.parse::<Command>();

        // then (期待する結果):
        assert_eq!(lock, Ok(Command::Lock("name".to_string())));
        assert_eq!(unlock, Ok(Command::Unlock("name".to_string())));
        assert_eq!(missing, Err(CommandError::Usage("lock <field>")));
    }

    #[test]
    fn test_parse_keywords_and_unknown() {
        // テスト項目: 引数のないコマンドと未知のコマンドが判別される
        // given (前提条件):
        let lines = ["who", "fields", "help", "quit", "exit", "dance"];

        // when (操作):
        let results: Vec<_> = lines.iter().map(|l| l.parse::<Command>()).collect();

        // then (期待する結果):
        assert_eq!(
            results,
            vec![
                Ok(Command::Who),
                Ok(Command::Fields),
                Ok(Command::Help),
                Ok(Command::Quit),
                Ok(Command::Quit),
                Err(CommandError::Unknown("dance".to_string())),
            ]
        );
    }
}
