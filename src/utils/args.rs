//! Parsing of free-form `KEY=value` and `--flag=value` arguments

use crate::utils::errors::SeiraError;
use anyhow::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn key_value_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^=]+=.+$").expect("valid key/value regex"))
}

fn passthrough_flag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^--[\w\-]+=.+$").expect("valid flag regex"))
}

/// Split `KEY=value` arguments into a map. Values may themselves contain `=`.
pub fn parse_key_values(args: &[String]) -> Result<BTreeMap<String, String>> {
    if args.is_empty() || !args.iter().all(|arg| key_value_pattern().is_match(arg)) {
        return Err(SeiraError::invalid_key_values().into());
    }

    Ok(args
        .iter()
        .filter_map(|arg| arg.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect())
}

/// Require a non-blank key argument
pub fn require_key(key: Option<&str>) -> Result<&str> {
    match key {
        Some(k) if !k.trim().is_empty() => Ok(k),
        _ => Err(SeiraError::missing_key().into()),
    }
}

/// Whether an argument can be forwarded verbatim to gcloud (`--some-flag=value`)
pub fn is_passthrough_flag(arg: &str) -> bool {
    passthrough_flag_pattern().is_match(arg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_key_values() {
        let map = parse_key_values(&strings(&["FOO=blah", "BAR=a=b"])).unwrap();
        assert_eq!(map.get("FOO").unwrap(), "blah");
        assert_eq!(map.get("BAR").unwrap(), "a=b");
    }

    #[test]
    fn test_parse_key_values_rejects_malformed() {
        assert!(parse_key_values(&[]).is_err());
        assert!(parse_key_values(&strings(&["FOO"])).is_err());
        assert!(parse_key_values(&strings(&["FOO="])).is_err());
        assert!(parse_key_values(&strings(&["=value"])).is_err());
        assert!(parse_key_values(&strings(&["FOO=1", "BAR"])).is_err());
    }

    #[test]
    fn test_require_key() {
        assert_eq!(require_key(Some("FOO")).unwrap(), "FOO");
        assert!(require_key(Some("  ")).is_err());
        assert!(require_key(None).is_err());
    }

    #[test]
    fn test_is_passthrough_flag() {
        assert!(is_passthrough_flag("--tier=db-custom-1-3840"));
        assert!(is_passthrough_flag("--backup-start-time=01:00"));
        assert!(!is_passthrough_flag("--highly-available"));
        assert!(!is_passthrough_flag("tier=db"));
    }
}
