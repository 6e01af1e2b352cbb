//! Pure parsers for the heterogeneous output formats of the engine and build
//! CLIs: per-line JSON records, human-readable sizes, absolute and relative
//! timestamps, version banners and free-text reports.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

use crate::models::engine::CacheRecord;
use crate::models::image::ImageDeleteItem;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid size '{0}'")]
    Size(String),
    #[error("invalid timestamp '{0}'")]
    Timestamp(String),
    #[error("invalid version banner '{0}'")]
    Banner(String),
    #[error("invalid JSON record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty output")]
    Empty,
}

/// Parses a human-readable size such as `512.0 MiB` into exact bytes.
/// Units are 1024-based; a bare number is taken as bytes.
pub fn byte_size(s: &str) -> Result<u64, ParseError> {
    let mut words = s.split_whitespace();
    let number: f64 = words
        .next()
        .and_then(|w| w.parse().ok())
        .ok_or_else(|| ParseError::Size(s.to_string()))?;
    let multiplier: u64 = match words.next() {
        None | Some("B") => 1,
        Some("KiB") => 1024,
        Some("MiB") => 1024 * 1024,
        Some("GiB") => 1024 * 1024 * 1024,
        Some(_) => return Err(ParseError::Size(s.to_string())),
    };
    Ok((number * multiplier as f64) as u64)
}

/// Parses the build CLI's compact size notation (`1.35MB`, `512KB`, `17B`).
/// The magnitude letter sits directly before a literal `B` suffix and scales
/// by powers of 1024.
pub fn cache_size(s: &str) -> Result<u64, ParseError> {
    let trimmed = s.trim();
    let body = trimmed
        .strip_suffix('B')
        .ok_or_else(|| ParseError::Size(s.to_string()))?;
    let (digits, multiplier): (&str, u64) = match body.chars().last() {
        Some('K') => (&body[..body.len() - 1], 1024),
        Some('M') => (&body[..body.len() - 1], 1024 * 1024),
        Some('G') => (&body[..body.len() - 1], 1024 * 1024 * 1024),
        _ => (body, 1),
    };
    let number: f64 = digits
        .parse()
        .map_err(|_| ParseError::Size(s.to_string()))?;
    Ok((number * multiplier as f64) as u64)
}

/// Parses an absolute timestamp to unix seconds. Accepts RFC 3339
/// (`2024-05-01T10:30:00Z`) and the engine's listing format
/// (`2024-05-01 10:30:00 +0000 UTC`); the trailing zone name is redundant
/// with the numeric offset and is ignored.
pub fn unix_time(s: &str) -> Result<i64, ParseError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.timestamp());
    }
    let trimmed = match s.rsplit_once(' ') {
        Some((head, zone)) if !zone.is_empty() && zone.chars().all(|c| c.is_ascii_alphabetic()) => {
            head
        }
        _ => s,
    };
    DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S %z")
        .map(|t| t.timestamp())
        .map_err(|_| ParseError::Timestamp(s.to_string()))
}

/// Parses a relative natural-language timestamp (`3 hours ago`,
/// `About a minute ago`) to unix seconds, relative to the current time.
/// Some engine commands report nothing more precise.
pub fn unix_natural(s: &str) -> Result<i64, ParseError> {
    let lower = s.trim().to_ascii_lowercase();
    let rest = lower
        .strip_suffix(" ago")
        .ok_or_else(|| ParseError::Timestamp(s.to_string()))?;
    let rest = rest.strip_prefix("about ").unwrap_or(rest);

    if rest.starts_with("less than") {
        return Ok(Utc::now().timestamp());
    }

    let (count, unit) = rest
        .split_once(' ')
        .ok_or_else(|| ParseError::Timestamp(s.to_string()))?;
    let count: i64 = match count {
        "a" | "an" => 1,
        n => n
            .parse()
            .map_err(|_| ParseError::Timestamp(s.to_string()))?,
    };
    let seconds = match unit.trim_end_matches('s') {
        "second" => 1,
        "minute" => 60,
        "hour" => 3_600,
        "day" => 86_400,
        "week" => 604_800,
        "month" => 2_592_000,
        "year" => 31_536_000,
        _ => return Err(ParseError::Timestamp(s.to_string())),
    };
    Ok(Utc::now().timestamp() - count * seconds)
}

/// Compares two dotted version strings numerically per segment. Missing
/// trailing segments count as zero, a leading `v` is ignored and a segment
/// that is not a number compares as zero. `1.4` and `1.40` are NOT equal:
/// segments are integers, so 4 < 40.
pub fn vercmp(a: &str, b: &str) -> Ordering {
    fn segments(v: &str) -> Vec<i64> {
        v.trim_start_matches('v')
            .split('.')
            .map(|s| s.parse().unwrap_or(0))
            .collect()
    }
    let left = segments(a);
    let right = segments(b);
    for i in 0..left.len().max(right.len()) {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn strip_v(version: &str) -> String {
    version.strip_prefix('v').unwrap_or(version).to_string()
}

/// Parses the engine's own banner, `nerdctl version 1.7.6`.
pub fn parse_engine_banner(banner: &str) -> Result<String, ParseError> {
    let line = first_line(banner)?;
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [_, "version", version, ..] => Ok(strip_v(version)),
        _ => Err(ParseError::Banner(line.to_string())),
    }
}

/// Parses the `<tool> <module-path> <version> <commit>` banner shared by
/// containerd and buildkitd. A banner that does not match is passed through
/// whole as the version, with no commit.
pub fn parse_module_banner(tool: &str, banner: &str) -> Result<(String, Option<String>), ParseError> {
    let line = first_line(banner)?;
    let tokens: Vec<&str> = line.splitn(4, ' ').collect();
    if tokens.len() == 4 && tokens[0] == tool {
        return Ok((strip_v(tokens[2]), Some(tokens[3].to_string())));
    }
    Ok((line.to_string(), None))
}

/// Parses the runtime banner:
/// `runc version 1.1.12\ncommit: v1.1.12-0-g51d5e94`. The short hash after
/// the last `-g` delimiter is preferred over the full commit string.
pub fn parse_runtime_banner(banner: &str) -> Result<(String, Option<String>), ParseError> {
    let version = parse_engine_banner(banner)?;
    let commit = banner
        .lines()
        .find_map(|line| line.strip_prefix("commit:"))
        .map(|c| c.trim())
        .map(|c| match c.rfind("-g") {
            Some(i) => c[i + 2..].to_string(),
            None => c.to_string(),
        });
    Ok((version, commit))
}

/// Parses the init-process banner, `tini version 0.19.0 - git.de40ad0`.
pub fn parse_init_banner(banner: &str) -> Result<(String, Option<String>), ParseError> {
    let line = first_line(banner)?;
    let (head, tail) = match line.split_once(" - ") {
        Some((head, tail)) => (head, Some(tail)),
        None => (line, None),
    };
    let version = parse_engine_banner(head)?;
    let commit = tail
        .and_then(|t| t.strip_prefix("git."))
        .map(|c| c.to_string());
    Ok((version, commit))
}

fn first_line(s: &str) -> Result<&str, ParseError> {
    s.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or(ParseError::Empty)
}

/// Parses listing output where each non-empty line is one JSON record.
pub fn json_lines<T: DeserializeOwned>(blob: &str) -> Result<Vec<T>, ParseError> {
    blob.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(ParseError::Json))
        .collect()
}

/// Parses inspect output, which is either a pretty-printed JSON array, a
/// single object, or one object per line depending on the command. Returns
/// the first record, or `None` when the output holds no record.
pub fn parse_inspect_json(blob: &[u8]) -> Result<Option<Value>, ParseError> {
    let text = String::from_utf8_lossy(blob);
    let value: Value = match serde_json::from_str(text.trim()) {
        Ok(value) => value,
        Err(_) => {
            let first = text
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .ok_or(ParseError::Empty)?;
            serde_json::from_str(first)?
        }
    };
    Ok(match value {
        Value::Array(mut records) => {
            if records.is_empty() {
                None
            } else {
                Some(records.remove(0))
            }
        }
        Value::Null => None,
        record => Some(record),
    })
}

/// Scans `rmi` output for `Untagged:` / `Deleted:` lines.
pub fn parse_removal_lines(blob: &str) -> Vec<ImageDeleteItem> {
    blob.lines()
        .filter_map(|line| {
            if let Some(name) = line.strip_prefix("Untagged:") {
                Some(ImageDeleteItem::Untagged(name.trim().to_string()))
            } else {
                line.strip_prefix("Deleted:")
                    .map(|id| ImageDeleteItem::Deleted(id.trim().to_string()))
            }
        })
        .collect()
}

/// Parses the build CLI's verbose cache-usage report. Records are groups of
/// `Key: value` lines; a blank line or the `Total:` trailer ends a record.
pub fn parse_cache_report(blob: &str) -> Result<Vec<CacheRecord>, ParseError> {
    let mut records = Vec::new();
    let mut current = CacheRecord::default();

    let mut flush = |current: &mut CacheRecord| {
        if !current.id.is_empty() {
            records.push(std::mem::take(current));
        } else {
            *current = CacheRecord::default();
        }
    };

    for line in blob.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            flush(&mut current);
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Total" => break,
            "ID" => {
                // A new ID without a separating blank line starts a record.
                if !current.id.is_empty() {
                    flush(&mut current);
                }
                current.id = value.to_string();
            }
            "Parent" => current.parent = Some(value.to_string()),
            "Type" => current.record_type = value.to_string(),
            "Size" => current.size = cache_size(value)?,
            "Shared" => current.shared = value == "true",
            "Reclaimable" => current.reclaimable = value == "true",
            "Description" => current.description = Some(value.to_string()),
            _ => {}
        }
    }
    flush(&mut current);
    Ok(records)
}
