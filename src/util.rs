/// Utility helpers shared by the collector and the runner.
///
/// This module contains:
/// - Cell key encoding used for set membership and joins
/// - Transparent gzip-aware file readers / writers
///
/// IMPORTANT:
/// - No rule-specific logic should live here.
/// - Key encoding must remain deterministic: joins and exclusion
///   depend on two equal cells always producing the same key.
///
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde_json::Value;

/// Encode a single cell into a hashable key.
///
/// The encoding is the canonical JSON text of the value, so the
/// number `1` and the string `"1"` are distinct keys. Numbers compare
/// by value: an integral float is keyed as its integer text.
///
/// Examples:
/// - `1`        -> "1"
/// - `1.0`      -> "1"
/// - `1.5`      -> "1.5"
/// - `"1"`      -> "\"1\""
/// - `"young"`  -> "\"young\""
pub fn cell_key(value: &Value) -> String {
    match value.as_f64() {
        Some(f) if value.is_f64() && f.fract() == 0.0 && f.abs() < I64_EXACT => {
            (f as i64).to_string()
        }
        _ => value.to_string(),
    }
}

// Floats beyond this range are keyed by their JSON text
const I64_EXACT: f64 = 9_223_372_036_854_775_808.0;

/// Encode a composite join key from several cells.
///
/// Returns `None` if any part is null: null keys never take part in an
/// equi-join.
pub fn join_key(parts: &[&Value]) -> Option<String> {
    if parts.iter().any(|v| v.is_null()) {
        return None;
    }

    match parts {
        [single] => Some(cell_key(single)),
        _ => {
            let keys: Vec<String> = parts.iter().map(|v| cell_key(v)).collect();
            Some(format!("[{}]", keys.join(",")))
        }
    }
}

/// Returns true if the path carries a `.gz` suffix.
pub fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Returns the extension describing the payload format,
/// ignoring a trailing `.gz`.
///
/// Examples:
/// - "users.jsonl"    -> Some("jsonl")
/// - "users.json.gz"  -> Some("json")
pub fn payload_extension(path: &Path) -> Option<String> {
    let path = if is_gzip(path) {
        Path::new(path.file_stem()?)
    } else {
        path
    };

    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Open a file for buffered reading, decompressing `.gz` on the fly.
pub fn open_reader(path: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    if is_gzip(path) {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Create a file and hand a writer to `write`, compressing `.gz` output.
///
/// The gzip stream is finished explicitly so that trailer errors are
/// reported instead of being swallowed on drop.
pub fn with_writer<F>(path: &Path, write: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut dyn Write) -> anyhow::Result<()>,
{
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    if is_gzip(path) {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        write(&mut encoder)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        write(&mut writer)?;
        writer.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Read;

    #[test]
    fn number_and_string_keys_differ() {
        assert_ne!(cell_key(&json!(1)), cell_key(&json!("1")));
    }

    #[test]
    fn integral_floats_key_like_integers() {
        assert_eq!(cell_key(&json!(706016002.0)), cell_key(&json!(706016002)));
        assert_eq!(cell_key(&json!(-3.0)), "-3");
        assert_eq!(cell_key(&json!(2.5)), "2.5");
        assert_ne!(cell_key(&json!(1.0)), cell_key(&json!("1")));
        assert_eq!(
            join_key(&[&json!("young"), &json!(2.0)]),
            join_key(&[&json!("young"), &json!(2)])
        );
    }

    #[test]
    fn null_parts_produce_no_join_key() {
        assert_eq!(join_key(&[&json!("young"), &Value::Null]), None);
        assert!(join_key(&[&json!("young"), &json!("f")]).is_some());
    }

    #[test]
    fn composite_keys_do_not_collide_on_concatenation() {
        let a = join_key(&[&json!("a,b"), &json!("c")]);
        let b = join_key(&[&json!("a"), &json!("b,c")]);
        assert_ne!(a, b);
    }

    #[test]
    fn payload_extension_strips_gzip() {
        assert_eq!(payload_extension(Path::new("u.json.gz")).as_deref(), Some("json"));
        assert_eq!(payload_extension(Path::new("u.JSONL")).as_deref(), Some("jsonl"));
        assert_eq!(payload_extension(Path::new("u")), None);
    }

    #[test]
    fn gzip_writer_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt.gz");

        with_writer(&path, |w| {
            w.write_all(b"hello")?;
            Ok(())
        })
        .unwrap();

        let mut text = String::new();
        open_reader(&path).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello");
    }
}
