//! The on-card settings file: a flat, ordered list of `KEY = value`
//! declarations.
//!
//! Parsing is deliberately forgiving. The file may have been edited by
//! hand on any machine the card was plugged into, so each malformed line
//! is skipped and counted instead of failing the whole read. Rewriting
//! keeps the surviving declarations in their original order.

use core::fmt::Write;

use heapless::{String, Vec};

/// Maximum declarations a settings file may hold.
pub const MAX_ENTRIES: usize = 16;
/// Maximum key length in bytes.
pub const MAX_KEY_LEN: usize = 32;
/// Maximum string-value length in bytes.
pub const MAX_VALUE_LEN: usize = 64;

/// A parsed settings value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Double-quoted string (stored unquoted).
    Str(String<MAX_VALUE_LEN>),
    /// Bare integer.
    Int(i64),
}

impl Value {
    /// The string contents, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            Value::Int(_) => None,
        }
    }
}

/// Errors from mutating or rendering a settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The declaration table is full.
    TooManyEntries,
    /// Key exceeds [`MAX_KEY_LEN`].
    KeyTooLong,
    /// String value exceeds [`MAX_VALUE_LEN`].
    ValueTooLong,
    /// The render target filled up.
    BufferFull,
}

/// One `KEY = value` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String<MAX_KEY_LEN>,
    pub value: Value,
}

/// An ordered `KEY = value` mapping with tolerant line-by-line parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsFile {
    entries: Vec<Entry, MAX_ENTRIES>,
}

impl SettingsFile {
    /// An empty file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` line by line.
    ///
    /// Returns the file plus the number of lines that were dropped:
    /// malformed lines, and well-formed ones that no longer fit the
    /// table. Blank lines and `#` comments are not counted.
    pub fn parse(text: &str) -> (Self, usize) {
        let mut file = Self::new();
        let mut skipped = 0;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_line(line) {
                Some((key, value)) if file.set(key, value.clone()).is_ok() => {}
                _ => skipped += 1,
            }
        }
        (file, skipped)
    }

    /// Number of declarations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the file holds no declarations.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The declarations in file order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    /// Look up a key's string contents.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Insert or replace a declaration.
    ///
    /// An existing key keeps its position; a new key appends at the end,
    /// so a rewrite preserves the file's shape.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), ConfigError> {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.key == key) {
            entry.value = value;
            return Ok(());
        }
        let key = String::try_from(key).map_err(|_| ConfigError::KeyTooLong)?;
        self.entries
            .push(Entry { key, value })
            .map_err(|_| ConfigError::TooManyEntries)
    }

    /// Insert or replace a string declaration.
    pub fn set_str(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = String::try_from(value).map_err(|_| ConfigError::ValueTooLong)?;
        self.set(key, Value::Str(value))
    }

    /// Render every declaration as one `KEY = value` line, replacing
    /// whatever `out` held.
    pub fn render<const N: usize>(&self, out: &mut String<N>) -> Result<(), ConfigError> {
        out.clear();
        for entry in &self.entries {
            match &entry.value {
                Value::Str(s) => writeln!(out, "{} = \"{}\"", entry.key, s),
                Value::Int(n) => writeln!(out, "{} = {}", entry.key, n),
            }
            .map_err(|_| ConfigError::BufferFull)?;
        }
        Ok(())
    }
}

/// One trimmed, non-comment line. `None` means malformed: bad key
/// characters, an unterminated or over-long string, or a value that is
/// neither quoted nor an integer.
fn parse_line(line: &str) -> Option<(&str, Value)> {
    let (key, rest) = line.split_once('=')?;
    let key = key.trim_end();
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return None;
    }
    let rest = rest.trim_start();
    if let Some(body) = rest.strip_prefix('"') {
        let inner = body.strip_suffix('"')?;
        if inner.contains('"') {
            return None;
        }
        let value = String::try_from(inner).ok()?;
        Some((key, Value::Str(value)))
    } else {
        rest.parse::<i64>().ok().map(|n| (key, Value::Int(n)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# board settings
WEB_PORT = 80
WIFI_SSID = \"oldnet\"

WIFI_PSK = \"oldpass\"
";

    #[test]
    fn parses_comments_blanks_strings_and_ints() {
        let (file, skipped) = SettingsFile::parse(SAMPLE);
        assert_eq!(skipped, 0);
        assert_eq!(file.len(), 3);
        assert_eq!(file.get("WEB_PORT"), Some(&Value::Int(80)));
        assert_eq!(file.get_str("WIFI_SSID"), Some("oldnet"));
        assert_eq!(file.get_str("WIFI_PSK"), Some("oldpass"));
    }

    #[test]
    fn counts_malformed_lines_without_aborting() {
        let text = "GOOD = 1\nno equals sign\nBAD KEY = 2\nSTR = \"unterminated\nALSO = \"fine\"\n";
        let (file, skipped) = SettingsFile::parse(text);
        assert_eq!(skipped, 3);
        assert_eq!(file.len(), 2);
        assert_eq!(file.get("GOOD"), Some(&Value::Int(1)));
        assert_eq!(file.get_str("ALSO"), Some("fine"));
    }

    #[test]
    fn later_duplicate_wins_and_keeps_position() {
        let (file, _) = SettingsFile::parse("A = 1\nB = 2\nA = 3\n");
        assert_eq!(file.len(), 2);
        assert_eq!(file.get("A"), Some(&Value::Int(3)));
        assert_eq!(file.entries()[0].key.as_str(), "A");
    }

    #[test]
    fn set_replaces_in_place_and_appends_new_keys() {
        let (mut file, _) = SettingsFile::parse(SAMPLE);
        file.set_str("WIFI_SSID", "newnet").unwrap();
        file.set("ADDED", Value::Int(7)).unwrap();
        let keys: heapless::Vec<&str, 8> =
            file.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(
            keys.as_slice(),
            ["WEB_PORT", "WIFI_SSID", "WIFI_PSK", "ADDED"]
        );
        assert_eq!(file.get_str("WIFI_SSID"), Some("newnet"));
    }

    #[test]
    fn render_emits_one_line_per_entry() {
        let (mut file, _) = SettingsFile::parse(SAMPLE);
        file.set_str("WIFI_SSID", "newnet").unwrap();
        let mut out: String<256> = String::new();
        file.render(&mut out).unwrap();
        assert_eq!(
            out.as_str(),
            "WEB_PORT = 80\nWIFI_SSID = \"newnet\"\nWIFI_PSK = \"oldpass\"\n"
        );
    }

    #[test]
    fn render_round_trips() {
        let (file, _) = SettingsFile::parse(SAMPLE);
        let mut out: String<256> = String::new();
        file.render(&mut out).unwrap();
        let (reparsed, skipped) = SettingsFile::parse(&out);
        assert_eq!(skipped, 0);
        assert_eq!(reparsed, file);
    }

    #[test]
    fn full_table_counts_overflow_as_skipped() {
        let mut text: String<512> = String::new();
        for i in 0..MAX_ENTRIES + 2 {
            writeln!(text, "KEY{} = {}", i, i).unwrap();
        }
        let (file, skipped) = SettingsFile::parse(&text);
        assert_eq!(file.len(), MAX_ENTRIES);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn rejects_oversized_key_and_value() {
        fn run_of(c: char, len: usize) -> String<128> {
            let mut s = String::new();
            for _ in 0..len {
                s.push(c).unwrap();
            }
            s
        }
        let mut file = SettingsFile::new();
        assert_eq!(
            file.set(&run_of('x', MAX_KEY_LEN + 1), Value::Int(0)),
            Err(ConfigError::KeyTooLong)
        );
        assert_eq!(
            file.set_str("K", &run_of('v', MAX_VALUE_LEN + 1)),
            Err(ConfigError::ValueTooLong)
        );
    }

    #[test]
    fn render_reports_buffer_overflow() {
        let (file, _) = SettingsFile::parse(SAMPLE);
        let mut out: String<8> = String::new();
        assert_eq!(file.render(&mut out), Err(ConfigError::BufferFull));
    }
}
