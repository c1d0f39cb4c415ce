//! INI-style platform configuration: `[section]` headers, `key = value`
//! entries, `;`/`#` comments.
//!
//! [`ConfigDocument`] keeps every source line verbatim so that a patch only
//! touches the lines it targets. [`ConfigStore`] binds a document to a path
//! and serialises read-modify-write cycles.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::error::{ConfigError, ConfigResult};

/// Default location of the platform configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/opt/inquisition/conf/main.cfg";

pub type ConfigSection = IndexMap<String, String>;
pub type ConfigTree = IndexMap<String, ConfigSection>;

// ── Line model ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum LineKind {
    Blank,
    Comment,
    Section(String),
    Entry { key: String, value: String },
}

#[derive(Debug, Clone)]
struct Line {
    /// Exact source text including the line terminator.
    text: String,
    kind: LineKind,
}

impl Line {
    fn eol(&self) -> &'static str {
        if self.text.ends_with("\r\n") {
            "\r\n"
        } else if self.text.ends_with('\n') {
            "\n"
        } else {
            ""
        }
    }

    fn body(&self) -> &str {
        &self.text[..self.text.len() - self.eol().len()]
    }

    fn is_entry_for(&self, key: &str) -> bool {
        matches!(&self.kind, LineKind::Entry { key: k, .. } if k == key)
    }
}

fn unquote(raw: &str) -> &str {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

fn classify(body: &str, line_no: usize, in_section: bool) -> ConfigResult<LineKind> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(LineKind::Blank);
    }
    if trimmed.starts_with(';') || trimmed.starts_with('#') {
        return Ok(LineKind::Comment);
    }
    if trimmed.starts_with('[') {
        if !trimmed.ends_with(']') || trimmed.len() < 3 {
            return Err(ConfigError::Parse {
                line: line_no,
                reason: format!("malformed section header {:?}", trimmed),
            });
        }
        return Ok(LineKind::Section(trimmed[1..trimmed.len() - 1].trim().to_string()));
    }
    let Some((key, value)) = trimmed.split_once('=') else {
        return Err(ConfigError::Parse {
            line: line_no,
            reason: format!("expected `key = value`, found {:?}", trimmed),
        });
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(ConfigError::Parse {
            line: line_no,
            reason: "entry with an empty key".to_string(),
        });
    }
    if !in_section {
        return Err(ConfigError::Parse {
            line: line_no,
            reason: format!("key {:?} appears before any section header", key),
        });
    }
    Ok(LineKind::Entry {
        key: key.to_string(),
        value: unquote(value.trim()).to_string(),
    })
}

/// Reject section names, keys and values that would not survive a
/// round-trip through [`classify`] as a single line.
fn check_entry(section: &str, key: &str, value: &str) -> ConfigResult<()> {
    let breaks = |s: &str| s.contains(['\r', '\n']);
    let invalid = |what: &'static str, value: &str| -> ConfigResult<()> {
        Err(ConfigError::Invalid {
            what,
            value: value.to_string(),
        })
    };
    let trimmed = section.trim();
    if trimmed.is_empty() || breaks(section) || trimmed.contains(['[', ']']) {
        return invalid("section name", section);
    }
    let trimmed = key.trim();
    if trimmed.is_empty()
        || breaks(key)
        || key.contains('=')
        || trimmed.starts_with(['[', ';', '#'])
    {
        return invalid("key", key);
    }
    if breaks(value) {
        return invalid("value", value);
    }
    Ok(())
}

// ── Document ──────────────────────────────────────────────────

/// Ordered, lossless view of a configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigDocument {
    lines: Vec<Line>,
}

impl ConfigDocument {
    pub fn parse(text: &str) -> ConfigResult<Self> {
        let mut lines = Vec::new();
        let mut in_section = false;
        for (idx, raw) in text.split_inclusive('\n').enumerate() {
            let mut line = Line {
                text: raw.to_string(),
                kind: LineKind::Blank,
            };
            line.kind = classify(line.body(), idx + 1, in_section)?;
            if matches!(line.kind, LineKind::Section(_)) {
                in_section = true;
            }
            lines.push(line);
        }
        Ok(Self { lines })
    }

    /// Reassemble the document. Untouched lines come back byte-for-byte.
    pub fn render(&self) -> String {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Section → key → value view. Later duplicates override earlier ones.
    pub fn to_tree(&self) -> ConfigTree {
        let mut tree = ConfigTree::new();
        let mut current: Option<String> = None;
        for line in &self.lines {
            match &line.kind {
                LineKind::Section(name) => {
                    tree.entry(name.clone()).or_default();
                    current = Some(name.clone());
                }
                LineKind::Entry { key, value } => {
                    if let Some(section) = &current {
                        tree.entry(section.clone())
                            .or_default()
                            .insert(key.clone(), value.clone());
                    }
                }
                LineKind::Blank | LineKind::Comment => {}
            }
        }
        tree
    }

    /// Indices of entry lines for `key` inside every block named `section`.
    fn entry_indices(&self, section: &str, key: &str) -> Vec<usize> {
        let mut matched = false;
        let mut found = Vec::new();
        for (idx, line) in self.lines.iter().enumerate() {
            match &line.kind {
                LineKind::Section(name) => matched = name == section,
                LineKind::Entry { .. } if matched && line.is_entry_for(key) => found.push(idx),
                _ => {}
            }
        }
        found
    }

    /// Rewrite the value of `key` in `section`. `Ok(false)` when nothing
    /// matched.
    pub fn set(&mut self, section: &str, key: &str, value: &str) -> ConfigResult<bool> {
        check_entry(section, key, value)?;
        let targets = self.entry_indices(section, key);
        for &idx in &targets {
            let line = &mut self.lines[idx];
            let eol = line.eol();
            let body = line.body();
            // `classify` guarantees an '=' on entry lines.
            let eq = body.find('=').unwrap_or(body.len());
            let after = &body[eq + 1..];
            let pad = after.len() - after.trim_start().len();
            line.text = format!("{}{}{}", &body[..eq + 1 + pad], value, eol);
            line.kind = LineKind::Entry {
                key: key.to_string(),
                value: value.to_string(),
            };
        }
        Ok(!targets.is_empty())
    }

    /// Append `key = value` to `section`, creating the section at the end of
    /// the document when it does not exist yet.
    pub fn add(&mut self, section: &str, key: &str, value: &str) -> ConfigResult<()> {
        check_entry(section, key, value)?;
        if !self.entry_indices(section, key).is_empty() {
            return Err(ConfigError::KeyExists {
                section: section.to_string(),
                key: key.to_string(),
            });
        }
        let eol = self.preferred_eol();
        let entry = Line {
            text: format!("{} = {}{}", key, value, eol),
            kind: LineKind::Entry {
                key: key.to_string(),
                value: value.to_string(),
            },
        };

        match self.insertion_point(section) {
            Some(after) => {
                self.terminate_line(after, eol);
                self.lines.insert(after + 1, entry);
            }
            None => {
                if let Some(last) = self.lines.len().checked_sub(1) {
                    self.terminate_line(last, eol);
                    self.lines.push(Line {
                        text: eol.to_string(),
                        kind: LineKind::Blank,
                    });
                }
                self.lines.push(Line {
                    text: format!("[{}]{}", section, eol),
                    kind: LineKind::Section(section.to_string()),
                });
                self.lines.push(entry);
            }
        }
        Ok(())
    }

    /// Remove every `key` line in `section`. Returns false when nothing matched.
    pub fn remove(&mut self, section: &str, key: &str) -> bool {
        let targets = self.entry_indices(section, key);
        for &idx in targets.iter().rev() {
            self.lines.remove(idx);
        }
        !targets.is_empty()
    }

    /// Last header-or-entry line of the last block named `section`.
    fn insertion_point(&self, section: &str) -> Option<usize> {
        let mut point = None;
        let mut matched = false;
        for (idx, line) in self.lines.iter().enumerate() {
            match &line.kind {
                LineKind::Section(name) => {
                    matched = name == section;
                    if matched {
                        point = Some(idx);
                    }
                }
                LineKind::Entry { .. } if matched => point = Some(idx),
                _ => {}
            }
        }
        point
    }

    fn terminate_line(&mut self, idx: usize, eol: &str) {
        let line = &mut self.lines[idx];
        if line.eol().is_empty() {
            line.text.push_str(eol);
        }
    }

    fn preferred_eol(&self) -> &'static str {
        match self.lines.iter().map(Line::eol).find(|e| !e.is_empty()) {
            Some(eol) => eol,
            None => "\n",
        }
    }
}

impl FromStr for ConfigDocument {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ── File helpers ──────────────────────────────────────────────

fn load_document(path: &Path) -> ConfigResult<ConfigDocument> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ConfigDocument::parse(&text)
}

/// Replace `path` with `doc` via a temporary sibling file and a rename.
fn write_document(path: &Path, doc: &ConfigDocument) -> ConfigResult<()> {
    let write_err = |source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(doc.render().as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Read `path` into a section tree.
pub fn read_config(path: impl AsRef<Path>) -> ConfigResult<ConfigTree> {
    let path = path.as_ref();
    load_document(path)
        .map(|doc| doc.to_tree())
        .inspect_err(|e| warn!(file = %path.display(), "could not read config file: {}", e))
}

/// Line-oriented patch of a single key.
///
/// `Ok(false)` means the section/key pair was not present and the file was
/// left untouched. A missing or unreadable file is an error and nothing is
/// written.
pub fn update_config(
    path: impl AsRef<Path>,
    section: &str,
    key: &str,
    value: &str,
) -> ConfigResult<bool> {
    let path = path.as_ref();
    let mut doc = load_document(path)?;
    if !doc.set(section, key, value)? {
        return Ok(false);
    }
    write_document(path, &doc)?;
    Ok(true)
}

// ── Store ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    Set,
    Add,
    Delete,
}

impl fmt::Display for ConfigAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigAction::Set => "set",
            ConfigAction::Add => "add",
            ConfigAction::Delete => "delete",
        })
    }
}

impl FromStr for ConfigAction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "set" => Ok(ConfigAction::Set),
            "add" => Ok(ConfigAction::Add),
            "delete" => Ok(ConfigAction::Delete),
            _ => Err(ConfigError::Invalid {
                what: "action",
                value: s.to_string(),
            }),
        }
    }
}

/// A configuration file on disk with serialised writers.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    /// Bind to `path`, failing if the file cannot be read and parsed.
    pub fn open(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let tree = read_config(&path)?;
        info!(
            file = %path.display(),
            sections = tree.len(),
            "Config file loaded"
        );
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point-in-time snapshot of the file.
    pub fn read(&self) -> ConfigResult<ConfigTree> {
        read_config(&self.path)
    }

    pub fn update(&self, section: &str, key: &str, value: &str) -> ConfigResult<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        update_config(&self.path, section, key, value)
    }

    /// Apply `action` to `[section] key`. `value` is ignored for deletes.
    pub fn modify(
        &self,
        action: ConfigAction,
        section: &str,
        key: &str,
        value: &str,
    ) -> ConfigResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut doc = load_document(&self.path)?;
        let not_found = || ConfigError::KeyNotFound {
            section: section.to_string(),
            key: key.to_string(),
        };
        match action {
            ConfigAction::Set => {
                if !doc.set(section, key, value)? {
                    return Err(not_found());
                }
            }
            ConfigAction::Add => doc.add(section, key, value)?,
            ConfigAction::Delete => {
                if !doc.remove(section, key) {
                    return Err(not_found());
                }
            }
        }
        write_document(&self.path, &doc)?;
        info!(file = %self.path.display(), %action, section, key, "Config file updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
; main configuration
[log_database]
host = 127.0.0.1
port = 6379

[mysql_database]
db_host = 127.0.0.1
db_user = inquisition
db_pass = \"s3cret\"
; trailing comment

[debug]
sentry_api_key=abc123
";

    fn write_sample() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.cfg");
        std::fs::write(&path, SAMPLE).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_render_is_lossless() {
        let doc = ConfigDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.render(), SAMPLE);
        assert_eq!(doc.line_count(), SAMPLE.lines().count());
    }

    #[test]
    fn test_tree_values() {
        let tree = ConfigDocument::parse(SAMPLE).unwrap().to_tree();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree["log_database"]["port"], "6379");
        assert_eq!(tree["mysql_database"]["db_pass"], "s3cret");
        assert_eq!(tree["debug"]["sentry_api_key"], "abc123");
        let sections: Vec<&str> = tree.keys().map(String::as_str).collect();
        assert_eq!(sections, ["log_database", "mysql_database", "debug"]);
    }

    #[test]
    fn test_parse_rejects_entry_outside_section() {
        let err = ConfigDocument::parse("orphan = 1\n[s]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_parse_rejects_garbage_line() {
        let err = ConfigDocument::parse("[s]\nnot an entry\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_set_only_touches_target_line() {
        let mut doc = ConfigDocument::parse(SAMPLE).unwrap();
        assert!(doc.set("log_database", "port", "6380").unwrap());
        let rendered = doc.render();

        let before: Vec<&str> = SAMPLE.lines().collect();
        let after: Vec<&str> = rendered.lines().collect();
        assert_eq!(before.len(), after.len());
        for (i, (b, a)) in before.iter().zip(&after).enumerate() {
            if b.starts_with("port") {
                assert_eq!(*a, "port = 6380");
            } else {
                assert_eq!(b, a, "line {} changed", i + 1);
            }
        }
    }

    #[test]
    fn test_set_keeps_compact_spacing() {
        let mut doc = ConfigDocument::parse(SAMPLE).unwrap();
        assert!(doc.set("debug", "sentry_api_key", "xyz").unwrap());
        assert!(doc.render().ends_with("sentry_api_key=xyz\n"));
    }

    #[test]
    fn test_set_is_scoped_to_section() {
        let mut doc = ConfigDocument::parse(SAMPLE).unwrap();
        // `host` exists only in log_database.
        assert!(!doc.set("mysql_database", "host", "10.0.0.1").unwrap());
        assert_eq!(doc.render(), SAMPLE);
    }

    #[test]
    fn test_set_preserves_crlf() {
        let text = "[a]\r\nk = 1\r\nj = 2\r\n";
        let mut doc = ConfigDocument::parse(text).unwrap();
        assert!(doc.set("a", "k", "9").unwrap());
        assert_eq!(doc.render(), "[a]\r\nk = 9\r\nj = 2\r\n");
    }

    #[test]
    fn test_add_appends_after_last_entry() {
        let mut doc = ConfigDocument::parse(SAMPLE).unwrap();
        doc.add("log_database", "db", "0").unwrap();
        let rendered = doc.render();
        assert!(rendered.contains("port = 6379\ndb = 0\n\n[mysql_database]"));
        assert_eq!(doc.to_tree()["log_database"]["db"], "0");
    }

    #[test]
    fn test_add_creates_missing_section() {
        let mut doc = ConfigDocument::parse(SAMPLE).unwrap();
        doc.add("caching", "alert_expiration", "30").unwrap();
        assert!(doc
            .render()
            .ends_with("sentry_api_key=abc123\n\n[caching]\nalert_expiration = 30\n"));
    }

    #[test]
    fn test_add_to_unterminated_last_line() {
        let mut doc = ConfigDocument::parse("[a]\nk = 1").unwrap();
        doc.add("a", "j", "2").unwrap();
        assert_eq!(doc.render(), "[a]\nk = 1\nj = 2\n");
    }

    #[test]
    fn test_add_existing_key_fails() {
        let mut doc = ConfigDocument::parse(SAMPLE).unwrap();
        let err = doc.add("log_database", "host", "x").unwrap_err();
        assert!(matches!(err, ConfigError::KeyExists { .. }));
    }

    #[test]
    fn test_line_breaks_are_rejected() {
        let mut doc = ConfigDocument::parse(SAMPLE).unwrap();
        let values = ["6380\n[mysql_database]\ndb_pass = owned", "x\r\nnot an entry", "x\r"];
        for value in values {
            let err = doc.set("log_database", "port", value).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { what: "value", .. }), "{value:?}");
            let err = doc.add("log_database", "extra", value).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { what: "value", .. }), "{value:?}");
        }
        for key in ["a\nb", "a=b", "", "[x]", ";c"] {
            let err = doc.add("log_database", key, "1").unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { what: "key", .. }), "{key:?}");
        }
        for section in ["a]\n[b", "a]b", "a\nb", " "] {
            let err = doc.add(section, "k", "1").unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { what: "section name", .. }),
                "{section:?}"
            );
        }
        assert_eq!(doc.render(), SAMPLE);
    }

    #[test]
    fn test_rejected_update_leaves_file_readable() {
        let (_dir, path) = write_sample();
        let err = update_config(&path, "log_database", "port", "x\nnot an entry").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE);
        assert_eq!(read_config(&path).unwrap()["log_database"]["port"], "6379");
    }

    #[test]
    fn test_remove_key() {
        let mut doc = ConfigDocument::parse(SAMPLE).unwrap();
        assert!(doc.remove("mysql_database", "db_user"));
        assert!(!doc.remove("mysql_database", "db_user"));
        assert!(!doc.render().contains("db_user"));
        assert_eq!(doc.line_count(), SAMPLE.lines().count() - 1);
    }

    #[test]
    fn test_update_config_missing_file_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent-update.cfg");
        let err = update_config(&path, "s", "k", "v").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_update_config_rewrites_file() {
        let (_dir, path) = write_sample();
        assert!(update_config(&path, "mysql_database", "db_host", "db.internal").unwrap());
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, SAMPLE.replace("db_host = 127.0.0.1", "db_host = db.internal"));
    }

    #[test]
    fn test_update_config_unknown_key_is_noop() {
        let (_dir, path) = write_sample();
        assert!(!update_config(&path, "mysql_database", "nope", "1").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE);
    }

    #[test]
    fn test_store_open_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigStore::open(dir.path().join("nonexistent-read.cfg")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_store_modify_actions() {
        let (_dir, path) = write_sample();
        let store = ConfigStore::open(&path).unwrap();

        store.modify(ConfigAction::Add, "caching", "alert_expiration", "20").unwrap();
        assert_eq!(store.read().unwrap()["caching"]["alert_expiration"], "20");

        store.modify(ConfigAction::Set, "caching", "alert_expiration", "25").unwrap();
        assert_eq!(store.read().unwrap()["caching"]["alert_expiration"], "25");

        store.modify(ConfigAction::Delete, "caching", "alert_expiration", "").unwrap();
        assert!(store.read().unwrap()["caching"].is_empty());

        let err = store.modify(ConfigAction::Set, "caching", "alert_expiration", "1").unwrap_err();
        assert!(matches!(err, ConfigError::KeyNotFound { .. }));
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!("SET".parse::<ConfigAction>().unwrap(), ConfigAction::Set);
        assert_eq!("add".parse::<ConfigAction>().unwrap(), ConfigAction::Add);
        assert!("upsert".parse::<ConfigAction>().is_err());
    }
}
