//! Persistent question→answer store.
//!
//! The knowledge file is a pretty-printed JSON document:
//!
//! ```json
//! {
//!   "knowledge_base": [
//!     { "questions": ["hi", "hello"], "answer": "hello!" }
//!   ]
//! }
//! ```
//!
//! Every save first writes a timestamped backup next to the file, then
//! replaces the file atomically (temp file + sync + rename).

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use super::error::KnowledgeError;
use super::normalize::is_meaningful;

/// Format of the backup timestamp suffix.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Upper bound on same-second backup suffixes before giving up.
const MAX_BACKUP_SUFFIX: u32 = 1000;

/// One answer together with every phrasing that maps to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Question phrasings, in match order.
    #[serde(alias = "question")]
    pub questions: Vec<String>,
    /// The stored answer.
    pub answer: String,
}

impl Entry {
    /// Create a validated entry.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::InvalidEntry` if there are no phrasings, a
    /// phrasing has no meaningful characters, or the answer is blank.
    pub fn new(
        questions: impl IntoIterator<Item = impl Into<String>>,
        answer: impl Into<String>,
    ) -> Result<Self, KnowledgeError> {
        let entry = Self {
            questions: questions.into_iter().map(Into::into).collect(),
            answer: answer.into(),
        };
        entry.validate().map_err(KnowledgeError::InvalidEntry)?;
        Ok(entry)
    }

    /// Check the entry invariants, describing the first violation.
    fn validate(&self) -> Result<(), String> {
        if self.questions.is_empty() {
            return Err("entry has no questions".to_string());
        }
        if let Some(q) = self.questions.iter().find(|q| !is_meaningful(q)) {
            return Err(format!("question {q:?} is empty after normalization"));
        }
        if self.answer.trim().is_empty() {
            return Err("entry has an empty answer".to_string());
        }
        Ok(())
    }

    /// Whether `phrasing` is one of this entry's questions.
    #[must_use]
    pub fn has_phrasing(&self, phrasing: &str) -> bool {
        self.questions.iter().any(|q| q == phrasing)
    }
}

/// On-disk document layout.
#[derive(Debug, Serialize, Deserialize)]
struct KnowledgeFile {
    knowledge_base: Vec<Entry>,
}

/// Outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    /// The knowledge file that was written.
    pub path: PathBuf,
    /// The backup written before the overwrite.
    pub backup_path: PathBuf,
    /// Number of entries persisted.
    pub entries: usize,
}

/// In-memory knowledge base. Only ever grows by appending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    entries: Vec<Entry>,
}

impl KnowledgeBase {
    /// Create an empty knowledge base.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a knowledge base from already validated entries.
    #[must_use]
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Load and validate the knowledge file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the file is missing, `Read` if it cannot be read,
    /// and `Format` if it is not a valid knowledge document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KnowledgeError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                KnowledgeError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                KnowledgeError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let base = Self::parse(&content).map_err(|reason| KnowledgeError::Format {
            path: path.to_path_buf(),
            reason,
        })?;
        tracing::debug!(path = %path.display(), entries = base.len(), "Loaded knowledge base");
        Ok(base)
    }

    /// Parse and validate a knowledge document.
    ///
    /// # Errors
    ///
    /// Returns a description of the first syntax or validation problem.
    pub fn parse(content: &str) -> Result<Self, String> {
        let file: KnowledgeFile = serde_json::from_str(content).map_err(|e| e.to_string())?;
        for (index, entry) in file.knowledge_base.iter().enumerate() {
            entry
                .validate()
                .map_err(|reason| format!("entry {index}: {reason}"))?;
        }
        Ok(Self {
            entries: file.knowledge_base,
        })
    }

    /// Serialize as pretty-printed JSON with 2-space indentation.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct KnowledgeFileRef<'a> {
            knowledge_base: &'a [Entry],
        }

        let mut json = serde_json::to_string_pretty(&KnowledgeFileRef {
            knowledge_base: &self.entries,
        })?;
        json.push('\n');
        Ok(json)
    }

    /// Back up the current file, then replace it with this knowledge base.
    ///
    /// The backup holds the file content as it was right before the
    /// overwrite (or the new content when no file existed yet). If the backup
    /// cannot be written the knowledge file is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::Persistence` if the backup or the primary
    /// write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<SaveReport, KnowledgeError> {
        let timestamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        self.save_at(path.as_ref(), &timestamp)
    }

    /// [`save`](Self::save) with the backup timestamp supplied by the caller.
    fn save_at(&self, path: &Path, timestamp: &str) -> Result<SaveReport, KnowledgeError> {
        let persistence = |source: io::Error| KnowledgeError::Persistence {
            path: path.to_path_buf(),
            source,
        };

        let json = self
            .to_pretty_json()
            .map_err(|e| persistence(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let previous = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => json.clone().into_bytes(),
            Err(e) => return Err(persistence(e)),
        };
        let backup_path = write_backup(path, &previous, timestamp).map_err(|source| {
            tracing::warn!(path = %path.display(), error = %source, "Backup failed, not saving");
            persistence(source)
        })?;

        write_atomic(path, json.as_bytes()).map_err(persistence)?;

        tracing::info!(
            path = %path.display(),
            backup = %backup_path.display(),
            count = self.entries.len(),
            "Saved knowledge base"
        );
        Ok(SaveReport {
            path: path.to_path_buf(),
            backup_path,
            entries: self.entries.len(),
        })
    }

    /// Append an entry.
    pub fn append(&mut self, entry: Entry) {
        self.entries.push(entry);
        tracing::debug!(count = self.entries.len(), "Appended knowledge entry");
    }

    /// All entries in file order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Every phrasing across all entries, in entry then phrasing order.
    pub fn phrasings(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .flat_map(|e| e.questions.iter().map(String::as_str))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the knowledge base has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Backup path for `path` at the given timestamp: `<path>.bak.<timestamp>`.
#[must_use]
pub fn backup_path_for(path: &Path, timestamp: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak.");
    name.push(timestamp);
    PathBuf::from(name)
}

/// Write `content` to a fresh backup file, never overwriting an older one.
fn write_backup(path: &Path, content: &[u8], timestamp: &str) -> io::Result<PathBuf> {
    let base = backup_path_for(path, timestamp);

    for attempt in 0..MAX_BACKUP_SUFFIX {
        let candidate = if attempt == 0 {
            base.clone()
        } else {
            backup_path_for(path, &format!("{timestamp}-{attempt}"))
        };

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                file.write_all(content)?;
                file.sync_data()?;
                return Ok(candidate);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free backup name for {}", base.display()),
    ))
}

/// Replace `path` with `content` via temp file + sync + rename.
fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut temp = path.as_os_str().to_os_string();
    temp.push(".tmp");
    let temp_path = PathBuf::from(temp);

    let result = File::create(&temp_path).and_then(|mut file| {
        file.write_all(content)?;
        file.sync_data()?;
        drop(file);
        fs::rename(&temp_path, path)
    });
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
  "knowledge_base": [
    { "questions": ["hi", "hello"], "answer": "hello!" },
    { "questions": ["what is your name"], "answer": "I am a bot." }
  ]
}"#;

    fn backups_in(dir: &Path) -> Vec<PathBuf> {
        let mut found: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().contains(".bak."))
            .collect();
        found.sort();
        found
    }

    #[test]
    fn test_parse_valid_document() {
        let base = KnowledgeBase::parse(SAMPLE).unwrap();
        assert_eq!(base.len(), 2);
        assert_eq!(base.entries()[0].answer, "hello!");
        let phrasings: Vec<_> = base.phrasings().collect();
        assert_eq!(phrasings, vec!["hi", "hello", "what is your name"]);
    }

    #[test]
    fn test_parse_accepts_legacy_field_name() {
        let doc = r#"{"knowledge_base": [{"question": ["hi"], "answer": "hey"}]}"#;
        let base = KnowledgeBase::parse(doc).unwrap();
        assert_eq!(base.entries()[0].questions, vec!["hi"]);
    }

    #[test]
    fn test_parse_rejects_missing_answer() {
        let doc = r#"{"knowledge_base": [{"questions": ["hi"]}]}"#;
        let err = KnowledgeBase::parse(doc).unwrap_err();
        assert!(err.contains("answer"));
    }

    #[test]
    fn test_parse_rejects_missing_questions() {
        let doc = r#"{"knowledge_base": [{"answer": "hello"}]}"#;
        assert!(KnowledgeBase::parse(doc).is_err());
    }

    #[test]
    fn test_parse_rejects_bare_string_question() {
        let doc = r#"{"knowledge_base": [{"questions": "hi", "answer": "hello"}]}"#;
        assert!(KnowledgeBase::parse(doc).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_entry_fields() {
        let no_questions = r#"{"knowledge_base": [{"questions": [], "answer": "x"}]}"#;
        let err = KnowledgeBase::parse(no_questions).unwrap_err();
        assert!(err.starts_with("entry 0"));

        let blank_phrasing = r#"{"knowledge_base": [{"questions": ["?!"], "answer": "x"}]}"#;
        assert!(KnowledgeBase::parse(blank_phrasing).is_err());

        let blank_answer = r#"{"knowledge_base": [{"questions": ["hi"], "answer": "  "}]}"#;
        assert!(KnowledgeBase::parse(blank_answer).is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_top_level_key() {
        let doc = r#"{"question": [{"question": "hi", "answer": "hello"}]}"#;
        assert!(KnowledgeBase::parse(doc).is_err());
    }

    #[test]
    fn test_entry_new_validates() {
        assert!(Entry::new(["hi"], "hello").is_ok());
        assert!(matches!(
            Entry::new(Vec::<String>::new(), "hello"),
            Err(KnowledgeError::InvalidEntry(_))
        ));
        assert!(Entry::new(["hi"], "").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = KnowledgeBase::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, KnowledgeError::NotFound { .. }));
    }

    #[test]
    fn test_load_invalid_json_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.json");
        fs::write(&path, "{ not json").unwrap();

        let err = KnowledgeBase::load(&path).unwrap_err();
        assert!(matches!(err, KnowledgeError::Format { .. }));
    }

    #[test]
    fn test_pretty_json_uses_two_space_indent() {
        let base = KnowledgeBase::from_entries(vec![Entry::new(["hi"], "hello!").unwrap()]);
        let json = base.to_pretty_json().unwrap();
        assert!(json.contains("\n  \"knowledge_base\""));
        assert!(json.contains("\n      \"questions\""));
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn test_save_creates_backup_of_previous_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.json");
        fs::write(&path, SAMPLE).unwrap();

        let mut base = KnowledgeBase::load(&path).unwrap();
        base.append(Entry::new(["foo"], "bar").unwrap());
        let report = base.save(&path).unwrap();

        assert_ne!(report.backup_path, path);
        assert_eq!(report.entries, 3);
        assert_eq!(fs::read_to_string(&report.backup_path).unwrap(), SAMPLE);

        let reloaded = KnowledgeBase::load(&path).unwrap();
        assert_eq!(reloaded, base);
    }

    #[test]
    fn test_save_without_existing_file_backs_up_new_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.json");

        let base = KnowledgeBase::from_entries(vec![Entry::new(["hi"], "hello!").unwrap()]);
        let report = base.save(&path).unwrap();

        assert_eq!(
            fs::read_to_string(&report.backup_path).unwrap(),
            fs::read_to_string(&path).unwrap()
        );
    }

    #[test]
    fn test_backup_name_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.json");
        let report = KnowledgeBase::new().save(&path).unwrap();

        let name = report.backup_path.file_name().unwrap().to_string_lossy();
        let timestamp = name.strip_prefix("kb.json.bak.").unwrap();
        assert!(
            chrono::NaiveDateTime::parse_from_str(timestamp, BACKUP_TIMESTAMP_FORMAT).is_ok(),
            "unexpected backup name {name}"
        );
    }

    #[test]
    fn test_same_second_saves_keep_every_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.json");
        let mut base = KnowledgeBase::new();

        let mut reports = Vec::new();
        for i in 0..3 {
            base.append(Entry::new([format!("question {i}")], "answer").unwrap());
            reports.push(base.save(&path).unwrap());
        }

        assert_eq!(backups_in(dir.path()).len(), 3);
        assert_ne!(reports[0].backup_path, reports[1].backup_path);
        assert_ne!(reports[1].backup_path, reports[2].backup_path);
    }

    #[test]
    fn test_backup_failure_leaves_primary_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.json");
        fs::write(&path, SAMPLE).unwrap();

        // Occupy every candidate backup name for a fixed timestamp.
        let ts = "2024-01-02_03-04-05";
        fs::create_dir(backup_path_for(&path, ts)).unwrap();
        for n in 1..MAX_BACKUP_SUFFIX {
            fs::create_dir(backup_path_for(&path, &format!("{ts}-{n}"))).unwrap();
        }

        let mut base = KnowledgeBase::load(&path).unwrap();
        base.append(Entry::new(["foo"], "bar").unwrap());
        let err = base.save_at(&path, ts).unwrap_err();

        assert!(matches!(err, KnowledgeError::Persistence { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
        assert!(!dir.path().join("kb.json.tmp").exists());
    }

    #[test]
    fn test_save_at_uses_given_timestamp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.json");
        fs::write(&path, SAMPLE).unwrap();

        let base = KnowledgeBase::parse(SAMPLE).unwrap();
        let first = base.save_at(&path, "2024-01-02_03-04-05").unwrap();
        let second = base.save_at(&path, "2024-01-02_03-04-05").unwrap();

        assert_eq!(first.backup_path, dir.path().join("kb.json.bak.2024-01-02_03-04-05"));
        assert_eq!(second.backup_path, dir.path().join("kb.json.bak.2024-01-02_03-04-05-1"));
    }

    #[test]
    fn test_failed_write_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        // Renaming a file over a non-empty directory fails after the temp
        // file has been written.
        let target = dir.path().join("kb.json");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("occupied"), "x").unwrap();

        assert!(write_atomic(&target, SAMPLE.as_bytes()).is_err());
        assert!(!dir.path().join("kb.json.tmp").exists());
        assert!(target.join("occupied").exists());
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no").join("such").join("kb.json");
        let err = KnowledgeBase::new().save(&path).unwrap_err();
        assert!(matches!(err, KnowledgeError::Persistence { .. }));
        assert!(!path.exists());
    }
}
