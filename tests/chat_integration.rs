//! Integration tests for the console chat session.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use answer_bot::chat::{Console, ConsoleOptions, SessionSummary, Tutor};
use answer_bot::knowledge::KnowledgeBase;
use tempfile::TempDir;

const KB: &str = r#"{"knowledge_base": [{"questions": ["hi"], "answer": "hello!"}]}"#;

fn session(path: &Path, script: &str) -> (String, SessionSummary) {
    let mut tutor = Tutor::open(path).expect("knowledge base loads");
    let mut console = Console::new(
        Cursor::new(script.to_string()),
        Vec::new(),
        ConsoleOptions::default(),
    );
    let summary = console.run(&mut tutor).unwrap();
    (String::from_utf8(console.into_output()).unwrap(), summary)
}

#[test]
fn test_knowledge_learned_in_one_session_is_used_in_the_next() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("knowledge_base.json");
    fs::write(&path, KB).unwrap();

    let (output, summary) = session(&path, "Where do you live?\nIn a JSON file.\nQUIT\n");
    assert!(output.contains("Can you teach me?"));
    assert_eq!(summary.learned, 1);

    let (output, summary) = session(&path, "where do you live\nquit\n");
    assert!(output.contains("Bot: In a JSON file."));
    assert_eq!(summary.answered, 1);
    assert_eq!(summary.learned, 0);
}

#[test]
fn test_quit_is_case_insensitive_and_ends_immediately() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("knowledge_base.json");
    fs::write(&path, KB).unwrap();

    let (output, summary) = session(&path, "Quit\nhi\n");
    assert_eq!(output, "You: ");
    assert_eq!(summary, SessionSummary::default());
}

#[test]
fn test_each_learned_answer_writes_a_backup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("knowledge_base.json");
    fs::write(&path, KB).unwrap();

    session(
        &path,
        "where were you born\nin a lab\nwhat do you eat\nbytes\nquit\n",
    );

    let backups = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().contains(".bak."))
        .count();
    assert_eq!(backups, 2);
    assert_eq!(KnowledgeBase::load(&path).unwrap().len(), 3);
}

#[test]
fn test_open_fails_on_invalid_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("knowledge_base.json");
    fs::write(&path, r#"{"knowledge_base": [{"questions": "hi", "answer": "x"}]}"#).unwrap();

    let err = Tutor::open(&path).unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("Invalid knowledge base format"));
}
