#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use tempfile::TempDir;
use tinyurl::{
    code::{CodeGenerator, EntropyError, RandomCodeGenerator, ALPHABET},
    db,
    diagnostics::Diagnostics,
    UrlStore,
};

/// A store over a fresh database file. The directory lives as long as the
/// fixture.
pub struct Fixture {
    _dir: TempDir,
    /// Connection string of the database file, for opening extra pools.
    pub url: String,
    pub store: UrlStore,
    pub diagnostics: Arc<RecordingDiagnostics>,
}

impl Fixture {
    pub async fn start() -> Self {
        Self::with_generator(Arc::new(RandomCodeGenerator)).await
    }

    pub async fn with_generator(generator: Arc<dyn CodeGenerator>) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = format!("sqlite:{}", dir.path().join("tinyurl.db").display());
        let pool = db::connect(&url, 8).await.expect("connect sqlite");

        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let store = UrlStore::open(pool, diagnostics.clone())
            .await
            .expect("bootstrap store")
            .with_generator(generator);
        diagnostics.clear();

        Self {
            _dir: dir,
            url,
            store,
            diagnostics,
        }
    }

    pub async fn rows(&self) -> i64 {
        count_rows(self.store.pool()).await
    }

    pub async fn rows_for(&self, origin: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM urls WHERE origin = ?1")
            .bind(origin)
            .fetch_one(self.store.pool())
            .await
            .expect("count origin rows")
    }

    /// Removes the table behind the store's back so every query fails.
    pub async fn drop_table(&self) {
        sqlx::query("DROP TABLE urls")
            .execute(self.store.pool())
            .await
            .expect("drop urls table");
    }
}

pub async fn count_rows(pool: &sqlx::SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM urls")
        .fetch_one(pool)
        .await
        .expect("count rows")
}

/// `true` if `code` has the given length and only alphabet symbols.
pub fn is_well_formed(code: &str, length: usize) -> bool {
    code.len() == length && code.bytes().all(|b| ALPHABET.contains(&b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Warn,
    Error,
}

/// Keeps every message so tests can assert on what the store reported.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    messages: Mutex<Vec<(Severity, String)>>,
}

impl RecordingDiagnostics {
    pub fn count(&self, severity: Severity) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }

    fn push(&self, severity: Severity, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((severity, message.to_owned()));
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn debug(&self, message: &str) {
        self.push(Severity::Debug, message);
    }

    fn warn(&self, message: &str) {
        self.push(Severity::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(Severity::Error, message);
    }
}

/// Hands out scripted codes first, then falls back to random ones.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<String>>,
}

impl ScriptedGenerator {
    pub fn new(codes: &[&str]) -> Self {
        Self {
            script: Mutex::new(codes.iter().map(|c| c.to_string()).collect()),
        }
    }
}

impl CodeGenerator for ScriptedGenerator {
    fn generate(&self, length: usize) -> Result<String, EntropyError> {
        match self.script.lock().unwrap().pop_front() {
            Some(code) => Ok(code),
            None => RandomCodeGenerator.generate(length),
        }
    }
}

/// Always produces the same code.
#[derive(Debug)]
pub struct ConstantGenerator(pub &'static str);

impl CodeGenerator for ConstantGenerator {
    fn generate(&self, _length: usize) -> Result<String, EntropyError> {
        Ok(self.0.to_owned())
    }
}

/// A random source that is never available.
#[derive(Debug)]
pub struct BrokenEntropy;

impl CodeGenerator for BrokenEntropy {
    fn generate(&self, _length: usize) -> Result<String, EntropyError> {
        Err(EntropyError::new("device not configured"))
    }
}
