//! The URL store: the only component that reads or writes the `urls` table.
//!
//! Allocation follows a two-phase protocol:
//!
//! 1. **Optimistic check.** Look the origin up. A hit returns the existing
//!    code and nothing is written.
//! 2. **Atomic insert.** Generate a candidate code and insert `(code, origin)`
//!    inside one transaction. A unique violation rolls the transaction back
//!    and triggers a re-check by origin: if another caller committed the same
//!    origin in the meantime its code is returned, otherwise the candidate
//!    collided with an existing code and a fresh one is tried.
//!
//! No lock is held between the two phases. The uniqueness constraints on
//! `code` and `origin` are what keep the table consistent, which also holds
//! when several processes share one database file.

use std::{future::Future, sync::Arc, time::Duration};

use sqlx::SqlitePool;

use crate::{
    code::{CodeGenerator, EntropyError, RandomCodeGenerator, DEFAULT_CODE_LENGTH},
    db,
    diagnostics::Diagnostics,
    error::{Result, StoreError},
};

/// Default cap on insert attempts per allocation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Length of every generated code.
    pub code_length: usize,
    /// Insert attempts before giving up with `AllocationExhausted`.
    pub max_attempts: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Outcome of a single insert attempt.
enum InsertOutcome {
    Committed,
    Conflict,
}

/// Gateway to the persistent code/origin mapping.
///
/// Cloning is cheap; every clone shares the same pool, generator and sink.
#[derive(Clone)]
pub struct UrlStore {
    pool: SqlitePool,
    generator: Arc<dyn CodeGenerator>,
    diagnostics: Arc<dyn Diagnostics>,
    options: StoreOptions,
}

impl UrlStore {
    /// Creates a store over an existing pool using the secure random
    /// generator and default options. Call [`UrlStore::bootstrap`] before
    /// serving requests.
    pub fn new(pool: SqlitePool, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            pool,
            generator: Arc::new(RandomCodeGenerator),
            diagnostics,
            options: StoreOptions::default(),
        }
    }

    /// Creates a store and bootstraps its schema in one go.
    pub async fn open(pool: SqlitePool, diagnostics: Arc<dyn Diagnostics>) -> Result<Self> {
        let store = Self::new(pool, diagnostics);
        store.bootstrap().await?;
        Ok(store)
    }

    pub fn with_generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Creates the `urls` table if it is missing. Safe to run repeatedly and
    /// from several processes at once.
    pub async fn bootstrap(&self) -> Result<()> {
        let exists = db::urls_table_exists(&self.pool)
            .await
            .map_err(|e| self.fail("checking for the urls table", e))?;

        if !exists {
            self.diagnostics
                .warn("table 'urls' was not found, creating it");
        }

        db::create_urls_table(&self.pool)
            .await
            .map_err(|e| self.fail("creating the urls table", e))
    }

    /// Looks up the origin behind `code`.
    pub async fn resolve(&self, code: &str) -> Result<String> {
        let mapping = db::get_mapping_by_code(&self.pool, code)
            .await
            .map_err(|e| self.fail(format!("resolving code '{code}'"), e))?;

        match mapping {
            Some(mapping) => Ok(mapping.origin),
            None => {
                self.diagnostics
                    .debug(&format!("code '{code}' is not registered"));
                Err(StoreError::NotFound(code.to_owned()))
            }
        }
    }

    /// Returns the code for `origin`, creating a mapping if none exists.
    ///
    /// Repeated and concurrent calls with the same origin all yield the same
    /// code, and at most one row is ever written for it.
    pub async fn allocate(&self, origin: &str) -> Result<String> {
        if origin.is_empty() {
            return Err(StoreError::InvalidOrigin);
        }

        if let Some(code) = self.existing_code(origin).await? {
            self.diagnostics
                .debug(&format!("origin '{origin}' already has code '{code}'"));
            return Ok(code);
        }

        let mut entropy_failure: Option<EntropyError> = None;

        for attempt in 1..=self.options.max_attempts {
            let candidate = match self.generator.generate(self.options.code_length) {
                Ok(candidate) => candidate,
                Err(e) => {
                    self.diagnostics.error(&format!(
                        "attempt {attempt}: could not generate a code for '{origin}': {e}"
                    ));
                    entropy_failure = Some(e);
                    continue;
                }
            };

            match self.try_insert(&candidate, origin).await? {
                InsertOutcome::Committed => {
                    self.diagnostics
                        .debug(&format!("new mapping added: '{candidate}' -> '{origin}'"));
                    return Ok(candidate);
                }
                InsertOutcome::Conflict => {
                    if let Some(code) = self.existing_code(origin).await? {
                        self.diagnostics.debug(&format!(
                            "origin '{origin}' was stored concurrently, reusing code '{code}'"
                        ));
                        return Ok(code);
                    }

                    self.diagnostics.warn(&format!(
                        "attempt {attempt}: code '{candidate}' is already taken, retrying"
                    ));
                }
            }
        }

        let attempts = self.options.max_attempts;
        self.diagnostics.error(&format!(
            "giving up on '{origin}' after {attempts} allocation attempt(s)"
        ));

        Err(StoreError::AllocationExhausted {
            origin: origin.to_owned(),
            attempts,
            cause: entropy_failure,
        })
    }

    /// [`UrlStore::resolve`] bounded by a caller deadline.
    pub async fn resolve_within(&self, code: &str, limit: Duration) -> Result<String> {
        self.within(limit, self.resolve(code)).await
    }

    /// [`UrlStore::allocate`] bounded by a caller deadline. An insert still
    /// in flight when the deadline passes is rolled back.
    pub async fn allocate_within(&self, origin: &str, limit: Duration) -> Result<String> {
        self.within(limit, self.allocate(origin)).await
    }

    async fn within<T>(&self, limit: Duration, op: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(limit, op).await {
            Ok(result) => result,
            Err(_) => {
                self.diagnostics
                    .warn(&format!("store operation exceeded its {limit:?} deadline"));
                Err(StoreError::Timeout(limit))
            }
        }
    }

    async fn existing_code(&self, origin: &str) -> Result<Option<String>> {
        let mapping = db::get_mapping_by_origin(&self.pool, origin)
            .await
            .map_err(|e| self.fail(format!("looking up origin '{origin}'"), e))?;

        Ok(mapping.map(|m| m.code))
    }

    /// One insert inside its own transaction. Dropping the transaction on any
    /// early return rolls it back.
    async fn try_insert(&self, code: &str, origin: &str) -> Result<InsertOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| self.fail("opening a transaction", e))?;

        match db::insert_mapping(&mut *tx, code, origin).await {
            Ok(()) => {
                tx.commit()
                    .await
                    .map_err(|e| self.fail(format!("committing '{code}' -> '{origin}'"), e))?;
                Ok(InsertOutcome::Committed)
            }
            Err(e) if db::is_unique_violation(&e) => {
                tx.rollback()
                    .await
                    .map_err(|e| self.fail("rolling back a conflicting insert", e))?;
                Ok(InsertOutcome::Conflict)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    self.diagnostics
                        .error(&format!("rollback after failed insert also failed: {rollback}"));
                }
                Err(self.fail(format!("inserting '{code}' -> '{origin}'"), e))
            }
        }
    }

    fn fail(&self, context: impl Into<String>, source: sqlx::Error) -> StoreError {
        let err = StoreError::storage(context, source);
        self.diagnostics.error(&err.to_string());
        err
    }
}

impl std::fmt::Debug for UrlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlStore")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
