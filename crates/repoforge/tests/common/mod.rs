//! In-memory fake driver implementing `repoforge_core::runtime`'s
//! `Connection`/`Statement`/`Row` boundary, for exercising generated
//! repository methods without a real database.

use std::sync::{Arc, Mutex};

use repoforge_core::async_trait;
use repoforge_core::runtime::{Connection, DriverError, Row, Statement, Value};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct FakeRow {
    columns: Vec<(&'static str, Value)>,
}

impl FakeRow {
    pub fn new(columns: Vec<(&'static str, Value)>) -> Self {
        Self { columns }
    }
}

impl Row for FakeRow {
    fn get(&self, ordinal: usize) -> Option<&Value> {
        self.columns.get(ordinal).map(|(_, v)| v)
    }

    fn ordinal_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|(name, _)| *name == column)
    }
}

/// What a prepared statement should do when executed, set up by the test
/// before calling the repository method under test.
#[derive(Clone, Default)]
pub struct Script {
    pub rows: Vec<FakeRow>,
    pub scalar: Option<Value>,
    pub affected: u64,
}

/// Shared recorder: every `prepare()` call appends the SQL text here so
/// tests can assert on exactly what the emitter produced.
#[derive(Default)]
pub struct Recorder {
    pub prepared_sql: Mutex<Vec<String>>,
    pub bound: Mutex<Vec<Vec<(String, Value)>>>,
}

pub struct FakeConnection {
    open: Mutex<bool>,
    recorder: Arc<Recorder>,
    script: Script,
    native_batch: bool,
}

impl FakeConnection {
    pub fn new(recorder: Arc<Recorder>, script: Script) -> Self {
        Self { open: Mutex::new(false), recorder, script, native_batch: false }
    }

    pub fn with_native_batch(mut self, native: bool) -> Self {
        self.native_batch = native;
        self
    }
}

pub struct FakeStatement {
    sql: String,
    recorder: Arc<Recorder>,
    script: Script,
    binds: Vec<(String, Value)>,
}

#[async_trait]
impl Statement for FakeStatement {
    fn bind(&mut self, name: &str, value: Value) {
        self.binds.push((name.to_string(), value));
    }

    async fn execute_non_query(&mut self, cancel: &CancellationToken) -> Result<u64, DriverError> {
        self.recorder.bound.lock().unwrap().push(std::mem::take(&mut self.binds));
        if cancel.is_cancelled() {
            return Err(DriverError::Canceled);
        }
        Ok(self.script.affected)
    }

    async fn execute_scalar(&mut self, cancel: &CancellationToken) -> Result<Value, DriverError> {
        self.recorder.bound.lock().unwrap().push(std::mem::take(&mut self.binds));
        if cancel.is_cancelled() {
            return Err(DriverError::Canceled);
        }
        Ok(self.script.scalar.clone().unwrap_or(Value::Null))
    }

    async fn execute_reader(&mut self, cancel: &CancellationToken) -> Result<Vec<Box<dyn Row>>, DriverError> {
        self.recorder.bound.lock().unwrap().push(std::mem::take(&mut self.binds));
        if cancel.is_cancelled() {
            return Err(DriverError::Canceled);
        }
        Ok(self.script.rows.clone().into_iter().map(|r| Box::new(r) as Box<dyn Row>).collect())
    }
}

#[async_trait]
impl Connection for FakeConnection {
    fn is_open(&self) -> bool {
        *self.open.lock().unwrap()
    }

    async fn open(&mut self) -> Result<(), DriverError> {
        *self.open.lock().unwrap() = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        *self.open.lock().unwrap() = false;
        Ok(())
    }

    fn prepare(&self, sql: &str) -> Box<dyn Statement> {
        self.recorder.prepared_sql.lock().unwrap().push(sql.to_string());
        Box::new(FakeStatement { sql: sql.to_string(), recorder: self.recorder.clone(), script: self.script.clone(), binds: Vec::new() })
    }

    fn supports_native_batch(&self) -> bool {
        self.native_batch
    }
}

impl FakeStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }
}
