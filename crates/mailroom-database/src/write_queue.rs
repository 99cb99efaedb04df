//! Serialized write path in front of the store.
//!
//! Every mutation in the process goes through this queue. A single worker
//! thread owns the sole writer connection, applies each job with bounded
//! retries on transient failures, and issues periodic WAL checkpoints.
//! Submitters await a oneshot future and always observe a definite outcome;
//! retries are visible only as latency.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rusqlite::types::Value;
use rusqlite::{Connection, ErrorCode, TransactionBehavior};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use mailroom_core::error::{AppError, ErrorKind};
use mailroom_core::result::AppResult;

use crate::store::Store;

/// Checkpoint after this many successful write transactions.
const CHECKPOINT_EVERY_TXNS: u64 = 1000;
/// Maximum applications of one job.
const MAX_ATTEMPTS: u32 = 3;
/// Backoff before each retry, in milliseconds.
const BACKOFF_MS: [u64; 3] = [100, 200, 400];
/// Queue depth beyond which submitters are shed with a `Busy` error.
const SOFT_DEPTH_LIMIT: usize = 1024;
/// How long the worker sleeps waiting for work before re-checking the
/// checkpoint timer.
const IDLE_TICK: Duration = Duration::from_secs(1);

/// One SQL statement with owned parameters, ready to cross threads.
#[derive(Debug, Clone)]
pub struct WriteStmt {
    /// The SQL text with `?n` placeholders.
    pub sql: String,
    /// Owned parameter values, in placeholder order.
    pub params: Vec<Value>,
}

impl WriteStmt {
    /// Create a statement.
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

enum Job {
    Exec {
        stmt: WriteStmt,
        reply: oneshot::Sender<AppResult<usize>>,
    },
    Batch {
        stmts: Vec<WriteStmt>,
        reply: oneshot::Sender<AppResult<()>>,
    },
}

struct QueueState {
    jobs: VecDeque<Job>,
    shutting_down: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    cvar: Condvar,
}

enum Tick {
    Job(Box<Job>),
    Idle,
    Drained,
}

impl Shared {
    fn next_job(&self) -> Tick {
        let mut state = self.state.lock().expect("write queue mutex poisoned");
        if let Some(job) = state.jobs.pop_front() {
            return Tick::Job(Box::new(job));
        }
        if state.shutting_down {
            return Tick::Drained;
        }
        let (mut state, _timeout) = self
            .cvar
            .wait_timeout(state, IDLE_TICK)
            .expect("write queue mutex poisoned");
        if let Some(job) = state.jobs.pop_front() {
            Tick::Job(Box::new(job))
        } else if state.shutting_down {
            Tick::Drained
        } else {
            Tick::Idle
        }
    }
}

/// The in-process write serializer. One per store; shared via `Arc`.
pub struct WriteQueue {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WriteQueue {
    /// Start the worker thread against the given store.
    pub fn start(store: Store, checkpoint_interval: Duration) -> Arc<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                shutting_down: false,
            }),
            cvar: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("mailroom-writer".to_string())
            .spawn(move || worker_loop(store, worker_shared, checkpoint_interval))
            .expect("failed to spawn write queue worker");

        info!("Write queue worker started");
        Arc::new(Self {
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Submit one mutation and await its outcome (rows affected).
    pub async fn submit(&self, stmt: WriteStmt) -> AppResult<usize> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(Job::Exec { stmt, reply: tx })?;
        rx.await
            .map_err(|_| AppError::internal("Write queue worker exited"))?
    }

    /// Submit an atomic batch; either every statement applies or none does.
    pub async fn submit_batch(&self, stmts: Vec<WriteStmt>) -> AppResult<()> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(Job::Batch { stmts, reply: tx })?;
        rx.await
            .map_err(|_| AppError::internal("Write queue worker exited"))?
    }

    /// Current queue depth, for monitoring.
    pub fn depth(&self) -> usize {
        self.shared
            .state
            .lock()
            .expect("write queue mutex poisoned")
            .jobs
            .len()
    }

    /// Stop accepting work, drain in-flight jobs, checkpoint, and close.
    pub fn shutdown(&self) {
        {
            let mut state = self
                .shared
                .state
                .lock()
                .expect("write queue mutex poisoned");
            state.shutting_down = true;
        }
        self.shared.cvar.notify_all();
        if let Some(handle) = self
            .worker
            .lock()
            .expect("write queue worker mutex poisoned")
            .take()
        {
            if handle.join().is_err() {
                error!("Write queue worker panicked during shutdown");
            }
        }
        info!("Write queue worker stopped");
    }

    fn enqueue(&self, job: Job) -> AppResult<()> {
        let mut state = self
            .shared
            .state
            .lock()
            .expect("write queue mutex poisoned");
        if state.shutting_down {
            return Err(AppError::internal("Write queue is shutting down"));
        }
        if state.jobs.len() >= SOFT_DEPTH_LIMIT {
            return Err(AppError::busy("Write queue is saturated; retry later"));
        }
        state.jobs.push_back(job);
        drop(state);
        self.shared.cvar.notify_one();
        Ok(())
    }
}

fn worker_loop(store: Store, shared: Arc<Shared>, checkpoint_interval: Duration) {
    // The writer connection must exist for the process to function at all.
    let mut conn = match store.open_writer() {
        Ok(conn) => conn,
        Err(e) => {
            error!(error = %e, "Write queue worker failed to open the writer connection");
            std::process::exit(1);
        }
    };

    let mut tx_count: u64 = 0;
    let mut last_checkpoint = Instant::now();

    loop {
        match shared.next_job() {
            Tick::Job(job) => {
                match *job {
                    Job::Exec { stmt, reply } => {
                        let result = apply_with_retry(&conn, &stmt);
                        if result.is_ok() {
                            tx_count += 1;
                        }
                        let _ = reply.send(result);
                    }
                    Job::Batch { stmts, reply } => {
                        let result = apply_batch_with_retry(&mut conn, &stmts);
                        if result.is_ok() {
                            tx_count += 1;
                        }
                        let _ = reply.send(result);
                    }
                }
            }
            Tick::Idle => {}
            Tick::Drained => break,
        }

        if tx_count >= CHECKPOINT_EVERY_TXNS || last_checkpoint.elapsed() >= checkpoint_interval {
            checkpoint(&conn);
            tx_count = 0;
            last_checkpoint = Instant::now();
        }
    }

    checkpoint(&conn);
    debug!("Write queue worker drained and checkpointed");
}

fn apply_with_retry(conn: &Connection, stmt: &WriteStmt) -> AppResult<usize> {
    let mut attempt = 0;
    loop {
        match conn.execute(&stmt.sql, rusqlite::params_from_iter(stmt.params.iter())) {
            Ok(rows) => return Ok(rows),
            Err(e) if is_transient(&e) && attempt + 1 < MAX_ATTEMPTS => {
                warn!(attempt, error = %e, "Transient write failure; retrying");
                std::thread::sleep(Duration::from_millis(BACKOFF_MS[attempt as usize]));
                attempt += 1;
            }
            Err(e) => return Err(classify(e)),
        }
    }
}

fn apply_batch_with_retry(conn: &mut Connection, stmts: &[WriteStmt]) -> AppResult<()> {
    let mut attempt = 0;
    loop {
        match apply_batch_once(conn, stmts) {
            Ok(()) => return Ok(()),
            Err(e) if is_transient(&e) && attempt + 1 < MAX_ATTEMPTS => {
                warn!(attempt, error = %e, "Transient batch failure; retrying");
                std::thread::sleep(Duration::from_millis(BACKOFF_MS[attempt as usize]));
                attempt += 1;
            }
            Err(e) => return Err(classify(e)),
        }
    }
}

fn apply_batch_once(conn: &mut Connection, stmts: &[WriteStmt]) -> Result<(), rusqlite::Error> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    for stmt in stmts {
        tx.execute(&stmt.sql, rusqlite::params_from_iter(stmt.params.iter()))?;
    }
    tx.commit()
}

fn checkpoint(conn: &Connection) {
    if let Err(e) = conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);") {
        error!(error = %e, "Checkpoint failed");
    } else {
        debug!("Database checkpoint completed");
    }
}

fn is_transient(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::DatabaseBusy
                || failure.code == ErrorCode::DatabaseLocked
    )
}

/// Map a terminal database error to the application kind. Uniqueness
/// violations surface as `Conflict` so routes can answer 409.
fn classify(e: rusqlite::Error) -> AppError {
    let is_constraint = matches!(
        &e,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
    );
    if is_constraint {
        AppError::with_source(ErrorKind::Conflict, "Uniqueness constraint violated", e)
    } else {
        AppError::with_source(ErrorKind::Database, "Write failed", e)
    }
}
