//! SQLite storage layer.
//!
//! Durable home for orders, workers and producers. WAL mode for concurrent
//! readers. The connection sits behind a mutex; each call is one short
//! statement or transaction.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{Error, Result};
use crate::model::producer::{Producer, ProducerId};
use crate::model::worker::{Worker, WorkerId};
use crate::model::{NewOrder, Order, OrderId, OrderStats, State, Tier};

use super::{OrderStore, ProducerDirectory, WorkerStore};

const ORDER_COLUMNS: &str =
    "id, producer_id, tier, state, worker_id, created_at, updated_at, completed_at";

/// SQLite-backed implementation of every storage trait.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init()?;
        Ok(store)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS producers (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                tier        TEXT NOT NULL,
                retired     INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS workers (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT NOT NULL UNIQUE,
                name        TEXT NOT NULL,
                active      INTEGER NOT NULL DEFAULT 1,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS orders (
                seq           INTEGER PRIMARY KEY AUTOINCREMENT,
                id            TEXT NOT NULL UNIQUE,
                producer_id   TEXT NOT NULL,
                tier          TEXT NOT NULL,
                state         TEXT NOT NULL DEFAULT 'pending',
                worker_id     TEXT,
                created_at    TEXT NOT NULL,
                updated_at    TEXT NOT NULL,
                completed_at  TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_orders_state ON orders(state);
            CREATE INDEX IF NOT EXISTS idx_orders_worker ON orders(worker_id)
                WHERE worker_id IS NOT NULL;
            ",
        )?;

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Producers
    // -----------------------------------------------------------------------

    /// Register a producer and return it.
    pub fn add_producer(&self, name: impl Into<String>, tier: Tier) -> Result<Producer> {
        let producer = Producer::new(name, tier);
        self.conn.lock().execute(
            "INSERT INTO producers (id, name, tier, retired, created_at) VALUES (?1, ?2, ?3, 0, ?4)",
            params![
                producer.id.to_string(),
                producer.name,
                producer.tier.to_string(),
                producer.created_at.to_rfc3339(),
            ],
        )?;
        Ok(producer)
    }

    /// Retire a producer so it can no longer submit orders.
    pub fn retire_producer(&self, id: ProducerId) -> Result<()> {
        let changed = self.conn.lock().execute(
            "UPDATE producers SET retired = 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::UnknownProducer(id));
        }
        Ok(())
    }

    /// Update a single order column, failing if the order does not exist.
    fn touch_order(&self, id: OrderId, sql: &str, value: Option<String>) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn
            .lock()
            .execute(sql, params![value, now, id.to_string()])?;
        if changed == 0 {
            return Err(Error::OrderNotFound(id));
        }
        Ok(())
    }
}

impl ProducerDirectory for SqliteStore {
    fn lookup(&self, id: ProducerId) -> Result<Producer> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, name, tier, retired, created_at FROM producers WHERE id = ?1",
                params![id.to_string()],
                |row| Ok(row_to_producer(row)),
            )
            .optional()?
            .ok_or(Error::UnknownProducer(id))?
    }
}

impl OrderStore for SqliteStore {
    fn create(&self, new: NewOrder) -> Result<Order> {
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            producer: new.producer,
            tier: new.tier,
            state: State::Pending,
            worker: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        self.conn.lock().execute(
            "INSERT INTO orders (id, producer_id, tier, state, worker_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5)",
            params![
                order.id.to_string(),
                order.producer.to_string(),
                order.tier.to_string(),
                order.state.to_string(),
                now.to_rfc3339(),
            ],
        )?;
        Ok(order)
    }

    fn get(&self, id: OrderId) -> Result<Order> {
        self.conn
            .lock()
            .query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
                params![id.to_string()],
                |row| Ok(row_to_order(row)),
            )
            .optional()?
            .ok_or(Error::OrderNotFound(id))?
    }

    fn get_by_worker(&self, worker: WorkerId) -> Result<Vec<Order>> {
        query_orders(
            &self.conn.lock(),
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE worker_id = ?1 ORDER BY seq ASC"),
            params![worker.to_string()],
        )
    }

    fn set_state(&self, id: OrderId, state: State) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let current: String = tx
            .query_row(
                "SELECT state FROM orders WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(Error::OrderNotFound(id))?;
        let current = parse_state(&current)?;

        if !current.can_transition_to(state) {
            return Err(Error::InvalidTransition {
                from: current,
                to: state,
            });
        }

        let now = Utc::now().to_rfc3339();
        let completed_at = state.is_terminal().then(|| now.clone());
        tx.execute(
            "UPDATE orders SET state = ?1, updated_at = ?2, completed_at = COALESCE(?3, completed_at) WHERE id = ?4",
            params![state.to_string(), now, completed_at, id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn assign_worker(&self, id: OrderId, worker: WorkerId) -> Result<()> {
        self.touch_order(
            id,
            "UPDATE orders SET worker_id = ?1, updated_at = ?2 WHERE id = ?3",
            Some(worker.to_string()),
        )
    }

    fn clear_worker(&self, id: OrderId) -> Result<()> {
        self.touch_order(
            id,
            "UPDATE orders SET worker_id = ?1, updated_at = ?2 WHERE id = ?3",
            None,
        )
    }

    fn list_unfinished(&self) -> Result<Vec<Order>> {
        query_orders(
            &self.conn.lock(),
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE state != 'done' ORDER BY seq ASC"),
            [],
        )
    }

    fn list(&self, state: Option<State>, limit: usize) -> Result<Vec<Order>> {
        let conn = self.conn.lock();
        let limit = limit as i64;
        match state {
            Some(state) => query_orders(
                &conn,
                &format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE state = ?1 ORDER BY seq DESC LIMIT ?2"
                ),
                params![state.to_string(), limit],
            ),
            None => query_orders(
                &conn,
                &format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY seq DESC LIMIT ?1"),
                params![limit],
            ),
        }
    }

    fn stats(&self) -> Result<OrderStats> {
        let (completed, total): (i64, i64) = self.conn.lock().query_row(
            "SELECT COALESCE(SUM(state = 'done'), 0), COUNT(*) FROM orders",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(OrderStats {
            completed: completed as u64,
            incomplete: (total - completed) as u64,
        })
    }
}

impl WorkerStore for SqliteStore {
    fn save_worker(&self, worker: &Worker) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO workers (id, name, active, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, active = excluded.active",
            params![
                worker.id.to_string(),
                worker.name,
                worker.active,
                worker.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn set_worker_active(&self, id: WorkerId, active: bool) -> Result<()> {
        let changed = self.conn.lock().execute(
            "UPDATE workers SET active = ?1 WHERE id = ?2",
            params![active, id.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::UnknownWorker(id));
        }
        Ok(())
    }

    fn list_workers(&self) -> Result<Vec<Worker>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, name, active, created_at FROM workers ORDER BY seq ASC")?;

        let workers = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let created: String = row.get(3)?;
                Ok((id, row.get(1)?, row.get(2)?, created))
            })?
            .collect::<std::result::Result<Vec<(String, String, bool, String)>, _>>()?;

        workers
            .into_iter()
            .map(|(id, name, active, created)| {
                Ok(Worker {
                    id: id.parse().map_err(|e| parse_error("worker id", e))?,
                    name,
                    active,
                    created_at: parse_time(&created)?,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Row parsing helpers
// ---------------------------------------------------------------------------

fn query_orders(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Order>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| Ok(row_to_order(row)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().collect()
}

fn row_to_order(row: &rusqlite::Row) -> Result<Order> {
    let id: String = row.get(0)?;
    let producer: String = row.get(1)?;
    let tier: String = row.get(2)?;
    let state: String = row.get(3)?;
    let worker: Option<String> = row.get(4)?;
    let created: String = row.get(5)?;
    let updated: String = row.get(6)?;
    let completed: Option<String> = row.get(7)?;

    Ok(Order {
        id: id.parse().map_err(|e| parse_error("order id", e))?,
        producer: producer.parse().map_err(|e| parse_error("producer id", e))?,
        tier: tier.parse().map_err(Error::Persistence)?,
        state: parse_state(&state)?,
        worker: worker
            .map(|w| w.parse())
            .transpose()
            .map_err(|e| parse_error("worker id", e))?,
        created_at: parse_time(&created)?,
        updated_at: parse_time(&updated)?,
        completed_at: completed.as_deref().map(parse_time).transpose()?,
    })
}

fn row_to_producer(row: &rusqlite::Row) -> Result<Producer> {
    let id: String = row.get(0)?;
    let tier: String = row.get(2)?;
    let created: String = row.get(4)?;

    Ok(Producer {
        id: id.parse().map_err(|e| parse_error("producer id", e))?,
        name: row.get(1)?,
        tier: tier.parse().map_err(Error::Persistence)?,
        retired: row.get(3)?,
        created_at: parse_time(&created)?,
    })
}

fn parse_state(s: &str) -> Result<State> {
    s.parse().map_err(Error::Persistence)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Persistence(format!("invalid timestamp {s}: {e}")))
}

fn parse_error(what: &str, e: uuid::Error) -> Error {
    Error::Persistence(format!("invalid {what}: {e}"))
}
