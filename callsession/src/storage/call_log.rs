use std::path::Path;

use anyhow::{Context as _, anyhow};
use async_trait::async_trait;
use tokio::sync::Mutex as TokioMutex;
use tokio_sqlite::{Connection, Value};

use crate::ending::{CallLogSink, CallSummary};
use crate::models::{CallLogEntry, ColumnIndex};

/// Call history kept in a sqlite database.
pub struct SqliteCallLog {
    connection: TokioMutex<Connection>,
}

impl SqliteCallLog {
    pub async fn open(path: &Path) -> Result<Self, anyhow::Error> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut connection = Connection::open(path)
            .await
            .with_context(|| format!("Failed to open call log at {}", path.display()))?;
        Self::create_tables(&mut connection).await?;
        Ok(Self {
            connection: TokioMutex::new(connection),
        })
    }

    pub async fn insert(&self, mut entry: CallLogEntry) -> Result<CallLogEntry, anyhow::Error> {
        let columns = CallLogEntry::columns().without("id");
        let values = entry.values(&columns);
        let query = format!(
            "INSERT INTO \"call_log\" ({}) VALUES ({})",
            columns.format_columns(),
            columns.format_placeholders(),
        );
        let mut connection = self.connection.lock().await;
        let status = connection.execute(query, values).await?;
        entry.id = status
            .last_insert_id()
            .ok_or(anyhow!("Cannot retrieve call log id"))?;
        Ok(entry)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<CallLogEntry>, anyhow::Error> {
        let mut entries = self
            .select("WHERE \"id\" = ?1", vec![Value::Integer(id)])
            .await?;
        Ok(entries.pop())
    }

    pub async fn latest(&self) -> Result<Option<CallLogEntry>, anyhow::Error> {
        let mut entries = self
            .select("ORDER BY \"timestamp\" DESC, \"id\" DESC LIMIT 1", Vec::new())
            .await?;
        Ok(entries.pop())
    }

    pub async fn latest_missed(&self) -> Result<Option<CallLogEntry>, anyhow::Error> {
        let mut entries = self
            .select(
                "WHERE \"direction\" = ?1 ORDER BY \"timestamp\" DESC, \"id\" DESC LIMIT 1",
                vec![Value::Text("Missed".to_string())],
            )
            .await?;
        Ok(entries.pop())
    }

    pub async fn all(&self) -> Result<Vec<CallLogEntry>, anyhow::Error> {
        self.select("ORDER BY \"timestamp\" DESC, \"id\" DESC", Vec::new())
            .await
    }

    async fn select(
        &self,
        clause: &str,
        params: Vec<Value>,
    ) -> Result<Vec<CallLogEntry>, anyhow::Error> {
        let columns: &ColumnIndex = CallLogEntry::columns();
        let query = format!(
            "SELECT {} FROM \"call_log\" {}",
            columns.format_columns(),
            clause
        );
        let mut connection = self.connection.lock().await;
        let mut rows = connection.query(query, params).await?;
        let mut result = Vec::new();
        while let Some(row) = rows.next().await {
            let row = row?;
            result.push(CallLogEntry::from_values(row.into_values(), columns)?);
        }
        Ok(result)
    }

    async fn create_tables(connection: &mut Connection) -> Result<(), anyhow::Error> {
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS \"call_log\" (
                    \"id\" INTEGER PRIMARY KEY AUTOINCREMENT,
                    \"phone_number\" TEXT NOT NULL,
                    \"display_name\" TEXT,
                    \"direction\" TEXT NOT NULL,
                    \"timestamp\" BIGINT NOT NULL,
                    \"duration_seconds\" BIGINT NOT NULL,
                    \"note\" TEXT,
                    \"tag\" TEXT
                )",
                Vec::<Value>::new(),
            )
            .await
            .context("Failed to create call_log table")?;
        connection
            .execute(
                "CREATE INDEX IF NOT EXISTS call_log__timestamp_idx
                     ON \"call_log\" (\"timestamp\")",
                Vec::<Value>::new(),
            )
            .await
            .context("Failed to create call_log__timestamp_idx index")?;
        Ok(())
    }
}

#[async_trait]
impl CallLogSink for SqliteCallLog {
    async fn persist(&self, summary: &CallSummary) -> Result<i64, anyhow::Error> {
        let entry = CallLogEntry {
            id: 0,
            phone_number: summary.number.clone(),
            display_name: summary.display_name.clone(),
            direction: summary.classification.as_str().to_string(),
            timestamp: summary.start_time,
            duration_seconds: summary.duration_seconds,
            note: None,
            tag: None,
        };
        let entry = self.insert(entry).await?;
        Ok(entry.id)
    }
}
