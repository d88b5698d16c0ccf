//! `SQLite` implementation of [`AutomationRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use planhub_app::ports::AutomationRepository;
use planhub_domain::automation::{Action, Automation, ConditionGroup, Scope, Trigger};
use planhub_domain::error::{NotFoundError, PlanHubError};
use planhub_domain::id::AutomationId;
use planhub_domain::time::Timestamp;

use crate::error::StorageError;

struct Wrapper(Automation);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Automation> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let enabled: bool = row.try_get("enabled")?;
        let triggers_json: String = row.try_get("triggers")?;
        let conditions_json: Option<String> = row.try_get("conditions")?;
        let actions_json: String = row.try_get("actions")?;
        let scope_json: String = row.try_get("scope")?;
        let last_run_str: Option<String> = row.try_get("last_run")?;

        let triggers: Vec<Trigger> = serde_json::from_str(&triggers_json)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let conditions: Option<ConditionGroup> = conditions_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let actions: Vec<Action> = serde_json::from_str(&actions_json)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let scope: Scope = serde_json::from_str(&scope_json)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let last_run = last_run_str
            .map(|s| {
                chrono::DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.to_utc())
                    .map_err(|err| sqlx::Error::Decode(Box::new(err)))
            })
            .transpose()?;

        Ok(Self(Automation {
            id: AutomationId::from_uuid(id),
            name,
            enabled,
            triggers,
            conditions,
            actions,
            scope,
            last_run,
        }))
    }
}

/// `SQLite`-backed automation repository.
pub struct SqliteAutomationRepository {
    pool: SqlitePool,
}

impl SqliteAutomationRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AutomationRepository for SqliteAutomationRepository {
    async fn create(&self, automation: Automation) -> Result<Automation, PlanHubError> {
        let id = automation.id.as_uuid();
        let triggers_json =
            serde_json::to_string(&automation.triggers).map_err(StorageError::from)?;
        let conditions_json = automation
            .conditions
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(StorageError::from)?;
        let actions_json = serde_json::to_string(&automation.actions).map_err(StorageError::from)?;
        let scope_json = serde_json::to_string(&automation.scope).map_err(StorageError::from)?;
        let last_run = automation.last_run.map(|ts| ts.to_rfc3339());

        sqlx::query(
                "INSERT INTO automations (id, name, enabled, triggers, conditions, actions, scope, last_run) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(&automation.name)
            .bind(automation.enabled)
            .bind(&triggers_json)
            .bind(&conditions_json)
            .bind(&actions_json)
            .bind(&scope_json)
            .bind(&last_run)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(automation)
    }

    async fn get_by_id(&self, id: AutomationId) -> Result<Option<Automation>, PlanHubError> {
        let row: Option<Wrapper> = sqlx::query_as("SELECT * FROM automations WHERE id = ?")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn get_all(&self) -> Result<Vec<Automation>, PlanHubError> {
        let rows: Vec<Wrapper> = sqlx::query_as("SELECT * FROM automations ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn get_enabled(&self) -> Result<Vec<Automation>, PlanHubError> {
        let rows: Vec<Wrapper> =
            sqlx::query_as("SELECT * FROM automations WHERE enabled = 1 ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn update(&self, automation: Automation) -> Result<Automation, PlanHubError> {
        let id = automation.id.as_uuid();
        let triggers_json =
            serde_json::to_string(&automation.triggers).map_err(StorageError::from)?;
        let conditions_json = automation
            .conditions
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(StorageError::from)?;
        let actions_json = serde_json::to_string(&automation.actions).map_err(StorageError::from)?;
        let scope_json = serde_json::to_string(&automation.scope).map_err(StorageError::from)?;
        let last_run = automation.last_run.map(|ts| ts.to_rfc3339());

        sqlx::query(
                "UPDATE automations SET name = ?, enabled = ?, triggers = ?, conditions = ?, actions = ?, scope = ?, last_run = ? WHERE id = ?",
            )
            .bind(&automation.name)
            .bind(automation.enabled)
            .bind(&triggers_json)
            .bind(&conditions_json)
            .bind(&actions_json)
            .bind(&scope_json)
            .bind(&last_run)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(automation)
    }

    async fn delete(&self, id: AutomationId) -> Result<(), PlanHubError> {
        sqlx::query("DELETE FROM automations WHERE id = ?")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn touch_last_run(&self, id: AutomationId, at: Timestamp) -> Result<(), PlanHubError> {
        let result = sqlx::query("UPDATE automations SET last_run = ? WHERE id = ?")
            .bind(at.to_rfc3339())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(NotFoundError {
                entity: "Automation",
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
