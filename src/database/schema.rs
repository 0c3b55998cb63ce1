use sqlx::{MySqlConnection, MySqlPool};
use tracing::{debug, info, warn};

use crate::database::provision::quote_identifier;
use crate::database::LifecycleError;

/// How to reconcile declared table shapes with the live schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Create missing tables and add missing columns; existing data survives.
    /// Used on normal service startup.
    Additive,
    /// Drop and recreate every table, discarding all data. Reset path only.
    Destructive,
}

/// Declared shape of one table: the full create statement plus the column
/// list used for additive diffs against `information_schema`.
pub struct TableSpec {
    pub name: &'static str,
    pub create_sql: &'static str,
    pub columns: &'static [(&'static str, &'static str)],
}

/// All tables in dependency order: parents before children, so creation runs
/// front-to-back and dropping runs back-to-front.
pub const TABLES: &[TableSpec] = &[
    TableSpec {
        name: "accounts",
        create_sql: "CREATE TABLE IF NOT EXISTS `accounts` (\
            `id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
            `name` VARCHAR(255) NOT NULL, \
            `email` VARCHAR(255) NOT NULL UNIQUE, \
            `password_digest` VARCHAR(64) NOT NULL, \
            `role` VARCHAR(16) NOT NULL DEFAULT 'user', \
            `created_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, \
            `updated_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP\
            )",
        columns: &[
            ("id", "BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY"),
            ("name", "VARCHAR(255) NOT NULL"),
            ("email", "VARCHAR(255) NOT NULL UNIQUE"),
            ("password_digest", "VARCHAR(64) NOT NULL"),
            ("role", "VARCHAR(16) NOT NULL DEFAULT 'user'"),
            ("created_at", "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"),
            ("updated_at", "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP"),
        ],
    },
    TableSpec {
        name: "sla_policies",
        create_sql: "CREATE TABLE IF NOT EXISTS `sla_policies` (\
            `id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
            `name` VARCHAR(255) NOT NULL, \
            `priority` VARCHAR(16) NOT NULL, \
            `response_time_hours` INT NOT NULL, \
            `resolution_time_hours` INT NOT NULL, \
            `created_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, \
            `updated_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP\
            )",
        columns: &[
            ("id", "BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY"),
            ("name", "VARCHAR(255) NOT NULL"),
            ("priority", "VARCHAR(16) NOT NULL"),
            ("response_time_hours", "INT NOT NULL"),
            ("resolution_time_hours", "INT NOT NULL"),
            ("created_at", "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"),
            ("updated_at", "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP"),
        ],
    },
    TableSpec {
        name: "tickets",
        create_sql: "CREATE TABLE IF NOT EXISTS `tickets` (\
            `id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
            `subject` VARCHAR(255) NOT NULL, \
            `description` TEXT, \
            `status` VARCHAR(16) NOT NULL DEFAULT 'open', \
            `priority` VARCHAR(16) NOT NULL DEFAULT 'medium', \
            `requester_id` BIGINT NOT NULL, \
            `assignee_id` BIGINT NULL, \
            `created_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, \
            `updated_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP, \
            FOREIGN KEY (`requester_id`) REFERENCES `accounts` (`id`), \
            FOREIGN KEY (`assignee_id`) REFERENCES `accounts` (`id`)\
            )",
        columns: &[
            ("id", "BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY"),
            ("subject", "VARCHAR(255) NOT NULL"),
            ("description", "TEXT"),
            ("status", "VARCHAR(16) NOT NULL DEFAULT 'open'"),
            ("priority", "VARCHAR(16) NOT NULL DEFAULT 'medium'"),
            ("requester_id", "BIGINT NOT NULL"),
            ("assignee_id", "BIGINT NULL"),
            ("created_at", "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"),
            ("updated_at", "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP"),
        ],
    },
    TableSpec {
        name: "comments",
        create_sql: "CREATE TABLE IF NOT EXISTS `comments` (\
            `id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
            `ticket_id` BIGINT NOT NULL, \
            `author_id` BIGINT NOT NULL, \
            `body` TEXT NOT NULL, \
            `created_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, \
            `updated_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP, \
            FOREIGN KEY (`ticket_id`) REFERENCES `tickets` (`id`), \
            FOREIGN KEY (`author_id`) REFERENCES `accounts` (`id`)\
            )",
        columns: &[
            ("id", "BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY"),
            ("ticket_id", "BIGINT NOT NULL"),
            ("author_id", "BIGINT NOT NULL"),
            ("body", "TEXT NOT NULL"),
            ("created_at", "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"),
            ("updated_at", "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP"),
        ],
    },
    TableSpec {
        name: "attachments",
        create_sql: "CREATE TABLE IF NOT EXISTS `attachments` (\
            `id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
            `ticket_id` BIGINT NOT NULL, \
            `uploader_id` BIGINT NOT NULL, \
            `file_name` VARCHAR(255) NOT NULL, \
            `file_path` VARCHAR(512) NOT NULL, \
            `created_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, \
            FOREIGN KEY (`ticket_id`) REFERENCES `tickets` (`id`), \
            FOREIGN KEY (`uploader_id`) REFERENCES `accounts` (`id`)\
            )",
        columns: &[
            ("id", "BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY"),
            ("ticket_id", "BIGINT NOT NULL"),
            ("uploader_id", "BIGINT NOT NULL"),
            ("file_name", "VARCHAR(255) NOT NULL"),
            ("file_path", "VARCHAR(512) NOT NULL"),
            ("created_at", "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"),
        ],
    },
    TableSpec {
        name: "notifications",
        create_sql: "CREATE TABLE IF NOT EXISTS `notifications` (\
            `id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
            `account_id` BIGINT NOT NULL, \
            `ticket_id` BIGINT NULL, \
            `message` VARCHAR(512) NOT NULL, \
            `is_read` BOOLEAN NOT NULL DEFAULT FALSE, \
            `created_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, \
            FOREIGN KEY (`account_id`) REFERENCES `accounts` (`id`), \
            FOREIGN KEY (`ticket_id`) REFERENCES `tickets` (`id`)\
            )",
        columns: &[
            ("id", "BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY"),
            ("account_id", "BIGINT NOT NULL"),
            ("ticket_id", "BIGINT NULL"),
            ("message", "VARCHAR(512) NOT NULL"),
            ("is_read", "BOOLEAN NOT NULL DEFAULT FALSE"),
            ("created_at", "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"),
        ],
    },
];

/// Reconcile the live schema with the declared table catalog.
pub async fn synchronize(pool: &MySqlPool, mode: SyncMode) -> Result<(), LifecycleError> {
    match mode {
        SyncMode::Additive => synchronize_additive(pool).await,
        SyncMode::Destructive => synchronize_destructive(pool).await,
    }
}

async fn synchronize_additive(pool: &MySqlPool) -> Result<(), LifecycleError> {
    for table in TABLES {
        sqlx::query(table.create_sql)
            .execute(pool)
            .await
            .map_err(LifecycleError::Schema)?;

        let existing = existing_columns(pool, table.name).await?;
        for statement in missing_column_statements(table, &existing) {
            debug!("Applying schema alteration: {}", statement);
            sqlx::query(&statement)
                .execute(pool)
                .await
                .map_err(LifecycleError::Schema)?;
        }
    }
    info!("Schema synchronized (additive)");
    Ok(())
}

async fn synchronize_destructive(pool: &MySqlPool) -> Result<(), LifecycleError> {
    for statement in drop_statements() {
        sqlx::query(&statement)
            .execute(pool)
            .await
            .map_err(LifecycleError::Schema)?;
    }
    for table in TABLES {
        sqlx::query(table.create_sql)
            .execute(pool)
            .await
            .map_err(LifecycleError::Schema)?;
    }
    info!("Schema synchronized (destructive)");
    Ok(())
}

/// Truncate then drop every table with referential-integrity enforcement
/// suspended, so ordering is unconstrained.
///
/// `FOREIGN_KEY_CHECKS` is a MySQL session variable, so the disable, every
/// truncate/drop, and the re-enable must all run on the same connection; one
/// connection is acquired from the pool and held for the whole sequence. The
/// re-enable statement runs on that connection on every exit path, including
/// when truncate or drop fails.
pub async fn truncate_and_drop_all(pool: &MySqlPool) -> Result<(), LifecycleError> {
    let mut conn = pool.acquire().await.map_err(LifecycleError::Schema)?;
    let mut runner = ConnectionRunner(&mut *conn);
    teardown_guarded(&mut runner).await
}

/// Executes one SQL statement. Seam between the teardown sequencing and the
/// live connection, so the guard's ordering is assertable without a server.
trait StatementRunner {
    async fn run(&mut self, sql: &str) -> Result<(), sqlx::Error>;
}

struct ConnectionRunner<'a>(&'a mut MySqlConnection);

impl StatementRunner for ConnectionRunner<'_> {
    async fn run(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        sqlx::query(sql).execute(&mut *self.0).await.map(|_| ())
    }
}

async fn teardown_guarded<R: StatementRunner>(runner: &mut R) -> Result<(), LifecycleError> {
    runner
        .run("SET FOREIGN_KEY_CHECKS = 0")
        .await
        .map_err(LifecycleError::Schema)?;

    let outcome = teardown_unordered(runner).await;

    let restored = runner.run("SET FOREIGN_KEY_CHECKS = 1").await;
    if let Err(ref e) = restored {
        warn!("Failed to re-enable foreign key checks: {}", e);
    }

    outcome?;
    restored.map_err(LifecycleError::Schema)?;
    Ok(())
}

async fn teardown_unordered<R: StatementRunner>(runner: &mut R) -> Result<(), LifecycleError> {
    for table in TABLES {
        let statement = format!("TRUNCATE TABLE {}", quote_identifier(table.name));
        // First reset against a fresh database has nothing to truncate;
        // unknown-table errors are skipped, matching DROP TABLE IF EXISTS below.
        if let Err(e) = runner.run(&statement).await {
            if !is_unknown_table(&e) {
                return Err(LifecycleError::Schema(e));
            }
        }
    }
    for statement in drop_statements() {
        runner.run(&statement).await.map_err(LifecycleError::Schema)?;
    }
    info!("Tables truncated and dropped");
    Ok(())
}

/// Drop statements in reverse dependency order, children before parents.
pub fn drop_statements() -> Vec<String> {
    TABLES
        .iter()
        .rev()
        .map(|t| format!("DROP TABLE IF EXISTS {}", quote_identifier(t.name)))
        .collect()
}

/// `ALTER TABLE .. ADD COLUMN` statements for declared columns absent from
/// the live schema.
pub fn missing_column_statements(table: &TableSpec, existing: &[String]) -> Vec<String> {
    table
        .columns
        .iter()
        .filter(|(name, _)| !existing.iter().any(|e| e.eq_ignore_ascii_case(name)))
        .map(|(name, ddl)| {
            format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                quote_identifier(table.name),
                quote_identifier(name),
                ddl
            )
        })
        .collect()
}

async fn existing_columns(pool: &MySqlPool, table: &str) -> Result<Vec<String>, LifecycleError> {
    sqlx::query_scalar(
        "SELECT column_name FROM information_schema.columns \
         WHERE table_schema = DATABASE() AND table_name = ?",
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(LifecycleError::Schema)
}

fn is_unknown_table(e: &sqlx::Error) -> bool {
    // SQLSTATE 42S02: table doesn't exist.
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("42S02"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_in_dependency_order() {
        let names: Vec<&str> = TABLES.iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["accounts", "sla_policies", "tickets", "comments", "attachments", "notifications"]
        );
    }

    #[test]
    fn drop_statements_reverse_creation_order() {
        let drops = drop_statements();
        assert_eq!(drops.first().unwrap(), "DROP TABLE IF EXISTS `notifications`");
        assert_eq!(drops.last().unwrap(), "DROP TABLE IF EXISTS `accounts`");
        assert_eq!(drops.len(), TABLES.len());
    }

    #[test]
    fn declared_columns_match_create_statements() {
        for table in TABLES {
            for (column, _) in table.columns {
                assert!(
                    table.create_sql.contains(&format!("`{}`", column)),
                    "{}.{} missing from create statement",
                    table.name,
                    column
                );
            }
        }
    }

    #[test]
    fn create_statements_are_idempotent_form() {
        for table in TABLES {
            assert!(table.create_sql.starts_with("CREATE TABLE IF NOT EXISTS"));
        }
    }

    #[test]
    fn missing_columns_produce_alter_statements() {
        let table = &TABLES[0]; // accounts
        let existing = vec![
            "id".to_string(),
            "name".to_string(),
            "email".to_string(),
            "password_digest".to_string(),
            "created_at".to_string(),
            "updated_at".to_string(),
        ];
        let statements = missing_column_statements(table, &existing);
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0],
            "ALTER TABLE `accounts` ADD COLUMN `role` VARCHAR(16) NOT NULL DEFAULT 'user'"
        );
    }

    #[test]
    fn no_alterations_when_all_columns_present() {
        let table = &TABLES[1]; // sla_policies
        let existing: Vec<String> = table
            .columns
            .iter()
            .map(|(name, _)| name.to_uppercase()) // information_schema casing varies
            .collect();
        assert!(missing_column_statements(table, &existing).is_empty());
    }

    struct RecordingRunner {
        statements: Vec<String>,
        fail_on: Option<&'static str>,
    }

    impl StatementRunner for RecordingRunner {
        async fn run(&mut self, sql: &str) -> Result<(), sqlx::Error> {
            self.statements.push(sql.to_string());
            match self.fail_on {
                Some(needle) if sql.contains(needle) => Err(sqlx::Error::PoolClosed),
                _ => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn teardown_disables_checks_first_and_restores_last() {
        let mut runner = RecordingRunner { statements: vec![], fail_on: None };
        teardown_guarded(&mut runner).await.unwrap();

        assert_eq!(runner.statements.first().unwrap(), "SET FOREIGN_KEY_CHECKS = 0");
        assert_eq!(runner.statements.last().unwrap(), "SET FOREIGN_KEY_CHECKS = 1");
        // one truncate and one drop per table between the toggles
        assert_eq!(runner.statements.len(), 2 + TABLES.len() * 2);
    }

    #[tokio::test]
    async fn checks_are_restored_even_when_truncate_fails() {
        let mut runner = RecordingRunner {
            statements: vec![],
            fail_on: Some("TRUNCATE TABLE `tickets`"),
        };
        let result = teardown_guarded(&mut runner).await;

        assert!(result.is_err());
        assert_eq!(runner.statements.last().unwrap(), "SET FOREIGN_KEY_CHECKS = 1");
        // the failing truncate aborted the phase, no drops were attempted
        assert!(!runner.statements.iter().any(|s| s.starts_with("DROP TABLE")));
    }

    #[tokio::test]
    async fn checks_are_restored_even_when_drop_fails() {
        let mut runner = RecordingRunner {
            statements: vec![],
            fail_on: Some("DROP TABLE IF EXISTS `accounts`"),
        };
        let result = teardown_guarded(&mut runner).await;

        assert!(result.is_err());
        assert_eq!(runner.statements.last().unwrap(), "SET FOREIGN_KEY_CHECKS = 1");
    }

    #[test]
    fn child_tables_reference_parents() {
        let tickets = TABLES.iter().find(|t| t.name == "tickets").unwrap();
        assert!(tickets.create_sql.contains("REFERENCES `accounts`"));
        let comments = TABLES.iter().find(|t| t.name == "comments").unwrap();
        assert!(comments.create_sql.contains("REFERENCES `tickets`"));
    }
}
