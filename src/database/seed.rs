use sha2::{Digest, Sha256};
use sqlx::MySqlPool;
use tracing::info;

use crate::database::models::{Account, Priority, Role, SlaPolicy};
use crate::database::LifecycleError;

/// Default account seeded out of the box. `password` is the plaintext shown
/// in the credential summary; only its digest is stored.
pub struct DefaultAccount {
    pub name: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub role: Role,
}

pub struct DefaultSla {
    pub name: &'static str,
    pub priority: Priority,
    pub response_time_hours: i32,
    pub resolution_time_hours: i32,
}

pub const DEFAULT_ACCOUNTS: &[DefaultAccount] = &[
    DefaultAccount {
        name: "SuperAdmin User",
        email: "superadmin@helpdesk.com",
        password: "superadmin123",
        role: Role::Superadmin,
    },
    DefaultAccount {
        name: "Admin User",
        email: "admin@helpdesk.com",
        password: "admin123",
        role: Role::Admin,
    },
    DefaultAccount {
        name: "Manager User",
        email: "manager@helpdesk.com",
        password: "manager123",
        role: Role::Manager,
    },
    DefaultAccount {
        name: "Agent User 1",
        email: "agent1@helpdesk.com",
        password: "agent123",
        role: Role::Agent,
    },
    DefaultAccount {
        name: "Agent User 2",
        email: "agent2@helpdesk.com",
        password: "agent123",
        role: Role::Agent,
    },
    DefaultAccount {
        name: "Test User",
        email: "user@helpdesk.com",
        password: "user123",
        role: Role::User,
    },
];

pub const DEFAULT_SLAS: &[DefaultSla] = &[
    DefaultSla {
        name: "Low Priority SLA",
        priority: Priority::Low,
        response_time_hours: 24,
        resolution_time_hours: 72,
    },
    DefaultSla {
        name: "Medium Priority SLA",
        priority: Priority::Medium,
        response_time_hours: 8,
        resolution_time_hours: 24,
    },
    DefaultSla {
        name: "High Priority SLA",
        priority: Priority::High,
        response_time_hours: 2,
        resolution_time_hours: 8,
    },
    DefaultSla {
        name: "Urgent Priority SLA",
        priority: Priority::Urgent,
        response_time_hours: 1,
        resolution_time_hours: 4,
    },
];

/// Idempotent account seeding, keyed by email. Returns the number of rows
/// created; 0 against an already-seeded store.
pub async fn ensure_default_accounts(pool: &MySqlPool) -> Result<u64, LifecycleError> {
    let mut created = 0;
    for account in DEFAULT_ACCOUNTS {
        if account_exists(pool, account.email).await? {
            continue;
        }
        let row = insert_account(pool, account).await?;
        info!("Created default account: {} ({})", row.email, row.role.as_str());
        created += 1;
    }
    Ok(created)
}

/// Idempotent SLA seeding, keyed by priority tier.
pub async fn ensure_default_slas(pool: &MySqlPool) -> Result<u64, LifecycleError> {
    let mut created = 0;
    for sla in DEFAULT_SLAS {
        if sla_exists(pool, sla.priority).await? {
            continue;
        }
        let row = insert_sla(pool, sla).await?;
        info!("Created default SLA: {}", row.name);
        created += 1;
    }
    Ok(created)
}

/// Unconditional inserts, used only by the reset utility where a destructive
/// schema synchronize is guaranteed to have run first.
pub async fn insert_default_accounts(pool: &MySqlPool) -> Result<(), LifecycleError> {
    for account in DEFAULT_ACCOUNTS {
        let row = insert_account(pool, account).await?;
        println!("  [OK] Created: {} ({})", row.email, row.role.as_str());
    }
    Ok(())
}

pub async fn insert_default_slas(pool: &MySqlPool) -> Result<(), LifecycleError> {
    for sla in DEFAULT_SLAS {
        let row = insert_sla(pool, sla).await?;
        println!("  [OK] Created SLA: {}", row.name);
    }
    Ok(())
}

async fn account_exists(pool: &MySqlPool, email: &str) -> Result<bool, LifecycleError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await
        .map_err(LifecycleError::Seed)?;
    Ok(count > 0)
}

async fn sla_exists(pool: &MySqlPool, priority: Priority) -> Result<bool, LifecycleError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sla_policies WHERE priority = ?")
        .bind(priority.as_str())
        .fetch_one(pool)
        .await
        .map_err(LifecycleError::Seed)?;
    Ok(count > 0)
}

async fn insert_account(pool: &MySqlPool, account: &DefaultAccount) -> Result<Account, LifecycleError> {
    let result = sqlx::query(
        "INSERT INTO accounts (name, email, password_digest, role) VALUES (?, ?, ?, ?)",
    )
    .bind(account.name)
    .bind(account.email)
    .bind(password_digest(account.password))
    .bind(account.role.as_str())
    .execute(pool)
    .await
    .map_err(LifecycleError::Seed)?;

    sqlx::query_as::<_, Account>(
        "SELECT id, name, email, password_digest, role, created_at, updated_at \
         FROM accounts WHERE id = ?",
    )
    .bind(result.last_insert_id())
    .fetch_one(pool)
    .await
    .map_err(LifecycleError::Seed)
}

async fn insert_sla(pool: &MySqlPool, sla: &DefaultSla) -> Result<SlaPolicy, LifecycleError> {
    let result = sqlx::query(
        "INSERT INTO sla_policies (name, priority, response_time_hours, resolution_time_hours) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(sla.name)
    .bind(sla.priority.as_str())
    .bind(sla.response_time_hours)
    .bind(sla.resolution_time_hours)
    .execute(pool)
    .await
    .map_err(LifecycleError::Seed)?;

    sqlx::query_as::<_, SlaPolicy>(
        "SELECT id, name, priority, response_time_hours, resolution_time_hours, \
                created_at, updated_at \
         FROM sla_policies WHERE id = ?",
    )
    .bind(result.last_insert_id())
    .fetch_one(pool)
    .await
    .map_err(LifecycleError::Seed)
}

/// SHA-256 hex digest of a seed password. Seeded rows never store plaintext.
pub fn password_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Human-readable credential summary printed by both entry points.
pub fn credential_summary() -> String {
    let mut out = String::from("[CREDENTIALS] Default login credentials:\n\n");
    for account in DEFAULT_ACCOUNTS {
        out.push_str(&format!(
            "{:<18} {} / {}\n",
            format!("{}:", account.name),
            account.email,
            account.password
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_account_catalog() {
        assert_eq!(DEFAULT_ACCOUNTS.len(), 6);
        let superadmin = &DEFAULT_ACCOUNTS[0];
        assert_eq!(superadmin.email, "superadmin@helpdesk.com");
        assert_eq!(superadmin.role, Role::Superadmin);
        let agents: Vec<_> = DEFAULT_ACCOUNTS.iter().filter(|a| a.role == Role::Agent).collect();
        assert_eq!(agents.len(), 2);
    }

    #[test]
    fn account_emails_are_unique() {
        let mut emails: Vec<&str> = DEFAULT_ACCOUNTS.iter().map(|a| a.email).collect();
        emails.sort();
        emails.dedup();
        assert_eq!(emails.len(), DEFAULT_ACCOUNTS.len());
    }

    #[test]
    fn fixed_sla_catalog() {
        assert_eq!(DEFAULT_SLAS.len(), 4);
        let hours: Vec<(i32, i32)> = DEFAULT_SLAS
            .iter()
            .map(|s| (s.response_time_hours, s.resolution_time_hours))
            .collect();
        assert_eq!(hours, vec![(24, 72), (8, 24), (2, 8), (1, 4)]);
        let urgent = &DEFAULT_SLAS[3];
        assert_eq!(urgent.priority, Priority::Urgent);
        assert_eq!(urgent.name, "Urgent Priority SLA");
    }

    #[test]
    fn one_sla_per_priority_tier() {
        let mut tiers: Vec<&str> = DEFAULT_SLAS.iter().map(|s| s.priority.as_str()).collect();
        tiers.sort();
        tiers.dedup();
        assert_eq!(tiers.len(), DEFAULT_SLAS.len());
    }

    #[test]
    fn password_digest_is_stable_sha256_hex() {
        let digest = password_digest("admin123");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, password_digest("admin123"));
        assert_ne!(digest, password_digest("admin124"));
    }

    #[test]
    fn credential_summary_lists_every_account() {
        let summary = credential_summary();
        for account in DEFAULT_ACCOUNTS {
            assert!(summary.contains(account.email));
            assert!(summary.contains(account.password));
        }
    }
}
