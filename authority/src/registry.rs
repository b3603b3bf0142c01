//! Persistent registry of organizations, licenses, and queued pushes.
//!
//! This is the authority's source of truth. Clients only ever see signed
//! snapshots of it (certificates); the admin console reads and mutates it
//! through the HTTP surface.

use crate::error::{AuthorityError, AuthorityResult};
use chrono::{DateTime, Months, Utc};
use rackside_license::{LicenseRecord, PushEnvelope};
use rackside_types::{GymId, OrgId, PushId};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A customer organization that licenses are issued under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub org_id: OrgId,
    pub name: String,
    pub email: Option<String>,
    /// Seed database shipped to new gyms of this organization, if any.
    pub template_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fleet-wide counters for the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub organizations: u64,
    pub licenses: u64,
    pub active: u64,
    pub revoked: u64,
    pub expired: u64,
    /// Licenses currently bound to a machine.
    pub bound: u64,
    pub pending_pushes: u64,
}

const LICENSE_COLUMNS: &str = "license_key, gym_id, gym_name, hardware_id, issued_at, \
     expires_at, active, app_version, last_sync";

const PUSH_COLUMNS: &str = "push_id, gym_id, file_name, size_bytes, sha256_hex, queued_at";

type LicenseRow = (
    String,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    i64,
    Option<String>,
    Option<String>,
);

type OrganizationRow = (String, String, Option<String>, Option<String>, String);

type PushRow = (String, String, String, i64, String, String);

/// Persistent store for the authority's registry, backed by SQLite.
pub struct Registry {
    conn: Arc<Mutex<Connection>>,
}

impl Registry {
    /// Opens (or creates) the registry at the given path.
    pub fn open(path: &Path) -> AuthorityResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| AuthorityError::Storage(format!("failed to open registry: {e}")))?;
        let registry = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        registry.init_schema()?;
        Ok(registry)
    }

    /// Opens an in-memory registry (for testing).
    pub fn open_in_memory() -> AuthorityResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            AuthorityError::Storage(format!("failed to open in-memory registry: {e}"))
        })?;
        let registry = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        registry.init_schema()?;
        Ok(registry)
    }

    fn init_schema(&self) -> AuthorityResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS organizations (
                org_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT,
                template_path TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS licenses (
                license_key TEXT PRIMARY KEY,
                gym_id TEXT NOT NULL UNIQUE,
                gym_name TEXT NOT NULL,
                org_id TEXT NOT NULL,
                hardware_id TEXT,
                issued_at TEXT NOT NULL,
                expires_at TEXT,
                active INTEGER NOT NULL DEFAULT 1,
                app_version TEXT,
                last_sync TEXT
            );

            CREATE TABLE IF NOT EXISTS pushes (
                push_id TEXT PRIMARY KEY,
                gym_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                sha256_hex TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                queued_at TEXT NOT NULL,
                delivered_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_pushes_gym ON pushes(gym_id, status);
            ",
        )
        .map_err(|e| AuthorityError::Storage(format!("failed to init registry schema: {e}")))?;
        Ok(())
    }

    // ── Organizations ────────────────────────────────────────────

    /// Creates a new organization and returns it.
    pub fn create_organization(
        &self,
        name: &str,
        email: Option<String>,
        template_path: Option<String>,
    ) -> AuthorityResult<Organization> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthorityError::InvalidRequest(
                "organization name must not be empty".to_string(),
            ));
        }
        let org = Organization {
            org_id: OrgId::new(),
            name: name.to_string(),
            email,
            template_path,
            created_at: Utc::now(),
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO organizations (org_id, name, email, template_path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                org.org_id.to_string(),
                org.name,
                org.email,
                org.template_path,
                org.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| AuthorityError::Storage(format!("failed to create organization: {e}")))?;
        Ok(org)
    }

    /// Looks up an organization by id.
    pub fn get_organization(&self, org_id: OrgId) -> AuthorityResult<Option<Organization>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT org_id, name, email, template_path, created_at
                 FROM organizations WHERE org_id = ?1",
                params![org_id.to_string()],
                |row| {
                    let org_id: String = row.get(0)?;
                    let name: String = row.get(1)?;
                    let email: Option<String> = row.get(2)?;
                    let template_path: Option<String> = row.get(3)?;
                    let created_at: String = row.get(4)?;
                    Ok((org_id, name, email, template_path, created_at))
                },
            )
            .optional()
            .map_err(|e| AuthorityError::Storage(format!("failed to load organization: {e}")))?;
        row.map(parse_organization).transpose()
    }

    /// Lists all organizations, alphabetically.
    pub fn list_organizations(&self) -> AuthorityResult<Vec<Organization>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT org_id, name, email, template_path, created_at
                 FROM organizations ORDER BY name ASC",
            )
            .map_err(|e| AuthorityError::Storage(format!("failed to list organizations: {e}")))?;
        let rows = stmt
            .query_map([], |row| {
                let org_id: String = row.get(0)?;
                let name: String = row.get(1)?;
                let email: Option<String> = row.get(2)?;
                let template_path: Option<String> = row.get(3)?;
                let created_at: String = row.get(4)?;
                Ok((org_id, name, email, template_path, created_at))
            })
            .map_err(|e| AuthorityError::Storage(format!("failed to list organizations: {e}")))?;

        let mut orgs = Vec::new();
        for row in rows {
            let row = row
                .map_err(|e| AuthorityError::Storage(format!("failed to read organization: {e}")))?;
            orgs.push(parse_organization(row)?);
        }
        Ok(orgs)
    }

    // ── Licenses ─────────────────────────────────────────────────

    /// Issues a fresh license under the given organization.
    ///
    /// `months_validity` of zero means perpetual. The gym's display name is
    /// copied from the organization at issue time.
    pub fn generate_license(
        &self,
        org_id: OrgId,
        months_validity: u32,
    ) -> AuthorityResult<LicenseRecord> {
        let org = self
            .get_organization(org_id)?
            .ok_or_else(|| AuthorityError::NotFound(format!("organization {org_id}")))?;

        let issued_at = Utc::now();
        let expires_at = match months_validity {
            0 => None,
            months => Some(add_months(issued_at, months)?),
        };
        let record = LicenseRecord {
            license_key: generate_license_key(),
            gym_id: GymId::new(),
            gym_name: org.name.clone(),
            hardware_id: None,
            issued_at,
            expires_at,
            active: true,
            app_version: None,
            last_sync: None,
        };

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO licenses (license_key, gym_id, gym_name, org_id, issued_at, expires_at, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
            params![
                record.license_key,
                record.gym_id.to_string(),
                record.gym_name,
                org.org_id.to_string(),
                record.issued_at.to_rfc3339(),
                record.expires_at.map(|d| d.to_rfc3339()),
            ],
        )
        .map_err(|e| AuthorityError::Storage(format!("failed to insert license: {e}")))?;
        Ok(record)
    }

    /// Looks up a license by its key.
    pub fn find_by_key(&self, license_key: &str) -> AuthorityResult<Option<LicenseRecord>> {
        self.find_license("license_key = ?1", license_key)
    }

    /// Looks up a license by its gym id.
    pub fn find_by_gym(&self, gym_id: GymId) -> AuthorityResult<Option<LicenseRecord>> {
        self.find_license("gym_id = ?1", &gym_id.to_string())
    }

    fn find_license(
        &self,
        predicate: &str,
        value: &str,
    ) -> AuthorityResult<Option<LicenseRecord>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {LICENSE_COLUMNS} FROM licenses WHERE {predicate}");
        let row = conn
            .query_row(&sql, params![value], license_row)
            .optional()
            .map_err(|e| AuthorityError::Storage(format!("failed to load license: {e}")))?;
        row.map(parse_license).transpose()
    }

    /// Lists every issued license, alphabetically by gym name.
    pub fn list_gyms(&self) -> AuthorityResult<Vec<LicenseRecord>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {LICENSE_COLUMNS} FROM licenses ORDER BY gym_name ASC, gym_id ASC");
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AuthorityError::Storage(format!("failed to list licenses: {e}")))?;
        let rows = stmt
            .query_map([], license_row)
            .map_err(|e| AuthorityError::Storage(format!("failed to list licenses: {e}")))?;

        let mut records = Vec::new();
        for row in rows {
            let row =
                row.map_err(|e| AuthorityError::Storage(format!("failed to read license: {e}")))?;
            records.push(parse_license(row)?);
        }
        Ok(records)
    }

    /// Validates an activation attempt and binds the license to the machine.
    ///
    /// Rejects unknown keys, revoked and expired licenses, and keys already
    /// bound to different hardware. Re-activating from the machine a license
    /// is already bound to succeeds and refreshes the binding.
    pub fn activate(
        &self,
        license_key: &str,
        hardware_id: &str,
        app_version: &str,
    ) -> AuthorityResult<LicenseRecord> {
        let record = self
            .find_by_key(license_key)?
            .ok_or_else(|| AuthorityError::InvalidKey(license_key.to_string()))?;

        // Revocation wins over expiry, matching the client's state derivation
        if !record.active {
            return Err(AuthorityError::Revoked);
        }
        let now = Utc::now();
        if record.is_expired_at(now) {
            let expired_on = record
                .expires_at
                .map(|d| d.to_rfc3339())
                .unwrap_or_default();
            return Err(AuthorityError::Expired(expired_on));
        }
        // Guarded update so two racing activations cannot both bind
        {
            let conn = self.conn.lock().unwrap();
            let changed = conn
                .execute(
                    "UPDATE licenses SET hardware_id = ?1, app_version = ?2, last_sync = ?3
                     WHERE license_key = ?4
                       AND (hardware_id IS NULL OR hardware_id = ?1)",
                    params![hardware_id, app_version, now.to_rfc3339(), license_key],
                )
                .map_err(|e| AuthorityError::Storage(format!("failed to bind license: {e}")))?;
            if changed == 0 {
                return Err(AuthorityError::AlreadyBound);
            }
        }
        self.find_by_key(license_key)?
            .ok_or_else(|| AuthorityError::Storage("license vanished during activation".to_string()))
    }

    /// Validates a periodic check-in and stamps the sync metadata.
    ///
    /// Only unknown keys and hardware mismatches fault here. Revoked and
    /// expired licenses check in successfully so that the re-signed
    /// certificate can carry the verdict to the client.
    pub fn checkin(
        &self,
        license_key: &str,
        hardware_id: &str,
        app_version: &str,
    ) -> AuthorityResult<LicenseRecord> {
        if self.find_by_key(license_key)?.is_none() {
            return Err(AuthorityError::InvalidKey(license_key.to_string()));
        }

        // An unbound license (fresh or after a hardware reset) has no machine
        // that is entitled to check in, so the stamp is guarded on the binding
        {
            let conn = self.conn.lock().unwrap();
            let changed = conn
                .execute(
                    "UPDATE licenses SET app_version = ?1, last_sync = ?2
                     WHERE license_key = ?3 AND hardware_id = ?4",
                    params![app_version, Utc::now().to_rfc3339(), license_key, hardware_id],
                )
                .map_err(|e| AuthorityError::Storage(format!("failed to stamp license: {e}")))?;
            if changed == 0 {
                return Err(AuthorityError::HardwareMismatch);
            }
        }
        self.find_by_key(license_key)?
            .ok_or_else(|| AuthorityError::Storage("license vanished during check-in".to_string()))
    }

    /// Revokes the gym's license. Idempotent; the hardware binding is kept
    /// so the gym's history stays intact.
    pub fn revoke(&self, gym_id: GymId) -> AuthorityResult<LicenseRecord> {
        {
            let conn = self.conn.lock().unwrap();
            let changed = conn
                .execute(
                    "UPDATE licenses SET active = 0 WHERE gym_id = ?1",
                    params![gym_id.to_string()],
                )
                .map_err(|e| AuthorityError::Storage(format!("failed to revoke license: {e}")))?;
            if changed == 0 {
                return Err(AuthorityError::NotFound(format!("gym {gym_id}")));
            }
        }
        self.require_gym(gym_id)
    }

    /// Clears the gym's hardware binding so the license can be activated on
    /// a replacement machine.
    pub fn reset_hardware(&self, gym_id: GymId) -> AuthorityResult<LicenseRecord> {
        {
            let conn = self.conn.lock().unwrap();
            let changed = conn
                .execute(
                    "UPDATE licenses SET hardware_id = NULL WHERE gym_id = ?1",
                    params![gym_id.to_string()],
                )
                .map_err(|e| {
                    AuthorityError::Storage(format!("failed to reset hardware id: {e}"))
                })?;
            if changed == 0 {
                return Err(AuthorityError::NotFound(format!("gym {gym_id}")));
            }
        }
        self.require_gym(gym_id)
    }

    /// Extends the gym's validity window by the given number of months,
    /// counted from the current expiry or from now, whichever is later.
    /// Zero months makes the license perpetual.
    pub fn extend_validity(&self, gym_id: GymId, months: u32) -> AuthorityResult<LicenseRecord> {
        let record = self.require_gym(gym_id)?;
        let expires_at = match months {
            0 => None,
            months => {
                let now = Utc::now();
                let base = match record.expires_at {
                    Some(current) if current > now => current,
                    _ => now,
                };
                Some(add_months(base, months)?)
            }
        };
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE licenses SET expires_at = ?1 WHERE gym_id = ?2",
                params![expires_at.map(|d| d.to_rfc3339()), gym_id.to_string()],
            )
            .map_err(|e| AuthorityError::Storage(format!("failed to extend license: {e}")))?;
        }
        self.require_gym(gym_id)
    }

    /// Deletes the gym's license and any queued pushes.
    pub fn delete_gym(&self, gym_id: GymId) -> AuthorityResult<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "DELETE FROM licenses WHERE gym_id = ?1",
                params![gym_id.to_string()],
            )
            .map_err(|e| AuthorityError::Storage(format!("failed to delete license: {e}")))?;
        if changed == 0 {
            return Err(AuthorityError::NotFound(format!("gym {gym_id}")));
        }
        conn.execute(
            "DELETE FROM pushes WHERE gym_id = ?1",
            params![gym_id.to_string()],
        )
        .map_err(|e| AuthorityError::Storage(format!("failed to delete pushes: {e}")))?;
        Ok(())
    }

    fn require_gym(&self, gym_id: GymId) -> AuthorityResult<LicenseRecord> {
        self.find_by_gym(gym_id)?
            .ok_or_else(|| AuthorityError::NotFound(format!("gym {gym_id}")))
    }

    /// Computes fleet-wide counters for the dashboard.
    pub fn stats(&self) -> AuthorityResult<Stats> {
        let organizations = self.count("SELECT COUNT(*) FROM organizations")?;
        let pending_pushes =
            self.count("SELECT COUNT(*) FROM pushes WHERE status = 'pending'")?;

        let now = Utc::now();
        let mut stats = Stats {
            organizations,
            licenses: 0,
            active: 0,
            revoked: 0,
            expired: 0,
            bound: 0,
            pending_pushes,
        };
        for record in self.list_gyms()? {
            stats.licenses += 1;
            if !record.active {
                stats.revoked += 1;
            } else if record.is_expired_at(now) {
                stats.expired += 1;
            } else {
                stats.active += 1;
            }
            if record.hardware_id.is_some() {
                stats.bound += 1;
            }
        }
        Ok(stats)
    }

    fn count(&self, sql: &str) -> AuthorityResult<u64> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(|e| AuthorityError::Storage(format!("failed to count rows: {e}")))?;
        Ok(n as u64)
    }

    // ── Pushes ───────────────────────────────────────────────────

    /// Queues a database push for a gym, superseding any pending one.
    pub fn queue_push(&self, envelope: &PushEnvelope) -> AuthorityResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM pushes WHERE gym_id = ?1 AND status = 'pending'",
            params![envelope.gym_id.to_string()],
        )
        .map_err(|e| AuthorityError::Storage(format!("failed to supersede push: {e}")))?;
        conn.execute(
            "INSERT INTO pushes (push_id, gym_id, file_name, size_bytes, sha256_hex, status, queued_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
            params![
                envelope.push_id.to_string(),
                envelope.gym_id.to_string(),
                envelope.file_name,
                envelope.size_bytes as i64,
                envelope.sha256_hex,
                envelope.queued_at.to_rfc3339(),
            ],
        )
        .map_err(|e| AuthorityError::Storage(format!("failed to queue push: {e}")))?;
        Ok(())
    }

    /// Returns the gym's pending push, if one is queued.
    pub fn pending_for(&self, gym_id: GymId) -> AuthorityResult<Option<PushEnvelope>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {PUSH_COLUMNS} FROM pushes
             WHERE gym_id = ?1 AND status = 'pending'
             ORDER BY queued_at DESC LIMIT 1"
        );
        let row = conn
            .query_row(&sql, params![gym_id.to_string()], push_row)
            .optional()
            .map_err(|e| AuthorityError::Storage(format!("failed to load pending push: {e}")))?;
        row.map(parse_push).transpose()
    }

    /// Looks up a push by id within a gym, regardless of status.
    pub fn find_push(
        &self,
        gym_id: GymId,
        push_id: PushId,
    ) -> AuthorityResult<Option<PushEnvelope>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {PUSH_COLUMNS} FROM pushes WHERE gym_id = ?1 AND push_id = ?2"
        );
        let row = conn
            .query_row(
                &sql,
                params![gym_id.to_string(), push_id.to_string()],
                push_row,
            )
            .optional()
            .map_err(|e| AuthorityError::Storage(format!("failed to load push: {e}")))?;
        row.map(parse_push).transpose()
    }

    /// Marks a push delivered. A no-op for unknown or already-acked ids, so
    /// clients can retry acknowledgements safely.
    pub fn ack(&self, push_id: PushId) -> AuthorityResult<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE pushes SET status = 'delivered', delivered_at = ?1
                 WHERE push_id = ?2 AND status = 'pending'",
                params![Utc::now().to_rfc3339(), push_id.to_string()],
            )
            .map_err(|e| AuthorityError::Storage(format!("failed to ack push: {e}")))?;
        if changed == 0 {
            tracing::debug!("Ack for push {} matched no pending row", push_id);
        }
        Ok(())
    }
}

/// Generates a fresh license key: `RSD-` plus four groups of five characters
/// from an alphabet without easily confused glyphs (no 0/O/1/I/L).
fn generate_license_key() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let chars: Vec<char> = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789".chars().collect();

    let mut group = || -> String {
        (0..5)
            .map(|_| chars[rng.gen_range(0..chars.len())])
            .collect()
    };

    format!("RSD-{}-{}-{}-{}", group(), group(), group(), group())
}

fn add_months(base: DateTime<Utc>, months: u32) -> AuthorityResult<DateTime<Utc>> {
    base.checked_add_months(Months::new(months))
        .ok_or_else(|| AuthorityError::InvalidRequest(format!("{months} months is out of range")))
}

fn license_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LicenseRow> {
    let license_key: String = row.get(0)?;
    let gym_id: String = row.get(1)?;
    let gym_name: String = row.get(2)?;
    let hardware_id: Option<String> = row.get(3)?;
    let issued_at: String = row.get(4)?;
    let expires_at: Option<String> = row.get(5)?;
    let active: i64 = row.get(6)?;
    let app_version: Option<String> = row.get(7)?;
    let last_sync: Option<String> = row.get(8)?;
    Ok((
        license_key,
        gym_id,
        gym_name,
        hardware_id,
        issued_at,
        expires_at,
        active,
        app_version,
        last_sync,
    ))
}

fn push_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PushRow> {
    let push_id: String = row.get(0)?;
    let gym_id: String = row.get(1)?;
    let file_name: String = row.get(2)?;
    let size_bytes: i64 = row.get(3)?;
    let sha256_hex: String = row.get(4)?;
    let queued_at: String = row.get(5)?;
    Ok((push_id, gym_id, file_name, size_bytes, sha256_hex, queued_at))
}

fn parse_license(row: LicenseRow) -> AuthorityResult<LicenseRecord> {
    let (license_key, gym_id, gym_name, hardware_id, issued_at, expires_at, active, app_version, last_sync) =
        row;
    Ok(LicenseRecord {
        license_key,
        gym_id: parse_gym_id(&gym_id)?,
        gym_name,
        hardware_id,
        issued_at: parse_timestamp(&issued_at)?,
        expires_at: expires_at.as_deref().map(parse_timestamp).transpose()?,
        active: active != 0,
        app_version,
        last_sync: last_sync.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn parse_organization(row: OrganizationRow) -> AuthorityResult<Organization> {
    let (org_id, name, email, template_path, created_at) = row;
    Ok(Organization {
        org_id: org_id
            .parse()
            .map_err(|e| AuthorityError::Storage(format!("bad org id in registry: {e}")))?,
        name,
        email,
        template_path,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn parse_push(row: PushRow) -> AuthorityResult<PushEnvelope> {
    let (push_id, gym_id, file_name, size_bytes, sha256_hex, queued_at) = row;
    Ok(PushEnvelope {
        push_id: push_id
            .parse()
            .map_err(|e| AuthorityError::Storage(format!("bad push id in registry: {e}")))?,
        gym_id: parse_gym_id(&gym_id)?,
        file_name,
        size_bytes: size_bytes as u64,
        sha256_hex,
        queued_at: parse_timestamp(&queued_at)?,
    })
}

fn parse_gym_id(raw: &str) -> AuthorityResult<GymId> {
    raw.parse()
        .map_err(|e| AuthorityError::Storage(format!("bad gym id in registry: {e}")))
}

fn parse_timestamp(raw: &str) -> AuthorityResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| AuthorityError::Storage(format!("bad timestamp in registry: {e}")))
}
