use anyhow::Result;
use rusqlite::Connection;

use crate::record::CompanyRecord;

const DB_PATH: &str = "data/placements.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(parent) = std::path::Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS companies (
            name                  TEXT PRIMARY KEY,
            ctc_lpa               REAL,
            base_lpa              REAL,
            variable_lpa          REAL,
            bonus_lpa             REAL,
            esop_lpa              REAL,
            stipend_monthly       REAL,
            students_selected     INTEGER,
            students_shortlisted  INTEGER,
            offered_internship    INTEGER,
            converted_to_ppo      INTEGER,
            cgpa_cutoff           REAL,
            selection_date        TEXT,
            internship_months     INTEGER,
            is_result_confirmed   BOOLEAN NOT NULL DEFAULT 0,
            is_withdrawn          BOOLEAN NOT NULL DEFAULT 0,
            confidence            REAL NOT NULL DEFAULT 0.8,
            roles                 TEXT,
            engagement_types      TEXT,
            allowed_branches      TEXT,
            notes                 TEXT,
            created_at            TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS offer_profiles (
            id            INTEGER PRIMARY KEY,
            company_name  TEXT NOT NULL REFERENCES companies(name),
            role          TEXT NOT NULL,
            ctc_lpa       REAL NOT NULL,
            UNIQUE(company_name, role)
        );
        CREATE INDEX IF NOT EXISTS idx_profiles_company ON offer_profiles(company_name);

        CREATE TABLE IF NOT EXISTS raw_messages (
            id            INTEGER PRIMARY KEY,
            company_name  TEXT NOT NULL REFERENCES companies(name),
            seq           INTEGER NOT NULL,
            text          TEXT NOT NULL,
            UNIQUE(company_name, seq)
        );
        CREATE INDEX IF NOT EXISTS idx_messages_company ON raw_messages(company_name);
        ",
    )?;
    Ok(())
}

/// Replace every persisted row for the given records inside one transaction.
pub fn save_records(conn: &Connection, records: &[CompanyRecord]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut company_stmt = tx.prepare(
            "INSERT OR REPLACE INTO companies
             (name, ctc_lpa, base_lpa, variable_lpa, bonus_lpa, esop_lpa, stipend_monthly,
              students_selected, students_shortlisted, offered_internship, converted_to_ppo,
              cgpa_cutoff, selection_date, internship_months,
              is_result_confirmed, is_withdrawn, confidence,
              roles, engagement_types, allowed_branches, notes)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21)",
        )?;
        let mut clear_profiles = tx.prepare("DELETE FROM offer_profiles WHERE company_name = ?1")?;
        let mut clear_messages = tx.prepare("DELETE FROM raw_messages WHERE company_name = ?1")?;
        let mut profile_stmt = tx.prepare(
            "INSERT OR IGNORE INTO offer_profiles (company_name, role, ctc_lpa)
             VALUES (?1, ?2, ?3)",
        )?;
        let mut message_stmt = tx.prepare(
            "INSERT INTO raw_messages (company_name, seq, text) VALUES (?1, ?2, ?3)",
        )?;

        for r in records {
            let roles = join_set(r.roles.iter());
            let engagements: Vec<String> =
                r.engagement_types.iter().map(|e| e.to_string()).collect();
            let branches = join_set(r.eligibility.allowed_branches.iter());

            // Children first: REPLACE on the parent row would trip the
            // foreign keys otherwise.
            clear_profiles.execute(rusqlite::params![r.company_name])?;
            clear_messages.execute(rusqlite::params![r.company_name])?;

            company_stmt.execute(rusqlite::params![
                r.company_name,
                r.compensation.ctc_lpa,
                r.compensation.base_lpa,
                r.compensation.variable_lpa,
                r.compensation.bonus_lpa,
                r.compensation.esop_lpa,
                r.compensation.stipend_monthly,
                r.selection_stats.students_selected,
                r.selection_stats.students_shortlisted,
                r.selection_stats.offered_internship,
                r.selection_stats.converted_to_ppo,
                r.eligibility.cgpa_cutoff,
                r.timeline.selection_date,
                r.timeline.internship_duration_months,
                r.flags.is_result_confirmed,
                r.flags.is_withdrawn,
                r.flags.data_confidence_score,
                roles,
                engagements.join(", "),
                branches,
                r.notes,
            ])?;

            for p in &r.offer_profiles {
                profile_stmt.execute(rusqlite::params![r.company_name, p.role, p.ctc_lpa])?;
            }
            for (seq, text) in r.metadata.raw_messages.iter().enumerate() {
                message_stmt.execute(rusqlite::params![r.company_name, seq as i64, text])?;
            }
        }
    }
    tx.commit()?;
    Ok(())
}

fn join_set<'a>(items: impl Iterator<Item = &'a String>) -> String {
    items.map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}

// ── Overview ──

pub struct OverviewRow {
    pub name: String,
    pub ctc_lpa: Option<f64>,
    pub students_selected: Option<u32>,
    pub students_shortlisted: Option<u32>,
    pub profile_count: i64,
    pub is_result_confirmed: bool,
    pub is_withdrawn: bool,
    pub roles: String,
}

pub fn fetch_overview(
    conn: &Connection,
    confirmed_only: bool,
    withdrawn_only: bool,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let mut conditions = Vec::new();
    if confirmed_only {
        conditions.push("c.is_result_confirmed = 1");
    }
    if withdrawn_only {
        conditions.push("c.is_withdrawn = 1");
    }
    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT c.name, c.ctc_lpa, c.students_selected, c.students_shortlisted,
                (SELECT COUNT(*) FROM offer_profiles p WHERE p.company_name = c.name),
                c.is_result_confirmed, c.is_withdrawn, COALESCE(c.roles, '')
         FROM companies c{}
         ORDER BY c.ctc_lpa IS NULL, c.ctc_lpa DESC, c.name
         LIMIT {}",
        where_clause, limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(OverviewRow {
                name: row.get(0)?,
                ctc_lpa: row.get(1)?,
                students_selected: row.get(2)?,
                students_shortlisted: row.get(3)?,
                profile_count: row.get(4)?,
                is_result_confirmed: row.get(5)?,
                is_withdrawn: row.get(6)?,
                roles: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub companies: usize,
    pub profiles: usize,
    pub messages: usize,
    pub confirmed: usize,
    pub withdrawn: usize,
    pub with_ctc: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let companies: usize = conn.query_row("SELECT COUNT(*) FROM companies", [], |r| r.get(0))?;
    let profiles: usize =
        conn.query_row("SELECT COUNT(*) FROM offer_profiles", [], |r| r.get(0))?;
    let messages: usize =
        conn.query_row("SELECT COUNT(*) FROM raw_messages", [], |r| r.get(0))?;
    let confirmed: usize = conn.query_row(
        "SELECT COUNT(*) FROM companies WHERE is_result_confirmed = 1",
        [],
        |r| r.get(0),
    )?;
    let withdrawn: usize = conn.query_row(
        "SELECT COUNT(*) FROM companies WHERE is_withdrawn = 1",
        [],
        |r| r.get(0),
    )?;
    let with_ctc: usize = conn.query_row(
        "SELECT COUNT(*) FROM companies WHERE ctc_lpa IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        companies,
        profiles,
        messages,
        confirmed,
        withdrawn,
        with_ctc,
    })
}
