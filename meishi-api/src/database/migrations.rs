use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    // Contacts table, one row per unique email
    conn.execute(
        "CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name VARCHAR,
            company VARCHAR,
            email VARCHAR UNIQUE NOT NULL,
            phone VARCHAR,
            department VARCHAR,
            job_title VARCHAR,
            qualification VARCHAR,
            company_address VARCHAR,
            company_url VARCHAR,
            company_phone VARCHAR,
            company_fax VARCHAR,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )",
        [],
    )?;

    Ok(())
}
