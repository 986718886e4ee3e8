use crate::database::AsyncDbConnection;
use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row};
use shared_types::Card;

pub async fn contact_exists(conn: AsyncDbConnection, email: &str) -> Result<bool> {
    let conn = conn.lock().await;

    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM contacts WHERE email = ? LIMIT 1",
            [email],
            |row| row.get(0),
        )
        .optional()?;

    Ok(found.is_some())
}

/// Insert the card, or overwrite every non-key column of the existing row
/// with the same email. The conditional update rides on the UNIQUE
/// constraint, so a check-then-write race between two writers cannot
/// produce two rows for one email.
///
/// Every column is replaced, nulls included: an incoming card with a null
/// phone clears a previously stored phone.
pub async fn upsert_contact(conn: AsyncDbConnection, card: &Card) -> Result<()> {
    let Some(email) = card.key() else {
        anyhow::bail!("cannot persist a contact without an email");
    };

    let conn = conn.lock().await;
    let now = chrono::Utc::now().timestamp();

    conn.execute(
        "INSERT INTO contacts
           (name, company, email, phone, department, job_title, qualification,
            company_address, company_url, company_phone, company_fax,
            created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
         ON CONFLICT(email) DO UPDATE SET
            name = excluded.name,
            company = excluded.company,
            phone = excluded.phone,
            department = excluded.department,
            job_title = excluded.job_title,
            qualification = excluded.qualification,
            company_address = excluded.company_address,
            company_url = excluded.company_url,
            company_phone = excluded.company_phone,
            company_fax = excluded.company_fax,
            updated_at = excluded.updated_at",
        params![
            card.name,
            card.company,
            email,
            card.phone,
            card.department,
            card.job_title,
            card.qualification,
            card.company_address,
            card.company_url,
            card.company_phone,
            card.company_fax,
            now,
        ],
    )?;

    Ok(())
}

pub async fn list_contacts(conn: AsyncDbConnection) -> Result<Vec<Card>> {
    let conn = conn.lock().await;

    let mut stmt = conn.prepare(
        "SELECT name, company, email, phone, department, job_title, qualification,
                company_address, company_url, company_phone, company_fax
         FROM contacts
         ORDER BY id",
    )?;

    let contacts = stmt
        .query_map([], card_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(contacts)
}

fn card_from_row(row: &Row) -> rusqlite::Result<Card> {
    Ok(Card {
        name: row.get(0)?,
        company: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        department: row.get(4)?,
        job_title: row.get(5)?,
        qualification: row.get(6)?,
        company_address: row.get(7)?,
        company_url: row.get(8)?,
        company_phone: row.get(9)?,
        company_fax: row.get(10)?,
        extraction_error: None,
    })
}
