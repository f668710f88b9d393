use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use rusqlite::{Connection, OptionalExtension};

/// Fixed session lifetime. The login flow always uses this one TTL.
pub const SESSION_TTL_DAYS: i64 = 7;

/// Public identity of an authenticated teacher. The password hash never
/// leaves the auth module.
#[derive(Debug, Clone)]
pub struct Teacher {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Creates a session for `teacher_id` and returns the opaque token the
/// client presents on subsequent requests.
pub fn create(conn: &Connection, teacher_id: &str) -> Result<String, rusqlite::Error> {
    let token = new_token();
    let expires_at = (Utc::now() + Duration::days(SESSION_TTL_DAYS)).to_rfc3339();
    conn.execute(
        "INSERT INTO sessions(token, teacher_id, expires_at) VALUES(?, ?, ?)",
        (&token, teacher_id, &expires_at),
    )?;
    Ok(token)
}

/// Looks up a non-expired session. Absence and expiry are normal outcomes,
/// not errors; expired rows are left in place (lazy expiry, no sweep).
pub fn resolve(conn: &Connection, token: &str) -> Result<Option<Teacher>, rusqlite::Error> {
    let row = conn
        .query_row(
            "SELECT t.id, t.name, t.email, s.expires_at
             FROM sessions s
             JOIN teachers t ON t.id = s.teacher_id
             WHERE s.token = ?",
            [token],
            |r| {
                Ok((
                    Teacher {
                        id: r.get(0)?,
                        name: r.get(1)?,
                        email: r.get(2)?,
                    },
                    r.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((teacher, expires_at)) = row else {
        return Ok(None);
    };
    let still_valid = DateTime::parse_from_rfc3339(&expires_at)
        .map(|exp| exp > Utc::now())
        .unwrap_or(false);
    Ok(if still_valid { Some(teacher) } else { None })
}

/// Deletes the session row. Invalidating an absent token is not an error.
pub fn invalidate(conn: &Connection, token: &str) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM sessions WHERE token = ?", [token])?;
    Ok(())
}

// 32 random bytes, hex-encoded. OsRng is the OS CSPRNG.
fn new_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let mut out = String::with_capacity(64);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
