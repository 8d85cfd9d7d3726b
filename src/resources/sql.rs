//! psql command generation
//!
//! The Job runs a single shell command: the SQL is written to `command.sql` and
//! executed with `psql -v ON_ERROR_STOP=1` so any SQL error fails the pod.

use crate::config::Action;

/// Build the shell command the Job container runs for an action
pub fn job_command(action: Action, database_name: &str) -> String {
    let sql = match action {
        Action::Create => create_database_sql(database_name),
        Action::Remove => drop_database_sql(database_name),
    };
    format!(
        "echo {} > command.sql && psql -v ON_ERROR_STOP=1 -f command.sql",
        shell_escape(&sql)
    )
}

/// `CREATE DATABASE` guarded by an existence check.
///
/// `CREATE DATABASE` cannot run inside a function or DO block, so the statement
/// is produced by a SELECT and executed by psql's `\gexec` only when the
/// database is missing.
pub fn create_database_sql(database_name: &str) -> String {
    let create = format!("CREATE DATABASE {}", quote_identifier(database_name));
    format!(
        "SELECT '{}' WHERE NOT EXISTS (SELECT FROM pg_database WHERE datname = '{}')\\gexec",
        escape_sql_string(&create),
        escape_sql_string(database_name)
    )
}

/// Unconditional `DROP DATABASE`
pub fn drop_database_sql(database_name: &str) -> String {
    format!("DROP DATABASE {}", quote_identifier(database_name))
}

/// Quote a SQL identifier
///
/// - `my_db` -> `"my_db"`
/// - `my"db` -> `"my""db"`
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape a SQL string literal by doubling single quotes
fn escape_sql_string(s: &str) -> String {
    s.replace('\'', "''")
}

/// Escape a string for use in a shell command
fn shell_escape(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\"'\"'"))
}
