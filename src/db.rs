use once_cell::sync::OnceCell;
use sea_orm::{Database, DatabaseConnection};

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

/// Connects to the database and stores the pool for process-wide use.
/// Panics if the connection fails or if called more than once.
pub async fn init_db(url: String) {
    let pool = Database::connect(&url)
        .await
        .expect("Failed to connect to database.");
    DB_POOL
        .set(pool)
        .expect("init_db() called more than once.");
}

/// Returns the process-wide database pool.
/// Panics if called before init_db().
pub fn get_db_pool() -> &'static DatabaseConnection {
    DB_POOL
        .get()
        .expect("get_db_pool() called before init_db().")
}
