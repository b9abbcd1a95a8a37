use crate::shared::errors::AppResult;
use rusqlite::Connection;
use std::path::Path;

/// データベース接続を開き、テーブルを作成する
///
/// # 引数
/// * `database_path` - データベースファイルのパス
///
/// # 戻り値
/// データベース接続、または失敗時はエラー
pub fn initialize_database(database_path: &Path) -> AppResult<Connection> {
    let conn = Connection::open(database_path)?;

    configure_connection(&conn)?;
    create_tables(&conn)?;

    log::info!("データベースを初期化しました: {database_path:?}");

    Ok(conn)
}

/// テスト用のインメモリデータベース接続を作成する
pub fn create_in_memory_connection() -> AppResult<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_connection(&conn)?;
    create_tables(&conn)?;
    Ok(conn)
}

/// 接続ごとのPRAGMAを設定する
fn configure_connection(conn: &Connection) -> AppResult<()> {
    // reminder_log の ON DELETE CASCADE に必要
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

/// データベーステーブルを作成する
pub fn create_tables(conn: &Connection) -> AppResult<()> {
    create_subscriptions_table(conn)?;
    create_sessions_table(conn)?;
    create_reminder_log_table(conn)?;
    Ok(())
}

/// サブスクリプションテーブルを作成する
fn create_subscriptions_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            provider TEXT,
            icon_key TEXT NOT NULL DEFAULT 'generic',
            price_cents INTEGER NOT NULL CHECK(price_cents >= 0 AND price_cents <= 100000000),
            currency TEXT NOT NULL DEFAULT 'EUR',
            cycle TEXT NOT NULL CHECK(cycle IN ('monthly', 'yearly', 'custom_days')),
            custom_days INTEGER,
            start_date TEXT,
            next_renewal_date TEXT,
            status TEXT NOT NULL DEFAULT 'active' CHECK(status IN ('active', 'paused', 'canceled')),
            is_trial INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK((cycle = 'custom_days' AND custom_days > 0) OR (cycle <> 'custom_days' AND custom_days IS NULL)),
            CHECK(status <> 'active' OR next_renewal_date IS NOT NULL)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subscriptions_renewal ON subscriptions(status, next_renewal_date)",
        [],
    )?;

    Ok(())
}

/// セッションテーブルを作成する
fn create_sessions_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            email TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)",
        [],
    )?;

    Ok(())
}

/// リマインダー送信履歴テーブルを作成する
fn create_reminder_log_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS reminder_log (
            subscription_id TEXT NOT NULL REFERENCES subscriptions(id) ON DELETE CASCADE,
            target_date TEXT NOT NULL,
            status INTEGER NOT NULL,
            sent_at TEXT NOT NULL,
            PRIMARY KEY (subscription_id, target_date)
        )",
        [],
    )?;

    Ok(())
}

/// テーブルに指定されたカラムが存在するかチェックする
#[cfg(test)]
fn check_column_exists(conn: &Connection, table_name: &str, column_name: &str) -> bool {
    let query = format!("PRAGMA table_info({table_name})");

    match conn.prepare(&query) {
        Ok(mut stmt) => match stmt.query_map([], |row| row.get::<_, String>(1)) {
            Ok(rows) => rows.flatten().any(|col_name| col_name == column_name),
            Err(_) => false,
        },
        Err(_) => false,
    }
}
