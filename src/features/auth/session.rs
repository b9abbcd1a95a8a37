use crate::features::auth::models::{Session, SessionError};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::RngCore;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

/// セッションの有効日数
pub const SESSION_LIFETIME_DAYS: i64 = 30;

/// セッション管理を行う構造体
#[derive(Clone)]
pub struct SessionManager {
    /// データベース接続
    db_connection: Arc<Mutex<Connection>>,
    /// 暗号化キー
    encryption_key: Vec<u8>,
}

impl SessionManager {
    /// 新しいSessionManagerを作成する
    ///
    /// # 引数
    /// * `db_connection` - データベース接続
    /// * `encryption_key` - セッション暗号化用のキー
    ///
    /// # 戻り値
    /// SessionManagerインスタンス
    pub fn new(db_connection: Arc<Mutex<Connection>>, encryption_key: String) -> Self {
        // 暗号化キーを32バイトに調整
        let mut key_bytes = encryption_key.as_bytes().to_vec();
        key_bytes.resize(32, 0); // 32バイトに調整（不足分は0で埋める）

        Self {
            db_connection,
            encryption_key: key_bytes,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SessionError> {
        self.db_connection
            .lock()
            .map_err(|e| SessionError::DatabaseError(format!("データベースロックエラー: {e}")))
    }

    /// セッションを作成する
    ///
    /// # 引数
    /// * `user_id` - ユーザーID
    /// * `email` - メールアドレス
    ///
    /// # 戻り値
    /// 作成されたセッション情報
    pub fn create_session(&self, user_id: &str, email: &str) -> Result<Session, SessionError> {
        self.create_session_at(user_id, email, Utc::now())
    }

    /// 作成時刻を指定してセッションを作成する
    fn create_session_at(
        &self,
        user_id: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, SessionError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let expires_at = now + Duration::days(SESSION_LIFETIME_DAYS);

        let session = Session {
            id: session_id.clone(),
            user_id: user_id.to_string(),
            email: email.to_string(),
            expires_at: timestamp(expires_at),
            created_at: timestamp(now),
        };

        // データベースにセッションを保存
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sessions (id, user_id, email, expires_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id,
                session.user_id,
                session.email,
                session.expires_at,
                session.created_at
            ],
        )?;

        log::info!("セッションを作成しました: user_id={user_id}, session_id={session_id}");
        Ok(session)
    }

    /// セッションを検証する
    ///
    /// 期限切れのセッションは削除したうえで `Expired` を返す。
    ///
    /// # 引数
    /// * `token` - 暗号化されたセッショントークン
    ///
    /// # 戻り値
    /// 検証されたセッション情報
    pub fn validate_session(&self, token: &str) -> Result<Session, SessionError> {
        // トークンを復号化してセッションIDを取得
        let session_id = self.decrypt_token(token)?;

        let session = {
            let conn = self.lock()?;
            let result = conn.query_row(
                "SELECT id, user_id, email, expires_at, created_at FROM sessions WHERE id = ?1",
                params![session_id],
                |row| {
                    Ok(Session {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        email: row.get(2)?,
                        expires_at: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            );

            match result {
                Ok(session) => session,
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    return Err(SessionError::NotFound);
                }
                Err(e) => {
                    return Err(SessionError::DatabaseError(e.to_string()));
                }
            }
        };

        let expires_at = DateTime::parse_from_rfc3339(&session.expires_at)
            .map_err(|e| SessionError::DatabaseError(format!("有効期限の解析エラー: {e}")))?
            .with_timezone(&Utc);

        // セッションの有効期限をチェック
        if expires_at < Utc::now() {
            // 期限切れセッションを削除
            let _ = self.invalidate_session(&session.id);
            return Err(SessionError::Expired);
        }

        log::debug!(
            "セッションを検証しました: user_id={}, session_id={}",
            session.user_id,
            session.id
        );
        Ok(session)
    }

    /// セッションを無効化する
    ///
    /// # 引数
    /// * `session_id` - セッションID
    pub fn invalidate_session(&self, session_id: &str) -> Result<(), SessionError> {
        let conn = self.lock()?;
        let affected_rows =
            conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;

        if affected_rows > 0 {
            log::info!("セッションを無効化しました: session_id={session_id}");
        } else {
            log::warn!("無効化対象のセッションが見つかりませんでした: session_id={session_id}");
        }

        Ok(())
    }

    /// セッションIDを暗号化してトークンを生成する
    ///
    /// # 引数
    /// * `session_id` - セッションID
    ///
    /// # 戻り値
    /// 暗号化されたトークン
    pub fn encrypt_session_id(&self, session_id: &str) -> Result<String, SessionError> {
        let cipher = Aes256Gcm::new_from_slice(&self.encryption_key)
            .map_err(|e| SessionError::EncryptionError(e.to_string()))?;

        // ランダムなナンス（12バイト）を生成
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        // セッションIDを暗号化
        let ciphertext = cipher
            .encrypt(nonce, session_id.as_bytes())
            .map_err(|e| SessionError::EncryptionError(e.to_string()))?;

        // ナンスと暗号文を結合してBase64エンコード
        let mut token_bytes = nonce_bytes.to_vec();
        token_bytes.extend_from_slice(&ciphertext);
        let token = general_purpose::STANDARD.encode(&token_bytes);

        Ok(token)
    }

    /// トークンを復号化してセッションIDを取得する
    ///
    /// # 引数
    /// * `token` - 暗号化されたトークン
    ///
    /// # 戻り値
    /// セッションID
    fn decrypt_token(&self, token: &str) -> Result<String, SessionError> {
        // Base64デコード
        let token_bytes = general_purpose::STANDARD
            .decode(token.trim())
            .map_err(|e| SessionError::DecryptionError(format!("Base64デコードエラー: {e}")))?;

        if token_bytes.len() < 12 {
            return Err(SessionError::DecryptionError(
                "トークンが短すぎます".to_string(),
            ));
        }

        // ナンスと暗号文を分離
        let (nonce_bytes, ciphertext) = token_bytes.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&self.encryption_key)
            .map_err(|e| SessionError::DecryptionError(e.to_string()))?;

        // 復号化
        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| SessionError::DecryptionError(e.to_string()))?;

        let session_id = String::from_utf8(plaintext)
            .map_err(|e| SessionError::DecryptionError(format!("UTF-8変換エラー: {e}")))?;

        Ok(session_id)
    }

    /// 期限切れセッションをクリーンアップする
    ///
    /// # 戻り値
    /// 削除されたセッション数
    pub fn cleanup_expired_sessions(&self) -> Result<usize, SessionError> {
        let now = timestamp(Utc::now());
        let conn = self.lock()?;

        let affected_rows =
            conn.execute("DELETE FROM sessions WHERE expires_at < ?1", params![now])?;

        if affected_rows > 0 {
            log::info!("期限切れセッションを{affected_rows}件削除しました");
        }

        Ok(affected_rows)
    }
}

/// UTCの秒精度RFC3339文字列（文字列比較で時刻順になる）
fn timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}
