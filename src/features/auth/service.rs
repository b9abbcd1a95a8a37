use crate::features::auth::client::AuthProvider;
use crate::features::auth::models::{AuthError, Session, SignInResponse, User};
use crate::features::auth::session::SessionManager;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static EMAIL_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$"));

/// ワンタイムコード認証サービス
#[derive(Clone)]
pub struct AuthService {
    /// 認証プロバイダー
    provider: Arc<dyn AuthProvider>,
    /// セッション管理
    session_manager: SessionManager,
}

impl AuthService {
    /// 新しいAuthServiceを作成する
    ///
    /// # 引数
    /// * `provider` - 認証プロバイダー
    /// * `session_manager` - セッション管理
    pub fn new(provider: Arc<dyn AuthProvider>, session_manager: SessionManager) -> Self {
        log::info!("AuthServiceを初期化しました");
        Self {
            provider,
            session_manager,
        }
    }

    /// 認証プロバイダーを取得する（リマインダーのメールアドレス解決用）
    pub fn provider(&self) -> Arc<dyn AuthProvider> {
        Arc::clone(&self.provider)
    }

    /// メールアドレスにワンタイムコードを送信する
    pub async fn send_code(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email)?;
        self.provider.send_code(&email).await?;

        log::info!("サインインコードを要求しました: domain={}", email_domain(&email));
        Ok(())
    }

    /// ワンタイムコードを検証し、セッションを開始する
    ///
    /// # 引数
    /// * `email` - メールアドレス
    /// * `code` - 受信したコード（前後の空白は除去する）
    ///
    /// # 戻り値
    /// セッショントークンとユーザー情報
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<SignInResponse, AuthError> {
        let email = normalize_email(email)?;
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::InvalidCode("コードを入力してください".to_string()));
        }

        let user = self.provider.verify_code(&email, code).await?;
        let session_email = user.email.clone().unwrap_or_else(|| email.clone());

        let session = self.session_manager.create_session(&user.id, &session_email)?;
        let token = self.session_manager.encrypt_session_id(&session.id)?;

        log::info!("サインインしました: user_id={}", user.id);

        Ok(SignInResponse {
            token,
            user: User {
                id: user.id,
                email: Some(session_email),
            },
            expires_at: session.expires_at,
        })
    }

    /// ベアラートークンからセッションを解決する
    ///
    /// # 引数
    /// * `token` - Authorizationヘッダーのトークン（無ければNone）
    pub fn authenticate(&self, token: Option<&str>) -> Result<Session, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                log::warn!("認証トークンが提供されていません");
                AuthError::AuthenticationRequired
            })?;

        let session = self.session_manager.validate_session(token)?;
        Ok(session)
    }

    /// サインアウトする（セッションを破棄する）
    pub fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        self.session_manager.invalidate_session(&session.id)?;
        log::info!("サインアウトしました: user_id={}", session.user_id);
        Ok(())
    }

    /// 期限切れセッションを削除する
    pub fn cleanup_expired_sessions(&self) -> Result<usize, AuthError> {
        Ok(self.session_manager.cleanup_expired_sessions()?)
    }
}

/// メールアドレスを正規化し、形式を検証する
fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let pattern = EMAIL_PATTERN
        .as_ref()
        .map_err(|e| AuthError::ConfigError(format!("正規表現エラー: {e}")))?;

    if pattern.is_match(&email) {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail(email))
    }
}

/// ログ用にメールアドレスのドメイン部分だけを取り出す
fn email_domain(email: &str) -> &str {
    email.rsplit_once('@').map(|(_, domain)| domain).unwrap_or("")
}


#[cfg(test)]
mod tests {
    use super::fakes::FakeAuthProvider;
    use super::*;
    use crate::shared::database::create_in_memory_connection;
    use std::sync::Mutex;

    fn setup() -> (AuthService, Arc<FakeAuthProvider>) {
        let conn = create_in_memory_connection().unwrap();
        let session_manager = SessionManager::new(
            Arc::new(Mutex::new(conn)),
            "test_encryption_key_32_bytes_long".to_string(),
        );
        let provider = Arc::new(FakeAuthProvider::default());
        let service = AuthService::new(provider.clone(), session_manager);
        (service, provider)
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Anna@Example.COM ").unwrap(), "anna@example.com");
        assert!(matches!(normalize_email("anna"), Err(AuthError::InvalidEmail(_))));
        assert!(normalize_email("anna@example").is_err());
        assert!(normalize_email("an na@example.com").is_err());
        assert_eq!(email_domain("anna@example.com"), "example.com");
    }

    #[tokio::test]
    async fn test_send_code_validates_email() {
        let (service, provider) = setup();

        assert!(service.send_code("not-an-email").await.is_err());
        assert!(provider.sent_codes.lock().unwrap().is_empty());

        service.send_code(" Anna@Example.com").await.unwrap();
        assert_eq!(*provider.sent_codes.lock().unwrap(), vec!["anna@example.com"]);
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let (service, _) = setup();

        let response = service
            .verify_code("anna@example.com", " 123456 ")
            .await
            .unwrap();
        assert_eq!(response.user.id, FakeAuthProvider::user_id_for("anna@example.com"));

        let session = service.authenticate(Some(&response.token)).unwrap();
        assert_eq!(session.email, "anna@example.com");
        assert_eq!(session.user_id, response.user.id);

        service.sign_out(&session).unwrap();
        assert!(matches!(
            service.authenticate(Some(&response.token)),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_wrong_code_creates_no_session() {
        let (service, _) = setup();

        let result = service.verify_code("anna@example.com", "000000").await;
        assert!(matches!(result, Err(AuthError::InvalidCode(_))));

        let result = service.verify_code("anna@example.com", "   ").await;
        assert!(matches!(result, Err(AuthError::InvalidCode(_))));
    }

    #[test]
    fn test_authenticate_requires_token() {
        let (service, _) = setup();
        assert!(matches!(
            service.authenticate(None),
            Err(AuthError::AuthenticationRequired)
        ));
        assert!(matches!(
            service.authenticate(Some("  ")),
            Err(AuthError::AuthenticationRequired)
        ));
        assert!(matches!(
            service.authenticate(Some("garbage")),
            Err(AuthError::InvalidToken)
        ));
    }
}
