use serde::Serialize;

/// 送信するリマインダーメール
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// 同じ対象日に送信済みのためスキップしたことを示す値
pub const SKIPPED_ALREADY_SENT: &str = "already_sent";

/// サブスクリプション1件分の送信結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentEntry {
    pub sub_id: String,
    /// メールAPIのHTTPステータス。通信失敗・スキップ時はnull
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<&'static str>,
}

impl SentEntry {
    pub fn delivered(sub_id: &str, status: u16) -> Self {
        Self {
            sub_id: sub_id.to_string(),
            status: Some(status),
            error: None,
            skipped: None,
        }
    }

    pub fn failed(sub_id: &str, error: String) -> Self {
        Self {
            sub_id: sub_id.to_string(),
            status: None,
            error: Some(error),
            skipped: None,
        }
    }

    /// 送信後の処理で発生したエラーを付け加える
    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }

    pub fn already_sent(sub_id: &str) -> Self {
        Self {
            sub_id: sub_id.to_string(),
            status: None,
            error: None,
            skipped: Some(SKIPPED_ALREADY_SENT),
        }
    }
}

/// リマインダージョブの実行結果
#[derive(Debug, Clone, Serialize)]
pub struct ReminderReport {
    pub ok: bool,
    /// 対象の更新日（YYYY-MM-DD）
    pub target: String,
    /// 対象日に一致したサブスクリプション数（スキップ分を含む）
    pub count: usize,
    pub sent: Vec<SentEntry>,
}
