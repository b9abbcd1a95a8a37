//! プロバイダー名からアイコンキーを推定する

use serde::{Deserialize, Serialize};

/// アイコンキー（固定の有限集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconKey {
    Netflix,
    Spotify,
    Prime,
    Disney,
    Adobe,
    PsPlus,
    Xbox,
    ICloud,
    OneDrive,
    YouTube,
    Apple,
    Google,
    Uber,
    Wolt,
    Generic,
}

/// 部分一致で判定するキーワード表（先頭から順に評価し、最初の一致を採用）
///
/// 順序に意味がある。例えば "ps" は広く一致するため、より具体的な
/// "xbox" / "game pass" の後に置く。
const KEYWORD_RULES: &[(&[&str], IconKey)] = &[
    (&["spotify"], IconKey::Spotify),
    (&["netflix"], IconKey::Netflix),
    (&["prime", "amazon"], IconKey::Prime),
    (&["disney"], IconKey::Disney),
    (&["adobe"], IconKey::Adobe),
    (&["icloud", "apple"], IconKey::ICloud),
    (&["onedrive", "microsoft"], IconKey::OneDrive),
    (&["xbox", "game pass"], IconKey::Xbox),
    (&["ps", "playstation"], IconKey::PsPlus),
    (&["youtube"], IconKey::YouTube),
    (&["google"], IconKey::Google),
    (&["uber"], IconKey::Uber),
    (&["wolt"], IconKey::Wolt),
];

impl IconKey {
    /// すべてのアイコンキー
    pub const ALL: [IconKey; 15] = [
        IconKey::Netflix,
        IconKey::Spotify,
        IconKey::Prime,
        IconKey::Disney,
        IconKey::Adobe,
        IconKey::PsPlus,
        IconKey::Xbox,
        IconKey::ICloud,
        IconKey::OneDrive,
        IconKey::YouTube,
        IconKey::Apple,
        IconKey::Google,
        IconKey::Uber,
        IconKey::Wolt,
        IconKey::Generic,
    ];

    /// 保存用の文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            IconKey::Netflix => "netflix",
            IconKey::Spotify => "spotify",
            IconKey::Prime => "prime",
            IconKey::Disney => "disney",
            IconKey::Adobe => "adobe",
            IconKey::PsPlus => "psplus",
            IconKey::Xbox => "xbox",
            IconKey::ICloud => "icloud",
            IconKey::OneDrive => "onedrive",
            IconKey::YouTube => "youtube",
            IconKey::Apple => "apple",
            IconKey::Google => "google",
            IconKey::Uber => "uber",
            IconKey::Wolt => "wolt",
            IconKey::Generic => "generic",
        }
    }

    /// 画像が無い場合に表示する絵文字
    pub fn emoji(&self) -> &'static str {
        match self {
            IconKey::Netflix => "🎬",
            IconKey::Spotify => "🎵",
            IconKey::Prime => "🛒",
            IconKey::Disney => "🐭",
            IconKey::Adobe => "🖌️",
            IconKey::PsPlus | IconKey::Xbox => "🎮",
            IconKey::ICloud | IconKey::OneDrive => "☁️",
            IconKey::YouTube => "▶️",
            IconKey::Google => "🟢",
            IconKey::Uber => "🚗",
            IconKey::Wolt => "🥡",
            // apple には専用の絵文字が無い
            IconKey::Apple | IconKey::Generic => "🔔",
        }
    }

    /// 文字列と完全一致するキーを取得する
    pub fn from_key(key: &str) -> Option<IconKey> {
        IconKey::ALL.iter().copied().find(|k| k.as_str() == key)
    }

    /// 保存済みの値を読み込む（未知の値は generic）
    pub fn from_stored(key: Option<&str>) -> IconKey {
        key.and_then(IconKey::from_key).unwrap_or(IconKey::Generic)
    }
}

/// プロバイダー文字列からアイコンキーを推定する
///
/// 1. 前後の空白を除去し小文字化する。空なら generic
/// 2. キーワード表を先頭から部分一致で評価する
/// 3. キー集合との完全一致
/// 4. いずれにも一致しなければ generic
pub fn infer_icon_key(provider: Option<&str>) -> IconKey {
    let normalized = provider.unwrap_or_default().trim().to_lowercase();
    if normalized.is_empty() {
        return IconKey::Generic;
    }

    KEYWORD_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|kw| normalized.contains(kw)))
        .map(|(_, key)| *key)
        .or_else(|| IconKey::from_key(&normalized))
        .unwrap_or(IconKey::Generic)
}
