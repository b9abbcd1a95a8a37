use std::env;

fn main() {
    // 環境変数をコンパイル時に埋め込み
    // ENVIRONMENT環境変数に基づいて適切な.envファイルを読み込み
    let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    let env_file = match environment.as_str() {
        "production" => ".env.production",
        _ => ".env",
    };

    println!("cargo:rerun-if-env-changed=ENVIRONMENT");
    println!("cargo:rerun-if-changed={env_file}");

    // 環境変数ファイルを読み込み
    if dotenv::from_filename(env_file).is_ok() {
        println!("cargo:warning={env_file}ファイルを読み込みました");

        // 秘密情報ではない既定値のみ埋め込む（APIキーは実行時に読み込む）
        if let Ok(from_email) = env::var("FROM_EMAIL") {
            println!("cargo:rustc-env=EMBEDDED_FROM_EMAIL={from_email}");
        }
        if let Ok(auth_url) = env::var("AUTH_URL") {
            println!("cargo:rustc-env=EMBEDDED_AUTH_URL={auth_url}");
        }
        if let Ok(api_url) = env::var("EMAIL_API_URL") {
            println!("cargo:rustc-env=EMBEDDED_EMAIL_API_URL={api_url}");
        }
    } else {
        println!("cargo:warning={env_file}ファイルが見つかりません");
    }
}
