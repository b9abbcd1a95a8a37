#[tokio::main]
async fn main() {
    if let Err(e) = abo_memo_lib::run().await {
        log::error!("サーバーの実行中にエラーが発生しました: {e}");
        eprintln!("サーバーの実行中にエラーが発生しました: {e}");
        std::process::exit(1);
    }
}
