/// 費用サマリー機能モジュール
///
/// アクティブなサブスクリプションの月別合計、月選択肢、直近6か月のグラフを提供します。
pub mod aggregator;
pub mod service;

pub use aggregator::{month_cost, ChartBar, MonthOption};
pub use service::{summarize, CostSummary, MonthTotal};
