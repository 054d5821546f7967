use clap::{Parser, Subcommand};
use crate::ai_provider::AiProvider;
use shelf_count_common::SurfaceSize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shelf-count")]
#[command(about = "棚・ビン写真のAI個数カウント・照合ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// AIプロバイダ (gemini/claude/codex)
    #[arg(long, default_value = "gemini", global = true)]
    pub ai_provider: AiProvider,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 1品目を撮影してカウント
    Count {
        /// 数える物体名
        #[arg(short, long, required = true)]
        label: String,

        /// カメラ代わりの画像ファイル/フォルダ
        #[arg(short, long, required = true)]
        source: PathBuf,

        /// 保存済みのAI応答を使う（オフライン）
        #[arg(long)]
        reply_file: Option<PathBuf>,

        /// 矩形を投影する表示サイズ（例: 640x480）
        #[arg(long)]
        surface: Option<SurfaceSize>,

        /// 手入力の個数で確定
        #[arg(short, long)]
        manual: Option<u32>,

        /// 確認なしで確定（エラー時はキャンセル）
        #[arg(short, long)]
        yes: bool,
    },

    /// 台帳の商品を順にカウント
    Inventory {
        /// カメラ代わりの画像ファイル/フォルダ
        #[arg(short, long, required = true)]
        source: PathBuf,

        /// 商品リストJSON（省略時はサンプル）
        #[arg(short, long)]
        items: Option<PathBuf>,

        /// 商品名・SKUで絞り込み
        #[arg(long)]
        search: Option<String>,

        /// 保存済みのAI応答を使う（オフライン）
        #[arg(long)]
        reply_file: Option<PathBuf>,

        /// 矩形を投影する表示サイズ（例: 640x480）
        #[arg(long)]
        surface: Option<SurfaceSize>,
    },

    /// 保存済みのAI応答を解析して表示
    Parse {
        /// AI応答テキストファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 数える物体名
        #[arg(short, long, default_value = "")]
        label: String,

        /// 矩形を投影する表示サイズ（例: 640x480）
        #[arg(long)]
        surface: Option<SurfaceSize>,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 応答形式を設定 (normalized/pixel)
        #[arg(long)]
        set_prompt_dialect: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
