use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use strata_core::domain::{
    Conflicts, ExecutionId, FlowId, Namespace, TaskId, TaskRunId, TenantId,
};
use strata_core::impls::InMemoryStorage;
use strata_core::ports::ByteStream;
use strata_core::{FacadeBuilder, StorageConfig, StorageContext};

/// 引数で設定ファイルが渡されなかったときの設定
const DEFAULT_CONFIG: &str = r#"
[namespace_access]
mode = "enforced"

[[namespace_access.rules]]
namespace = "company.shared"
allowed = ["company.*"]
"#;

async fn read_to_string(mut stream: ByteStream) -> anyhow::Result<String> {
    let mut content = String::new();
    stream.read_to_string(&mut content).await?;
    Ok(content)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // (A) 設定を読み込む（引数があればファイル、なければデフォルト）
    let config = match std::env::args().nth(1) {
        Some(path) => StorageConfig::load(&path)
            .await
            .with_context(|| format!("loading {path}"))?,
        None => StorageConfig::from_toml_str(DEFAULT_CONFIG)?,
    };

    // (B) task スコープのコンテキストと facade を組み立てる
    let context = StorageContext::for_task(
        Some(TenantId::new("acme")?),
        Namespace::new("company.team")?,
        FlowId::new("daily-report")?,
        ExecutionId::generate(),
        TaskId::new("extract")?,
        TaskRunId::generate(),
    );
    let storage = Arc::new(InMemoryStorage::new());
    let facade = FacadeBuilder::new()
        .context(context)
        .backend(storage.clone())
        .config(&config)?
        .build()?;

    // (C) 名前で書き込み、URI で読み戻す
    let uri = facade.put_file(&b"id,total\n1,42\n"[..], "report.csv").await?;
    println!("stored: {uri}");
    println!("content: {:?}", read_to_string(facade.get_file(&uri).await?).await?);

    // guard は kestra 以外のスキームを拒否する
    if let Err(e) = facade.get_file("file:///etc/passwd").await {
        println!("rejected: {e}");
    }

    // (D) cache: 書き込み → TTL 付きで読み込み
    let dir = std::env::temp_dir().join(format!("strata-demo-{}", ExecutionId::generate()));
    tokio::fs::create_dir_all(&dir).await?;
    let local = dir.join("cache.zip");
    tokio::fs::write(&local, b"compressed-deps").await?;
    let cache_uri = facade.put_cache_file(&local, "deps", Some("v1")).await?;
    println!("cached: {cache_uri} (local file removed: {})", !local.exists());

    match facade
        .get_cache_file("deps", Some("v1"), Some(Duration::from_secs(3600)))
        .await?
    {
        Some(stream) => println!("cache hit: {:?}", read_to_string(stream).await?),
        None => println!("cache miss"),
    }
    tokio::fs::remove_dir_all(&dir).await?;

    // (E) namespace files と namespace 間アクセス
    let shared = facade.namespace_named("company.shared").await?;
    shared
        .put_file("templates/header.txt", &b"ACME"[..], Conflicts::Overwrite)
        .await?;
    let files = shared.find_all_files_matching(&["**/*.txt"], &[]).await?;
    println!("shared files: {}", serde_json::to_string_pretty(&files)?);

    match facade.namespace_named("finance").await {
        Ok(_) => println!("finance: allowed"),
        Err(e) => println!("finance: {e}"),
    }

    // (F) execution の後片付け
    let deleted = facade.delete_execution_files().await?;
    println!("deleted {} execution file(s), {} object(s) left", deleted.len(), storage.len().await);

    Ok(())
}
