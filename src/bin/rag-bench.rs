#[path = "rag-bench/app.rs"]
mod app;
#[path = "rag-bench/args.rs"]
mod args;
#[path = "rag-bench/logging.rs"]
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
