use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    workspace_api::run_server().await
}
