#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nerdshim::start().await
}
