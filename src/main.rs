use invoice_notary::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::run().await
}
