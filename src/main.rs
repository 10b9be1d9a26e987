mod libs;
use libs::logger;
use libs::server::serve;
use libs::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::new()?;
    logger::init(&settings.log);
    serve(settings).await
}
