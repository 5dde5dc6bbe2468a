// This main function is the entry point when running `cargo run -p web-server`.
// Its only job is to load settings, set up logging and call `run_server`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = configuration::load_config()?;
    let _log_guard = configuration::init_tracing(&settings.logging)?;
    web_server::run_server(settings).await
}
