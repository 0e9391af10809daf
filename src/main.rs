use calavera::config::{Config, load_dotenv};
use calavera::context::AppContext;
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|err| {
        eprintln!("invalid CALAVERA_LOG filter {:?}: {err}", config.log_filter);
        EnvFilter::new("info")
    });
    // A second init (hot reload) is harmless.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() {
    load_dotenv();
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:#}; falling back to defaults");
            Config::default()
        }
    };
    init_tracing(&config);
    tracing::info!(api_base = %config.api_base, "starting calavera");

    dioxus::LaunchBuilder::new()
        .with_context(AppContext::from_config(config))
        .launch(calavera::ui::App);
}
