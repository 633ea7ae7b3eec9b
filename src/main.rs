use std::sync::Arc;

use care_relay::logging::init_logging;
use care_relay::server::{self, AppState};
use care_relay::store::open_store;
use care_relay::{Error, GenerationRelay, ProviderFactory, RelayConfig, TracingObserver};

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();

    let config = RelayConfig::from_env()?;
    init_logging(&config.logging)?;

    let client = ProviderFactory::create(&config.provider).await?;
    let store = open_store(config.record_store_path.as_deref())?;
    let relay = GenerationRelay::new(client)
        .with_observer(Arc::new(TracingObserver))
        .with_options(config.relay_options());

    let address = config.bind_address()?;
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!(
        %address,
        model = %config.provider.generation.model,
        persistent_store = config.record_store_path.is_some(),
        "care relay listening"
    );

    server::serve(listener, AppState::new(relay, store)).await
}
