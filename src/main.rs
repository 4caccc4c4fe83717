//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use dotenv::dotenv;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wa_dispatch::adapters::numbering::StaticNumberingPlan;
use wa_dispatch::adapters::ui::tui::TuiInputPort;
use wa_dispatch::adapters::whatsapp::{
    HttpDeliveryExecutor, MockDeliveryAdapter, ProviderCredentials, ProviderEndpoint,
    ProviderRequestBuilder,
};
use wa_dispatch::ports::{DeliveryPort, InputPort, NumberingPlan};
use wa_dispatch::shared::config::AppConfig;
use wa_dispatch::usecases::{DispatchSettings, NotificationService, PhoneNormalizer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "invalid configuration, falling back to defaults");
        AppConfig::default()
    });

    wa_dispatch::adapters::ui::init_ui(cfg.is_provider_configured());

    // --- Numbering plan + normalizer ---
    let plan = load_numbering_plan(cfg.numbering_plan_path.as_deref().map(Path::new))?;
    let normalizer = Arc::new(PhoneNormalizer::new(plan));

    // --- Delivery: live Cloud API when credentials are present, otherwise dry run ---
    let phone_number_id = cfg.phone_number_id().unwrap_or_else(|| "0".to_string());
    let delivery: Arc<dyn DeliveryPort> = match cfg.api_token() {
        Some(token) if cfg.is_provider_configured() => {
            info!(
                url = %cfg.api_url_or_default(),
                phone_number_id = %phone_number_id,
                business_account_id = cfg.business_account_id().as_deref().unwrap_or("-"),
                timeout_secs = cfg.timeout().as_secs(),
                "live delivery via WhatsApp Cloud API"
            );
            Arc::new(HttpDeliveryExecutor::new(
                ProviderEndpoint::new(cfg.api_url_or_default()),
                ProviderCredentials::bearer(token),
                cfg.timeout(),
            ))
        }
        _ => {
            warn!("WHATSAPP_API_TOKEN / WHATSAPP_PHONE_NUMBER_ID not set, using mock delivery adapter");
            Arc::new(MockDeliveryAdapter::new())
        }
    };

    // --- Services ---
    let settings = DispatchSettings {
        default_region: cfg.default_region_or_default(),
        max_concurrent_sends: cfg.max_concurrent_sends_or_default(),
        retry: cfg.retry_policy(),
    };
    info!(
        adapter = delivery.name(),
        region = %settings.default_region,
        max_concurrent_sends = settings.max_concurrent_sends,
        retry_attempts = settings.retry.max_attempts,
        "dispatch settings"
    );
    let service = Arc::new(NotificationService::new(
        delivery,
        Arc::clone(&normalizer),
        ProviderRequestBuilder::new(phone_number_id),
        settings,
    ));

    let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(service, normalizer));

    // --- Run (main menu -> send / create group / add member / check number) ---
    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}

/// Built-in table unless a JSON plan file is configured.
fn load_numbering_plan(path: Option<&Path>) -> anyhow::Result<Arc<dyn NumberingPlan>> {
    let plan = match path {
        Some(path) => StaticNumberingPlan::from_json_file(path),
        None => StaticNumberingPlan::builtin(),
    }
    .map_err(|e| anyhow::anyhow!("{}", e))?;
    Ok(Arc::new(plan))
}
