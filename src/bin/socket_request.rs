use anyhow::{Context, Result};
use socketlink::{ClientConfig, SocketClientBuilder};
use socketlink_cli::bin_common::{init_tracing, load_config_from_env, parse_args, parse_request, ConfigType};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let request = parse_request(&parse_args())?;

    let config_path = load_config_from_env(ConfigType::Client);
    let mut config = match ClientConfig::from_file(&config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Could not load {}: {}", config_path.display(), e);
            ClientConfig::default()
        }
    };
    if let Ok(url) = std::env::var("SOCKETLINK_URL") {
        config.url = url;
    }
    config
        .validate()
        .context("no usable config; set SOCKETLINK_URL or SOCKETLINK_CONFIG_PATH")?;

    // One-shot tool: a lost connection is reported, not retried
    config.reconnect.enabled = false;

    let client = SocketClientBuilder::from(config).build();
    client.connect().await?;

    info!("{} {}", request.method, request.url);
    let response = client.request(request).await?;

    println!("{}", response.status_code());
    println!("{}", serde_json::to_string_pretty(&response.body)?);

    client.teardown().await?;

    if let Some(error) = response.jwr.error {
        anyhow::bail!("request failed: {}", error);
    }
    Ok(())
}
