use std::env;
use std::sync::Arc;

use outpaint::logger::{self, LoggerConfig};
use outpaint::{Config, Expander, OpenAIClient};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    match dotenv::dotenv() {
        Ok(_) => println!(".env file loaded"),
        Err(_) => println!("No .env file found, using system environment variables"),
    }

    let production = env::var("OUTPAINT_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);
    let logger_config = if production {
        LoggerConfig::production()
    } else {
        LoggerConfig::development()
    };
    if let Err(e) = logger::init_with_config(logger_config) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    log::info!("Checking environment...");
    match env::var("OPENAI_API_KEY") {
        Ok(key) => {
            log::info!("OPENAI_API_KEY found in environment");
            log::debug!("API key starts with: {}...", &key[..6.min(key.len())]);
        }
        Err(_) => {
            log::error!("OPENAI_API_KEY is not set in environment variables");
            std::process::exit(1);
        }
    }

    let config = Config::from_env();
    logger::log_config_info(&config);

    let openai_config = config.openai.clone().unwrap_or_default();
    let client = match OpenAIClient::new(openai_config) {
        Ok(client) => {
            log::info!("Provider client initialized");
            client
        }
        Err(e) => {
            log::error!("Failed to initialize provider client: {}", e);
            std::process::exit(1);
        }
    };

    let expander = Arc::new(Expander::new(Arc::new(client)));
    let port = config.port.unwrap_or(3000);

    logger::log_startup_info("outpaint", env!("CARGO_PKG_VERSION"), port);
    outpaint::server::run(expander, port).await
}
