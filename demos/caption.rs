use snapsense::{Config, OllamaClient};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match dotenv::dotenv() {
        Ok(_) => log::info!("✅ .env file loaded"),
        Err(_) => log::warn!("⚠️  No .env file found"),
    }
    snapsense::logger::init()?;

    let image = env::args()
        .nth(1)
        .ok_or("usage: cargo run --example caption -- <IMAGE> [PROMPT]")?;
    let config = Config::from_env();
    let prompt = env::args().nth(2).unwrap_or(config.default_prompt.clone());

    let client = OllamaClient::new(&config.inference)?;
    match client.caption().retrieve(&image, &prompt).await {
        Ok(caption) => println!("{}", caption),
        Err(e) => println!("{}", e.display_text()),
    }

    Ok(())
}
