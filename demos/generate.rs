//! Generate a single image from a text prompt.
//!
//! Reads `NANO_BANANA_*` variables from the environment (at least
//! `NANO_BANANA_API_KEY`), prints the configuration report, then writes the
//! image to `nano_banana.png`.
//!
//! ```sh
//! NANO_BANANA_API_KEY=sk-... RUST_LOG=nanobanana_rs=debug \
//!     cargo run --example generate -- "a paper lantern floating on a lake" 16:9
//! ```

use nanobanana_rs::{AspectRatio, GenerationRequest, NanoBananaClient, NanoBananaConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let prompt = args
        .next()
        .unwrap_or_else(|| "a beautiful sunset over mountains".to_string());

    let config = NanoBananaConfig::from_env();
    let report = config.validate();
    println!("Submit endpoint: {}", report.submit_url);
    println!("Model:           {}", report.model);
    println!("Aspect ratio:    {}", report.default_aspect_ratio);
    println!("API key:         {}", if report.has_api_key { "set" } else { "missing" });
    println!("Max poll wait:   {:?}", report.max_poll_wait);
    if !report.is_ok() {
        for problem in &report.problems {
            eprintln!("Config problem: {}", problem);
        }
        return Ok(());
    }

    let mut request = GenerationRequest::new(prompt);
    if let Some(ratio) = args.next() {
        request = request.aspect_ratio(ratio.parse::<AspectRatio>()?);
    }

    let client = NanoBananaClient::new(config);
    let bytes = client.generate(&request).await?;
    std::fs::write("nano_banana.png", &bytes)?;
    println!("Saved {} bytes to nano_banana.png", bytes.len());

    Ok(())
}
