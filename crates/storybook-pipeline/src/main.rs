//! Generate one story from local files and print it as JSON.

use std::path::Path;

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storybook_models::{AssetRole, StillImage, VideoAsset};
use storybook_pipeline::StoryPipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 || args.len() > 3 {
        bail!("usage: storybook-generate <subject> <narrative> [snapshot]");
    }

    let subject = read_video(&args[0], AssetRole::Subject).await?;
    let narrative = read_video(&args[1], AssetRole::Narrative).await?;
    let snapshot = match args.get(2) {
        Some(path) => Some(read_image(path).await?),
        None => None,
    };

    let pipeline = StoryPipeline::from_env().context("failed to configure pipeline")?;
    info!("Generating story");

    let story = pipeline
        .generate_story(Some(&subject), Some(&narrative), snapshot)
        .await?;

    println!("{}", serde_json::to_string_pretty(&story)?);
    Ok(())
}

fn init_tracing() {
    // Logs go to stderr so stdout stays valid JSON
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("storybook=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
}

async fn read_video(path: &str, role: AssetRole) -> anyhow::Result<VideoAsset> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {} clip {}", role, path))?;
    Ok(VideoAsset::new(data, video_mime(path), role))
}

async fn read_image(path: &str) -> anyhow::Result<StillImage> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read snapshot {}", path))?;
    Ok(StillImage::new(data, image_mime(path)))
}

fn extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn video_mime(path: &str) -> &'static str {
    match extension(path).as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        _ => "video/webm",
    }
}

fn image_mime(path: &str) -> &'static str {
    match extension(path).as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/jpeg",
    }
}
