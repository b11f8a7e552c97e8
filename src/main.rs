use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use garmentkit::{init_logging, DesignFile, DesignSession, ModelCatalog, PartId};
use garmentkit_core::FileAssetSource;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "garmentkit", version, about = "Inspect and render GarmentKit designs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the built-in garment models and their parts
    Models,
    /// Summarize a saved design file
    Inspect { file: PathBuf },
    /// Flatten one part of a design to a PNG
    Render {
        file: PathBuf,
        part: String,
        out: PathBuf,
        /// Directory that image references are resolved against
        #[arg(long, default_value = ".")]
        assets: PathBuf,
    },
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Models => {
            let catalog = ModelCatalog::builtin();
            for name in catalog.names() {
                let model = catalog.get(name)?;
                let parts: Vec<&str> = model.parts.iter().map(PartId::as_str).collect();
                println!("{}: {}", name, parts.join(", "));
            }
        }
        Command::Inspect { file } => inspect(&file)?,
        Command::Render {
            file,
            part,
            out,
            assets,
        } => render(&file, &PartId::new(part), &out, assets)?,
    }
    Ok(())
}

fn inspect(path: &PathBuf) -> Result<()> {
    let file = DesignFile::load_from_file(path)?;
    println!("model: {}", file.model);
    if let Some(meta) = &file.meta {
        println!(
            "saved: {} by {}",
            meta.saved_at.to_rfc3339(),
            meta.author.as_deref().unwrap_or("unknown")
        );
    }
    println!("text elements: {}", file.text_elements.len());
    println!("logo elements: {}", file.logo_elements.len());
    for (part, entries) in &file.canvas_history.canvas_history {
        let cursor = file.canvas_history.history_index.get(part).copied().unwrap_or(0);
        println!("  {}: {} snapshots, cursor {}", part, entries.len(), cursor);
    }
    for image in file.image_refs() {
        println!("  image {}", image);
    }
    Ok(())
}

fn render(path: &PathBuf, part: &PartId, out: &PathBuf, assets: PathBuf) -> Result<()> {
    let file = DesignFile::load_from_file(path)?;
    let mut session = DesignSession::with_defaults(&file.model)?;
    session.load(&file)?;
    session.select_part(part)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let source = FileAssetSource::new(assets);
    for failure in runtime.block_on(session.preload_images(&source)) {
        tracing::warn!("{}", failure);
    }

    let texture = session
        .texture(part)
        .with_context(|| format!("No texture for part {}", part))?;
    // Textures are stored bottom row first; flip back for a viewable image.
    image::imageops::flip_vertical(texture.image.as_ref())
        .save(out)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    println!("wrote {}", out.display());
    Ok(())
}
