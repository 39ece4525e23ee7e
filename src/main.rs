//! charcard CLI - Command-line tool for PNG character cards.
//!
//! This is the main entry point for the charcard command-line application.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use charcard::card::{parse_character_json, to_export_payload};
use charcard::prelude::*;

/// charcard - inspect, extract and embed PNG character cards
#[derive(Parser)]
#[command(name = "charcard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the chunks of a PNG and the metadata it carries
    Inspect {
        /// Path to the PNG file
        #[arg(short, long, env = "CHARCARD_INPUT")]
        input: PathBuf,
    },

    /// Extract the character stored in a card as JSON
    Extract {
        /// Path to the card
        #[arg(short, long, env = "CHARCARD_INPUT")]
        input: PathBuf,

        /// Output JSON file (stdout if omitted)
        #[arg(short, long, env = "CHARCARD_OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Embed a character JSON file into an avatar image
    Embed {
        /// Character JSON, bare or wrapped in {"version":1,"character":...}
        #[arg(short, long)]
        character: PathBuf,

        /// Avatar PNG (a placeholder is used if missing or not a PNG)
        #[arg(short, long, env = "CHARCARD_INPUT")]
        image: Option<PathBuf>,

        /// Output card file
        #[arg(short, long, env = "CHARCARD_OUTPUT")]
        output: PathBuf,
    },

    /// Extract every card matching a glob pattern into a directory
    BatchExtract {
        /// Glob pattern, e.g. "cards/**/*.png"
        #[arg(short, long, env = "CHARCARD_INPUT")]
        input: String,

        /// Output directory
        #[arg(short, long, env = "CHARCARD_OUTPUT")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let codec = CardCodec::new();

    match cli.command {
        Commands::Inspect { input } => {
            cmd_inspect(&codec, &input)?;
        }
        Commands::Extract { input, output } => {
            cmd_extract(&codec, &input, output.as_deref())?;
        }
        Commands::Embed {
            character,
            image,
            output,
        } => {
            cmd_embed(&codec, &character, image, &output)?;
        }
        Commands::BatchExtract { input, output } => {
            cmd_batch_extract(&codec, &input, &output)?;
        }
    }

    Ok(())
}

fn cmd_inspect(codec: &CardCodec, input: &Path) -> Result<()> {
    let data = fs::read(input).context("Failed to read input file")?;
    let stream = read_chunks(&data).context("Failed to read PNG chunks")?;

    println!("{}: {} bytes", input.display(), data.len());
    println!("{:>10} {:>4} {:>10}  {:<9}  CRC", "OFFSET", "TYPE", "LENGTH", "KIND");
    for chunk in stream.iter() {
        println!(
            "{:>10} {} {:>10}  {:<9}  {}",
            chunk.offset,
            chunk.chunk_type,
            chunk.data.len(),
            if chunk.chunk_type.is_critical() { "critical" } else { "ancillary" },
            if chunk.crc_matches() { "ok" } else { "BAD" }
        );
    }

    if !stream.has_iend() {
        println!("\nWarning: no IEND chunk, a card cannot be written into this image");
    }

    match codec.decode_metadata(&data)? {
        Some(payload) => {
            let name = payload
                .object
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("<unnamed>");
            println!(
                "\nMetadata: key {:?}, format {:?}, character {:?}",
                payload.key, payload.format, name
            );
        }
        None => println!("\nMetadata: none (opens as a blank card)"),
    }

    Ok(())
}

fn cmd_extract(codec: &CardCodec, input: &Path, output: Option<&Path>) -> Result<()> {
    let character = codec
        .extract_file(input)
        .with_context(|| format!("Failed to extract {}", input.display()))?;

    let payload = to_export_payload(&character).context("Failed to serialize character")?;
    let json = serde_json::to_string_pretty(&payload)?;

    match output {
        Some(path) => {
            fs::write(path, json).context("Failed to write output file")?;
            println!(
                "Extracted {:?} ({} chats) to {}",
                character.name,
                character.chats.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn cmd_embed(
    codec: &CardCodec,
    character_path: &Path,
    image: Option<PathBuf>,
    output: &Path,
) -> Result<()> {
    println!("Embedding: {} -> {}", character_path.display(), output.display());

    let text = fs::read_to_string(character_path).context("Failed to read character file")?;
    let character = parse_character_json(&text, &character_path.to_string_lossy())
        .context("Character file is not a JSON object")?;

    let image = image.map(ImageSource::File).unwrap_or_default();
    codec
        .embed_to_file(&character, image, output)
        .context("Failed to embed character")?;

    println!("Embedded {:?} ({} chats)", character.name, character.chats.len());

    Ok(())
}

fn cmd_batch_extract(codec: &CardCodec, pattern: &str, output: &Path) -> Result<()> {
    let inputs: Vec<PathBuf> = glob::glob(pattern)
        .context("Invalid glob pattern")?
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() => Some(path),
            Ok(_) => None,
            Err(e) => {
                log::warn!("skipping unreadable path: {}", e);
                None
            }
        })
        .collect();

    println!("Extracting {} cards to {}...", inputs.len(), output.display());

    fs::create_dir_all(output)?;

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let errors = AtomicUsize::new(0);

    inputs.par_iter().for_each(|input| {
        if let Err(e) = extract_one(codec, input, output) {
            log::error!("Error extracting {}: {:#}", input.display(), e);
            errors.fetch_add(1, Ordering::Relaxed);
        }
        pb.inc(1);
    });

    pb.finish_with_message("Done");
    let errors = errors.into_inner();
    println!(
        "Extracted {} cards in {:?} ({} errors)",
        inputs.len() - errors,
        start.elapsed(),
        errors
    );

    Ok(())
}

fn extract_one(codec: &CardCodec, input: &Path, output: &Path) -> Result<()> {
    let character = codec.extract_file(input)?;
    let payload = to_export_payload(&character)?;

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| character.name.clone());
    let output_path = output.join(format!("{stem}.json"));

    fs::write(&output_path, serde_json::to_string_pretty(&payload)?)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    Ok(())
}
