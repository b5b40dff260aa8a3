//! mrf-export - MRF model export tool
//!
//! Bakes OBJ frame sequences into morph-animated .mrf models, builds batches
//! from an mrf.toml manifest, and inspects or unpacks existing .mrf files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mrf_format::{MRF_EXT, TextureDecoding, WriteOptions, inspect_layout, parse_mrf_with};
use std::path::{Path, PathBuf};

// Use modules from library
use mrf_export::export::{ExportSettings, export_to_file};
use mrf_export::manifest;
use mrf_export::mesh::obj::ObjSequence;
use mrf_export::timing::{playback_fps, playback_start_frame};
use mrf_export::unpack;

#[derive(Parser)]
#[command(name = "mrf-export")]
#[command(about = "MRF model export tool")]
#[command(version)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export an OBJ frame sequence (first file = rest pose)
    Export {
        /// OBJ files, one per frame in order
        #[arg(required = true)]
        frames: Vec<PathBuf>,

        /// Output .mrf file (default: first frame with .mrf extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Texture path stored in the model
        #[arg(short, long)]
        texture: Option<String>,

        /// Position scale factor
        #[arg(long, default_value_t = 50.0)]
        scale: f32,

        /// Frame number of the first file
        #[arg(long, default_value_t = 0)]
        start: i32,

        /// Last frame to sample (default: one per file)
        #[arg(long)]
        end: Option<i32>,

        /// Authoring frame rate
        #[arg(long, default_value_t = 30.0)]
        fps: f32,

        /// Frame playback has already reached when the model spawns
        #[arg(long)]
        elapsed_frame: Option<i32>,

        /// Explicit playback delay in seconds
        #[arg(long, default_value_t = 0.0)]
        delay: f32,

        /// Keep every triangle corner as its own vertex
        #[arg(long)]
        raw: bool,

        /// Sample frames from end to start
        #[arg(long)]
        reverse: bool,

        /// Compute pivot and bounds radius
        #[arg(long)]
        auto_bounds: bool,

        /// Leave the reserved header block zeroed
        #[arg(long)]
        no_signature: bool,

        /// Also write the game-ready mirror copy
        #[arg(long)]
        mirror: bool,
    },

    /// Build models from a manifest file
    Build {
        /// Path to mrf.toml manifest
        #[arg(default_value = "mrf.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate manifest without building
    Check {
        /// Path to mrf.toml manifest
        #[arg(default_value = "mrf.toml")]
        manifest: PathBuf,
    },

    /// Show header, offset table and layout of an .mrf file
    Info {
        /// Input .mrf file
        input: PathBuf,

        /// Print a JSON summary to stdout
        #[arg(long)]
        json: bool,

        /// Decode non-ASCII texture paths lossily instead of failing
        #[arg(long)]
        lossy: bool,
    },

    /// Unpack every keyframe of an .mrf file into OBJ files
    Unpack {
        /// Input .mrf file
        input: PathBuf,

        /// Output directory (default: next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Positions are divided by this value
        #[arg(long, default_value_t = unpack::DEFAULT_DIVISOR)]
        divisor: f32,

        /// Decode non-ASCII texture paths lossily instead of failing
        #[arg(long)]
        lossy: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (stderr, stdout carries `info --json`)
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Export {
            frames,
            output,
            texture,
            scale,
            start,
            end,
            fps,
            elapsed_frame,
            delay,
            raw,
            reverse,
            auto_bounds,
            no_signature,
            mirror,
        } => {
            let output = match output {
                Some(output) => output,
                None => frames
                    .first()
                    .context("No frame files given")?
                    .with_extension(MRF_EXT),
            };
            let (rest, mut sequence) = ObjSequence::open(frames, start)?;
            let end = end.unwrap_or(sequence.last_frame());
            sequence.check_range(start, end)?;

            let settings = ExportSettings {
                texture,
                scale,
                start_frame: start,
                end_frame: end,
                fps,
                elapsed_frame,
                playback_delay: delay,
                deduplicate: !raw,
                reverse,
                auto_bounds,
                debug_flag: 0,
                reserved: None,
                write: WriteOptions {
                    signature: !no_signature,
                    mirror_copy: mirror,
                },
            };

            tracing::info!("Exporting {} frames -> {:?}", settings.frame_count(), output);
            let report = export_to_file(&rest, &mut sequence, &settings, &output)?;
            if let Some(mirror) = report.mirror {
                tracing::info!("Mirror copy at {:?}", mirror);
            }
            tracing::info!("Done!");
        }

        Commands::Build { manifest, output } => {
            tracing::info!("Building models from {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            let base_dir = parent_dir(&manifest);
            let reports = manifest::build_all(&config, &base_dir, output.as_deref())?;
            tracing::info!("Build complete! {} models written", reports.len());
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            tracing::info!("Manifest is valid! {} models", config.models.len());
        }

        Commands::Info { input, json, lossy } => {
            let data = std::fs::read(&input).with_context(|| format!("Failed to read {:?}", input))?;
            let model = parse_mrf_with(&data, decoding(lossy))
                .with_context(|| format!("Failed to parse {:?}", input))?;
            let layout = inspect_layout(&data)
                .with_context(|| format!("Bad chunk layout in {:?}", input))?;

            if json {
                let summary = serde_json::json!({
                    "model": model.summary(),
                    "layout": layout,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                let h = &model.header;
                tracing::info!("{:?}", input);
                tracing::info!("  texture:  {}", model.texture_path);
                tracing::info!(
                    "  frames:   {} ({} fps, start frame {})",
                    h.frame_count,
                    playback_fps(h.frame_duration),
                    playback_start_frame(h.elapsed_time, h.frame_duration, h.frame_count)
                );
                tracing::info!("  vertices: {}", h.vertex_count);
                tracing::info!("  faces:    {}", model.triangle_count());
                tracing::info!("  pivot:    {:?} radius {}", h.pivot, h.bounds_radius);
                tracing::info!("  elapsed:  {}s, debug flag {}", h.elapsed_time, h.debug_flag);
                if let Some(signature) = h.signature() {
                    tracing::info!("  signature: {}", signature);
                }
                tracing::info!(
                    "  layout:   header 0x{:X}, texture 0x{:X}, faces 0x{:X}, mapping 0x{:X}, {} keyframe chunks, {} bytes",
                    layout.header_region,
                    layout.texture.offset,
                    layout.faces.offset,
                    layout.mapping.offset,
                    layout.keyframes.len(),
                    layout.file_len
                );
            }
        }

        Commands::Unpack {
            input,
            output,
            divisor,
            lossy,
        } => {
            let data = std::fs::read(&input).with_context(|| format!("Failed to read {:?}", input))?;
            let model = parse_mrf_with(&data, decoding(lossy))
                .with_context(|| format!("Failed to parse {:?}", input))?;

            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "frame".to_string());
            let dir = output.unwrap_or_else(|| parent_dir(&input));
            unpack::unpack_to_dir(&model, &dir, &stem, divisor)?;
            tracing::info!("Done!");
        }
    }

    Ok(())
}

fn decoding(lossy: bool) -> TextureDecoding {
    if lossy {
        TextureDecoding::Lossy
    } else {
        TextureDecoding::Strict
    }
}

/// Parent directory of a file path, `.` for bare file names
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
