//! HeartMuLa CLI: evaluates the Loader → Generator → Preview/Save graph once.
//!
//! Checkpoints are looked up under `<base-dir>/models/checkpoints/` and the
//! result is written under `<base-dir>/output/`. Generation runs heartlib's
//! script in a child Python process.
//!
//! # Output
//!
//! Prints the Preview/Save UI payload as one JSON line on success:
//!
//! ```json
//! {"ui":{"audio":[{"filename":"audio_4242.wav","subfolder":"HeartMuLa","type":"output"}]}}
//! ```
//!
//! `--list-nodes` prints the node declarations instead and exits;
//! `--list-presets` does the same for the preset catalogs.
//!
//! Progress is logged from the tqdm bar heartlib prints on stderr. Scripts
//! without one generate silently until the file is written.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use heartmula_nodes::{
    Error,
    config::{
        CodecPrecision, DEFAULT_FILENAME_PREFIX, DeviceSelection, GenerationRequest,
        LoaderInputs, MulaPrecision, Version,
    },
    nodes::{self, Generator, Loader, Preview},
    pipeline::{ProcessPipelineFactory, default_script_path},
    registry::{HostPaths, PathRegistry},
    tags::{self, INSTRUMENT_PRESETS, STYLE_PRESETS, VOCAL_PRESETS},
};

fn label<T: FromStr<Err = Error>>(s: &str) -> Result<T, String> {
    s.parse().map_err(|e: Error| e.to_string())
}

#[derive(Parser, Debug)]
#[command(
    name = "heartmula",
    about = "HeartMuLa text-to-music generation through the Loader / Generator / Preview nodes"
)]
struct Args {
    /// Host root holding `models/` and `output/`.
    #[arg(long, env = "HEARTMULA_BASE_DIR", default_value = ".")]
    base_dir: PathBuf,

    /// Python interpreter used to run heartlib.
    #[arg(long, env = "HEARTMULA_PYTHON", default_value = "python3")]
    python: PathBuf,

    /// heartlib generation script.
    #[arg(long, env = "HEARTLIB_SCRIPT")]
    script: Option<PathBuf>,

    /// Print node declarations as JSON and exit.
    #[arg(long)]
    list_nodes: bool,

    /// Print the vocal, style and instrument preset catalogs as JSON and exit.
    #[arg(long)]
    list_presets: bool,

    // --- Loader ---
    /// Language-model checkpoint name under models/checkpoints.
    #[arg(long)]
    mula_model: Option<String>,

    /// Codec checkpoint name under models/checkpoints.
    #[arg(long)]
    codec_model: Option<String>,

    #[arg(long, value_parser = label::<Version>, default_value = "3B-20260123")]
    version: Version,

    #[arg(long, value_parser = label::<DeviceSelection>, default_value = "cuda")]
    mula_device: DeviceSelection,

    #[arg(long, value_parser = label::<DeviceSelection>, default_value = "cuda")]
    codec_device: DeviceSelection,

    #[arg(long, value_parser = label::<MulaPrecision>, default_value = "bfloat16")]
    mula_dtype: MulaPrecision,

    #[arg(long, value_parser = label::<CodecPrecision>, default_value = "float32")]
    codec_dtype: CodecPrecision,

    /// Let the pipeline offload idle subsystems to CPU.
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    cpu_offload: bool,

    // --- Generator ---
    /// Vocal style: Female, Male or Chorus.
    #[arg(long, default_value = "Female")]
    vocal_gender: String,

    /// Comma-separated style presets, or "None".
    #[arg(long, default_value = "None")]
    style_preset: String,

    /// Comma-separated instrument presets, or "None".
    #[arg(long, default_value = "None")]
    instrument_preset: String,

    /// Toggle one style preset in the selection. Repeatable.
    #[arg(long = "style", value_name = "PRESET")]
    styles: Vec<String>,

    /// Toggle one instrument preset in the selection. Repeatable.
    #[arg(long = "instrument", value_name = "PRESET")]
    instruments: Vec<String>,

    /// Lyrics text. Use [verse], [chorus] section markers.
    #[arg(long, short = 'l', conflicts_with = "lyrics_file")]
    lyrics: Option<String>,

    /// Read lyrics from a file.
    #[arg(long)]
    lyrics_file: Option<PathBuf>,

    /// Free-text tags appended after the presets.
    #[arg(long, short = 't', default_value = "emotional, high quality")]
    tags: String,

    #[arg(long, default_value_t = 10_000)]
    max_audio_length_ms: u32,

    #[arg(long, default_value_t = 50)]
    topk: u32,

    #[arg(long, default_value_t = 1.0)]
    temperature: f32,

    #[arg(long, default_value_t = 1.5)]
    cfg_scale: f32,

    #[arg(long, short = 's', default_value_t = 0)]
    seed: u64,

    // --- Preview/Save ---
    /// Output name, optionally with subdirectories, e.g. "HeartMuLa/audio".
    #[arg(long, default_value = DEFAULT_FILENAME_PREFIX)]
    filename_prefix: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let registry: Arc<dyn PathRegistry> = Arc::new(HostPaths::from_base_dir(&args.base_dir));

    if args.list_nodes {
        let defs = nodes::node_definitions(registry.as_ref())?;
        let json: Vec<_> = defs.iter().map(|d| d.to_host_json()).collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if args.list_presets {
        let catalogs = serde_json::json!({
            "vocal": VOCAL_PRESETS,
            "style": STYLE_PRESETS,
            "instrument": INSTRUMENT_PRESETS,
        });
        println!("{}", serde_json::to_string_pretty(&catalogs)?);
        return Ok(());
    }

    let (Some(mula_model), Some(codec_model)) = (args.mula_model.clone(), args.codec_model.clone())
    else {
        bail!(
            "--mula-model and --codec-model are required \
             (see --list-nodes for installed checkpoints)"
        );
    };

    let lyrics = match (&args.lyrics, &args.lyrics_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading lyrics from {}", path.display()))?,
        (None, None) => GenerationRequest::default().lyrics,
    };

    let style_preset = args
        .styles
        .iter()
        .fold(args.style_preset, |selection, item| tags::toggle_preset(&selection, item));
    let instrument_preset = args
        .instruments
        .iter()
        .fold(args.instrument_preset, |selection, item| {
            tags::toggle_preset(&selection, item)
        });
    tags::check_presets("style_preset", &style_preset, STYLE_PRESETS)?;
    tags::check_presets("instrument_preset", &instrument_preset, INSTRUMENT_PRESETS)?;

    let request = GenerationRequest {
        vocal_gender: args.vocal_gender,
        style_preset,
        instrument_preset,
        lyrics,
        tags: args.tags,
        max_audio_length_ms: args.max_audio_length_ms,
        topk: args.topk,
        temperature: args.temperature,
        cfg_scale: args.cfg_scale,
        seed: args.seed,
    };
    nodes::check_request(&request).context("generator inputs out of bounds")?;

    let script = args.script.unwrap_or_else(default_script_path);
    let loader = Loader::from_located(
        Arc::clone(&registry),
        ProcessPipelineFactory::locate(&args.python, &script),
    );
    let pipe = loader
        .load(&LoaderInputs {
            mula_model,
            codec_model,
            version: args.version,
            mula_device: args.mula_device,
            codec_device: args.codec_device,
            mula_dtype: args.mula_dtype,
            codec_dtype: args.codec_dtype,
            cpu_offload: args.cpu_offload,
        })
        .context("failed to load pipeline")?;

    let audio = Generator
        .generate_with_progress(
            &pipe,
            &request,
            Some(Box::new(|current: u64, total: u64| {
                if total > 0 && current % (total / 10).max(1) == 0 {
                    tracing::info!("progress {current}/{total}");
                }
            })),
        )
        .context("generation failed")?;
    tracing::info!(
        "generated {:.1}s of audio ({} channels, {} Hz)",
        audio.duration_s(),
        audio.channels(),
        audio.sample_rate
    );

    let result = Preview::new(registry)
        .save(&audio, Some(args.filename_prefix.as_str()))
        .context("failed to save audio")?;

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
