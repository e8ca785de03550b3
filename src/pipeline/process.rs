//! Pipeline backend that runs heartlib's generation script in a child
//! Python process.
//!
//! The script is invoked once per generation:
//!
//! ```text
//! python run_music_generation.py \
//!     --model_path <ckpt> --version 3B-20260123 \
//!     --lyrics <lyrics.txt> --tags <tags.txt> --save_path <out.wav> \
//!     --max_audio_length_ms 10000 --topk 50 --temperature 1.0 --cfg_scale 1.5 \
//!     --mula_device cuda --codec_device cuda \
//!     --mula_dtype bfloat16 --codec_dtype float32 \
//!     --lazy_load false --cpu_offload true --seed 0 [--codec_path <dir>]
//! ```
//!
//! The child owns its own random state, so only the framework seed is
//! forwarded. Per-step progress comes from the script's tqdm bar on stderr:
//! every `N/M` update advances the call's step callback up to step `N`.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use candle_core::DType;

use super::{MusicPipeline, PipelineCall, PipelineFactory, PretrainedOptions};
use crate::{Error, Result};

/// Stderr lines kept for the error message of a failed run.
const STDERR_TAIL: usize = 20;

/// Script shipped with heartlib.
pub const DEFAULT_SCRIPT: &str = "run_music_generation.py";

/// Where the script sits in a heartlib checkout next to the working directory.
pub fn default_script_path() -> PathBuf {
    Path::new("heartlib").join("examples").join(DEFAULT_SCRIPT)
}

/// Locates the interpreter and script, then hands out [`ProcessPipeline`]s.
#[derive(Debug, Clone)]
pub struct ProcessPipelineFactory {
    python: PathBuf,
    script: PathBuf,
}

impl ProcessPipelineFactory {
    /// Find `python` (a path or a name searched on `PATH`) and `script`.
    ///
    /// Fails with [`Error::PipelineUnavailable`] when either is missing.
    pub fn locate(python: impl AsRef<Path>, script: impl AsRef<Path>) -> Result<Self> {
        let python = find_executable(python.as_ref()).ok_or_else(|| {
            Error::PipelineUnavailable(format!(
                "python interpreter '{}' not found",
                python.as_ref().display()
            ))
        })?;
        let script = script.as_ref();
        if !script.is_file() {
            return Err(Error::PipelineUnavailable(format!(
                "heartlib not found: generation script '{}' does not exist. \
                 Please ensure heartlib is installed or in the correct path.",
                script.display()
            )));
        }
        Ok(Self {
            python,
            script: script.to_path_buf(),
        })
    }

    pub fn python(&self) -> &Path {
        &self.python
    }

    pub fn script(&self) -> &Path {
        &self.script
    }
}

impl PipelineFactory for ProcessPipelineFactory {
    fn from_pretrained(&self, options: &PretrainedOptions) -> Result<Arc<dyn MusicPipeline>> {
        // Validate once here so a bad dtype fails at load time, not per call.
        dtype_label(options.dtype.mula)?;
        dtype_label(options.dtype.codec)?;
        if !options.model_path.exists() {
            return Err(Error::Pipeline(format!(
                "checkpoint {} does not exist",
                options.model_path.display()
            )));
        }
        Ok(Arc::new(ProcessPipeline {
            python: self.python.clone(),
            script: self.script.clone(),
            options: options.clone(),
        }))
    }
}

/// A "loaded" pipeline: the load options, replayed on every call.
#[derive(Debug, Clone)]
pub struct ProcessPipeline {
    python: PathBuf,
    script: PathBuf,
    options: PretrainedOptions,
}

impl ProcessPipeline {
    /// Assemble the child command for one call.
    fn command(&self, call: &PipelineCall<'_>, lyrics: &Path, tags: &Path) -> Result<Command> {
        let opts = &self.options;
        let mut cmd = Command::new(&self.python);
        cmd.arg(&self.script)
            .arg("--model_path")
            .arg(&opts.model_path)
            .arg("--version")
            .arg(opts.version.label())
            .arg("--lyrics")
            .arg(lyrics)
            .arg("--tags")
            .arg(tags)
            .arg("--save_path")
            .arg(call.save_path)
            .arg("--max_audio_length_ms")
            .arg(call.params.max_audio_length_ms.to_string())
            .arg("--topk")
            .arg(call.params.topk.to_string())
            .arg("--temperature")
            .arg(call.params.temperature.to_string())
            .arg("--cfg_scale")
            .arg(call.params.cfg_scale.to_string())
            .arg("--mula_device")
            .arg(opts.device.mula.label())
            .arg("--codec_device")
            .arg(opts.device.codec.label())
            .arg("--mula_dtype")
            .arg(dtype_label(opts.dtype.mula)?)
            .arg("--codec_dtype")
            .arg(dtype_label(opts.dtype.codec)?)
            .arg("--lazy_load")
            .arg(bool_flag(opts.lazy_load))
            .arg("--cpu_offload")
            .arg(bool_flag(opts.cpu_offload))
            .arg("--seed")
            .arg(call.seeds.framework_seed().to_string());
        if let Some(codec) = &opts.explicit_codec_path {
            cmd.arg("--codec_path").arg(codec);
        }
        Ok(cmd)
    }
}

impl MusicPipeline for ProcessPipeline {
    fn generate(&self, mut call: PipelineCall<'_>) -> Result<()> {
        let lyrics = text_file("lyrics", &call.inputs.lyrics)?;
        let tags = text_file("tags", &call.inputs.tags)?;
        let mut cmd = self.command(&call, &lyrics, &tags)?;
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        tracing::debug!(?cmd, "spawning generation script");
        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take();
        let stdout_log = std::thread::spawn(move || {
            let Some(stdout) = stdout else { return };
            for line in BufReader::new(stdout).lines().map_while(|l| l.ok()) {
                if !line.trim().is_empty() {
                    tracing::debug!(target: "heartlib", "{line}");
                }
            }
        });

        let mut scan = StderrScan::default();
        if let Some(stderr) = child.stderr.take() {
            scan.read(stderr, &mut *call.callback)?;
        }
        let status = child.wait()?;
        if stdout_log.join().is_err() {
            tracing::warn!("stdout reader of the generation script panicked");
        }

        if !status.success() {
            return Err(Error::Pipeline(format!(
                "generation script exited with {status}: {}",
                scan.tail()
            )));
        }
        if !call.save_path.is_file() {
            return Err(Error::Pipeline(format!(
                "generation script produced no file at {}",
                call.save_path.display()
            )));
        }
        Ok(())
    }
}

/// Splits the child's stderr on `\r` and `\n`, drives the step callback from
/// tqdm updates and keeps the last lines for error reporting.
#[derive(Debug, Default)]
struct StderrScan {
    step: u64,
    tail: VecDeque<String>,
}

impl StderrScan {
    fn read(&mut self, stderr: impl Read, callback: &mut dyn FnMut(u64, u64)) -> Result<()> {
        let mut line = Vec::new();
        for byte in BufReader::new(stderr).bytes() {
            match byte? {
                b'\r' | b'\n' => {
                    self.feed(&line, callback);
                    line.clear();
                }
                b => line.push(b),
            }
        }
        self.feed(&line, callback);
        Ok(())
    }

    fn feed(&mut self, raw: &[u8], callback: &mut dyn FnMut(u64, u64)) {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim();
        if line.is_empty() {
            return;
        }
        if let Some((step, total)) = parse_progress(line) {
            // A new bar starts over.
            if step < self.step {
                self.step = 0;
            }
            for s in self.step + 1..=step {
                callback(s, total);
            }
            self.step = step;
        }
        if self.tail.len() == STDERR_TAIL {
            self.tail.pop_front();
        }
        self.tail.push_back(line.to_string());
    }

    fn tail(&self) -> String {
        self.tail.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

/// `(step, total)` from a tqdm line such as `50%|#####     | 2/4 [00:01<00:01]`.
fn parse_progress(line: &str) -> Option<(u64, u64)> {
    let (_, counts) = line.rsplit_once('|')?;
    let (step, total) = counts.split_whitespace().next()?.split_once('/')?;
    let step: u64 = step.parse().ok()?;
    let total: u64 = total.parse().ok()?;
    (total > 0 && step <= total).then_some((step, total))
}

fn text_file(prefix: &str, contents: &str) -> Result<tempfile::TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".txt")
        .tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}

fn bool_flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Precision label understood by the script.
pub(crate) fn dtype_label(dtype: DType) -> Result<&'static str> {
    match dtype {
        DType::BF16 => Ok("bfloat16"),
        DType::F16 => Ok("float16"),
        DType::F32 => Ok("float32"),
        other => Err(Error::InvalidInput(format!("unsupported dtype {other:?}"))),
    }
}

fn find_executable(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
