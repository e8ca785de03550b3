//! Generator node: pipeline handle + request in, audio object out.
//!
//! The external pipeline can only write its result to a file, so every call
//! goes through a temporary WAV that is read back and then removed, on the
//! error path as well as the success path.

use crate::Result;
use crate::audio::{AudioObject, read_wav};
use crate::config::{GenerationRequest, bounds};
use crate::pipeline::{PipelineCall, PipelineHandle, PipelineInputs, SamplingParams};
use crate::progress::{ProgressBar, ProgressHook};
use crate::seed::SeedContext;
use crate::tags::build_tags;

use super::declaration::{InputDecl, InputKind, NodeDefinition};

pub const CLASS_NAME: &str = "HeartMuLaGenerator";

/// Characters of lyrics echoed to the log.
const LYRICS_PREVIEW_CHARS: usize = 20;

/// Stateless; everything a call needs arrives with the call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Generator;

impl Generator {
    pub fn generate(
        &self,
        pipe: &PipelineHandle,
        request: &GenerationRequest,
    ) -> Result<AudioObject> {
        self.generate_with_progress(pipe, request, None)
    }

    /// Run one generation, forwarding step counts to `progress`.
    pub fn generate_with_progress(
        &self,
        pipe: &PipelineHandle,
        request: &GenerationRequest,
        progress: Option<ProgressHook>,
    ) -> Result<AudioObject> {
        let seeds = SeedContext::new(request.seed);
        let tags = build_tags(
            &request.style_preset,
            &request.vocal_gender,
            &request.instrument_preset,
            &request.tags,
        );
        let lyrics_preview: String = request.lyrics.chars().take(LYRICS_PREVIEW_CHARS).collect();
        tracing::info!(
            lyrics = %lyrics_preview,
            tags = %tags,
            seed = request.seed,
            "generating music"
        );

        let mut bar = ProgressBar::new(request.estimated_steps());
        if let Some(hook) = progress {
            bar = bar.with_hook(hook);
        }
        let mut on_step = |_step: u64, _total: u64| bar.update(1);

        // Deleted on drop, whichever way this function exits.
        let tmp_path = tempfile::Builder::new()
            .prefix("heartmula_")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();

        let inputs = PipelineInputs {
            lyrics: request.lyrics.clone(),
            tags,
        };
        pipe.pipeline().generate(PipelineCall {
            inputs: &inputs,
            params: SamplingParams {
                max_audio_length_ms: request.max_audio_length_ms,
                topk: request.topk,
                temperature: request.temperature,
                cfg_scale: request.cfg_scale,
            },
            save_path: &tmp_path,
            seeds,
            callback: &mut on_step,
        })?;

        let (frames, sample_rate) = read_wav(&tmp_path)?;
        let audio = AudioObject::from_frames(&frames, sample_rate)?;
        tmp_path.close()?;

        tracing::debug!(
            steps = bar.current(),
            channels = audio.channels(),
            samples = audio.num_samples(),
            sample_rate,
            "generation finished"
        );
        Ok(audio)
    }
}

/// Check a request against the declared bounds.
///
/// This is the host's job; [`Generator`] itself never calls it.
pub fn check_request(request: &GenerationRequest) -> Result<()> {
    let def = definition();
    def.check_int("max_audio_length_ms", u64::from(request.max_audio_length_ms))?;
    def.check_int("topk", u64::from(request.topk))?;
    def.check_int("seed", request.seed)?;
    def.check_float("temperature", f64::from(request.temperature))?;
    def.check_float("cfg_scale", f64::from(request.cfg_scale))?;
    Ok(())
}

fn text(default: &str, multiline: bool) -> InputKind {
    InputKind::String {
        default: default.to_string(),
        multiline,
    }
}

pub fn definition() -> NodeDefinition {
    let d = GenerationRequest::default();
    NodeDefinition {
        class_name: CLASS_NAME,
        display_name: "HeartMuLa Generator",
        category: super::CATEGORY,
        function: "generate",
        inputs: vec![
            InputDecl::required("pipe", InputKind::Link(super::PIPE_TYPE)),
            InputDecl::required("vocal_gender", text(&d.vocal_gender, false)),
            InputDecl::required("style_preset", text(&d.style_preset, false)),
            InputDecl::required("instrument_preset", text(&d.instrument_preset, false)),
            InputDecl::required("lyrics", text(&d.lyrics, true)),
            InputDecl::required("tags", text(&d.tags, true)),
            InputDecl::required(
                "max_audio_length_ms",
                InputKind::Int {
                    default: u64::from(d.max_audio_length_ms),
                    min: u64::from(bounds::MAX_AUDIO_LENGTH_MS.0),
                    max: u64::from(bounds::MAX_AUDIO_LENGTH_MS.1),
                    step: Some(u64::from(bounds::MAX_AUDIO_LENGTH_STEP)),
                },
            ),
            InputDecl::required(
                "topk",
                InputKind::Int {
                    default: u64::from(d.topk),
                    min: u64::from(bounds::TOPK.0),
                    max: u64::from(bounds::TOPK.1),
                    step: None,
                },
            ),
            InputDecl::required(
                "temperature",
                InputKind::Float {
                    default: f64::from(d.temperature),
                    min: bounds::TEMPERATURE.0,
                    max: bounds::TEMPERATURE.1,
                    step: Some(bounds::FLOAT_STEP),
                },
            ),
            InputDecl::required(
                "cfg_scale",
                InputKind::Float {
                    default: f64::from(d.cfg_scale),
                    min: bounds::CFG_SCALE.0,
                    max: bounds::CFG_SCALE.1,
                    step: Some(bounds::FLOAT_STEP),
                },
            ),
            InputDecl::required(
                "seed",
                InputKind::Int {
                    default: d.seed,
                    min: 0,
                    max: u64::MAX,
                    step: None,
                },
            ),
        ],
        return_types: vec![super::AUDIO_TYPE],
        return_names: vec!["audio"],
        output_node: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SampleEncoding, write_wav};
    use crate::pipeline::MusicPipeline;
    use crate::Error;
    use candle_core::{Device, Tensor};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// What the fake pipeline saw on each call.
    #[derive(Debug, Clone)]
    struct Seen {
        save_path: PathBuf,
        inputs: PipelineInputs,
        params: SamplingParams,
        seeds: SeedContext,
    }

    /// Writes `channels` x `samples` of audio, stepping `steps` times.
    struct FakePipeline {
        channels: usize,
        samples: usize,
        steps: u64,
        fail: bool,
        seen: Mutex<Vec<Seen>>,
    }

    impl FakePipeline {
        fn new(channels: usize, samples: usize) -> Self {
            Self {
                channels,
                samples,
                steps: 3,
                fail: false,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(1, 16)
            }
        }
    }

    impl MusicPipeline for FakePipeline {
        fn generate(&self, mut call: PipelineCall<'_>) -> crate::Result<()> {
            self.seen.lock().unwrap().push(Seen {
                save_path: call.save_path.to_path_buf(),
                inputs: call.inputs.clone(),
                params: call.params,
                seeds: call.seeds,
            });
            for step in 0..self.steps {
                (call.callback)(step, self.steps);
            }
            if self.fail {
                return Err(Error::Pipeline("CUDA out of memory".into()));
            }
            let data: Vec<f32> = (0..self.channels * self.samples)
                .map(|i| (i % 100) as f32 / 200.0)
                .collect();
            let frames = if self.channels == 1 {
                Tensor::from_vec(data, self.samples, &Device::Cpu)?
            } else {
                Tensor::from_vec(data, (self.samples, self.channels), &Device::Cpu)?
            };
            write_wav(call.save_path, &frames, 48000, SampleEncoding::Float32)
        }
    }

    fn handle(fake: Arc<FakePipeline>) -> PipelineHandle {
        PipelineHandle::new(fake)
    }

    #[test]
    fn mono_output_is_batch_channel_samples() {
        let fake = Arc::new(FakePipeline::new(1, 64));
        let audio = Generator
            .generate(&handle(fake.clone()), &GenerationRequest::default())
            .unwrap();
        assert_eq!(audio.waveform.dims(), &[1, 1, 64]);
        assert_eq!(audio.sample_rate, 48000);
    }

    #[test]
    fn stereo_output_is_channels_first() {
        let fake = Arc::new(FakePipeline::new(2, 50));
        let audio = Generator
            .generate(&handle(fake), &GenerationRequest::default())
            .unwrap();
        assert_eq!(audio.waveform.dims(), &[1, 2, 50]);
    }

    #[test]
    fn temp_file_removed_after_success() {
        let fake = Arc::new(FakePipeline::new(2, 8));
        Generator
            .generate(&handle(fake.clone()), &GenerationRequest::default())
            .unwrap();
        let seen = fake.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].save_path.extension().is_some_and(|e| e == "wav"));
        assert!(!seen[0].save_path.exists());
    }

    #[test]
    fn temp_file_removed_after_pipeline_error() {
        let fake = Arc::new(FakePipeline::failing());
        let err = Generator
            .generate(&handle(fake.clone()), &GenerationRequest::default())
            .unwrap_err();
        assert!(matches!(err, Error::Pipeline(ref msg) if msg == "CUDA out of memory"));
        let seen = fake.seen.lock().unwrap();
        assert!(!seen[0].save_path.exists());
    }

    #[test]
    fn payload_carries_built_tags_and_params() {
        let fake = Arc::new(FakePipeline::new(1, 8));
        let request = GenerationRequest {
            style_preset: "pop, rock".into(),
            vocal_gender: "Female".into(),
            instrument_preset: "None".into(),
            tags: "bright".into(),
            lyrics: "[verse]\nhello".into(),
            topk: 7,
            temperature: 0.7,
            cfg_scale: 3.0,
            max_audio_length_ms: 4_000,
            seed: 5,
        };
        Generator.generate(&handle(fake.clone()), &request).unwrap();
        let seen = &fake.seen.lock().unwrap()[0];
        assert_eq!(seen.inputs.tags, "pop, rock, female vocal, bright");
        assert_eq!(seen.inputs.lyrics, "[verse]\nhello");
        assert_eq!(seen.params.topk, 7);
        assert_eq!(seen.params.max_audio_length_ms, 4_000);
        assert_eq!(seen.params.cfg_scale, 3.0);
    }

    #[test]
    fn same_seed_gives_same_seed_context() {
        let fake = Arc::new(FakePipeline::new(1, 8));
        let request = GenerationRequest {
            seed: (1u64 << 40) + 3,
            ..Default::default()
        };
        Generator.generate(&handle(fake.clone()), &request).unwrap();
        Generator.generate(&handle(fake.clone()), &request).unwrap();
        let seen = fake.seen.lock().unwrap();
        assert_eq!(seen[0].seeds, seen[1].seeds);
        assert_eq!(seen[0].seeds.framework_seed(), (1u64 << 40) + 3);
        assert_eq!(seen[0].seeds.array_seed(), 3);
    }

    #[test]
    fn progress_counts_one_per_callback() {
        let fake = Arc::new(FakePipeline::new(1, 8));
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&updates);
        let request = GenerationRequest {
            max_audio_length_ms: 8_000,
            ..Default::default()
        };
        Generator
            .generate_with_progress(
                &handle(fake),
                &request,
                Some(Box::new(move |current: u64, total: u64| {
                    sink.lock().unwrap().push((current, total))
                })),
            )
            .unwrap();
        assert_eq!(*updates.lock().unwrap(), vec![(1, 100), (2, 100), (3, 100)]);
    }

    #[test]
    fn bounds_are_enforced_only_at_the_boundary() {
        assert!(check_request(&GenerationRequest::default()).is_ok());

        let zero_topk = GenerationRequest {
            topk: 0,
            ..Default::default()
        };
        assert!(check_request(&zero_topk).is_err());

        let cold = GenerationRequest {
            temperature: 0.05,
            ..Default::default()
        };
        assert!(check_request(&cold).is_err());

        let long = GenerationRequest {
            max_audio_length_ms: 300_001,
            ..Default::default()
        };
        assert!(check_request(&long).is_err());

        // The node itself passes out-of-bounds values straight through.
        let fake = Arc::new(FakePipeline::new(1, 8));
        Generator.generate(&handle(fake.clone()), &zero_topk).unwrap();
        assert_eq!(fake.seen.lock().unwrap()[0].params.topk, 0);
    }

    #[test]
    fn definition_declares_bounds() {
        let json = definition().to_host_json();
        let required = &json["input"]["required"];
        assert_eq!(required["pipe"][0], "HEARTMULA_PIPE");
        assert_eq!(required["topk"][1]["min"], 1);
        assert_eq!(required["max_audio_length_ms"][1]["step"], 1000);
        assert_eq!(required["seed"][1]["max"], u64::MAX);
        assert_eq!(required["lyrics"][1]["multiline"], true);
        assert_eq!(json["output"][0], "AUDIO");
    }
}
