//! Medley lifecycle runner - terminal entry point.
//!
//! Drives one tool through its full lifecycle (resolve → bind → accept input
//! → process → dispose) against a terminal render target. Engines are
//! passthrough stand-ins so the runner works without bundled codecs; real
//! deployments supply their own [`EngineCatalog`].

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use medley_core::engine::{EngineFactory, ProcessingEngine, ProgressSink};
use medley_core::instance::{InputSource, RenderTarget, ToolInstance};
use medley_core::media::{AudioDecoder, PcmAudio};
use medley_core::registry::catalog::{builtin_registry, EngineCatalog};
use medley_core::task::protocol::{TaskResult, TaskSpec, TranscriptSpan};
use medley_core::{Config, Result, RunOutcome, ToolDescriptor};

#[derive(Debug, Parser)]
#[command(name = "medley-runner", about = "Drive a Medley tool through its lifecycle")]
struct Args {
    /// Tool path, e.g. video/mp4 or ml/transcribe
    #[arg(long)]
    tool: String,

    /// Input file to process
    #[arg(long, conflicts_with = "url")]
    input: Option<PathBuf>,

    /// Input URL to process (http(s) or base64 data: URL)
    #[arg(long)]
    url: Option<String>,

    /// Tool parameters as a JSON object
    #[arg(long)]
    params: Option<String>,
}

/// Render target writing to the terminal. There is no DOM to bind against,
/// so every declared element id resolves.
#[derive(Debug)]
struct ConsoleTarget;

impl RenderTarget for ConsoleTarget {
    fn has_element(&self, _element_id: &str) -> bool {
        true
    }
    fn append_log(&mut self, line: &str) {
        println!("{line}");
    }
    fn set_progress(&mut self, percent: f64, stage: &str) {
        println!("  [{percent:>5.1}%] {stage}");
    }
    fn hide_progress(&mut self) {}
    fn render_result(&mut self, result: &TaskResult) {
        match result {
            TaskResult::Media {
                data,
                content_type,
                file_name,
            } => println!("result: {file_name} ({content_type}, {} bytes)", data.len()),
            other => {
                if let Some(text) = other.render_text() {
                    println!("result:\n{text}");
                }
            }
        }
    }
    fn set_action_enabled(&mut self, _enabled: bool) {}
}

/// Passthrough engine: relays the payload as its result, ticking each of its
/// worker-side phases so the whole progress pipeline is exercised.
struct PassthroughEngine {
    name: &'static str,
    work_phases: usize,
    result: fn(&TaskSpec) -> TaskResult,
}

#[async_trait]
impl ProcessingEngine for PassthroughEngine {
    fn name(&self) -> &str {
        self.name
    }

    async fn initialize(&mut self, sink: &ProgressSink) -> Result<()> {
        sink.progress(0, 100.0).await;
        Ok(())
    }

    async fn process(&mut self, spec: &TaskSpec, sink: &ProgressSink) -> Result<TaskResult> {
        for phase in 1..=self.work_phases {
            for raw in [25.0, 50.0, 75.0, 100.0] {
                sink.progress(phase, raw).await;
            }
        }
        Ok((self.result)(spec))
    }
}

fn payload_bytes(spec: &TaskSpec) -> bytes::Bytes {
    match &spec.payload {
        medley_core::task::protocol::TaskPayload::Bytes { data, .. } => data.clone(),
        medley_core::task::protocol::TaskPayload::Audio(_) => bytes::Bytes::new(),
    }
}

fn stub_engines() -> EngineCatalog {
    let transcoder: EngineFactory = Arc::new(|| {
        Box::new(PassthroughEngine {
            name: "passthrough-transcoder",
            work_phases: 2,
            result: |spec| TaskResult::Media {
                data: payload_bytes(spec),
                content_type: "video/mp4".into(),
                file_name: "converted_video.mp4".into(),
            },
        })
    });
    let compressor: EngineFactory = Arc::new(|| {
        Box::new(PassthroughEngine {
            name: "passthrough-compressor",
            work_phases: 1,
            result: |spec| TaskResult::Media {
                data: payload_bytes(spec),
                content_type: "image/jpeg".into(),
                file_name: "compressed.jpg".into(),
            },
        })
    });
    let recognizer: EngineFactory = Arc::new(|| {
        Box::new(PassthroughEngine {
            name: "passthrough-recognizer",
            work_phases: 1,
            result: |_| TaskResult::Recognition {
                text: "(passthrough: no recognition model loaded)".into(),
                confidence: 0.0,
            },
        })
    });
    let transcriber: EngineFactory = Arc::new(|| {
        Box::new(PassthroughEngine {
            name: "passthrough-transcriber",
            work_phases: 1,
            result: |spec| {
                let duration = match &spec.payload {
                    medley_core::task::protocol::TaskPayload::Audio(audio) => {
                        audio.duration_secs()
                    }
                    _ => 0.0,
                };
                TaskResult::Transcript {
                    text: "(passthrough: no speech model loaded)".into(),
                    spans: vec![TranscriptSpan {
                        start_secs: 0.0,
                        end_secs: duration,
                        text: "(passthrough: no speech model loaded)".into(),
                    }],
                }
            },
        })
    });

    EngineCatalog {
        transcoder,
        compressor,
        recognizer,
        transcriber,
    }
}

/// Diagnostic decoder: input bytes are 16-bit little-endian PCM at 16 kHz.
#[derive(Debug)]
struct RawPcmDecoder;

#[async_trait]
impl AudioDecoder for RawPcmDecoder {
    async fn decode(&self, data: &[u8]) -> Result<PcmAudio> {
        let samples = data
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / i16::MAX as f32)
            .collect();
        Ok(PcmAudio {
            sample_rate: 16_000,
            channels: 1,
            samples,
        })
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    medley_core::observability::init_tracing();
    let args = Args::parse();

    let descriptor = ToolDescriptor::parse(&args.tool)?;
    let registry = builtin_registry(stub_engines())?;
    let module = registry.resolve(&descriptor).await?;
    tracing::info!("resolved {} ({})", descriptor, module.title());

    let mut instance = ToolInstance::new(
        module,
        Box::new(ConsoleTarget),
        Arc::new(Config::default()),
    )
    .with_audio_decoder(Arc::new(RawPcmDecoder));

    instance.initialize()?;

    let source = match (args.input, args.url) {
        (Some(path), _) => InputSource::File(path),
        (None, Some(url)) => InputSource::Url(url),
        (None, None) => return Err("one of --input or --url is required".into()),
    };
    instance.accept_input(source)?;

    if let Some(params) = args.params {
        instance.set_parameters(serde_json::from_str(&params)?)?;
    }

    let outcome = instance.run().await?;
    instance.dispose();

    match outcome {
        RunOutcome::Succeeded(_) => Ok(()),
        RunOutcome::Failed(failure) => Err(failure.message.into()),
    }
}
