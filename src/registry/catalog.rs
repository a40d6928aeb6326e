//! Built-in tool catalog.
//!
//! The closed set of installable tools, wired to embedder-supplied engine
//! factories; the heavy codec/OCR/ASR libraries stay opaque behind
//! [`crate::engine::ProcessingEngine`]. Markup templates are the minimal
//! structures the element maps refer to; the surrounding chrome belongs to
//! the embedding page.

use serde_json::json;
use std::sync::Arc;

use crate::engine::EngineFactory;
use crate::instance::bindings::ElementSpec;
use crate::instance::input::MediaKind;
use crate::progress::PhasePlan;
use crate::registry::params::{ParamDef, ParamType};
use crate::registry::{ModuleLoader, ModuleRegistry, ModuleSource, ToolDescriptor, ToolModule};
use crate::types::Result;

/// Engine factories for the built-in tools, supplied by the embedder.
#[derive(Clone)]
pub struct EngineCatalog {
    /// Video re-encode engine (`video/mp4`).
    pub transcoder: EngineFactory,
    /// Image compression engine (`image/compress`).
    pub compressor: EngineFactory,
    /// OCR engine (`ml/image2text`).
    pub recognizer: EngineFactory,
    /// Speech-recognition engine (`ml/transcribe`).
    pub transcriber: EngineFactory,
}

impl std::fmt::Debug for EngineCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineCatalog").finish_non_exhaustive()
    }
}

/// Build the registry with every built-in tool registered.
pub fn builtin_registry(engines: EngineCatalog) -> Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();

    let transcoder = engines.transcoder.clone();
    register(&mut registry, "video/mp4", move |descriptor| {
        Arc::new(Mp4ConvertModule::new(descriptor, transcoder.clone()))
    })?;

    let compressor = engines.compressor.clone();
    register(&mut registry, "image/compress", move |descriptor| {
        Arc::new(CompressModule::new(descriptor, compressor.clone()))
    })?;

    let recognizer = engines.recognizer.clone();
    register(&mut registry, "ml/image2text", move |descriptor| {
        Arc::new(ImageToTextModule::new(descriptor, recognizer.clone()))
    })?;

    let transcriber = engines.transcriber.clone();
    register(&mut registry, "ml/transcribe", move |descriptor| {
        Arc::new(TranscribeModule::new(descriptor, transcriber.clone()))
    })?;

    Ok(registry)
}

fn register<F>(registry: &mut ModuleRegistry, path: &'static str, build: F) -> Result<()>
where
    F: Fn(ToolDescriptor) -> Arc<dyn ToolModule> + Send + Sync + 'static,
{
    let descriptor = ToolDescriptor::parse(path)?;
    let loader: ModuleLoader = Arc::new(move || Ok(build(ToolDescriptor::parse(path)?)));
    registry.register(&descriptor, ModuleSource::new(loader))
}

// =============================================================================
// video/mp4 — re-encode to MP4
// =============================================================================

const MP4_TEMPLATE: &str = r#"
<div class="tool-container">
  <h1>Convert to MP4</h1>
  <div id="dropZone"><input type="file" id="fileInput" accept="video/*"></div>
  <video id="input-video" controls></video>
  <select id="resolution"></select>
  <select id="quality"></select>
  <input type="number" id="bitrate" value="2500" min="300">
  <button id="processBtn">Convert to MP4</button>
  <div id="progress"></div>
  <div id="outputContainer"><div id="downloadContainer"></div></div>
  <textarea id="logContent" readonly></textarea>
</div>
"#;

const MP4_ELEMENTS: &[ElementSpec] = &[
    ElementSpec::required("dropZone", "dropZone"),
    ElementSpec::required("fileInput", "fileInput"),
    ElementSpec::optional("inputVideo", "input-video"),
    ElementSpec::required("resolution", "resolution"),
    ElementSpec::required("quality", "quality"),
    ElementSpec::required("bitrate", "bitrate"),
    ElementSpec::required("processBtn", "processBtn"),
    ElementSpec::required("progress", "progress"),
    ElementSpec::optional("downloadContainer", "downloadContainer"),
    ElementSpec::optional("logContent", "logContent"),
];

struct Mp4ConvertModule {
    descriptor: ToolDescriptor,
    parameters: Vec<ParamDef>,
    engine: EngineFactory,
}

impl Mp4ConvertModule {
    fn new(descriptor: ToolDescriptor, engine: EngineFactory) -> Self {
        let parameters = vec![
            ParamDef::new(
                "resolution",
                ParamType::Enum(
                    ["source", "2160p", "1440p", "1080p", "720p", "480p", "360p"]
                        .map(String::from)
                        .to_vec(),
                ),
                "Output resolution, or keep the source",
                Some(json!("source")),
            ),
            ParamDef::new(
                "quality",
                ParamType::Enum(["high", "medium", "low"].map(String::from).to_vec()),
                "Encoder preset",
                Some(json!("medium")),
            ),
            ParamDef::new(
                "bitrate_kbps",
                ParamType::Int,
                "Target video bitrate in kb/s",
                Some(json!(2500)),
            ),
        ];
        Self {
            descriptor,
            parameters,
            engine,
        }
    }
}

impl ToolModule for Mp4ConvertModule {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }
    fn title(&self) -> &str {
        "Convert to MP4"
    }
    fn template(&self) -> &str {
        MP4_TEMPLATE
    }
    fn element_map(&self) -> &[ElementSpec] {
        MP4_ELEMENTS
    }
    fn accepted_inputs(&self) -> &[MediaKind] {
        &[MediaKind::Video]
    }
    fn parameters(&self) -> &[ParamDef] {
        &self.parameters
    }
    fn phase_plan(&self) -> PhasePlan {
        PhasePlan::new(["prepare input", "load encoder", "transcode", "finalize output"])
    }
    fn create_engine(&self) -> Box<dyn crate::engine::ProcessingEngine> {
        (self.engine)()
    }
}

// =============================================================================
// image/compress — image compression
// =============================================================================

const COMPRESS_TEMPLATE: &str = r#"
<div class="tool-container">
  <h1>Image Compressor</h1>
  <div id="dropZone"><input type="file" id="fileInput" accept="image/jpeg,image/png,image/webp"></div>
  <img id="preview">
  <input type="range" id="quality" min="0.1" max="1.0" step="0.05" value="0.6">
  <button id="processBtn" disabled>Compress Image</button>
  <div id="progress"></div>
  <div id="outputContainer"><div id="downloadContainer"></div></div>
  <textarea id="logContent" readonly></textarea>
</div>
"#;

const COMPRESS_ELEMENTS: &[ElementSpec] = &[
    ElementSpec::required("dropZone", "dropZone"),
    ElementSpec::required("fileInput", "fileInput"),
    ElementSpec::optional("preview", "preview"),
    ElementSpec::required("quality", "quality"),
    ElementSpec::required("processBtn", "processBtn"),
    ElementSpec::required("progress", "progress"),
    ElementSpec::optional("downloadContainer", "downloadContainer"),
    ElementSpec::optional("logContent", "logContent"),
];

struct CompressModule {
    descriptor: ToolDescriptor,
    parameters: Vec<ParamDef>,
    engine: EngineFactory,
}

impl CompressModule {
    fn new(descriptor: ToolDescriptor, engine: EngineFactory) -> Self {
        let parameters = vec![
            ParamDef::new(
                "quality",
                ParamType::Float,
                "Compression quality, 0.1–1.0",
                Some(json!(0.6)),
            ),
            ParamDef::new(
                "format",
                ParamType::Enum(["auto", "jpeg", "png", "webp"].map(String::from).to_vec()),
                "Output format",
                Some(json!("auto")),
            ),
            ParamDef::new(
                "preserve_exif",
                ParamType::Bool,
                "Keep EXIF metadata in the output",
                Some(json!(false)),
            ),
        ];
        Self {
            descriptor,
            parameters,
            engine,
        }
    }
}

impl ToolModule for CompressModule {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }
    fn title(&self) -> &str {
        "Image Compressor"
    }
    fn template(&self) -> &str {
        COMPRESS_TEMPLATE
    }
    fn element_map(&self) -> &[ElementSpec] {
        COMPRESS_ELEMENTS
    }
    fn accepted_inputs(&self) -> &[MediaKind] {
        &[MediaKind::Image]
    }
    fn parameters(&self) -> &[ParamDef] {
        &self.parameters
    }
    fn phase_plan(&self) -> PhasePlan {
        PhasePlan::new(["prepare input", "load compressor", "compress"])
    }
    fn create_engine(&self) -> Box<dyn crate::engine::ProcessingEngine> {
        (self.engine)()
    }
}

// =============================================================================
// ml/image2text — OCR
// =============================================================================

const IMAGE2TEXT_TEMPLATE: &str = r#"
<div class="tool-container">
  <h1>Image to Text (OCR)</h1>
  <div id="dropZone"><input type="file" id="fileInput" accept="image/*"></div>
  <img id="input-image">
  <select id="languageSelect"></select>
  <button id="processBtn">Extract Text</button>
  <div id="progress"><div id="progressText"></div></div>
  <div id="outputContainer"><div id="textOutput"></div><div id="confidenceIndicator"></div></div>
  <textarea id="logContent" readonly></textarea>
</div>
"#;

const IMAGE2TEXT_ELEMENTS: &[ElementSpec] = &[
    ElementSpec::required("dropZone", "dropZone"),
    ElementSpec::required("fileInput", "fileInput"),
    ElementSpec::optional("inputImage", "input-image"),
    ElementSpec::required("languageSelect", "languageSelect"),
    ElementSpec::required("processBtn", "processBtn"),
    ElementSpec::required("progress", "progress"),
    ElementSpec::required("textOutput", "textOutput"),
    ElementSpec::optional("confidenceIndicator", "confidenceIndicator"),
    ElementSpec::optional("logContent", "logContent"),
];

const OCR_LANGUAGES: &[&str] = &[
    "eng", "fra", "deu", "spa", "ita", "por", "rus", "chi_sim", "chi_tra", "jpn", "kor", "ara",
    "hin",
];

struct ImageToTextModule {
    descriptor: ToolDescriptor,
    parameters: Vec<ParamDef>,
    engine: EngineFactory,
}

impl ImageToTextModule {
    fn new(descriptor: ToolDescriptor, engine: EngineFactory) -> Self {
        let parameters = vec![ParamDef::new(
            "language",
            ParamType::Enum(OCR_LANGUAGES.iter().map(|s| s.to_string()).collect()),
            "Recognition language",
            Some(json!("eng")),
        )];
        Self {
            descriptor,
            parameters,
            engine,
        }
    }
}

impl ToolModule for ImageToTextModule {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }
    fn title(&self) -> &str {
        "Image to Text (OCR)"
    }
    fn template(&self) -> &str {
        IMAGE2TEXT_TEMPLATE
    }
    fn element_map(&self) -> &[ElementSpec] {
        IMAGE2TEXT_ELEMENTS
    }
    fn accepted_inputs(&self) -> &[MediaKind] {
        &[MediaKind::Image]
    }
    fn parameters(&self) -> &[ParamDef] {
        &self.parameters
    }
    fn phase_plan(&self) -> PhasePlan {
        PhasePlan::new(["prepare input", "load recognizer", "recognize"])
    }
    fn create_engine(&self) -> Box<dyn crate::engine::ProcessingEngine> {
        (self.engine)()
    }
}

// =============================================================================
// ml/transcribe — speech transcription
// =============================================================================

const TRANSCRIBE_TEMPLATE: &str = r#"
<div class="tool-container">
  <h1>Audio/Video Transcription</h1>
  <select id="transcribe-model-select"></select>
  <div id="transcribe-drop-zone"><input type="file" id="transcribe-file-input" accept="audio/*,video/*"></div>
  <input type="url" id="transcribe-url-input">
  <button id="transcribe-url-btn">Load URL</button>
  <button id="transcribe-process-btn" disabled>Transcribe Audio/Video</button>
  <div id="transcribe-progress"><div id="transcribe-progress-bar"></div></div>
  <div id="transcribe-result"><div id="transcribe-result-text"></div></div>
  <textarea id="transcribe-log-text" readonly></textarea>
</div>
"#;

const TRANSCRIBE_ELEMENTS: &[ElementSpec] = &[
    ElementSpec::required("modelSelect", "transcribe-model-select"),
    ElementSpec::required("dropZone", "transcribe-drop-zone"),
    ElementSpec::required("fileInput", "transcribe-file-input"),
    ElementSpec::optional("urlInput", "transcribe-url-input"),
    ElementSpec::optional("urlBtn", "transcribe-url-btn"),
    ElementSpec::required("processBtn", "transcribe-process-btn"),
    ElementSpec::required("progress", "transcribe-progress"),
    ElementSpec::required("resultText", "transcribe-result-text"),
    ElementSpec::optional("logText", "transcribe-log-text"),
];

struct TranscribeModule {
    descriptor: ToolDescriptor,
    parameters: Vec<ParamDef>,
    engine: EngineFactory,
}

impl TranscribeModule {
    fn new(descriptor: ToolDescriptor, engine: EngineFactory) -> Self {
        let parameters = vec![
            ParamDef::new(
                "model",
                ParamType::String,
                "Recognition model identifier",
                Some(json!("tiny.en")),
            ),
            ParamDef::new(
                "task",
                ParamType::Enum(["transcribe", "translate"].map(String::from).to_vec()),
                "Transcribe in the spoken language or translate to English",
                Some(json!("transcribe")),
            ),
            ParamDef::new(
                "language",
                ParamType::Optional(Box::new(ParamType::String)),
                "Spoken language hint for multilingual models",
                None,
            ),
            ParamDef::new(
                "return_timestamps",
                ParamType::Bool,
                "Emit timestamped segments",
                Some(json!(false)),
            ),
        ];
        Self {
            descriptor,
            parameters,
            engine,
        }
    }
}

impl ToolModule for TranscribeModule {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }
    fn title(&self) -> &str {
        "Audio/Video Transcription"
    }
    fn template(&self) -> &str {
        TRANSCRIBE_TEMPLATE
    }
    fn element_map(&self) -> &[ElementSpec] {
        TRANSCRIBE_ELEMENTS
    }
    fn accepted_inputs(&self) -> &[MediaKind] {
        &[MediaKind::Audio, MediaKind::Video]
    }
    fn parameters(&self) -> &[ParamDef] {
        &self.parameters
    }
    fn phase_plan(&self) -> PhasePlan {
        PhasePlan::new(["fetch input", "decode audio", "load model", "transcribe"])
    }
    fn requires_audio_decode(&self) -> bool {
        true
    }
    fn create_engine(&self) -> Box<dyn crate::engine::ProcessingEngine> {
        (self.engine)()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ProcessingEngine, ProgressSink};
    use crate::registry::params::validate_params;
    use crate::task::protocol::{TaskResult, TaskSpec};
    use async_trait::async_trait;

    struct NoopEngine;

    #[async_trait]
    impl ProcessingEngine for NoopEngine {
        fn name(&self) -> &str {
            "noop"
        }
        async fn initialize(&mut self, _sink: &ProgressSink) -> Result<()> {
            Ok(())
        }
        async fn process(&mut self, _spec: &TaskSpec, _sink: &ProgressSink) -> Result<TaskResult> {
            Ok(TaskResult::Text { text: "ok".into() })
        }
    }

    fn engines() -> EngineCatalog {
        let factory: EngineFactory = Arc::new(|| Box::new(NoopEngine));
        EngineCatalog {
            transcoder: factory.clone(),
            compressor: factory.clone(),
            recognizer: factory.clone(),
            transcriber: factory,
        }
    }

    #[tokio::test]
    async fn all_builtin_tools_resolve() {
        let registry = builtin_registry(engines()).unwrap();
        assert_eq!(registry.len(), 4);

        for path in ["video/mp4", "image/compress", "ml/image2text", "ml/transcribe"] {
            let descriptor = ToolDescriptor::parse(path).unwrap();
            let module = registry.resolve(&descriptor).await.unwrap();
            assert_eq!(module.descriptor().path(), path);
            assert!(!module.template().is_empty());
            assert!(!module.element_map().is_empty());
            assert!(module.phase_plan().len() >= 2);
        }
    }

    #[tokio::test]
    async fn templates_contain_declared_required_elements() {
        let registry = builtin_registry(engines()).unwrap();
        for path in registry.list_paths() {
            let descriptor = ToolDescriptor::parse(&path).unwrap();
            let module = registry.resolve(&descriptor).await.unwrap();
            for spec in module.element_map().iter().filter(|s| s.required) {
                assert!(
                    module
                        .template()
                        .contains(&format!("id=\"{}\"", spec.element_id)),
                    "{path}: template missing required element #{}",
                    spec.element_id
                );
            }
        }
    }

    #[tokio::test]
    async fn transcribe_requires_caller_side_decode() {
        let registry = builtin_registry(engines()).unwrap();
        let transcribe = registry
            .resolve(&ToolDescriptor::parse("ml/transcribe").unwrap())
            .await
            .unwrap();
        assert!(transcribe.requires_audio_decode());
        // Decode is its own early phase
        assert_eq!(transcribe.phase_plan().label(1), "decode audio");

        let mp4 = registry
            .resolve(&ToolDescriptor::parse("video/mp4").unwrap())
            .await
            .unwrap();
        assert!(!mp4.requires_audio_decode());
    }

    #[tokio::test]
    async fn default_parameters_validate() {
        let registry = builtin_registry(engines()).unwrap();
        for path in registry.list_paths() {
            let descriptor = ToolDescriptor::parse(&path).unwrap();
            let module = registry.resolve(&descriptor).await.unwrap();

            let mut params = serde_json::json!({});
            crate::registry::params::fill_defaults(module.parameters(), &mut params);
            let errors = validate_params(module.parameters(), &params);
            assert!(errors.is_empty(), "{path}: {errors:?}");
        }
    }

    #[tokio::test]
    async fn mp4_parameters_follow_the_settings_controls() {
        let registry = builtin_registry(engines()).unwrap();
        let module = registry
            .resolve(&ToolDescriptor::parse("video/mp4").unwrap())
            .await
            .unwrap();

        let ok = serde_json::json!({"resolution": "720p", "quality": "high", "bitrate_kbps": 1200});
        assert!(validate_params(module.parameters(), &ok).is_empty());

        let bad = serde_json::json!({"resolution": "999p"});
        let errors = validate_params(module.parameters(), &bad);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("999p"));
    }
}
