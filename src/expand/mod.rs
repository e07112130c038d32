pub mod prompts;

use std::sync::Arc;
use std::time::Duration;

use crate::error::{OutpaintError, Result};
use crate::models::{Dimensions, EditMethod, ExpansionResult, FillSide, ImageFormat};
use crate::provider::{EditRequest, GenerationRequest, ImageProvider};
use crate::raster::{self, RasterImage};

/// Total edit submissions before the pipeline gives up and falls back to
/// direct generation.
const MAX_EDIT_ATTEMPTS: u32 = 3;

/// Fill color of the to-be-painted half.
const FILL_COLOR: [u8; 3] = [255, 255, 255];

/// Request-scoped working record for one expansion. Created at request
/// start, mutated as attempts proceed, discarded once the response is built.
struct ExpansionJob {
    base_prompt: String,
    revised_prompt: Option<String>,
    base_image: Option<RasterImage>,
    format: ImageFormat,
    fill_side: Option<FillSide>,
    canvas: Option<RasterImage>,
    mask: Option<RasterImage>,
    edit_prompt: String,
    attempts: u32,
    max_attempts: u32,
}

impl ExpansionJob {
    fn new(prompt: &str, complexity: Option<f32>, format: ImageFormat) -> Self {
        Self {
            base_prompt: prompts::augment_prompt(prompt, complexity),
            revised_prompt: None,
            base_image: None,
            format,
            fill_side: format.fill_side(),
            canvas: None,
            mask: None,
            edit_prompt: String::new(),
            attempts: 0,
            max_attempts: MAX_EDIT_ATTEMPTS,
        }
    }

    /// The prompt carried forward for continuity: the provider's rewrite
    /// when it returned one, the caller's prompt otherwise.
    fn effective_prompt(&self) -> &str {
        self.revised_prompt.as_deref().unwrap_or(&self.base_prompt)
    }

    fn base_image(&self) -> Result<&RasterImage> {
        self.base_image
            .as_ref()
            .ok_or_else(|| OutpaintError::ResponseError("base image missing from job".into()))
    }

    fn canvas(&self) -> Result<&RasterImage> {
        self.canvas
            .as_ref()
            .ok_or_else(|| OutpaintError::ResponseError("fill canvas missing from job".into()))
    }

    fn mask(&self) -> Result<&RasterImage> {
        self.mask
            .as_ref()
            .ok_or_else(|| OutpaintError::ResponseError("fill mask missing from job".into()))
    }

    fn fill_side(&self) -> Result<FillSide> {
        self.fill_side
            .ok_or_else(|| OutpaintError::ResponseError("square job has no fill side".into()))
    }
}

/// The expansion pipeline's states. Each request walks
/// `GeneratingBase -> ChoosingFormat -> (Done | BuildingFillSide) -> Editing
/// -> Stitching -> Done`, with the alternate path `Editing -> FallbackGenerating
/// -> Done` once edit retries are exhausted.
enum ExpandState {
    GeneratingBase,
    ChoosingFormat,
    BuildingFillSide,
    Editing,
    Stitching(RasterImage),
    FallbackGenerating,
    Done(ExpansionResult),
}

impl ExpandState {
    fn name(&self) -> &'static str {
        match self {
            ExpandState::GeneratingBase => "generating_base",
            ExpandState::ChoosingFormat => "choosing_format",
            ExpandState::BuildingFillSide => "building_fill_side",
            ExpandState::Editing => "editing",
            ExpandState::Stitching(_) => "stitching",
            ExpandState::FallbackGenerating => "fallback_generating",
            ExpandState::Done(_) => "done",
        }
    }
}

/// Drives one expansion request through the state machine above against an
/// injected [`ImageProvider`].
pub struct Expander {
    provider: Arc<dyn ImageProvider>,
    backoff_base: Duration,
}

impl Expander {
    pub fn new(provider: Arc<dyn ImageProvider>) -> Self {
        Self {
            provider,
            backoff_base: Duration::from_secs(1),
        }
    }

    /// Override the exponential backoff base (production default 1 s).
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Run one expansion to completion.
    ///
    /// Only base-generation failure escapes as an error; every later failure
    /// degrades to a still-successful result carrying the best available
    /// image and an `error` note.
    pub async fn expand(
        &self,
        prompt: &str,
        complexity: Option<f32>,
        format: ImageFormat,
    ) -> Result<ExpansionResult> {
        let mut job = ExpansionJob::new(prompt, complexity, format);
        let mut state = ExpandState::GeneratingBase;
        let _timer = crate::logger::timer("expansion");

        loop {
            match self.step(&mut job, state).await? {
                ExpandState::Done(result) => {
                    log::info!(
                        "Expansion finished: format={} expanded={} method={:?} attempts={}",
                        result.format,
                        result.is_expanded,
                        result.edit_method,
                        job.attempts
                    );
                    return Ok(result);
                }
                next => state = next,
            }
        }
    }

    /// Run one independent expansion per requested format, in parallel.
    /// Jobs share nothing; results come back in input order.
    pub async fn expand_all(
        &self,
        prompt: &str,
        complexity: Option<f32>,
        formats: &[ImageFormat],
    ) -> Vec<Result<ExpansionResult>> {
        let jobs = formats
            .iter()
            .map(|format| self.expand(prompt, complexity, *format));
        futures::future::join_all(jobs).await
    }

    async fn step(&self, job: &mut ExpansionJob, state: ExpandState) -> Result<ExpandState> {
        log::debug!(
            "Expansion state={} format={} attempts={}",
            state.name(),
            job.format,
            job.attempts
        );

        match state {
            ExpandState::GeneratingBase => self.generate_base(job).await,
            ExpandState::ChoosingFormat => self.choose_format(job),
            ExpandState::BuildingFillSide => self.build_fill_side(job),
            ExpandState::Editing => self.attempt_edit(job).await,
            ExpandState::Stitching(edited) => self.stitch_halves(job, edited),
            ExpandState::FallbackGenerating => self.generate_fallback(job).await,
            done @ ExpandState::Done(_) => Ok(done),
        }
    }

    async fn generate_base(&self, job: &mut ExpansionJob) -> Result<ExpandState> {
        let request = GenerationRequest::new(
            job.base_prompt.clone(),
            ImageFormat::Square.as_size_str(),
        );
        match self.provider.generate(request).await {
            Ok(generated) => {
                log::info!(
                    "Base image generated: {} ({} bytes), revised_prompt={}",
                    generated.image.dimensions(),
                    generated.image.byte_len(),
                    generated.revised_prompt.is_some()
                );
                job.revised_prompt = generated.revised_prompt;
                job.base_image = Some(generated.image);
                Ok(ExpandState::ChoosingFormat)
            }
            // Fatal for the whole request: without a base image there is
            // nothing to degrade to.
            Err(e) => Err(OutpaintError::BaseGenerationFailed(e.to_string())),
        }
    }

    fn choose_format(&self, job: &ExpansionJob) -> Result<ExpandState> {
        if job.format == ImageFormat::Square {
            Ok(ExpandState::Done(self.square_result(job, None)?))
        } else {
            Ok(ExpandState::BuildingFillSide)
        }
    }

    fn build_fill_side(&self, job: &mut ExpansionJob) -> Result<ExpandState> {
        let side = ImageFormat::SQUARE_SIZE;

        // The base half stays untouched: its mask protects every pixel. Only
        // the fill half crosses the wire to the edit endpoint.
        let protect_mask = raster::build_mask(side, side, false)?;
        debug_assert!(raster::validate(&protect_mask).valid);

        let canvas = raster::solid_canvas(side, side, FILL_COLOR)?;
        let mut fill_mask = raster::build_mask(side, side, true)?;

        let report = raster::validate(&fill_mask);
        if !report.valid {
            log::warn!(
                "Freshly built mask failed validation ({}), repairing",
                report.reasons.join("; ")
            );
            fill_mask = raster::repair(&fill_mask)?;
        }

        job.edit_prompt =
            prompts::edit_prompt(job.effective_prompt(), job.format, job.fill_side()?);

        log::info!(
            "Fill side prepared: side={:?} canvas={}B mask={}B channels={} alpha={}",
            job.fill_side()?,
            canvas.byte_len(),
            fill_mask.byte_len(),
            fill_mask.channels(),
            fill_mask.has_alpha()
        );

        job.canvas = Some(canvas);
        job.mask = Some(fill_mask);
        Ok(ExpandState::Editing)
    }

    async fn attempt_edit(&self, job: &mut ExpansionJob) -> Result<ExpandState> {
        job.attempts += 1;
        let request = EditRequest::new(
            job.canvas()?.clone(),
            job.mask()?.clone(),
            job.edit_prompt.clone(),
        );

        log::info!(
            "Edit attempt {}/{}: mask_channels={} mask_alpha={} prompt_len={}",
            job.attempts,
            job.max_attempts,
            request.mask.channels(),
            request.mask.has_alpha(),
            request.prompt.len()
        );

        match self.provider.edit(request).await {
            Ok(edited) => Ok(ExpandState::Stitching(edited.image)),
            Err(e) => {
                log::warn!("Edit attempt {} failed: {}", job.attempts, e);
                self.recover_from_edit_failure(job, &e)?;

                if job.attempts >= job.max_attempts {
                    let exhausted = OutpaintError::EditExhaustedRetries {
                        attempts: job.attempts,
                        message: e.to_string(),
                    };
                    log::warn!("{}; switching to generation fallback", exhausted);
                    Ok(ExpandState::FallbackGenerating)
                } else {
                    let delay = self.backoff_base * 2u32.pow(job.attempts);
                    log::debug!("Backing off {:?} before next edit attempt", delay);
                    tokio::time::sleep(delay).await;
                    Ok(ExpandState::Editing)
                }
            }
        }
    }

    /// Mutate the job according to the failure class so the next attempt
    /// submits something different.
    fn recover_from_edit_failure(
        &self,
        job: &mut ExpansionJob,
        error: &OutpaintError,
    ) -> Result<()> {
        match error {
            OutpaintError::ContentPolicyRejected(_) => {
                job.edit_prompt = prompts::soften(&job.edit_prompt);
                log::info!("Softened edit prompt after content-policy rejection");
            }
            OutpaintError::MaskFormatInvalid(_) => {
                // The rejection message doesn't say which part was refused,
                // so repair the mask and normalize the canvas.
                let repaired = raster::repair(job.mask()?)?;
                log::info!(
                    "Repaired mask after format rejection: channels={} alpha={}",
                    repaired.channels(),
                    repaired.has_alpha()
                );
                job.mask = Some(repaired);
                job.canvas = Some(raster::normalize(job.canvas()?)?);
            }
            // Timeouts and generic provider failures retry unchanged.
            _ => {}
        }
        Ok(())
    }

    fn stitch_halves(&self, job: &ExpansionJob, edited: RasterImage) -> Result<ExpandState> {
        let composite = raster::stitch(job.base_image()?, &edited, job.format)?;
        log::info!(
            "Stitched composite: {} ({} bytes)",
            composite.dimensions(),
            composite.byte_len()
        );

        Ok(ExpandState::Done(ExpansionResult {
            url: composite.to_data_uri(),
            format: job.format,
            requested_dimensions: job.format.dimensions(),
            actual_dimensions: composite.dimensions(),
            is_expanded: true,
            is_base64: true,
            edit_method: EditMethod::MaskStitch,
            used_fallback: false,
            error: None,
        }))
    }

    async fn generate_fallback(&self, job: &mut ExpansionJob) -> Result<ExpandState> {
        let prompt = prompts::fallback_prompt(job.effective_prompt(), job.format);
        let request = GenerationRequest::new(prompt, job.format.as_size_str());

        match self.provider.generate(request).await {
            Ok(generated) => {
                log::info!(
                    "Fallback generation succeeded: {} ({} bytes)",
                    generated.image.dimensions(),
                    generated.image.byte_len()
                );
                Ok(ExpandState::Done(ExpansionResult {
                    url: generated.image.to_data_uri(),
                    format: job.format,
                    requested_dimensions: job.format.dimensions(),
                    actual_dimensions: generated.image.dimensions(),
                    is_expanded: true,
                    is_base64: true,
                    edit_method: EditMethod::Generation,
                    used_fallback: true,
                    error: None,
                }))
            }
            Err(e) => {
                let failure = OutpaintError::FallbackGenerationFailed(e.to_string());
                log::warn!("{}; returning the unexpanded base image", failure);
                Ok(ExpandState::Done(self.square_result(
                    job,
                    Some(format!(
                        "expansion failed after {} edit attempts and generation fallback: {}",
                        job.attempts, e
                    )),
                )?))
            }
        }
    }

    /// Result carrying the original 1024x1024 base image: the terminal state
    /// for square requests and for the fully degraded path. Still a success;
    /// a usable image is delivered either way.
    fn square_result(&self, job: &ExpansionJob, error: Option<String>) -> Result<ExpansionResult> {
        let base = job.base_image()?;
        Ok(ExpansionResult {
            url: base.to_data_uri(),
            format: job.format,
            requested_dimensions: job.format.dimensions(),
            actual_dimensions: Dimensions::new(
                ImageFormat::SQUARE_SIZE,
                ImageFormat::SQUARE_SIZE,
            ),
            is_expanded: false,
            is_base64: true,
            edit_method: EditMethod::None,
            used_fallback: false,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::GeneratedImage;
    use async_trait::async_trait;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn square_image(rgb: [u8; 3]) -> RasterImage {
        raster::solid_canvas(1024, 1024, rgb).unwrap()
    }

    fn generated(rgb: [u8; 3], revised: Option<&str>) -> GeneratedImage {
        GeneratedImage {
            image: square_image(rgb),
            revised_prompt: revised.map(String::from),
        }
    }

    fn generated_sized(format: ImageFormat) -> GeneratedImage {
        let dims = format.dimensions();
        GeneratedImage {
            image: raster::solid_canvas(dims.width, dims.height, [128, 128, 128]).unwrap(),
            revised_prompt: None,
        }
    }

    /// Scripted provider: pops pre-seeded outcomes and records every request
    /// it receives.
    #[derive(Default)]
    struct FakeProvider {
        generate_outcomes: Mutex<VecDeque<Result<GeneratedImage>>>,
        edit_outcomes: Mutex<VecDeque<Result<GeneratedImage>>>,
        generate_requests: Mutex<Vec<GenerationRequest>>,
        edit_requests: Mutex<Vec<EditRequest>>,
    }

    impl FakeProvider {
        fn push_generate(&self, outcome: Result<GeneratedImage>) {
            self.generate_outcomes.lock().unwrap().push_back(outcome);
        }

        fn push_edit(&self, outcome: Result<GeneratedImage>) {
            self.edit_outcomes.lock().unwrap().push_back(outcome);
        }

        fn edit_count(&self) -> usize {
            self.edit_requests.lock().unwrap().len()
        }

        fn edit_prompts(&self) -> Vec<String> {
            self.edit_requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.prompt.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ImageProvider for FakeProvider {
        async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage> {
            self.generate_requests.lock().unwrap().push(request);
            self.generate_outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(OutpaintError::ResponseError("unscripted generate".into())))
        }

        async fn edit(&self, request: EditRequest) -> Result<GeneratedImage> {
            self.edit_requests.lock().unwrap().push(request);
            self.edit_outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(OutpaintError::ResponseError("unscripted edit".into())))
        }
    }

    fn expander(provider: Arc<FakeProvider>) -> Expander {
        Expander::new(provider).with_backoff_base(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn square_format_never_invokes_edit() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_generate(Ok(generated([10, 10, 10], None)));

        let result = expander(provider.clone())
            .expand("a red bicycle", None, ImageFormat::Square)
            .await
            .unwrap();

        assert_eq!(provider.edit_count(), 0);
        assert!(!result.is_expanded);
        assert_eq!(result.edit_method, EditMethod::None);
        assert_eq!(result.actual_dimensions, Dimensions::new(1024, 1024));
        assert!(result.error.is_none());
        assert!(result.url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn landscape_first_attempt_success() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_generate(Ok(generated(
            [200, 30, 30],
            Some("a detailed red bicycle leaning against a wall"),
        )));
        provider.push_edit(Ok(generated([30, 30, 200], None)));

        let result = expander(provider.clone())
            .expand("a red bicycle", None, ImageFormat::Landscape)
            .await
            .unwrap();

        assert_eq!(provider.generate_requests.lock().unwrap().len(), 1);
        assert_eq!(provider.edit_count(), 1);

        let prompt = &provider.edit_prompts()[0];
        assert!(prompt.contains("right half"));
        assert!(prompt.contains("landscape"));
        assert!(prompt.contains("a detailed red bicycle"));

        assert!(result.is_expanded);
        assert_eq!(result.edit_method, EditMethod::MaskStitch);
        assert!(!result.used_fallback);
        assert_eq!(result.actual_dimensions, Dimensions::new(1792, 1024));
        assert_eq!(result.requested_dimensions, Dimensions::new(1792, 1024));
    }

    #[tokio::test]
    async fn portrait_masks_satisfy_binary_contract() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_generate(Ok(generated([1, 2, 3], None)));
        provider.push_edit(Ok(generated([4, 5, 6], None)));

        expander(provider.clone())
            .expand("a lighthouse", None, ImageFormat::Portrait)
            .await
            .unwrap();

        let requests = provider.edit_requests.lock().unwrap();
        let mask = &requests[0].mask;
        assert!(raster::validate(mask).valid);
        let rgb = mask.to_dynamic().unwrap().to_rgb8();
        assert!(rgb.pixels().all(|p| p.0 == [255, 255, 255]));
        assert_eq!(requests[0].canvas.dimensions(), mask.dimensions());
    }

    #[tokio::test]
    async fn content_policy_exhaustion_softens_then_falls_back() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_generate(Ok(generated([9, 9, 9], Some("a rowdy scene"))));
        provider.push_generate(Ok(generated_sized(ImageFormat::Landscape)));
        for _ in 0..3 {
            provider.push_edit(Err(OutpaintError::ContentPolicyRejected("flagged".into())));
        }

        let result = expander(provider.clone())
            .expand("a rowdy scene", None, ImageFormat::Landscape)
            .await
            .unwrap();

        assert_eq!(provider.edit_count(), 3);
        let edit_prompts = provider.edit_prompts();
        assert!(!prompts::is_softened(&edit_prompts[0]));
        assert!(prompts::is_softened(&edit_prompts[1]));
        assert!(prompts::is_softened(&edit_prompts[2]));

        // Two generation calls: the base and the fallback.
        let generate_requests = provider.generate_requests.lock().unwrap();
        assert_eq!(generate_requests.len(), 2);
        assert_eq!(generate_requests[1].size, "1792x1024");

        assert!(result.is_expanded);
        assert!(result.used_fallback);
        assert_eq!(result.edit_method, EditMethod::Generation);
        assert_eq!(result.actual_dimensions, Dimensions::new(1792, 1024));
    }

    #[tokio::test]
    async fn failed_fallback_returns_original_square() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_generate(Ok(generated([9, 9, 9], None)));
        provider.push_generate(Err(OutpaintError::ResponseError("provider down".into())));
        for _ in 0..3 {
            provider.push_edit(Err(OutpaintError::NetworkTimeout("60s elapsed".into())));
        }

        let result = expander(provider.clone())
            .expand("a lighthouse", None, ImageFormat::Portrait)
            .await
            .unwrap();

        assert_eq!(provider.edit_count(), 3);
        assert!(!result.is_expanded);
        assert_eq!(result.edit_method, EditMethod::None);
        assert_eq!(result.actual_dimensions, Dimensions::new(1024, 1024));
        assert_eq!(result.requested_dimensions, Dimensions::new(1024, 1792));
        let error = result.error.expect("degraded result carries an error note");
        assert!(!error.is_empty());
        assert!(error.contains("3 edit attempts"));
    }

    #[tokio::test]
    async fn base_generation_failure_is_fatal() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_generate(Err(OutpaintError::ResponseError("no capacity".into())));

        let result = expander(provider)
            .expand("a lighthouse", None, ImageFormat::Square)
            .await;

        assert!(matches!(
            result,
            Err(OutpaintError::BaseGenerationFailed(_))
        ));
    }

    #[tokio::test]
    async fn mask_is_repaired_after_format_rejection() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_edit(Err(OutpaintError::MaskFormatInvalid(
            "mask must not have an alpha channel".into(),
        )));
        provider.push_edit(Ok(generated([5, 5, 5], None)));

        // Drive the Editing state directly with a deliberately non-conformant
        // (RGBA) mask, the way a corrupted upstream mask would arrive.
        let bad_mask = RasterImage::from_dynamic(&DynamicImage::ImageRgba8(
            RgbaImage::from_pixel(1024, 1024, Rgba([255, 255, 255, 255])),
        ))
        .unwrap();
        assert!(!raster::validate(&bad_mask).valid);

        let mut job = ExpansionJob::new("a lighthouse", None, ImageFormat::Portrait);
        job.base_image = Some(square_image([0, 0, 0]));
        job.canvas = Some(raster::solid_canvas(1024, 1024, FILL_COLOR).unwrap());
        job.mask = Some(bad_mask);
        job.edit_prompt = "continue the scene".into();

        let exp = expander(provider.clone());
        let state = exp.step(&mut job, ExpandState::Editing).await.unwrap();
        assert!(matches!(state, ExpandState::Editing));
        let state = exp.step(&mut job, state).await.unwrap();
        assert!(matches!(state, ExpandState::Stitching(_)));

        let requests = provider.edit_requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(!raster::validate(&requests[0].mask).valid);
        assert!(raster::validate(&requests[1].mask).valid);
        assert!(!requests[1].canvas.has_alpha());
    }

    #[tokio::test]
    async fn complexity_augments_base_prompt() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_generate(Ok(generated([1, 1, 1], None)));

        expander(provider.clone())
            .expand("a teapot", Some(0.95), ImageFormat::Square)
            .await
            .unwrap();

        let requests = provider.generate_requests.lock().unwrap();
        assert!(requests[0].prompt.contains("extremely surreal"));
        assert_eq!(requests[0].size, "1024x1024");
    }

    #[tokio::test]
    async fn expand_all_runs_one_job_per_format() {
        let provider = Arc::new(FakeProvider::default());
        provider.push_generate(Ok(generated([1, 1, 1], None)));
        provider.push_generate(Ok(generated([2, 2, 2], None)));
        provider.push_edit(Ok(generated([3, 3, 3], None)));

        let results = expander(provider.clone())
            .expand_all(
                "a teapot",
                None,
                &[ImageFormat::Square, ImageFormat::Landscape],
            )
            .await;

        assert_eq!(results.len(), 2);
        let square = results[0].as_ref().unwrap();
        let landscape = results[1].as_ref().unwrap();
        assert!(!square.is_expanded);
        assert!(landscape.is_expanded);
        assert_eq!(landscape.actual_dimensions, Dimensions::new(1792, 1024));
        assert_eq!(provider.edit_count(), 1);
    }
}
