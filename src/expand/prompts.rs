use crate::models::{FillSide, ImageFormat};

/// Qualifier appended when a prompt gets softened after a content-policy
/// rejection.
const SOFTEN_QUALIFIER: &str = "Appropriate for all audiences.";

/// Map the caller's complexity knob onto a style descriptor. Values outside
/// [0, 1] are clamped rather than rejected.
pub fn complexity_descriptor(complexity: f32) -> &'static str {
    let c = complexity.clamp(0.0, 1.0);
    if c > 0.7 {
        "extremely surreal and weird"
    } else if c > 0.4 {
        "quirky and unusual"
    } else {
        "mostly normal with slight quirkiness"
    }
}

/// Augment the caller's prompt for base generation.
pub fn augment_prompt(prompt: &str, complexity: Option<f32>) -> String {
    match complexity {
        Some(c) => format!("{}. Style: {}.", prompt.trim_end_matches('.'), complexity_descriptor(c)),
        None => prompt.to_string(),
    }
}

/// Compose the inpainting prompt for the fill half: restate the revised
/// prompt for stylistic continuity, instruct a seamless continuation in the
/// right direction, and name which half of the target image is being painted.
pub fn edit_prompt(revised: &str, format: ImageFormat, side: FillSide) -> String {
    let aspect = match format {
        ImageFormat::Portrait => "portrait",
        ImageFormat::Landscape => "landscape",
        ImageFormat::Square => "square",
    };
    format!(
        "{} This is the {} of a {} ({}) image. Paint a seamless continuation of the scene above extending {}, matching its style, palette and lighting exactly.",
        revised.trim(),
        side.as_half(),
        aspect,
        format.orientation(),
        side.continuation()
    )
}

/// Rephrase for the one-shot generation fallback: describe both halves of
/// the full-size target so a single generation covers the whole canvas.
pub fn fallback_prompt(revised: &str, format: ImageFormat) -> String {
    let (aspect, layout) = match format {
        ImageFormat::Portrait => (
            "tall portrait",
            "the main subject in the upper half and the scene continuing naturally into the lower half",
        ),
        ImageFormat::Landscape => (
            "wide landscape",
            "the main subject in the left half and the scene continuing naturally into the right half",
        ),
        ImageFormat::Square => ("square", "the full scene"),
    };
    format!(
        "A single {} image showing {}: {}",
        aspect,
        layout,
        revised.trim()
    )
}

/// Soften a prompt after a content-policy rejection: strip to the first
/// sentence and append an all-audiences qualifier. Softening an
/// already-softened prompt leaves it unchanged.
pub fn soften(prompt: &str) -> String {
    let first = prompt
        .split_inclusive(['.', '!', '?'])
        .next()
        .unwrap_or(prompt)
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .to_string();
    format!("{}. {}", first, SOFTEN_QUALIFIER)
}

/// Whether a prompt has already been through [`soften`].
pub fn is_softened(prompt: &str) -> bool {
    prompt.ends_with(SOFTEN_QUALIFIER)
}
