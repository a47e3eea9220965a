use crate::brand::BrandGuidelines;

/// Brand name the illustration engine is told it works for.
pub const BRAND_NAME: &str = "Worxphere";

/// Builds the instruction text sent after the reference images.
///
/// The user prompt is interpolated verbatim; it is trusted input.
pub fn compose_instruction(guidelines: &BrandGuidelines, prompt: &str) -> String {
    let lines = [
        "[SYSTEM DIRECTIVE: VISION ANALYSIS & STYLE REPLICATION]".to_string(),
        format!("You are a specialized vision-to-illustration engine for the {BRAND_NAME} brand."),
        String::new(),
        "STEP 1: ANALYZE STYLE".to_string(),
        "Attached are official brand assets.".to_string(),
        "Replicate this exact style:".to_string(),
        "- Line: Thick, rough pencil sketch strokes. High texture.".to_string(),
        "- Contrast: Spectrum Black (#182432) against pure white background.".to_string(),
        "- Detail: Minimal shading, focus on character expression and symbolic objects."
            .to_string(),
        String::new(),
        "STEP 2: GENERATE NEW ASSET".to_string(),
        format!("Generate a NEW brand illustration for: \"{prompt}\"."),
        String::new(),
        "BRAND CONSTRAINTS:".to_string(),
        "- Palette: Monochromatic Spectrum Black (#182432) on White (#FFFFFF).".to_string(),
        format!("- Style: {}.", guidelines.art_style),
        format!("- Mood: {}.", guidelines.mood),
        "- Do: Use simple geometric shapes, centered composition.".to_string(),
        "- Avoid: Colors, realistic textures, drop shadows, gradients.".to_string(),
        String::new(),
        "The final image MUST look like a scanned pencil drawing from the provided set."
            .to_string(),
    ];
    lines.join("\n")
}
