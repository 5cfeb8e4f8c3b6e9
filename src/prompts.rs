//! Instruction text sent to the extraction model.
//!
//! Callers can override it via [`crate::config::ConversionConfig::instruction`];
//! the constant here is used only when no override is provided.

/// Fixed single-turn instruction sent alongside every page image.
pub const DEFAULT_INSTRUCTION: &str = "Extract all text content from this image accurately. Preserve the original structure and formatting as much as possible in Markdown format.";

/// Resolve the instruction for a run.
pub fn instruction(custom: Option<&str>) -> &str {
    match custom {
        Some(s) if !s.trim().is_empty() => s,
        _ => DEFAULT_INSTRUCTION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_override_falls_back_to_default() {
        assert_eq!(instruction(None), DEFAULT_INSTRUCTION);
        assert_eq!(instruction(Some("  ")), DEFAULT_INSTRUCTION);
        assert_eq!(instruction(Some("Transcribe.")), "Transcribe.");
    }

    #[test]
    fn default_asks_for_markdown() {
        assert!(DEFAULT_INSTRUCTION.contains("Markdown"));
    }
}
