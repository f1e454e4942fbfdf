//! Output compatibility checks against a consumer's accepted part types.

use crate::models::{OutputPart, OutputPartType};

/// True iff every output part's type is accepted. Vacuously true for no outputs.
pub fn all_outputs_supported(outputs: &[OutputPart], accepted: &[OutputPartType]) -> bool {
    outputs
        .iter()
        .all(|output| accepted.contains(&output.part_type()))
}

/// Distinct part types present in `outputs` that the consumer does not accept,
/// in order of first appearance.
pub fn unsupported_output_types(
    outputs: &[OutputPart],
    accepted: &[OutputPartType],
) -> Vec<OutputPartType> {
    let mut rejected = Vec::new();
    for part_type in outputs.iter().map(OutputPart::part_type) {
        if !accepted.contains(&part_type) && !rejected.contains(&part_type) {
            rejected.push(part_type);
        }
    }
    rejected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_outputs_are_vacuously_supported() {
        assert!(all_outputs_supported(&[], &[]));
        assert!(all_outputs_supported(&[], &[OutputPartType::TextBlock]));
    }

    #[test]
    fn test_image_rejected_by_text_only_consumer() {
        let outputs = [OutputPart::image("data:image/png;base64,AA")];
        assert!(!all_outputs_supported(&outputs, &[OutputPartType::TextBlock]));
        assert_eq!(
            unsupported_output_types(&outputs, &[OutputPartType::TextBlock]),
            vec![OutputPartType::ImagePart]
        );
    }

    #[test]
    fn test_mixed_outputs_need_every_type() {
        let outputs = [
            OutputPart::text("caption"),
            OutputPart::image("data:image/png;base64,AA"),
            OutputPart::image("data:image/png;base64,BB"),
        ];
        assert!(!all_outputs_supported(&outputs, &[OutputPartType::TextBlock]));
        assert!(all_outputs_supported(
            &outputs,
            &[OutputPartType::ImagePart, OutputPartType::TextBlock]
        ));
        assert!(unsupported_output_types(&outputs, &[]).len() == 2);
    }
}
