//! Feeding stage (Etapa) recognition

use crate::core::text::fold_accents;
use crate::types::Stage;

/// Stage of a free-text Etapa value; unrecognised text is `Stage::Default`
pub fn stage_of(etapa: &str) -> Stage {
    let folded = fold_accents(etapa);
    if folded.contains("inicio") {
        Stage::Inicio
    } else if folded.contains("recr") {
        Stage::Recria
    } else if folded.contains("termin") {
        Stage::Terminacion
    } else {
        Stage::Default
    }
}

/// Canonical spelling of a recognised Etapa; other text is kept as written
pub fn canonical_etapa(etapa: &str) -> String {
    match stage_of(etapa) {
        Stage::Default => etapa.to_string(),
        stage => stage.as_str().to_string(),
    }
}
