//! Header reconciliation for the Comida table
//!
//! Workbooks label the same column many ways ("Cab", "Cabezas", "Cab.").
//! [`HeaderMap::resolve`] maps each canonical [`RationField`] to a column once
//! per table so row building only addresses canonical fields.

use crate::core::text::header_key;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Canonical columns of a ration row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RationField {
    Corral,
    Cab,
    Kg,
    Etapa,
    #[serde(rename = "KgTC/Dia", alias = "KgTcDia")]
    KgTcDia,
    #[serde(rename = "MIXER", alias = "Mixer")]
    Mixer,
    Ajuste,
    KgManiana,
    KgTarde,
}

impl RationField {
    pub const ALL: [RationField; 9] = [
        RationField::Corral,
        RationField::Cab,
        RationField::Kg,
        RationField::Etapa,
        RationField::KgTcDia,
        RationField::Mixer,
        RationField::Ajuste,
        RationField::KgManiana,
        RationField::KgTarde,
    ];

    pub fn canonical(&self) -> &'static str {
        match self {
            RationField::Corral => "Corral",
            RationField::Cab => "Cab",
            RationField::Kg => "Kg",
            RationField::Etapa => "Etapa",
            RationField::KgTcDia => "KgTC/Dia",
            RationField::Mixer => "MIXER",
            RationField::Ajuste => "Ajuste",
            RationField::KgManiana => "KgManiana",
            RationField::KgTarde => "KgTarde",
        }
    }

    /// Known header spellings, accent variants included
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            RationField::Corral => &[
                "Corral",
                "N° Corral",
                "Nº Corral",
                "Nro Corral",
                "Corral N",
                "Corral Numero",
                "Corral Número",
            ],
            RationField::Cab => &["Cab", "Cabezas", "Cab.", "Cabeza"],
            RationField::Kg => &[
                "Kg",
                "Kg Totales",
                "Kg Total",
                "Kilos",
                "Kg/Día",
                "Kg/Dia",
                "Kg Dia",
                "Kg Día",
                "Kg Totales (Día)",
            ],
            RationField::Etapa => &["Etapa", "Dieta", "Fase"],
            RationField::KgTcDia => &[
                "KgTC/Dia",
                "KgTC/Día",
                "KgTC x Dia",
                "KgTC x Día",
                "KgTC_Dia",
                "Kg/cab/día",
                "Kg/cab/dia",
                "Kg c/cab",
                "Kg por cab",
                "Kg/cab",
            ],
            RationField::Mixer => &[
                "MIXER",
                "N° Mixer",
                "Nº Mixer",
                "Mixer N°",
                "Mixer Nº",
                "Mixer Nro",
                "Nro Mixer",
                "Mezcladora",
                "Carro",
                "Carro Mixer",
                "Carro Nº",
                "Carro N°",
                "Carro Nro",
            ],
            RationField::Ajuste => &["Ajuste", "Ajuste %", "Ajuste%", "% Ajuste", "Porcentaje Ajuste"],
            RationField::KgManiana => &["Kg Mañana", "Kg Maniana", "Kg Manana", "Kg AM"],
            RationField::KgTarde => &["Kg Tarde", "Kg PM"],
        }
    }
}

impl fmt::Display for RationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

/// Field → column index for one table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeaderMap {
    columns: BTreeMap<RationField, usize>,
}

impl HeaderMap {
    /// Map every field to the first header, in column order, among its spellings
    pub fn resolve(headers: &[String], extra_synonyms: &HashMap<RationField, Vec<String>>) -> Self {
        let keys: Vec<String> = headers.iter().map(|h| header_key(h)).collect();
        let mut columns = BTreeMap::new();

        for field in RationField::ALL {
            let mut accepted: HashSet<String> =
                field.synonyms().iter().map(|s| header_key(s)).collect();
            if let Some(extra) = extra_synonyms.get(&field) {
                accepted.extend(extra.iter().map(|s| header_key(s)));
            }
            if let Some(col) = keys.iter().position(|k| accepted.contains(k)) {
                columns.insert(field, col);
            }
        }

        Self { columns }
    }

    pub fn column(&self, field: RationField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn contains(&self, field: RationField) -> bool {
        self.columns.contains_key(&field)
    }

    /// Fields no header matched
    pub fn missing(&self) -> Vec<RationField> {
        RationField::ALL
            .into_iter()
            .filter(|f| !self.contains(*f))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolves_synonyms_case_and_spacing() {
        let map = HeaderMap::resolve(
            &headers(&["  n°  corral ", "CABEZAS", "Dieta", "Kg/Cab/Día", "Carro Nº"]),
            &HashMap::new(),
        );
        assert_eq!(map.column(RationField::Corral), Some(0));
        assert_eq!(map.column(RationField::Cab), Some(1));
        assert_eq!(map.column(RationField::Etapa), Some(2));
        assert_eq!(map.column(RationField::KgTcDia), Some(3));
        assert_eq!(map.column(RationField::Mixer), Some(4));
        assert!(!map.contains(RationField::Kg));
    }

    #[test]
    fn test_first_matching_column_wins() {
        let map = HeaderMap::resolve(&headers(&["Etapa", "Fase", "Dieta"]), &HashMap::new());
        assert_eq!(map.column(RationField::Etapa), Some(0));
    }

    #[test]
    fn test_extra_synonyms_extend_fields() {
        let mut extra = HashMap::new();
        extra.insert(RationField::Corral, vec!["Lote".to_string()]);
        let map = HeaderMap::resolve(&headers(&["Lote", "Cab"]), &extra);
        assert_eq!(map.column(RationField::Corral), Some(0));
        assert!(map.missing().contains(&RationField::Mixer));
    }

    #[test]
    fn test_field_names_deserialize() {
        let extra: HashMap<RationField, Vec<String>> =
            serde_yaml::from_str("Corral: [Lote]\nMIXER: [Mixer asignado]\nKgTC/Dia: [Consumo]\n")
                .unwrap();
        assert_eq!(extra[&RationField::Mixer], vec!["Mixer asignado"]);
        assert_eq!(extra[&RationField::KgTcDia], vec!["Consumo"]);
    }
}
