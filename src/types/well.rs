//! Prediction request payload for a single well configuration.

use serde::{Deserialize, Serialize};

/// Geological and technical parameters of one well.
///
/// Field names match the raw dataset columns so encoded feature names line
/// up with the training layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellInput {
    /// Effective thickness
    #[serde(rename = "Heff")]
    pub heff: f64,
    /// Permeability
    #[serde(rename = "Perm")]
    pub perm: f64,
    /// Gas saturation, fraction
    #[serde(rename = "Sg")]
    pub sg: f64,
    /// Horizontal section length
    #[serde(rename = "L_hor")]
    pub l_hor: f64,
    /// Wellbore trajectory type
    #[serde(rename = "GS")]
    pub gs: String,
    /// Production decline rate
    pub temp: f64,
    /// C5+ content
    #[serde(rename = "C5")]
    pub c5: f64,
    /// Hydraulic fracturing stages
    #[serde(rename = "GRP")]
    pub grp: i64,
    /// Number of horizontal branches
    #[serde(rename = "nGS")]
    pub n_gs: i64,
}

impl WellInput {
    /// Range checks. Returns one message per violated constraint, naming the
    /// field.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (name, value) in [
            ("Heff", self.heff),
            ("Perm", self.perm),
            ("Sg", self.sg),
            ("L_hor", self.l_hor),
            ("temp", self.temp),
            ("C5", self.c5),
        ] {
            if !value.is_finite() {
                errors.push(format!("{name} must be a finite number"));
            }
        }

        for (name, value) in [
            ("Heff", self.heff),
            ("Perm", self.perm),
            ("L_hor", self.l_hor),
            ("temp", self.temp),
            ("C5", self.c5),
        ] {
            if value < 0.0 {
                errors.push(format!("{name} must be greater than or equal to 0"));
            }
        }

        if !(0.0..=1.0).contains(&self.sg) {
            errors.push("Sg must be between 0 and 1".to_string());
        }
        if self.gs.trim().is_empty() {
            errors.push("GS must be a non-empty string".to_string());
        }
        if self.grp < 0 {
            errors.push("GRP must be greater than or equal to 0".to_string());
        }
        if self.n_gs < 0 {
            errors.push("nGS must be greater than or equal to 0".to_string());
        }

        errors
    }

    /// Numeric fields keyed by their dataset column names.
    pub fn numeric_features(&self) -> [(&'static str, f64); 8] {
        [
            ("Heff", self.heff),
            ("Perm", self.perm),
            ("Sg", self.sg),
            ("L_hor", self.l_hor),
            ("temp", self.temp),
            ("C5", self.c5),
            ("GRP", self.grp as f64),
            ("nGS", self.n_gs as f64),
        ]
    }

    /// Categorical fields keyed by their dataset column names.
    pub fn categorical_features(&self) -> [(&'static str, &str); 1] {
        [("GS", self.gs.as_str())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample() -> WellInput {
        WellInput {
            heff: 15.0,
            perm: 150.0,
            sg: 0.75,
            l_hor: 600.0,
            gs: "S-TYPE".to_string(),
            temp: 25.0,
            c5: 0.6,
            grp: 2,
            n_gs: 3,
        }
    }

    #[test]
    fn test_sample_is_valid() {
        assert!(sample().validate().is_empty());
    }

    #[test]
    fn test_sg_out_of_range() {
        let mut w = sample();
        w.sg = 1.2;
        assert_eq!(w.validate(), vec!["Sg must be between 0 and 1"]);
    }

    #[test]
    fn test_negative_fields_each_reported() {
        let mut w = sample();
        w.heff = -1.0;
        w.grp = -2;
        w.n_gs = -1;
        let errors = w.validate();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.starts_with("Heff")));
        assert!(errors.iter().any(|e| e.starts_with("GRP")));
        assert!(errors.iter().any(|e| e.starts_with("nGS")));
    }

    #[test]
    fn test_blank_gs_rejected() {
        let mut w = sample();
        w.gs = "  ".to_string();
        assert_eq!(w.validate().len(), 1);
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        for key in ["Heff", "Perm", "Sg", "L_hor", "GS", "temp", "C5", "GRP", "nGS"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_fractional_grp_is_a_type_error() {
        let json = r#"{"Heff":1,"Perm":1,"Sg":0.5,"L_hor":1,"GS":"GS","temp":1,"C5":1,"GRP":2.5,"nGS":1}"#;
        assert!(serde_json::from_str::<WellInput>(json).is_err());
    }
}
