//! TOML/YAML ingestion for the intrahost engine's flat parameter mapping.
//! `pfsim_core` itself only understands a `ParamSet`; this crate is the
//! file-format boundary around it, mirroring the teacher's own
//! `FullConfig`/`ConfigLoader` split between typed document and loader.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use pfsim_core::{Config, ParamSet, ParamValue};

/// Typed mirror of every key spec.md §6 lists. Deserializing a document
/// missing a key fails at the serde layer, which is how "missing required
/// key" is caught before `pfsim_core::Config::from_params` ever runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub run_number: i64,
    pub max_individual_infections: i64,

    pub falciparum_msp_variants: i64,
    pub falciparum_nonspecific_types: i64,
    pub falciparum_pfemp1_variants: i64,

    pub base_incubation_period: f64,

    pub antibody_irbc_kill_rate: f64,
    pub nonspecific_antigenicity_factor: f64,
    pub msp1_merozoite_kill_fraction: f64,
    pub gametocyte_stage_survival_rate: f64,
    pub base_gametocyte_fraction_male: f64,
    pub base_gametocyte_production_rate: f64,
    pub antigen_switch_rate: f64,
    pub merozoites_per_hepatocyte: f64,
    pub merozoites_per_schizont: f64,
    pub rbc_destruction_multiplier: f64,
    pub number_of_asexual_cycles_without_gametocytes: i64,

    pub antibody_memory_level: f64,
    pub max_msp1_antibody_growthrate: f64,
    pub antibody_stimulation_c50: f64,
    pub antibody_capacity_growth_rate: f64,
    pub min_adapted_response: f64,
    pub nonspecific_antibody_growth_rate_factor: f64,
    pub antibody_csp_decay_days: f64,

    pub maternal_antibody_decay_rate: f64,
    pub pyrogenic_threshold: f64,
    pub fever_irbc_kill_rate: f64,
    pub erythropoiesis_anemia_effect: f64,

    pub base_gametocyte_mosquito_survival_rate: f64,
    pub cytokine_gametocyte_inactivation: f64,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        let c = Config::laboratory_default(42);
        ConfigDocument {
            run_number: c.seed as i64,
            max_individual_infections: c.max_individual_infections as i64,
            falciparum_msp_variants: c.msp_variants as i64,
            falciparum_nonspecific_types: c.nonspecific_types as i64,
            falciparum_pfemp1_variants: c.pfemp1_variants as i64,
            base_incubation_period: c.base_incubation_period,
            antibody_irbc_kill_rate: c.antibody_irbc_kill_rate,
            nonspecific_antigenicity_factor: c.nonspecific_antigenicity_factor,
            msp1_merozoite_kill_fraction: c.msp1_merozoite_kill_fraction,
            gametocyte_stage_survival_rate: c.gametocyte_stage_survival_rate,
            base_gametocyte_fraction_male: c.base_gametocyte_fraction_male,
            base_gametocyte_production_rate: c.base_gametocyte_production_rate,
            antigen_switch_rate: c.antigen_switch_rate,
            merozoites_per_hepatocyte: c.merozoites_per_hepatocyte,
            merozoites_per_schizont: c.merozoites_per_schizont,
            rbc_destruction_multiplier: c.rbc_destruction_multiplier,
            number_of_asexual_cycles_without_gametocytes: c.n_asexual_cycles_wo_gametocytes as i64,
            antibody_memory_level: c.antibody_memory_level,
            max_msp1_antibody_growthrate: c.max_msp1_antibody_growthrate,
            antibody_stimulation_c50: c.antibody_stimulation_c50,
            antibody_capacity_growth_rate: c.antibody_capacity_growth_rate,
            min_adapted_response: c.min_adapted_response,
            nonspecific_antibody_growth_rate_factor: c.nonspecific_antibody_growth_rate_factor,
            antibody_csp_decay_days: c.antibody_csp_decay_days,
            maternal_antibody_decay_rate: c.maternal_antibody_decay_rate,
            pyrogenic_threshold: c.pyrogenic_threshold,
            fever_irbc_kill_rate: c.fever_irbc_kill_rate,
            erythropoiesis_anemia_effect: c.erythropoiesis_anemia_effect,
            base_gametocyte_mosquito_survival_rate: c.base_gametocyte_mosquito_survival_rate,
            cytokine_gametocyte_inactivation: c.cytokine_gametocyte_inactivation,
        }
    }
}

impl ConfigDocument {
    /// Semantic checks beyond "present and well-typed" (which serde already
    /// enforces on load): ranges that would make the model misbehave rather
    /// than merely look unusual.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_individual_infections < 0 {
            errors.push("max_individual_infections must be >= 0".to_string());
        }
        if self.falciparum_msp_variants <= 0
            || self.falciparum_nonspecific_types <= 0
            || self.falciparum_pfemp1_variants <= 0
        {
            errors.push("falciparum_{msp,nonspecific,pfemp1}_variants must be > 0".to_string());
        }
        if self.base_incubation_period <= 0.0 {
            errors.push("base_incubation_period must be > 0".to_string());
        }
        if !(0.0..1.0).contains(&self.antibody_memory_level) {
            errors.push("antibody_memory_level must be in [0, 1)".to_string());
        }
        if !(0.0..=1.0).contains(&self.base_gametocyte_fraction_male) {
            errors.push("base_gametocyte_fraction_male must be in [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.gametocyte_stage_survival_rate) {
            errors.push("gametocyte_stage_survival_rate must be in [0, 1]".to_string());
        }
        if self.merozoites_per_hepatocyte < 0.0 || self.merozoites_per_schizont < 0.0 {
            errors.push("merozoites_per_{hepatocyte,schizont} must be >= 0".to_string());
        }
        if self.pyrogenic_threshold <= 0.0 {
            errors.push("pyrogenic_threshold must be > 0".to_string());
        }

        errors
    }

    pub fn into_param_set(self) -> ParamSet {
        let mut p: ParamSet = HashMap::new();
        p.insert("Run_Number".into(), ParamValue::Int(self.run_number));
        p.insert(
            "Max_Individual_Infections".into(),
            ParamValue::Int(self.max_individual_infections),
        );
        p.insert("Falciparum_MSP_Variants".into(), ParamValue::Int(self.falciparum_msp_variants));
        p.insert(
            "Falciparum_Nonspecific_Types".into(),
            ParamValue::Int(self.falciparum_nonspecific_types),
        );
        p.insert(
            "Falciparum_PfEMP1_Variants".into(),
            ParamValue::Int(self.falciparum_pfemp1_variants),
        );
        p.insert("Base_Incubation_Period".into(), ParamValue::Float(self.base_incubation_period));
        p.insert(
            "Antibody_IRBC_Kill_Rate".into(),
            ParamValue::Float(self.antibody_irbc_kill_rate),
        );
        p.insert(
            "Nonspecific_Antigenicity_Factor".into(),
            ParamValue::Float(self.nonspecific_antigenicity_factor),
        );
        p.insert(
            "MSP1_Merozoite_Kill_Fraction".into(),
            ParamValue::Float(self.msp1_merozoite_kill_fraction),
        );
        p.insert(
            "Gametocyte_Stage_Survival_Rate".into(),
            ParamValue::Float(self.gametocyte_stage_survival_rate),
        );
        p.insert(
            "Base_Gametocyte_Fraction_Male".into(),
            ParamValue::Float(self.base_gametocyte_fraction_male),
        );
        p.insert(
            "Base_Gametocyte_Production_Rate".into(),
            ParamValue::Float(self.base_gametocyte_production_rate),
        );
        p.insert("Antigen_Switch_Rate".into(), ParamValue::Float(self.antigen_switch_rate));
        p.insert(
            "Merozoites_Per_Hepatocyte".into(),
            ParamValue::Float(self.merozoites_per_hepatocyte),
        );
        p.insert(
            "Merozoites_Per_Schizont".into(),
            ParamValue::Float(self.merozoites_per_schizont),
        );
        p.insert(
            "RBC_Destruction_Multiplier".into(),
            ParamValue::Float(self.rbc_destruction_multiplier),
        );
        p.insert(
            "Number_Of_Asexual_Cycles_Without_Gametocytes".into(),
            ParamValue::Int(self.number_of_asexual_cycles_without_gametocytes),
        );
        p.insert("Antibody_Memory_Level".into(), ParamValue::Float(self.antibody_memory_level));
        p.insert(
            "Max_MSP1_Antibody_Growthrate".into(),
            ParamValue::Float(self.max_msp1_antibody_growthrate),
        );
        p.insert(
            "Antibody_Stimulation_C50".into(),
            ParamValue::Float(self.antibody_stimulation_c50),
        );
        p.insert(
            "Antibody_Capacity_Growth_Rate".into(),
            ParamValue::Float(self.antibody_capacity_growth_rate),
        );
        p.insert("Min_Adapted_Response".into(), ParamValue::Float(self.min_adapted_response));
        p.insert(
            "Nonspecific_Antibody_Growth_Rate_Factor".into(),
            ParamValue::Float(self.nonspecific_antibody_growth_rate_factor),
        );
        p.insert(
            "Antibody_CSP_Decay_Days".into(),
            ParamValue::Float(self.antibody_csp_decay_days),
        );
        p.insert(
            "Maternal_Antibody_Decay_Rate".into(),
            ParamValue::Float(self.maternal_antibody_decay_rate),
        );
        p.insert("Pyrogenic_Threshold".into(), ParamValue::Float(self.pyrogenic_threshold));
        p.insert("Fever_IRBC_Kill_Rate".into(), ParamValue::Float(self.fever_irbc_kill_rate));
        p.insert(
            "Erythropoiesis_Anemia_Effect".into(),
            ParamValue::Float(self.erythropoiesis_anemia_effect),
        );
        p.insert(
            "Base_Gametocyte_Mosquito_Survival_Rate".into(),
            ParamValue::Float(self.base_gametocyte_mosquito_survival_rate),
        );
        p.insert(
            "Cytokine_Gametocyte_Inactivation".into(),
            ParamValue::Float(self.cytokine_gametocyte_inactivation),
        );
        p
    }
}

/// Reads/writes [`ConfigDocument`]s and turns a validated one into a
/// ready-to-use `pfsim_core::Config`.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn from_toml(path: impl AsRef<Path>) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)?;
        let doc: ConfigDocument = toml::from_str(&contents)?;
        Self::finish(doc)
    }

    pub fn from_yaml(path: impl AsRef<Path>) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)?;
        let doc: ConfigDocument = serde_yaml::from_str(&contents)?;
        Self::finish(doc)
    }

    pub fn save_toml(doc: &ConfigDocument, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(doc)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn save_yaml(doc: &ConfigDocument, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = serde_yaml::to_string(doc)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn finish(doc: ConfigDocument) -> anyhow::Result<Config> {
        let errors = doc.validate();
        if !errors.is_empty() {
            anyhow::bail!("invalid configuration:\n  - {}", errors.join("\n  - "));
        }
        let pset = doc.into_param_set();
        Config::from_params(&pset).map_err(|e| anyhow::anyhow!(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_document_validates() {
        let doc = ConfigDocument::default();
        assert!(doc.validate().is_empty());
    }

    #[test]
    fn default_document_builds_a_config() {
        let doc = ConfigDocument::default();
        let pset = doc.into_param_set();
        assert!(Config::from_params(&pset).is_ok());
    }

    #[test]
    fn out_of_range_memory_level_is_flagged() {
        let mut doc = ConfigDocument::default();
        doc.antibody_memory_level = 1.5;
        assert!(!doc.validate().is_empty());
    }
}
