//! Configuration ingestion. The core consumes a flat parameter mapping
//! (spec.md §6) rather than any particular file format — loading that mapping
//! from TOML/YAML is `pfsim_config`'s job, not this crate's.

use std::collections::HashMap;

use crate::error::{SimulationError, SimulationResult};

/// One value in a [`ParamSet`]. Kept deliberately small: the core only ever
/// needs integers and floats out of its configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

/// The parameter mapping `Intrahost::configure` consumes, keyed by the
/// `Run_Number` / `Max_Individual_Infections` / ... names in spec.md §6.
pub type ParamSet = HashMap<String, ParamValue>;

/// How a newborn host's maternal antibody is seeded. Spec.md names only the
/// decaying scalar; `emodlib`'s `MaternalAntibodiesType` enum supplements the
/// seeding policy (see SPEC_FULL.md). `Off` reproduces spec.md §8's seed
/// tests exactly (maternal antibody stays at whatever the caller set, here
/// 0 by default).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaternalAntibodyMode {
    Off,
    SimpleWaning { initial_fraction: f64 },
    ConstantInitialImmunity { level: f64 },
}

impl Default for MaternalAntibodyMode {
    fn default() -> Self {
        MaternalAntibodyMode::Off
    }
}

/// Immutable, explicit configuration passed by reference into every
/// substate update (spec.md §9 Design Notes: no global/static parameters).
#[derive(Debug, Clone)]
pub struct Config {
    pub seed: u64,
    pub max_individual_infections: usize,

    pub msp_variants: u16,
    pub nonspecific_types: u16,
    pub pfemp1_variants: u16,

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
    pub n_asexual_cycles_wo_gametocytes: u32,

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

    pub maternal_antibody_mode: MaternalAntibodyMode,

    /// `-ln((0.4 - memory_level) / (1 - memory_level)) / 120`, derived, not
    /// configured directly (spec.md §6).
    pub hyperimmune_decay_rate: f64,
}

fn get_float(pset: &ParamSet, key: &str) -> SimulationResult<f64> {
    match pset.get(key) {
        Some(ParamValue::Float(v)) => Ok(*v),
        Some(ParamValue::Int(v)) => Ok(*v as f64),
        None => Err(SimulationError::Config(format!("missing required key `{key}`"))),
    }
}

fn get_int(pset: &ParamSet, key: &str) -> SimulationResult<i64> {
    match pset.get(key) {
        Some(ParamValue::Int(v)) => Ok(*v),
        Some(ParamValue::Float(v)) => Err(SimulationError::Config(format!(
            "key `{key}` expected an integer, found float {v}"
        ))),
        None => Err(SimulationError::Config(format!("missing required key `{key}`"))),
    }
}

impl Config {
    /// Build a [`Config`] from a flat parameter mapping. Missing or
    /// mistyped required keys produce `SimulationError::Config` with no
    /// partial config returned (spec.md §7 error kind 1).
    pub fn from_params(pset: &ParamSet) -> SimulationResult<Config> {
        let seed = get_int(pset, "Run_Number")?;
        let max_individual_infections = get_int(pset, "Max_Individual_Infections")?;

        let msp_variants = get_int(pset, "Falciparum_MSP_Variants")?;
        let nonspecific_types = get_int(pset, "Falciparum_Nonspecific_Types")?;
        let pfemp1_variants = get_int(pset, "Falciparum_PfEMP1_Variants")?;

        let antibody_memory_level = get_float(pset, "Antibody_Memory_Level")?;
        if !(0.0..1.0).contains(&antibody_memory_level) {
            return Err(SimulationError::Config(
                "Antibody_Memory_Level must be in [0, 1)".to_string(),
            ));
        }
        let hyperimmune_decay_rate =
            -((0.4 - antibody_memory_level) / (1.0 - antibody_memory_level)).ln() / 120.0;

        Ok(Config {
            seed: seed as u64,
            max_individual_infections: max_individual_infections.max(0) as usize,

            msp_variants: msp_variants as u16,
            nonspecific_types: nonspecific_types as u16,
            pfemp1_variants: pfemp1_variants as u16,

            base_incubation_period: get_float(pset, "Base_Incubation_Period")?,

            antibody_irbc_kill_rate: get_float(pset, "Antibody_IRBC_Kill_Rate")?,
            nonspecific_antigenicity_factor: get_float(pset, "Nonspecific_Antigenicity_Factor")?,
            msp1_merozoite_kill_fraction: get_float(pset, "MSP1_Merozoite_Kill_Fraction")?,
            gametocyte_stage_survival_rate: get_float(pset, "Gametocyte_Stage_Survival_Rate")?,
            base_gametocyte_fraction_male: get_float(pset, "Base_Gametocyte_Fraction_Male")?,
            base_gametocyte_production_rate: get_float(pset, "Base_Gametocyte_Production_Rate")?,
            antigen_switch_rate: get_float(pset, "Antigen_Switch_Rate")?,
            merozoites_per_hepatocyte: get_float(pset, "Merozoites_Per_Hepatocyte")?,
            merozoites_per_schizont: get_float(pset, "Merozoites_Per_Schizont")?,
            rbc_destruction_multiplier: get_float(pset, "RBC_Destruction_Multiplier")?,
            n_asexual_cycles_wo_gametocytes: get_int(
                pset,
                "Number_Of_Asexual_Cycles_Without_Gametocytes",
            )? as u32,

            antibody_memory_level,
            max_msp1_antibody_growthrate: get_float(pset, "Max_MSP1_Antibody_Growthrate")?,
            antibody_stimulation_c50: get_float(pset, "Antibody_Stimulation_C50")?,
            antibody_capacity_growth_rate: get_float(pset, "Antibody_Capacity_Growth_Rate")?,
            min_adapted_response: get_float(pset, "Min_Adapted_Response")?,
            nonspecific_antibody_growth_rate_factor: get_float(
                pset,
                "Nonspecific_Antibody_Growth_Rate_Factor",
            )?,
            antibody_csp_decay_days: get_float(pset, "Antibody_CSP_Decay_Days")?,

            maternal_antibody_decay_rate: get_float(pset, "Maternal_Antibody_Decay_Rate")?,
            pyrogenic_threshold: get_float(pset, "Pyrogenic_Threshold")?,
            fever_irbc_kill_rate: get_float(pset, "Fever_IRBC_Kill_Rate")?,
            erythropoiesis_anemia_effect: get_float(pset, "Erythropoiesis_Anemia_Effect")?,

            base_gametocyte_mosquito_survival_rate: get_float(
                pset,
                "Base_Gametocyte_Mosquito_Survival_Rate",
            )?,
            cytokine_gametocyte_inactivation: get_float(pset, "Cytokine_Gametocyte_Inactivation")?,

            maternal_antibody_mode: MaternalAntibodyMode::Off,
            hyperimmune_decay_rate,
        })
    }

    /// Convenience default mirroring the values `emodlib` ships as its own
    /// defaults, useful for tests and demos that don't want to hand-build a
    /// [`ParamSet`].
    pub fn laboratory_default(seed: u64) -> Config {
        Config {
            seed,
            max_individual_infections: 5,
            msp_variants: 100,
            nonspecific_types: 20,
            pfemp1_variants: 1000,
            base_incubation_period: 7.0,
            antibody_irbc_kill_rate: 0.002,
            nonspecific_antigenicity_factor: 0.3,
            msp1_merozoite_kill_fraction: 0.5,
            gametocyte_stage_survival_rate: 0.82,
            base_gametocyte_fraction_male: 0.2,
            base_gametocyte_production_rate: 0.07,
            antigen_switch_rate: 7.6e-10,
            merozoites_per_hepatocyte: 15000.0,
            merozoites_per_schizont: 16.0,
            rbc_destruction_multiplier: 3.0,
            n_asexual_cycles_wo_gametocytes: 2,
            antibody_memory_level: 0.34,
            max_msp1_antibody_growthrate: 0.045,
            antibody_stimulation_c50: 30.0,
            antibody_capacity_growth_rate: 0.09,
            min_adapted_response: 0.05,
            nonspecific_antibody_growth_rate_factor: 0.5,
            antibody_csp_decay_days: 90.0,
            maternal_antibody_decay_rate: 0.01,
            pyrogenic_threshold: 15000.0,
            fever_irbc_kill_rate: 1.4,
            erythropoiesis_anemia_effect: 3.5,
            base_gametocyte_mosquito_survival_rate: 0.85,
            cytokine_gametocyte_inactivation: 0.4,
            maternal_antibody_mode: MaternalAntibodyMode::Off,
            hyperimmune_decay_rate: -((0.4 - 0.34_f64) / (1.0 - 0.34)).ln() / 120.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_param_set() -> ParamSet {
        let c = Config::laboratory_default(42);
        let mut p = ParamSet::new();
        p.insert("Run_Number".into(), ParamValue::Int(c.seed as i64));
        p.insert(
            "Max_Individual_Infections".into(),
            ParamValue::Int(c.max_individual_infections as i64),
        );
        p.insert("Falciparum_MSP_Variants".into(), ParamValue::Int(c.msp_variants as i64));
        p.insert(
            "Falciparum_Nonspecific_Types".into(),
            ParamValue::Int(c.nonspecific_types as i64),
        );
        p.insert(
            "Falciparum_PfEMP1_Variants".into(),
            ParamValue::Int(c.pfemp1_variants as i64),
        );
        p.insert(
            "Base_Incubation_Period".into(),
            ParamValue::Float(c.base_incubation_period),
        );
        p.insert(
            "Antibody_IRBC_Kill_Rate".into(),
            ParamValue::Float(c.antibody_irbc_kill_rate),
        );
        p.insert(
            "Nonspecific_Antigenicity_Factor".into(),
            ParamValue::Float(c.nonspecific_antigenicity_factor),
        );
        p.insert(
            "MSP1_Merozoite_Kill_Fraction".into(),
            ParamValue::Float(c.msp1_merozoite_kill_fraction),
        );
        p.insert(
            "Gametocyte_Stage_Survival_Rate".into(),
            ParamValue::Float(c.gametocyte_stage_survival_rate),
        );
        p.insert(
            "Base_Gametocyte_Fraction_Male".into(),
            ParamValue::Float(c.base_gametocyte_fraction_male),
        );
        p.insert(
            "Base_Gametocyte_Production_Rate".into(),
            ParamValue::Float(c.base_gametocyte_production_rate),
        );
        p.insert("Antigen_Switch_Rate".into(), ParamValue::Float(c.antigen_switch_rate));
        p.insert(
            "Merozoites_Per_Hepatocyte".into(),
            ParamValue::Float(c.merozoites_per_hepatocyte),
        );
        p.insert(
            "Merozoites_Per_Schizont".into(),
            ParamValue::Float(c.merozoites_per_schizont),
        );
        p.insert(
            "RBC_Destruction_Multiplier".into(),
            ParamValue::Float(c.rbc_destruction_multiplier),
        );
        p.insert(
            "Number_Of_Asexual_Cycles_Without_Gametocytes".into(),
            ParamValue::Int(c.n_asexual_cycles_wo_gametocytes as i64),
        );
        p.insert(
            "Antibody_Memory_Level".into(),
            ParamValue::Float(c.antibody_memory_level),
        );
        p.insert(
            "Max_MSP1_Antibody_Growthrate".into(),
            ParamValue::Float(c.max_msp1_antibody_growthrate),
        );
        p.insert(
            "Antibody_Stimulation_C50".into(),
            ParamValue::Float(c.antibody_stimulation_c50),
        );
        p.insert(
            "Antibody_Capacity_Growth_Rate".into(),
            ParamValue::Float(c.antibody_capacity_growth_rate),
        );
        p.insert("Min_Adapted_Response".into(), ParamValue::Float(c.min_adapted_response));
        p.insert(
            "Nonspecific_Antibody_Growth_Rate_Factor".into(),
            ParamValue::Float(c.nonspecific_antibody_growth_rate_factor),
        );
        p.insert(
            "Antibody_CSP_Decay_Days".into(),
            ParamValue::Float(c.antibody_csp_decay_days),
        );
        p.insert(
            "Maternal_Antibody_Decay_Rate".into(),
            ParamValue::Float(c.maternal_antibody_decay_rate),
        );
        p.insert("Pyrogenic_Threshold".into(), ParamValue::Float(c.pyrogenic_threshold));
        p.insert("Fever_IRBC_Kill_Rate".into(), ParamValue::Float(c.fever_irbc_kill_rate));
        p.insert(
            "Erythropoiesis_Anemia_Effect".into(),
            ParamValue::Float(c.erythropoiesis_anemia_effect),
        );
        p.insert(
            "Base_Gametocyte_Mosquito_Survival_Rate".into(),
            ParamValue::Float(c.base_gametocyte_mosquito_survival_rate),
        );
        p.insert(
            "Cytokine_Gametocyte_Inactivation".into(),
            ParamValue::Float(c.cytokine_gametocyte_inactivation),
        );
        p
    }

    #[test]
    fn builds_from_complete_param_set() {
        let pset = full_param_set();
        let config = Config::from_params(&pset).unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.max_individual_infections, 5);
    }

    #[test]
    fn missing_key_is_config_error() {
        let mut pset = full_param_set();
        pset.remove("Pyrogenic_Threshold");
        let err = Config::from_params(&pset).unwrap_err();
        assert!(matches!(err, SimulationError::Config(_)));
    }

    #[test]
    fn mistyped_key_is_config_error() {
        let mut pset = full_param_set();
        pset.insert("Max_Individual_Infections".into(), ParamValue::Float(3.5));
        let err = Config::from_params(&pset).unwrap_err();
        assert!(matches!(err, SimulationError::Config(_)));
    }

    #[test]
    fn derives_hyperimmune_decay_rate() {
        let pset = full_param_set();
        let config = Config::from_params(&pset).unwrap();
        let expected = -((0.4 - config.antibody_memory_level) / (1.0 - config.antibody_memory_level)).ln() / 120.0;
        assert!((config.hyperimmune_decay_rate - expected).abs() < 1e-12);
    }
}
