//! Top-level host container: owns one [`Susceptibility`] and a bounded list
//! of [`Infection`]s, orchestrates per-tick update order, and exposes the
//! `configure`/`create`/`challenge`/`treat`/`update` façade.

use log::{debug, info};

use crate::antibody::basic_sigmoid;
use crate::config::{Config, ParamSet};
use crate::error::SimulationResult;
use crate::infection::{expcdf, Infection};
use crate::rng::{HostRng, PseudoDesRng};
use crate::susceptibility::Susceptibility;

const MICROLITERS_PER_BLOODMEAL: f64 = 2.0;

/// Pluggable drug-killing contribution, consumed once per tick by every
/// active infection. Defaults to [`NoDrug`] — the source pins this term to
/// 0 with a TODO; this trait is the seam a future collaborator fills in.
pub trait DrugKillRate {
    fn kill_rate(&self, dt: f64, host: &Susceptibility) -> f64;
}

pub struct NoDrug;

impl DrugKillRate for NoDrug {
    fn kill_rate(&self, _dt: f64, _host: &Susceptibility) -> f64 {
        0.0
    }
}

/// Read-only flattened view of a host's state at one tick, the boundary
/// type export/reporting collaborators consume.
#[derive(Debug, Clone, Copy)]
pub struct HostSnapshot {
    pub age_days: f64,
    pub n_infections: usize,
    pub parasite_density: f64,
    pub gametocyte_density: f64,
    pub fever_celsius: f64,
    pub infectiousness: f64,
    pub rbc_availability: f64,
}

/// Top-level host container. Owns exactly one [`Susceptibility`] and an
/// insertion-ordered list of [`Infection`]s.
pub struct Intrahost {
    config: Config,
    susceptibility: Susceptibility,
    infections: Vec<Infection>,
    next_suid: u64,
    rng: Box<dyn HostRng>,
    drug: Option<Box<dyn DrugKillRate>>,
}

impl Intrahost {
    /// Builds a host from a raw parameter mapping (spec.md §6). Configuration
    /// failures abort construction with no partial state retained.
    pub fn configure(pset: &ParamSet) -> SimulationResult<Self> {
        let config = Config::from_params(pset)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        let rng = Box::new(PseudoDesRng::new(config.seed));
        let susceptibility = Susceptibility::new(&config);
        info!("intrahost host created, seed={}", config.seed);
        Intrahost {
            config,
            susceptibility,
            infections: Vec::new(),
            next_suid: 0,
            rng,
            drug: None,
        }
    }

    /// Installs a drug-killing hook; `None`/never calling this leaves the
    /// default [`NoDrug`] (contribution pinned to 0).
    pub fn set_drug_killrate(&mut self, drug: Box<dyn DrugKillRate>) {
        self.drug = Some(drug);
    }

    pub fn create(&mut self) {
        self.susceptibility = Susceptibility::new(&self.config);
        self.infections.clear();
    }

    /// Creates a new infection unless the host is already at
    /// `max_individual_infections`.
    pub fn challenge(&mut self) {
        if self.infections.len() >= self.config.max_individual_infections {
            debug!(
                "challenge ignored, host already at {} infections",
                self.config.max_individual_infections
            );
            return;
        }
        let suid = self.next_suid;
        self.next_suid += 1;
        let infection = Infection::create(suid, &mut self.susceptibility, &self.config, &mut *self.rng, 1);
        info!("infection {suid} created");
        self.infections.push(infection);
    }

    /// Deletes every active infection. Drug-killing refinement of this
    /// behavior is a future collaborator; current semantics are "wipe".
    pub fn treat(&mut self) {
        info!("treat: clearing {} infections", self.infections.len());
        self.infections.clear();
    }

    pub fn update(&mut self, dt: f64) -> SimulationResult<()> {
        self.susceptibility.update(dt, &self.config);

        let drug_killrate = match &self.drug {
            Some(drug) => drug.kill_rate(dt, &self.susceptibility),
            None => 0.0,
        };

        let mut i = 0;
        while i < self.infections.len() {
            self.infections[i].update(dt, &mut self.susceptibility, &self.config, &mut *self.rng, drug_killrate)?;
            if self.infections[i].is_cleared() {
                let cleared = self.infections.remove(i);
                info!("infection {} cleared", cleared.suid);
            } else {
                i += 1;
            }
        }

        Ok(())
    }

    pub fn n_infections(&self) -> usize {
        self.infections.len()
    }

    pub fn parasite_density(&self) -> f64 {
        self.infections
            .iter()
            .map(|inf| inf.total_irbc() as f64 * self.susceptibility.inv_microliters_blood)
            .sum()
    }

    pub fn gametocyte_density(&self) -> f64 {
        self.infections
            .iter()
            .map(|inf| inf.total_female_mature_gametocytes() * self.susceptibility.inv_microliters_blood)
            .sum()
    }

    pub fn fever_celsius(&self) -> f64 {
        self.susceptibility.fever_celsius()
    }

    pub fn rbc_availability(&self) -> f64 {
        self.susceptibility.rbc_availability()
    }

    pub fn infectiousness(&self) -> f64 {
        let gameto_density = self.gametocyte_density();
        let suppression = 1.0
            - basic_sigmoid(
                self.config.cytokine_gametocyte_inactivation,
                self.susceptibility.cytokines,
            );
        expcdf(
            -gameto_density
                * MICROLITERS_PER_BLOODMEAL
                * self.config.base_gametocyte_mosquito_survival_rate
                * suppression,
        )
    }

    pub fn snapshot(&self) -> HostSnapshot {
        HostSnapshot {
            age_days: self.susceptibility.age,
            n_infections: self.n_infections(),
            parasite_density: self.parasite_density(),
            gametocyte_density: self.gametocyte_density(),
            fever_celsius: self.fever_celsius(),
            infectiousness: self.infectiousness(),
            rbc_availability: self.rbc_availability(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn susceptibility(&self) -> &Susceptibility {
        &self.susceptibility
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamValue;

    fn full_param_set() -> ParamSet {
        let c = Config::laboratory_default(7);
        let mut p = ParamSet::new();
        p.insert("Run_Number".into(), ParamValue::Int(c.seed as i64));
        p.insert("Max_Individual_Infections".into(), ParamValue::Int(3));
        p.insert("Falciparum_MSP_Variants".into(), ParamValue::Int(c.msp_variants as i64));
        p.insert(
            "Falciparum_Nonspecific_Types".into(),
            ParamValue::Int(c.nonspecific_types as i64),
        );
        p.insert(
            "Falciparum_PfEMP1_Variants".into(),
            ParamValue::Int(c.pfemp1_variants as i64),
        );
        p.insert("Base_Incubation_Period".into(), ParamValue::Float(7.0));
        p.insert("Antibody_IRBC_Kill_Rate".into(), ParamValue::Float(c.antibody_irbc_kill_rate));
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
            ParamValue::Float(0.0),
        );
        p.insert("Antigen_Switch_Rate".into(), ParamValue::Float(c.antigen_switch_rate));
        p.insert("Merozoites_Per_Hepatocyte".into(), ParamValue::Float(15000.0));
        p.insert("Merozoites_Per_Schizont".into(), ParamValue::Float(c.merozoites_per_schizont));
        p.insert(
            "RBC_Destruction_Multiplier".into(),
            ParamValue::Float(c.rbc_destruction_multiplier),
        );
        p.insert(
            "Number_Of_Asexual_Cycles_Without_Gametocytes".into(),
            ParamValue::Int(c.n_asexual_cycles_wo_gametocytes as i64),
        );
        p.insert("Antibody_Memory_Level".into(), ParamValue::Float(c.antibody_memory_level));
        p.insert(
            "Max_MSP1_Antibody_Growthrate".into(),
            ParamValue::Float(c.max_msp1_antibody_growthrate),
        );
        p.insert("Antibody_Stimulation_C50".into(), ParamValue::Float(c.antibody_stimulation_c50));
        p.insert(
            "Antibody_Capacity_Growth_Rate".into(),
            ParamValue::Float(c.antibody_capacity_growth_rate),
        );
        p.insert("Min_Adapted_Response".into(), ParamValue::Float(c.min_adapted_response));
        p.insert(
            "Nonspecific_Antibody_Growth_Rate_Factor".into(),
            ParamValue::Float(c.nonspecific_antibody_growth_rate_factor),
        );
        p.insert("Antibody_CSP_Decay_Days".into(), ParamValue::Float(c.antibody_csp_decay_days));
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
    fn liver_stage_latency() {
        let pset = full_param_set();
        let mut host = Intrahost::configure(&pset).unwrap();
        host.challenge();
        for _ in 0..7 {
            host.update(1.0).unwrap();
        }
        assert_eq!(host.infections[0].hepatocytes, 0);
        let total: u64 = host.infections[0].irbc_count.iter().sum();
        assert!(total > 10_000, "expected ~15000 IRBCs, got {total}");
    }

    #[test]
    fn challenge_is_noop_at_capacity() {
        let pset = full_param_set();
        let mut host = Intrahost::configure(&pset).unwrap();
        host.challenge();
        host.challenge();
        host.challenge();
        assert_eq!(host.n_infections(), 3);
        host.challenge();
        assert_eq!(host.n_infections(), 3);
    }

    #[test]
    fn treat_wipes_all() {
        let pset = full_param_set();
        let mut host = Intrahost::configure(&pset).unwrap();
        host.challenge();
        host.challenge();
        host.challenge();
        assert_eq!(host.n_infections(), 3);
        host.treat();
        assert_eq!(host.n_infections(), 0);
        host.update(1.0).unwrap();
        assert_eq!(host.parasite_density(), 0.0);
    }

    #[test]
    fn zero_infections_has_zero_infectiousness() {
        let pset = full_param_set();
        let mut host = Intrahost::configure(&pset).unwrap();
        host.update(1.0).unwrap();
        assert_eq!(host.parasite_density(), 0.0);
        assert_eq!(host.gametocyte_density(), 0.0);
        assert_eq!(host.infectiousness(), 0.0);
    }

    #[test]
    fn determinism_across_identical_hosts() {
        let pset = full_param_set();
        let mut a = Intrahost::configure(&pset).unwrap();
        let mut b = Intrahost::configure(&pset).unwrap();
        a.challenge();
        b.challenge();
        for _ in 0..20 {
            a.update(1.0).unwrap();
            b.update(1.0).unwrap();
        }
        assert_eq!(a.n_infections(), b.n_infections());
        assert_eq!(a.parasite_density(), b.parasite_density());
        assert_eq!(a.fever_celsius(), b.fever_celsius());
    }
}
