//! One parasite clone's trajectory: liver stage, repeated 48-hour asexual
//! cycle with antigenic switching, and gametocyte production. Owned
//! exclusively by its [`crate::intrahost::Intrahost`]; refers back into
//! [`Susceptibility`] through stable antibody handles, never by raw pointer.

use log::warn;

use crate::antibody::AntibodyClass;
use crate::config::Config;
use crate::error::{SimulationError, SimulationResult};
use crate::rng::HostRng;
use crate::susceptibility::{AntibodyHandle, Susceptibility};

pub const CLONAL_PFEMP1_VARIANTS: usize = 50;
const MINOR_EPITOPE_VARS_PER_SET: u16 = 5;
const INITIAL_PFEMP1_VARIANTS: usize = 5;
const SWITCHING_IRBC_VARIANT_COUNT: usize = 10;
const MEROZOITE_LIMITING_RBC_THRESHOLD: f64 = 0.2;
const MIN_FEVER_DEGREES_KILLING: f64 = 1.5;
const MATURE_GAMETOCYTE_DECAY_RATE: f64 = 0.277;
const IRBC_CYCLE_LENGTH_DAYS: f64 = 2.0;
const GAMETOCYTE_STAGE_COUNT: usize = 6;

pub(crate) fn expcdf(x: f64) -> f64 {
    1.0 - x.exp()
}

/// Development stage of a gametocyte, male and female tracked in parallel
/// arrays. `Mature` is the only transmissible stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum GametocyteStage {
    Stage0 = 0,
    Stage1 = 1,
    Stage2 = 2,
    Stage3 = 3,
    Stage4 = 4,
    Mature = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsexualPhase {
    None,
    /// Exists for exactly one tick: suppresses the `irbc_timer` decrement on
    /// the tick the asexual cycle starts.
    HepatocyteRelease,
    AsexualCycle,
}

/// One parasite clone's state: liver-stage timer, asexual-cycle IRBC
/// repertoire, and gametocyte staging.
#[derive(Debug, Clone)]
pub struct Infection {
    pub suid: u64,
    pub liver_stage_timer: f64,
    pub irbc_timer: f64,
    pub hepatocytes: i64,
    pub asexual_phase: AsexualPhase,
    pub asexual_cycle_count: u32,

    pub msp_type: u16,
    pub nonspec_type: u16,
    pub minor_epitope_type: [u16; CLONAL_PFEMP1_VARIANTS],
    pub irbc_type: [u16; CLONAL_PFEMP1_VARIANTS],
    pub irbc_count: [u64; CLONAL_PFEMP1_VARIANTS],

    pub male_gametocytes: [f64; GAMETOCYTE_STAGE_COUNT],
    pub female_gametocytes: [f64; GAMETOCYTE_STAGE_COUNT],
    pub gametorate: f64,
    pub gametosexratio: f64,

    msp_antibody: AntibodyHandle,
    pfemp1_handles: [(Option<AntibodyHandle>, Option<AntibodyHandle>); CLONAL_PFEMP1_VARIANTS],
}

impl Infection {
    /// Draws the clone's repertoire via the host RNG and registers its MSP
    /// antibody immediately; PfEMP1 handles are nulled and resolved lazily
    /// at the start of the asexual cycle.
    pub fn create(
        suid: u64,
        susceptibility: &mut Susceptibility,
        config: &Config,
        rng: &mut dyn HostRng,
        initial_hepatocytes: i64,
    ) -> Self {
        let msp_type = rng.uniform_below(config.msp_variants);
        let nonspec_type = rng.uniform_below(config.nonspecific_types);

        let mut irbc_type = [0u16; CLONAL_PFEMP1_VARIANTS];
        let mut minor_epitope_type = [0u16; CLONAL_PFEMP1_VARIANTS];
        for i in 0..CLONAL_PFEMP1_VARIANTS {
            irbc_type[i] = rng.uniform_below(config.pfemp1_variants);
            minor_epitope_type[i] = nonspec_type * MINOR_EPITOPE_VARS_PER_SET
                + rng.uniform_below(MINOR_EPITOPE_VARS_PER_SET);
        }

        let msp_antibody = susceptibility.register_antibody(AntibodyClass::Msp1, msp_type, 0.0);

        Infection {
            suid,
            liver_stage_timer: 0.0,
            irbc_timer: 0.0,
            hepatocytes: initial_hepatocytes,
            asexual_phase: AsexualPhase::None,
            asexual_cycle_count: 0,
            msp_type,
            nonspec_type,
            minor_epitope_type,
            irbc_type,
            irbc_count: [0; CLONAL_PFEMP1_VARIANTS],
            male_gametocytes: [0.0; GAMETOCYTE_STAGE_COUNT],
            female_gametocytes: [0.0; GAMETOCYTE_STAGE_COUNT],
            gametorate: 0.0,
            gametosexratio: 0.0,
            msp_antibody,
            pfemp1_handles: [(None, None); CLONAL_PFEMP1_VARIANTS],
        }
    }

    pub fn update(
        &mut self,
        dt: f64,
        susceptibility: &mut Susceptibility,
        config: &Config,
        rng: &mut dyn HostRng,
        drug_killrate: f64,
    ) -> SimulationResult<()> {
        self.liver_stage_timer += dt;

        if self.hepatocytes > 0 {
            self.hepatocyte_phase(susceptibility, config);
        }

        if self.asexual_phase != AsexualPhase::None {
            match self.asexual_phase {
                AsexualPhase::HepatocyteRelease => {
                    self.asexual_phase = AsexualPhase::AsexualCycle;
                }
                AsexualPhase::AsexualCycle => {
                    self.irbc_timer -= dt;
                }
                AsexualPhase::None => unreachable!(),
            }

            if self.irbc_timer <= 0.0 {
                self.end_of_asexual_cycle(susceptibility, config, rng)?;
            }

            if susceptibility.rbc_count < 1 {
                return Err(SimulationError::HostDeath {
                    age_days: susceptibility.age,
                    rbc_count: susceptibility.rbc_count,
                });
            }

            self.immune_stimulation(susceptibility);
            self.kill_irbcs(dt, susceptibility, config, rng, drug_killrate);
            self.kill_gametocytes(dt, rng, drug_killrate);

            susceptibility.get_antibody_mut(self.msp_antibody).add_antigen_count(1);
            susceptibility.set_antigen_present();
        }

        Ok(())
    }

    fn hepatocyte_phase(&mut self, susceptibility: &mut Susceptibility, config: &Config) {
        if self.liver_stage_timer < config.base_incubation_period || self.asexual_phase != AsexualPhase::None {
            return;
        }

        self.irbc_count = [0; CLONAL_PFEMP1_VARIANTS];
        let seed_count = (self.hepatocytes as f64 * config.merozoites_per_hepatocyte
            / INITIAL_PFEMP1_VARIANTS as f64) as u64;
        for i in 0..INITIAL_PFEMP1_VARIANTS {
            self.irbc_count[i] = seed_count;
            self.register_variant_antibodies(susceptibility, i);
        }

        self.hepatocytes = 0;
        self.irbc_timer = IRBC_CYCLE_LENGTH_DAYS;
        self.asexual_phase = AsexualPhase::HepatocyteRelease;
    }

    fn register_variant_antibodies(&mut self, susceptibility: &mut Susceptibility, variant_index: usize) {
        let (minor, major) = &mut self.pfemp1_handles[variant_index];
        susceptibility.update_active_antibody(
            minor,
            major,
            self.minor_epitope_type[variant_index],
            self.irbc_type[variant_index],
        );
    }

    fn immune_stimulation(&mut self, susceptibility: &mut Susceptibility) {
        for i in 0..CLONAL_PFEMP1_VARIANTS {
            if self.irbc_count[i] == 0 {
                continue;
            }
            self.register_variant_antibodies(susceptibility, i);
            let (minor, major) = self.pfemp1_handles[i];
            let count = self.irbc_count[i];
            susceptibility.get_antibody_mut(minor.unwrap()).add_antigen_count(count);
            susceptibility.get_antibody_mut(major.unwrap()).add_antigen_count(count);
        }
    }

    fn kill_irbcs(
        &mut self,
        dt: f64,
        susceptibility: &Susceptibility,
        config: &Config,
        rng: &mut dyn HostRng,
        drug_killrate: f64,
    ) {
        let fever = susceptibility.fever();
        let fever_cytokine_killrate = if fever > MIN_FEVER_DEGREES_KILLING {
            susceptibility.ind_fever_kill_rate * crate::antibody::basic_sigmoid(1.0, fever - MIN_FEVER_DEGREES_KILLING)
        } else {
            0.0
        };

        for i in 0..CLONAL_PFEMP1_VARIANTS {
            if self.irbc_count[i] == 0 {
                continue;
            }
            let (minor, major) = self.pfemp1_handles[i];
            let minor_conc = minor.map_or(0.0, |h| susceptibility.get_antibody(h).concentration);
            let major_conc = major.map_or(0.0, |h| susceptibility.get_antibody(h).concentration);

            let k = (major_conc + config.nonspecific_antigenicity_factor * minor_conc
                + susceptibility.maternal_antibody_strength)
                * config.antibody_irbc_kill_rate
                + fever_cytokine_killrate
                + drug_killrate;
            let pkill = expcdf(-dt * k);

            let n = self.irbc_count[i] as f64;
            let mean = n * pkill;
            let var = (n * pkill * (1.0 - pkill)).max(0.0);
            let mut killed_float = rng.gaussian() * var.sqrt() + mean;
            if killed_float < 0.5 {
                killed_float = 0.0;
            } else {
                killed_float += 0.5;
            }
            let killed = killed_float as u64;
            self.irbc_count[i] = self.irbc_count[i].saturating_sub(killed);
        }
    }

    fn kill_gametocytes(&mut self, dt: f64, rng: &mut dyn HostRng, drug_killrate: f64) {
        let immature_pkill = expcdf(-dt * drug_killrate);
        for stage in 0..GametocyteStage::Mature as usize {
            let male_killed = (self.male_gametocytes[stage] * immature_pkill + 0.5).floor();
            self.male_gametocytes[stage] = (self.male_gametocytes[stage] - male_killed).max(0.0);
            let female_killed = (self.female_gametocytes[stage] * immature_pkill + 0.5).floor();
            self.female_gametocytes[stage] = (self.female_gametocytes[stage] - female_killed).max(0.0);
        }

        let mature_pkill = expcdf(-dt * (MATURE_GAMETOCYTE_DECAY_RATE + drug_killrate));
        let mature = GametocyteStage::Mature as usize;

        let female_mean = self.female_gametocytes[mature] * mature_pkill;
        let female_var = (self.female_gametocytes[mature] * mature_pkill * (1.0 - mature_pkill)).max(0.0);
        let female_killed = (rng.gaussian() * female_var.sqrt() + female_mean).max(0.0);
        self.female_gametocytes[mature] = (self.female_gametocytes[mature] - female_killed).max(0.0);

        let male_mean = self.male_gametocytes[mature] * mature_pkill;
        let male_var = (self.male_gametocytes[mature] * mature_pkill * (1.0 - mature_pkill)).max(0.0);
        let male_killed = (rng.gaussian() * male_var.sqrt() + male_mean).max(0.0);
        self.male_gametocytes[mature] = (self.male_gametocytes[mature] - male_killed).max(0.0);
    }

    fn end_of_asexual_cycle(
        &mut self,
        susceptibility: &mut Susceptibility,
        config: &Config,
        rng: &mut dyn HostRng,
    ) -> SimulationResult<()> {
        let rbc_avail = susceptibility.rbc_availability();
        let msp_concentration = susceptibility.get_antibody(self.msp_antibody).concentration;
        let merozoite_survival = ((1.0 - config.msp1_merozoite_kill_fraction * msp_concentration)
            * expcdf(-rbc_avail / MEROZOITE_LIMITING_RBC_THRESHOLD))
            .max(0.0);
        if merozoite_survival < 0.0 {
            return Err(SimulationError::InvariantViolation(
                "merozoite_survival went negative at end of asexual cycle".to_string(),
            ));
        }

        let total_irbc_before: u64 = self.irbc_count.iter().sum();
        susceptibility
            .get_antibody_mut(self.msp_antibody)
            .add_antigen_count(total_irbc_before);

        self.cycle_gametocytes(config, merozoite_survival);
        self.antigenic_switching(config, rng, merozoite_survival);

        for i in 0..CLONAL_PFEMP1_VARIANTS {
            if self.irbc_count[i] > 0 {
                self.register_variant_antibodies(susceptibility, i);
            }
        }

        let total_irbc_after: u64 = self.irbc_count.iter().sum();
        let destruction_factor = (config.rbc_destruction_multiplier
            * expcdf(-rbc_avail / MEROZOITE_LIMITING_RBC_THRESHOLD))
            .max(1.0);
        let new_gametocytes = (self.male_gametocytes[GametocyteStage::Stage0 as usize]
            + self.female_gametocytes[GametocyteStage::Stage0 as usize]) as u64;
        susceptibility.remove_rbcs(total_irbc_after, new_gametocytes, destruction_factor);

        self.irbc_timer = IRBC_CYCLE_LENGTH_DAYS;
        self.asexual_cycle_count += 1;
        Ok(())
    }

    fn cycle_gametocytes(&mut self, config: &Config, merozoite_survival: f64) {
        if self.asexual_cycle_count >= config.n_asexual_cycles_wo_gametocytes {
            self.gametorate = config.base_gametocyte_production_rate;
            self.gametosexratio = config.base_gametocyte_fraction_male;
        }

        for stage in (1..GAMETOCYTE_STAGE_COUNT).rev() {
            self.male_gametocytes[stage] += self.male_gametocytes[stage - 1] * config.gametocyte_stage_survival_rate;
            self.male_gametocytes[stage - 1] = 0.0;
            if self.male_gametocytes[stage] < 1.0 {
                self.male_gametocytes[stage] = 0.0;
            }

            self.female_gametocytes[stage] +=
                self.female_gametocytes[stage - 1] * config.gametocyte_stage_survival_rate;
            self.female_gametocytes[stage - 1] = 0.0;
            if self.female_gametocytes[stage] < 1.0 {
                self.female_gametocytes[stage] = 0.0;
            }
        }

        let stage0 = GametocyteStage::Stage0 as usize;
        for j in 0..CLONAL_PFEMP1_VARIANTS {
            let base =
                self.irbc_count[j] as f64 * self.gametorate * merozoite_survival * config.merozoites_per_schizont;
            self.male_gametocytes[stage0] += base * self.gametosexratio;
            self.female_gametocytes[stage0] += base * (1.0 - self.gametosexratio);
        }
    }

    /// Stochastic PfEMP1 variant switching in daughter IRBCs. Poisson draws
    /// only cover `k < 7` of the 10 candidate switch targets — the source's
    /// own constraint, preserved here.
    fn antigenic_switching(&mut self, config: &Config, rng: &mut dyn HostRng, merozoite_survival: f64) {
        let mut tmp = [0u64; CLONAL_PFEMP1_VARIANTS];

        for j in 0..CLONAL_PFEMP1_VARIANTS {
            if self.irbc_count[j] == 0 {
                continue;
            }

            let mut switching = [0u64; SWITCHING_IRBC_VARIANT_COUNT];
            for (k, slot) in switching.iter_mut().enumerate() {
                if k < 7 {
                    *slot = rng.poisson(config.antigen_switch_rate * self.irbc_count[j] as f64);
                }
            }

            let cap = (1.0 - self.gametorate) * self.irbc_count[j] as f64;
            let sum: u64 = switching.iter().sum();
            if (sum as f64) > cap && sum > 0 {
                let scale = cap / sum as f64;
                for slot in switching.iter_mut() {
                    *slot = (*slot as f64 * scale) as u64;
                }
            }

            let switched_sum: u64 = switching.iter().sum();
            let remainder = (cap - switched_sum as f64).max(0.0);
            tmp[j] += (remainder * config.merozoites_per_schizont * merozoite_survival) as u64;

            for (k, &count) in switching.iter().enumerate() {
                let target = (j + k + 1) % CLONAL_PFEMP1_VARIANTS;
                tmp[target] += (count as f64 * config.merozoites_per_schizont * merozoite_survival) as u64;
            }
        }

        self.irbc_count = tmp;
    }

    pub fn is_cleared(&self) -> bool {
        let total = self.hepatocytes as f64
            + self.irbc_count.iter().sum::<u64>() as f64
            + self.male_gametocytes.iter().sum::<f64>()
            + self.female_gametocytes.iter().sum::<f64>();
        total < 1.0
    }

    pub fn total_irbc(&self) -> u64 {
        self.irbc_count.iter().sum()
    }

    pub fn total_female_mature_gametocytes(&self) -> f64 {
        self.female_gametocytes[GametocyteStage::Mature as usize]
    }
}

/// Surfaces a negative IRBC count defensively: the type system already
/// prevents this (`irbc_count` is unsigned), so this only exists as a
/// callable diagnostic path for callers constructing infections manually.
pub fn warn_if_negative_irbc(variant: usize, raw_count: i64) -> u64 {
    if raw_count < 0 {
        warn!("negative IRBC count {raw_count} for variant {variant}, clamping to 0");
        0
    } else {
        raw_count as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::rng::PseudoDesRng;

    #[test]
    fn hepatocyte_phase_seeds_five_variants() {
        let config = Config::laboratory_default(1);
        let mut rng = PseudoDesRng::new(config.seed);
        let mut susceptibility = Susceptibility::new(&config);
        let mut infection = Infection::create(0, &mut susceptibility, &config, &mut rng, 1);

        for _ in 0..7 {
            infection.update(1.0, &mut susceptibility, &config, &mut rng, 0.0).unwrap();
        }

        assert_eq!(infection.hepatocytes, 0);
        let total: u64 = infection.irbc_count.iter().sum();
        assert!(total > 0, "expected seeded IRBCs after incubation");
        let nonzero = infection.irbc_count.iter().filter(|&&c| c > 0).count();
        assert_eq!(nonzero, INITIAL_PFEMP1_VARIANTS);
        assert_eq!(infection.asexual_phase, AsexualPhase::AsexualCycle);
    }

    #[test]
    fn clearance_detects_empty_infection() {
        let config = Config::laboratory_default(1);
        let mut rng = PseudoDesRng::new(config.seed);
        let mut susceptibility = Susceptibility::new(&config);
        let infection = Infection::create(0, &mut susceptibility, &config, &mut rng, 0);
        assert!(infection.is_cleared());
    }

    #[test]
    fn nonzero_hepatocytes_is_not_cleared() {
        let config = Config::laboratory_default(1);
        let mut rng = PseudoDesRng::new(config.seed);
        let mut susceptibility = Susceptibility::new(&config);
        let infection = Infection::create(0, &mut susceptibility, &config, &mut rng, 1);
        assert!(!infection.is_cleared());
    }
}
