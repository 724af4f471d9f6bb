//! Host-level immune and hematologic state: RBC stock, cytokines/fever,
//! maternal antibody, and the antibody registry every [`crate::infection::Infection`]
//! resolves its back-references through.

use crate::antibody::{basic_sigmoid, Antibody, AntibodyClass, B_CELL_PROLIF_THRESHOLD};
use crate::config::{Config, MaternalAntibodyMode};

const DAYS_PER_YEAR: f64 = 365.0;
const AVERAGE_RBC_LIFESPAN: f64 = 120.0;
const ADULT_RBC_PRODUCTION: f64 = 2e11;
const INFANT_RBC_PRODUCTION: f64 = 1.5e10;
const FEVER_DEGREES_CELSIUS_PER_UNIT_CYTOKINES: f64 = 4.0;
const CYTOKINE_STIMULATION_SCALE: f64 = 1.0;

/// Stable reference to a registered [`Antibody`], resolved through
/// [`Susceptibility`]'s registry. Indices are append-only, so a handle
/// stays valid for the susceptibility's whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntibodyHandle {
    Csp,
    Msp1(u32),
    PfEmp1Minor(u32),
    PfEmp1Major(u32),
}

/// Host-level immune and hematologic state. Exclusively owned by one
/// [`crate::intrahost::Intrahost`].
#[derive(Debug, Clone)]
pub struct Susceptibility {
    pub age: f64,
    pub rbc_count: i64,
    pub rbc_capacity: i64,
    pub rbc_production: i64,
    pub inv_microliters_blood: f64,
    pub cytokines: f64,
    pub cytokine_stimulation_pending: f64,
    pub parasite_density: f64,
    pub maternal_antibody_strength: f64,
    pub ind_pyrogenic_threshold: f64,
    pub ind_fever_kill_rate: f64,
    pub antigenic_flag: bool,

    csp_antibody: Antibody,
    active_msp: Vec<Antibody>,
    active_pfemp1_minor: Vec<Antibody>,
    active_pfemp1_major: Vec<Antibody>,
}

impl Susceptibility {
    pub fn new(config: &Config) -> Self {
        let maternal_antibody_strength = match config.maternal_antibody_mode {
            MaternalAntibodyMode::Off => 0.0,
            MaternalAntibodyMode::SimpleWaning { initial_fraction } => initial_fraction,
            MaternalAntibodyMode::ConstantInitialImmunity { level } => level,
        };

        let mut s = Susceptibility {
            age: 0.0,
            rbc_count: 0,
            rbc_capacity: 0,
            rbc_production: 0,
            inv_microliters_blood: 1.0 / 5e6,
            cytokines: 0.0,
            cytokine_stimulation_pending: 0.0,
            parasite_density: 0.0,
            maternal_antibody_strength,
            ind_pyrogenic_threshold: config.pyrogenic_threshold,
            ind_fever_kill_rate: config.fever_irbc_kill_rate,
            antigenic_flag: false,
            csp_antibody: Antibody::new(AntibodyClass::Csp, 0, 0.0),
            active_msp: Vec::new(),
            active_pfemp1_minor: Vec::new(),
            active_pfemp1_major: Vec::new(),
        };
        s.recalc_blood_capacity();
        s.rbc_count = s.rbc_capacity;
        s
    }

    fn recalc_blood_capacity(&mut self) {
        let adult_cutoff_days = 20.0 * DAYS_PER_YEAR;
        if self.age <= adult_cutoff_days {
            let age_years = self.age / DAYS_PER_YEAR;
            self.rbc_production = (INFANT_RBC_PRODUCTION
                + (age_years / 20.0) * (ADULT_RBC_PRODUCTION - INFANT_RBC_PRODUCTION))
                as i64;
            self.inv_microliters_blood = 1.0 / ((0.225 * age_years + 0.5) * 1e6);
        } else {
            self.rbc_production = ADULT_RBC_PRODUCTION as i64;
            self.inv_microliters_blood = 1.0 / 5e6;
        }
        self.rbc_capacity = (self.rbc_production as f64 * AVERAGE_RBC_LIFESPAN) as i64;
    }

    pub fn get_antibody(&self, handle: AntibodyHandle) -> &Antibody {
        match handle {
            AntibodyHandle::Csp => &self.csp_antibody,
            AntibodyHandle::Msp1(i) => &self.active_msp[i as usize],
            AntibodyHandle::PfEmp1Minor(i) => &self.active_pfemp1_minor[i as usize],
            AntibodyHandle::PfEmp1Major(i) => &self.active_pfemp1_major[i as usize],
        }
    }

    pub fn get_antibody_mut(&mut self, handle: AntibodyHandle) -> &mut Antibody {
        match handle {
            AntibodyHandle::Csp => &mut self.csp_antibody,
            AntibodyHandle::Msp1(i) => &mut self.active_msp[i as usize],
            AntibodyHandle::PfEmp1Minor(i) => &mut self.active_pfemp1_minor[i as usize],
            AntibodyHandle::PfEmp1Major(i) => &mut self.active_pfemp1_major[i as usize],
        }
    }

    /// Lazily registers an antibody for `(class, variant)`, returning a
    /// stable handle. For CSP, always returns the singleton. For the other
    /// three classes, linear-scans the collection for a matching variant
    /// before appending a new one.
    pub fn register_antibody(&mut self, class: AntibodyClass, variant: u16, capacity: f64) -> AntibodyHandle {
        match class {
            AntibodyClass::Csp => AntibodyHandle::Csp,
            AntibodyClass::Msp1 => {
                if let Some(i) = self.active_msp.iter().position(|a| a.variant == variant) {
                    return AntibodyHandle::Msp1(i as u32);
                }
                self.active_msp.push(Antibody::new(class, variant, capacity));
                AntibodyHandle::Msp1((self.active_msp.len() - 1) as u32)
            }
            AntibodyClass::PfEmp1Minor => {
                if let Some(i) = self.active_pfemp1_minor.iter().position(|a| a.variant == variant) {
                    return AntibodyHandle::PfEmp1Minor(i as u32);
                }
                self.active_pfemp1_minor.push(Antibody::new(class, variant, capacity));
                AntibodyHandle::PfEmp1Minor((self.active_pfemp1_minor.len() - 1) as u32)
            }
            AntibodyClass::PfEmp1Major => {
                if let Some(i) = self.active_pfemp1_major.iter().position(|a| a.variant == variant) {
                    return AntibodyHandle::PfEmp1Major(i as u32);
                }
                self.active_pfemp1_major.push(Antibody::new(class, variant, capacity));
                AntibodyHandle::PfEmp1Major((self.active_pfemp1_major.len() - 1) as u32)
            }
        }
    }

    /// Fills either slot of a (minor, major) holder if currently empty.
    /// Idempotent: already-filled slots are left untouched.
    pub fn update_active_antibody(
        &mut self,
        minor_handle: &mut Option<AntibodyHandle>,
        major_handle: &mut Option<AntibodyHandle>,
        minor_variant: u16,
        major_variant: u16,
    ) {
        if minor_handle.is_none() {
            *minor_handle = Some(self.register_antibody(AntibodyClass::PfEmp1Minor, minor_variant, 0.0));
        }
        if major_handle.is_none() {
            *major_handle = Some(self.register_antibody(AntibodyClass::PfEmp1Major, major_variant, 0.0));
        }
    }

    pub fn register_csp(&mut self) -> AntibodyHandle {
        AntibodyHandle::Csp
    }

    pub fn remove_rbcs(&mut self, infected_asexual: u64, infected_gametocytes: u64, destruction_multiplier: f64) {
        let destroyed = (infected_asexual as f64 * destruction_multiplier) as i64 + infected_gametocytes as i64;
        self.rbc_count -= destroyed;
    }

    pub fn set_antigen_present(&mut self) {
        self.antigenic_flag = true;
    }

    pub fn fever(&self) -> f64 {
        FEVER_DEGREES_CELSIUS_PER_UNIT_CYTOKINES * self.cytokines
    }

    pub fn fever_celsius(&self) -> f64 {
        37.0 + self.fever()
    }

    pub fn rbc_availability(&self) -> f64 {
        if self.rbc_capacity == 0 {
            0.0
        } else {
            self.rbc_count as f64 / self.rbc_capacity as f64
        }
    }

    pub fn update(&mut self, dt: f64, config: &Config) {
        self.age += dt;
        self.recalc_blood_capacity();

        let eryth_multiplier = if config.erythropoiesis_anemia_effect > 0.0 {
            (config.erythropoiesis_anemia_effect * (1.0 - self.rbc_availability())).exp()
        } else {
            1.0
        };
        let delta = (self.rbc_count as f64 / AVERAGE_RBC_LIFESPAN
            - self.rbc_production as f64 * eryth_multiplier)
            * dt;
        self.rbc_count -= delta as i64;

        self.cytokines -= self.cytokines * 2.0 * dt;
        if self.cytokines < 0.0 {
            self.cytokines = 0.0;
        }

        self.parasite_density = 0.0;

        self.maternal_antibody_strength -=
            self.maternal_antibody_strength * config.maternal_antibody_decay_rate * dt;
        if self.maternal_antibody_strength < 0.0 {
            self.maternal_antibody_strength = 0.0;
        }

        if !self.csp_antibody.antigen_present {
            self.csp_antibody.decay(dt, config);
        } else {
            if self.csp_antibody.capacity > B_CELL_PROLIF_THRESHOLD {
                self.csp_antibody.update_capacity_by_rate(dt, 0.33);
            }
            self.csp_antibody.update_concentration(dt, config);
        }

        if !self.antigenic_flag {
            for ab in self.active_msp.iter_mut() {
                ab.decay(dt, config);
            }
            for ab in self.active_pfemp1_minor.iter_mut() {
                ab.decay(dt, config);
            }
            for ab in self.active_pfemp1_major.iter_mut() {
                ab.decay(dt, config);
            }
            return;
        }

        let inv_ul = self.inv_microliters_blood;
        let mut temp_cytokine_stim = 0.0_f64;

        for ab in self.active_msp.iter_mut() {
            if ab.antigen_present {
                temp_cytokine_stim += ab.stimulate_cytokines(dt, inv_ul);
                ab.update_capacity(dt, inv_ul, config);
                ab.update_concentration(dt, config);
            } else {
                ab.decay(dt, config);
            }
        }

        for ab in self.active_pfemp1_minor.iter_mut() {
            ab.update_capacity(dt, inv_ul, config);
            ab.update_concentration(dt, config);
            self.parasite_density += ab.antigen_count as f64 * inv_ul;
        }

        for ab in self.active_pfemp1_major.iter_mut() {
            if ab.capacity <= B_CELL_PROLIF_THRESHOLD {
                self.cytokine_stimulation_pending += ab.stimulate_cytokines(dt, inv_ul);
            }
            ab.update_capacity(dt, inv_ul, config);
            ab.update_concentration(dt, config);
        }

        self.cytokines += CYTOKINE_STIMULATION_SCALE
            * basic_sigmoid(self.ind_pyrogenic_threshold, self.cytokine_stimulation_pending)
            * dt
            * 2.0;
        self.cytokines +=
            CYTOKINE_STIMULATION_SCALE * basic_sigmoid(self.ind_pyrogenic_threshold, temp_cytokine_stim);

        self.cytokine_stimulation_pending = 0.0;
        self.antigenic_flag = false;

        for ab in self.active_msp.iter_mut() {
            ab.reset_counters();
        }
        for ab in self.active_pfemp1_minor.iter_mut() {
            ab.reset_counters();
        }
        for ab in self.active_pfemp1_major.iter_mut() {
            ab.reset_counters();
        }
    }
}
