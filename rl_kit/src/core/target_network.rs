//! Target network utilities for stable value estimation.
//!
//! Every learnable function a policy owns is held as a [`TargetNetwork`]:
//! an online parameter set trained by gradient descent and a shadow
//! ("old", "target") set used for bootstrap targets. The shadow set is only
//! ever written by the synchronizer in this module.
//!
//! # Soft Updates (Polyak Averaging)
//!
//! ```text
//! θ_shadow = τ * θ_online + (1 - τ) * θ_shadow
//! ```
//!
//! τ = 1 is a hard copy (DQN-style periodic sync); τ in (0, 1) is an
//! exponential moving average (DDPG-style sync after every update).
//!
//! # Usage
//!
//! ```ignore
//! let mut q = TargetNetwork::new(|device| QNetConfig::new(4, 2).init(device), &device);
//! // ... gradient step on q.online() ...
//! q.sync(1.0)?;
//! ```

use std::marker::PhantomData;

use burn::module::{Module, ModuleMapper, Param};
use burn::prelude::*;

use crate::core::batch::to_vec;
use crate::error::{ConfigError, Result};

// ============================================================================
// Parameter mappers
// ============================================================================

/// Collects all float parameters of a module, flattened to 1D.
///
/// Parameters are collected in traversal order, which is deterministic for
/// modules built from the same architecture. This lets two independently
/// initialized instances be matched parameter by parameter.
struct ParamExtractor<B: Backend> {
    params: Vec<Tensor<B, 1>>,
}

impl<B: Backend> ModuleMapper<B> for ParamExtractor<B> {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let val = param.val();
        let total_size: usize = val.dims().iter().product();
        self.params.push(val.reshape([total_size]));
        param
    }
}

fn extract_params<B: Backend, M: Module<B>>(module: &M) -> Vec<Tensor<B, 1>> {
    let mut extractor = ParamExtractor { params: Vec::new() };
    let _ = module.clone().map(&mut extractor);
    extractor.params
}

/// Blends online values into the shadow module, keeping the shadow's ids.
///
/// `tau == None` copies the online values verbatim.
struct BlendMapper<B: Backend> {
    online: Vec<Tensor<B, 1>>,
    tau: Option<f32>,
    index: usize,
}

impl<B: Backend> ModuleMapper<B> for BlendMapper<B> {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let idx = self.index;
        self.index += 1;

        let Some(online) = self.online.get(idx) else {
            // Architectures differ; leave the shadow parameter alone.
            return param;
        };

        let shadow_val = param.val();
        let shape = shadow_val.dims();
        let total_size: usize = shape.iter().product();

        let blended = match self.tau {
            None => online.clone(),
            Some(tau) => {
                online.clone().mul_scalar(tau)
                    + shadow_val.reshape([total_size]).mul_scalar(1.0 - tau)
            }
        };

        Param::initialized(param.id.clone(), blended.reshape(shape).detach())
    }
}

/// Polyak update of `shadow` towards `online`.
///
/// For each parameter: `θ_shadow = τ * θ_online + (1 - τ) * θ_shadow`.
/// Parameters are matched by traversal order, not by id, so the two modules
/// may be independently constructed instances of the same architecture.
/// `tau` is not validated here; [`TargetNetwork::sync`] does that.
pub fn soft_update<B, M>(online: &M, shadow: M, tau: f32) -> M
where
    B: Backend,
    M: Module<B>,
{
    let mut mapper = BlendMapper {
        online: extract_params(online),
        tau: Some(tau),
        index: 0,
    };
    shadow.map(&mut mapper)
}

/// Copy online parameter values into `shadow` bit for bit.
pub fn hard_copy<B, M>(online: &M, shadow: M) -> M
where
    B: Backend,
    M: Module<B>,
{
    let mut mapper = BlendMapper {
        online: extract_params(online),
        tau: None,
        index: 0,
    };
    shadow.map(&mut mapper)
}

/// Sum of absolute element-wise differences between two modules' parameters.
pub fn parameter_distance<B, M>(a: &M, b: &M) -> Result<f32>
where
    B: Backend,
    M: Module<B>,
{
    let mut total = 0.0f32;
    for (pa, pb) in extract_params(a).into_iter().zip(extract_params(b)) {
        let diff = to_vec(pa.sub(pb).abs())?;
        total += diff.iter().sum::<f32>();
    }
    Ok(total)
}

// ============================================================================
// Online / shadow pair
// ============================================================================

/// Which parameter set of a [`TargetNetwork`] to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkSlot {
    /// Parameters trained by the optimizer.
    Online,
    /// Slowly tracking copy used for bootstrap targets.
    Shadow,
}

/// An online module paired with its shadow copy.
#[derive(Debug, Clone)]
pub struct TargetNetwork<B: Backend, M: Module<B>> {
    online: M,
    shadow: M,
    sync_count: usize,
    _backend: PhantomData<B>,
}

impl<B: Backend, M: Module<B>> TargetNetwork<B, M> {
    /// Build both parameter sets from one factory.
    ///
    /// The factory runs twice so online and shadow are distinct owned
    /// instances; the shadow then receives a hard copy of the online values.
    pub fn new<F>(factory: F, device: &B::Device) -> Self
    where
        F: Fn(&B::Device) -> M,
    {
        let online = factory(device);
        let shadow = hard_copy::<B, M>(&online, factory(device));
        Self {
            online,
            shadow,
            sync_count: 0,
            _backend: PhantomData,
        }
    }

    pub fn online(&self) -> &M {
        &self.online
    }

    pub fn shadow(&self) -> &M {
        &self.shadow
    }

    pub fn get(&self, slot: NetworkSlot) -> &M {
        match slot {
            NetworkSlot::Online => &self.online,
            NetworkSlot::Shadow => &self.shadow,
        }
    }

    /// Replace the online module, e.g. with the result of an optimizer step.
    ///
    /// The shadow is untouched.
    pub fn update_online<F>(&mut self, f: F)
    where
        F: FnOnce(M) -> M,
    {
        let online = self.online.clone();
        self.online = f(online);
    }

    /// Move the shadow towards the online parameters.
    ///
    /// `tau` must be in `(0, 1]`; `tau == 1` is an exact copy.
    pub fn sync(&mut self, tau: f32) -> std::result::Result<(), ConfigError> {
        ConfigError::check_unit_interval("tau", tau)?;
        let shadow = self.shadow.clone();
        self.shadow = if tau == 1.0 {
            hard_copy::<B, M>(&self.online, shadow)
        } else {
            soft_update::<B, M>(&self.online, shadow, tau)
        };
        self.sync_count += 1;
        tracing::trace!(tau, sync_count = self.sync_count, "target network synced");
        Ok(())
    }

    /// Number of completed syncs.
    pub fn sync_count(&self) -> usize {
        self.sync_count
    }
}

// ============================================================================
// Sync schedule
// ============================================================================

/// When the caller should trigger target syncs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncSchedule {
    /// Blend with `tau` after every training step.
    Soft { tau: f32 },
    /// Hard copy every `interval` training steps.
    Hard { interval: usize },
}

impl SyncSchedule {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        match *self {
            SyncSchedule::Soft { tau } => ConfigError::check_unit_interval("tau", tau),
            SyncSchedule::Hard { interval } => ConfigError::check_count("interval", interval),
        }
    }

    /// Blend coefficient applied when a sync is due.
    pub fn tau(&self) -> f32 {
        match *self {
            SyncSchedule::Soft { tau } => tau,
            SyncSchedule::Hard { .. } => 1.0,
        }
    }
}

/// Step counter deciding when a [`SyncSchedule`] fires.
#[derive(Debug, Clone)]
pub struct TargetSyncer {
    schedule: SyncSchedule,
    steps: usize,
}

impl TargetSyncer {
    pub fn new(schedule: SyncSchedule) -> std::result::Result<Self, ConfigError> {
        schedule.validate()?;
        Ok(Self { schedule, steps: 0 })
    }

    pub fn soft(tau: f32) -> std::result::Result<Self, ConfigError> {
        Self::new(SyncSchedule::Soft { tau })
    }

    pub fn hard(interval: usize) -> std::result::Result<Self, ConfigError> {
        Self::new(SyncSchedule::Hard { interval })
    }

    /// Count one training step; returns true when a sync is due.
    pub fn tick(&mut self) -> bool {
        self.steps += 1;
        match self.schedule {
            SyncSchedule::Soft { .. } => true,
            SyncSchedule::Hard { interval } => self.steps % interval == 0,
        }
    }

    /// Count one training step and sync `target` if due.
    ///
    /// Returns whether a sync happened; a rejected `tau` is passed through.
    pub fn step<B: Backend, M: Module<B>>(
        &mut self,
        target: &mut TargetNetwork<B, M>,
    ) -> std::result::Result<bool, ConfigError> {
        if !self.tick() {
            return Ok(false);
        }
        target.sync(self.schedule.tau())?;
        Ok(true)
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn reset(&mut self) {
        self.steps = 0;
    }

    pub fn schedule(&self) -> &SyncSchedule {
        &self.schedule
    }
}
