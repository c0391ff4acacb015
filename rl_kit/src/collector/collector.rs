//! Environment interaction and batch assembly.
//!
//! The collector owns the environment, the policy, the replay buffer and
//! the run's single RNG. Interaction is resumable: the current observation
//! and recurrent state survive between `collect` calls, and the environment
//! is only reset on first use and after an episode ends.
//!
//! ```text
//! collect(n):  obs ──act──> action ──step──> Transition ──add──> buffer
//! next_batch:  buffer ──sample──> Batch ──processors──> training batch
//! ```

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::algorithms::{BatchProcessor, ValueFunction};
use crate::buffers::ReplayBuffer;
use crate::config::CollectorConfig;
use crate::core::batch::Batch;
use crate::core::transition::Transition;
use crate::environment::Environment;
use crate::error::Result;
use crate::policy::{LearnMetrics, Policy};

/// Summary of one `collect` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectStats {
    /// Environment steps taken.
    pub steps: usize,
    /// Episodes that finished during this call.
    pub episodes: usize,
    /// Undiscounted return of each finished episode.
    pub episode_returns: Vec<f32>,
    /// Length of each finished episode.
    pub episode_lengths: Vec<usize>,
}

impl CollectStats {
    pub fn mean_episode_return(&self) -> Option<f32> {
        mean(self.episode_returns.iter().copied())
    }

    pub fn mean_episode_length(&self) -> Option<f32> {
        mean(self.episode_lengths.iter().map(|&l| l as f32))
    }
}

pub(crate) fn mean(values: impl ExactSizeIterator<Item = f32>) -> Option<f32> {
    let n = values.len();
    if n == 0 {
        None
    } else {
        Some(values.sum::<f32>() / n as f32)
    }
}

/// Drives a policy in an environment and feeds the replay buffer.
pub struct Collector<E, P>
where
    E: Environment,
    P: Policy + ValueFunction,
{
    env: E,
    policy: P,
    buffer: ReplayBuffer,
    processors: Vec<Box<dyn BatchProcessor<P>>>,
    rng: StdRng,
    /// Observation to act on next; `None` means the env needs a reset.
    obs: Option<Vec<f32>>,
    /// Recurrent state carried within the current episode.
    state: Option<Vec<f32>>,
    episode_return: f32,
    episode_length: usize,
    step_count: usize,
    episode_count: usize,
}

impl<E, P> Collector<E, P>
where
    E: Environment,
    P: Policy + ValueFunction,
{
    pub fn new(env: E, policy: P, config: CollectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            env,
            policy,
            buffer: ReplayBuffer::new(config.buffer_capacity)?,
            processors: Vec::new(),
            rng: StdRng::seed_from_u64(config.seed),
            obs: None,
            state: None,
            episode_return: 0.0,
            episode_length: 0,
            step_count: 0,
            episode_count: 0,
        })
    }

    /// Register a processor; processors run in registration order.
    pub fn with_processor<T>(mut self, processor: T) -> Self
    where
        T: BatchProcessor<P> + 'static,
    {
        self.add_processor(Box::new(processor));
        self
    }

    pub fn add_processor(&mut self, processor: Box<dyn BatchProcessor<P>>) {
        self.processors.push(processor);
    }

    /// Step the environment `num_timesteps` times, storing every transition.
    ///
    /// Environment errors abort the call and are returned as-is; the
    /// current observation is kept, so no reset happens behind the caller's
    /// back.
    pub fn collect(&mut self, num_timesteps: usize) -> Result<CollectStats> {
        let mut stats = CollectStats::default();

        for _ in 0..num_timesteps {
            let obs = match &self.obs {
                Some(obs) => obs.clone(),
                None => {
                    let obs = self.env.reset()?;
                    self.obs = Some(obs.clone());
                    self.state = None;
                    obs
                }
            };

            let out = self.policy.act(&obs, self.state.as_deref(), &mut self.rng)?;
            let step = self.env.step(&out.action)?;

            self.buffer.add(
                Transition::new(obs, out.action, step.reward, step.observation.clone(), step.done)
                    .with_info(step.info),
            );
            self.step_count += 1;
            self.episode_return += step.reward;
            self.episode_length += 1;
            stats.steps += 1;

            if step.done {
                tracing::debug!(
                    episode = self.episode_count,
                    episode_return = self.episode_return,
                    length = self.episode_length,
                    "episode finished"
                );
                stats.episodes += 1;
                stats.episode_returns.push(self.episode_return);
                stats.episode_lengths.push(self.episode_length);
                self.episode_count += 1;
                self.episode_return = 0.0;
                self.episode_length = 0;
                self.obs = None;
                self.state = None;
            } else {
                self.obs = Some(step.observation);
                self.state = out.state;
            }
        }

        Ok(stats)
    }

    /// Sample a batch and run every registered processor over it.
    pub fn next_batch(&mut self, batch_size: usize) -> Result<Batch> {
        let mut batch = self.buffer.sample(batch_size, &mut self.rng)?;
        for processor in &self.processors {
            batch = processor.process(batch, &self.buffer, &self.policy)?;
            tracing::trace!(processor = processor.name(), "batch processed");
        }
        Ok(batch)
    }

    /// `next_batch` followed by `Policy::update`.
    pub fn train_step(&mut self, batch_size: usize) -> Result<LearnMetrics> {
        let batch = self.next_batch(batch_size)?;
        self.policy.update(&batch)
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    /// Total environment steps across all `collect` calls.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Total finished episodes across all `collect` calls.
    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Mutable policy and the collector RNG together, for evaluation passes.
    pub fn policy_and_rng(&mut self) -> (&mut P, &mut StdRng) {
        (&mut self.policy, &mut self.rng)
    }
}
