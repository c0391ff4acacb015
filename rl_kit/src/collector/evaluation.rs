//! Periodic policy evaluation.

use rand::Rng;

use super::collector::mean;
use crate::environment::Environment;
use crate::error::Result;
use crate::policy::{Mode, Policy};

/// Outcome of an evaluation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalStats {
    pub steps: usize,
    /// Returns of episodes that finished within the step budget.
    pub episode_returns: Vec<f32>,
    pub episode_lengths: Vec<usize>,
}

impl EvalStats {
    pub fn episodes(&self) -> usize {
        self.episode_returns.len()
    }

    pub fn mean_return(&self) -> Option<f32> {
        mean(self.episode_returns.iter().copied())
    }

    pub fn mean_length(&self) -> Option<f32> {
        mean(self.episode_lengths.iter().map(|&l| l as f32))
    }
}

/// Run `policy` greedily in `env` for `num_timesteps` steps.
///
/// The policy is switched to [`Mode::Eval`] and its previous mode restored
/// afterwards, also when the environment fails. Nothing is stored. The
/// environment is reset first; an episode cut off by the step budget is
/// not reported.
pub fn evaluate<P, E, R>(policy: &mut P, env: &mut E, num_timesteps: usize, rng: &mut R) -> Result<EvalStats>
where
    P: Policy,
    E: Environment,
    R: Rng + ?Sized,
{
    let previous = policy.mode();
    policy.set_mode(Mode::Eval);
    let result = run_episodes(policy, env, num_timesteps, rng);
    policy.set_mode(previous);

    let stats = result?;
    tracing::info!(
        steps = stats.steps,
        episodes = stats.episodes(),
        mean_return = ?stats.mean_return(),
        "evaluation finished"
    );
    Ok(stats)
}

fn run_episodes<P, E, R>(policy: &P, env: &mut E, num_timesteps: usize, rng: &mut R) -> Result<EvalStats>
where
    P: Policy,
    E: Environment,
    R: Rng + ?Sized,
{
    let mut stats = EvalStats::default();
    if num_timesteps == 0 {
        return Ok(stats);
    }

    let mut obs = env.reset()?;
    let mut state: Option<Vec<f32>> = None;
    let mut episode_return = 0.0f32;
    let mut episode_length = 0usize;

    for step_index in 0..num_timesteps {
        let out = policy.act(&obs, state.as_deref(), rng)?;
        let step = env.step(&out.action)?;
        stats.steps += 1;
        episode_return += step.reward;
        episode_length += 1;

        if step.done {
            stats.episode_returns.push(episode_return);
            stats.episode_lengths.push(episode_length);
            episode_return = 0.0;
            episode_length = 0;
            state = None;
            if step_index + 1 < num_timesteps {
                obs = env.reset()?;
            }
        } else {
            obs = step.observation;
            state = out.state;
        }
    }

    Ok(stats)
}
