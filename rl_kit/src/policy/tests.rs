//! Policy tests on `Autodiff<NdArray>` with small MLPs.
//!
//! Test categories:
//! 1. Action selection (eval determinism, exploration, clamping)
//! 2. Learning (online changes, shadow untouched, target selection)
//! 3. Syncing and the provided `update`
//! 4. Exploration and configuration validation

use burn::backend::{Autodiff, NdArray};
use burn::optim::{AdamConfig, Optimizer};
use burn::tensor::backend::Backend;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::*;
use crate::algorithms::ValueFunction;
use crate::config::{DdpgConfig, DqnConfig};
use crate::core::batch::{to_vec, Batch, BatchInput, RewardScale};
use crate::core::target_network::{parameter_distance, NetworkSlot};
use crate::core::transition::Transition;
use crate::error::RlError;

type B = Autodiff<NdArray<f32>>;
type QNet = Mlp<B>;
type Actor = MlpActor<B>;
type Critic = MlpCritic<B>;

const OBS_DIM: usize = 3;
const N_ACTIONS: usize = 2;
const ACT_DIM: usize = 2;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn device() -> <B as Backend>::Device {
    Default::default()
}

fn dqn(config: DqnConfig) -> DqnPolicy<B, QNet, impl Optimizer<QNet, B>> {
    DqnPolicy::new(
        |d| QNet::new(OBS_DIM, 16, N_ACTIONS, d),
        AdamConfig::new().init::<B, QNet>(),
        N_ACTIONS,
        config,
        &device(),
    )
    .unwrap()
}

fn ddpg(
    config: DdpgConfig,
) -> DdpgPolicy<B, Actor, Critic, impl Optimizer<Actor, B>, impl Optimizer<Critic, B>> {
    DdpgPolicy::new(
        |d| Actor::new(OBS_DIM, 16, ACT_DIM, d),
        |d| Critic::new(OBS_DIM, ACT_DIM, 16, d),
        AdamConfig::new().init::<B, Actor>(),
        AdamConfig::new().init::<B, Critic>(),
        config,
        &device(),
    )
    .unwrap()
}

fn observation(i: usize) -> Vec<f32> {
    let x = i as f32 * 0.1;
    vec![x, 1.0 - x, 0.5]
}

fn discrete_batch(n: usize) -> Batch {
    let ts: Vec<Transition> = (0..n)
        .map(|i| {
            let reward = if i % 2 == 0 { 1.0 } else { -1.0 };
            Transition::new_discrete(observation(i), (i % N_ACTIONS) as u32, reward, observation(i + 1), i % 4 == 3)
        })
        .collect();
    Batch::from_transitions(ts.iter().enumerate()).unwrap()
}

fn continuous_batch(n: usize) -> Batch {
    let ts: Vec<Transition> = (0..n)
        .map(|i| {
            let a = (i as f32 * 0.3).sin();
            Transition::new_continuous(observation(i), vec![a, -a], a, observation(i + 1), i % 5 == 4)
        })
        .collect();
    Batch::from_transitions(ts.iter().enumerate()).unwrap()
}

// =============================================================================
// DQN
// =============================================================================

mod dqn_tests {
    use super::*;

    #[test]
    fn eval_mode_should_be_greedy_and_deterministic() {
        let mut policy = dqn(DqnConfig::new().with_epsilon(1.0));
        policy.eval();

        let obs = observation(3);
        let q = policy.q_values(&obs).unwrap();
        let greedy = if q[1] > q[0] { 1 } else { 0 };

        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = policy.act(&obs, None, &mut rng).unwrap();
            assert_eq!(out.action, Action::Discrete(greedy));
            assert!(out.state.is_none());
        }
    }

    #[test]
    fn full_epsilon_should_explore_every_action() {
        let policy = dqn(DqnConfig::new().with_epsilon(1.0));
        let mut rng = StdRng::seed_from_u64(0);
        let mut seen = [false; N_ACTIONS];

        for _ in 0..100 {
            let action = policy.act(&observation(0), None, &mut rng).unwrap().action;
            let a = action.discrete().unwrap() as usize;
            assert!(a < N_ACTIONS);
            seen[a] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn zero_epsilon_train_mode_should_be_greedy() {
        let policy = dqn(DqnConfig::new().with_epsilon(0.0));
        let mut rng = StdRng::seed_from_u64(1);

        let first = policy.act(&observation(2), None, &mut rng).unwrap();
        for _ in 0..10 {
            assert_eq!(policy.act(&observation(2), None, &mut rng).unwrap(), first);
        }
    }

    #[test]
    fn learn_should_change_online_and_leave_shadow() {
        let mut policy = dqn(DqnConfig::new().with_learning_rate(1e-3));
        let online_before = policy.model().online().clone();
        let shadow_before = policy.model().shadow().clone();

        let metrics = policy.learn(&discrete_batch(8)).unwrap();
        assert!(metrics.get("loss").unwrap().is_finite());

        let online_moved = parameter_distance::<B, QNet>(&online_before, policy.model().online()).unwrap();
        let shadow_moved = parameter_distance::<B, QNet>(&shadow_before, policy.model().shadow()).unwrap();
        assert!(online_moved > 0.0);
        assert_eq!(shadow_moved, 0.0);
    }

    #[test]
    fn learn_should_use_processor_returns_as_target() {
        let mut policy = dqn(DqnConfig::new());
        let mut batch = discrete_batch(8);

        // targets equal to the current Q(s, a) give zero loss
        let returns: Vec<f32> = (0..batch.len())
            .map(|row| {
                let q = policy.q_values(batch.observation(row).unwrap()).unwrap();
                q[batch.actions[row].discrete().unwrap() as usize]
            })
            .collect();
        batch.set_returns(returns).unwrap();

        let metrics = policy.learn(&batch).unwrap();
        assert!(metrics.get("loss").unwrap() < 1e-8);
    }

    #[test]
    fn repeated_learning_should_fit_fixed_targets() {
        let mut policy = dqn(DqnConfig::new().with_learning_rate(1e-2));
        let batch = discrete_batch(8).with_returns(vec![1.0; 8]).unwrap();

        let first = policy.learn(&batch).unwrap().get("loss").unwrap();
        let mut last = first;
        for _ in 0..100 {
            last = policy.learn(&batch).unwrap().get("loss").unwrap();
        }
        assert!(last < first, "loss should decrease: {} -> {}", first, last);
    }

    #[test]
    fn sync_should_copy_online_exactly() {
        let mut policy = dqn(DqnConfig::new().with_learning_rate(1e-3));
        policy.learn(&discrete_batch(8)).unwrap();

        policy.sync_weights().unwrap();
        let distance = parameter_distance::<B, QNet>(policy.model().online(), policy.model().shadow()).unwrap();
        assert_eq!(distance, 0.0);
        assert_eq!(policy.model().sync_count(), 1);
    }

    #[test]
    fn update_should_not_sync_on_its_own() {
        let mut policy = dqn(DqnConfig::new().with_learning_rate(1e-3));
        assert!(!policy.syncs_after_learn());

        policy.update(&discrete_batch(8)).unwrap();
        assert_eq!(policy.model().sync_count(), 0);
    }

    #[test]
    fn bootstrap_values_should_be_max_q() {
        let policy = dqn(DqnConfig::new());
        let obs: Vec<f32> = (0..4).flat_map(observation).collect();

        let values = policy.bootstrap_values(&obs, 4, NetworkSlot::Online).unwrap();
        assert_eq!(values.len(), 4);
        for (i, v) in values.iter().enumerate() {
            let q = policy.q_values(&observation(i)).unwrap();
            let max = q.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            assert!((v - max).abs() < 1e-5);
        }
    }

    #[test]
    fn learn_should_reject_continuous_batch() {
        let mut policy = dqn(DqnConfig::new());
        let err = policy.learn(&continuous_batch(4)).unwrap_err();
        assert!(matches!(err, RlError::ActionMismatch { .. }));
    }

    #[test]
    fn learn_should_reject_empty_batch() {
        let mut policy = dqn(DqnConfig::new());
        assert!(matches!(
            policy.learn(&Batch::default()),
            Err(RlError::InsufficientData { .. })
        ));
    }

    #[test]
    fn invalid_configuration_should_fail() {
        let result = DqnPolicy::new(
            |d| QNet::new(OBS_DIM, 8, N_ACTIONS, d),
            AdamConfig::new().init::<B, QNet>(),
            N_ACTIONS,
            DqnConfig::new().with_gamma(1.5),
            &device(),
        );
        assert!(result.is_err());

        let result = DqnPolicy::new(
            |d| QNet::new(OBS_DIM, 8, N_ACTIONS, d),
            AdamConfig::new().init::<B, QNet>(),
            0,
            DqnConfig::new(),
            &device(),
        );
        assert!(result.is_err());
    }
}

// =============================================================================
// DDPG
// =============================================================================

mod ddpg_tests {
    use super::*;

    fn actions_of(policy: &impl Policy, obs: &[f32], seed: u64) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        policy.act(obs, None, &mut rng).unwrap().action.continuous().unwrap().to_vec()
    }

    #[test]
    fn eval_mode_should_be_noise_free() {
        let mut policy = ddpg(DdpgConfig::new().with_exploration_noise(1.0));
        policy.eval();

        let a = actions_of(&policy, &observation(1), 1);
        let b = actions_of(&policy, &observation(1), 2);
        assert_eq!(a, b);
        assert_eq!(a.len(), ACT_DIM);
    }

    #[test]
    fn train_mode_should_add_noise() {
        let policy = ddpg(DdpgConfig::new().with_exploration_noise(0.5));

        let a = actions_of(&policy, &observation(1), 1);
        let b = actions_of(&policy, &observation(1), 2);
        assert_ne!(a, b);
    }

    #[test]
    fn actions_should_respect_action_range() {
        let policy = ddpg(
            DdpgConfig::new()
                .with_exploration_noise(10.0)
                .with_action_range(-0.5, 0.5),
        );

        for seed in 0..20 {
            let action = actions_of(&policy, &observation(seed as usize), seed);
            assert!(action.iter().all(|a| (-0.5..=0.5).contains(a)));
        }
    }

    #[test]
    fn learn_should_report_both_losses_and_leave_shadows() {
        let mut policy = ddpg(DdpgConfig::new());
        let actor_shadow = policy.actor().shadow().clone();
        let critic_shadow = policy.critic().shadow().clone();
        let critic_online = policy.critic().online().clone();

        let metrics = policy.learn(&continuous_batch(8)).unwrap();
        assert!(metrics.get("loss/actor").unwrap().is_finite());
        assert!(metrics.get("loss/critic").unwrap().is_finite());
        assert_eq!(metrics.len(), 2);

        assert_eq!(parameter_distance::<B, Actor>(&actor_shadow, policy.actor().shadow()).unwrap(), 0.0);
        assert_eq!(parameter_distance::<B, Critic>(&critic_shadow, policy.critic().shadow()).unwrap(), 0.0);
        assert!(parameter_distance::<B, Critic>(&critic_online, policy.critic().online()).unwrap() > 0.0);
    }

    #[test]
    fn update_should_soft_sync_both_networks() {
        let mut policy = ddpg(DdpgConfig::new().with_tau(0.5));
        assert!(policy.syncs_after_learn());
        let critic_shadow = policy.critic().shadow().clone();

        policy.update(&continuous_batch(8)).unwrap();

        assert_eq!(policy.actor().sync_count(), 1);
        assert_eq!(policy.critic().sync_count(), 1);
        assert!(parameter_distance::<B, Critic>(&critic_shadow, policy.critic().shadow()).unwrap() > 0.0);
    }

    #[test]
    fn sync_should_shrink_shadow_drift() {
        let mut policy = ddpg(DdpgConfig::new().with_tau(0.1));
        policy.learn(&continuous_batch(8)).unwrap();

        let before = policy.shadow_drift(DdpgModel::Critic).unwrap();
        assert!(before > 0.0);
        policy.sync_weights().unwrap();
        let after = policy.shadow_drift(DdpgModel::Critic).unwrap();
        assert!(after < before, "drift should shrink: {} -> {}", before, after);
        assert!(policy.shadow_drift(DdpgModel::Actor).unwrap() >= 0.0);
    }

    /// Critic output for the batch rows: a zero-loss target.
    fn critic_q<OA, OC>(policy: &DdpgPolicy<B, Actor, Critic, OA, OC>, batch: &Batch) -> Vec<f32>
    where
        OA: Optimizer<Actor, B>,
        OC: Optimizer<Critic, B>,
    {
        let obs = batch.input_tensor::<B>(BatchInput::Obs, &device());
        let actions = batch.actions_tensor::<B>(&device()).unwrap();
        to_vec(policy.critic().online().forward(obs, actions)).unwrap()
    }

    #[test]
    fn learn_should_use_returns_when_present() {
        let mut policy = ddpg(DdpgConfig::new().with_reward_normalization(false));
        let batch = continuous_batch(6);

        let q = critic_q(&policy, &batch);
        let batch = batch.with_returns(q).unwrap();

        let metrics = policy.learn(&batch).unwrap();
        assert!(metrics.get("loss/critic").unwrap() < 1e-8);
    }

    #[test]
    fn learn_should_reject_raw_returns_when_normalizing() {
        let mut policy = ddpg(DdpgConfig::new().with_reward_normalization(true));
        let batch = continuous_batch(6);
        let critic_online = policy.critic().online().clone();

        let q = critic_q(&policy, &batch);
        let batch = batch.with_returns(q).unwrap();

        assert!(matches!(policy.learn(&batch), Err(RlError::Pipeline(_))));
        assert_eq!(parameter_distance::<B, Critic>(&critic_online, policy.critic().online()).unwrap(), 0.0);
    }

    #[test]
    fn learn_should_accept_returns_of_normalized_rewards() {
        let mut policy = ddpg(DdpgConfig::new().with_reward_normalization(true));
        let mut batch = continuous_batch(6);
        batch.reward_scale = Some(RewardScale::from_rewards(&batch.rewards, f32::EPSILON));

        let q = critic_q(&policy, &batch);
        let batch = batch.with_returns(q).unwrap();

        let metrics = policy.learn(&batch).unwrap();
        assert!(metrics.get("loss/critic").unwrap() < 1e-8);
    }

    #[test]
    fn bootstrap_values_should_return_one_per_observation() {
        let policy = ddpg(DdpgConfig::new());
        let obs: Vec<f32> = (0..5).flat_map(observation).collect();

        let shadow = policy.bootstrap_values(&obs, 5, NetworkSlot::Shadow).unwrap();
        let online = policy.bootstrap_values(&obs, 5, NetworkSlot::Online).unwrap();
        assert_eq!(shadow.len(), 5);
        // freshly built: shadow is a copy of online
        for (s, o) in shadow.iter().zip(&online) {
            assert!((s - o).abs() < 1e-6);
        }
    }

    #[test]
    fn learn_should_reject_discrete_batch() {
        let mut policy = ddpg(DdpgConfig::new());
        assert!(matches!(
            policy.learn(&discrete_batch(4)),
            Err(RlError::ActionMismatch { .. })
        ));
    }

    #[test]
    fn exploration_should_reject_negative_noise() {
        let mut policy = ddpg(DdpgConfig::new());
        assert!(policy.set_exploration(-0.1).is_err());
        assert_eq!(policy.exploration(), 0.1);
        policy.set_exploration(0.0).unwrap();
        assert_eq!(policy.exploration(), 0.0);
    }
}

// =============================================================================
// MODE AND METRICS
// =============================================================================

mod common_tests {
    use super::*;

    #[test]
    fn mode_should_toggle_explicitly() {
        let mut policy = dqn(DqnConfig::new());
        assert_eq!(policy.mode(), Mode::Train);
        policy.eval();
        assert_eq!(policy.mode(), Mode::Eval);
        policy.set_mode(Mode::Train);
        assert_eq!(policy.mode(), Mode::Train);
    }

    #[test]
    fn dqn_exploration_should_reject_negative_epsilon() {
        let mut policy = dqn(DqnConfig::new());
        assert!(policy.set_exploration(-1.0).is_err());
        policy.set_exploration(0.5).unwrap();
        assert_eq!(policy.exploration(), 0.5);
    }

    #[test]
    fn learn_metrics_should_display_sorted() {
        let metrics = LearnMetrics::new().with("loss/critic", 0.5).with("loss/actor", -1.0);
        assert_eq!(metrics.to_string(), "loss/actor=-1.0000 loss/critic=0.5000");
        assert_eq!(metrics.get("missing"), None);
    }
}
