//! Tensor validity and stability guarantees from the moment
//! `Manager::new` returns.

use warren_core::ExecMode;
use warren_manager::{Manager, ManagerConfig, ManagerError};
use warren_sim::consts::{EPISODE_LEN, NUM_AGENTS};

fn manager(num_worlds: u32) -> Manager {
    Manager::new(ManagerConfig {
        exec: ExecMode::Threaded { num_workers: Some(2) },
        num_worlds,
        ..ManagerConfig::default()
    })
    .unwrap()
}

#[test]
fn construction_leaves_every_world_in_a_fresh_episode() {
    let m = manager(4);

    let dones = m.done_tensor();
    assert!(dones.i32().iter().all(|&d| d == 0));

    let steps = m.steps_remaining_tensor();
    assert_eq!(steps.i32().len(), 4 * NUM_AGENTS);
    assert!(steps.i32().iter().all(|&s| s == EPISODE_LEN));

    let rewards = m.reward_tensor();
    assert!(rewards.f32().iter().all(|&r| r == 0.0));

    let ids = m.agent_id_tensor();
    let expected: Vec<i32> = (0..4).flat_map(|_| 0..NUM_AGENTS as i32).collect();
    assert_eq!(ids.i32().as_ref(), expected);

    // One episode id drawn per world, no more.
    assert_eq!(m.episodes_issued(), 4);
}

#[test]
fn observations_are_finite_and_in_range_for_every_world() {
    let m = manager(6);
    for tensor in [
        m.self_observation_tensor(),
        m.partner_observations_tensor(),
        m.room_entity_observations_tensor(),
        m.door_observation_tensor(),
        m.lidar_tensor(),
    ] {
        let data = tensor.f32();
        assert!(!data.is_empty());
        assert!(
            data.iter().all(|v| v.is_finite()),
            "non-finite value in {}",
            tensor.id()
        );
    }
}

#[test]
fn shapes_and_dtypes_are_fixed_across_calls_and_ticks() {
    let mut m = manager(3);
    let record = |m: &Manager| {
        [
            m.reset_tensor(),
            m.action_tensor(),
            m.reward_tensor(),
            m.done_tensor(),
            m.self_observation_tensor(),
            m.partner_observations_tensor(),
            m.room_entity_observations_tensor(),
            m.door_observation_tensor(),
            m.lidar_tensor(),
            m.steps_remaining_tensor(),
            m.agent_id_tensor(),
            m.checkpoint_tensor(),
            m.checkpoint_reset_tensor(),
            m.checkpoint_save_tensor(),
        ]
        .map(|t| (t.id(), t.dtype(), t.shape().clone(), t.elem_count()))
    };

    let before = record(&m);
    // Repeated calls hand out identical descriptors.
    assert_eq!(before, record(&m));
    for _ in 0..5 {
        m.step();
    }
    assert_eq!(before, record(&m));
}

#[test]
fn train_interface_names_follow_the_schema_order() {
    let m = manager(2);
    let ti = m.train_interface();
    let names: Vec<&str> = ti.observations.keys().copied().collect();
    assert_eq!(
        names,
        [
            "self",
            "partners",
            "room_entities",
            "door",
            "lidar",
            "steps_remaining",
            "agent_id"
        ]
    );
    assert!(ti.stats.is_empty());
    assert!(ti.policy_assignments.is_none());
    assert_eq!(ti.schema_version, warren_sim::SCHEMA_VERSION);
    assert_eq!(ti.rewards.elem_count(), 2 * NUM_AGENTS);
}

#[test]
fn invalid_configs_fail_construction() {
    let err = Manager::new(ManagerConfig {
        num_worlds: 0,
        ..ManagerConfig::default()
    })
    .unwrap_err();
    assert!(matches!(err, ManagerError::Config(_)));

    let err = Manager::new(ManagerConfig {
        door_width: f32::NAN,
        ..ManagerConfig::default()
    })
    .unwrap_err();
    assert!(matches!(err, ManagerError::Config(_)));
}
