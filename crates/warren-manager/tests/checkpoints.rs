//! Checkpoint save/load through the flag protocol and the host blob
//! path.

use warren_core::ExecMode;
use warren_manager::{Manager, ManagerConfig};
use warren_sim::checkpoint::CHECKPOINT_BYTES;
use warren_sim::consts::NUM_AGENTS;

fn manager(num_worlds: u32) -> Manager {
    Manager::new(ManagerConfig {
        exec: ExecMode::Threaded { num_workers: Some(2) },
        num_worlds,
        ..ManagerConfig::default()
    })
    .unwrap()
}

/// Everything a trainer can observe about one world, for exact-resume
/// comparisons.
fn world_snapshot(m: &Manager, world: usize) -> (Vec<f32>, Vec<f32>, Vec<i32>, Vec<i32>) {
    let slice_f = |t: warren_exec::Tensor<'_>| {
        let per_world = t.elem_count() / m.num_worlds() as usize;
        t.f32()[world * per_world..(world + 1) * per_world].to_vec()
    };
    let slice_i = |t: warren_exec::Tensor<'_>| {
        let per_world = t.elem_count() / m.num_worlds() as usize;
        t.i32()[world * per_world..(world + 1) * per_world].to_vec()
    };
    (
        slice_f(m.self_observation_tensor()),
        slice_f(m.reward_tensor()),
        slice_i(m.done_tensor()),
        slice_i(m.steps_remaining_tensor()),
    )
}

fn churn(m: &mut Manager, ticks: usize) {
    for world in 0..m.num_worlds() {
        for agent in 0..NUM_AGENTS {
            m.set_action(world, agent, 3, 1, 4, 0);
        }
    }
    for _ in 0..ticks {
        m.step();
    }
}

// ── Round trips ─────────────────────────────────────────────────

#[test]
fn load_restores_the_saved_tick_exactly() {
    let mut m = manager(2);
    m.set_save_checkpoint(0, true);
    churn(&mut m, 1);
    // Save is level-triggered: the blob now matches this tick.
    let saved = world_snapshot(&m, 0);
    m.set_save_checkpoint(0, false);

    churn(&mut m, 4);
    assert_ne!(saved, world_snapshot(&m, 0), "state must have moved on");

    m.trigger_load_checkpoint(0);
    let metrics = m.step();
    assert_eq!(metrics.checkpoints_loaded, 1);
    assert_eq!(saved, world_snapshot(&m, 0));
}

#[test]
fn save_flag_stays_in_force_until_cleared() {
    let mut m = manager(1);
    m.set_save_checkpoint(0, true);
    let mut metrics = m.step();
    assert_eq!(metrics.checkpoints_saved, 1);
    // Still set: saves again without re-arming.
    metrics = m.step();
    assert_eq!(metrics.checkpoints_saved, 1);
    assert_eq!(m.checkpoint_save_tensor().i32().as_ref(), &[1]);

    m.set_save_checkpoint(0, false);
    metrics = m.step();
    assert_eq!(metrics.checkpoints_saved, 0);
}

#[test]
fn blobs_move_between_worlds_through_the_host_path() {
    let mut m = manager(3);
    m.set_save_checkpoint(0, true);
    churn(&mut m, 2);
    let saved = world_snapshot(&m, 0);
    let blob =
        m.checkpoint_tensor().u8()[..CHECKPOINT_BYTES].to_vec();

    m.write_checkpoint(2, &blob);
    m.trigger_load_checkpoint(2);
    m.step();

    // World 2 resumed world 0's saved state; steps and observations
    // match the snapshot.
    let restored = world_snapshot(&m, 2);
    assert_eq!(saved.0, restored.0);
    assert_eq!(saved.3, restored.3);
}

// ── Degenerate inputs ───────────────────────────────────────────

#[test]
fn invalid_blob_skips_the_restore_and_is_counted() {
    let mut m = manager(2);
    let before = world_snapshot(&m, 0);
    m.write_checkpoint(0, &[0xAB; CHECKPOINT_BYTES]);
    m.trigger_load_checkpoint(0);

    let metrics = m.step();
    assert_eq!(metrics.checkpoint_load_failures, 1);
    assert_eq!(metrics.checkpoints_loaded, 0);
    // The world advanced normally instead.
    assert_eq!(metrics.worlds_advanced, 2);
    let after = world_snapshot(&m, 0);
    assert_eq!(after.3[0], before.3[0] - 1, "steps must have advanced");
    // Consumed despite the failure.
    assert_eq!(m.checkpoint_reset_tensor().i32().as_ref(), &[0, 0]);
}

#[test]
fn reset_wins_over_a_simultaneous_load() {
    let mut m = manager(1);
    m.set_save_checkpoint(0, true);
    churn(&mut m, 3);
    m.set_save_checkpoint(0, false);

    m.trigger_load_checkpoint(0);
    m.trigger_reset(0);
    let metrics = m.step();
    assert_eq!(metrics.worlds_reset, 1);
    assert_eq!(metrics.checkpoints_loaded, 0);
    // The losing load flag is still consumed.
    assert_eq!(m.checkpoint_reset_tensor().i32().as_ref(), &[0]);
}

#[test]
#[should_panic(expected = "checkpoint blob")]
fn wrong_sized_blob_panics() {
    let mut m = manager(1);
    m.write_checkpoint(0, &[0u8; 16]);
}
