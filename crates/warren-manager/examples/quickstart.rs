//! Warren quickstart — drive a small batch of worlds by hand.
//!
//! Demonstrates:
//!   1. Configuring and constructing a `Manager`
//!   2. Writing per-agent actions and stepping in lockstep
//!   3. Reading the exported tensors and per-tick metrics
//!   4. The per-world reset and checkpoint flag protocol
//!
//! Run with:
//!   cargo run --example quickstart

use warren_core::ExecMode;
use warren_manager::{Manager, ManagerConfig, ManagerError};
use warren_sim::consts::NUM_AGENTS;

const NUM_WORLDS: u32 = 4;
const TICKS: usize = 20;

fn main() -> Result<(), ManagerError> {
    // ── Construction ────────────────────────────────────────────
    //
    // `new` validates the config, loads the collision assets, resets
    // every world, and runs one tick, so every tensor below is already
    // valid.
    let mut manager = Manager::new(ManagerConfig {
        exec: ExecMode::Threaded { num_workers: Some(2) },
        num_worlds: NUM_WORLDS,
        auto_reset: true,
        ..ManagerConfig::default()
    })?;
    println!("constructed: {manager:?}");

    // ── Drive a short rollout ───────────────────────────────────
    for tick in 0..TICKS {
        for world in 0..NUM_WORLDS {
            for agent in 0..NUM_AGENTS {
                // Full speed ahead, with a gentle turn to spread the
                // agents out.
                let rotate = if agent == 0 { 3 } else { 1 };
                manager.set_action(world, agent, 3, 0, rotate, 0);
            }
        }
        // Checkpoint world 0 halfway so we can rewind to it below.
        if tick == TICKS / 2 {
            manager.set_save_checkpoint(0, true);
        }
        if tick == TICKS / 2 + 1 {
            manager.set_save_checkpoint(0, false);
        }

        let metrics = manager.step();
        if tick % 5 == 0 {
            let rewards = manager.reward_tensor();
            let mean: f32 =
                rewards.f32().iter().sum::<f32>() / rewards.elem_count() as f32;
            println!(
                "tick {tick:>3}: {:>4} advanced, mean reward {mean:+.4}, {} us",
                metrics.worlds_advanced, metrics.total_us
            );
        }
    }

    // ── Rewind world 0 to the checkpoint ────────────────────────
    manager.trigger_load_checkpoint(0);
    let metrics = manager.step();
    println!(
        "rewound world 0 ({} loaded), steps remaining now {}",
        metrics.checkpoints_loaded,
        manager.steps_remaining_tensor().i32()[0]
    );

    // ── Train-facing summary ────────────────────────────────────
    let ti = manager.train_interface();
    println!("observation tensors (schema v{}):", ti.schema_version);
    for (name, tensor) in &ti.observations {
        println!("  {name:<16} {:?} {:?}", tensor.dtype(), tensor.shape());
    }
    println!(
        "episodes issued: {}, total progress: {:.2}",
        manager.episodes_issued(),
        manager.progress_total()
    );
    Ok(())
}
