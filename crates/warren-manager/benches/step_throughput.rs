//! Step-throughput benchmarks across backends and batch sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use warren_core::ExecMode;
use warren_manager::{Manager, ManagerConfig};
use warren_sim::consts::NUM_AGENTS;

fn manager(exec: ExecMode, num_worlds: u32) -> Manager {
    Manager::new(ManagerConfig {
        exec,
        num_worlds,
        auto_reset: true,
        ..ManagerConfig::default()
    })
    .expect("benchmark config is valid")
}

fn drive_actions(m: &mut Manager) {
    for world in 0..m.num_worlds() {
        for agent in 0..NUM_AGENTS {
            m.set_action(world, agent, 3, 1, 3, 0);
        }
    }
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");
    for &num_worlds in &[16u32, 64, 256] {
        group.throughput(Throughput::Elements(u64::from(num_worlds)));

        let mut m = manager(ExecMode::Threaded { num_workers: None }, num_worlds);
        drive_actions(&mut m);
        group.bench_with_input(
            BenchmarkId::new("threaded", num_worlds),
            &num_worlds,
            |b, _| b.iter(|| m.step()),
        );

        let mut m = manager(ExecMode::Batched { device_index: 0 }, num_worlds);
        drive_actions(&mut m);
        group.bench_with_input(
            BenchmarkId::new("batched", num_worlds),
            &num_worlds,
            |b, _| b.iter(|| m.step()),
        );
    }
    group.finish();
}

fn bench_tensor_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("tensor_read");
    let m = manager(ExecMode::Threaded { num_workers: None }, 64);
    group.bench_function("lidar_host_view", |b| {
        b.iter(|| m.lidar_tensor().f32().len())
    });
    let m = manager(ExecMode::Batched { device_index: 0 }, 64);
    group.bench_function("lidar_device_copy", |b| {
        b.iter(|| m.lidar_tensor().f32().len())
    });
    group.finish();
}

criterion_group!(benches, bench_step, bench_tensor_read);
criterion_main!(benches);
