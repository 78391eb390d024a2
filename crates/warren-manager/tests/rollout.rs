//! The accelerated rollout transfer path end to end.

use warren_core::{Dtype, ExecMode, ExportId};
use warren_exec::{Device, ExecError, RolloutBuffers, Stream};
use warren_manager::{Manager, ManagerConfig, ManagerError};
use warren_sim::{ExportSchema, SCHEMA_VERSION};

fn batched(num_worlds: u32) -> Manager {
    Manager::new(ManagerConfig {
        exec: ExecMode::Batched { device_index: 0 },
        num_worlds,
        ..ManagerConfig::default()
    })
    .unwrap()
}

fn buffers_for(m: &Manager) -> RolloutBuffers {
    let dev = m.device().expect("batched manager has a device");
    let schema = m.schema();
    let alloc = |id: ExportId| match schema.dtype(id) {
        Dtype::F32 => dev.alloc_f32(schema.elems(id)),
        Dtype::I32 => dev.alloc_i32(schema.elems(id)),
        Dtype::U8 => dev.alloc_u8(schema.elems(id)),
    };
    RolloutBuffers {
        actions: alloc(ExportId::Action),
        resets: alloc(ExportId::Reset),
        rewards: alloc(ExportId::Reward),
        dones: alloc(ExportId::Done),
        policy_assignments: None,
        observations: ExportSchema::OBSERVATIONS.iter().map(|&id| alloc(id)).collect(),
        stats: Vec::new(),
        schema_version: SCHEMA_VERSION,
    }
}

#[test]
fn rollout_outputs_equal_the_exported_tensors() {
    let mut m = batched(3);
    let stream = Stream::new();
    let bufs = buffers_for(&m);

    m.rollout_step(&stream, &bufs).unwrap();
    stream.synchronize();

    let dev = m.device().unwrap();
    assert_eq!(
        dev.read_f32(bufs.rewards),
        m.reward_tensor().f32().into_owned()
    );
    assert_eq!(dev.read_i32(bufs.dones), m.done_tensor().i32().into_owned());
    for (id, &buf) in ExportSchema::OBSERVATIONS.iter().zip(&bufs.observations) {
        match m.schema().dtype(*id) {
            Dtype::F32 => assert_eq!(
                dev.read_f32(buf),
                m.train_interface().observations[observation_key(*id)]
                    .f32()
                    .into_owned(),
                "slot {id}"
            ),
            Dtype::I32 => assert_eq!(
                dev.read_i32(buf),
                m.train_interface().observations[observation_key(*id)]
                    .i32()
                    .into_owned(),
                "slot {id}"
            ),
            Dtype::U8 => unreachable!("no u8 observation slots"),
        }
    }
}

fn observation_key(id: ExportId) -> &'static str {
    match id {
        ExportId::SelfObservation => "self",
        ExportId::PartnerObservations => "partners",
        ExportId::RoomEntityObservations => "room_entities",
        ExportId::DoorObservation => "door",
        ExportId::Lidar => "lidar",
        ExportId::StepsRemaining => "steps_remaining",
        ExportId::AgentId => "agent_id",
        _ => unreachable!("not an observation slot"),
    }
}

#[test]
fn rollout_ticks_advance_the_worlds() {
    let mut m = batched(2);
    let stream = Stream::new();
    let bufs = buffers_for(&m);

    let before = m.steps_remaining_tensor().i32().into_owned();
    // Several enqueued steps retire in order behind one fence.
    m.rollout_step(&stream, &bufs).unwrap();
    m.rollout_step(&stream, &bufs).unwrap();
    m.rollout_step(&stream, &bufs).unwrap();
    stream.synchronize();
    let after = m.steps_remaining_tensor().i32().into_owned();
    assert!(after.iter().zip(&before).all(|(a, b)| *a == b - 3));
}

#[test]
fn rollout_resets_apply_on_the_enqueued_tick() {
    let mut m = batched(2);
    let stream = Stream::new();
    let bufs = buffers_for(&m);
    m.step();

    m.device()
        .unwrap()
        .write_i32(bufs.resets, 0, &[0, 1]);
    m.rollout_step(&stream, &bufs).unwrap();
    stream.synchronize();

    let issued = m.episodes_issued();
    // Two at construction, one for the rollout reset of world 1.
    assert_eq!(issued, 3);
    let steps = m.steps_remaining_tensor().i32().into_owned();
    let row = m.schema().row_elems(ExportId::StepsRemaining);
    assert!(steps[row..].iter().all(|&s| s == steps[row]));
    assert_eq!(steps[0], steps[row] - 2, "world 0 advanced twice instead");
}

#[test]
fn threaded_backend_rejects_rollout() {
    let mut m = Manager::new(ManagerConfig {
        exec: ExecMode::Threaded { num_workers: Some(1) },
        num_worlds: 1,
        ..ManagerConfig::default()
    })
    .unwrap();
    assert!(m.device().is_none());

    // Buffers on a scratch device; the call must fail before touching
    // them.
    let dev = Device::new(0);
    let schema = *m.schema();
    let bufs = RolloutBuffers {
        actions: dev.alloc_i32(schema.elems(ExportId::Action)),
        resets: dev.alloc_i32(schema.elems(ExportId::Reset)),
        rewards: dev.alloc_f32(schema.elems(ExportId::Reward)),
        dones: dev.alloc_i32(schema.elems(ExportId::Done)),
        policy_assignments: None,
        observations: Vec::new(),
        stats: Vec::new(),
        schema_version: SCHEMA_VERSION,
    };
    let stream = Stream::new();
    let err = m.rollout_step(&stream, &bufs).unwrap_err();
    assert!(matches!(
        err,
        ManagerError::Exec(ExecError::RolloutUnsupported)
    ));
}

#[test]
fn validation_failures_enqueue_nothing() {
    let mut m = batched(2);
    let stream = Stream::new();
    let mut bufs = buffers_for(&m);
    bufs.schema_version = SCHEMA_VERSION + 1;

    let before = m.steps_remaining_tensor().i32().into_owned();
    let err = m.rollout_step(&stream, &bufs).unwrap_err();
    assert!(matches!(
        err,
        ManagerError::Exec(ExecError::SchemaVersion { .. })
    ));
    stream.synchronize();
    // No tick ran.
    assert_eq!(m.steps_remaining_tensor().i32().into_owned(), before);
}
