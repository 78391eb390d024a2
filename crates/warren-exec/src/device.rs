//! The software device model backing the batched executor.
//!
//! # Design
//!
//! A [`Device`] is a registry of typed allocations identified by stable
//! [`DeviceBuffer`] handles, standing in for accelerator memory: buffers
//! never move, never resize, and are never freed before the device drops.
//! Host-initiated reads and writes are explicit copies with synchronous
//! semantics; device-to-device copies and the batched tick run as ops on
//! a [`Stream`](crate::Stream) and are ordered only relative to that
//! stream.
//!
//! # Ownership model
//!
//! Each allocation sits behind its own lock, so a tick op holding every
//! export lane and a host read of a single buffer serialize against each
//! other without a device-wide lock on the hot path.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use warren_core::Dtype;

/// Recover the guard from a poisoned lock. Poisoning only records that
/// some thread panicked while holding the lock; the data is still
/// structurally valid.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to one device allocation.
///
/// Copyable and stable for the device's lifetime. A handle is only
/// meaningful on the device that allocated it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceBuffer {
    device: u32,
    slot: usize,
    dtype: Dtype,
    len: usize,
}

impl DeviceBuffer {
    /// Index of the device this buffer lives on.
    pub fn device_index(&self) -> u32 {
        self.device
    }

    /// Element type of the allocation.
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// Element count of the allocation.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the allocation holds zero elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

enum Cell {
    F32(Arc<Mutex<Vec<f32>>>),
    I32(Arc<Mutex<Vec<i32>>>),
    U8(Arc<Mutex<Vec<u8>>>),
}

/// One software device: a slab of typed, zero-initialized allocations.
pub struct Device {
    index: u32,
    cells: Mutex<Vec<Cell>>,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("index", &self.index)
            .field("allocations", &lock(&self.cells).len())
            .finish()
    }
}

impl Device {
    /// Create device `index` with no allocations.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            cells: Mutex::new(Vec::new()),
        }
    }

    /// This device's index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Allocate `len` zeroed f32 elements.
    pub fn alloc_f32(&self, len: usize) -> DeviceBuffer {
        self.alloc(Cell::F32(Arc::new(Mutex::new(vec![0.0; len]))), Dtype::F32, len)
    }

    /// Allocate `len` zeroed i32 elements.
    pub fn alloc_i32(&self, len: usize) -> DeviceBuffer {
        self.alloc(Cell::I32(Arc::new(Mutex::new(vec![0; len]))), Dtype::I32, len)
    }

    /// Allocate `len` zeroed bytes.
    pub fn alloc_u8(&self, len: usize) -> DeviceBuffer {
        self.alloc(Cell::U8(Arc::new(Mutex::new(vec![0; len]))), Dtype::U8, len)
    }

    fn alloc(&self, cell: Cell, dtype: Dtype, len: usize) -> DeviceBuffer {
        let mut cells = lock(&self.cells);
        cells.push(cell);
        DeviceBuffer {
            device: self.index,
            slot: cells.len() - 1,
            dtype,
            len,
        }
    }

    /// Copy the whole buffer out to host memory.
    ///
    /// # Panics
    ///
    /// Panics if `buf` belongs to another device or is not f32.
    pub fn read_f32(&self, buf: DeviceBuffer) -> Vec<f32> {
        lock(&self.cell_f32(buf)).clone()
    }

    /// Copy the whole buffer out to host memory.
    ///
    /// # Panics
    ///
    /// Panics if `buf` belongs to another device or is not i32.
    pub fn read_i32(&self, buf: DeviceBuffer) -> Vec<i32> {
        lock(&self.cell_i32(buf)).clone()
    }

    /// Copy the whole buffer out to host memory.
    ///
    /// # Panics
    ///
    /// Panics if `buf` belongs to another device or is not u8.
    pub fn read_u8(&self, buf: DeviceBuffer) -> Vec<u8> {
        lock(&self.cell_u8(buf)).clone()
    }

    /// Synchronous host write of `values` at `offset` elements.
    ///
    /// # Panics
    ///
    /// Panics if `buf` belongs to another device, is not f32, or the
    /// write overruns the allocation.
    pub fn write_f32(&self, buf: DeviceBuffer, offset: usize, values: &[f32]) {
        lock(&self.cell_f32(buf))[offset..offset + values.len()].copy_from_slice(values);
    }

    /// Synchronous host write of `values` at `offset` elements.
    ///
    /// # Panics
    ///
    /// Panics if `buf` belongs to another device, is not i32, or the
    /// write overruns the allocation.
    pub fn write_i32(&self, buf: DeviceBuffer, offset: usize, values: &[i32]) {
        lock(&self.cell_i32(buf))[offset..offset + values.len()].copy_from_slice(values);
    }

    /// Synchronous host write of `values` at `offset` elements.
    ///
    /// # Panics
    ///
    /// Panics if `buf` belongs to another device, is not u8, or the
    /// write overruns the allocation.
    pub fn write_u8(&self, buf: DeviceBuffer, offset: usize, values: &[u8]) {
        lock(&self.cell_u8(buf))[offset..offset + values.len()].copy_from_slice(values);
    }

    /// Device-to-device copy of the whole of `src` into `dst`.
    ///
    /// Copying a buffer onto itself is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if either buffer belongs to another device, or the dtypes
    /// or lengths differ. Rollout validation checks these before any op
    /// is enqueued; hitting this panic means a handle was forged.
    pub fn copy(&self, src: DeviceBuffer, dst: DeviceBuffer) {
        assert_eq!(
            src.dtype, dst.dtype,
            "device copy dtype mismatch: {} -> {}",
            src.dtype, dst.dtype
        );
        assert_eq!(
            src.len, dst.len,
            "device copy length mismatch: {} -> {}",
            src.len, dst.len
        );
        if src == dst {
            return;
        }
        match src.dtype {
            Dtype::F32 => {
                let tmp = self.read_f32(src);
                lock(&self.cell_f32(dst)).copy_from_slice(&tmp);
            }
            Dtype::I32 => {
                let tmp = self.read_i32(src);
                lock(&self.cell_i32(dst)).copy_from_slice(&tmp);
            }
            Dtype::U8 => {
                let tmp = self.read_u8(src);
                lock(&self.cell_u8(dst)).copy_from_slice(&tmp);
            }
        }
    }

    pub(crate) fn cell_f32(&self, buf: DeviceBuffer) -> Arc<Mutex<Vec<f32>>> {
        match &lock(&self.cells)[self.checked_slot(buf)] {
            Cell::F32(c) => Arc::clone(c),
            _ => panic!("device buffer slot {} is {}, not f32", buf.slot, buf.dtype),
        }
    }

    pub(crate) fn cell_i32(&self, buf: DeviceBuffer) -> Arc<Mutex<Vec<i32>>> {
        match &lock(&self.cells)[self.checked_slot(buf)] {
            Cell::I32(c) => Arc::clone(c),
            _ => panic!("device buffer slot {} is {}, not i32", buf.slot, buf.dtype),
        }
    }

    pub(crate) fn cell_u8(&self, buf: DeviceBuffer) -> Arc<Mutex<Vec<u8>>> {
        match &lock(&self.cells)[self.checked_slot(buf)] {
            Cell::U8(c) => Arc::clone(c),
            _ => panic!("device buffer slot {} is {}, not u8", buf.slot, buf.dtype),
        }
    }

    fn checked_slot(&self, buf: DeviceBuffer) -> usize {
        assert_eq!(
            buf.device, self.index,
            "buffer belongs to device {}, not device {}",
            buf.device, self.index
        );
        buf.slot
    }
}
