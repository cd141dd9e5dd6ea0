//! Host emulation of a device executor.
//!
//! [`EmulatedDevice`] keeps "device memory" in a table of host allocations
//! keyed by synthetic addresses and runs each launch block by block with one
//! logical thread per cell, so row tables, strides and out-of-bounds
//! accesses behave as they would on hardware. Blocks of a launch execute on
//! the rayon pool; the launch has fully completed when `launch_step`
//! returns.
//!
//! Every allocation, copy, launch and synchronization is counted in
//! [`DeviceStats`], which is what the engine's resource tests assert on.

use super::{DeviceExecutor, LaunchShape, StepArgs};
use crate::core::{
    error::{DeviceOp, EngineError, Result},
    rule,
};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// First synthetic device address.
const BASE_ADDRESS: u64 = 0x7f00_0000_0000;

/// Allocation granularity of the synthetic address space.
const ALIGNMENT: u64 = 256;

/// Counters of device activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Allocations performed since creation.
    pub allocations: usize,
    /// Allocations not yet freed.
    pub live_allocations: usize,
    /// Highest simultaneous number of live allocations.
    pub peak_allocations: usize,
    /// Bytes currently allocated.
    pub live_bytes: usize,
    /// Host-to-device copies.
    pub host_to_device: usize,
    /// Device-to-host copies.
    pub device_to_host: usize,
    /// Bytes copied to the device.
    pub bytes_to_device: usize,
    /// Bytes copied to the host.
    pub bytes_to_host: usize,
    /// Kernel launches.
    pub launches: usize,
    /// Synchronizations.
    pub synchronizations: usize,
}

#[derive(Debug)]
struct EmulatedMemory {
    allocations: HashMap<u64, Vec<u8>>,
    next_address: u64,
    capacity: Option<usize>,
    stats: DeviceStats,
}

impl EmulatedMemory {
    fn new(capacity: Option<usize>) -> Self {
        Self {
            allocations: HashMap::new(),
            next_address: BASE_ADDRESS,
            capacity,
            stats: DeviceStats::default(),
        }
    }

    fn get(&self, address: u64, op: DeviceOp) -> Result<&[u8]> {
        self.allocations
            .get(&address)
            .map(Vec::as_slice)
            .ok_or_else(|| invalid_address(op, address))
    }

    /// Detaches an allocation so a launch can write it while reading others.
    fn take(&mut self, address: u64) -> Result<Vec<u8>> {
        self.allocations
            .remove(&address)
            .ok_or_else(|| invalid_address(DeviceOp::Launch, address))
    }

    fn restore(&mut self, address: u64, data: Vec<u8>) {
        self.allocations.insert(address, data);
    }
}

fn invalid_address(op: DeviceOp, address: u64) -> EngineError {
    EngineError::device_execution(op, format!("invalid device address {:#x}", address))
}

/// Device memory handle of the [`EmulatedDevice`].
///
/// Dropping the handle frees the allocation.
pub struct EmulatedBuffer {
    address: u64,
    len: usize,
    memory: Arc<Mutex<EmulatedMemory>>,
}

impl EmulatedBuffer {
    /// Synthetic device address.
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the allocation is zero-sized.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for EmulatedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulatedBuffer")
            .field("address", &format_args!("{:#x}", self.address))
            .field("len", &self.len)
            .finish()
    }
}

impl Drop for EmulatedBuffer {
    fn drop(&mut self) {
        let mut memory = self.memory.lock();
        if memory.allocations.remove(&self.address).is_some() {
            memory.stats.live_allocations -= 1;
            memory.stats.live_bytes -= self.len;
        }
    }
}

/// Executor running the generation kernel on the host.
///
/// Clones share the same device memory and counters.
#[derive(Clone)]
pub struct EmulatedDevice {
    memory: Arc<Mutex<EmulatedMemory>>,
}

impl EmulatedDevice {
    /// Creates a device with unbounded memory.
    pub fn new() -> Self {
        Self {
            memory: Arc::new(Mutex::new(EmulatedMemory::new(None))),
        }
    }

    /// Creates a device whose allocations fail beyond `bytes` live bytes.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            memory: Arc::new(Mutex::new(EmulatedMemory::new(Some(bytes)))),
        }
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> DeviceStats {
        self.memory.lock().stats
    }

    /// Number of allocations not yet freed.
    pub fn live_allocations(&self) -> usize {
        self.memory.lock().stats.live_allocations
    }

    /// Resets all counters except the live allocation figures.
    pub fn reset_stats(&self) {
        let mut memory = self.memory.lock();
        let live = memory.stats.live_allocations;
        let live_bytes = memory.stats.live_bytes;
        memory.stats = DeviceStats {
            live_allocations: live,
            peak_allocations: live,
            live_bytes,
            ..DeviceStats::default()
        };
    }
}

impl Default for EmulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EmulatedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulatedDevice")
            .field("stats", &self.stats())
            .finish()
    }
}

impl DeviceExecutor for EmulatedDevice {
    type Buffer = EmulatedBuffer;

    fn name(&self) -> &str {
        "emulated"
    }

    fn alloc(&self, len: usize) -> Result<Self::Buffer> {
        let mut memory = self.memory.lock();
        if let Some(capacity) = memory.capacity {
            if memory.stats.live_bytes + len > capacity {
                return Err(EngineError::device_execution(
                    DeviceOp::Allocate,
                    format!(
                        "out of memory: {} bytes requested, {} of {} in use",
                        len, memory.stats.live_bytes, capacity
                    ),
                ));
            }
        }

        let address = memory.next_address;
        let span = (len.max(1) as u64).div_ceil(ALIGNMENT) * ALIGNMENT;
        memory.next_address += span;
        memory.allocations.insert(address, vec![0u8; len]);

        let stats = &mut memory.stats;
        stats.allocations += 1;
        stats.live_allocations += 1;
        stats.live_bytes += len;
        stats.peak_allocations = stats.peak_allocations.max(stats.live_allocations);

        Ok(EmulatedBuffer {
            address,
            len,
            memory: Arc::clone(&self.memory),
        })
    }

    fn upload(&self, src: &[u8], dst: &mut Self::Buffer) -> Result<()> {
        let mut memory = self.memory.lock();
        let target = memory
            .allocations
            .get_mut(&dst.address)
            .ok_or_else(|| invalid_address(DeviceOp::HostToDevice, dst.address))?;
        if src.len() > target.len() {
            return Err(EngineError::device_execution(
                DeviceOp::HostToDevice,
                format!(
                    "copy of {} bytes overflows {}-byte allocation",
                    src.len(),
                    target.len()
                ),
            ));
        }
        target[..src.len()].copy_from_slice(src);

        memory.stats.host_to_device += 1;
        memory.stats.bytes_to_device += src.len();
        Ok(())
    }

    fn download(&self, src: &Self::Buffer, dst: &mut [u8]) -> Result<()> {
        let mut memory = self.memory.lock();
        let source = memory.get(src.address, DeviceOp::DeviceToHost)?;
        if dst.len() > source.len() {
            return Err(EngineError::device_execution(
                DeviceOp::DeviceToHost,
                format!(
                    "copy of {} bytes reads past {}-byte allocation",
                    dst.len(),
                    source.len()
                ),
            ));
        }
        dst.copy_from_slice(&source[..dst.len()]);

        memory.stats.device_to_host += 1;
        memory.stats.bytes_to_host += dst.len();
        Ok(())
    }

    fn address_of(&self, buffer: &Self::Buffer) -> u64 {
        buffer.address
    }

    fn launch_step(&self, shape: &LaunchShape, args: StepArgs<'_, Self::Buffer>) -> Result<()> {
        let mut memory = self.memory.lock();
        memory.stats.launches += 1;

        match args {
            StepArgs::Flat {
                src,
                dst,
                width,
                height,
                stride,
            } => {
                let mut out = memory.take(dst.address)?;
                let result = memory.get(src.address, DeviceOp::Launch).and_then(|input| {
                    let needed = stride * height;
                    if input.len() < needed || out.len() < needed {
                        return Err(EngineError::device_execution(
                            DeviceOp::Launch,
                            format!("{}x{} grid with stride {} exceeds its allocation", width, height, stride),
                        ));
                    }
                    run_flat(shape, input, &mut out, width, height, stride);
                    Ok(())
                });
                memory.restore(dst.address, out);
                result
            }
            StepArgs::RowIndirect {
                src_rows,
                dst_rows,
                width,
                height,
            } => {
                let src_table = decode_row_table(memory.get(src_rows.address, DeviceOp::Launch)?, height)?;
                let dst_table = decode_row_table(memory.get(dst_rows.address, DeviceOp::Launch)?, height)?;

                let mut out_rows = Vec::with_capacity(height);
                for &address in &dst_table {
                    match memory.take(address) {
                        Ok(row) => out_rows.push(row),
                        Err(e) => {
                            for (&taken, row) in dst_table.iter().zip(out_rows) {
                                memory.restore(taken, row);
                            }
                            return Err(e);
                        }
                    }
                }

                let result = gather_rows(&memory, &src_table, width).and_then(|inputs| {
                    if out_rows.iter().any(|row| row.len() < width) {
                        return Err(EngineError::device_execution(
                            DeviceOp::Launch,
                            "destination row shorter than grid width",
                        ));
                    }
                    run_rows(shape, &inputs, &mut out_rows, width, height);
                    Ok(())
                });

                for (&address, row) in dst_table.iter().zip(out_rows) {
                    memory.restore(address, row);
                }
                result
            }
        }
    }

    fn synchronize(&self) -> Result<()> {
        self.memory.lock().stats.synchronizations += 1;
        Ok(())
    }
}

fn decode_row_table(bytes: &[u8], height: usize) -> Result<Vec<u64>> {
    let needed = height * std::mem::size_of::<u64>();
    if bytes.len() < needed {
        return Err(EngineError::device_execution(
            DeviceOp::Launch,
            format!("row table holds {} bytes, {} rows need {}", bytes.len(), height, needed),
        ));
    }
    Ok(bytes[..needed]
        .chunks_exact(8)
        .map(|b| u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
        .collect())
}

fn gather_rows<'m>(memory: &'m EmulatedMemory, table: &[u64], width: usize) -> Result<Vec<&'m [u8]>> {
    table
        .iter()
        .map(|&address| {
            let row = memory.get(address, DeviceOp::Launch)?;
            if row.len() < width {
                return Err(EngineError::device_execution(
                    DeviceOp::Launch,
                    format!("source row at {:#x} shorter than grid width", address),
                ));
            }
            Ok(row)
        })
        .collect()
}

/// Executes a flat-layout launch. Block row `by` owns output rows
/// `by * tile_h .. (by + 1) * tile_h`, so bands are written independently.
fn run_flat(shape: &LaunchShape, input: &[u8], out: &mut [u8], width: usize, height: usize, stride: usize) {
    let tile_w = shape.block_dim.0 as usize;
    let tile_h = shape.block_dim.1 as usize;
    let blocks_x = shape.grid_dim.0 as usize;
    let blocks_y = shape.grid_dim.1 as usize;
    let read = |r: usize, c: usize| input[r * stride + c];

    out[..stride * height]
        .par_chunks_mut(stride * tile_h)
        .take(blocks_y)
        .enumerate()
        .for_each(|(block_y, band)| {
            for block_x in 0..blocks_x {
                for ty in 0..tile_h {
                    let row = block_y * tile_h + ty;
                    if row >= height {
                        break;
                    }
                    for tx in 0..tile_w {
                        let col = block_x * tile_w + tx;
                        if col >= width {
                            break;
                        }
                        band[ty * stride + col] = rule::evolve_cell(read, row, col, width, height);
                    }
                }
            }
        });
}

/// Executes a row-indirect launch; every read goes through the row table.
fn run_rows(shape: &LaunchShape, inputs: &[&[u8]], out_rows: &mut [Vec<u8>], width: usize, height: usize) {
    let tile_w = shape.block_dim.0 as usize;
    let tile_h = shape.block_dim.1 as usize;
    let blocks_x = shape.grid_dim.0 as usize;
    let blocks_y = shape.grid_dim.1 as usize;
    let read = |r: usize, c: usize| inputs[r][c];

    out_rows
        .par_chunks_mut(tile_h)
        .take(blocks_y)
        .enumerate()
        .for_each(|(block_y, band)| {
            for block_x in 0..blocks_x {
                for (ty, out_row) in band.iter_mut().enumerate() {
                    let row = block_y * tile_h + ty;
                    if row >= height {
                        break;
                    }
                    for tx in 0..tile_w {
                        let col = block_x * tile_w + tx;
                        if col >= width {
                            break;
                        }
                        out_row[col] = rule::evolve_cell(read, row, col, width, height);
                    }
                }
            }
        });
}
