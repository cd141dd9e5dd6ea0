//! Device memory layouts of a grid.
//!
//! # Flat
//!
//! One allocation of `height * stride` bytes; cell `(row, col)` lives at
//! `row * stride + col`. One host-to-device copy per grid.
//!
//! # RowIndirect
//!
//! One allocation per row plus a device table holding each row's base
//! address as a little-endian `u64`. The kernel chases one pointer per
//! access and the transfer costs `height + 1` copies, but it mirrors the
//! array-of-rows shape of host code.
//!
//! Both layouts produce identical results; the engine picks one from
//! [`DeviceLayout`].

use super::{DeviceExecutor, StepArgs};
use crate::config::DeviceLayout;
use crate::core::{
    error::{DeviceOp, EngineError, Result},
    grid::Grid,
};
use tracing::trace;

/// Size in bytes of one row-table entry.
const ADDRESS_BYTES: usize = std::mem::size_of::<u64>();

/// A grid resident in device memory.
#[derive(Debug)]
pub enum DeviceGrid<B> {
    /// Single allocation with an explicit stride.
    Flat {
        /// Cell storage.
        cells: B,
        /// Bytes between consecutive rows.
        stride: usize,
    },
    /// Per-row allocations and their address table.
    RowIndirect {
        /// Row storage, one allocation per row.
        rows: Vec<B>,
        /// Device table of row base addresses.
        table: B,
    },
}

impl<B> DeviceGrid<B> {
    /// Copies `grid` to the device in the requested layout.
    pub fn upload<E>(executor: &E, grid: &Grid, layout: DeviceLayout) -> Result<Self>
    where
        E: DeviceExecutor<Buffer = B>,
    {
        let (width, height) = (grid.width(), grid.height());
        match layout {
            DeviceLayout::Flat => {
                let stride = width;
                let mut staging = vec![0u8; stride * height];
                for row in 0..height {
                    grid.copy_row_into(row, &mut staging[row * stride..row * stride + width]);
                }

                let mut cells = executor.alloc(staging.len())?;
                executor.upload(&staging, &mut cells)?;
                Ok(Self::Flat { cells, stride })
            }
            DeviceLayout::RowIndirect => {
                let mut rows = Vec::with_capacity(height);
                let mut staging = vec![0u8; width];
                for row in 0..height {
                    grid.copy_row_into(row, &mut staging);
                    let mut buffer = executor.alloc(width)?;
                    executor.upload(&staging, &mut buffer)?;
                    rows.push(buffer);
                }
                let table = upload_row_table(executor, &rows)?;
                Ok(Self::RowIndirect { rows, table })
            }
        }
    }

    /// Allocates an all-dead grid on the device.
    pub fn allocate<E>(executor: &E, width: usize, height: usize, layout: DeviceLayout) -> Result<Self>
    where
        E: DeviceExecutor<Buffer = B>,
    {
        match layout {
            DeviceLayout::Flat => {
                let stride = width;
                let cells = executor.alloc(stride * height)?;
                Ok(Self::Flat { cells, stride })
            }
            DeviceLayout::RowIndirect => {
                let rows = (0..height)
                    .map(|_| executor.alloc(width))
                    .collect::<Result<Vec<_>>>()?;
                let table = upload_row_table(executor, &rows)?;
                Ok(Self::RowIndirect { rows, table })
            }
        }
    }

    /// Copies the grid back into a freshly allocated host [`Grid`].
    pub fn download<E>(&self, executor: &E, width: usize, height: usize) -> Result<Grid>
    where
        E: DeviceExecutor<Buffer = B>,
    {
        let mut host = vec![0u8; width * height];
        match self {
            Self::Flat { cells, stride } => {
                let mut staging = vec![0u8; stride * height];
                executor.download(cells, &mut staging)?;
                if width > 0 {
                    for (row, out) in host.chunks_exact_mut(width).enumerate() {
                        out.copy_from_slice(&staging[row * stride..row * stride + width]);
                    }
                }
            }
            Self::RowIndirect { rows, .. } => {
                if width > 0 {
                    for (buffer, out) in rows.iter().zip(host.chunks_exact_mut(width)) {
                        executor.download(buffer, out)?;
                    }
                }
            }
        }

        Grid::from_row_major(width, height, &host).map_err(|e| {
            EngineError::device_execution(DeviceOp::DeviceToHost, format!("corrupt result: {}", e))
        })
    }

    /// Number of device allocations held.
    pub fn allocation_count(&self) -> usize {
        match self {
            Self::Flat { .. } => 1,
            Self::RowIndirect { rows, .. } => rows.len() + 1,
        }
    }

    /// Layout of this grid.
    pub fn layout(&self) -> DeviceLayout {
        match self {
            Self::Flat { .. } => DeviceLayout::Flat,
            Self::RowIndirect { .. } => DeviceLayout::RowIndirect,
        }
    }
}

fn upload_row_table<E: DeviceExecutor>(executor: &E, rows: &[E::Buffer]) -> Result<E::Buffer> {
    let addresses: Vec<u8> = rows
        .iter()
        .flat_map(|row| executor.address_of(row).to_le_bytes())
        .collect();
    let mut table = executor.alloc(rows.len() * ADDRESS_BYTES)?;
    executor.upload(&addresses, &mut table)?;
    Ok(table)
}

/// The two generations owned by one engine call.
///
/// `current` always holds the latest complete generation; a step reads
/// `current`, writes `next`, and [`swap`](Self::swap) exchanges their roles.
#[derive(Debug)]
pub struct DeviceBufferSet<B> {
    current: DeviceGrid<B>,
    next: DeviceGrid<B>,
    width: usize,
    height: usize,
}

impl<B> DeviceBufferSet<B> {
    /// Uploads `grid` as the current generation and allocates the companion.
    pub fn upload<E>(executor: &E, grid: &Grid, layout: DeviceLayout) -> Result<Self>
    where
        E: DeviceExecutor<Buffer = B>,
    {
        let (width, height) = (grid.width(), grid.height());
        let current = DeviceGrid::upload(executor, grid, layout)?;
        let next = DeviceGrid::allocate(executor, width, height, layout)?;
        trace!(
            allocations = current.allocation_count() + next.allocation_count(),
            layout = layout.as_str(),
            "device buffers acquired"
        );
        Ok(Self {
            current,
            next,
            width,
            height,
        })
    }

    /// Launch arguments reading `current` and writing `next`.
    pub fn step_args(&mut self) -> Result<StepArgs<'_, B>> {
        let (width, height) = (self.width, self.height);
        match (&self.current, &mut self.next) {
            (DeviceGrid::Flat { cells: src, stride }, DeviceGrid::Flat { cells: dst, .. }) => {
                Ok(StepArgs::Flat {
                    src,
                    dst,
                    width,
                    height,
                    stride: *stride,
                })
            }
            (
                DeviceGrid::RowIndirect { table: src_rows, .. },
                DeviceGrid::RowIndirect { table: dst_rows, .. },
            ) => Ok(StepArgs::RowIndirect {
                src_rows,
                dst_rows,
                width,
                height,
            }),
            _ => Err(EngineError::device_execution(
                DeviceOp::Launch,
                "generation buffers have different layouts",
            )),
        }
    }

    /// Exchanges the roles of the two generations.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Copies the current generation to the host.
    pub fn download<E>(&self, executor: &E) -> Result<Grid>
    where
        E: DeviceExecutor<Buffer = B>,
    {
        self.current.download(executor, self.width, self.height)
    }

    /// Number of device allocations held by both generations.
    pub fn allocation_count(&self) -> usize {
        self.current.allocation_count() + self.next.allocation_count()
    }
}

impl<B> Drop for DeviceBufferSet<B> {
    fn drop(&mut self) {
        trace!(allocations = self.allocation_count(), "device buffers released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::device::EmulatedDevice;
    use pretty_assertions::assert_eq;

    fn sample() -> Grid {
        "#...\n.#..\n..##\n#..#".parse().unwrap()
    }

    #[test]
    fn test_flat_transfer_round_trip() {
        let device = EmulatedDevice::new();
        let grid = sample();
        let on_device = DeviceGrid::upload(&device, &grid, DeviceLayout::Flat).unwrap();
        assert_eq!(on_device.allocation_count(), 1);
        assert_eq!(on_device.download(&device, 4, 4).unwrap(), grid);
        assert_eq!(device.stats().host_to_device, 1);
    }

    #[test]
    fn test_row_transfer_round_trip() {
        let device = EmulatedDevice::new();
        let grid = sample();
        let on_device = DeviceGrid::upload(&device, &grid, DeviceLayout::RowIndirect).unwrap();
        assert_eq!(on_device.allocation_count(), 5);
        assert_eq!(on_device.layout(), DeviceLayout::RowIndirect);
        assert_eq!(on_device.download(&device, 4, 4).unwrap(), grid);
        // One copy per row plus the address table.
        assert_eq!(device.stats().host_to_device, 5);
    }

    #[test]
    fn test_buffer_set_releases_on_drop() {
        let device = EmulatedDevice::new();
        {
            let set = DeviceBufferSet::upload(&device, &sample(), DeviceLayout::RowIndirect).unwrap();
            assert_eq!(set.allocation_count(), 10);
            assert_eq!(device.live_allocations(), 10);
        }
        assert_eq!(device.live_allocations(), 0);
    }

    #[test]
    fn test_swap_exchanges_generations() {
        let device = EmulatedDevice::new();
        let grid = sample();
        let mut set = DeviceBufferSet::upload(&device, &grid, DeviceLayout::Flat).unwrap();
        set.swap();
        assert_eq!(set.download(&device).unwrap(), Grid::new(4, 4));
        set.swap();
        assert_eq!(set.download(&device).unwrap(), grid);
    }
}
