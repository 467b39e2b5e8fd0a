//! Regular cell decomposition / neighbour list.
//!
//! Tiles the primary box into a regular grid of cells; each particle
//! belongs to exactly one cell at any instant. Cell mutation methods never
//! call back into the scheduler directly — they append to an internal
//! drain buffer of `ChangeSignal`s that the scheduler pulls once per
//! processed event (see the `signal` module doc).

use crate::boundary::BoundaryCondition;
use crate::error::CapacityError;
use crate::particle::ParticleId;
use crate::signal::ChangeSignal;
use crate::vector::Vec3;

pub type CellId = usize;
pub type LocalId = usize;

/// A cell's occupants, its neighbouring cells, and any local elements
/// anchored to it.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    pub occupants: Vec<ParticleId>,
    pub neighbour_cells: Vec<CellId>,
    pub local_elements: Vec<LocalId>,
}

pub struct NeighbourList {
    cells: Vec<Cell>,
    dims: [usize; 3],
    cell_size: Vec3,
    wrap: [bool; 3],
    particle_cell: Vec<CellId>,
    pending_signals: Vec<ChangeSignal>,
}

/// Minimum cells per axis for the "3x3x3 neighbourhood" correctness
/// argument to hold: with fewer than 3 cells along an axis, a cell can be
/// its own neighbour twice over (or a particle could reach a non-adjacent
/// cell within one crossing).
const MIN_CELLS_PER_AXIS: usize = 3;

impl NeighbourList {
    /// Builds a grid whose cells are at least `min_cell_size` along each
    /// axis (the largest interaction range any registered interaction
    /// requires), within a box of `box_size`. Fails with `CapacityError`
    /// if that would leave fewer than `MIN_CELLS_PER_AXIS` cells along any
    /// axis.
    pub fn new(
        box_size: Vec3,
        min_cell_size: f64,
        bc: &BoundaryCondition,
        particle_count: usize,
    ) -> Result<Self, CapacityError> {
        let dims_for = |length: f64| -> usize {
            if min_cell_size <= 0.0 {
                return MIN_CELLS_PER_AXIS;
            }
            (length / min_cell_size).floor().max(1.0) as usize
        };
        let dims = [
            dims_for(box_size.x),
            dims_for(box_size.y),
            dims_for(box_size.z),
        ];

        let minimum_total = MIN_CELLS_PER_AXIS.pow(3);
        let actual_total = dims[0] * dims[1] * dims[2];
        if dims.iter().any(|&d| d < MIN_CELLS_PER_AXIS) {
            return Err(CapacityError {
                actual: actual_total,
                minimum: minimum_total,
                interaction_range: min_cell_size,
            });
        }

        let cell_size = Vec3::new(
            box_size.x / dims[0] as f64,
            box_size.y / dims[1] as f64,
            box_size.z / dims[2] as f64,
        );

        let wrap = match bc {
            BoundaryCondition::Periodic { .. } => [true, true, true],
            BoundaryCondition::Reflective { .. } | BoundaryCondition::None => {
                [false, false, false]
            }
        };

        let mut cells = vec![Cell::default(); dims[0] * dims[1] * dims[2]];
        for ix in 0..dims[0] {
            for iy in 0..dims[1] {
                for iz in 0..dims[2] {
                    let id = flat_index(dims, ix, iy, iz);
                    cells[id].neighbour_cells =
                        neighbour_cell_ids(dims, wrap, ix as isize, iy as isize, iz as isize);
                }
            }
        }

        Ok(NeighbourList {
            cells,
            dims,
            cell_size,
            wrap,
            particle_cell: vec![0; particle_count],
            pending_signals: Vec::new(),
        })
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// The cell id containing `position`.
    pub fn locate(&self, position: Vec3) -> CellId {
        let ix = self.axis_index(position.x, self.dims[0], self.cell_size.x);
        let iy = self.axis_index(position.y, self.dims[1], self.cell_size.y);
        let iz = self.axis_index(position.z, self.dims[2], self.cell_size.z);
        flat_index(self.dims, ix, iy, iz)
    }

    fn axis_index(&self, coord: f64, dim: usize, size: f64) -> usize {
        let idx = (coord / size).floor() as isize;
        idx.rem_euclid(dim as isize) as usize
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id]
    }

    /// Places a particle in the cell containing `position`. O(1). No
    /// signal is emitted — initial population is not a "change", it is
    /// the baseline the first `drain_signals` call measures against.
    pub fn insert(&mut self, particle: ParticleId, position: Vec3) {
        let cell = self.locate(position);
        if self.particle_cell.len() <= particle {
            self.particle_cell.resize(particle + 1, cell);
        }
        self.cells[cell].occupants.push(particle);
        self.particle_cell[particle] = cell;
    }

    /// Removes a particle from its current cell. O(1) (swap-remove).
    pub fn remove(&mut self, particle: ParticleId) {
        let cell = self.particle_cell[particle];
        swap_remove_value(&mut self.cells[cell].occupants, particle);
    }

    /// Registers a local element (wall, sink) at `position`, so it shows
    /// up in `for_each_local_element` for particles in its cell and
    /// neighbouring cells. Locals are treated as point-located for cell
    /// registration purposes — a reasonable simplification for planar
    /// walls represented by a reference point plus a normal stored on the
    /// registry entry itself (see `registry::Local`).
    pub fn register_local(&mut self, local: LocalId, position: Vec3) {
        let cell = self.locate(position);
        self.cells[cell].local_elements.push(local);
    }

    /// Moves `particle` to the cell containing `new_position`, emitting a
    /// `CellCrossing` signal plus one `NewParticle`/`NewLocal` signal for
    /// every counterparty that enters `particle`'s neighbourhood for the
    /// first time as a result. No-op (and signal-free) if the particle's
    /// cell does not actually change.
    pub fn move_particle(&mut self, particle: ParticleId, new_position: Vec3) {
        let old_cell = self.particle_cell[particle];
        let new_cell = self.locate(new_position);
        if new_cell == old_cell {
            return;
        }

        swap_remove_value(&mut self.cells[old_cell].occupants, particle);
        self.cells[new_cell].occupants.push(particle);
        self.particle_cell[particle] = new_cell;

        self.pending_signals.push(ChangeSignal::CellCrossing {
            particle,
            from_cell: old_cell,
            to_cell: new_cell,
        });

        for newly_visible in self.newly_visible_cells(old_cell, new_cell) {
            let cell = &self.cells[newly_visible];
            for &neighbour in &cell.occupants {
                if neighbour != particle {
                    self.pending_signals.push(ChangeSignal::NewParticle {
                        particle,
                        neighbour,
                    });
                }
            }
            for &local in &cell.local_elements {
                self.pending_signals
                    .push(ChangeSignal::NewLocal { particle, local });
            }
        }
    }

    /// Cells visible from `new_cell`'s neighbourhood but not from
    /// `old_cell`'s — the annulus a particle sweeps into when it crosses
    /// one cell boundary.
    fn newly_visible_cells(&self, old_cell: CellId, new_cell: CellId) -> Vec<CellId> {
        let old_nbhd = &self.cells[old_cell].neighbour_cells;
        let new_nbhd = &self.cells[new_cell].neighbour_cells;
        new_nbhd
            .iter()
            .copied()
            .chain(std::iter::once(new_cell))
            .filter(|c| *c != old_cell && !old_nbhd.contains(c))
            .collect()
    }

    /// Invokes `f(q)` for every particle `q` in `p`'s own cell and its
    /// neighbouring cells, excluding `p` itself.
    pub fn for_each_neighbour(&self, particle: ParticleId, mut f: impl FnMut(ParticleId)) {
        let cell_id = self.particle_cell[particle];
        let cell = &self.cells[cell_id];
        for &q in &cell.occupants {
            if q != particle {
                f(q);
            }
        }
        for &nb in &cell.neighbour_cells {
            for &q in &self.cells[nb].occupants {
                if q != particle {
                    f(q);
                }
            }
        }
    }

    /// Invokes `f(local_id)` for every local registered in `p`'s cell and
    /// its neighbouring cells.
    pub fn for_each_local_element(&self, particle: ParticleId, mut f: impl FnMut(LocalId)) {
        let cell_id = self.particle_cell[particle];
        let cell = &self.cells[cell_id];
        for &l in &cell.local_elements {
            f(l);
        }
        for &nb in &cell.neighbour_cells {
            for &l in &self.cells[nb].local_elements {
                f(l);
            }
        }
    }

    /// The absolute time at which `particle` (currently at `position`,
    /// `local_clock`, moving at `velocity`) will first exit its current
    /// cell under free flight.
    ///
    /// Idempotent: calling this again with no intervening state change
    /// returns the same answer, since it is a pure function of the
    /// particle's current kinematics and cell geometry.
    pub fn next_cell_crossing(&self, particle: ParticleId, position: Vec3, velocity: Vec3, local_clock: f64) -> f64 {
        let cell_id = self.particle_cell[particle];
        let (ix, iy, iz) = self.cell_coords(cell_id);
        let lo = Vec3::new(
            ix as f64 * self.cell_size.x,
            iy as f64 * self.cell_size.y,
            iz as f64 * self.cell_size.z,
        );
        let hi = lo + self.cell_size;

        let axis_time = |p: f64, v: f64, lo: f64, hi: f64| -> f64 {
            if v > 0.0 {
                (hi - p) / v
            } else if v < 0.0 {
                (lo - p) / v
            } else {
                f64::INFINITY
            }
        };

        let dt = axis_time(position.x, velocity.x, lo.x, hi.x)
            .min(axis_time(position.y, velocity.y, lo.y, hi.y))
            .min(axis_time(position.z, velocity.z, lo.z, hi.z));

        local_clock + dt.max(0.0)
    }

    fn cell_coords(&self, id: CellId) -> (usize, usize, usize) {
        let iz = id / (self.dims[0] * self.dims[1]);
        let rem = id % (self.dims[0] * self.dims[1]);
        let iy = rem / self.dims[0];
        let ix = rem % self.dims[0];
        (ix, iy, iz)
    }

    /// Drains every signal accumulated since the last call. The scheduler
    /// calls this once per processed event and dispatches each signal
    /// through its `SignalBus`.
    pub fn drain_signals(&mut self) -> Vec<ChangeSignal> {
        std::mem::take(&mut self.pending_signals)
    }

    /// Rebuilds the entire cell structure from scratch for the given
    /// particle positions, emitting `ChangeSignal::ReInit`. Used for the
    /// `CapacityError` recovery path and for resuming a paused run: a
    /// rebuild mid-run must reproduce the same event sequence as a
    /// from-scratch load at the rebuild time.
    pub fn rebuild(&mut self, positions: &[Vec3]) {
        for cell in &mut self.cells {
            cell.occupants.clear();
        }
        for (id, &pos) in positions.iter().enumerate() {
            let cell = self.locate(pos);
            self.cells[cell].occupants.push(id);
            self.particle_cell[id] = cell;
        }
        self.pending_signals.push(ChangeSignal::ReInit);
    }
}

fn flat_index(dims: [usize; 3], ix: usize, iy: usize, iz: usize) -> CellId {
    (iz * dims[1] + iy) * dims[0] + ix
}

fn neighbour_cell_ids(dims: [usize; 3], wrap: [bool; 3], ix: isize, iy: isize, iz: isize) -> Vec<CellId> {
    let mut result = Vec::with_capacity(26);
    for dx in -1isize..=1 {
        for dy in -1isize..=1 {
            for dz in -1isize..=1 {
                if dx == 0 && dy == 0 && dz == 0 {
                    continue;
                }
                if let Some(id) = wrap_index(dims, wrap, ix + dx, iy + dy, iz + dz) {
                    if !result.contains(&id) {
                        result.push(id);
                    }
                }
            }
        }
    }
    result
}

fn wrap_index(dims: [usize; 3], wrap: [bool; 3], x: isize, y: isize, z: isize) -> Option<CellId> {
    let axis = |v: isize, dim: usize, wrap: bool| -> Option<usize> {
        if wrap {
            Some(v.rem_euclid(dim as isize) as usize)
        } else if v >= 0 && (v as usize) < dim {
            Some(v as usize)
        } else {
            None
        }
    };
    let x = axis(x, dims[0], wrap[0])?;
    let y = axis(y, dims[1], wrap[1])?;
    let z = axis(z, dims[2], wrap[2])?;
    Some(flat_index(dims, x, y, z))
}

fn swap_remove_value(v: &mut Vec<ParticleId>, value: ParticleId) {
    if let Some(pos) = v.iter().position(|&x| x == value) {
        v.swap_remove(pos);
    }
}
