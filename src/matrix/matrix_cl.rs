//! Device-resident matrices and their event bookkeeping.

use crate::device::{wait_all, DeviceContext, DeviceMemory, Event};
use crate::error::{Error, Result};
use nalgebra::DMatrix;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct EventLists {
    read: Vec<Event>,
    write: Vec<Event>,
    // always the union of the other two
    read_write: Vec<Event>,
}

fn push_pruned(list: &mut Vec<Event>, event: Event) {
    list.retain(|e| !e.is_complete());
    list.push(event);
}

/// A column-major `rows x cols` matrix of `f64` in device memory.
///
/// Every kernel that touches the buffer records its completion event here,
/// and later launches wait on the events their access conflicts with.
/// Host reads wait on everything.
#[derive(Debug)]
pub struct MatrixCl {
    rows: usize,
    cols: usize,
    memory: DeviceMemory,
    events: Mutex<EventLists>,
}

impl MatrixCl {
    /// Allocate a zero-filled matrix. At least one element is always
    /// allocated so empty matrices still own valid memory.
    pub fn zeros(ctx: &DeviceContext, rows: usize, cols: usize) -> Result<Self> {
        let len = checked_len(rows, cols)?;
        let memory = ctx.backend().alloc(len)?;

        Ok(Self {
            rows,
            cols,
            memory,
            events: Mutex::new(EventLists::default()),
        })
    }

    /// Copy a host matrix to the device. The copy is recorded as a write.
    pub fn from_host(ctx: &DeviceContext, m: &DMatrix<f64>) -> Result<Self> {
        let matrix = Self::zeros(ctx, m.nrows(), m.ncols())?;
        if m.is_empty() {
            return Ok(matrix);
        }

        let event = ctx
            .backend()
            .write(&matrix.memory, m.as_slice().to_vec(), &[])?;
        matrix.add_write_event(event);
        Ok(matrix)
    }

    /// Copy back to the host.
    ///
    /// Waits for every pending write, then waits on and clears all of the
    /// buffer's events before returning.
    pub fn to_host(&self, ctx: &DeviceContext) -> Result<DMatrix<f64>> {
        let data = ctx
            .backend()
            .read(&self.memory, self.size(), &self.write_events())?;
        self.wait_for_read_write_events()?;

        Ok(DMatrix::from_vec(self.rows, self.cols, data))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn size(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn memory(&self) -> &DeviceMemory {
        &self.memory
    }

    pub fn read_events(&self) -> Vec<Event> {
        self.events.lock().read.clone()
    }

    pub fn write_events(&self) -> Vec<Event> {
        self.events.lock().write.clone()
    }

    pub fn read_write_events(&self) -> Vec<Event> {
        self.events.lock().read_write.clone()
    }

    pub fn add_read_event(&self, event: Event) {
        let mut lists = self.events.lock();
        push_pruned(&mut lists.read, event.clone());
        push_pruned(&mut lists.read_write, event);
    }

    pub fn add_write_event(&self, event: Event) {
        let mut lists = self.events.lock();
        push_pruned(&mut lists.write, event.clone());
        push_pruned(&mut lists.read_write, event);
    }

    pub fn add_read_write_event(&self, event: Event) {
        let mut lists = self.events.lock();
        push_pruned(&mut lists.read, event.clone());
        push_pruned(&mut lists.write, event.clone());
        push_pruned(&mut lists.read_write, event);
    }

    /// Block on every outstanding event, then forget the finished ones.
    /// On failure the events are kept so later reads report the same fault.
    ///
    /// Events recorded by other threads while this one waits stay listed.
    pub fn wait_for_read_write_events(&self) -> Result<()> {
        let pending = self.read_write_events();
        wait_all(&pending)?;

        let mut lists = self.events.lock();
        lists.read.retain(|e| !e.is_complete());
        lists.write.retain(|e| !e.is_complete());
        lists.read_write.retain(|e| !e.is_complete());
        Ok(())
    }

    /// Block until every pending write has finished.
    pub fn wait_for_write_events(&self) -> Result<()> {
        wait_all(&self.write_events())
    }
}

fn checked_len(rows: usize, cols: usize) -> Result<usize> {
    rows.checked_mul(cols).ok_or_else(|| {
        Error::invalid_argument(
            "MatrixCl",
            format!("{} x {} elements overflow usize", rows, cols),
        )
    })
}
