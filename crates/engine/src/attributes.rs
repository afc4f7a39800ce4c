//! Attribute store
//!
//! Per-object, per-attribute typed value cells.
//!
//! ## Write contract
//!
//! 1. A cell holds one [`ValueKind`]; writing another kind is `KindMismatch`.
//! 2. A write whose value is bit-for-bit equal to the stored one is
//!    [`Change::Unchanged`] and must not be notified.
//! 3. Otherwise the value is stored and the previous value (or `None` on the
//!    first write) is returned for the notification.
//!
//! Counter cells additionally track a running minimum and maximum. A write
//! that moves either bound reports it in [`CellWrite`] so the caller can
//! raise the dedicated range events.
//!
//! Cells live in a `BTreeMap` per object so dumps replay them in ascending
//! attribute-handle order.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tether_core::{AttributeHandle, Change, CounterRange, Error, ObjectHandle, Result, Value, ValueKind};

/// Movement of one counter bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundChange {
    /// New bound
    pub value: i64,
    /// Bound before the write, `None` on first write
    pub previous: Option<i64>,
}

/// Outcome of a cell write
#[derive(Debug, Clone, PartialEq)]
pub struct CellWrite {
    /// Value change
    pub change: Change<Value>,
    /// Counter minimum moved
    pub minimum: Option<BoundChange>,
    /// Counter maximum moved
    pub maximum: Option<BoundChange>,
}

impl CellWrite {
    fn unchanged() -> Self {
        Self {
            change: Change::Unchanged,
            minimum: None,
            maximum: None,
        }
    }
}

/// One stored attribute value
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    value: Value,
    range: Option<CounterRange>,
}

impl Cell {
    /// Stored value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Running range, present on counter cells only
    pub fn range(&self) -> Option<CounterRange> {
        self.range
    }
}

/// Cells of every object
#[derive(Debug, Default)]
pub struct AttributeStore {
    objects: FxHashMap<ObjectHandle, BTreeMap<AttributeHandle, Cell>>,
}

impl AttributeStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `object` with no cells
    pub fn insert_object(&mut self, object: ObjectHandle) {
        self.objects.entry(object).or_default();
    }

    /// Drop `object` and all of its cells
    pub fn remove_object(&mut self, object: ObjectHandle) -> Option<BTreeMap<AttributeHandle, Cell>> {
        self.objects.remove(&object)
    }

    /// Write `value` into the cell (`object`, `attribute`)
    ///
    /// The caller has already checked that `object` is live and `attribute`
    /// is a defined handle.
    pub fn write(&mut self, object: ObjectHandle, attribute: AttributeHandle, value: Value) -> Result<CellWrite> {
        let cells = self
            .objects
            .get_mut(&object)
            .ok_or(Error::UnknownObject(object))?;

        let Some(cell) = cells.get_mut(&attribute) else {
            let (range, minimum, maximum) = match value {
                Value::Counter(v) => {
                    let first = Some(BoundChange {
                        value: v,
                        previous: None,
                    });
                    (Some(CounterRange::at(v)), first, first)
                }
                _ => (None, None, None),
            };
            cells.insert(attribute, Cell { value, range });
            return Ok(CellWrite {
                change: Change::Set { previous: None },
                minimum,
                maximum,
            });
        };

        if cell.value.kind() != value.kind() {
            return Err(Error::KindMismatch {
                attribute,
                stored: cell.value.kind(),
                written: value.kind(),
            });
        }
        if cell.value.same_bits(&value) {
            return Ok(CellWrite::unchanged());
        }

        let (mut minimum, mut maximum) = (None, None);
        if let (Value::Counter(v), Some(range)) = (&value, cell.range.as_mut()) {
            if *v < range.minimum {
                minimum = Some(BoundChange {
                    value: *v,
                    previous: Some(range.minimum),
                });
                range.minimum = *v;
            }
            if *v > range.maximum {
                maximum = Some(BoundChange {
                    value: *v,
                    previous: Some(range.maximum),
                });
                range.maximum = *v;
            }
        }

        let previous = std::mem::replace(&mut cell.value, value);
        Ok(CellWrite {
            change: Change::Set {
                previous: Some(previous),
            },
            minimum,
            maximum,
        })
    }

    /// Collapse a counter's range onto its current value
    ///
    /// Returns the bound changes; an absent cell yields no change.
    pub fn reset_counter_range(
        &mut self,
        object: ObjectHandle,
        attribute: AttributeHandle,
    ) -> Result<(Option<BoundChange>, Option<BoundChange>)> {
        let cells = self
            .objects
            .get_mut(&object)
            .ok_or(Error::UnknownObject(object))?;
        let Some(cell) = cells.get_mut(&attribute) else {
            return Ok((None, None));
        };
        let (Value::Counter(current), Some(range)) = (&cell.value, cell.range.as_mut()) else {
            return Err(Error::KindMismatch {
                attribute,
                stored: cell.value.kind(),
                written: ValueKind::Counter,
            });
        };
        let current = *current;
        let minimum = (range.minimum != current).then(|| BoundChange {
            value: current,
            previous: Some(range.minimum),
        });
        let maximum = (range.maximum != current).then(|| BoundChange {
            value: current,
            previous: Some(range.maximum),
        });
        *range = CounterRange::at(current);
        Ok((minimum, maximum))
    }

    /// Remove a cell, returning the value it held
    pub fn remove(&mut self, object: ObjectHandle, attribute: AttributeHandle) -> Result<Option<Value>> {
        let cells = self
            .objects
            .get_mut(&object)
            .ok_or(Error::UnknownObject(object))?;
        Ok(cells.remove(&attribute).map(|cell| cell.value))
    }

    /// Stored value of (`object`, `attribute`)
    pub fn get(&self, object: ObjectHandle, attribute: AttributeHandle) -> Option<&Value> {
        self.cell(object, attribute).map(Cell::value)
    }

    /// Stored cell of (`object`, `attribute`)
    pub fn cell(&self, object: ObjectHandle, attribute: AttributeHandle) -> Option<&Cell> {
        self.objects.get(&object).and_then(|cells| cells.get(&attribute))
    }

    /// Cells of `object` in ascending attribute-handle order
    pub fn cells(&self, object: ObjectHandle) -> impl Iterator<Item = (AttributeHandle, &Cell)> {
        self.objects
            .get(&object)
            .into_iter()
            .flat_map(|cells| cells.iter().map(|(a, c)| (*a, c)))
    }

    /// Number of cells stored for `object`
    pub fn cell_count(&self, object: ObjectHandle) -> usize {
        self.objects.get(&object).map_or(0, BTreeMap::len)
    }
}
