#![forbid(unsafe_code)]

//! Single-writer value cells shared between producers.
//!
//! Producers never hold references to each other. When one needs a value
//! another computes (the pixel's energy level, the pixel's position), the
//! owner keeps the only [`Publisher`] and everyone else gets a [`Reader`].
//!
//! All producers run on the frame loop's thread, so the cell is an
//! `Rc<Cell<T>>`; `T: Copy` keeps reads free of borrows.
//!
//! Readers observe whatever the writer published last, which may be from the
//! previous frame when the writer runs later in registration order.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Create a cell holding `initial`.
#[must_use]
pub fn channel<T: Copy>(initial: T) -> (Publisher<T>, Reader<T>) {
    let cell = Rc::new(Cell::new(initial));
    (
        Publisher {
            cell: Rc::clone(&cell),
        },
        Reader { cell },
    )
}

/// The unique write handle. Not `Clone`.
pub struct Publisher<T: Copy> {
    cell: Rc<Cell<T>>,
}

impl<T: Copy> Publisher<T> {
    /// Replace the shared value.
    pub fn publish(&self, value: T) {
        self.cell.set(value);
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.cell.get()
    }

    /// A new read handle.
    #[must_use]
    pub fn reader(&self) -> Reader<T> {
        Reader {
            cell: Rc::clone(&self.cell),
        }
    }
}

/// A read handle.
#[derive(Clone)]
pub struct Reader<T: Copy> {
    cell: Rc<Cell<T>>,
}

impl<T: Copy> Reader<T> {
    /// A reader of a constant, with no publisher.
    #[must_use]
    pub fn constant(value: T) -> Self {
        Self {
            cell: Rc::new(Cell::new(value)),
        }
    }

    /// Last published value.
    #[must_use]
    pub fn get(&self) -> T {
        self.cell.get()
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Publisher").field(&self.cell.get()).finish()
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for Reader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reader").field(&self.cell.get()).finish()
    }
}
