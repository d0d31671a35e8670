//! # Component Columns — Type-Erased Row Storage
//!
//! Which component types an archetype holds is decided at runtime, when its
//! signature is first realized, so a column cannot be declared as some
//! `Vec<T>` with `T` fixed at compile time. [`ComponentColumn`] erases the
//! element type instead: every row is a `Box<dyn Any + Send + Sync>`, and
//! typed access goes through `downcast` against the caller-supplied `T`.
//!
//! A denser layout would pack raw bytes and track the element size by hand,
//! at the price of `unsafe` everywhere a row is read or moved. Boxed rows
//! keep the whole storage layer safe, and migration falls out for free:
//! [`ComponentColumn::take`] pops the box from one column and
//! [`push_any`](ComponentColumn::push_any) appends it to another, ownership
//! moving with it.

use std::any::Any;

/// A type-erased column of component values, one per row of the owning
/// archetype. All columns of an archetype have the same length, and row `i`
/// of every column belongs to the entity at row `i`.
pub struct ComponentColumn {
    data: Vec<Box<dyn Any + Send + Sync>>,
}

impl ComponentColumn {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Number of rows stored.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append an already-boxed value. Used when spawning and when moving rows
    /// between archetypes.
    pub fn push_any(&mut self, value: Box<dyn Any + Send + Sync>) {
        self.data.push(value);
    }

    /// Typed access to the value at `row`. `None` when the row is out of
    /// bounds or the column stores a different type.
    pub fn get<T: 'static>(&self, row: usize) -> Option<&T> {
        self.data.get(row)?.downcast_ref::<T>()
    }

    /// Typed mutable access to the value at `row`.
    pub fn get_mut<T: 'static>(&mut self, row: usize) -> Option<&mut T> {
        self.data.get_mut(row)?.downcast_mut::<T>()
    }

    /// Type-erased access to the value at `row`.
    pub fn get_any(&self, row: usize) -> Option<&dyn Any> {
        self.data.get(row).map(|b| &**b as &dyn Any)
    }

    /// Swap-remove the value at `row`, dropping it. The last row takes its
    /// place, keeping the column dense.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    pub fn swap_remove(&mut self, row: usize) {
        self.data.swap_remove(row);
    }

    /// Swap-remove the value at `row` and return ownership of it. Used to
    /// migrate a row into another archetype's column.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    pub fn take(&mut self, row: usize) -> Box<dyn Any + Send + Sync> {
        self.data.swap_remove(row)
    }
}

impl Default for ComponentColumn {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_get() {
        let mut col = ComponentColumn::new();
        col.push_any(Box::new(1.0f32));
        col.push_any(Box::new(2.0f32));
        assert_eq!(col.len(), 2);
        assert_eq!(col.get::<f32>(0), Some(&1.0));
        assert_eq!(col.get::<f32>(1), Some(&2.0));
        assert!(col.get::<f32>(2).is_none());
        assert!(col.get::<u32>(0).is_none()); // wrong type
    }

    #[test]
    fn get_mut_writes_through() {
        let mut col = ComponentColumn::new();
        col.push_any(Box::new(10u32));
        *col.get_mut::<u32>(0).unwrap() = 99;
        assert_eq!(col.get::<u32>(0), Some(&99));
    }

    #[test]
    fn swap_remove_keeps_column_dense() {
        let mut col = ComponentColumn::new();
        col.push_any(Box::new(10u32));
        col.push_any(Box::new(20u32));
        col.push_any(Box::new(30u32));
        col.swap_remove(0);
        assert_eq!(col.len(), 2);
        // The last value moved into the freed slot.
        assert_eq!(col.get::<u32>(0), Some(&30));
        assert_eq!(col.get::<u32>(1), Some(&20));
    }

    #[test]
    fn take_transfers_ownership() {
        let mut col = ComponentColumn::new();
        col.push_any(Box::new(42u64));
        col.push_any(Box::new(99u64));

        let taken = col.take(0);
        assert_eq!(col.len(), 1);
        assert_eq!(col.get::<u64>(0), Some(&99));

        let mut other = ComponentColumn::new();
        other.push_any(taken);
        assert_eq!(other.get::<u64>(0), Some(&42));
    }

    #[test]
    fn drop_called_on_remove() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

        struct Tracked;
        impl Drop for Tracked {
            fn drop(&mut self) {
                DROP_COUNT.fetch_add(1, Ordering::SeqCst);
            }
        }

        DROP_COUNT.store(0, Ordering::SeqCst);
        let mut col = ComponentColumn::new();
        col.push_any(Box::new(Tracked));
        col.push_any(Box::new(Tracked));
        col.swap_remove(0);
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 1);
        drop(col);
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn zero_sized_components() {
        struct Marker;
        let mut col = ComponentColumn::new();
        col.push_any(Box::new(Marker));
        col.push_any(Box::new(Marker));
        assert_eq!(col.len(), 2);
        assert!(col.get::<Marker>(1).is_some());
    }
}
