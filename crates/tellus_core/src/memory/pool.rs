//! # Slot Pool
//!
//! Fixed-size block allocator for simulation objects that are created and
//! destroyed at arbitrary points in a tick.

use tracing::error;

use crate::error::{CoreError, CoreResult};

/// One unit of storage: exactly one object plus the page's generation.
struct Page<T> {
    /// Bumped every time the page is released.
    generation: u32,
    /// The stored object, `None` while the page sits on the free stack.
    value: Option<T>,
}

/// Handle to an object stored in a [`SlotPool`].
///
/// The handle is the page index plus the generation the page had when the
/// object was stored. Once the object is released the page generation moves
/// on and every old handle stops resolving.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    /// Index of the backing page.
    index: u32,
    /// Generation of the page at allocation time.
    generation: u32,
}

impl SlotHandle {
    /// Returns the index of the backing page.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation this handle was issued with.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// A growable pool of single-object pages.
///
/// Pages are appended one at a time, only when the free stack is empty, and
/// are recycled for the lifetime of the pool. Each page is boxed, so growing
/// the page table never moves a stored object.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. It is driven from the simulation thread only.
///
/// # Example
///
/// ```rust
/// use tellus_core::SlotPool;
///
/// struct Rock { mass: f32 }
///
/// let mut pool: SlotPool<Rock> = SlotPool::new();
///
/// // Allocate - O(1) amortized, appends a page only when none is free
/// let handle = pool.allocate(Rock { mass: 10.0 })?;
///
/// // Release - O(1), the page goes back on the free stack
/// let rock = pool.release(handle).unwrap();
/// assert_eq!(rock.mass, 10.0);
/// assert!(pool.get(handle).is_none());
/// # Ok::<(), tellus_core::CoreError>(())
/// ```
pub struct SlotPool<T> {
    /// All pages ever created.
    pages: Vec<Box<Page<T>>>,
    /// Free stack - indices of pages without an object.
    free: Vec<u32>,
    /// Number of stored objects.
    live_count: usize,
    /// Optional page ceiling.
    max_pages: Option<usize>,
}

impl<T> SlotPool<T> {
    /// Creates an empty pool that grows without a ceiling.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pages: Vec::new(),
            free: Vec::new(),
            live_count: 0,
            max_pages: None,
        }
    }

    /// Creates an empty pool that never holds more than `max_pages` pages.
    ///
    /// # Arguments
    ///
    /// * `max_pages` - Page ceiling
    ///
    /// # Panics
    ///
    /// Panics if `max_pages` is zero.
    #[must_use]
    pub fn with_max_pages(max_pages: usize) -> Self {
        assert!(max_pages > 0, "Page ceiling must be greater than zero");

        Self {
            max_pages: Some(max_pages),
            ..Self::new()
        }
    }

    /// Returns the number of pages created so far.
    #[inline]
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Returns the number of stored objects.
    #[inline]
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live_count
    }

    /// Returns the number of pages waiting on the free stack.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Returns the page ceiling, if any.
    #[inline]
    #[must_use]
    pub const fn max_pages(&self) -> Option<usize> {
        self.max_pages
    }

    /// Reserves room in the page table for `additional` more pages.
    ///
    /// No pages are created; this only avoids reallocating the table later.
    pub fn reserve(&mut self, additional: usize) {
        self.pages.reserve(additional);
        self.free.reserve(additional);
    }

    /// Stores an object, reusing the most recently freed page if there is one.
    ///
    /// # Arguments
    ///
    /// * `value` - The object to store
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PoolExhausted`] if every page is occupied and the
    /// ceiling forbids a new one.
    pub fn allocate(&mut self, value: T) -> CoreResult<SlotHandle> {
        if let Some(index) = self.free.pop() {
            let page = &mut self.pages[index as usize];
            debug_assert!(page.value.is_none(), "free page {index} holds an object");

            page.value = Some(value);
            self.live_count += 1;

            return Ok(SlotHandle {
                index,
                generation: page.generation,
            });
        }

        let page_count = self.pages.len();
        let at_ceiling = self.max_pages.is_some_and(|max| page_count >= max);
        let Ok(index) = u32::try_from(page_count) else {
            return Err(CoreError::PoolExhausted { pages: page_count });
        };
        if at_ceiling {
            return Err(CoreError::PoolExhausted { pages: page_count });
        }

        self.pages.push(Box::new(Page {
            generation: 0,
            value: Some(value),
        }));
        self.live_count += 1;

        Ok(SlotHandle {
            index,
            generation: 0,
        })
    }

    /// Releases an object and puts its page back on the free stack.
    ///
    /// # Arguments
    ///
    /// * `handle` - The handle to release
    ///
    /// # Returns
    ///
    /// The stored object, or `None` if the handle is stale or unknown. A
    /// stale release is a caller bug; it is logged and leaves the pool intact.
    pub fn release(&mut self, handle: SlotHandle) -> Option<T> {
        let Some(page) = self.pages.get_mut(handle.index as usize) else {
            error!(index = handle.index, "release of unknown slot handle");
            return None;
        };

        if page.generation != handle.generation || page.value.is_none() {
            error!(
                index = handle.index,
                generation = handle.generation,
                current = page.generation,
                "release of stale slot handle"
            );
            return None;
        }

        let value = page.value.take();
        page.generation = page.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live_count -= 1;

        value
    }

    /// Returns true if `handle` still refers to a stored object.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: SlotHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Gets a reference to a stored object.
    ///
    /// # Arguments
    ///
    /// * `handle` - The handle to look up
    #[inline]
    #[must_use]
    pub fn get(&self, handle: SlotHandle) -> Option<&T> {
        let page = self.pages.get(handle.index as usize)?;
        if page.generation != handle.generation {
            return None;
        }
        page.value.as_ref()
    }

    /// Gets a mutable reference to a stored object.
    ///
    /// # Arguments
    ///
    /// * `handle` - The handle to look up
    #[inline]
    pub fn get_mut(&mut self, handle: SlotHandle) -> Option<&mut T> {
        let page = self.pages.get_mut(handle.index as usize)?;
        if page.generation != handle.generation {
            return None;
        }
        page.value.as_mut()
    }

    /// Drops every stored object and returns all pages to the free stack.
    ///
    /// Pages are kept; every outstanding handle is invalidated.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, page) in self.pages.iter_mut().enumerate().rev() {
            if page.value.take().is_some() {
                page.generation = page.generation.wrapping_add(1);
            }
            // Page count never exceeds u32::MAX, see `allocate`.
            #[allow(clippy::cast_possible_truncation)]
            let index = index as u32;
            self.free.push(index);
        }
        self.live_count = 0;
    }

    /// Iterates over all stored objects in page order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotHandle, &T)> {
        self.pages.iter().enumerate().filter_map(|(index, page)| {
            #[allow(clippy::cast_possible_truncation)]
            let handle = SlotHandle {
                index: index as u32,
                generation: page.generation,
            };
            page.value.as_ref().map(|v| (handle, v))
        })
    }
}

impl<T> Default for SlotPool<T> {
    fn default() -> Self {
        Self::new()
    }
}
