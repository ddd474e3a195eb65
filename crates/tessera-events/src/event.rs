//! Type-erased event values.
//!
//! An [`Event`] owns exactly one value of any `'static` type. Values that fit
//! in [`INLINE_SIZE`] bytes with an alignment of at most [`INLINE_ALIGN`] are
//! stored inline; anything else is boxed. The choice is made per payload type
//! at compile time.
//!
//! The payload is dropped exactly once: by the `Event` that owns it, or never
//! if it was moved out with [`Event::into_inner`].

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, ManuallyDrop, MaybeUninit};
use std::ptr::{self, NonNull};

use crate::EventError;

/// Largest payload size stored without a heap allocation.
pub const INLINE_SIZE: usize = 32;
/// Largest payload alignment stored without a heap allocation.
pub const INLINE_ALIGN: usize = 16;

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[repr(C, align(16))]
struct InlineBuf([MaybeUninit<u8>; INLINE_SIZE]);

enum Storage {
    Inline(InlineBuf),
    Heap(NonNull<u8>),
}

/// Per-type operations on an erased payload.
struct Vtable {
    type_id: fn() -> TypeId,
    type_name: fn() -> &'static str,
    /// Drop the payload held by the storage. Called at most once.
    drop: unsafe fn(&mut Storage),
}

struct Erased<T>(PhantomData<T>);

impl<T: 'static> Erased<T> {
    const INLINE: bool =
        mem::size_of::<T>() <= INLINE_SIZE && mem::align_of::<T>() <= INLINE_ALIGN;

    const VTABLE: Vtable = Vtable {
        type_id: TypeId::of::<T>,
        type_name: std::any::type_name::<T>,
        drop: Self::drop_payload,
    };

    /// # Safety
    ///
    /// `storage` must hold a live `T` written by [`Event::new`].
    unsafe fn drop_payload(storage: &mut Storage) {
        match storage {
            Storage::Inline(buf) => unsafe { ptr::drop_in_place(buf.0.as_mut_ptr().cast::<T>()) },
            Storage::Heap(p) => drop(unsafe { Box::from_raw(p.as_ptr().cast::<T>()) }),
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// An owned value of some `'static` type, checked on access.
///
/// ```
/// use tessera_events::Event;
///
/// let event = Event::new(42u32);
/// assert!(event.is::<u32>());
/// assert_eq!(*event.value::<u32>(), 42);
/// assert_eq!(event.downcast_ref::<i64>(), None);
/// ```
pub struct Event {
    storage: Storage,
    vtable: &'static Vtable,
}

impl Event {
    /// Wrap `value`, inline if it is small enough, boxed otherwise.
    pub fn new<T: 'static>(value: T) -> Self {
        let storage = if Erased::<T>::INLINE {
            let mut buf = InlineBuf([MaybeUninit::uninit(); INLINE_SIZE]);
            // SAFETY: `T` fits the buffer in size and alignment.
            unsafe { buf.0.as_mut_ptr().cast::<T>().write(value) };
            Storage::Inline(buf)
        } else {
            Storage::Heap(NonNull::from(Box::leak(Box::new(value))).cast::<u8>())
        };
        Self {
            storage,
            vtable: &Erased::<T>::VTABLE,
        }
    }

    /// Whether the payload is a `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        (self.vtable.type_id)() == TypeId::of::<T>()
    }

    /// The payload if it is a `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        if !self.is::<T>() {
            return None;
        }
        // SAFETY: the type check above matched the stored type.
        Some(unsafe { &*self.payload().cast::<T>() })
    }

    /// The payload as a `T`.
    ///
    /// # Panics
    ///
    /// Panics if the payload is not a `T`.
    pub fn value<T: 'static>(&self) -> &T {
        match self.try_value::<T>() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// The payload as a `T`, or a [`EventError::TypeMismatch`].
    pub fn try_value<T: 'static>(&self) -> Result<&T, EventError> {
        self.downcast_ref::<T>().ok_or_else(|| EventError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            found: self.type_name(),
        })
    }

    /// Move the payload out. Gives the event back unchanged if it does not
    /// hold a `T`.
    pub fn into_inner<T: 'static>(self) -> Result<T, Event> {
        if !self.is::<T>() {
            return Err(self);
        }
        let this = ManuallyDrop::new(self);
        // SAFETY: the payload is a `T`; `this` is never dropped, so the value
        // is read out exactly once and the box is freed exactly once.
        let value = match &this.storage {
            Storage::Inline(buf) => unsafe { buf.0.as_ptr().cast::<T>().read() },
            Storage::Heap(p) => *unsafe { Box::from_raw(p.as_ptr().cast::<T>()) },
        };
        Ok(value)
    }

    /// Name of the payload type, for diagnostics.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        (self.vtable.type_name)()
    }

    /// Whether the payload lives in the inline buffer.
    #[inline]
    pub fn is_inline(&self) -> bool {
        matches!(self.storage, Storage::Inline(_))
    }

    fn payload(&self) -> *const u8 {
        match &self.storage {
            Storage::Inline(buf) => buf.0.as_ptr().cast::<u8>(),
            Storage::Heap(p) => p.as_ptr(),
        }
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        // SAFETY: the storage still owns its payload; `into_inner` bypasses
        // this impl.
        unsafe { (self.vtable.drop)(&mut self.storage) }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("type", &self.type_name())
            .field("inline", &self.is_inline())
            .finish()
    }
}
