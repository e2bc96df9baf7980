//! Resource equivalence and capability declarations.
//!
//! Memory resources need two things from each other: a way to tell whether
//! memory allocated from one may be released through another, and a way for
//! generic code to know what kind of memory a resource hands out without
//! asking it at runtime.
//!
//! Equivalence is expressed with [`EquivalentTo`]. Same-type comparison
//! comes for free from [`ResourceEquivalence`], whose default is identity
//! (the same object). Types with a richer notion override
//! [`ResourceEquivalence::is_equivalent`]. Heterogeneous comparisons are
//! opt-in with an explicit `impl EquivalentTo<Other> for Mine`; inequality is
//! always derived from equality.
//!
//! Capabilities are marker traits ([`HostAccessible`], [`DeviceAccessible`]).
//! They carry no state and are checked by trait bounds at compile time.
//! [`Capabilities`] lists the [`Property`] names a resource type declares so
//! generic code can inspect them without an instance.

use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};

use crate::error::{NativeError, ResourceKind, StreamError, StreamResult};

/// Same-type equivalence with an identity default.
pub trait ResourceEquivalence {
    /// Whether memory allocated from `self` can be released through `other`
    /// and vice versa. Defaults to "same object".
    fn is_equivalent(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

/// Equivalence against a possibly different resource type.
pub trait EquivalentTo<Rhs: ?Sized> {
    /// Whether `self` and `rhs` are interchangeable.
    fn equals(&self, rhs: &Rhs) -> bool;

    /// Negation of [`equals`](Self::equals).
    fn not_equals(&self, rhs: &Rhs) -> bool {
        !self.equals(rhs)
    }
}

impl<R: ResourceEquivalence> EquivalentTo<R> for R {
    fn equals(&self, rhs: &R) -> bool {
        self.is_equivalent(rhs)
    }
}

/// Whether `left` and `right` are equivalent resources.
pub fn equals<L, R>(left: &L, right: &R) -> bool
where
    L: EquivalentTo<R> + ?Sized,
    R: ?Sized,
{
    left.equals(right)
}

/// Whether `left` and `right` are not equivalent resources.
pub fn not_equals<L, R>(left: &L, right: &R) -> bool
where
    L: EquivalentTo<R> + ?Sized,
    R: ?Sized,
{
    left.not_equals(right)
}

/// A capability a resource type can declare.
pub trait Property {
    /// Name of the capability.
    const NAME: &'static str;
}

/// Memory from this resource can be dereferenced by the host.
pub trait HostAccessible {}

/// Memory from this resource can be dereferenced by the device.
pub trait DeviceAccessible {}

/// Tag for [`HostAccessible`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostAccessibleProperty;

impl Property for HostAccessibleProperty {
    const NAME: &'static str = "host_accessible";
}

/// Tag for [`DeviceAccessible`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAccessibleProperty;

impl Property for DeviceAccessibleProperty {
    const NAME: &'static str = "device_accessible";
}

/// Properties declared by a resource type.
pub trait Capabilities {
    /// Names of the declared properties.
    const PROPERTIES: &'static [&'static str];

    /// Whether property `P` is declared.
    fn declares<P: Property>() -> bool {
        Self::PROPERTIES.contains(&P::NAME)
    }
}

/// Compile-time check that `R` declares host accessibility.
pub const fn assert_host_accessible<R: HostAccessible + ?Sized>() {}

/// Compile-time check that `R` declares device accessibility.
pub const fn assert_device_accessible<R: DeviceAccessible + ?Sized>() {}

/// A resource allocating host memory.
///
/// Every implementor is [`HostAccessible`] without having to say so.
pub trait HostMemoryResource: ResourceEquivalence {
    /// Allocate `bytes` bytes aligned to `alignment`.
    fn allocate(&self, bytes: usize, alignment: usize) -> StreamResult<NonNull<u8>>;

    /// Release memory returned by [`allocate`](Self::allocate) with the same
    /// size and alignment.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate(bytes, alignment)` on this resource or an
    /// equivalent one, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize, alignment: usize);
}

impl<R: HostMemoryResource + ?Sized> HostAccessible for R {}

impl<R: HostMemoryResource + ?Sized> Capabilities for R {
    const PROPERTIES: &'static [&'static str] = &[HostAccessibleProperty::NAME];
}

/// Host resource backed by the global allocator.
///
/// All instances are equivalent: memory from one can be freed by another.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHostResource;

impl SystemHostResource {
    fn layout(bytes: usize, alignment: usize) -> StreamResult<Layout> {
        Layout::from_size_align(bytes.max(1), alignment).map_err(|e| {
            StreamError::InvalidConfig(format!(
                "invalid host allocation (bytes={bytes}, alignment={alignment}): {e}"
            ))
        })
    }
}

impl ResourceEquivalence for SystemHostResource {
    fn is_equivalent(&self, _other: &Self) -> bool {
        true
    }
}

impl HostMemoryResource for SystemHostResource {
    fn allocate(&self, bytes: usize, alignment: usize) -> StreamResult<NonNull<u8>> {
        let layout = Self::layout(bytes, alignment)?;
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        NonNull::new(raw).ok_or_else(|| StreamError::ResourceCreation {
            resource: ResourceKind::HostMemory,
            status: NativeError::new(2, "ERROR_OUT_OF_MEMORY"),
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize, alignment: usize) {
        if let Ok(layout) = Self::layout(bytes, alignment) {
            // SAFETY: caller guarantees ptr came from allocate with this layout.
            unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
        }
    }
}
