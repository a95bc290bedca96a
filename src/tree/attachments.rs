//! Per-node attachments
//!
//! Each node carries exactly two key/value slots. This is not a map: a third
//! distinct key fails with [`LoggerError::AttachmentCapacity`] and leaves both
//! slots untouched.

use crate::core::error::{LoggerError, Result};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const SLOTS: usize = 2;

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(0);

/// Typed attachment key.
///
/// Keys compare by identity: two keys created with the same name are still
/// distinct.
///
/// # Example
///
/// ```
/// use logtree::{AttachmentKey, Namespace};
///
/// let owner: AttachmentKey<String> = AttachmentKey::new("owner");
/// let namespace = Namespace::new();
/// let logger = namespace.logger("app.db");
///
/// assert!(logger.attach(&owner, "storage-team".to_string()).unwrap().is_none());
/// assert_eq!(logger.attachment(&owner).as_deref().map(String::as_str), Some("storage-team"));
/// ```
pub struct AttachmentKey<T> {
    id: u64,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> AttachmentKey<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            id: NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed),
            name,
            _marker: PhantomData,
        }
    }
}

impl<T> AttachmentKey<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for AttachmentKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AttachmentKey<T> {}

impl<T> fmt::Debug for AttachmentKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttachmentKey({}#{})", self.name, self.id)
    }
}

type Value = Arc<dyn Any + Send + Sync>;

struct Slot {
    key: u64,
    value: Value,
}

fn downcast<T: Send + Sync + 'static>(value: Value) -> Option<Arc<T>> {
    value.downcast::<T>().ok()
}

#[derive(Default)]
pub(crate) struct Attachments {
    slots: Mutex<[Option<Slot>; SLOTS]>,
}

impl Attachments {
    pub(crate) fn get<T: Send + Sync + 'static>(&self, key: &AttachmentKey<T>) -> Option<Arc<T>> {
        let slots = self.slots.lock();
        slots
            .iter()
            .flatten()
            .find(|slot| slot.key == key.id)
            .and_then(|slot| downcast(Arc::clone(&slot.value)))
    }

    /// Store `value` under `key`, returning the value it replaced.
    pub(crate) fn attach<T: Send + Sync + 'static>(
        &self,
        owner: &str,
        key: &AttachmentKey<T>,
        value: T,
    ) -> Result<Option<Arc<T>>> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.iter_mut().flatten().find(|slot| slot.key == key.id) {
            let previous = std::mem::replace(&mut slot.value, Arc::new(value));
            return Ok(downcast(previous));
        }
        let free = Self::free_slot(&mut slots, owner, key)?;
        *free = Some(Slot {
            key: key.id,
            value: Arc::new(value),
        });
        Ok(None)
    }

    /// Store `value` only if `key` is not attached yet; returns the existing
    /// value otherwise.
    pub(crate) fn attach_if_absent<T: Send + Sync + 'static>(
        &self,
        owner: &str,
        key: &AttachmentKey<T>,
        value: T,
    ) -> Result<Option<Arc<T>>> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.iter().flatten().find(|slot| slot.key == key.id) {
            return Ok(downcast(Arc::clone(&slot.value)));
        }
        let free = Self::free_slot(&mut slots, owner, key)?;
        *free = Some(Slot {
            key: key.id,
            value: Arc::new(value),
        });
        Ok(None)
    }

    pub(crate) fn detach<T: Send + Sync + 'static>(&self, key: &AttachmentKey<T>) -> Option<Arc<T>> {
        let mut slots = self.slots.lock();
        let slot = slots
            .iter_mut()
            .find(|slot| matches!(slot, Some(s) if s.key == key.id))?;
        slot.take().and_then(|slot| downcast(slot.value))
    }

    pub(crate) fn clear(&self) {
        *self.slots.lock() = [None, None];
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.lock().iter().all(Option::is_none)
    }

    fn free_slot<'a, T>(
        slots: &'a mut [Option<Slot>; SLOTS],
        owner: &str,
        key: &AttachmentKey<T>,
    ) -> Result<&'a mut Option<Slot>> {
        slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or_else(|| LoggerError::attachment_capacity(owner, key.name))
    }
}
