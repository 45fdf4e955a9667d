//! Bookkeeping for GPU resource lifetimes.
//!
//! Every buffer, texture, shader module, pipeline and bind group a store or
//! the renderer creates is recorded here. Shutdown walks the ledger backwards
//! so resources are released in reverse acquisition order, and each handle can
//! be released exactly once.

use std::collections::HashMap;

use anyhow::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Texture,
    Buffer,
    ShaderModule,
    Pipeline,
    BindGroup,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(u64);

#[derive(Clone, Debug)]
struct Entry {
    kind: ResourceKind,
    label: String,
}

#[derive(Debug, Default)]
pub struct ResourceLedger {
    next: u64,
    live: HashMap<ResourceHandle, Entry>,
    released: Vec<ResourceHandle>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, kind: ResourceKind, label: impl Into<String>) -> ResourceHandle {
        let handle = ResourceHandle(self.next);
        self.next += 1;
        let label = label.into();
        log::trace!("acquired {kind:?} {label:?} as {handle:?}");
        self.live.insert(handle, Entry { kind, label });
        handle
    }

    pub fn release(&mut self, handle: ResourceHandle) -> Result<()> {
        match self.live.remove(&handle) {
            Some(entry) => {
                log::trace!("released {:?} {:?}", entry.kind, entry.label);
                self.released.push(handle);
                Ok(())
            }
            None if self.released.contains(&handle) => {
                bail!("{handle:?} was already released")
            }
            None => bail!("{handle:?} was never acquired"),
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Handles in the order they were released.
    pub fn release_order(&self) -> &[ResourceHandle] {
        &self.released
    }

    /// Fails if anything is still live, naming what leaked.
    pub fn ensure_drained(&self) -> Result<()> {
        if self.live.is_empty() {
            return Ok(());
        }
        let mut leaked: Vec<_> = self.live.iter().collect();
        leaked.sort_by_key(|(handle, _)| **handle);
        let names: Vec<String> = leaked
            .iter()
            .map(|(_, entry)| format!("{:?} {:?}", entry.kind, entry.label))
            .collect();
        bail!(
            "{} resources still live after shutdown: {}",
            names.len(),
            names.join(", ")
        )
    }
}

/// A resource together with its ledger handle.
#[derive(Debug)]
pub struct Tracked<T> {
    pub name: String,
    pub handle: ResourceHandle,
    pub value: T,
}

/// Name keyed resources kept in acquisition order.
#[derive(Debug)]
pub struct TrackedMap<T> {
    kind: ResourceKind,
    entries: Vec<Tracked<T>>,
    index: HashMap<String, usize>,
}

impl<T> TrackedMap<T> {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn insert(&mut self, ledger: &mut ResourceLedger, name: &str, value: T) -> Result<()> {
        ensure!(
            !self.index.contains_key(name),
            "{:?} {name:?} is already registered",
            self.kind
        );
        let handle = ledger.acquire(self.kind, name);
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(Tracked {
            name: name.to_string(),
            handle,
            value,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&i| &self.entries[i].value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Releases everything newest first, handing each value to `destroy`.
    pub fn release_all(
        &mut self,
        ledger: &mut ResourceLedger,
        mut destroy: impl FnMut(&T),
    ) -> Result<()> {
        self.index.clear();
        while let Some(entry) = self.entries.pop() {
            destroy(&entry.value);
            ledger
                .release(entry.handle)
                .with_context(|| format!("releasing {:?} {:?}", self.kind, entry.name))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_twice_is_an_error() {
        let mut ledger = ResourceLedger::new();
        let handle = ledger.acquire(ResourceKind::Buffer, "vbo");
        ledger.release(handle).unwrap();
        let err = ledger.release(handle).unwrap_err();
        assert!(err.to_string().contains("already released"));
    }

    #[test]
    fn unknown_handle_is_an_error() {
        let mut ledger = ResourceLedger::new();
        let mut other = ResourceLedger::new();
        other.acquire(ResourceKind::Texture, "a");
        let foreign = other.acquire(ResourceKind::Texture, "b");
        assert!(ledger.release(foreign).is_err());
    }

    #[test]
    fn leaks_are_reported_by_name() {
        let mut ledger = ResourceLedger::new();
        ledger.acquire(ResourceKind::Texture, "crate");
        let err = ledger.ensure_drained().unwrap_err();
        assert!(err.to_string().contains("crate"));
    }

    #[test]
    fn map_releases_newest_first() {
        let mut ledger = ResourceLedger::new();
        let mut map = TrackedMap::new(ResourceKind::Texture);
        for name in ["a", "b", "c"] {
            map.insert(&mut ledger, name, name.to_uppercase()).unwrap();
        }
        let mut destroyed = Vec::new();
        map.release_all(&mut ledger, |v| destroyed.push(v.clone()))
            .unwrap();
        assert_eq!(destroyed, ["C", "B", "A"]);
        assert!(map.is_empty());
        ledger.ensure_drained().unwrap();
        let order = ledger.release_order();
        assert!(order.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut ledger = ResourceLedger::new();
        let mut map = TrackedMap::new(ResourceKind::Buffer);
        map.insert(&mut ledger, "cube", 1).unwrap();
        assert!(map.insert(&mut ledger, "cube", 2).is_err());
        assert_eq!(map.get("cube"), Some(&1));
        assert_eq!(ledger.live_count(), 1);
    }
}
