use std::{cell::RefCell, rc::Rc};

use shadowbox::resources::ledger::{ResourceKind, ResourceLedger, TrackedMap};

/// Stand-in for a GPU object that records when it is destroyed.
struct Fake {
    label: &'static str,
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl Fake {
    fn destroy(&self) {
        self.log.borrow_mut().push(self.label);
    }
}

struct Stores {
    textures: TrackedMap<Fake>,
    buffers: TrackedMap<Fake>,
    shaders: TrackedMap<Fake>,
    pipelines: TrackedMap<Fake>,
}

fn startup(ledger: &mut ResourceLedger, log: &Rc<RefCell<Vec<&'static str>>>) -> Stores {
    let fake = |label| Fake {
        label,
        log: log.clone(),
    };
    let mut stores = Stores {
        textures: TrackedMap::new(ResourceKind::Texture),
        buffers: TrackedMap::new(ResourceKind::Buffer),
        shaders: TrackedMap::new(ResourceKind::ShaderModule),
        pipelines: TrackedMap::new(ResourceKind::Pipeline),
    };
    stores.textures.insert(ledger, "crate", fake("crate")).unwrap();
    stores.textures.insert(ledger, "skybox", fake("skybox")).unwrap();
    stores.buffers.insert(ledger, "cube", fake("cube")).unwrap();
    stores.shaders.insert(ledger, "default", fake("default")).unwrap();
    stores.pipelines.insert(ledger, "default", fake("pipeline")).unwrap();
    stores
}

#[test]
fn teardown_releases_everything_in_reverse() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut ledger = ResourceLedger::new();
    let mut stores = startup(&mut ledger, &log);
    assert_eq!(ledger.live_count(), 5);

    stores.pipelines.release_all(&mut ledger, Fake::destroy).unwrap();
    stores.shaders.release_all(&mut ledger, Fake::destroy).unwrap();
    stores.buffers.release_all(&mut ledger, Fake::destroy).unwrap();
    stores.textures.release_all(&mut ledger, Fake::destroy).unwrap();

    ledger.ensure_drained().unwrap();
    assert_eq!(
        *log.borrow(),
        ["pipeline", "default", "cube", "skybox", "crate"]
    );
    assert_eq!(ledger.release_order().len(), 5);
    assert!(stores.textures.is_empty());
}

#[test]
fn forgotten_store_is_reported_as_a_leak() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut ledger = ResourceLedger::new();
    let mut stores = startup(&mut ledger, &log);

    stores.pipelines.release_all(&mut ledger, Fake::destroy).unwrap();
    stores.shaders.release_all(&mut ledger, Fake::destroy).unwrap();

    let err = ledger.ensure_drained().unwrap_err().to_string();
    assert!(err.contains("crate"), "{err}");
    assert!(err.contains("cube"), "{err}");
    assert_eq!(ledger.live_count(), 3);
}

#[test]
fn releasing_a_store_twice_is_harmless() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut ledger = ResourceLedger::new();
    let mut stores = startup(&mut ledger, &log);

    stores.buffers.release_all(&mut ledger, Fake::destroy).unwrap();
    stores.buffers.release_all(&mut ledger, Fake::destroy).unwrap();
    assert_eq!(*log.borrow(), ["cube"]);
}
