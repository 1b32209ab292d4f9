//! Concurrency behavior: CAS linearizability under contention, interning
//! races, and single-decode cache population.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use duraref::{
    standard_runtime, Backend, BackendRegistry, CodecRegistry, GzipTransform, InnerUri, JsonCodec,
    MemoryBackend, OpOptions, PersistOptions, Runtime, StoreResult, Versioned,
};
use serde_json::json;

fn opts() -> OpOptions {
    OpOptions::default()
}

// ---------------------------------------------------------------------------
// CAS under contention
// ---------------------------------------------------------------------------

#[test]
fn concurrent_swaps_count_every_increment() {
    const THREADS: usize = 10;
    const SWAPS_PER_THREAD: usize = 100;

    let rt = standard_runtime();
    let uri = "atomic:mem://t/ctr.json";

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let rt = Arc::clone(&rt);
            thread::spawn(move || {
                let r = rt.reference(uri).unwrap();
                for _ in 0..SWAPS_PER_THREAD {
                    r.atomic_swap(
                        &|old| match old {
                            Some(v) => json!(v.as_i64().unwrap() + 1),
                            None => json!(1),
                        },
                        &OpOptions::default(),
                    )
                    .unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().expect("thread should not panic");
    }

    let total = rt.value(uri, &opts()).unwrap().unwrap();
    assert_eq!(*total, json!((THREADS * SWAPS_PER_THREAD) as i64));
}

// ---------------------------------------------------------------------------
// Interning races
// ---------------------------------------------------------------------------

#[test]
fn concurrent_persists_converge_on_one_canonical() {
    let rt = standard_runtime();
    let payload = json!({"shared": "payload"});

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let rt = Arc::clone(&rt);
            let payload = payload.clone();
            thread::spawn(move || rt.persist("mem://t", payload, &PersistOptions::new()).unwrap())
        })
        .collect();

    let refs: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread should not panic"))
        .collect();

    for r in &refs[1..] {
        assert!(refs[0].same_instance(r));
    }
}

// ---------------------------------------------------------------------------
// Single decode per cache miss
// ---------------------------------------------------------------------------

/// Backend wrapper that counts reads, to observe cache population.
struct CountingBackend {
    inner: MemoryBackend,
    reads: AtomicUsize,
}

impl CountingBackend {
    fn new() -> Self {
        Self {
            inner: MemoryBackend::new(),
            reads: AtomicUsize::new(0),
        }
    }
}

impl Backend for CountingBackend {
    fn scheme(&self) -> &str {
        "mem"
    }

    fn read(&self, uri: &InnerUri, opts: &OpOptions) -> StoreResult<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(uri, opts)
    }

    fn write(&self, uri: &InnerUri, bytes: &[u8], opts: &OpOptions) -> StoreResult<()> {
        self.inner.write(uri, bytes, opts)
    }

    fn delete(&self, uri: &InnerUri, opts: &OpOptions) -> StoreResult<()> {
        self.inner.delete(uri, opts)
    }

    fn supports_versioning(&self) -> bool {
        true
    }

    fn read_versioned(&self, uri: &InnerUri, opts: &OpOptions) -> StoreResult<Option<Versioned>> {
        self.inner.read_versioned(uri, opts)
    }

    fn write_versioned(
        &self,
        uri: &InnerUri,
        bytes: &[u8],
        expected: Option<u64>,
        opts: &OpOptions,
    ) -> StoreResult<bool> {
        self.inner.write_versioned(uri, bytes, expected, opts)
    }
}

#[test]
fn concurrent_derefs_read_storage_once() {
    let backend = Arc::new(CountingBackend::new());
    let mut codecs = CodecRegistry::new();
    codecs.register_codec(JsonCodec::SUFFIX, Arc::new(JsonCodec::new()));
    codecs.register_transform(GzipTransform::SUFFIX, Arc::new(GzipTransform::new()));
    let mut backends = BackendRegistry::new();
    backends.register(Arc::clone(&backend) as Arc<dyn Backend>);
    let rt = Runtime::new(codecs, backends);

    let persisted = rt
        .persist("mem://t", json!({"expensive": "decode"}), &PersistOptions::new())
        .unwrap();
    persisted.evict(); // cold cache; all aliases share this canonical

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let r = persisted.clone();
            thread::spawn(move || r.deref(&OpOptions::default()).unwrap())
        })
        .collect();

    let values: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread should not panic"))
        .collect();

    // Every thread saw the same shared allocation.
    for v in &values[1..] {
        assert!(Arc::ptr_eq(&values[0], v));
    }
    // Population was serialized: storage was read exactly once.
    assert_eq!(backend.reads.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Origin recovery across threads
// ---------------------------------------------------------------------------

#[test]
fn existing_ref_is_stable_across_threads() {
    let rt = standard_runtime();
    let r = rt
        .persist("mem://t", json!({"origin": "here"}), &PersistOptions::new())
        .unwrap();
    let value = r.deref(&opts()).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let rt = Arc::clone(&rt);
            let value = Arc::clone(&value);
            thread::spawn(move || rt.existing_ref(&value).expect("origin should be live"))
        })
        .collect();

    for h in handles {
        let recovered = h.join().expect("thread should not panic");
        assert!(r.same_instance(&recovered));
    }
}
