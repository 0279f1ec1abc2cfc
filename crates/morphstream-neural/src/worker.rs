//! Background inference worker.
//!
//! One dedicated thread, one request in flight. The audio thread hands a
//! request over with [`InferenceWorker::submit`] (bounded copy, no allocation)
//! and polls [`InferenceWorker::is_busy`]; the worker sleeps on a condvar
//! while idle and splices its result into the request's destination ring.

use crate::backend::{BackendFactory, MorphBackend, TensorShape};
use crate::cycle::{CyclePath, MorphCycle};
use crate::error::{Error, Result, SubmitError};
use crossbeam_channel::Sender;
use morphstream_core::{ControlSnapshot, SharedRingBuffer, StereoSample, StreamConfig};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use thread_priority::ThreadPriority;

/// Counters since the worker started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub cycles: u64,
    pub fast_path_cycles: u64,
    pub inference_failures: u64,
}

/// Request handed from `submit` to the worker thread.
struct RequestSlot {
    source: Box<[StereoSample]>,
    reference: Box<[StereoSample]>,
    controls: ControlSnapshot,
    destination: Option<SharedRingBuffer>,
    pending: bool,
}

struct Shared {
    slot: Mutex<RequestSlot>,
    wake: Condvar,
    idle: Condvar,
    busy: AtomicBool,
    running: AtomicBool,
    alive: AtomicBool,
    cycles: AtomicU64,
    fast_path_cycles: AtomicU64,
    inference_failures: AtomicU64,
}

impl Shared {
    fn mark_idle(&self) {
        let _slot = self.slot.lock();
        self.busy.store(false, Ordering::Release);
        self.idle.notify_all();
    }
}

/// Marks the worker dead and releases waiters however the thread exits.
struct ExitGuard(Arc<Shared>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.alive.store(false, Ordering::Release);
        self.0.mark_idle();
    }
}

pub struct InferenceWorker {
    shared: Arc<Shared>,
    window_len: usize,
    thread: Option<JoinHandle<()>>,
}

impl InferenceWorker {
    /// Spawn the worker thread and block until it is ready.
    ///
    /// On the new thread: build the backend, check its tensor shape against
    /// `config`, run `config.warmup_iterations` zeroed inferences. Any failure
    /// there is returned here and the thread exits.
    pub fn start(config: &StreamConfig, backend_factory: BackendFactory) -> Result<Self> {
        config.validate()?;

        let w = config.window_len();
        let shared = Arc::new(Shared {
            slot: Mutex::new(RequestSlot {
                source: vec![StereoSample::SILENCE; w].into_boxed_slice(),
                reference: vec![StereoSample::SILENCE; w].into_boxed_slice(),
                controls: ControlSnapshot::default(),
                destination: None,
                pending: false,
            }),
            wake: Condvar::new(),
            idle: Condvar::new(),
            busy: AtomicBool::new(false),
            running: AtomicBool::new(true),
            alive: AtomicBool::new(true),
            cycles: AtomicU64::new(0),
            fast_path_cycles: AtomicU64::new(0),
            inference_failures: AtomicU64::new(0),
        });

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<()>>(1);
        let thread_shared = Arc::clone(&shared);
        let cycle = MorphCycle::new(config);
        let warmup_iterations = config.warmup_iterations;

        let thread = std::thread::Builder::new()
            .name("morph-inference".into())
            .spawn(move || {
                let _guard = ExitGuard(Arc::clone(&thread_shared));
                if thread_priority::set_current_thread_priority(ThreadPriority::Max).is_err() {
                    tracing::debug!("Could not raise inference thread priority");
                }

                let Some((cycle, backend)) =
                    init_backend(cycle, backend_factory, warmup_iterations, &ready_tx)
                else {
                    return;
                };
                drop(ready_tx);
                worker_loop(&thread_shared, cycle, backend);
            })
            .map_err(Error::WorkerSpawn)?;

        let mut worker = Self {
            shared,
            window_len: w,
            thread: Some(thread),
        };

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(worker),
            Ok(Err(e)) => {
                worker.shutdown();
                Err(e)
            }
            Err(_) => {
                worker.shutdown();
                Err(Error::WorkerInit)
            }
        }
    }

    /// Samples per input window this worker accepts.
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// Whether the worker thread is still accepting requests.
    pub fn is_running(&self) -> bool {
        self.shared.alive.load(Ordering::Acquire) && self.shared.running.load(Ordering::Acquire)
    }

    /// Hand one window pair to the worker and wake it.
    ///
    /// Copies both windows and the controls into worker-owned storage and
    /// returns immediately. A request made while busy is refused, never
    /// queued and never allowed to overwrite the one in flight.
    pub fn submit(
        &self,
        source: &[StereoSample],
        reference: &[StereoSample],
        controls: ControlSnapshot,
        destination: &SharedRingBuffer,
    ) -> std::result::Result<(), SubmitError> {
        for len in [source.len(), reference.len()] {
            if len != self.window_len {
                return Err(SubmitError::WindowLength {
                    expected: self.window_len,
                    actual: len,
                });
            }
        }
        if !self.is_running() {
            return Err(SubmitError::Stopped);
        }
        if self.shared.busy.swap(true, Ordering::AcqRel) {
            return Err(SubmitError::Busy);
        }

        let mut slot = self.shared.slot.lock();
        slot.source.copy_from_slice(source);
        slot.reference.copy_from_slice(reference);
        slot.controls = controls;
        slot.destination = Some(Arc::clone(destination));
        slot.pending = true;
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Block until no request is in flight. Not for the audio thread.
    pub fn wait_idle(&self) {
        let mut slot = self.shared.slot.lock();
        while self.shared.busy.load(Ordering::Acquire) {
            self.shared.idle.wait(&mut slot);
        }
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            cycles: self.shared.cycles.load(Ordering::Relaxed),
            fast_path_cycles: self.shared.fast_path_cycles.load(Ordering::Relaxed),
            inference_failures: self.shared.inference_failures.load(Ordering::Relaxed),
        }
    }

    /// Let any in-flight request finish, then stop and join the thread.
    pub fn shutdown(&mut self) {
        {
            let _slot = self.shared.slot.lock();
            self.shared.running.store(false, Ordering::Release);
            self.shared.wake.notify_all();
        }
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::error!("Inference thread panicked");
            }
            tracing::info!("Inference worker stopped");
        }
    }
}

impl Drop for InferenceWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn init_backend(
    mut cycle: MorphCycle,
    factory: BackendFactory,
    warmup_iterations: usize,
    ready_tx: &Sender<Result<()>>,
) -> Option<(MorphCycle, Box<dyn MorphBackend>)> {
    let expected: TensorShape = cycle.shape();

    let result = factory(expected).map_err(Error::from).and_then(|mut backend| {
        let actual = backend.shape();
        if actual != expected {
            return Err(Error::ShapeMismatch { expected, actual });
        }

        let name = backend.capabilities().name;
        let started = Instant::now();
        cycle.warmup(backend.as_mut(), warmup_iterations)?;
        tracing::info!(
            "Inference worker ready (backend: {}, shape: {}, warm-up: {} runs in {:?})",
            name,
            expected,
            warmup_iterations,
            started.elapsed()
        );
        Ok(backend)
    });

    match result {
        Ok(backend) => {
            let _ = ready_tx.send(Ok(()));
            Some((cycle, backend))
        }
        Err(e) => {
            tracing::error!("Inference worker init failed: {}", e);
            let _ = ready_tx.send(Err(e));
            None
        }
    }
}

fn worker_loop(shared: &Shared, mut cycle: MorphCycle, mut backend: Box<dyn MorphBackend>) {
    loop {
        let destination = {
            let mut slot = shared.slot.lock();
            while !slot.pending && shared.running.load(Ordering::Acquire) {
                shared.wake.wait(&mut slot);
            }
            if !slot.pending {
                return;
            }
            slot.pending = false;

            let slot = &mut *slot;
            cycle.swap_request(&mut slot.source, &mut slot.reference, slot.controls);
            slot.destination.take()
        };

        let started = Instant::now();
        let path = cycle.compute(backend.as_mut());
        match path {
            CyclePath::FastPath => {
                shared.fast_path_cycles.fetch_add(1, Ordering::Relaxed);
            }
            CyclePath::Fallback => {
                shared.inference_failures.fetch_add(1, Ordering::Relaxed);
            }
            CyclePath::Inference => {}
        }

        if let Some(ring) = destination {
            let mut ring = ring.lock();
            cycle.splice_into(&mut ring);
        }

        shared.cycles.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Morph cycle done ({:?}, {:?})", path, started.elapsed());
        shared.mark_idle();
    }
}
