//! Background workers for height sampling and mesh builds
//!
//! Jobs are CPU bound, so they run on tokio's blocking pool. A semaphore
//! caps how many run at once; queued jobs wait for a permit in FIFO order.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::Vec2;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Semaphore;

use crate::core::{Result, StreamerConfig};
use crate::mesh::{HeightSampleGrid, MeshSettings, build_mesh, sample_offset};
use crate::streaming::provider::{
    CompletionSender, HeightMapProvider, HeightRequest, MeshBuildService, MeshRequest,
};

/// Bounded pool of blocking workers
pub struct WorkerPool {
    /// Owned runtime, `None` when running on a borrowed handle
    runtime: Option<Runtime>,
    handle: Handle,
    permits: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    threads: usize,
}

impl WorkerPool {
    /// Create a pool with its own runtime running at most `threads` jobs at once
    pub fn new(threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(threads)
            .thread_name("terrain-worker")
            .build()?;
        let handle = runtime.handle().clone();
        log::info!("Worker pool started with {} threads", threads);
        let mut pool = Self::with_handle(handle, threads);
        pool.runtime = Some(runtime);
        Ok(pool)
    }

    /// Run jobs on an existing runtime.
    pub fn with_handle(handle: Handle, threads: usize) -> Self {
        let threads = threads.max(1);
        Self {
            runtime: None,
            handle,
            permits: Arc::new(Semaphore::new(threads)),
            pending: Arc::new(AtomicUsize::new(0)),
            threads,
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Jobs queued or running
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Queue `job` to run on a blocking worker
    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let pending = Arc::clone(&self.pending);
        pending.fetch_add(1, Ordering::AcqRel);

        self.handle.spawn(async move {
            match permits.acquire_owned().await {
                Ok(_permit) => {
                    if let Err(e) = tokio::task::spawn_blocking(job).await {
                        log::error!("Worker job panicked: {}", e);
                    }
                }
                Err(_) => log::warn!("Worker pool closed, dropping job"),
            }
            pending.fetch_sub(1, Ordering::AcqRel);
        });
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.permits.close();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// [`MeshBuildService`] running [`build_mesh`] on a [`WorkerPool`].
///
/// Mesh settings are taken from the streamer config so builds always match
/// the config the streamer was created with.
pub struct ThreadedMeshBuilder {
    pool: Arc<WorkerPool>,
    settings: Arc<MeshSettings>,
}

impl ThreadedMeshBuilder {
    pub fn new(pool: Arc<WorkerPool>, config: &StreamerConfig) -> Self {
        Self { pool, settings: Arc::new(config.mesh.clone()) }
    }

    pub fn settings(&self) -> &MeshSettings {
        &self.settings
    }
}

impl MeshBuildService for ThreadedMeshBuilder {
    fn request_mesh(&self, request: MeshRequest, reply: CompletionSender) {
        let settings = Arc::clone(&self.settings);
        self.pool.spawn(move || {
            let MeshRequest { coord, lod_index, lod, grid } = request;
            let result = build_mesh(&grid, &settings, lod);
            if reply.mesh(coord, lod_index, result).is_err() {
                log::debug!("Streamer gone, dropping mesh for chunk {}", coord);
            }
        });
    }
}

/// Height function sampled in chunk space
pub trait HeightSource: Send + Sync + 'static {
    fn height(&self, position: Vec2) -> f32;
}

impl<F> HeightSource for F
where
    F: Fn(Vec2) -> f32 + Send + Sync + 'static,
{
    fn height(&self, position: Vec2) -> f32 {
        self(position)
    }
}

/// Sample a bordered grid centred on `center`
pub fn sample_grid<S: HeightSource + ?Sized>(
    source: &S,
    center: Vec2,
    bordered_size: usize,
) -> HeightSampleGrid {
    HeightSampleGrid::from_fn_par(bordered_size, |x, y| {
        source.height(center + sample_offset(bordered_size, x, y))
    })
}

/// [`HeightMapProvider`] sampling a [`HeightSource`] on a [`WorkerPool`]
pub struct GridHeightProvider<S> {
    pool: Arc<WorkerPool>,
    source: Arc<S>,
}

impl<S: HeightSource> GridHeightProvider<S> {
    pub fn new(pool: Arc<WorkerPool>, source: S) -> Self {
        Self { pool, source: Arc::new(source) }
    }
}

impl<S: HeightSource> HeightMapProvider for GridHeightProvider<S> {
    fn request_height_data(&self, request: HeightRequest, reply: CompletionSender) {
        let source = Arc::clone(&self.source);
        self.pool.spawn(move || {
            let grid = sample_grid(source.as_ref(), request.center, request.bordered_size);
            if reply.height_data(request.coord, grid).is_err() {
                log::debug!("Streamer gone, dropping heights for chunk {}", request.coord);
            }
        });
    }
}
