mod queue;
mod task;

pub use queue::LockFreeQueue;
pub use task::TaskSystem;

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use log::{error, info, warn};

use crate::{
    canvas::{Canvas, ToneMap},
    integrators::Integrator,
    math::XorShift128,
    scene::Scene,
};

#[derive(Clone, Debug)]
pub struct RenderSettings {
    /// Hard wall-clock stop, snapshots included.
    pub deadline: Duration,
    /// Cadence of the preview snapshots.
    pub snapshot_period: Duration,
    pub tone_map: ToneMap,
    /// Directory the numbered snapshots land in.
    pub output_dir: PathBuf,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(272),
            snapshot_period: Duration::from_secs(30),
            tone_map: ToneMap::default(),
            output_dir: PathBuf::from("img"),
        }
    }
}

/// One unit of queue work: a full sweep of the pixel grid for a single
/// sample pass. Passes of one pixel serialize through the queue while the
/// grid inside a pass runs pixel by pixel on one worker.
struct SamplePass {
    width: u32,
    height: u32,
}

/// Per-worker state, exclusively owned by its thread.
struct ThreadData {
    rng: XorShift128,
    inv_samples: f32,
}

pub struct RenderStats {
    pub completed_passes: usize,
    pub total_passes: usize,
    pub secs: f32,
}

/// Renders `scene` into `canvas` and blocks until done or out of time.
///
/// Spawns one worker under the logical core count and a monitor thread that
/// writes numbered previews and enforces the deadline. The final image is
/// written after the workers have joined, so it is fully consistent.
pub fn render(
    scene: Arc<Scene>,
    canvas: Arc<Canvas>,
    integrator: Arc<dyn Integrator>,
    settings: &RenderSettings,
) -> RenderStats {
    let start = Instant::now();
    let total_passes = scene.samples as usize;

    let worker_count = num_cpus::get().saturating_sub(1).max(1);
    let mut tasks: TaskSystem<SamplePass> = TaskSystem::new(worker_count);
    for _ in 0..total_passes {
        tasks.enqueue(SamplePass {
            width: scene.width,
            height: scene.height,
        });
    }

    info!(
        "Renderer: {} passes of {}x{} on {} workers",
        total_passes, scene.width, scene.height, worker_count
    );

    // One-way cancellation flag, polled once per pixel
    let is_finish = Arc::new(AtomicBool::new(false));
    let completed = Arc::new(AtomicUsize::new(0));
    let snapshot_counter = Arc::new(AtomicU32::new(0));

    {
        let init_scene = Arc::clone(&scene);
        let scene = Arc::clone(&scene);
        let canvas = Arc::clone(&canvas);
        let is_finish = Arc::clone(&is_finish);
        let completed = Arc::clone(&completed);
        tasks.run(
            move |worker_id| ThreadData {
                // Offset keeps worker 0 off the zero seed
                rng: XorShift128::new(worker_id as u32 * 1000 + 1),
                inv_samples: 1.0 / init_scene.samples as f32,
            },
            move |task: &SamplePass, data: &mut ThreadData| {
                for y in 0..task.height {
                    for x in 0..task.width {
                        if is_finish.load(Ordering::Relaxed) {
                            return;
                        }

                        let ray = scene.camera.emit(x as f32, y as f32, &mut data.rng);
                        let radiance = integrator.li(ray, &scene, &mut data.rng);
                        canvas.add(x as usize, y as usize, radiance * data.inv_samples);
                    }
                }
                completed.fetch_add(1, Ordering::SeqCst);
            },
        );
    }

    // The monitor signals both the render flag and the queue drain so the
    // workers let go of everything once time is up
    let monitor_stop = Arc::new(AtomicBool::new(false));
    let monitor = {
        let canvas = Arc::clone(&canvas);
        let is_finish = Arc::clone(&is_finish);
        let request_exit = tasks.exit_signal();
        let monitor_stop = Arc::clone(&monitor_stop);
        let snapshot_counter = Arc::clone(&snapshot_counter);
        let settings = settings.clone();
        std::thread::spawn(move || {
            let mut last_snapshot = Instant::now();
            while !monitor_stop.load(Ordering::SeqCst) {
                if last_snapshot.elapsed() >= settings.snapshot_period {
                    write_snapshot(&canvas, &snapshot_counter, &settings);
                    last_snapshot = Instant::now();
                }

                if start.elapsed() >= settings.deadline {
                    warn!("Renderer: Deadline hit, stopping");
                    write_snapshot(&canvas, &snapshot_counter, &settings);
                    is_finish.store(true, Ordering::SeqCst);
                    request_exit.store(true, Ordering::SeqCst);
                    break;
                }

                std::thread::sleep(Duration::from_secs(1));
            }
        })
    };

    // Park until the work runs out, one way or the other
    while completed.load(Ordering::SeqCst) < total_passes
        && !is_finish.load(Ordering::SeqCst)
    {
        std::thread::sleep(Duration::from_millis(100));
    }

    tasks.request_exit();
    tasks.wait();

    monitor_stop.store(true, Ordering::SeqCst);
    if monitor.join().is_err() {
        error!("Renderer: Monitor thread panicked");
    }

    // Consistent by now, every worker has joined
    write_snapshot(&canvas, &snapshot_counter, settings);

    let stats = RenderStats {
        completed_passes: completed.load(Ordering::SeqCst).min(total_passes),
        total_passes,
        secs: start.elapsed().as_secs_f32(),
    };
    if stats.completed_passes < stats.total_passes {
        warn!(
            "Renderer: Finished {}/{} passes in {:.2}s",
            stats.completed_passes, stats.total_passes, stats.secs
        );
    } else {
        info!("Renderer: Finished in {:.2}s", stats.secs);
    }
    stats
}

fn write_snapshot(canvas: &Canvas, counter: &AtomicU32, settings: &RenderSettings) {
    let count = counter.fetch_add(1, Ordering::SeqCst);
    if let Err(why) = canvas.write_numbered(&settings.output_dir, count, settings.tone_map) {
        error!("Renderer: Snapshot {:03} failed: {}", count, why);
    }
}
