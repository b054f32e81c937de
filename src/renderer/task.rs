use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use log::debug;

use super::queue::LockFreeQueue;

/// A fixed pool of workers draining a shared lock-free queue.
///
/// Workers poll the exit flag before every pop and yield while the queue is
/// empty instead of blocking, so a request to exit is honored within one
/// task. Tasks enqueued before `run` are consumed in FIFO order per worker;
/// pushing concurrently with the workers is also fine.
pub struct TaskSystem<T: Send + 'static> {
    queue: Arc<LockFreeQueue<T>>,
    finish: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    worker_count: usize,
}

impl<T: Send + 'static> TaskSystem<T> {
    pub fn new(worker_count: usize) -> Self {
        Self {
            queue: Arc::new(LockFreeQueue::new()),
            finish: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
            worker_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn enqueue(&self, value: T) {
        self.queue.push(value);
    }

    /// Launches the workers.
    ///
    /// `init` builds the thread-local state for a worker from its id and
    /// `work` runs once per task against that state.
    pub fn run<D, I, F>(&mut self, init: I, work: F)
    where
        D: 'static,
        I: Fn(usize) -> D + Send + Sync + 'static,
        F: Fn(&T, &mut D) + Send + Sync + 'static,
    {
        self.wait();
        self.finish.store(false, Ordering::SeqCst);

        let init = Arc::new(init);
        let work = Arc::new(work);
        for id in 0..self.worker_count {
            let queue = Arc::clone(&self.queue);
            let finish = Arc::clone(&self.finish);
            let init = Arc::clone(&init);
            let work = Arc::clone(&work);
            self.workers.push(std::thread::spawn(move || {
                debug!("Render thread {}: Begin", id);
                let mut data = init(id);
                loop {
                    if finish.load(Ordering::SeqCst) {
                        break;
                    }
                    match queue.pop() {
                        Some(task) => work(&task, &mut data),
                        None => std::thread::yield_now(),
                    }
                }
                debug!("Render thread {}: End", id);
            }));
        }
    }

    /// Signals every worker to stop after its current task.
    pub fn request_exit(&self) {
        self.finish.store(true, Ordering::SeqCst);
    }

    /// The flag behind [`TaskSystem::request_exit`], for signaling from
    /// another thread.
    pub fn exit_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.finish)
    }

    /// Joins all launched workers.
    pub fn wait(&mut self) {
        for worker in self.workers.drain(..) {
            if let Err(why) = worker.join() {
                debug!("Render thread panicked: {:?}", why);
            }
        }
    }
}
