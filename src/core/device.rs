// Copyright @yucwang 2026

//! CPU reference device: one ordered command stream drained by a worker
//! thread, with per-pixel kernels dispatched over blocks.
//!
//! Commands may borrow anything that outlives the stream scope opened by
//! [`Device::with_stream`], so films, pipelines and integrator instances are
//! shared with the worker without reference counting.

use crate::core::error::RenderError;
use crate::math::constants::{Float, UInt, Vector2u};

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

type Command<'env> = Box<dyn FnOnce(&Workers<'env>) -> Result<(), RenderError> + Send + 'env>;

type KernelBody<'env> = Arc<dyn Fn(DispatchArgs, Vector2u) + Send + Sync + 'env>;

enum Message<'env> {
    Execute(Command<'env>),
    Fence(mpsc::Sender<Result<(), RenderError>>),
}

#[derive(Debug, Clone)]
pub struct Device {
    threads: usize,
}

impl Device {
    pub fn new(threads: usize) -> Self {
        Self { threads: threads.max(1) }
    }

    pub fn with_available_parallelism() -> Self {
        let threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(threads)
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn compile<'env>(&self, kernel: Kernel<'env>) -> Result<Shader<'env>, RenderError> {
        if kernel.block_size.x == 0 || kernel.block_size.y == 0 {
            return Err(RenderError::Device(format!(
                "invalid kernel block size {}x{}",
                kernel.block_size.x, kernel.block_size.y
            )));
        }
        Ok(Shader {
            block_size: kernel.block_size,
            body: kernel.body,
        })
    }

    /// Opens a stream, hands it to `f`, then drains and joins the worker.
    /// The block workers live as long as the stream and serve every
    /// dispatch submitted to it.
    ///
    /// A panic raised by a command is re-raised here once the stream is
    /// closed.
    pub fn with_stream<'env, T, F>(&self, f: F) -> Result<T, RenderError>
    where
        F: FnOnce(&mut Stream<'env>) -> Result<T, RenderError>,
    {
        thread::scope(|scope| {
            let (done_sender, done_receiver) = mpsc::channel();
            let mut helpers = Vec::with_capacity(self.threads - 1);
            for _ in 1..self.threads {
                let (job_sender, job_receiver) = mpsc::channel::<Arc<BlockJob<'env>>>();
                let done = done_sender.clone();
                scope.spawn(move || help(job_receiver, done));
                helpers.push(job_sender);
            }
            drop(done_sender);
            let workers = Workers {
                helpers,
                done: done_receiver,
            };

            let (sender, receiver) = mpsc::channel::<Message<'env>>();
            let worker = scope.spawn(move || execute(receiver, workers));

            let mut stream = Stream { sender, lost: false };
            let result = f(&mut stream);
            drop(stream);

            match worker.join() {
                Ok(worker_result) => match result {
                    Ok(value) => worker_result.map(|_| value),
                    Err(err) => Err(err),
                },
                Err(payload) => panic::resume_unwind(payload),
            }
        })
    }
}

fn execute<'env>(receiver: mpsc::Receiver<Message<'env>>, workers: Workers<'env>) -> Result<(), RenderError> {
    let mut failure: Option<String> = None;
    for message in receiver {
        match message {
            Message::Execute(command) => {
                if failure.is_some() {
                    continue;
                }
                if let Err(err) = command(&workers) {
                    log::error!("Stream command failed: {}.", err);
                    failure = Some(err.to_string());
                }
            }
            Message::Fence(reply) => {
                let status = match &failure {
                    Some(msg) => Err(RenderError::Device(msg.clone())),
                    None => Ok(()),
                };
                let _ = reply.send(status);
            }
        }
    }
    match failure {
        Some(msg) => Err(RenderError::Device(msg)),
        None => Ok(()),
    }
}

/// Ordered asynchronous command stream. Every submission returns
/// immediately; only [`Stream::synchronize`] blocks the host.
pub struct Stream<'env> {
    sender: mpsc::Sender<Message<'env>>,
    lost: bool,
}

impl<'env> Stream<'env> {
    pub fn enqueue<F>(&mut self, command: F)
    where
        F: FnOnce() -> Result<(), RenderError> + Send + 'env,
    {
        self.submit(Message::Execute(Box::new(move |_: &Workers<'env>| command())));
    }

    pub fn callback<F>(&mut self, callback: F)
    where
        F: FnOnce() + Send + 'env,
    {
        self.enqueue(move || {
            callback();
            Ok(())
        });
    }

    pub fn read<T, F>(&mut self, read: F) -> Readback<T>
    where
        T: Send + 'env,
        F: FnOnce() -> T + Send + 'env,
    {
        let (sender, receiver) = mpsc::channel();
        self.enqueue(move || {
            let _ = sender.send(read());
            Ok(())
        });
        Readback { receiver }
    }

    pub fn dispatch(&mut self, shader: &Shader<'env>, args: DispatchArgs, extent: Vector2u) {
        let shader = shader.clone();
        self.submit(Message::Execute(Box::new(move |workers: &Workers<'env>| {
            workers.run(BlockJob::new(shader, args, extent));
            Ok(())
        })));
    }

    pub fn synchronize(&mut self) -> Result<(), RenderError> {
        let (sender, receiver) = mpsc::channel();
        self.submit(Message::Fence(sender));
        if self.lost {
            return Err(RenderError::DeviceLost);
        }
        receiver.recv().unwrap_or(Err(RenderError::DeviceLost))
    }

    fn submit(&mut self, message: Message<'env>) {
        if self.sender.send(message).is_err() {
            self.lost = true;
        }
    }
}

/// Value produced by a [`Stream::read`] command.
pub struct Readback<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> Readback<T> {
    /// Blocks until the read command ran. Fails if it was skipped.
    pub fn wait(self) -> Result<T, RenderError> {
        self.receiver.recv().map_err(|_| RenderError::DeviceLost)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchArgs {
    pub frame_index: UInt,
    pub time: Float,
    pub shutter_weight: Float,
}

/// A 2D per-pixel program before compilation.
pub struct Kernel<'env> {
    block_size: Vector2u,
    body: KernelBody<'env>,
}

impl<'env> Kernel<'env> {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(DispatchArgs, Vector2u) + Send + Sync + 'env,
    {
        Self {
            block_size: Vector2u::new(16, 16),
            body: Arc::new(body),
        }
    }

    pub fn with_block_size(mut self, x: UInt, y: UInt) -> Self {
        self.block_size = Vector2u::new(x, y);
        self
    }
}

#[derive(Clone)]
pub struct Shader<'env> {
    block_size: Vector2u,
    body: KernelBody<'env>,
}

impl<'env> Shader<'env> {
    pub fn block_size(&self) -> Vector2u {
        self.block_size
    }
}

/// One dispatch split into blocks. Every worker pulls blocks from the shared
/// counter until none are left.
struct BlockJob<'env> {
    shader: Shader<'env>,
    args: DispatchArgs,
    width: usize,
    height: usize,
    blocks_x: usize,
    total_blocks: usize,
    next_block: AtomicUsize,
}

impl<'env> BlockJob<'env> {
    fn new(shader: Shader<'env>, args: DispatchArgs, extent: Vector2u) -> Self {
        let block_x = shader.block_size.x as usize;
        let block_y = shader.block_size.y as usize;
        let width = extent.x as usize;
        let height = extent.y as usize;
        let blocks_x = (width + block_x - 1) / block_x;
        let blocks_y = (height + block_y - 1) / block_y;
        Self {
            shader,
            args,
            width,
            height,
            blocks_x,
            total_blocks: blocks_x * blocks_y,
            next_block: AtomicUsize::new(0),
        }
    }

    fn work(&self) {
        let block_x = self.shader.block_size.x as usize;
        let block_y = self.shader.block_size.y as usize;
        loop {
            let block_index = self.next_block.fetch_add(1, Ordering::Relaxed);
            if block_index >= self.total_blocks {
                break;
            }

            let x0 = (block_index % self.blocks_x) * block_x;
            let y0 = (block_index / self.blocks_x) * block_y;
            let x1 = (x0 + block_x).min(self.width);
            let y1 = (y0 + block_y).min(self.height);
            for y in y0..y1 {
                for x in x0..x1 {
                    (self.shader.body)(self.args, Vector2u::new(x as UInt, y as UInt));
                }
            }
        }
    }
}

/// Block workers owned by the stream worker: the stream worker itself plus
/// `threads - 1` helpers parked on their job channels between dispatches.
struct Workers<'env> {
    helpers: Vec<mpsc::Sender<Arc<BlockJob<'env>>>>,
    done: mpsc::Receiver<thread::Result<()>>,
}

impl<'env> Workers<'env> {
    /// Runs `job` to completion. A panic on any worker is re-raised here
    /// after all of them have stopped touching the job.
    fn run(&self, job: BlockJob<'env>) {
        if job.total_blocks == 0 {
            return;
        }
        let job = Arc::new(job);
        let helpers = self.helpers.len().min(job.total_blocks - 1);
        let mut started = 0;
        for helper in &self.helpers[..helpers] {
            if helper.send(Arc::clone(&job)).is_ok() {
                started += 1;
            }
        }

        let mut failure = panic::catch_unwind(AssertUnwindSafe(|| job.work())).err();
        for _ in 0..started {
            match self.done.recv() {
                Ok(Ok(())) => {}
                Ok(Err(payload)) => {
                    if failure.is_none() {
                        failure = Some(payload);
                    }
                }
                Err(_) => break,
            }
        }
        if let Some(payload) = failure {
            panic::resume_unwind(payload);
        }
    }
}

fn help<'env>(jobs: mpsc::Receiver<Arc<BlockJob<'env>>>, done: mpsc::Sender<thread::Result<()>>) {
    for job in jobs {
        let result = panic::catch_unwind(AssertUnwindSafe(|| job.work()));
        drop(job);
        if done.send(result).is_err() {
            break;
        }
    }
}
