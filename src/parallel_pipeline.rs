// THEORY:
// The `ParallelPipeline` analyses many independent images at once. Analyses share
// nothing but the read-only pipeline (detector, label table, config), so they
// parallelise without locks:
//
// 1.  A single dispatcher receives every task and deals them round-robin to a
//     fixed set of workers.
// 2.  Each worker moves the CPU-bound analysis onto tokio's blocking pool and
//     answers through the task's oneshot channel.
// 3.  Callers await their own reply; `analyze_batch` simply joins many of them,
//     preserving input order in the output.
//
// Must be constructed from inside a tokio runtime.

use crate::error::{Result, VisionError};
use crate::pipeline::{AnalysisPipeline, ObjectDetector};
use crate::record::AnalysisRecord;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

pub struct AnalysisTask {
    pub job_id: u64,
    pub image_bytes: Vec<u8>,
    pub result_sender: oneshot::Sender<Result<AnalysisRecord>>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<AnalysisTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new<D>(pipeline: Arc<AnalysisPipeline<D>>, worker_count: usize) -> Self
    where
        D: ObjectDetector + 'static,
    {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<AnalysisTask>();
        let mut workers = Vec::with_capacity(worker_count);

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<AnalysisTask>())
            .unzip();

        // Spawn dispatcher
        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if let Err(mpsc::error::SendError(task)) = worker_senders[worker_idx].send(task) {
                    warn!(job_id = task.job_id, worker_idx, "worker gone, dropping task");
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
        });

        // Spawn workers
        for (worker_idx, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            let worker_pipeline = Arc::clone(&pipeline);

            let worker = tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    debug!(job_id = task.job_id, worker_idx, "analysis started");
                    let pipeline = Arc::clone(&worker_pipeline);
                    let bytes = task.image_bytes;

                    let result = tokio::task::spawn_blocking(move || pipeline.analyze_bytes(&bytes))
                        .await
                        .unwrap_or_else(|e| Err(VisionError::WorkerPool(e.to_string())));

                    let _ = task.result_sender.send(result);
                }
            });

            workers.push(worker);
        }

        Self {
            task_sender,
            workers,
        }
    }

    pub async fn submit(&self, job_id: u64, image_bytes: Vec<u8>) -> Result<AnalysisRecord> {
        let (result_sender, result_receiver) = oneshot::channel();

        let task = AnalysisTask {
            job_id,
            image_bytes,
            result_sender,
        };

        self.task_sender
            .send(task)
            .map_err(|_| VisionError::WorkerPool("Failed to send task to worker pool".to_string()))?;

        result_receiver
            .await
            .map_err(|_| VisionError::WorkerPool("Failed to receive result from worker".to_string()))?
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stops accepting tasks and waits for queued ones to finish.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

pub struct ParallelPipeline {
    worker_pool: WorkerPool,
    job_counter: AtomicU64,
}

impl ParallelPipeline {
    pub fn new<D>(pipeline: AnalysisPipeline<D>) -> Self
    where
        D: ObjectDetector + 'static,
    {
        let worker_count = pipeline.config().worker_count;
        Self {
            worker_pool: WorkerPool::new(Arc::new(pipeline), worker_count),
            job_counter: AtomicU64::new(0),
        }
    }

    pub async fn analyze(&self, image_bytes: Vec<u8>) -> Result<AnalysisRecord> {
        let job_id = self.job_counter.fetch_add(1, Ordering::Relaxed);
        self.worker_pool.submit(job_id, image_bytes).await
    }

    /// Analyses every image concurrently; results come back in input order.
    pub async fn analyze_batch(&self, images: Vec<Vec<u8>>) -> Vec<Result<AnalysisRecord>> {
        futures::future::join_all(images.into_iter().map(|bytes| self.analyze(bytes))).await
    }

    pub fn worker_count(&self) -> usize {
        self.worker_pool.worker_count()
    }

    pub async fn shutdown(self) {
        self.worker_pool.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color_extractor::ColorName;
    use crate::core_modules::shape_classifier::ShapeResult;
    use crate::pipeline::PipelineConfig;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba(rgba));
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn parallel(workers: usize) -> ParallelPipeline {
        let config = PipelineConfig::builder().worker_count(workers).build();
        ParallelPipeline::new(AnalysisPipeline::new(config))
    }

    #[tokio::test]
    async fn single_image() {
        let pipeline = parallel(2);
        let record = pipeline.analyze(png(32, 32, [0, 255, 0, 255])).await.unwrap();
        assert_eq!(record.color.name, ColorName::Green);
        assert_eq!(record.shape, ShapeResult::Square);
        pipeline.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn batch_preserves_order() {
        let pipeline = parallel(3);
        assert_eq!(pipeline.worker_count(), 3);

        let inputs = vec![
            png(20, 20, [255, 0, 0, 255]),
            png(40, 20, [0, 0, 255, 255]),
            png(20, 20, [255, 255, 255, 255]),
            png(10, 30, [0, 0, 0, 255]),
            png(20, 20, [255, 255, 0, 255]),
        ];
        let results = pipeline.analyze_batch(inputs).await;

        let names: Vec<ColorName> = results.iter().map(|r| r.as_ref().unwrap().color.name).collect();
        assert_eq!(
            names,
            vec![ColorName::Red, ColorName::Blue, ColorName::White, ColorName::Black, ColorName::Yellow]
        );
        assert_eq!(results[1].as_ref().unwrap().shape, ShapeResult::Rectangle);
    }

    #[tokio::test]
    async fn errors_are_returned_per_task() {
        let pipeline = parallel(2);
        let results = pipeline
            .analyze_batch(vec![b"garbage".to_vec(), png(8, 8, [9, 9, 9, 255])])
            .await;
        assert!(matches!(results[0], Err(VisionError::Image(_))));
        assert!(results[1].is_ok());
    }
}
