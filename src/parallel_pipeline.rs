// THEORY:
// A frame from a detector usually holds several people, and each person is
// described independently. The parallel pipeline spreads those descriptions over
// a pool of tokio workers.
//
// Every worker owns its own clone of the `DescriptionPipeline`, and with it its
// own `ColorEngine`. No engine is ever shared between workers, so the calibration
// factor needs no lock here. To run the pool with a calibrated engine, calibrate
// a pipeline first and hand it to `ParallelPipeline::from_pipeline`; each worker
// starts from that state.
//
// A single dispatcher hands tasks to workers round-robin. Results come back on a
// per-task oneshot channel, so `describe_batch` returns them in input order no
// matter which worker finished first.

use crate::core_modules::posture::Keypoint;
use crate::core_modules::region::OwnedRegion;
use crate::error::Error;
use crate::pipeline::{DescriptionPipeline, PersonDescription, PersonObservation, PipelineConfig};
use futures::future::join_all;
use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};

/// Failures of a pooled description: either the description itself failed, or
/// the pool could not run it.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error(transparent)]
    Description(#[from] Error),
    #[error("worker pool is shut down")]
    Closed,
}

/// An observation that owns its buffers, so it can be sent to a worker.
#[derive(Debug, Clone, Default)]
pub struct OwnedObservation {
    pub garment: Option<OwnedRegion>,
    pub keypoints: Option<Vec<Keypoint>>,
}

impl OwnedObservation {
    fn describe_with(&self, pipeline: &DescriptionPipeline) -> Result<PersonDescription, Error> {
        let garment = self.garment.as_ref().map(OwnedRegion::as_region).transpose()?;
        let observation = PersonObservation {
            garment,
            keypoints: self.keypoints.as_deref(),
        };
        pipeline.describe(&observation)
    }
}

pub struct DescriptionTask {
    pub observation: OwnedObservation,
    pub result_sender: oneshot::Sender<Result<PersonDescription, Error>>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<DescriptionTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns the dispatcher and `worker_count` workers. Must be called from
    /// inside a tokio runtime.
    pub fn new(pipeline: DescriptionPipeline, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<DescriptionTask>();
        let mut workers = Vec::with_capacity(worker_count);

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<DescriptionTask>())
            .unzip();

        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if worker_senders[worker_idx].send(task).is_err() {
                    warn!("description worker {worker_idx} has stopped; task dropped");
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
        });

        for mut worker_receiver in worker_receivers {
            let worker_pipeline = pipeline.clone();
            let worker = tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let result = task.observation.describe_with(&worker_pipeline);
                    // The caller may have stopped waiting; nothing to do then.
                    let _ = task.result_sender.send(result);
                }
            });
            workers.push(worker);
        }

        debug!("started description worker pool with {worker_count} worker(s)");
        Self {
            task_sender,
            workers,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub async fn describe(
        &self,
        observation: OwnedObservation,
    ) -> Result<PersonDescription, PoolError> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.task_sender
            .send(DescriptionTask {
                observation,
                result_sender,
            })
            .map_err(|_| PoolError::Closed)?;

        let result = result_receiver.await.map_err(|_| PoolError::Closed)?;
        Ok(result?)
    }
}

/// Describes many people concurrently, one engine per worker.
pub struct ParallelPipeline {
    worker_pool: WorkerPool,
}

impl ParallelPipeline {
    /// One worker per CPU core.
    pub fn new(config: PipelineConfig) -> Result<Self, Error> {
        Self::with_workers(config, num_cpus::get())
    }

    pub fn with_workers(config: PipelineConfig, worker_count: usize) -> Result<Self, Error> {
        let pipeline = DescriptionPipeline::new(config)?;
        Ok(Self::from_pipeline(pipeline, worker_count))
    }

    /// Every worker starts from a clone of `pipeline`, calibration included.
    pub fn from_pipeline(pipeline: DescriptionPipeline, worker_count: usize) -> Self {
        Self {
            worker_pool: WorkerPool::new(pipeline, worker_count),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_pool.worker_count()
    }

    pub async fn describe(
        &self,
        observation: OwnedObservation,
    ) -> Result<PersonDescription, PoolError> {
        self.worker_pool.describe(observation).await
    }

    /// Describes every observation; results are in input order.
    pub async fn describe_batch(
        &self,
        observations: Vec<OwnedObservation>,
    ) -> Vec<Result<PersonDescription, PoolError>> {
        let count = observations.len();
        let results = join_all(
            observations
                .into_iter()
                .map(|observation| self.worker_pool.describe(observation)),
        )
        .await;
        debug!("described a batch of {count} observation(s)");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color::color::Color;
    use crate::core_modules::color_engine::EngineConfig;
    use crate::core_modules::posture::Posture;
    use crate::core_modules::region::{PixelLayout, Region};
    use image::RgbImage;

    fn identity_config() -> PipelineConfig {
        PipelineConfig {
            engine: EngineConfig {
                blur_sigma: 0.0,
                contrast_gain: 1.0,
                brightness_offset: 0.0,
                ..EngineConfig::default()
            },
            correct_lighting: false,
            ..PipelineConfig::default()
        }
    }

    fn garment(color: Color) -> OwnedObservation {
        OwnedObservation {
            garment: Some(OwnedRegion::from(RgbImage::from_pixel(
                6,
                6,
                image::Rgb(color.channels()),
            ))),
            keypoints: None,
        }
    }

    #[tokio::test]
    async fn batch_results_keep_input_order() {
        let pipeline = ParallelPipeline::with_workers(identity_config(), 3).unwrap();
        assert_eq!(pipeline.worker_count(), 3);

        let colors = [
            Color::new(255, 0, 0),
            Color::new(0, 0, 255),
            Color::new(255, 255, 0),
            Color::new(0, 0, 0),
            Color::new(255, 255, 255),
            Color::new(0, 128, 0),
            Color::new(128, 128, 128),
        ];
        let results = pipeline
            .describe_batch(colors.iter().copied().map(garment).collect())
            .await;

        let names: Vec<String> = results
            .into_iter()
            .map(|r| r.unwrap().garment.unwrap().name)
            .collect();
        assert_eq!(
            names,
            ["vermelho", "azul", "amarelo", "preto", "branco", "verde", "cinza"]
        );
    }

    #[tokio::test]
    async fn workers_inherit_calibration() {
        let mut base = DescriptionPipeline::new(identity_config()).unwrap();
        let reference = RgbImage::from_pixel(4, 4, image::Rgb([100, 100, 100]));
        base.calibrate(
            &Region::from_rgb_image(&reference).unwrap(),
            Color::new(200, 200, 200),
        )
        .unwrap();

        let pool = ParallelPipeline::from_pipeline(base, 2);
        for _ in 0..4 {
            let description = pool.describe(garment(Color::new(50, 50, 50))).await.unwrap();
            assert_eq!(description.garment.unwrap().rgb, (100, 100, 100));
        }
    }

    #[tokio::test]
    async fn errors_come_back_per_observation() {
        let pipeline = ParallelPipeline::with_workers(identity_config(), 2).unwrap();
        let broken = OwnedObservation {
            garment: Some(OwnedRegion::new(vec![0; 4], 2, 2, PixelLayout::Rgb)),
            keypoints: None,
        };
        let mut keypoints = vec![Keypoint::new(0.0, 0.0, 0.0); 17];
        keypoints[11] = Keypoint::new(0.5, 0.5, 0.9);
        keypoints[13] = Keypoint::new(0.5, 0.7, 0.9);
        keypoints[15] = Keypoint::new(0.5, 0.9, 0.9);
        let standing = OwnedObservation {
            garment: None,
            keypoints: Some(keypoints),
        };

        let results = pipeline.describe_batch(vec![broken, standing]).await;
        assert!(matches!(
            results[0],
            Err(PoolError::Description(Error::InvalidInput(_)))
        ));
        assert_eq!(results[1].as_ref().unwrap().posture, Posture::Standing);
    }
}
