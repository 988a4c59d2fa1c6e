//! Pipeline orchestration.
//!
//! Runs a validated request through fetch, synthesis, assembly and (for
//! single videos) trimming. Downloads and FFmpeg processes fan out under
//! per-job semaphores; results keep request order and the first failure
//! cancels the remaining work.

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::try_join_all;
use tokio::sync::Semaphore;
use tracing::Instrument;

use vstitch_media::{assemble, synthesize_segment, trim_tail, CommandRunner, ConcatMode, TrimResult};
use vstitch_models::{
    AssetKind, AssetPair, JobKind, JobRequest, JobState, LocalAsset, Segment, VideoSource,
};
use vstitch_storage::AssetFetcher;

use crate::config::WorkerConfig;
use crate::error::{JobError, JobResult};
use crate::job::{Job, JobOutput};
use crate::metrics;
use crate::workspace::JobWorkspace;

/// Concat manifest name inside a job workspace.
const MANIFEST_NAME: &str = "concat.txt";

/// Remote asset scheduled for download.
struct FetchItem {
    index: u32,
    kind: AssetKind,
    url: String,
}

/// Drives jobs from request to deliverable.
pub struct JobOrchestrator {
    config: WorkerConfig,
    fetcher: Arc<dyn AssetFetcher>,
    runner: Arc<dyn CommandRunner>,
}

impl JobOrchestrator {
    pub fn new(
        config: WorkerConfig,
        fetcher: Arc<dyn AssetFetcher>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            fetcher,
            runner,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    /// Run `request` to completion.
    ///
    /// On success the returned output owns the job workspace; on failure
    /// the workspace has already been removed.
    pub async fn run(&self, request: JobRequest) -> JobResult<JobOutput> {
        let mut job = Job::new(request.kind());
        let span = job.logger().create_span();

        async move {
            if let Err(e) = request.validate() {
                let err = JobError::from(e);
                job.fail(&err);
                return Err(err);
            }

            job.logger().log_start(&format!(
                "{} assets, work dir {}",
                request.asset_count(),
                self.config.work_dir.display()
            ));

            let workspace = match JobWorkspace::create(&self.config.work_dir, job.id()).await {
                Ok(ws) => ws,
                Err(e) => {
                    let err = JobError::from(e);
                    job.fail(&err);
                    return Err(err);
                }
            };

            match self.execute(&mut job, &workspace, request).await {
                Ok(path) => job.deliver(path, workspace),
                Err(err) => {
                    job.fail(&err);
                    workspace.cleanup().await;
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        job: &mut Job,
        workspace: &JobWorkspace,
        request: JobRequest,
    ) -> JobResult<PathBuf> {
        match request {
            JobRequest::Sequence(pairs) => {
                job.advance(JobState::Fetching)?;
                let assets = self.fetch_all(workspace, pair_items(&pairs)).await?;

                job.advance(JobState::Synthesizing)?;
                let segments = self.synthesize_all(workspace, &pairs, &assets).await?;

                job.advance(JobState::Assembling)?;
                let inputs: Vec<PathBuf> = segments.into_iter().map(|s| s.output_path).collect();
                self.assemble(workspace, JobKind::Sequence, &inputs, ConcatMode::Copy)
                    .await
            }
            JobRequest::Single(pair) => {
                let pairs = [pair];

                job.advance(JobState::Fetching)?;
                let assets = self.fetch_all(workspace, pair_items(&pairs)).await?;

                job.advance(JobState::Synthesizing)?;
                let mut segments = self.synthesize_all(workspace, &pairs, &assets).await?;
                let segment = segments
                    .pop()
                    .ok_or_else(|| JobError::internal("single job produced no segment"))?;

                job.advance(JobState::Trimming)?;
                let output = workspace.artifact(JobKind::Single.output_name());
                let trimmed = trim_tail(
                    self.runner.as_ref(),
                    &segment.output_path,
                    self.config.single_tail_cut_secs,
                    &output,
                )
                .await
                .map_err(JobError::Trim)?;

                Ok(match trimmed {
                    TrimResult::Trimmed(path) => path,
                    TrimResult::Skipped => segment.output_path,
                })
            }
            JobRequest::Merge(videos) => {
                job.advance(JobState::Fetching)?;
                let assets = self.fetch_all(workspace, video_items(&videos)).await?;

                job.advance(JobState::Assembling)?;
                let inputs: Vec<PathBuf> = assets.into_iter().map(|a| a.local_path).collect();
                self.assemble(workspace, JobKind::Merge, &inputs, ConcatMode::Reencode)
                    .await
            }
        }
    }

    /// Download every item into the workspace, preserving order.
    async fn fetch_all(
        &self,
        workspace: &JobWorkspace,
        items: Vec<FetchItem>,
    ) -> JobResult<Vec<LocalAsset>> {
        let semaphore = Semaphore::new(self.config.max_fetch_parallel.max(1));
        let semaphore = &semaphore;
        let fetcher = self.fetcher.as_ref();

        let downloads = items.into_iter().map(move |item| {
            // Registered before the download starts so partial files are cleaned up too
            let destination = workspace.artifact(item.kind.file_name(item.index, &item.url));
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| JobError::internal("fetch semaphore closed"))?;
                let asset = fetcher.fetch(&item.url, &destination, item.kind).await?;
                Ok::<_, JobError>(asset)
            }
        });

        let assets = try_join_all(downloads).await?;
        metrics::record_assets_fetched(assets.len());
        Ok(assets)
    }

    /// Synthesize one segment per pair. `assets` holds image, audio for each pair in order.
    async fn synthesize_all(
        &self,
        workspace: &JobWorkspace,
        pairs: &[AssetPair],
        assets: &[LocalAsset],
    ) -> JobResult<Vec<Segment>> {
        if assets.len() != pairs.len() * 2 {
            return Err(JobError::internal(format!(
                "expected {} assets for {} pairs, got {}",
                pairs.len() * 2,
                pairs.len(),
                assets.len()
            )));
        }

        let semaphore = Semaphore::new(self.config.max_synth_parallel.max(1));
        let semaphore = &semaphore;
        let runner = self.runner.as_ref();
        let policy = &self.config.encoding;

        let jobs = pairs.iter().zip(assets.chunks_exact(2)).map(move |(pair, files)| {
            let output = workspace.artifact(Segment::file_name(pair.index));
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| JobError::internal("synthesis semaphore closed"))?;
                synthesize_segment(
                    runner,
                    &files[0].local_path,
                    &files[1].local_path,
                    &output,
                    policy,
                )
                .await
                .map_err(|source| JobError::Synthesis {
                    index: pair.index,
                    source,
                })?;

                Ok::<_, JobError>(Segment {
                    index: pair.index,
                    source: pair.clone(),
                    output_path: output,
                })
            }
        });

        try_join_all(jobs).await
    }

    async fn assemble(
        &self,
        workspace: &JobWorkspace,
        kind: JobKind,
        inputs: &[PathBuf],
        mode: ConcatMode,
    ) -> JobResult<PathBuf> {
        let manifest = workspace.artifact(MANIFEST_NAME);
        let output = workspace.artifact(kind.output_name());

        assemble(
            self.runner.as_ref(),
            inputs,
            &manifest,
            &output,
            mode,
            &self.config.encoding,
        )
        .await
        .map_err(JobError::Assemble)?;

        Ok(output)
    }
}

fn pair_items(pairs: &[AssetPair]) -> Vec<FetchItem> {
    pairs
        .iter()
        .flat_map(|pair| {
            [
                FetchItem {
                    index: pair.index,
                    kind: AssetKind::Image,
                    url: pair.image_url.clone(),
                },
                FetchItem {
                    index: pair.index,
                    kind: AssetKind::Audio,
                    url: pair.audio_url.clone(),
                },
            ]
        })
        .collect()
}

fn video_items(videos: &[VideoSource]) -> Vec<FetchItem> {
    videos
        .iter()
        .map(|video| FetchItem {
            index: video.index,
            kind: AssetKind::Video,
            url: video.url.clone(),
        })
        .collect()
}
