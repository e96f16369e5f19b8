//! The project feed: cache check, fetch with retry, transform, commit.
//!
//! Each [`ProjectFeed::fetch_projects`] call runs its steps in order:
//!
//! 1. unless `skip_cache`, adopt a non-empty cached list and stop;
//! 2. load from the [`ProjectSource`] through the retry helper, each attempt
//!    bounded by `fetch_timeout`;
//! 3. order images, resolve client names, drop image-less projects;
//! 4. persist the result in the `projects-cache` slot and the feed state.
//!
//! When every attempt fails the feed records the final error and keeps its
//! last good projects. Concurrent fetches are not de-duplicated; the last one
//! to finish wins.

use std::sync::Arc;
use std::time::Duration;

use obra_core::cache::{get_cache, CacheSlot, LocalStorage, DEFAULT_CACHE_TTL_MINS};
use obra_core::retry::{Retrier, RetryError, RetryOptions};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::source::ProjectSource;
use crate::transform::{transform_projects, ProjectWithImages};

/// Storage key of the cached feed.
pub const PROJECTS_CACHE_KEY: &str = "projects-cache";

/// Upper bound for a single load attempt.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Failed to load projects: {0}")]
    Source(#[from] sqlx::Error),

    #[error("Loading projects timed out after {0:?}")]
    Timeout(Duration),
}

// ---------------------------------------------------------------------------
// Options and snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FeedOptions {
    pub cache_ttl_minutes: u64,
    pub fetch_timeout: Duration,
    pub retry: RetryOptions<FeedError>,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            cache_ttl_minutes: DEFAULT_CACHE_TTL_MINS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            retry: RetryOptions::default(),
        }
    }
}

/// Point-in-time view of the feed, as served to the gallery.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedSnapshot {
    pub projects: Vec<ProjectWithImages>,
    pub loading: bool,
    pub error: Option<String>,
    pub is_retrying: bool,
}

struct FeedState {
    projects: Vec<ProjectWithImages>,
    loading: bool,
    error: Option<String>,
}

// ---------------------------------------------------------------------------
// ProjectFeed
// ---------------------------------------------------------------------------

pub struct ProjectFeed {
    source: Arc<dyn ProjectSource>,
    cache: CacheSlot<Option<Vec<ProjectWithImages>>>,
    retrier: Retrier<FeedError>,
    fetch_timeout: Duration,
    state: RwLock<FeedState>,
    cancel: CancellationToken,
}

impl ProjectFeed {
    /// Create a feed. Nothing is loaded until the first
    /// [`fetch_projects`](Self::fetch_projects); until then the feed reports
    /// `loading`.
    pub fn new(
        source: Arc<dyn ProjectSource>,
        storage: Arc<LocalStorage>,
        options: FeedOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            cache: get_cache(storage, PROJECTS_CACHE_KEY, Some(options.cache_ttl_minutes)),
            retrier: Retrier::new(options.retry),
            fetch_timeout: options.fetch_timeout,
            state: RwLock::new(FeedState {
                projects: Vec::new(),
                loading: true,
                error: None,
            }),
            cancel,
        }
    }

    pub async fn projects(&self) -> Vec<ProjectWithImages> {
        self.state.read().await.projects.clone()
    }

    pub async fn loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub fn is_retrying(&self) -> bool {
        self.retrier.state().is_retrying()
    }

    pub async fn snapshot(&self) -> FeedSnapshot {
        let state = self.state.read().await;
        FeedSnapshot {
            projects: state.projects.clone(),
            loading: state.loading,
            error: state.error.clone(),
            is_retrying: self.is_retrying(),
        }
    }

    /// Bypass the cache and reload from the source.
    pub async fn refresh_projects(&self) -> Result<Vec<ProjectWithImages>, RetryError<FeedError>> {
        self.fetch_projects(true).await
    }

    /// Run one fetch cycle and return the projects it committed.
    pub async fn fetch_projects(
        &self,
        skip_cache: bool,
    ) -> Result<Vec<ProjectWithImages>, RetryError<FeedError>> {
        if !skip_cache {
            if let Some(cached) = self.cache.get().filter(|p| !p.is_empty()) {
                tracing::debug!(count = cached.len(), "Serving projects from cache");
                let mut state = self.state.write().await;
                state.projects = cached.clone();
                state.loading = false;
                state.error = None;
                return Ok(cached);
            }
        }

        {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
        }

        let source = &self.source;
        let timeout = self.fetch_timeout;
        let loaded = self
            .retrier
            .retry(
                || async move {
                    match tokio::time::timeout(timeout, source.fetch_active_with_images()).await {
                        Ok(rows) => rows.map_err(FeedError::from),
                        Err(_) => Err(FeedError::Timeout(timeout)),
                    }
                },
                &self.cancel,
            )
            .await;

        match loaded {
            Ok(raw) => {
                let fetched = raw.len();
                let projects = transform_projects(raw);
                self.cache.set(Some(projects.clone()));

                let mut state = self.state.write().await;
                state.projects = projects.clone();
                state.loading = false;
                state.error = None;

                tracing::info!(fetched, shown = projects.len(), "Project feed refreshed");
                Ok(projects)
            }
            Err(e) => {
                let message = e
                    .last_error()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| e.to_string());
                tracing::error!(error = %message, "Failed to refresh project feed");

                let mut state = self.state.write().await;
                state.loading = false;
                state.error = Some(message);
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use obra_db::models::project::Project;
    use obra_db::models::project_image::ProjectImage;
    use uuid::Uuid;

    use super::*;
    use crate::transform::RawProject;

    /// Plays back queued responses; once the queue is empty it repeats the
    /// fallback.
    struct ScriptedSource {
        fallback: Vec<RawProject>,
        queued: Mutex<VecDeque<Result<Vec<RawProject>, sqlx::Error>>>,
        calls: AtomicU32,
        hang: bool,
    }

    impl ScriptedSource {
        fn returning(projects: Vec<RawProject>) -> Arc<Self> {
            Arc::new(Self {
                fallback: projects,
                queued: Mutex::new(VecDeque::new()),
                calls: AtomicU32::new(0),
                hang: false,
            })
        }

        fn then_fail(&self, times: usize) {
            let mut queued = self.queued.lock().unwrap();
            for _ in 0..times {
                queued.push_back(Err(sqlx::Error::Protocol("connection reset".into())));
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProjectSource for ScriptedSource {
        async fn fetch_active_with_images(&self) -> Result<Vec<RawProject>, sqlx::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            let next = self.queued.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(self.fallback.clone()))
        }
    }

    fn project(title: &str, description: Option<&str>) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            title: title.to_string(),
            category: Some("Habitação".to_string()),
            city: Some("Porto".to_string()),
            description: description.map(str::to_string),
            cover_image: None,
            start_date: None,
            end_date: None,
            delivery_date: None,
            completion_deadline: None,
            status: "active".to_string(),
            client_name: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Images all at position 0, created one day apart, returned newest
    /// first.
    fn images_newest_first(project_id: Uuid, count: i64) -> Vec<ProjectImage> {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        (0..count)
            .rev()
            .map(|day| {
                let at = base + ChronoDuration::days(day);
                ProjectImage {
                    id: Uuid::new_v4(),
                    project_id,
                    url: format!("/obras/{project_id}/{day}.jpg"),
                    caption: None,
                    image_date: None,
                    position: 0,
                    created_at: at,
                    updated_at: at,
                }
            })
            .collect()
    }

    fn raw(project: Project, image_count: i64) -> RawProject {
        let images = images_newest_first(project.id, image_count);
        RawProject { project, images }
    }

    fn store_projects() -> Vec<RawProject> {
        vec![
            raw(project("Sem fotografias", None), 0),
            raw(project("Armazém Leça", None), 2),
            raw(
                project(
                    "Moradia Gaia",
                    Some("Reabilitação integral.\nCliente: Maria Costa."),
                ),
                5,
            ),
        ]
    }

    fn fast_options() -> FeedOptions {
        FeedOptions {
            retry: RetryOptions {
                max_attempts: 2,
                delay: Duration::from_millis(1),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn storage() -> (tempfile::TempDir, Arc<LocalStorage>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalStorage::open(dir.path()).unwrap());
        (dir, storage)
    }

    fn feed(source: Arc<ScriptedSource>, storage: Arc<LocalStorage>) -> ProjectFeed {
        ProjectFeed::new(source, storage, fast_options(), CancellationToken::new())
    }

    #[tokio::test]
    async fn three_project_scenario() {
        let (_dir, storage) = storage();
        let feed = feed(ScriptedSource::returning(store_projects()), storage);

        let projects = feed.fetch_projects(false).await.unwrap();

        assert_eq!(projects.len(), 2);
        assert!(projects.iter().all(|p| !p.images.is_empty()));

        let gaia = projects
            .iter()
            .find(|p| p.images.len() == 5)
            .expect("five-image project");
        assert_eq!(gaia.project.client_name.as_deref(), Some("Maria Costa"));

        for p in &projects {
            let times: Vec<_> = p.images.iter().map(|i| i.created_at).collect();
            let mut sorted = times.clone();
            sorted.sort();
            assert_eq!(times, sorted, "images must be oldest first");
        }

        let snapshot = feed.snapshot().await;
        assert!(!snapshot.loading);
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.projects, projects);
    }

    #[tokio::test]
    async fn new_feed_reports_loading() {
        let (_dir, storage) = storage();
        let feed = feed(ScriptedSource::returning(vec![]), storage);
        assert!(feed.loading().await);
        assert!(feed.projects().await.is_empty());
    }

    #[tokio::test]
    async fn cached_list_skips_the_source() {
        let (_dir, storage) = storage();
        let first = ScriptedSource::returning(store_projects());
        feed(first.clone(), storage.clone())
            .fetch_projects(false)
            .await
            .unwrap();
        assert_eq!(first.calls(), 1);

        let second = ScriptedSource::returning(vec![]);
        let cached = feed(second.clone(), storage);
        let projects = cached.fetch_projects(false).await.unwrap();

        assert_eq!(projects.len(), 2);
        assert_eq!(second.calls(), 0);
        assert!(!cached.loading().await);
    }

    #[tokio::test]
    async fn refresh_bypasses_cache() {
        let (_dir, storage) = storage();
        let source = ScriptedSource::returning(store_projects());
        let feed = feed(source.clone(), storage);

        feed.fetch_projects(false).await.unwrap();
        feed.refresh_projects().await.unwrap();

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn two_refreshes_yield_equal_lists() {
        let (_dir, storage) = storage();
        let feed = feed(ScriptedSource::returning(store_projects()), storage);

        let first = feed.refresh_projects().await.unwrap();
        let second = feed.refresh_projects().await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_cache_entry_falls_through_to_source() {
        let (_dir, storage) = storage();
        let empty = ScriptedSource::returning(vec![raw(project("Sem fotos", None), 0)]);
        feed(empty, storage.clone()).fetch_projects(false).await.unwrap();

        let source = ScriptedSource::returning(store_projects());
        let projects = feed(source.clone(), storage)
            .fetch_projects(false)
            .await
            .unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(projects.len(), 2);
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let (_dir, storage) = storage();
        let source = ScriptedSource::returning(store_projects());
        source.then_fail(1);
        let feed = feed(source.clone(), storage);

        let projects = feed.fetch_projects(false).await.unwrap();

        assert_eq!(projects.len(), 2);
        assert_eq!(source.calls(), 2);
        assert!(feed.error().await.is_none());
    }

    #[tokio::test]
    async fn exhausted_retries_keep_last_good_projects() {
        let (_dir, storage) = storage();
        let source = ScriptedSource::returning(store_projects());
        let feed = feed(source.clone(), storage);
        let good = feed.fetch_projects(false).await.unwrap();

        source.then_fail(2);
        let result = feed.refresh_projects().await;

        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 2, .. })));
        assert_eq!(feed.projects().await, good);
        let error = feed.error().await.expect("error recorded");
        assert!(error.contains("connection reset"), "got: {error}");
        assert!(!feed.loading().await);
        assert!(!feed.is_retrying());
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_source_times_out() {
        let (_dir, storage) = storage();
        let source = Arc::new(ScriptedSource {
            fallback: vec![],
            queued: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
            hang: true,
        });
        let options = FeedOptions {
            retry: RetryOptions {
                max_attempts: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        let feed = ProjectFeed::new(source, storage, options, CancellationToken::new());

        let err = feed.fetch_projects(true).await.unwrap_err();

        assert!(matches!(
            err.last_error(),
            Some(FeedError::Timeout(t)) if *t == DEFAULT_FETCH_TIMEOUT
        ));
    }

    #[tokio::test]
    async fn cancellation_stops_the_fetch() {
        let (_dir, storage) = storage();
        let source = ScriptedSource::returning(vec![]);
        source.then_fail(5);
        let cancel = CancellationToken::new();
        let feed = ProjectFeed::new(
            source,
            storage,
            FeedOptions {
                retry: RetryOptions {
                    max_attempts: 5,
                    delay: Duration::from_secs(3600),
                    ..Default::default()
                },
                ..Default::default()
            },
            cancel.clone(),
        );

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });
        let result = feed.fetch_projects(true).await;
        canceller.await.unwrap();

        assert!(matches!(result, Err(RetryError::Cancelled)));
        assert_eq!(feed.error().await.as_deref(), Some("Retry cancelled"));
    }
}
