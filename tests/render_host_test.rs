// Render host behaviour: stale refresh results, degraded painting and capture preparation.
use std::sync::Arc;
use std::time::Duration;

use artifact_studio::expander::{ExpanderConfig, ExpansionOutcome, ReferenceExpander};
use artifact_studio::library::{
    ImageCategory, ImageResource, MemoryResourceStore, NewImageResource, ResourceStore, StoreError,
};
use artifact_studio::media::{MediaConfig, MediaLoader};
use artifact_studio::render::{
    CaptureConfig, MemorySurface, Orientation, PaperSize, RefreshOutcome, RenderHost, RenderOptions,
};
use async_trait::async_trait;

/// Memory store whose lookups take `delay` before answering.
struct SlowStore {
    inner: MemoryResourceStore,
    delay: Duration,
}

impl SlowStore {
    fn new(delay: Duration) -> Self {
        let inner = MemoryResourceStore::new();
        inner
            .put(ImageResource {
                id: "logo1".to_string(),
                name: "Acme Logo".to_string(),
                description: None,
                payload: "AAAA".to_string(),
                mime_type: Some("image/png".to_string()),
                category: ImageCategory::Logo,
                width: None,
                height: None,
                created_at: 0,
                updated_at: 0,
            })
            .expect("seed resource");
        Self { inner, delay }
    }
}

#[async_trait]
impl ResourceStore for SlowStore {
    async fn fetch_by_id(&self, id: &str) -> Result<Option<ImageResource>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch_by_id(id).await
    }

    async fn insert(&self, resource: NewImageResource) -> Result<ImageResource, StoreError> {
        self.inner.insert(resource).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }

    async fn list_by_category(&self, category: ImageCategory) -> Result<Vec<ImageResource>, StoreError> {
        self.inner.list_by_category(category).await
    }
}

fn slow_host(delay: Duration, timeout: Duration) -> (RenderHost, Arc<MemorySurface>) {
    let surface = Arc::new(MemorySurface::new());
    let expander = ReferenceExpander::with_config(
        Arc::new(SlowStore::new(delay)),
        ExpanderConfig { lookup_timeout: timeout },
    );
    (RenderHost::new(expander, surface.clone()), surface)
}

#[tokio::test]
async fn slower_older_refresh_never_overwrites_newer_one() {
    let (host, surface) = slow_host(Duration::from_millis(200), Duration::from_secs(5));

    let (older, newer) = tokio::join!(
        host.refresh("<p>old {{IMAGE:logo1}}</p>"),
        host.refresh("<p>new</p>")
    );

    assert_eq!(
        older.expect("older refresh"),
        RefreshOutcome::Stale {
            generation: 1,
            latest: 2
        }
    );
    assert!(matches!(
        newer.expect("newer refresh"),
        RefreshOutcome::Painted { generation: 2, .. }
    ));

    let paints = surface.paints();
    assert_eq!(paints.len(), 1);
    assert!(paints[0].contains("<p>new</p>"));
    assert!(!paints[0].contains("old"));
}

#[tokio::test]
async fn sequential_refreshes_all_paint() {
    let (host, surface) = slow_host(Duration::from_millis(10), Duration::from_secs(5));

    host.refresh("<p>{{IMAGE:logo1}}</p>").await.expect("first");
    host.refresh("<p>second</p>").await.expect("second");

    let paints = surface.paints();
    assert_eq!(paints.len(), 2);
    assert!(paints[0].contains("data:image/png;base64,AAAA"));
    assert!(paints[1].contains("<p>second</p>"));
    assert_eq!(host.latest_generation(), 2);
}

#[tokio::test]
async fn lookup_timeout_still_paints_original_body() {
    let (host, surface) = slow_host(Duration::from_secs(5), Duration::from_millis(50));

    let outcome = host.refresh("<p>{{IMAGE:logo1}}</p>").await.expect("refresh");

    match outcome {
        RefreshOutcome::Painted { expansion, .. } => {
            assert!(matches!(expansion, ExpansionOutcome::Aborted { .. }));
        }
        other => panic!("expected painted, got {:?}", other),
    }
    let painted = surface.last().expect("painted");
    assert!(painted.contains("<p>{{IMAGE:logo1}}</p>"));
}

#[tokio::test]
async fn capture_document_uses_print_pages_and_inlines_nothing_without_remote_images() {
    let (host, surface) = slow_host(Duration::ZERO, Duration::from_secs(5));
    let host = host
        .with_capture(
            MediaLoader::new(MediaConfig::default()),
            CaptureConfig {
                image_wait: Duration::from_millis(100),
                ..CaptureConfig::default()
            },
        )
        .with_options(RenderOptions::print(PaperSize::Letter, Orientation::Landscape));

    let capture = host
        .prepare_capture("<p>{{IMAGE:logo1}}</p><!-- pagebreak --><p>back</p>")
        .await;

    assert_eq!(capture.html.matches("<section class=\"page\">").count(), 2);
    assert!(capture.html.contains("@page{size:1056px 816px;margin:0;}"));
    assert!(capture.images.inlined.is_empty());
    assert!(capture.images.skipped.is_empty());
    assert!(surface.paints().is_empty());
    assert_eq!(host.latest_generation(), 0);
}
