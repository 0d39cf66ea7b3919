//! In-memory asset source
//!
//! Holds documents and clip inventories registered up front. Loads can be
//! held back and released later, which lets a host (or a test) keep a load
//! in flight while the render loop keeps ticking.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture};

use super::{log_clips, AnimationClip, AssetSource, LoadError, LoadedAsset, ModelScene};

#[derive(Debug, Default)]
struct MemoryInner {
    texts: HashMap<String, String>,
    models: HashMap<String, Vec<AnimationClip>>,
    failures: HashMap<String, LoadError>,
    requests: Vec<String>,
    hold: bool,
    held: Vec<(String, oneshot::Sender<()>)>,
}

/// Asset source backed by registered in-memory entries
///
/// Cloning yields another handle onto the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetSource {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a text document
    pub fn with_text(self, path: &str, text: &str) -> Self {
        self.inner
            .borrow_mut()
            .texts
            .insert(path.to_string(), text.to_string());
        self
    }

    /// Register a model with its clips
    pub fn with_model(self, path: &str, clips: Vec<AnimationClip>) -> Self {
        self.inner
            .borrow_mut()
            .models
            .insert(path.to_string(), clips);
        self
    }

    /// Make requests for `path` fail with `error`
    pub fn with_failure(self, path: &str, error: LoadError) -> Self {
        self.inner
            .borrow_mut()
            .failures
            .insert(path.to_string(), error);
        self
    }

    /// Keep subsequent loads pending until [`release_all`](Self::release_all)
    pub fn hold_loads(&self, hold: bool) {
        self.inner.borrow_mut().hold = hold;
    }

    /// Complete every held load
    pub fn release_all(&self) -> usize {
        let held = std::mem::take(&mut self.inner.borrow_mut().held);
        let count = held.len();
        for (_, tx) in held {
            let _ = tx.send(());
        }
        count
    }

    /// Number of loads currently held back
    pub fn held_count(&self) -> usize {
        self.inner.borrow().held.len()
    }

    /// Number of requests made for `path`
    pub fn request_count(&self, path: &str) -> usize {
        self.inner
            .borrow()
            .requests
            .iter()
            .filter(|p| p.as_str() == path)
            .count()
    }

    /// All requested paths in order
    pub fn requests(&self) -> Vec<String> {
        self.inner.borrow().requests.clone()
    }

    fn lookup_model(&self, path: &str) -> Result<LoadedAsset, LoadError> {
        let inner = self.inner.borrow();
        if let Some(err) = inner.failures.get(path) {
            return Err(err.clone());
        }
        let clips = inner
            .models
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(path.to_string()))?;
        log_clips(path, &clips);
        Ok(LoadedAsset {
            scene: ModelScene::new(path),
            clips,
        })
    }

    fn deliver<T: 'static>(&self, path: &str, result: T) -> LocalBoxFuture<'static, T> {
        let mut inner = self.inner.borrow_mut();
        inner.requests.push(path.to_string());
        if !inner.hold {
            return future::ready(result).boxed_local();
        }

        let (tx, rx) = oneshot::channel();
        inner.held.push((path.to_string(), tx));
        async move {
            let _ = rx.await;
            result
        }
        .boxed_local()
    }
}

impl AssetSource for MemoryAssetSource {
    fn fetch_text(&self, path: &str) -> LocalBoxFuture<'static, Result<String, LoadError>> {
        let result = {
            let inner = self.inner.borrow();
            match inner.failures.get(path) {
                Some(err) => Err(err.clone()),
                None => inner
                    .texts
                    .get(path)
                    .cloned()
                    .ok_or_else(|| LoadError::NotFound(path.to_string())),
            }
        };
        self.deliver(path, result)
    }

    fn load_model(&self, path: &str) -> LocalBoxFuture<'static, Result<LoadedAsset, LoadError>> {
        let result = self.lookup_model(path);
        self.deliver(path, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::task::noop_waker;
    use std::future::Future;
    use std::task::{Context, Poll};
    use std::time::Duration;

    #[test]
    fn test_registered_model_loads() {
        let source = MemoryAssetSource::new().with_model(
            "animations/HELLO.glb",
            vec![AnimationClip::new("HELLO", Duration::from_secs(1))],
        );

        let asset = block_on(source.load_model("animations/HELLO.glb")).unwrap();
        assert_eq!(asset.clips[0].name, "HELLO");
        assert_eq!(source.request_count("animations/HELLO.glb"), 1);
    }

    #[test]
    fn test_unknown_model_not_found() {
        let source = MemoryAssetSource::new();
        let err = block_on(source.load_model("missing.glb")).unwrap_err();
        assert_eq!(err, LoadError::NotFound("missing.glb".into()));
    }

    #[test]
    fn test_registered_failure() {
        let source = MemoryAssetSource::new().with_failure(
            "signs.json",
            LoadError::Io {
                path: "signs.json".into(),
                message: "offline".into(),
            },
        );
        assert!(matches!(
            block_on(source.fetch_text("signs.json")),
            Err(LoadError::Io { .. })
        ));
    }

    #[test]
    fn test_held_load_waits_for_release() {
        let source = MemoryAssetSource::new().with_text("doc", "body");
        source.hold_loads(true);

        let mut fut = source.fetch_text("doc");
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert!(fut.as_mut().poll(&mut cx).is_pending());
        assert_eq!(source.held_count(), 1);

        assert_eq!(source.release_all(), 1);
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(Ok(text)) => assert_eq!(text, "body"),
            other => panic!("unexpected poll result: {:?}", other),
        }
    }
}
