//! Adapter registry: one slot per model the gateway can route to.

use std::sync::Arc;

use clinical_common::AnalysisType;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::{AdapterError, ImageAdapter, RemoteImageAdapter, RemoteTabularAdapter, TabularAdapter};
use crate::config::{AdaptersConfig, RemoteAdapterConfig};

/// A registered adapter plus its optional concurrency limit.
pub struct Slot<A: ?Sized> {
    adapter: Arc<A>,
    permits: Option<Arc<Semaphore>>,
}

impl<A: ?Sized> Clone for Slot<A> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            permits: self.permits.clone(),
        }
    }
}

impl<A: ?Sized> Slot<A> {
    /// A slot with no limit on in-flight calls.
    pub fn new(adapter: Arc<A>) -> Self {
        Self {
            adapter,
            permits: None,
        }
    }

    /// A slot allowing at most `max_concurrent` in-flight calls.
    pub fn with_limit(adapter: Arc<A>, max_concurrent: usize) -> Self {
        Self {
            adapter,
            permits: Some(Arc::new(Semaphore::new(max_concurrent))),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Wait for a free call slot. Unbounded slots return immediately.
    ///
    /// The wait is not bounded here; callers fold it into their deadline.
    pub async fn acquire(&self) -> Result<Option<OwnedSemaphorePermit>, AdapterError> {
        match &self.permits {
            Some(permits) => permits
                .clone()
                .acquire_owned()
                .await
                .map(Some)
                .map_err(|_| AdapterError::Unavailable("adapter pool closed".to_string())),
            None => Ok(None),
        }
    }
}

/// Registry of the tabular model and the three image classifiers.
///
/// Image slots are selected by exhaustive match on [`AnalysisType`], so a
/// new analysis type cannot be added without a slot for it. The registry is
/// built once at startup and never mutated afterwards.
#[derive(Default)]
pub struct AdapterRegistry {
    tabular: Option<Slot<dyn TabularAdapter>>,
    chest_xray: Option<Slot<dyn ImageAdapter>>,
    skin_cancer: Option<Slot<dyn ImageAdapter>>,
    brain_tumor: Option<Slot<dyn ImageAdapter>>,
}

impl AdapterRegistry {
    pub fn builder() -> AdapterRegistryBuilder {
        AdapterRegistryBuilder::default()
    }

    /// Build remote HTTP adapters for every configured endpoint.
    pub fn from_config(config: &AdaptersConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Self::builder();

        if let Some(ref tabular) = config.tabular {
            let adapter: Arc<dyn TabularAdapter> = Arc::new(RemoteTabularAdapter::new(tabular)?);
            builder = builder.tabular(limited(adapter, tabular));
            tracing::info!("Registered tabular adapter at {}", tabular.url);
        }

        let image_slots = [
            (AnalysisType::ChestXray, &config.chest_xray),
            (AnalysisType::SkinCancer, &config.skin_cancer),
            (AnalysisType::BrainTumor, &config.brain_tumor),
        ];
        for (analysis_type, slot) in image_slots {
            if let Some(remote) = slot {
                let adapter: Arc<dyn ImageAdapter> =
                    Arc::new(RemoteImageAdapter::new(analysis_type, remote)?);
                builder = builder.image(limited(adapter, remote));
                tracing::info!("Registered {} adapter at {}", analysis_type, remote.url);
            }
        }

        Ok(builder.build())
    }

    pub fn tabular(&self) -> Option<&Slot<dyn TabularAdapter>> {
        self.tabular.as_ref()
    }

    /// Get the image slot for an analysis type.
    pub fn image(&self, analysis_type: AnalysisType) -> Option<&Slot<dyn ImageAdapter>> {
        match analysis_type {
            AnalysisType::ChestXray => self.chest_xray.as_ref(),
            AnalysisType::SkinCancer => self.skin_cancer.as_ref(),
            AnalysisType::BrainTumor => self.brain_tumor.as_ref(),
        }
    }

    /// Names of all populated slots, tabular first.
    pub fn configured(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.tabular.is_some() {
            names.push("tabular");
        }
        for analysis_type in AnalysisType::ALL {
            if self.image(analysis_type).is_some() {
                names.push(analysis_type.as_str());
            }
        }
        names
    }
}

fn limited<A: ?Sized>(adapter: Arc<A>, config: &RemoteAdapterConfig) -> Slot<A> {
    match config.max_concurrent {
        Some(max) => Slot::with_limit(adapter, max),
        None => Slot::new(adapter),
    }
}

/// Builder for [`AdapterRegistry`].
#[derive(Default)]
pub struct AdapterRegistryBuilder {
    registry: AdapterRegistry,
}

impl AdapterRegistryBuilder {
    pub fn tabular(mut self, slot: Slot<dyn TabularAdapter>) -> Self {
        self.registry.tabular = Some(slot);
        self
    }

    /// Register an image adapter in the slot for its own analysis type,
    /// replacing any previous one.
    pub fn image(mut self, slot: Slot<dyn ImageAdapter>) -> Self {
        let target = match slot.adapter().analysis_type() {
            AnalysisType::ChestXray => &mut self.registry.chest_xray,
            AnalysisType::SkinCancer => &mut self.registry.skin_cancer,
            AnalysisType::BrainTumor => &mut self.registry.brain_tumor,
        };
        *target = Some(slot);
        self
    }

    pub fn build(self) -> AdapterRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{StubImageAdapter, StubTabularAdapter};

    #[test]
    fn test_image_adapters_land_in_their_slot() {
        let registry = AdapterRegistry::builder()
            .image(StubImageAdapter::new(AnalysisType::SkinCancer).slot())
            .image(StubImageAdapter::new(AnalysisType::BrainTumor).slot())
            .build();

        assert!(registry.tabular().is_none());
        assert!(registry.image(AnalysisType::ChestXray).is_none());
        assert_eq!(
            registry
                .image(AnalysisType::SkinCancer)
                .map(|s| s.adapter().analysis_type()),
            Some(AnalysisType::SkinCancer)
        );
        assert_eq!(registry.configured(), vec!["skin-cancer", "brain-tumor"]);
    }

    #[test]
    fn test_from_empty_config() {
        let registry = AdapterRegistry::from_config(&AdaptersConfig::default()).unwrap();
        assert!(registry.configured().is_empty());
    }

    #[test]
    fn test_from_config_registers_remote_slots() {
        let config = AdaptersConfig {
            tabular: Some(RemoteAdapterConfig {
                url: "http://localhost:8000/predict".to_string(),
                max_concurrent: Some(4),
                connect_timeout_ms: 500,
            }),
            chest_xray: Some(RemoteAdapterConfig {
                url: "http://localhost:8000/analyze/chest-xray".to_string(),
                max_concurrent: None,
                connect_timeout_ms: 500,
            }),
            ..Default::default()
        };
        let registry = AdapterRegistry::from_config(&config).unwrap();
        assert_eq!(registry.configured(), vec!["tabular", "chest-xray"]);
        assert_eq!(registry.tabular().map(|s| s.adapter().name()), Some("tabular"));
    }

    #[tokio::test]
    async fn test_slot_limit() {
        let slot = StubTabularAdapter::default().slot_with_limit(1);

        let first = slot.acquire().await.unwrap();
        assert!(first.is_some());

        // Second acquire must wait until the first permit is dropped
        let pending = tokio::time::timeout(std::time::Duration::from_millis(20), slot.acquire()).await;
        assert!(pending.is_err());

        drop(first);
        assert!(slot.acquire().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unbounded_slot_has_no_permit() {
        let slot = StubTabularAdapter::default().slot();
        assert!(slot.acquire().await.unwrap().is_none());
    }
}
