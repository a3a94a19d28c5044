//! One share run, from "post" to the completed request.

use std::sync::Arc;

use {
    async_trait::async_trait,
    sharebridge_config::ShareBridgeConfig,
    sharebridge_media::{ContainerStore, MediaIntrospector, PreviewRequest},
    tracing::{error, info},
};

use crate::{
    activator::{ActivationRequest, HostActivator, Launcher},
    attachment::Attachment,
    classifier::classify,
    coordinator::{BatchCoordinator, Finalized, Job},
    error::{IngestError, Result},
    handoff::{HandoffStore, SuiteDefaults},
    model::Batch,
    processor::{ProcessorContext, processor_for},
};

/// The environment hosting a share run.
#[async_trait]
pub trait ShareHost: Send + Sync {
    /// Show a failure notice to the user.
    async fn present_error(&self, message: &str);

    /// End the share interaction. The result set is always empty.
    async fn complete_request(&self);
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Batch stored and host app activated.
    Delivered {
        batch: Batch,
        activation: ActivationRequest,
    },
    /// Nothing was shared; nothing written, nothing activated.
    Empty,
    Cancelled,
    Failed(IngestError),
}

pub struct ShareSession {
    processors: Arc<ProcessorContext>,
    handoff: HandoffStore,
    activator: HostActivator,
    host: Arc<dyn ShareHost>,
}

impl ShareSession {
    pub fn new(
        processors: Arc<ProcessorContext>,
        handoff: HandoffStore,
        activator: HostActivator,
        host: Arc<dyn ShareHost>,
    ) -> Self {
        Self {
            processors,
            handoff,
            activator,
            host,
        }
    }

    /// Wire a session from configuration.
    pub async fn from_config(
        config: &ShareBridgeConfig,
        introspector: Arc<dyn MediaIntrospector>,
        launcher: Option<Arc<dyn Launcher>>,
        host: Arc<dyn ShareHost>,
    ) -> Result<Self> {
        let store = ContainerStore::new(config.container_root());
        let preview = PreviewRequest::new(
            config.media.thumbnail_max_dimension,
            config.media.thumbnail_frame_secs,
        );
        let processors = ProcessorContext::new(store, introspector).with_preview(preview);

        let suite = SuiteDefaults::open(config.defaults_dir(), &config.share.app_group_id)
            .await
            .map_err(|source| IngestError::StoreFailed { source })?;
        let handoff = HandoffStore::new(Arc::new(suite), config.share.shared_key.clone());
        let activator = HostActivator::from_config(&config.share, launcher);

        Ok(Self::new(Arc::new(processors), handoff, activator, host))
    }

    /// Process `attachments`, hand the batch off and open the host app.
    ///
    /// At most one error notice is shown, and the request is always
    /// completed.
    pub async fn post(&self, attachments: Vec<Arc<dyn Attachment>>) -> RunOutcome {
        let count = attachments.len();
        info!(attachments = count, "share posted");
        let outcome = match self.run(attachments).await {
            Ok(Some((batch, activation))) => RunOutcome::Delivered { batch, activation },
            Ok(None) => RunOutcome::Empty,
            Err(err) => {
                error!(error = %err, "share failed");
                self.host.present_error(err.user_message()).await;
                RunOutcome::Failed(err)
            },
        };
        self.host.complete_request().await;
        outcome
    }

    pub async fn cancel(&self) -> RunOutcome {
        info!("share cancelled");
        self.host.complete_request().await;
        RunOutcome::Cancelled
    }

    async fn run(
        &self,
        attachments: Vec<Arc<dyn Attachment>>,
    ) -> Result<Option<(Batch, ActivationRequest)>> {
        let jobs = attachments
            .into_iter()
            .enumerate()
            .map(|(index, attachment)| {
                let kind = classify(attachment.as_ref())
                    .ok_or(IngestError::ClassificationFailed { index })?;
                Ok(Job {
                    index,
                    processor: processor_for(kind, &self.processors),
                    attachment,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let coordinator = BatchCoordinator::new(jobs.len());
        let contributions = match coordinator.run(jobs).await {
            Finalized::Complete(contributions) => contributions,
            Finalized::Failed(err) => return Err(err),
        };
        if contributions.is_empty() {
            info!("nothing to hand off");
            return Ok(None);
        }

        let batch = Batch::from_contributions(contributions);
        self.handoff.write(&batch).await?;
        let activation = self.activator.activate(batch.redirect_tag()).await?;
        Ok(Some((batch, activation)))
    }
}
