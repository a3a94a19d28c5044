//! Share ingestion: take the attachments handed over by a share action,
//! normalize each into a [`SharedMediaDescriptor`], persist the batch into
//! shared storage, and activate the receiving app.
//!
//! Flow: [`classifier`] picks a processor per attachment, the
//! [`BatchCoordinator`] runs every processor concurrently and finalizes once,
//! [`HandoffStore`] writes the batch, [`HostActivator`] opens the host app.
//! [`ShareSession`] drives a whole run.

pub mod activator;
pub mod attachment;
pub mod classifier;
pub mod coordinator;
pub mod error;
pub mod handoff;
pub mod model;
pub mod processor;
pub mod session;

pub use {
    activator::{ActivationRequest, HostActivator, Launcher},
    attachment::{Attachment, LoadError, LoadedItem, LocalAttachment, ResolvedFile, TypeIdentifier},
    classifier::{AttachmentKind, classify},
    coordinator::{BatchCoordinator, CoordinatorState, Finalized, Job},
    error::{IngestError, Result},
    handoff::{HandoffStore, KeyValueStore, SuiteDefaults},
    model::{Batch, Contribution, RedirectTag, SharedMediaDescriptor, SharedMediaType},
    processor::{AttachmentProcessor, ProcessorContext, processor_for},
    session::{RunOutcome, ShareHost, ShareSession},
};
