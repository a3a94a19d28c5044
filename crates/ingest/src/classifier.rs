use crate::{
    attachment::{Attachment, TypeIdentifier},
    model::SharedMediaType,
};

/// Which processor an attachment is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    File,
    Image,
    Video,
    Url,
    Text,
}

/// Conformance is tested in this order and the first match wins. A file
/// backed image conforms to both the file and image identifiers, so the
/// generic file identifier must come first.
const PRIORITY: [(TypeIdentifier, AttachmentKind); 5] = [
    (TypeIdentifier::FileUrl, AttachmentKind::File),
    (TypeIdentifier::Image, AttachmentKind::Image),
    (TypeIdentifier::Movie, AttachmentKind::Video),
    (TypeIdentifier::Url, AttachmentKind::Url),
    (TypeIdentifier::Text, AttachmentKind::Text),
];

impl AttachmentKind {
    /// Identifier the processor loads the attachment as.
    #[must_use]
    pub fn type_identifier(self) -> TypeIdentifier {
        match self {
            Self::File => TypeIdentifier::FileUrl,
            Self::Image => TypeIdentifier::Image,
            Self::Video => TypeIdentifier::Movie,
            Self::Url => TypeIdentifier::Url,
            Self::Text => TypeIdentifier::Text,
        }
    }

    #[must_use]
    pub fn media_type(self) -> SharedMediaType {
        match self {
            Self::File => SharedMediaType::File,
            Self::Image => SharedMediaType::Image,
            Self::Video => SharedMediaType::Video,
            Self::Url => SharedMediaType::Url,
            Self::Text => SharedMediaType::Text,
        }
    }
}

/// Pick the processor for one attachment, or `None` if nothing matches.
pub fn classify(attachment: &dyn Attachment) -> Option<AttachmentKind> {
    PRIORITY
        .iter()
        .find(|(type_id, _)| attachment.conforms_to(*type_id))
        .map(|&(_, kind)| kind)
}
