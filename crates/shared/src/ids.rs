/// One entry per id namespace in the data model. Each kind prefixes the
/// opaque id string so ids are self-describing across logs and HTTP
/// bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Receipt,
    Job,
    Lot,
    Event,
    Recommendation,
    Run,
    Feedback,
    Checkin,
    Draft,
    DraftItem,
}

impl IdKind {
    fn prefix(self) -> &'static str {
        match self {
            IdKind::Receipt => "receipt",
            IdKind::Job => "job",
            IdKind::Lot => "lot",
            IdKind::Event => "event",
            IdKind::Recommendation => "rec",
            IdKind::Run => "run",
            IdKind::Feedback => "feedback",
            IdKind::Checkin => "checkin",
            IdKind::Draft => "draft",
            IdKind::DraftItem => "draft_item",
        }
    }
}

/// Mint a new id of the given kind using the given raw unique token
/// (typically a UUID). Kept separate from id generation so tests can
/// hand in deterministic tokens via a [`crate::IdProvider`].
pub fn new_id(kind: IdKind, token: &str) -> String {
    format!("{}_{}", kind.prefix(), token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_match_data_model() {
        assert_eq!(new_id(IdKind::Receipt, "abc"), "receipt_abc");
        assert_eq!(new_id(IdKind::DraftItem, "abc"), "draft_item_abc");
    }
}
