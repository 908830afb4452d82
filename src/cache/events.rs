//! Content mutation events consumed by the revalidation hooks.

use std::fmt;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::snapshots::DocumentSnapshot;
use crate::domain::types::{Collection, Locale};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One committed mutation with the document before and after.
///
/// `snapshot` is the stored state after the change; for deletes it is the state
/// that was removed. `previous` is `None` on create.
#[derive(Debug, Clone)]
pub struct ContentEvent {
    pub id: Uuid,
    pub operation: MutationKind,
    pub locale: Locale,
    pub snapshot: DocumentSnapshot,
    pub previous: Option<DocumentSnapshot>,
    pub timestamp: OffsetDateTime,
}

impl ContentEvent {
    pub fn changed(
        locale: Locale,
        snapshot: DocumentSnapshot,
        previous: Option<DocumentSnapshot>,
    ) -> Self {
        let operation = if previous.is_some() {
            MutationKind::Update
        } else {
            MutationKind::Create
        };
        Self::new(operation, locale, snapshot, previous)
    }

    pub fn deleted(locale: Locale, snapshot: DocumentSnapshot) -> Self {
        Self::new(MutationKind::Delete, locale, snapshot, None)
    }

    fn new(
        operation: MutationKind,
        locale: Locale,
        snapshot: DocumentSnapshot,
        previous: Option<DocumentSnapshot>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            locale,
            snapshot,
            previous,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn collection(&self) -> Collection {
        self.snapshot.collection()
    }

    pub fn is_delete(&self) -> bool {
        self.operation == MutationKind::Delete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_infers_create_or_update() {
        let id = Uuid::new_v4();
        let snapshot = DocumentSnapshot::Category {
            id,
            slug: "news".into(),
        };

        let created = ContentEvent::changed(Locale::En, snapshot.clone(), None);
        assert_eq!(created.operation, MutationKind::Create);

        let updated = ContentEvent::changed(Locale::En, snapshot.clone(), Some(snapshot));
        assert_eq!(updated.operation, MutationKind::Update);
        assert_eq!(updated.collection(), Collection::Categories);
    }
}
