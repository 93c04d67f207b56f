//! Captured and uploaded artifacts
//!
//! An artifact is a binary file the user attached or captured, plus the
//! metadata needed to submit it. Artifacts are immutable once created; the
//! payload is shared so snapshots for an outbound request are cheap.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

pub type ArtifactId = Uuid;

/// Where an artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    Upload,
    RecordedAudio,
    RecordedVideo,
    Photo,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Upload => "upload",
            SourceKind::RecordedAudio => "audio",
            SourceKind::RecordedVideo => "video",
            SourceKind::Photo => "photo",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CapturedArtifact {
    id: ArtifactId,
    display_name: String,
    mime_type: String,
    source_kind: SourceKind,
    payload: Arc<[u8]>,
}

impl CapturedArtifact {
    pub fn new(
        display_name: impl Into<String>,
        mime_type: impl Into<String>,
        source_kind: SourceKind,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            mime_type: mime_type.into(),
            source_kind,
            payload: payload.into(),
        }
    }

    /// A file the user picked from disk.
    pub fn upload(
        display_name: impl Into<String>,
        mime_type: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self::new(display_name, mime_type, SourceKind::Upload, payload)
    }

    pub fn id(&self) -> ArtifactId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn size_bytes(&self) -> u64 {
        self.payload.len() as u64
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Metadata view for the UI (no payload).
    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            id: self.id,
            display_name: self.display_name.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes(),
            source_kind: self.source_kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    pub id: ArtifactId,
    pub display_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub source_kind: SourceKind,
}

/// Ordered artifact list. Insertion order is preserved and names are never
/// deduplicated.
#[derive(Debug, Clone, Default)]
pub struct ArtifactCollection {
    items: Vec<CapturedArtifact>,
}

impl ArtifactCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, artifact: CapturedArtifact) -> ArtifactId {
        let id = artifact.id();
        log::debug!(
            "Artifact added: {} ({}, {} bytes, {})",
            artifact.display_name(),
            artifact.mime_type(),
            artifact.size_bytes(),
            artifact.source_kind().as_str()
        );
        self.items.push(artifact);
        id
    }

    pub fn remove(&mut self, id: ArtifactId) -> Option<CapturedArtifact> {
        let index = self.items.iter().position(|a| a.id() == id)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, id: ArtifactId) -> Option<&CapturedArtifact> {
        self.items.iter().find(|a| a.id() == id)
    }

    /// Independent copy of the current contents, in order.
    pub fn snapshot(&self) -> Vec<CapturedArtifact> {
        self.items.clone()
    }

    pub fn summaries(&self) -> Vec<ArtifactSummary> {
        self.items.iter().map(CapturedArtifact::summary).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapturedArtifact> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.items.iter().map(CapturedArtifact::size_bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_matches_payload() {
        let a = CapturedArtifact::upload("notes.txt", "text/plain", vec![1, 2, 3]);
        assert_eq!(a.size_bytes(), 3);
        assert_eq!(a.source_kind(), SourceKind::Upload);
    }

    #[test]
    fn collection_keeps_insertion_order_and_duplicate_names() {
        let mut c = ArtifactCollection::new();
        let first = c.push(CapturedArtifact::upload("a.png", "image/png", vec![0]));
        let second = c.push(CapturedArtifact::upload("a.png", "image/png", vec![0, 0]));

        let ids: Vec<_> = c.iter().map(|a| a.id()).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(c.total_bytes(), 3);
    }

    #[test]
    fn remove_unknown_id_is_none() {
        let mut c = ArtifactCollection::new();
        c.push(CapturedArtifact::upload("a.png", "image/png", vec![0]));
        assert!(c.remove(Uuid::new_v4()).is_none());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn snapshot_is_not_affected_by_later_pushes() {
        let mut c = ArtifactCollection::new();
        c.push(CapturedArtifact::upload("a.png", "image/png", vec![0]));
        let snap = c.snapshot();
        c.push(CapturedArtifact::upload("b.png", "image/png", vec![0]));
        assert_eq!(snap.len(), 1);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn summary_serializes_camel_case() {
        let a = CapturedArtifact::new("clip.wav", "audio/wav", SourceKind::RecordedAudio, vec![]);
        let json = serde_json::to_value(a.summary()).unwrap();
        assert_eq!(json["sourceKind"], "recordedAudio");
        assert_eq!(json["displayName"], "clip.wav");
        assert_eq!(json["sizeBytes"], 0);
    }
}
