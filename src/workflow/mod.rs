//! Generation workflow
//!
//! The draft (topic + artifacts) is edited freely; submitting takes a
//! snapshot of it, so artifacts added afterwards never join the in-flight
//! request. Stage transitions live in [`state_machine`].

pub mod state_machine;

pub use state_machine::{reduce, Effect, Event, Notice, State, WorkflowStage};

use crate::artifact::ArtifactCollection;
use crate::transport::GenerationRequest;

/// What the user is preparing to submit.
#[derive(Debug, Clone)]
pub struct Draft {
    pub topic: String,
    pub artifacts: ArtifactCollection,
    pub generate_images: bool,
}

impl Draft {
    pub fn new(generate_images: bool) -> Self {
        Self {
            topic: String::new(),
            artifacts: ArtifactCollection::new(),
            generate_images,
        }
    }

    pub fn snapshot(&self) -> GenerationRequest {
        GenerationRequest {
            topic: self.topic.clone(),
            files: self.artifacts.snapshot(),
            generate_images: self.generate_images,
        }
    }

    /// Drop topic and artifacts. The image preference is kept.
    pub fn clear(&mut self) {
        self.topic.clear();
        self.artifacts.clear();
    }
}
