//! Data models
//!
//! Domain types shared by the repositories, services and the GraphQL layer:
//! accounts, the museum catalog, media, tours with their checkpoints,
//! answers and feedback.

mod answer;
mod checkpoint;
mod feedback;
mod media;
mod museum_object;
mod tour;
mod user;

pub use answer::{Answer, AnswerBody};
pub use checkpoint::{
    Checkpoint, CheckpointDisplayInput, CheckpointKind, CheckpointPatch, CheckpointType,
    NewCheckpoint,
};
pub use feedback::{is_valid_rating, AppFeedback, TourFeedback, MAX_RATING, MIN_RATING};
pub use media::{
    Badge, BadgeProgress, CreateBadgeInput, MediaKind, Picture, ProfilePicture, StoredFile,
};
pub use museum_object::{
    CreateMuseumObjectInput, MuseumObject, MuseumObjectFilter, UpdateMuseumObjectInput,
};
pub use tour::{CreateTourInput, Tour, TourStatus};
pub use user::{Admin, Code, User, CODE_LENGTH};
