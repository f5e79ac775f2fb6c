//! Services layer - Business logic
//!
//! Services sit between the API and the repositories. They resolve the
//! caller, enforce ownership and membership, validate input and translate
//! everything into [`ServiceError`].

mod access;
pub mod account;
pub mod answer;
pub mod catalog;
pub mod checkpoint;
pub mod error;
pub mod media;
pub mod password;
pub mod rate_limiter;
pub mod report;
pub mod social;
pub mod token;
pub mod tour;

pub use account::AccountService;
pub use answer::{score, AnswerService};
pub use catalog::CatalogService;
pub use checkpoint::{Actor, CheckpointService};
pub use error::{ServiceError, ServiceResult};
pub use media::{Download, MediaService};
pub use password::{hash_password, verify_password};
pub use rate_limiter::LoginRateLimiter;
pub use report::ReportService;
pub use social::SocialService;
pub use token::{Claims, TokenKind, TokenPair, TokenService};
pub use tour::TourService;

use crate::config::Config;
use crate::db::repositories::{
    SqlxAdminRepository, SqlxAnswerRepository, SqlxCascadeRepository, SqlxCheckpointRepository,
    SqlxCodeRepository, SqlxFavouriteRepository, SqlxFeedbackRepository, SqlxMediaRepository,
    SqlxMuseumObjectRepository, SqlxTourRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::storage::DynFileStorage;
use std::sync::Arc;

/// Every service, wired to one pool and one blob store
#[derive(Clone)]
pub struct Services {
    pub accounts: Arc<AccountService>,
    pub catalog: Arc<CatalogService>,
    pub tours: Arc<TourService>,
    pub checkpoints: Arc<CheckpointService>,
    pub answers: Arc<AnswerService>,
    pub reports: Arc<ReportService>,
    pub social: Arc<SocialService>,
    pub media: Arc<MediaService>,
    pub tokens: Arc<TokenService>,
}

impl Services {
    pub fn new(pool: DynDatabasePool, storage: DynFileStorage, config: &Config) -> Self {
        let users = SqlxUserRepository::boxed(pool.clone());
        let admins = SqlxAdminRepository::boxed(pool.clone());
        let codes = SqlxCodeRepository::boxed(pool.clone());
        let objects = SqlxMuseumObjectRepository::boxed(pool.clone());
        let media_repo = SqlxMediaRepository::boxed(pool.clone());
        let tour_repo = SqlxTourRepository::boxed(pool.clone());
        let checkpoint_repo = SqlxCheckpointRepository::boxed(pool.clone());
        let answer_repo = SqlxAnswerRepository::boxed(pool.clone());
        let favourites = SqlxFavouriteRepository::boxed(pool.clone());
        let feedback = SqlxFeedbackRepository::boxed(pool.clone());
        let cascade = SqlxCascadeRepository::boxed(pool);

        let tokens = Arc::new(TokenService::new(&config.auth));
        let answers = Arc::new(AnswerService::new(
            users.clone(),
            tour_repo.clone(),
            checkpoint_repo.clone(),
            answer_repo,
        ));

        Self {
            accounts: Arc::new(AccountService::new(
                users.clone(),
                admins,
                codes,
                cascade.clone(),
                tokens.clone(),
            )),
            catalog: Arc::new(CatalogService::new(
                objects.clone(),
                media_repo.clone(),
                cascade.clone(),
                storage.clone(),
            )),
            tours: Arc::new(TourService::new(
                users.clone(),
                tour_repo.clone(),
                feedback.clone(),
                cascade,
            )),
            checkpoints: Arc::new(CheckpointService::new(
                users.clone(),
                tour_repo.clone(),
                checkpoint_repo.clone(),
                media_repo.clone(),
                objects.clone(),
            )),
            reports: Arc::new(ReportService::new(answers.clone(), checkpoint_repo)),
            answers,
            social: Arc::new(SocialService::new(
                users.clone(),
                tour_repo,
                objects,
                favourites,
                feedback,
            )),
            media: Arc::new(MediaService::new(
                users,
                media_repo,
                storage,
                config.upload.clone(),
            )),
            tokens,
        }
    }
}
