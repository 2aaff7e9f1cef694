//! Per-resource wrappers over `ApiClient`.
//!
//! Each service holds a clone of the shared client, so they all follow the
//! same authorization binding. Response bodies go through
//! `api::envelope` before they reach a model.

pub mod auth;
pub mod campaigns;
pub mod channels;
pub mod contacts;
pub mod points;
pub mod poller;

pub use auth::{AuthService, SignIn};
pub use campaigns::CampaignService;
pub use channels::ChannelService;
pub use contacts::ContactService;
pub use points::PointsService;
pub use poller::{ConnectionWatch, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
