//! Metadata provider adapters (§4.C): TMDb, Douban, Wikipedia, and the
//! AI-assisted keyword-escalation adapter, behind a uniform
//! [`ProviderAdapter`] trait the orchestrator drives.

pub mod adapter;
pub mod ai_assisted;
pub mod douban;
pub mod http;
pub mod tmdb;
pub mod wikipedia;

pub use adapter::{ProviderAdapter, LANGUAGE_PREFERENCE};
pub use ai_assisted::{AiAssistedAdapter, AiKeywordClient};
pub use douban::DoubanAdapter;
pub use http::{HttpClient, ReqwestHttpClient};
pub use tmdb::TmdbAdapter;
pub use wikipedia::WikipediaAdapter;
