pub mod browser;
pub mod clock;
pub mod companies;
pub mod config;
pub mod credentials;
pub mod duration;
pub mod elements;
pub mod error;
pub mod fetch;
pub mod models;
pub mod months;
pub mod navigation;
pub mod normalize;
pub mod scraper;
pub mod waiting;
