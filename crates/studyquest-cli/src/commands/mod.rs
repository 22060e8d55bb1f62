pub mod achievements;
pub mod auth;
pub mod config;
pub mod session;

use studyquest_core::{AuthStore, Config, HttpStudyApi};

/// Load config and login, and build an authenticated backend client.
pub fn authenticated_api() -> Result<(Config, HttpStudyApi), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let auth = AuthStore::open_default()?.require()?;
    let api = HttpStudyApi::new(&config.api, &auth)?;
    Ok((config, api))
}
