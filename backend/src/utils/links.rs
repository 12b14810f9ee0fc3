use anyhow::anyhow;
use url::Url;

const MAP_BASE_URL: &str = "https://maps.google.com/";

/// Public URL of the live-view page for a share token.
pub fn live_url(public_base_url: &str, share_token: &str) -> anyhow::Result<String> {
    let mut url = Url::parse(public_base_url)?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("Base URL cannot carry a path: {}", public_base_url))?
        .pop_if_empty()
        .extend(["live", share_token]);
    Ok(url.to_string())
}

/// Map link pinned at the given coordinates.
pub fn map_url(latitude: f64, longitude: f64) -> String {
    format!("{}?q={},{}", MAP_BASE_URL, latitude, longitude)
}
