/// Satellite-pass RSS and minor-planet text feeds
use super::{ensure_success, EventFeed, HttpClient};
use crate::domain::{SOURCE_HEAVENS_ABOVE, SOURCE_MPC};
use crate::errors::{ApiError, ApiResult};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{json, Value};

const MIN_TITLE_CHARS: usize = 6;
const MPC_TITLE_CHARS: usize = 50;
const MPC_MAX_RECORDS: usize = 5;

/// Heavens-Above satellite pass RSS client
pub struct HeavensAboveClient {
    http_client: HttpClient,
    url: String,
}

impl HeavensAboveClient {
    pub fn new(http_client: HttpClient, url: String) -> Self {
        Self { http_client, url }
    }
}

#[async_trait]
impl EventFeed for HeavensAboveClient {
    fn name(&self) -> &'static str {
        SOURCE_HEAVENS_ABOVE
    }

    async fn fetch(&self) -> ApiResult<Vec<Value>> {
        let resp = self.http_client.get_client().get(&self.url).send().await?;
        let text = ensure_success(self.name(), resp)?.text().await?;
        parse_satellite_rss(&text)
    }
}

/// Minor Planet Center text feed client
pub struct MpcClient {
    http_client: HttpClient,
    url: String,
}

impl MpcClient {
    pub fn new(http_client: HttpClient, url: String) -> Self {
        Self { http_client, url }
    }
}

#[async_trait]
impl EventFeed for MpcClient {
    fn name(&self) -> &'static str {
        SOURCE_MPC
    }

    async fn fetch(&self) -> ApiResult<Vec<Value>> {
        let resp = self.http_client.get_client().get(&self.url).send().await?;
        let text = ensure_success(self.name(), resp)?.text().await?;
        Ok(parse_mpc_lines(&text))
    }
}

/// Collect pass titles from an RSS document, skipping the channel's own branding
pub fn parse_satellite_rss(xml: &str) -> ApiResult<Vec<Value>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut records = Vec::new();
    let mut in_title = false;
    let mut title = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"title" => {
                in_title = true;
                title.clear();
            }
            Ok(Event::Text(t)) if in_title => {
                let text = t
                    .unescape()
                    .map_err(|e| ApiError::payload(SOURCE_HEAVENS_ABOVE, e.to_string()))?;
                title.push_str(&text);
            }
            Ok(Event::CData(c)) if in_title => {
                title.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"title" => {
                in_title = false;
                let trimmed = title.trim();
                if trimmed.chars().count() >= MIN_TITLE_CHARS
                    && !trimmed.contains(SOURCE_HEAVENS_ABOVE)
                {
                    records.push(json!({
                        "title": trimmed,
                        "source": SOURCE_HEAVENS_ABOVE,
                        "type": "satellite",
                    }));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ApiError::payload(
                    SOURCE_HEAVENS_ABOVE,
                    format!("at byte {}: {}", reader.buffer_position(), e),
                ))
            }
            _ => {}
        }
    }

    Ok(records)
}

/// Pick comet and asteroid lines out of the MPC listing
pub fn parse_mpc_lines(text: &str) -> Vec<Value> {
    text.lines()
        .filter_map(|line| {
            let kind = if line.contains("COMET") {
                "comet"
            } else if line.contains("ASTEROID") {
                "asteroid"
            } else {
                return None;
            };
            let title: String = line.chars().take(MPC_TITLE_CHARS).collect();
            Some(json!({
                "title": title.trim(),
                "source": SOURCE_MPC,
                "type": kind,
            }))
        })
        .take(MPC_MAX_RECORDS)
        .collect()
}
