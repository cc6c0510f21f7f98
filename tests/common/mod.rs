#![allow(dead_code)]

use async_trait::async_trait;
use jobscout::core::PageFetcher;
use jobscout::FetchError;
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// HTML fixtures keyed by URL. Unknown URLs answer 404, scripted ones 500.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_matching(&self, needle: &str) -> usize {
        self.requests().iter().filter(|u| u.contains(needle)).count()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        if self.failing.contains(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
            });
        }

        self.pages.get(url).cloned().ok_or(FetchError::Status {
            url: url.to_string(),
            status: StatusCode::NOT_FOUND,
        })
    }
}

/// A kleinanzeigen-style result page.
pub fn result_page(hrefs: &[&str]) -> String {
    let items: String = hrefs
        .iter()
        .map(|href| {
            format!(
                r#"<article class="aditem"><h2><a class="ellipsis" href="{href}">Anzeige</a></h2></article>"#
            )
        })
        .collect();
    format!("<html><body><div id=\"srchrslt-adtable\">{items}</div></body></html>")
}

/// A kleinanzeigen-style detail page.
pub fn ad_page(title: &str, description: &str, date: &str, wage: Option<&str>) -> String {
    let wage = wage
        .map(|w| {
            format!(
                r#"<li class="addetailslist--detail">Stundenlohn<span class="addetailslist--detail--value">{w}</span></li>"#
            )
        })
        .unwrap_or_default();

    format!(
        r#"<html><head>
            <meta itemprop="name" content="{title}">
            <meta itemprop="description" content="{description}">
        </head><body>
            <span itemprop="locality">10115 Berlin - Mitte</span>
            <div id="viewad-extra-info"><div><i class="icon icon-small icon-calendar-gray-simple"></i><span>{date}</span></div></div>
            <ul class="addetailslist">{wage}</ul>
        </body></html>"#
    )
}
