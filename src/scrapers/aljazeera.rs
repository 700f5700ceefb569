//! Al Jazeera section scraper.
//!
//! Indexes a region or topic page such as
//! `https://www.aljazeera.com/where/mozambique/`, keeps the first links that
//! point at `/news/...` stories, and pulls the body paragraphs of each story.

use crate::models::Article;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use reqwest::get;
use scraper::{Html, Selector};
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Section indexed when none is configured.
pub const DEFAULT_SECTION_URL: &str = "https://www.aljazeera.com/where/mozambique/";

/// Number of stories taken from the section page by default.
pub const DEFAULT_MAX_ARTICLES: usize = 10;

const SOFT_HYPHEN: char = '\u{ad}';

/// A story discovered on the section page, not yet fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleLink {
    pub url: String,
    pub title: String,
}

/// Index the section page and return up to `max_articles` story links.
#[instrument(level = "info")]
pub async fn index_articles(
    section_url: &str,
    max_articles: usize,
) -> Result<Vec<ArticleLink>, Box<dyn Error>> {
    let base = Url::parse(section_url)?;
    let html = get(section_url).await?.error_for_status()?.text().await?;
    let links = parse_index(&html, &base, max_articles)?;

    info!(count = links.len(), source = section_url, "Indexed Al Jazeera article URLs");
    debug!(urls = ?links.iter().map(|l| &l.url).collect::<Vec<_>>(), "Al Jazeera URLs");
    Ok(links)
}

/// Fetch every linked story, one after another, in index order.
///
/// Failed fetches are logged and skipped. Stories whose body comes back
/// empty are kept so the pipeline can report them.
#[instrument(level = "info", skip_all, fields(count = links.len()))]
pub async fn fetch_articles(links: Vec<ArticleLink>) -> Vec<Article> {
    let articles: Vec<Article> = stream::iter(links)
        .then(|link: ArticleLink| async move {
            match fetch_article(&link).await {
                Ok(article) => {
                    if article.raw_text.trim().is_empty() {
                        warn!(url = %link.url, "Al Jazeera fetch produced no body text");
                    } else {
                        debug!(url = %link.url, "Fetched Al Jazeera article");
                    }
                    Some(article)
                }
                Err(e) => {
                    error!(error = %e, url = %link.url, "Al Jazeera fetch failed");
                    None
                }
            }
        })
        .filter_map(std::future::ready)
        .collect()
        .await;

    info!(count = articles.len(), "Fetched Al Jazeera article contents");
    articles
}

#[instrument(level = "info", skip_all, fields(url = %link.url))]
async fn fetch_article(link: &ArticleLink) -> Result<Article, Box<dyn Error>> {
    let body = get(&link.url).await?.error_for_status()?.text().await?;
    let text = parse_article_body(&body)?;
    info!(bytes = text.len(), "Parsed Al Jazeera article");
    Ok(Article::new(link.url.clone(), link.title.clone(), text))
}

/// Extract story links from a section page.
///
/// Only card links whose `href` starts with `/news/` count. Duplicates are
/// dropped before the limit applies, and soft hyphens are removed from titles.
pub fn parse_index(
    html: &str,
    base: &Url,
    max_articles: usize,
) -> Result<Vec<ArticleLink>, Box<dyn Error>> {
    let document = Html::parse_document(html);
    let card_selector = Selector::parse("a.u-clickable-card__link[href]")?;

    let links = document
        .select(&card_selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            if !href.starts_with("/news/") {
                return None;
            }
            let url = base.join(href).ok()?;
            let title = element
                .text()
                .collect::<String>()
                .replace(SOFT_HYPHEN, "")
                .trim()
                .to_string();
            Some(ArticleLink {
                url: url.to_string(),
                title,
            })
        })
        .unique_by(|link| link.url.clone())
        .take(max_articles)
        .collect();
    Ok(links)
}

/// Concatenate the direct paragraph children of the story body.
///
/// Paragraph texts are joined with no separator.
pub fn parse_article_body(html: &str) -> Result<String, Box<dyn Error>> {
    let document = Html::parse_document(html);
    let paragraph_selector = Selector::parse("div.wysiwyg.wysiwyg--all-content > p")?;

    Ok(document
        .select(&paragraph_selector)
        .map(|p| p.text().collect::<String>())
        .collect())
}
