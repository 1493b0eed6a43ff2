use anyhow::{anyhow, Result};
use clap::Parser;
use facsearch_core::persist::write_records;
use facsearch_core::FacultyRecord;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use sha1::{Digest, Sha1};
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

lazy_static! {
    static ref DIRECTORY_RE: Regex = Regex::new(r"faculty-staff/index\.shtml").expect("valid regex");
    static ref SEL_LINK: Selector = Selector::parse("a[href]").expect("valid selector");
    static ref SEL_CARD: Selector = Selector::parse("div.card.h-100").expect("valid selector");
    static ref SEL_NAME: Selector = Selector::parse("h3").expect("valid selector");
    static ref SEL_OPEN: Selector = Selector::parse(r#"a[aria-label*="open"]"#).expect("valid selector");
    static ref SEL_EMAIL: Selector = Selector::parse(r#"a[aria-label*="email"]"#).expect("valid selector");
    static ref SEL_SR_ONLY: Selector = Selector::parse("span.sr-only").expect("valid selector");
    static ref SEL_ABOUT: Selector = Selector::parse("div.fac-staff").expect("valid selector");
    static ref SEL_P: Selector = Selector::parse("p").expect("valid selector");
    static ref SEL_ASIDE: Selector = Selector::parse("aside.span3.fac.rightcol").expect("valid selector");
    static ref SEL_ACCOLADES: Selector = Selector::parse("div.accolades").expect("valid selector");
    static ref SEL_H2: Selector = Selector::parse("h2").expect("valid selector");
    static ref SEL_P_OR_A: Selector = Selector::parse("p, a").expect("valid selector");
}

#[derive(Parser, Debug)]
#[command(name = "facsearch-crawler")]
#[command(about = "Crawl a department's faculty directory and profile pages to JSONL")]
struct Cli {
    /// Department page that links to its faculty-staff directory
    #[arg(long, default_value = "https://www.cpp.edu/cba/international-business-marketing/index.shtml")]
    seed: String,
    /// Output JSONL record store (replaced on every run)
    #[arg(long, default_value = "./data/faculty.jsonl")]
    output: String,
    /// Profile pages fetched in parallel
    #[arg(long, default_value_t = 8)]
    concurrency: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
    /// User-Agent string sent with every request
    #[arg(long, default_value = "facsearch-bot/0.1")]
    user_agent: String,
}

/// What the directory listing shows for one person.
#[derive(Debug, Clone, PartialEq)]
struct FacultyCard {
    name: String,
    profile_link: Option<Url>,
    phone: Option<String>,
    office: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Profile {
    about: Option<String>,
    accolades: IndexMap<String, String>,
}

impl FacultyCard {
    /// `position` is the card's index in the directory listing. It is part of
    /// the id so a profile listed twice, or two unnamed cards, stay distinct.
    fn into_record(self, position: usize, profile: Option<Profile>) -> FacultyRecord {
        let key = self.profile_link.as_ref().map(Url::as_str).unwrap_or(&self.name);
        let mut hasher = Sha1::new();
        hasher.update(format!("{key}#{position}").as_bytes());
        let id = format!("{:x}", hasher.finalize());
        let (about, accolades) = match profile {
            Some(p) => (p.about, Some(p.accolades)),
            None => (None, None),
        };
        FacultyRecord {
            id,
            name: self.name,
            profile_link: self.profile_link.map(String::from),
            phone: self.phone,
            office: self.office,
            email: self.email,
            about,
            accolades,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    let seed = Url::parse(&args.seed)?;
    let seed_html = fetch(&client, &seed).await?;
    let directory = find_directory_link(&seed_html, &seed)
        .ok_or_else(|| anyhow!("no faculty-staff directory link on {seed}"))?;
    tracing::info!(%directory, "found faculty directory");

    let directory_html = fetch(&client, &directory).await?;
    let cards = parse_faculty_cards(&directory_html, &directory);
    tracing::info!(cards = cards.len(), "parsed faculty cards");

    let mut records = Vec::with_capacity(cards.len());
    for chunk in cards.chunks(args.concurrency.max(1)) {
        let handles: Vec<_> = chunk
            .iter()
            .map(|card| {
                let client = client.clone();
                let link = card.profile_link.clone();
                tokio::spawn(async move {
                    match link {
                        Some(url) => fetch_profile(&client, &url).await,
                        None => None,
                    }
                })
            })
            .collect();
        for (card, handle) in chunk.iter().zip(handles) {
            let profile = handle.await.unwrap_or_else(|e| {
                tracing::warn!(name = %card.name, error = %e, "profile task failed");
                None
            });
            let record = card.clone().into_record(records.len(), profile);
            tracing::debug!(id = %record.id, name = %record.name, "stored record");
            records.push(record);
        }
    }

    write_records(&args.output, &records)?;
    tracing::info!(records = records.len(), output = %args.output, "crawl complete");
    Ok(())
}

async fn fetch(client: &Client, url: &Url) -> Result<String> {
    let resp = client.get(url.clone()).send().await?.error_for_status()?;
    Ok(resp.text().await?)
}

async fn fetch_profile(client: &Client, url: &Url) -> Option<Profile> {
    match fetch(client, url).await {
        Ok(html) => Some(parse_profile(&html)),
        Err(e) => {
            tracing::warn!(%url, error = %e, "failed to retrieve profile");
            None
        }
    }
}

/// Text of every descendant, each piece trimmed, concatenated.
fn stripped_text(el: ElementRef<'_>) -> String { el.text().map(str::trim).collect() }

fn trimmed_text(el: ElementRef<'_>) -> String { el.text().collect::<String>().trim().to_string() }

fn find_directory_link(html: &str, base: &Url) -> Option<Url> {
    let doc = Html::parse_document(html);
    let found = doc
        .select(&SEL_LINK)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| DIRECTORY_RE.is_match(href))?;
    base.join(found).ok()
}

/// Trimmed text node that follows the screen-reader label `label` in `card`.
fn labelled_value(card: ElementRef<'_>, label: &str) -> Option<String> {
    let span = card.select(&SEL_SR_ONLY).find(|s| trimmed_text(*s) == label)?;
    span.next_siblings()
        .filter_map(|n| n.value().as_text().map(|t| t.trim().to_string()))
        .find(|t| !t.is_empty())
}

fn parse_faculty_cards(html: &str, base: &Url) -> Vec<FacultyCard> {
    let doc = Html::parse_document(html);
    doc.select(&SEL_CARD)
        .map(|card| {
            let name = card.select(&SEL_NAME).next().map(trimmed_text).unwrap_or_else(|| "N/A".to_string());
            let profile_link = card
                .select(&SEL_OPEN)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| base.join(href).ok());
            let email = card
                .select(&SEL_EMAIL)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| href.trim_start_matches("mailto:").to_string());
            FacultyCard {
                name,
                profile_link,
                phone: labelled_value(card, "phone number or extension"),
                office: labelled_value(card, "office location"),
                email,
            }
        })
        .collect()
}

fn parse_profile(html: &str) -> Profile {
    let doc = Html::parse_document(html);
    let about = doc.select(&SEL_ABOUT).next().map(|section| {
        section.select(&SEL_P).map(stripped_text).collect::<Vec<_>>().join(" ")
    });

    let mut accolades = IndexMap::new();
    if let Some(aside) = doc.select(&SEL_ASIDE).next() {
        for div in aside.select(&SEL_ACCOLADES) {
            let Some(header) = div.select(&SEL_H2).next().map(trimmed_text) else { continue };
            let content: Vec<String> = div
                .select(&SEL_P_OR_A)
                .map(|el| match el.value().name() {
                    "a" => format!("{} ({})", trimmed_text(el), el.value().attr("href").unwrap_or("None")),
                    _ => trimmed_text(el),
                })
                .collect();
            accolades.insert(header, content.join(" "));
        }
    }
    Profile { about, accolades }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url { Url::parse("https://www.cpp.edu/cba/international-business-marketing/index.shtml").unwrap() }

    #[test]
    fn finds_the_directory_link() {
        let html = r#"<a href="/cba/news.shtml">News</a>
            <a href="/cba/international-business-marketing/faculty-staff/index.shtml">Faculty</a>"#;
        let url = find_directory_link(html, &base()).unwrap();
        assert_eq!(url.as_str(), "https://www.cpp.edu/cba/international-business-marketing/faculty-staff/index.shtml");
        assert!(find_directory_link("<a href='/x'>x</a>", &base()).is_none());
    }

    #[test]
    fn parses_faculty_cards() {
        let html = r#"
            <div class="card h-100">
              <h3> Jane Doe </h3>
              <a aria-label="open Jane Doe profile" href="/faculty/jdoe/index.shtml">Profile</a>
              <p><span class="sr-only">phone number or extension</span> 909-555-0100</p>
              <p><span class="sr-only">office location</span> Building 94</p>
              <a aria-label="email Jane Doe" href="mailto:jdoe@cpp.edu">Email</a>
            </div>
            <div class="card h-100"><p>no details</p></div>"#;
        let cards = parse_faculty_cards(html, &base());
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].name, "Jane Doe");
        assert_eq!(cards[0].profile_link.as_ref().unwrap().as_str(), "https://www.cpp.edu/faculty/jdoe/index.shtml");
        assert_eq!(cards[0].phone.as_deref(), Some("909-555-0100"));
        assert_eq!(cards[0].office.as_deref(), Some("Building 94"));
        assert_eq!(cards[0].email.as_deref(), Some("jdoe@cpp.edu"));
        assert_eq!(cards[1].name, "N/A");
        assert_eq!(cards[1].profile_link, None);
    }

    #[test]
    fn parses_about_and_accolades() {
        let html = r#"
            <div class="fac-staff"><p> Professor of <b>marketing</b>. </p><p>Joined 2010.</p></div>
            <aside class="span3 fac rightcol">
              <div class="accolades"><h2>Education</h2><p>PhD, UCLA</p></div>
              <div class="accolades"><h2> Publications </h2>
                <p>Brand equity.</p><a href="https://doi.org/1">Paper</a></div>
              <div class="accolades"><p>headerless</p></div>
            </aside>"#;
        let profile = parse_profile(html);
        assert_eq!(profile.about.as_deref(), Some("Professor ofmarketing. Joined 2010."));
        let entries: Vec<_> = profile.accolades.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            entries,
            vec![("Education", "PhD, UCLA"), ("Publications", "Brand equity. Paper (https://doi.org/1)")]
        );
    }

    #[test]
    fn record_ids_are_unique_per_directory_position() {
        let card = FacultyCard {
            name: "Jane Doe".into(),
            profile_link: Some(Url::parse("https://www.cpp.edu/faculty/jdoe/").unwrap()),
            phone: None,
            office: None,
            email: None,
        };
        let a = card.clone().into_record(0, None);
        let b = FacultyCard { name: "Someone Else".into(), ..card.clone() }.into_record(1, Some(Profile::default()));
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 40);
        assert_eq!(a.id, card.clone().into_record(0, None).id);

        let unnamed = FacultyCard { name: "N/A".into(), profile_link: None, ..card };
        assert_ne!(unnamed.clone().into_record(2, None).id, unnamed.into_record(3, None).id);
        assert_eq!(a.about, None);
        assert_eq!(b.accolades, Some(IndexMap::new()));
    }
}
