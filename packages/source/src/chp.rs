//! California Highway Patrol incident page scraper.
//!
//! The CHP CAD page (<https://cad.chp.ca.gov/traffic.aspx>) renders the
//! current incidents for a communications center as an ASP.NET `GridView`
//! with no stable row identifiers and no API. Getting one incident out of it
//! takes two requests:
//!
//! 1. GET the page and read the first body row of the `#gvIncidents` table
//!    (number, time, type, location). A `Location` of `"Media Log"` is the
//!    placeholder row shown when there is nothing to report.
//! 2. POST the `Select$0` postback (echoing the page's `__VIEWSTATE` token)
//!    to expand that row, then regex the response for the lat/lng pair and
//!    the `colspan="6"` detail cells.
//!
//! Coordinates are only trusted at the source's full 6-decimal precision —
//! the page also embeds truncated map-center coordinates that must not be
//! mistaken for the incident position.

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use traffic_watch_geocoder::{Locality, nominatim};
use traffic_watch_incident_models::Incident;

use crate::{IncidentSource, SourceError};

/// The CHP CAD traffic page.
const CHP_PAGE_URL: &str = "https://cad.chp.ca.gov/traffic.aspx";

/// Default communications center: Border (San Diego area).
pub const DEFAULT_COM_CENTER: &str = "BCCC";

/// Hidden `__VIEWSTATE` input carrying the ASP.NET page state token.
const VIEWSTATE_PATTERN: &str =
    r#"<input\s+type="hidden"\s+name="__VIEWSTATE"\s+id="__VIEWSTATE"\s+value="([^"]+)"\s*/?>"#;

/// Incident coordinates as embedded in the expanded row: `lat lon`.
const LAT_LON_PATTERN: &str = r"(\d+\.\d+) (-\d+\.\d+)";

/// Detail lines live in full-width cells spanning the table.
const DETAIL_CELL_PATTERN: &str = r#"(?s)<td[^>]*colspan="6"[^>]*>(.*?)</td>"#;

/// Bracketed tags (`[17]`, `[Appears to be...]`) prefixing each detail line.
const BRACKETS_PATTERN: &str = r"\[.*?\]";

/// Unit-status detail lines that are dispatch noise, not incident facts.
const EXCLUDED_DETAILS: [&str; 3] = ["Unit At Scene", "Unit Enroute", "Unit Assigned"];

/// Decimal digits required of a trustworthy coordinate.
const COORD_PRECISION: usize = 6;

/// Scraper for one CHP communications center.
pub struct ChpSource {
    client: reqwest::Client,
    url: String,
    com_center: String,
    geocoder_base_url: String,
}

impl ChpSource {
    /// Creates a scraper for the given communications center code.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the HTTP client cannot be constructed.
    pub fn new(com_center: &str) -> Result<Self, SourceError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,\
                 image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
            ),
        );
        let client = reqwest::Client::builder()
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
            )
            .default_headers(headers)
            .build()
            .map_err(SourceError::Http)?;

        Ok(Self {
            client,
            url: format!("{CHP_PAGE_URL}?__EVENTTARGET=ddlComCenter&ddlComCenter={com_center}"),
            com_center: com_center.to_owned(),
            geocoder_base_url: nominatim::DEFAULT_BASE_URL.to_owned(),
        })
    }

    /// Overrides the reverse-geocoder endpoint (for self-hosted Nominatim).
    #[must_use]
    pub fn with_geocoder_base_url(mut self, base_url: &str) -> Self {
        base_url.clone_into(&mut self.geocoder_base_url);
        self
    }

    /// Runs the `Select$0` postback and returns the expanded-row HTML.
    async fn fetch_detail_page(&self, viewstate: &str) -> Result<String, SourceError> {
        let form = [
            ("__LASTFOCUS", ""),
            ("__EVENTTARGET", "gvIncidents"),
            ("__EVENTARGUMENT", "Select$0"),
            ("__VIEWSTATE", viewstate),
            ("__VIEWSTATEGENERATOR", "B13DF00D"),
            ("ddlComCenter", self.com_center.as_str()),
            ("ddlSearches", "Choose One"),
            ("ddlResources", "Choose One"),
        ];
        let response = self
            .client
            .post(&self.url)
            .query(&[("ddlComCenter", self.com_center.as_str())])
            .form(&form)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl IncidentSource for ChpSource {
    fn id(&self) -> String {
        format!("chp_{}", self.com_center.to_lowercase())
    }

    async fn fetch(&self) -> Result<Option<Incident>, SourceError> {
        let page = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let Some(row) = parse_first_row(&page)? else {
            log::debug!("{}: placeholder row, nothing to report", self.id());
            return Ok(None);
        };

        let Some(viewstate) = extract_viewstate(&page)? else {
            log::warn!("{}: no __VIEWSTATE on page", self.id());
            return Ok(None);
        };

        let detail_page = self.fetch_detail_page(&viewstate).await?;

        let Some((latitude, longitude)) = extract_coordinates(&detail_page)? else {
            log::debug!(
                "{}: no full-precision coordinates for the selected row",
                self.id()
            );
            return Ok(None);
        };

        let details = extract_details(&detail_page)?;

        // Locality is best-effort enrichment; a geocoder outage must not
        // drop the incident.
        let locality = match nominatim::reverse(
            &self.client,
            &self.geocoder_base_url,
            latitude,
            longitude,
        )
        .await
        {
            Ok(locality) => locality.unwrap_or_default(),
            Err(e) => {
                log::warn!("{}: reverse geocoding failed: {e}", self.id());
                Locality::default()
            }
        };

        Ok(Some(Incident {
            number: row.number,
            time: row.time,
            report_type: row.report_type,
            location: row.location,
            details,
            latitude: Some(latitude),
            longitude: Some(longitude),
            neighborhood: locality.neighborhood,
            city: locality.city,
        }))
    }
}

/// The live-table half of an incident, before the postback.
#[derive(Debug, Default, PartialEq, Eq)]
struct TableRow {
    number: Option<String>,
    time: Option<String>,
    report_type: Option<String>,
    location: Option<String>,
}

/// Parses a CSS selector string, returning a [`SourceError`] on failure.
fn parse_selector(selector: &str) -> Result<Selector, SourceError> {
    Selector::parse(selector).map_err(|e| SourceError::Parse {
        message: format!("invalid CSS selector '{selector}': {e}"),
    })
}

/// Compiles a regex pattern, returning a [`SourceError`] on failure.
fn compile(pattern: &str) -> Result<Regex, SourceError> {
    Regex::new(pattern).map_err(|e| SourceError::Parse {
        message: format!("invalid pattern: {e}"),
    })
}

/// Extracts the first body row of the incident table.
///
/// Returns `Ok(None)` for the `"Media Log"` placeholder row or an empty
/// table — both mean "nothing to report right now".
fn parse_first_row(html: &str) -> Result<Option<TableRow>, SourceError> {
    let document = Html::parse_document(html);

    let table_sel = parse_selector("table#gvIncidents")?;
    let table = document.select(&table_sel).next().ok_or_else(|| {
        SourceError::Parse {
            message: "no #gvIncidents table in response".to_owned(),
        }
    })?;

    let header_sel = parse_selector("th")?;
    let headers: Vec<String> = table
        .select(&header_sel)
        .map(|el| el.text().collect::<Vec<_>>().join("").trim().to_owned())
        .collect();

    if headers.is_empty() {
        return Err(SourceError::Parse {
            message: "no header cells in #gvIncidents".to_owned(),
        });
    }

    let row_sel = parse_selector("tr")?;
    let cell_sel = parse_selector("td")?;
    let Some(first_row) = table.select(&row_sel).nth(1) else {
        return Ok(None);
    };
    let cells: Vec<String> = first_row
        .select(&cell_sel)
        .map(|el| el.text().collect::<Vec<_>>().join("").trim().to_owned())
        .collect();

    let mut row = TableRow::default();
    for (header, cell) in headers.iter().zip(cells) {
        let value = non_empty(cell);
        match header.as_str() {
            "No." => row.number = value,
            "Time" => row.time = value,
            "Type" => row.report_type = value,
            "Location" => row.location = value,
            // "Area" and anything else the grid grows is dropped.
            _ => {}
        }
    }

    if row.location.as_deref() == Some("Media Log") {
        return Ok(None);
    }

    Ok(Some(row))
}

/// Pulls the `__VIEWSTATE` token out of the page, if present.
fn extract_viewstate(html: &str) -> Result<Option<String>, SourceError> {
    let re = compile(VIEWSTATE_PATTERN)?;
    Ok(re
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned()))
}

/// Finds the first lat/lng pair where both components carry the source's
/// full 6-decimal precision.
fn extract_coordinates(html: &str) -> Result<Option<(f64, f64)>, SourceError> {
    let re = compile(LAT_LON_PATTERN)?;
    for caps in re.captures_iter(html) {
        let (Some(lat_str), Some(lon_str)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if decimal_digits(lat_str.as_str()) == COORD_PRECISION
            && decimal_digits(lon_str.as_str()) == COORD_PRECISION
            && let (Ok(lat), Ok(lon)) = (
                lat_str.as_str().parse::<f64>(),
                lon_str.as_str().parse::<f64>(),
            )
        {
            return Ok(Some((lat, lon)));
        }
    }
    Ok(None)
}

/// Extracts the cleaned detail lines from the expanded row.
fn extract_details(html: &str) -> Result<Vec<String>, SourceError> {
    let cell_re = compile(DETAIL_CELL_PATTERN)?;
    let brackets_re = compile(BRACKETS_PATTERN)?;

    let mut details = Vec::new();
    for caps in cell_re.captures_iter(html) {
        let Some(raw) = caps.get(1) else { continue };
        let cleaned = brackets_re.replace_all(raw.as_str(), "").trim().to_owned();
        if cleaned.is_empty() {
            continue;
        }
        if EXCLUDED_DETAILS
            .iter()
            .any(|excluded| cleaned.contains(excluded))
        {
            continue;
        }
        details.push(cleaned);
    }
    Ok(details)
}

/// Number of digits after the decimal point.
fn decimal_digits(s: &str) -> usize {
    s.rsplit_once('.').map_or(0, |(_, frac)| frac.len())
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
