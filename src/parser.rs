use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::category::classify;
use crate::models::FitnessClass;

type Strategy = fn(&Html, &str) -> Vec<FitnessClass>;

/// Tried in order; the first one that yields anything wins.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("table", parse_tables as Strategy),
    ("data-activity-id", parse_activity_elements as Strategy),
];

const ACTIVITY_ID_ATTR: &str = "data-activity-id";
const HEADER_LABELS: &[&str] = &["name", "class", "activity"];

/// `%y` must come before `%Y`, otherwise "6/1/24" parses as year 24.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%A, %B %d, %Y",
    "%B %d, %Y",
];

static TABLE: Lazy<Selector> = Lazy::new(|| selector("table"));
static ROW: Lazy<Selector> = Lazy::new(|| selector("tr"));
static ACTIVITY: Lazy<Selector> = Lazy::new(|| selector("[data-activity-id]"));
static NAME: Lazy<Selector> = Lazy::new(|| selector("[class*='name']"));
static DATE: Lazy<Selector> = Lazy::new(|| selector("[class*='date']"));
static TIME: Lazy<Selector> = Lazy::new(|| selector("[class*='time']"));
static LOCATION: Lazy<Selector> = Lazy::new(|| selector("[class*='location']"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector parses")
}

/// Extracts every class in `markup`, in document order. A page none of the
/// strategies understands yields an empty list.
pub fn parse_schedule(markup: &str, default_location: &str) -> Vec<FitnessClass> {
    let document = Html::parse_document(markup);

    for (name, strategy) in STRATEGIES {
        let classes = strategy(&document, default_location);
        if !classes.is_empty() {
            debug!(strategy = name, count = classes.len(), "schedule parsed");
            return classes;
        }
        debug!(strategy = name, "strategy found nothing");
    }

    warn!("no classes found in page");
    Vec::new()
}

pub fn parse_tables(document: &Html, default_location: &str) -> Vec<FitnessClass> {
    let mut classes = Vec::new();

    for table in document.select(&TABLE) {
        for row in table.select(&ROW).skip(1) {
            let cells: Vec<String> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                .map(|cell| element_text(&cell))
                .collect();
            if cells.len() < 3 {
                continue;
            }

            let name = &cells[0];
            if name.is_empty() || is_header_label(name) {
                continue;
            }

            let location = cells
                .get(3)
                .filter(|loc| !loc.is_empty())
                .map_or(default_location, String::as_str);
            classes.push(build_class(name, &cells[1], &cells[2], location, None));
        }
    }

    classes
}

pub fn parse_activity_elements(document: &Html, default_location: &str) -> Vec<FitnessClass> {
    document
        .select(&ACTIVITY)
        .filter_map(|element| {
            let name = descendant_text(&element, &NAME);
            if name.is_empty() {
                return None;
            }
            let location = descendant_text(&element, &LOCATION);
            let location = if location.is_empty() {
                default_location
            } else {
                &location
            };
            let activity_id = element
                .value()
                .attr(ACTIVITY_ID_ATTR)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string);

            Some(build_class(
                &name,
                &descendant_text(&element, &DATE),
                &descendant_text(&element, &TIME),
                location,
                activity_id,
            ))
        })
        .collect()
}

fn build_class(
    name: &str,
    date: &str,
    time: &str,
    location: &str,
    activity_id: Option<String>,
) -> FitnessClass {
    FitnessClass {
        name: name.to_string(),
        date: normalize_date(date),
        time: time.to_string(),
        location: location.to_string(),
        category: classify(name),
        activity_id,
    }
}

fn is_header_label(text: &str) -> bool {
    HEADER_LABELS
        .iter()
        .any(|label| text.eq_ignore_ascii_case(label))
}

/// All text under `element` with whitespace runs collapsed to single spaces.
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn descendant_text(element: &ElementRef, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default()
}

/// ISO-8601 for the formats the booking site is known to use; anything else
/// is passed through as-is.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| raw.to_string())
}
