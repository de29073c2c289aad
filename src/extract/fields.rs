//! Field extraction from detail pages
//!
//! All lookups are text heuristics over the listing page markup: labelled
//! `<li>` items (户型：, 面积：, ...), the first bare number in a
//! `<strong>`/`<em>` for the rent, and regular expressions over the visible
//! page text for codes, dates, deposit terms and contact data.

use crate::browser::LoadedPage;
use crate::extract::{RawRecord, RentalMode};
use chrono::Local;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use thiserror::Error;

/// A detail page lacked at least one required field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("extraction failed for {url}: missing {}", .missing.join(", "))]
pub struct ExtractionFailure {
    pub url: String,

    /// Names of the required fields that could not be read
    pub missing: Vec<&'static str>,
}

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{3,5}$").unwrap());
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());
static HOUSE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"房屋编码[：:]\s*(\d+)").unwrap());
static UPDATED_AT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"更新时间[：:]\s*(\d{4}年\d{1,2}月\d{1,2}日)").unwrap());
static DEPOSIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"付\s*(\d+)\s*押\s*(\d+)").unwrap());
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(1[3-9]\d{9})(?:\D|$)").unwrap());
static COMPANY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"公司[：:]\s*([^\n.…]+)").unwrap());
static BROKER_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\u{4e00}-\u{9fa5}]{2,3}$").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const BROKER_NAME_EXCLUDED: &[&str] = &["小区", "房源", "看了又看", "专家", "相似房源"];

const OVERVIEW_HEADING: &str = "房源概况";
const OVERVIEW_KEYWORDS: &[&str] = &["小区环境优美", "南北通透", "拎包即住", "性价比高", "物业办事效率"];
const OVERVIEW_CUTOFFS: &[&str] = &["猜你喜欢", "相似房源", "附近房源", "专家解读", "小区问答", "出租要求"];

/// Headings above facility lists: whole units show 房屋配套, shared rooms
/// split into bedroom and common-area lists
const FACILITY_HEADINGS: &[&str] = &["房屋配套", "卧室设施", "公共设施"];
const FACILITY_HINTS: &[&str] = &["冰箱", "洗衣机", "空调", "电视"];

/// Longest own text an element may have to count as a section heading
const HEADING_MAX_CHARS: usize = 12;

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "li", "ol", "p", "section", "table", "tr", "ul",
];

/// Extracts a listing record from a loaded detail page
///
/// Returns [`ExtractionFailure`] naming every missing required field
/// (title, price, area, layout) instead of a partial record.
pub fn extract(page: &LoadedPage) -> Result<RawRecord, ExtractionFailure> {
    let document = page.document();
    let text = visible_text(document.root_element());
    let labeled = LabeledItems::collect(&document);

    let title = select_all(&document, "h1")
        .into_iter()
        .map(|h1| collapse_whitespace(&h1.text().collect::<String>()))
        .find(|t| !t.is_empty());
    let price = extract_price(&document);
    let area = labeled.area.as_deref().and_then(parse_number);
    let layout = labeled.layout.clone();

    let mut missing = Vec::new();
    if title.is_none() {
        missing.push("title");
    }
    if price.is_none() {
        missing.push("price");
    }
    if area.is_none() {
        missing.push("area");
    }
    if layout.is_none() {
        missing.push("layout");
    }

    let (Some(title), Some(price), Some(area), Some(layout)) = (title, price, area, layout) else {
        return Err(ExtractionFailure {
            url: page.url().to_string(),
            missing,
        });
    };

    let rental_mode = if title.contains("合租") {
        RentalMode::Shared
    } else if text.contains("整租") {
        RentalMode::Whole
    } else {
        RentalMode::Shared
    };

    let contact_name = extract_broker_name(&document);
    let agent_info = contact_name
        .as_ref()
        .map(|name| format!("{} - 房产经纪人", name));

    Ok(RawRecord {
        house_id: capture(&HOUSE_ID_RE, &text),
        title,
        rental_mode,
        officially_verified: text.contains("核验码"),
        anxuan_selected: text.contains("安选"),
        price,
        deposit: extract_deposit(&text),
        area,
        layout,
        community: select_all(&document, r#"a[href*="/community/view/"]"#)
            .into_iter()
            .map(|a| collapse_whitespace(&a.text().collect::<String>()))
            .find(|t| !t.is_empty()),
        detail_url: page.url().to_string(),
        floor: labeled.floor,
        orientation: labeled.orientation,
        decoration: labeled.decoration,
        phone: capture(&PHONE_RE, &text),
        contact_name,
        company: capture(&COMPANY_RE, &text)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
        agent_info,
        overview: extract_overview(&document),
        facilities: extract_facilities(&document),
        updated_at: capture(&UPDATED_AT_RE, &text),
        crawled_at: Local::now().naive_local(),
    })
}

/// Values of the `label：value` list items
#[derive(Debug, Default)]
struct LabeledItems {
    layout: Option<String>,
    area: Option<String>,
    floor: Option<String>,
    orientation: Option<String>,
    decoration: Option<String>,
}

impl LabeledItems {
    fn collect(document: &Html) -> Self {
        let mut items = Self::default();

        for li in select_all(document, "li") {
            let text = li.text().collect::<String>();
            let slot = if text.contains("户型：") {
                (&mut items.layout, "户型：")
            } else if text.contains("面积：") {
                (&mut items.area, "面积：")
            } else if text.contains("楼层：") {
                (&mut items.floor, "楼层：")
            } else if text.contains("朝向：") {
                (&mut items.orientation, "朝向：")
            } else if text.contains("装修：") {
                (&mut items.decoration, "装修：")
            } else {
                continue;
            };

            let (field, label) = slot;
            if field.is_some() {
                continue;
            }
            let value = text
                .split_once(label)
                .map(|(_, value)| collapse_whitespace(value))
                .unwrap_or_default();
            if !value.is_empty() {
                *field = Some(value);
            }
        }

        items
    }
}

/// Monthly rent: the first `<strong>`/`<em>` holding a bare 3-5 digit number
fn extract_price(document: &Html) -> Option<u32> {
    select_all(document, "strong, em")
        .into_iter()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| PRICE_RE.is_match(t))
        .find_map(|t| t.parse().ok())
}

fn extract_deposit(text: &str) -> Option<String> {
    if let Some(caps) = DEPOSIT_RE.captures(text) {
        return Some(format!("付{}押{}", &caps[1], &caps[2]));
    }
    text.contains("面议").then(|| "面议".to_string())
}

/// Broker name: the first `<h2>` consisting of two or three CJK characters
fn extract_broker_name(document: &Html) -> Option<String> {
    select_all(document, "h2")
        .into_iter()
        .map(|h2| h2.text().collect::<String>().trim().to_string())
        .find(|t| {
            BROKER_NAME_RE.is_match(t) && !BROKER_NAME_EXCLUDED.iter().any(|w| t.contains(w))
        })
}

fn extract_overview(document: &Html) -> Option<String> {
    let elements = select_all(document, "*");

    let under_heading = elements
        .iter()
        .filter(|el| is_heading(**el, &[OVERVIEW_HEADING]))
        .filter_map(|el| el.next_siblings().find_map(ElementRef::wrap))
        .map(visible_text)
        .find_map(|text| clean_overview(&text));
    if under_heading.is_some() {
        return under_heading;
    }

    // Most specific element mentioning a typical description phrase
    elements
        .iter()
        .map(|el| visible_text(*el))
        .filter(|text| {
            let len = text.chars().count();
            len > 50 && len < 2000 && OVERVIEW_KEYWORDS.iter().any(|k| text.contains(k))
        })
        .min_by_key(|text| text.chars().count())
        .and_then(|text| clean_overview(&text))
}

fn clean_overview(text: &str) -> Option<String> {
    let cut = OVERVIEW_CUTOFFS
        .iter()
        .filter_map(|marker| text.find(marker))
        .min()
        .unwrap_or(text.len());
    let overview = collapse_whitespace(&text[..cut]);

    (overview.chars().count() > 10).then_some(overview)
}

/// Facilities marked present (class containing `has`) in the lists that
/// follow the facility headings
fn extract_facilities(document: &Html) -> BTreeSet<String> {
    let mut facilities = BTreeSet::new();

    for heading in select_all(document, "*")
        .into_iter()
        .filter(|el| is_heading(*el, FACILITY_HEADINGS))
    {
        let list = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| matches!(el.value().name(), "ul" | "ol"));
        if let Some(list) = list {
            collect_present(list, &mut facilities);
        }
    }

    if facilities.is_empty() {
        let fallback = select_all(document, "ul, ol").into_iter().find(|list| {
            let items = select_within(*list, "li");
            items.len() > 5
                && items.first().is_some_and(|first| {
                    let text = first.text().collect::<String>();
                    FACILITY_HINTS.iter().any(|hint| text.contains(hint))
                })
        });
        if let Some(list) = fallback {
            collect_present(list, &mut facilities);
        }
    }

    facilities
}

fn collect_present(list: ElementRef, facilities: &mut BTreeSet<String>) {
    for item in select_within(list, "li") {
        let present = item
            .value()
            .attr("class")
            .is_some_and(|class| class.contains("has"));
        let name = collapse_whitespace(&item.text().collect::<String>());
        if present && !name.is_empty() {
            facilities.insert(name);
        }
    }
}

/// Whether the element's own text is a short heading naming one of `words`
fn is_heading(element: ElementRef, words: &[&str]) -> bool {
    let own: String = element
        .children()
        .filter_map(|child| child.value().as_text().map(|t| t.to_string()))
        .collect();
    let own = own.trim();

    !own.is_empty()
        && own.chars().count() <= HEADING_MAX_CHARS
        && words.iter().any(|w| own.contains(w))
}

/// Text a reader would see, with block elements on their own lines
fn visible_text(element: ElementRef) -> String {
    let mut out = String::new();
    push_visible_text(element, &mut out);
    out
}

fn push_visible_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let name = child.value().name();
            if matches!(name, "script" | "style" | "noscript" | "template") {
                continue;
            }
            let block = BLOCK_ELEMENTS.contains(&name);
            if block {
                out.push('\n');
            }
            push_visible_text(child, out);
            if block {
                out.push('\n');
            }
        }
    }
}

fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn select_within<'a>(element: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => element.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn parse_number(text: &str) -> Option<f64> {
    NUMBER_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}
