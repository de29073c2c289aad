//! The listing record and its flat column layout

use chrono::NaiveDateTime;
use std::collections::BTreeSet;
use std::fmt;

/// Timestamp layout of `crawled_at`
pub const CRAWLED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Separator used when facilities are flattened into one column
const FACILITY_SEPARATOR: &str = "、";

/// Whole-unit or shared-room rental
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RentalMode {
    Whole,
    Shared,
}

impl RentalMode {
    /// Label used on the site and in output files
    pub fn label(&self) -> &'static str {
        match self {
            RentalMode::Whole => "整租",
            RentalMode::Shared => "合租",
        }
    }
}

impl fmt::Display for RentalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fields extracted from one detail page, before range checks
///
/// `title`, `price`, `area` and `layout` are always present; every other
/// field is empty when the page does not show it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Site-assigned listing code (房屋编码)
    pub house_id: Option<String>,
    pub title: String,
    pub rental_mode: RentalMode,

    /// The page shows an official verification code (核验码)
    pub officially_verified: bool,

    /// The listing carries the 安选 badge
    pub anxuan_selected: bool,

    /// Monthly rent in yuan
    pub price: u32,

    /// Payment terms such as 付1押1, or 面议
    pub deposit: Option<String>,

    /// Floor area in square metres
    pub area: f64,
    pub layout: String,
    pub community: Option<String>,
    pub detail_url: String,
    pub floor: Option<String>,
    pub orientation: Option<String>,
    pub decoration: Option<String>,
    pub phone: Option<String>,
    pub contact_name: Option<String>,
    pub company: Option<String>,
    pub agent_info: Option<String>,
    pub overview: Option<String>,

    /// Amenities the listing marks as present, for whole units and shared
    /// rooms alike
    pub facilities: BTreeSet<String>,

    /// Last update date as printed on the page (e.g. 2024年1月15日)
    pub updated_at: Option<String>,
    pub crawled_at: NaiveDateTime,
}

/// Column identifiers of a flattened [`RawRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    HouseId,
    Title,
    RentalMode,
    OfficiallyVerified,
    AnxuanSelected,
    Price,
    Deposit,
    Area,
    Layout,
    Community,
    DetailUrl,
    Floor,
    Orientation,
    Decoration,
    Phone,
    ContactName,
    Company,
    AgentInfo,
    Overview,
    Facilities,
    UpdatedAt,
    CrawledAt,
}

impl RecordField {
    /// All fields in output column order
    pub const ALL: [RecordField; 22] = [
        RecordField::HouseId,
        RecordField::Title,
        RecordField::RentalMode,
        RecordField::OfficiallyVerified,
        RecordField::AnxuanSelected,
        RecordField::Price,
        RecordField::Deposit,
        RecordField::Area,
        RecordField::Layout,
        RecordField::Community,
        RecordField::DetailUrl,
        RecordField::Floor,
        RecordField::Orientation,
        RecordField::Decoration,
        RecordField::Phone,
        RecordField::ContactName,
        RecordField::Company,
        RecordField::AgentInfo,
        RecordField::Overview,
        RecordField::Facilities,
        RecordField::UpdatedAt,
        RecordField::CrawledAt,
    ];

    /// Column name used by the CSV header and the SQLite schema
    pub fn column(&self) -> &'static str {
        match self {
            RecordField::HouseId => "house_id",
            RecordField::Title => "title",
            RecordField::RentalMode => "rental_mode",
            RecordField::OfficiallyVerified => "officially_verified",
            RecordField::AnxuanSelected => "anxuan_selected",
            RecordField::Price => "price",
            RecordField::Deposit => "deposit",
            RecordField::Area => "area",
            RecordField::Layout => "layout",
            RecordField::Community => "community",
            RecordField::DetailUrl => "detail_url",
            RecordField::Floor => "floor",
            RecordField::Orientation => "orientation",
            RecordField::Decoration => "decoration",
            RecordField::Phone => "phone",
            RecordField::ContactName => "contact_name",
            RecordField::Company => "company",
            RecordField::AgentInfo => "agent_info",
            RecordField::Overview => "overview",
            RecordField::Facilities => "facilities",
            RecordField::UpdatedAt => "updated_at",
            RecordField::CrawledAt => "crawled_at",
        }
    }

    pub fn columns() -> Vec<&'static str> {
        Self::ALL.iter().map(|f| f.column()).collect()
    }
}

impl RawRecord {
    /// Renders one field as text
    pub fn value(&self, field: RecordField) -> String {
        fn opt(value: &Option<String>) -> String {
            value.clone().unwrap_or_default()
        }

        match field {
            RecordField::HouseId => opt(&self.house_id),
            RecordField::Title => self.title.clone(),
            RecordField::RentalMode => self.rental_mode.label().to_string(),
            RecordField::OfficiallyVerified => self.officially_verified.to_string(),
            RecordField::AnxuanSelected => self.anxuan_selected.to_string(),
            RecordField::Price => self.price.to_string(),
            RecordField::Deposit => opt(&self.deposit),
            RecordField::Area => self.area.to_string(),
            RecordField::Layout => self.layout.clone(),
            RecordField::Community => opt(&self.community),
            RecordField::DetailUrl => self.detail_url.clone(),
            RecordField::Floor => opt(&self.floor),
            RecordField::Orientation => opt(&self.orientation),
            RecordField::Decoration => opt(&self.decoration),
            RecordField::Phone => opt(&self.phone),
            RecordField::ContactName => opt(&self.contact_name),
            RecordField::Company => opt(&self.company),
            RecordField::AgentInfo => opt(&self.agent_info),
            RecordField::Overview => opt(&self.overview),
            RecordField::Facilities => self
                .facilities
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(FACILITY_SEPARATOR),
            RecordField::UpdatedAt => opt(&self.updated_at),
            RecordField::CrawledAt => self.crawled_at.format(CRAWLED_AT_FORMAT).to_string(),
        }
    }

    /// All fields in column order
    pub fn to_row(&self) -> Vec<String> {
        RecordField::ALL.iter().map(|f| self.value(*f)).collect()
    }

    /// Identity used for deduplication: the house id, or the detail URL
    /// when the page shows none
    pub fn dedup_key(&self) -> &str {
        self.house_id.as_deref().unwrap_or(&self.detail_url)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::NaiveDate;

    /// A complete record for tests
    pub fn record(id: &str, price: u32, area: f64) -> RawRecord {
        RawRecord {
            house_id: Some(id.to_string()),
            title: format!("整租 · 银湖新村 {}", id),
            rental_mode: RentalMode::Whole,
            officially_verified: true,
            anxuan_selected: false,
            price,
            deposit: Some("付1押1".to_string()),
            area,
            layout: "2室1厅1卫".to_string(),
            community: Some("银湖新村".to_string()),
            detail_url: format!("https://hf.zu.anjuke.com/fangyuan/{}", id),
            floor: Some("中层(共6层)".to_string()),
            orientation: Some("南北".to_string()),
            decoration: Some("精装修".to_string()),
            phone: None,
            contact_name: Some("王丽".to_string()),
            company: None,
            agent_info: Some("王丽 - 房产经纪人".to_string()),
            overview: None,
            facilities: ["冰箱", "空调"].iter().map(|s| s.to_string()).collect(),
            updated_at: Some("2024年1月15日".to_string()),
            crawled_at: NaiveDate::from_ymd_opt(2024, 1, 16)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
        }
    }
}
