//! Issue hotspots grouped by area

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Issue, IssueCategory, Period};

/// Columns a heatmap read needs from `issues`
pub const POINT_COLUMNS: &str = "id,category,area,location_name,latitude,longitude,created_at";

const HIGH_THRESHOLD: usize = 20;
const MEDIUM_THRESHOLD: usize = 15;

/// Parameters for a heatmap read
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeatmapQuery {
    pub period: Period,
    /// Restrict to one category; `None` covers all of them
    pub category: Option<IssueCategory>,
}

impl HeatmapQuery {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            category: None,
        }
    }

    pub fn category(mut self, category: IssueCategory) -> Self {
        self.category = Some(category);
        self
    }
}

/// How hot a hotspot renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    pub fn for_count(count: usize) -> Self {
        if count >= HIGH_THRESHOLD {
            Intensity::High
        } else if count >= MEDIUM_THRESHOLD {
            Intensity::Medium
        } else {
            Intensity::Low
        }
    }
}

/// Issues sharing one area
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hotspot {
    pub area: String,
    pub issue_count: usize,
    pub dominant_category: IssueCategory,
    pub intensity: Intensity,
    /// Mean position of the issues that carry coordinates
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HeatmapSummary {
    pub hotspot_count: usize,
    pub average_per_hotspot: f64,
    pub top_category: Option<IssueCategory>,
    /// Share of all issues in the top category, 0 to 100
    pub top_category_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapView {
    pub period: Period,
    pub category: Option<IssueCategory>,
    /// Busiest first
    pub hotspots: Vec<Hotspot>,
    pub summary: HeatmapSummary,
}

/// The part of an issue the grouping looks at
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IssuePoint {
    pub category: IssueCategory,
    pub area: Option<String>,
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<&Issue> for IssuePoint {
    fn from(issue: &Issue) -> Self {
        Self {
            category: issue.category,
            area: issue.area.clone(),
            location_name: issue.location_name.clone(),
            latitude: issue.latitude,
            longitude: issue.longitude,
        }
    }
}

/// Grouping key: area, else location name, else "Unknown"
fn area_of(issue: &IssuePoint) -> String {
    [&issue.area, &issue.location_name]
        .into_iter()
        .filter_map(|v| v.as_deref())
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

/// Most frequent category; ties go to the earlier category in `IssueCategory::ALL`
fn dominant(counts: &BTreeMap<IssueCategory, usize>) -> Option<IssueCategory> {
    let mut best: Option<(IssueCategory, usize)> = None;
    for (category, count) in counts {
        if best.map_or(true, |(_, n)| *count > n) {
            best = Some((*category, *count));
        }
    }
    best.map(|(category, _)| category)
}

#[derive(Default)]
struct Bucket {
    count: usize,
    categories: BTreeMap<IssueCategory, usize>,
    lat_sum: f64,
    lng_sum: f64,
    located: usize,
}

/// Group already-filtered issues into hotspots
pub fn aggregate(issues: &[IssuePoint], query: HeatmapQuery) -> HeatmapView {
    let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();
    let mut overall: BTreeMap<IssueCategory, usize> = BTreeMap::new();

    for issue in issues {
        let bucket = buckets.entry(area_of(issue)).or_default();
        bucket.count += 1;
        *bucket.categories.entry(issue.category).or_default() += 1;
        if let (Some(lat), Some(lng)) = (issue.latitude, issue.longitude) {
            bucket.lat_sum += lat;
            bucket.lng_sum += lng;
            bucket.located += 1;
        }
        *overall.entry(issue.category).or_default() += 1;
    }

    let mut hotspots: Vec<Hotspot> = buckets
        .into_iter()
        .filter_map(|(area, bucket)| {
            let dominant_category = dominant(&bucket.categories)?;
            let (latitude, longitude) = if bucket.located > 0 {
                (
                    Some(bucket.lat_sum / bucket.located as f64),
                    Some(bucket.lng_sum / bucket.located as f64),
                )
            } else {
                (None, None)
            };
            Some(Hotspot {
                area,
                issue_count: bucket.count,
                dominant_category,
                intensity: Intensity::for_count(bucket.count),
                latitude,
                longitude,
            })
        })
        .collect();
    // BTreeMap iteration already ordered areas, so the stable sort keeps ties alphabetical
    hotspots.sort_by(|a, b| b.issue_count.cmp(&a.issue_count));

    let top_category = dominant(&overall);
    let summary = HeatmapSummary {
        hotspot_count: hotspots.len(),
        average_per_hotspot: if hotspots.is_empty() {
            0.0
        } else {
            issues.len() as f64 / hotspots.len() as f64
        },
        top_category,
        top_category_share: match top_category {
            Some(category) if !issues.is_empty() => {
                overall.get(&category).copied().unwrap_or(0) as f64 * 100.0 / issues.len() as f64
            }
            _ => 0.0,
        },
    };

    HeatmapView {
        period: query.period,
        category: query.category,
        hotspots,
        summary,
    }
}
