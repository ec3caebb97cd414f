use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::geo::{self, Coordinate, GeoError};

/// Which statistic a marker or panel row encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Confirmed,
    Active,
    Recovered,
    Deaths,
}

impl StatKind {
    pub const ALL: [StatKind; 4] = [
        StatKind::Confirmed,
        StatKind::Active,
        StatKind::Recovered,
        StatKind::Deaths,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            StatKind::Confirmed => "Confirmed",
            StatKind::Active => "Active",
            StatKind::Recovered => "Recovered",
            StatKind::Deaths => "Deaths",
        }
    }

    /// Next kind in display order, wrapping; drives the UI cycle key.
    pub fn next(&self) -> StatKind {
        match self {
            StatKind::Confirmed => StatKind::Active,
            StatKind::Active => StatKind::Recovered,
            StatKind::Recovered => StatKind::Deaths,
            StatKind::Deaths => StatKind::Confirmed,
        }
    }
}

/// Case counts for one region at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistic {
    pub confirmed: u64,
    pub recovered: u64,
    pub deaths: u64,
}

impl Statistic {
    pub fn new(confirmed: u64, recovered: u64, deaths: u64) -> Self {
        Self {
            confirmed,
            recovered,
            deaths,
        }
    }

    /// Cases neither recovered nor dead. Clamped so an inconsistent feed
    /// (recovered + deaths > confirmed) cannot underflow.
    pub fn active(&self) -> u64 {
        self.confirmed
            .saturating_sub(self.recovered.saturating_add(self.deaths))
    }

    pub fn number(&self, kind: StatKind) -> u64 {
        match kind {
            StatKind::Confirmed => self.confirmed,
            StatKind::Active => self.active(),
            StatKind::Recovered => self.recovered,
            StatKind::Deaths => self.deaths,
        }
    }

    /// Fraction of confirmed cases that recovered, in [0, 1]. Zero when
    /// nothing is confirmed.
    pub fn recovered_fraction(&self) -> f64 {
        if self.confirmed == 0 {
            0.0
        } else {
            self.recovered as f64 / self.confirmed as f64
        }
    }

    /// Fraction of confirmed cases that died, in [0, 1]. Zero when nothing
    /// is confirmed.
    pub fn deaths_fraction(&self) -> f64 {
        if self.confirmed == 0 {
            0.0
        } else {
            self.deaths as f64 / self.confirmed as f64
        }
    }

    pub fn merged(&self, other: &Statistic) -> Statistic {
        Statistic {
            confirmed: self.confirmed + other.confirmed,
            recovered: self.recovered + other.recovered,
            deaths: self.deaths + other.deaths,
        }
    }
}

/// Latest statistics for a region. Immutable; a refresh replaces the whole
/// report rather than mutating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub updated: DateTime<Utc>,
    pub stat: Statistic,
}

impl Report {
    pub fn new(updated: DateTime<Utc>, stat: Statistic) -> Self {
        Self { updated, stat }
    }

    /// Whole hours since the report was published.
    pub fn hours_old(&self) -> i64 {
        (Utc::now() - self.updated).num_hours().max(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Country,
    Province,
}

/// An immutable geographic entity. Provinces link to their country by name,
/// not by an ownership pointer; countries aggregate their provinces at
/// snapshot-build time.
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub kind: RegionKind,
    /// Country name for provinces; None for countries and aggregates.
    pub country: Option<String>,
    pub location: Coordinate,
    pub report: Option<Report>,
}

impl Region {
    /// Count for the given kind; a region with no report yet counts as zero,
    /// never as an error.
    pub fn number(&self, kind: StatKind) -> u64 {
        self.report.as_ref().map_or(0, |r| r.stat.number(kind))
    }

    /// Identity key. Province names are only unique within their country.
    pub fn key(&self) -> String {
        match &self.country {
            Some(country) => format!("{}/{}", country, self.name),
            None => self.name.clone(),
        }
    }
}

/// The engine's working set of regions, replaced wholesale on every data
/// refresh. Holds province regions as supplied plus country regions
/// aggregated from them, and a worldwide total for the detail panel
/// fallback.
#[derive(Debug, Clone)]
pub struct RegionSnapshot {
    regions: Vec<Arc<Region>>,
    worldwide: Arc<Region>,
}

impl RegionSnapshot {
    pub fn empty() -> Self {
        Self {
            regions: Vec::new(),
            worldwide: Arc::new(Region {
                name: "Worldwide".to_string(),
                kind: RegionKind::Country,
                country: None,
                location: Coordinate::ZERO,
                report: None,
            }),
        }
    }

    /// Build the working set from province-level regions. Countries are
    /// derived per shared country name: counts are summed over provinces
    /// that have reports, the update time is the newest of them, and the
    /// location is the medoid of the deduplicated province locations so the
    /// country marker always sits on a real sample point.
    pub fn from_provinces(provinces: Vec<Region>) -> Result<Self, GeoError> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, p) in provinces.iter().enumerate() {
            let country = p.country.as_deref().unwrap_or(&p.name).to_string();
            match groups.entry(country) {
                Entry::Vacant(v) => {
                    order.push(v.key().clone());
                    v.insert(vec![i]);
                }
                Entry::Occupied(mut o) => o.get_mut().push(i),
            }
        }

        let mut regions: Vec<Arc<Region>> = Vec::with_capacity(order.len() + provinces.len());
        let mut world_stat = Statistic::default();
        let mut world_updated: Option<DateTime<Utc>> = None;

        for name in &order {
            let members = &groups[name];

            let points: Vec<Coordinate> =
                members.iter().map(|&i| provinces[i].location).collect();
            let location = geo::medoid(&geo::dedup(&points))?;

            let mut stat: Option<Statistic> = None;
            let mut updated: Option<DateTime<Utc>> = None;
            for &i in members {
                if let Some(report) = &provinces[i].report {
                    stat = Some(stat.unwrap_or_default().merged(&report.stat));
                    updated = Some(match updated {
                        Some(u) => u.max(report.updated),
                        None => report.updated,
                    });
                }
            }

            let report = match (stat, updated) {
                (Some(stat), Some(updated)) => Some(Report::new(updated, stat)),
                _ => None,
            };

            if let Some(report) = &report {
                world_stat = world_stat.merged(&report.stat);
                world_updated = Some(match world_updated {
                    Some(u) => u.max(report.updated),
                    None => report.updated,
                });
            }

            regions.push(Arc::new(Region {
                name: name.clone(),
                kind: RegionKind::Country,
                country: None,
                location,
                report,
            }));
        }

        regions.extend(provinces.into_iter().map(Arc::new));

        let worldwide = Arc::new(Region {
            name: "Worldwide".to_string(),
            kind: RegionKind::Country,
            country: None,
            location: Coordinate::ZERO,
            report: world_updated.map(|updated| Report::new(updated, world_stat)),
        });

        Ok(Self { regions, worldwide })
    }

    pub fn regions(&self) -> &[Arc<Region>] {
        &self.regions
    }

    pub fn of_kind(&self, kind: RegionKind) -> impl Iterator<Item = &Arc<Region>> {
        self.regions.iter().filter(move |r| r.kind == kind)
    }

    pub fn worldwide(&self) -> &Arc<Region> {
        &self.worldwide
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Country with the highest count for the given kind.
    pub fn hottest(&self, kind: StatKind) -> Option<&Arc<Region>> {
        self.of_kind(RegionKind::Country)
            .max_by_key(|r| r.number(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn province(name: &str, country: &str, lat: f64, lon: f64, stat: Option<Statistic>) -> Region {
        Region {
            name: name.to_string(),
            kind: RegionKind::Province,
            country: Some(country.to_string()),
            location: Coordinate::new(lat, lon),
            report: stat.map(|s| Report::new(Utc.with_ymd_and_hms(2020, 3, 22, 10, 0, 0).unwrap(), s)),
        }
    }

    #[test]
    fn test_active_is_clamped_at_zero() {
        let stat = Statistic::new(100, 80, 30);
        assert_eq!(stat.active(), 0);
        assert_eq!(Statistic::new(100, 60, 10).active(), 30);
    }

    #[test]
    fn test_fractions_are_zero_without_confirmed() {
        let stat = Statistic::new(0, 0, 0);
        assert_relative_eq!(stat.recovered_fraction(), 0.0);
        assert_relative_eq!(stat.deaths_fraction(), 0.0);

        let stat = Statistic::new(200, 50, 10);
        assert_relative_eq!(stat.recovered_fraction(), 0.25);
        assert_relative_eq!(stat.deaths_fraction(), 0.05);
    }

    #[test]
    fn test_number_without_report_is_zero() {
        let region = province("Nowhere", "Atlantis", 0.0, 0.0, None);
        for kind in StatKind::ALL {
            assert_eq!(region.number(kind), 0);
        }
    }

    #[test]
    fn test_snapshot_aggregates_countries() {
        let snapshot = RegionSnapshot::from_provinces(vec![
            province("Hubei", "China", 30.97, 112.27, Some(Statistic::new(67800, 58000, 3100))),
            province("Guangdong", "China", 23.34, 113.42, Some(Statistic::new(1400, 1300, 8))),
            province("France", "France", 46.22, 2.21, Some(Statistic::new(16018, 2200, 674))),
        ])
        .unwrap();

        let china = snapshot
            .of_kind(RegionKind::Country)
            .find(|r| r.name == "China")
            .unwrap();
        assert_eq!(china.number(StatKind::Confirmed), 69200);
        assert_eq!(china.number(StatKind::Deaths), 3108);

        // Country marker must sit on one of its provinces.
        let provinces: Vec<Coordinate> = snapshot
            .of_kind(RegionKind::Province)
            .filter(|r| r.country.as_deref() == Some("China"))
            .map(|r| r.location)
            .collect();
        assert!(provinces.contains(&china.location));

        assert_eq!(snapshot.worldwide().number(StatKind::Confirmed), 85218);
    }

    #[test]
    fn test_country_without_reports_has_none() {
        let snapshot = RegionSnapshot::from_provinces(vec![
            province("Alpha", "Nowhereland", 10.0, 10.0, None),
            province("Beta", "Nowhereland", 11.0, 11.0, None),
        ])
        .unwrap();

        let country = snapshot
            .of_kind(RegionKind::Country)
            .find(|r| r.name == "Nowhereland")
            .unwrap();
        assert!(country.report.is_none());
        assert_eq!(country.number(StatKind::Confirmed), 0);
    }

    #[test]
    fn test_hottest_picks_top_country() {
        let snapshot = RegionSnapshot::from_provinces(vec![
            province("A", "Small", 1.0, 1.0, Some(Statistic::new(10, 0, 0))),
            province("B", "Big", 2.0, 2.0, Some(Statistic::new(9000, 0, 0))),
        ])
        .unwrap();
        assert_eq!(snapshot.hottest(StatKind::Confirmed).unwrap().name, "Big");
    }

    #[test]
    fn test_province_key_is_scoped_by_country() {
        let a = province("Georgia", "US", 33.0, -83.0, None);
        let b = Region {
            name: "Georgia".to_string(),
            kind: RegionKind::Country,
            country: None,
            location: Coordinate::new(42.3, 43.4),
            report: None,
        };
        assert_ne!(a.key(), b.key());
    }
}
