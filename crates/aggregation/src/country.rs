//! Country reference data: ISO code resolution and region membership.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, error, info};

use crate::error::{PipelineError, Result};

/// One country of the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CountryRecord {
    pub iso3: String,
    #[serde(default)]
    pub iso2: Option<String>,
    pub name: String,
    /// Main geographic region, if the country has one
    #[serde(default)]
    pub region: Option<String>,
}

/// Maps ISO codes to each other and to names and regions.
pub trait CountryReference: Send + Sync {
    fn iso3_from_iso2(&self, iso2: &str) -> Option<String>;
    fn name_from_iso3(&self, iso3: &str) -> Option<String>;
    fn countries(&self) -> Vec<CountryRecord>;
}

/// In-memory country table.
#[derive(Debug, Clone, Default)]
pub struct CountryTable {
    records: Vec<CountryRecord>,
    by_iso3: HashMap<String, usize>,
    iso2_to_iso3: HashMap<String, String>,
}

impl CountryTable {
    pub fn new(records: Vec<CountryRecord>) -> Self {
        let mut by_iso3 = HashMap::new();
        let mut iso2_to_iso3 = HashMap::new();
        for (index, record) in records.iter().enumerate() {
            by_iso3
                .entry(record.iso3.to_uppercase())
                .or_insert(index);
            if let Some(iso2) = &record.iso2 {
                iso2_to_iso3
                    .entry(iso2.to_uppercase())
                    .or_insert_with(|| record.iso3.to_uppercase());
            }
        }
        Self {
            records,
            by_iso3,
            iso2_to_iso3,
        }
    }

    /// Load from CSV with the header `iso3,iso2,name,region`.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let records = reader
            .deserialize::<CountryRecord>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PipelineError::CountryReference(e.to_string()))?;
        info!(countries = records.len(), "Loaded country reference table");
        Ok(Self::new(records))
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            PipelineError::CountryReference(format!("{}: {}", path.display(), e))
        })?;
        Self::from_csv_reader(file)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CountryReference for CountryTable {
    fn iso3_from_iso2(&self, iso2: &str) -> Option<String> {
        self.iso2_to_iso3.get(&iso2.to_uppercase()).cloned()
    }

    fn name_from_iso3(&self, iso3: &str) -> Option<String> {
        self.by_iso3
            .get(&iso3.to_uppercase())
            .map(|index| self.records[*index].name.clone())
    }

    fn countries(&self) -> Vec<CountryRecord> {
        self.records.clone()
    }
}

/// How a level-0 boundary code is turned into an ISO3 code.
///
/// | code length (after truncation) | strategy |
/// |---|---|
/// | more than 3 | truncate to the first 2 characters, then re-classify |
/// | 3 | already ISO3 |
/// | 2 | ISO2, look up ISO3 |
/// | other | unresolvable |
///
/// Boundary codes sometimes carry a trailing qualifier after the ISO2 code,
/// which is why long codes are cut to two characters rather than three.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeResolution {
    Iso3(String),
    Iso2(String),
    Unresolvable(String),
}

pub fn classify_code(code: &str) -> CodeResolution {
    let code: String = if code.chars().count() > 3 {
        code.chars().take(2).collect()
    } else {
        code.to_string()
    };
    match code.chars().count() {
        3 => CodeResolution::Iso3(code),
        2 => CodeResolution::Iso2(code),
        _ => CodeResolution::Unresolvable(code),
    }
}

/// Country fields attached to a row; both absent when the code is unresolvable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryIdentity {
    pub iso_code: Option<String>,
    pub name: Option<String>,
}

/// Resolves level-0 codes, once per distinct code for the whole run.
pub struct CountryResolver<'a> {
    reference: &'a dyn CountryReference,
    memo: HashMap<String, CountryIdentity>,
}

impl<'a> CountryResolver<'a> {
    pub fn new(reference: &'a dyn CountryReference) -> Self {
        Self {
            reference,
            memo: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, code: &str) -> CountryIdentity {
        if let Some(identity) = self.memo.get(code) {
            return identity.clone();
        }
        let identity = self.lookup(code);
        self.memo.insert(code.to_string(), identity.clone());
        identity
    }

    fn lookup(&self, code: &str) -> CountryIdentity {
        let iso_code = match classify_code(code) {
            CodeResolution::Iso3(iso3) => Some(iso3),
            CodeResolution::Iso2(iso2) => self.reference.iso3_from_iso2(&iso2),
            CodeResolution::Unresolvable(_) => None,
        };

        match iso_code {
            Some(iso3) => {
                let name = self.reference.name_from_iso3(&iso3);
                debug!(code = code, iso3 = %iso3, name = ?name, "Resolved country code");
                CountryIdentity {
                    iso_code: Some(iso3),
                    name,
                }
            }
            None => {
                error!(code = code, "Unknown country code");
                CountryIdentity::default()
            }
        }
    }

    /// Number of distinct codes resolved so far.
    pub fn resolved(&self) -> usize {
        self.memo.len()
    }
}

/// Partition key for a region name: lower-cased, whitespace as underscores.
pub fn region_key(name: &str) -> String {
    name.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// ISO3 membership of each region, derived once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionIndex {
    members: BTreeMap<String, BTreeSet<String>>,
    by_iso3: HashMap<String, String>,
}

impl RegionIndex {
    /// Countries without a region are left out. A country listed under
    /// several regions belongs to the first one only.
    pub fn from_reference(reference: &dyn CountryReference) -> Self {
        let mut index = RegionIndex::default();
        for country in reference.countries() {
            let Some(region) = country.region.as_deref().filter(|r| !r.trim().is_empty()) else {
                continue;
            };
            let iso3 = country.iso3.to_uppercase();
            if index.by_iso3.contains_key(&iso3) {
                continue;
            }
            let key = region_key(region);
            index
                .members
                .entry(key.clone())
                .or_default()
                .insert(iso3.clone());
            index.by_iso3.insert(iso3, key);
        }
        debug!(regions = index.members.len(), "Built region index");
        index
    }

    pub fn region_of(&self, iso3: &str) -> Option<&str> {
        self.by_iso3.get(&iso3.to_uppercase()).map(|s| s.as_str())
    }

    pub fn members(&self, region: &str) -> Option<&BTreeSet<String>> {
        self.members.get(region)
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(|k| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::COUNTRY_TABLE_CSV;

    fn table() -> CountryTable {
        CountryTable::from_csv_reader(COUNTRY_TABLE_CSV.as_bytes()).unwrap()
    }

    #[test]
    fn test_classify_code_decision_table() {
        assert_eq!(classify_code("AFG"), CodeResolution::Iso3("AFG".into()));
        assert_eq!(classify_code("AF"), CodeResolution::Iso2("AF".into()));
        assert_eq!(classify_code("AF01"), CodeResolution::Iso2("AF".into()));
        assert_eq!(classify_code("KEN-X"), CodeResolution::Iso2("KE".into()));
        assert_eq!(classify_code("A"), CodeResolution::Unresolvable("A".into()));
        assert_eq!(classify_code(""), CodeResolution::Unresolvable("".into()));
    }

    #[test]
    fn test_table_lookups() {
        let table = table();
        assert_eq!(table.len(), 6);
        assert_eq!(table.iso3_from_iso2("ke").as_deref(), Some("KEN"));
        assert_eq!(table.name_from_iso3("AFG").as_deref(), Some("Afghanistan"));
        assert_eq!(table.name_from_iso3("XXX"), None);
    }

    #[test]
    fn test_resolver_memoizes_and_tolerates_unknown_codes() {
        let table = table();
        let mut resolver = CountryResolver::new(&table);

        let kenya = resolver.resolve("KE");
        assert_eq!(kenya.iso_code.as_deref(), Some("KEN"));
        assert_eq!(kenya.name.as_deref(), Some("Kenya"));
        assert_eq!(resolver.resolve("KE"), kenya);

        assert_eq!(resolver.resolve("ZZ"), CountryIdentity::default());
        assert_eq!(resolver.resolve("Q"), CountryIdentity::default());

        // ISO3 codes keep their code even without a name
        let unknown = resolver.resolve("XYZ");
        assert_eq!(unknown.iso_code.as_deref(), Some("XYZ"));
        assert_eq!(unknown.name, None);

        assert_eq!(resolver.resolved(), 4);
    }

    #[test]
    fn test_region_index() {
        let index = RegionIndex::from_reference(&table());
        assert_eq!(
            index.regions().collect::<Vec<_>>(),
            vec!["africa", "asia", "latin_america_and_the_caribbean", "middle_east"]
        );
        assert_eq!(index.region_of("ken"), Some("africa"));
        assert_eq!(index.members("asia").unwrap().len(), 2);
    }

    #[test]
    fn test_region_index_assigns_one_region_per_country() {
        let table = CountryTable::new(vec![
            CountryRecord {
                iso3: "AAA".into(),
                iso2: None,
                name: "A".into(),
                region: Some("North".into()),
            },
            CountryRecord {
                iso3: "AAA".into(),
                iso2: None,
                name: "A".into(),
                region: Some("South".into()),
            },
            CountryRecord {
                iso3: "BBB".into(),
                iso2: None,
                name: "B".into(),
                region: None,
            },
        ]);
        let index = RegionIndex::from_reference(&table);
        assert_eq!(index.regions().collect::<Vec<_>>(), vec!["north"]);
        assert_eq!(index.region_of("BBB"), None);
    }
}
