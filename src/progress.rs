use crate::models::{City, SearchTarget, Signature, StoredRow};
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

/// Where the previous run stopped: the (category, city, state) of the last row written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    pub category: String,
    pub city: String,
    /// Empty when the last row predates the State column.
    pub state: String,
}

impl ResumePoint {
    /// The selected categories still to visit.
    ///
    /// Everything before the last recorded category is dropped. If that
    /// category is not part of this selection the resume point does not
    /// apply and nothing is dropped.
    pub fn remaining_categories<'a>(&self, selected: &'a [String]) -> &'a [String] {
        match selected.iter().position(|c| *c == self.category) {
            Some(index) => &selected[index..],
            None => {
                log::warn!(
                    "Last recorded category '{}' is not selected; starting from the first category",
                    self.category
                );
                selected
            }
        }
    }

    /// The cities still to visit for `category`.
    ///
    /// Only the last recorded category is trimmed, and it restarts at the
    /// last recorded city itself, not after it. Cities are matched by name
    /// and state; a point without a state matches the first city of that name.
    pub fn remaining_cities<'a>(&self, category: &str, cities: &'a [City]) -> &'a [City] {
        if category != self.category {
            return cities;
        }
        let matches = |c: &City| c.name == self.city && (self.state.is_empty() || c.state == self.state);
        match cities.iter().position(matches) {
            Some(index) => &cities[index..],
            None => cities,
        }
    }
}

/// What the durable file says has already been captured.
#[derive(Debug, Default)]
pub struct ProgressCheckpoint {
    counts: HashMap<SearchTarget, usize>,
    category_totals: HashMap<String, usize>,
    signatures: HashSet<Signature>,
    last: Option<ResumePoint>,
    total: usize,
}

impl ProgressCheckpoint {
    /// Scan the result file once. A missing file is an empty checkpoint.
    pub fn load(path: &Path) -> Result<Self> {
        let mut checkpoint = Self::default();

        if !path.exists() {
            log::info!("No results file at {}, starting fresh", path.display());
            return Ok(checkpoint);
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open results file: {}", path.display()))?;
        let mut reader = csv::Reader::from_reader(file);

        for (line, row) in reader.deserialize::<StoredRow>().enumerate() {
            match row {
                Ok(row) => checkpoint.record(row.target, row.signature),
                Err(e) => log::warn!("Skipping unreadable row {} in {}: {}", line + 2, path.display(), e),
            }
        }

        log::info!(
            "Loaded {} existing listings across {} (category, city) pairs",
            checkpoint.total,
            checkpoint.counts.len()
        );
        Ok(checkpoint)
    }

    /// Account for one durably written row.
    pub fn record(&mut self, target: SearchTarget, signature: Signature) {
        *self.category_totals.entry(target.category.clone()).or_insert(0) += 1;
        self.signatures.insert(signature);
        self.last = Some(ResumePoint {
            category: target.category.clone(),
            city: target.city.clone(),
            state: target.state.clone(),
        });
        *self.counts.entry(target).or_insert(0) += 1;
        self.total += 1;
    }

    /// Rows written for `target`. Rows without a state (older files) count
    /// towards every city of that name.
    pub fn captured(&self, target: &SearchTarget) -> usize {
        let exact = self.counts.get(target).copied().unwrap_or(0);
        if target.state.is_empty() {
            return exact;
        }
        let stateless = SearchTarget {
            state: String::new(),
            ..target.clone()
        };
        exact + self.counts.get(&stateless).copied().unwrap_or(0)
    }

    pub fn captured_in_category(&self, category: &str) -> usize {
        self.category_totals.get(category).copied().unwrap_or(0)
    }

    pub fn signatures(&self) -> &HashSet<Signature> {
        &self.signatures
    }

    pub fn resume_point(&self) -> Option<&ResumePoint> {
        self.last.as_ref()
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn signature(name: &str) -> Signature {
        Signature {
            name: name.to_string(),
            address: "No Address".to_string(),
            phone: "No Phone".to_string(),
        }
    }

    fn target(category: &str, city: &str, state: &str) -> SearchTarget {
        SearchTarget::new(category, &City::new(city, state))
    }

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn missing_file_is_empty_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = ProgressCheckpoint::load(&dir.path().join("nothing.csv")).unwrap();
        assert_eq!(checkpoint.total(), 0);
        assert!(checkpoint.resume_point().is_none());
    }

    #[test]
    fn counts_pairs_and_finds_last_row() {
        let file = write_csv(
            "Business Type,City,State,Business Name,Address,Phone Number,Number of Reviews,Review Average,Website URL,Latitude,Longitude\n\
             Gyms,Austin,TX,A,1 Main,111,3,4.0,No Website,,\n\
             Gyms,Austin,TX,B,2 Main,222,0,0.0,No Website,,\n\
             Gyms,Boise,ID,C,3 Main,333,0,0.0,No Website,,\n\
             Painting,Austin,TX,D,4 Main,444,0,0.0,No Website,,\n",
        );

        let checkpoint = ProgressCheckpoint::load(file.path()).unwrap();

        assert_eq!(checkpoint.total(), 4);
        assert_eq!(checkpoint.captured(&target("Gyms", "Austin", "TX")), 2);
        assert_eq!(checkpoint.captured(&target("Gyms", "Boise", "ID")), 1);
        assert_eq!(checkpoint.captured(&target("Gyms", "Chicago", "IL")), 0);
        assert_eq!(checkpoint.captured_in_category("Gyms"), 3);
        assert_eq!(
            checkpoint.resume_point(),
            Some(&ResumePoint {
                category: "Painting".to_string(),
                city: "Austin".to_string(),
                state: "TX".to_string(),
            })
        );
        assert!(checkpoint.signatures().contains(&Signature {
            name: "B".to_string(),
            address: "2 Main".to_string(),
            phone: "222".to_string(),
        }));
    }

    #[test]
    fn same_city_name_in_two_states_counts_separately() {
        let file = write_csv(
            "Business Type,City,State,Business Name,Address,Phone Number,Number of Reviews,Review Average,Website URL,Latitude,Longitude\n\
             Gyms,Springfield,IL,A,1 Main,111,0,0.0,No Website,,\n\
             Gyms,Springfield,IL,B,2 Main,222,0,0.0,No Website,,\n\
             Gyms,Springfield,MO,C,3 Main,333,0,0.0,No Website,,\n",
        );

        let checkpoint = ProgressCheckpoint::load(file.path()).unwrap();

        assert_eq!(checkpoint.captured(&target("Gyms", "Springfield", "IL")), 2);
        assert_eq!(checkpoint.captured(&target("Gyms", "Springfield", "MO")), 1);
        assert_eq!(checkpoint.captured(&target("Gyms", "Springfield", "OR")), 0);
    }

    #[test]
    fn reads_six_column_layout() {
        let file = write_csv(
            "Business Type,City,Business Name,Phone Number,Number of Reviews,Website URL\n\
             Gyms,Austin,A,111,3,No Website\n",
        );

        let checkpoint = ProgressCheckpoint::load(file.path()).unwrap();

        assert_eq!(checkpoint.captured(&target("Gyms", "Austin", "")), 1);
        assert_eq!(checkpoint.captured(&target("Gyms", "Austin", "TX")), 1);
        assert!(checkpoint.signatures().contains(&Signature {
            name: "A".to_string(),
            address: "No Address".to_string(),
            phone: "111".to_string(),
        }));
        assert_eq!(checkpoint.resume_point().unwrap().state, "");
    }

    #[test]
    fn resume_skips_earlier_categories_and_cities() {
        let mut checkpoint = ProgressCheckpoint::default();
        checkpoint.record(target("Gyms", "Boise", "ID"), signature("A"));
        let resume = checkpoint.resume_point().unwrap();

        let categories = vec!["Car Wash".to_string(), "Gyms".to_string(), "Painting".to_string()];
        assert_eq!(resume.remaining_categories(&categories), &categories[1..]);

        let cities = vec![
            City::new("Austin", "TX"),
            City::new("Boise", "ID"),
            City::new("Chicago", "IL"),
        ];
        assert_eq!(resume.remaining_cities("Gyms", &cities), &cities[1..]);
        assert_eq!(resume.remaining_cities("Painting", &cities), &cities[..]);
    }

    #[test]
    fn resume_matches_city_and_state() {
        let mut checkpoint = ProgressCheckpoint::default();
        checkpoint.record(target("Gyms", "Springfield", "MO"), signature("A"));
        let resume = checkpoint.resume_point().unwrap();

        let cities = vec![
            City::new("Springfield", "IL"),
            City::new("Austin", "TX"),
            City::new("Springfield", "MO"),
            City::new("Boise", "ID"),
        ];
        assert_eq!(resume.remaining_cities("Gyms", &cities), &cities[2..]);
    }

    #[test]
    fn resume_point_outside_selection_is_ignored() {
        let resume = ResumePoint {
            category: "Axe Throwing".to_string(),
            city: "Nowhere".to_string(),
            state: "NV".to_string(),
        };
        let categories = vec!["Gyms".to_string()];
        assert_eq!(resume.remaining_categories(&categories), &categories[..]);

        let cities = vec![City::new("Austin", "TX")];
        assert_eq!(resume.remaining_cities("Axe Throwing", &cities), &cities[..]);
    }
}
