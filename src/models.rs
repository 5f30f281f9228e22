use serde::{Deserialize, Deserializer};
use std::fmt;

pub const UNKNOWN_NAME: &str = "Unknown";
pub const NO_ADDRESS: &str = "No Address";
pub const NO_WEBSITE: &str = "No Website";
pub const NO_PHONE: &str = "No Phone";

/// One row of city reference data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct City {
    pub name: String,
    pub state: String,
}

impl City {
    pub fn new(name: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: state.into(),
        }
    }
}

/// One unit of search work: a business category in a city.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchTarget {
    pub category: String,
    pub city: String,
    pub state: String,
}

impl SearchTarget {
    pub fn new(category: &str, city: &City) -> Self {
        Self {
            category: category.to_string(),
            city: city.name.clone(),
            state: city.state.clone(),
        }
    }

    /// Free-text query typed into the site's search box.
    pub fn query(&self) -> String {
        if self.state.is_empty() {
            format!("{} in {}", self.category, self.city)
        } else {
            format!("{} in {}, {}", self.category, self.city, self.state)
        }
    }
}

impl fmt::Display for SearchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.category, self.city)?;
        if !self.state.is_empty() {
            write!(f, ", {}", self.state)?;
        }
        Ok(())
    }
}

/// Identity of a real-world business: (name, address, phone).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub name: String,
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingRecord {
    pub business_type: String,
    pub city: String,
    pub state: String,
    pub name: String,
    pub address: String,
    pub website: String,
    pub phone: String,
    pub review_count: u32,
    pub review_average: f64,
    pub coordinates: Option<(f64, f64)>,
}

impl ListingRecord {
    /// A record for `target` with every field at its sentinel/default.
    pub fn empty(target: &SearchTarget) -> Self {
        Self {
            business_type: target.category.clone(),
            city: target.city.clone(),
            state: target.state.clone(),
            name: UNKNOWN_NAME.to_string(),
            address: NO_ADDRESS.to_string(),
            website: NO_WEBSITE.to_string(),
            phone: NO_PHONE.to_string(),
            review_count: 0,
            review_average: 0.0,
            coordinates: None,
        }
    }

    /// The (category, city, state) this record was captured for.
    pub fn target(&self) -> SearchTarget {
        SearchTarget {
            category: self.business_type.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
        }
    }

    pub fn signature(&self) -> Signature {
        Signature {
            name: self.name.clone(),
            address: self.address.clone(),
            phone: self.phone.clone(),
        }
    }

    pub fn to_csv_record(&self) -> Vec<String> {
        let (latitude, longitude) = match self.coordinates {
            Some((lat, lng)) => (lat.to_string(), lng.to_string()),
            None => (String::new(), String::new()),
        };

        vec![
            self.business_type.clone(),
            self.city.clone(),
            self.state.clone(),
            self.name.clone(),
            self.address.clone(),
            self.phone.clone(),
            self.review_count.to_string(),
            format!("{:.1}", self.review_average),
            self.website.clone(),
            latitude,
            longitude,
        ]
    }
}

pub const CSV_HEADERS: [&str; 11] = [
    "Business Type",
    "City",
    "State",
    "Business Name",
    "Address",
    "Phone Number",
    "Number of Reviews",
    "Review Average",
    "Website URL",
    "Latitude",
    "Longitude",
];

/// The subset of a persisted row the progress scan needs.
///
/// Columns added after the first six-column layout are optional so older
/// result files still load.
/// Rows written before the State column existed carry an empty state.
#[derive(Debug, Clone)]
pub struct StoredRow {
    pub target: SearchTarget,
    pub signature: Signature,
}

impl<'de> Deserialize<'de> for StoredRow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct StoredRowHelper {
            #[serde(rename = "Business Type", default)]
            business_type: String,
            #[serde(rename = "City")]
            city: String,
            #[serde(rename = "State", default)]
            state: String,
            #[serde(rename = "Business Name", default)]
            name: String,
            #[serde(rename = "Address", default)]
            address: Option<String>,
            #[serde(rename = "Phone Number", default)]
            phone: String,
        }

        let helper = StoredRowHelper::deserialize(deserializer)?;

        let address = match helper.address {
            Some(address) if !address.is_empty() => address,
            _ => NO_ADDRESS.to_string(),
        };

        Ok(StoredRow {
            target: SearchTarget {
                category: helper.business_type,
                city: helper.city,
                state: helper.state,
            },
            signature: Signature {
                name: helper.name,
                address,
                phone: helper.phone,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_includes_state_when_known() {
        let target = SearchTarget::new("Gyms", &City::new("Austin", "TX"));
        assert_eq!(target.query(), "Gyms in Austin, TX");

        let target = SearchTarget::new("Gyms", &City::new("Austin", ""));
        assert_eq!(target.query(), "Gyms in Austin");
    }

    #[test]
    fn signature_ignores_non_identity_fields() {
        let target = SearchTarget::new("Gyms", &City::new("Austin", "TX"));
        let mut a = ListingRecord::empty(&target);
        a.name = "Iron Temple".to_string();
        let mut b = a.clone();
        b.review_count = 120;
        b.website = "https://irontemple.example".to_string();

        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn csv_record_matches_header_width() {
        let target = SearchTarget::new("Gyms", &City::new("Austin", "TX"));
        let mut record = ListingRecord::empty(&target);
        record.coordinates = Some((30.2672, -97.7431));

        let row = record.to_csv_record();
        assert_eq!(row.len(), CSV_HEADERS.len());
        assert_eq!(row[9], "30.2672");
        assert_eq!(row[10], "-97.7431");
    }
}
