use crate::models::City;
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::path::Path;

/// Bumped whenever the list below changes, since selections are by position.
pub const CATEGORY_LIST_VERSION: u32 = 1;

pub const BUSINESS_TYPES: [&str; 20] = [
    "Real Estate companies",
    "Charity/Non-Profits",
    "Portfolio sites for Instagram artists",
    "Local Restaurant chains",
    "Personal Injury Law Firms",
    "Independent insurance sites",
    "Landscaping/Fertilizer",
    "Painting",
    "Power Washing",
    "Car Wash",
    "Axe Throwing",
    "Gun Ranges/Stores",
    "Currency Exchanges/Check Cashing",
    "Construction Materials Companies",
    "Gyms",
    "Salons with multiple locations",
    "Eyebrow Microblading",
    "Estheticians",
    "Orthodontists",
    "Used Car dealerships",
];

const CITY_COLUMNS: [&str; 2] = ["city_ascii", "city"];
const STATE_COLUMNS: [&str; 2] = ["state_id", "state"];

/// Read every city from a reference CSV, in file order.
///
/// The city comes from `city_ascii` (or `city`), the state from `state_id`
/// (or `state`, optional). Rows without a city name are ignored.
pub fn load_cities(path: &Path) -> Result<Vec<City>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open cities file: {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();
    let column = |names: &[&str]| {
        names
            .iter()
            .find_map(|name| headers.iter().position(|h| h.trim() == *name))
    };
    let city_column = match column(&CITY_COLUMNS[..]) {
        Some(index) => index,
        None => bail!("{} has no city_ascii or city column", path.display()),
    };
    let state_column = column(&STATE_COLUMNS[..]);

    let mut cities = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Malformed row {} in {}", line + 2, path.display()))?;
        let name = row.get(city_column).unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }
        let state = state_column
            .and_then(|index| row.get(index))
            .unwrap_or("")
            .trim();
        cities.push(City::new(name, state));
    }

    if cities.is_empty() {
        bail!("No cities found in {}", path.display());
    }
    log::info!("Loaded {} cities from {}", cities.len(), path.display());
    Ok(cities)
}

/// Parse a 1-based selection such as `"3"`, `"1-5"`, `"1,4,7"` or `"2-4,9"`
/// against a list of `count` items.
///
/// Returns 0-based indices in the order given, without repeats.
pub fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>> {
    let mut selected = Vec::new();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (parse_position(start, count)?, parse_position(end, count)?),
            None => {
                let position = parse_position(part, count)?;
                (position, position)
            }
        };
        if start > end {
            bail!("Range {} runs backwards", part);
        }
        for index in start - 1..end {
            if !selected.contains(&index) {
                selected.push(index);
            }
        }
    }

    if selected.is_empty() {
        bail!("Nothing selected");
    }
    Ok(selected)
}

fn parse_position(text: &str, count: usize) -> Result<usize> {
    let position: usize = text
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a number", text.trim()))?;
    if position == 0 || position > count {
        bail!("{} is out of range (1-{})", position, count);
    }
    Ok(position)
}

/// Business types picked by a selection string.
pub fn select_categories(input: &str) -> Result<Vec<String>> {
    Ok(parse_selection(input, BUSINESS_TYPES.len())?
        .into_iter()
        .map(|index| BUSINESS_TYPES[index].to_string())
        .collect())
}
