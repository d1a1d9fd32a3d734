/*!
The summary shown before anything is deleted: counts per category, every
location, and what purging each category costs.
*/

use std::fmt;

use crate::core::{occurrence::Category, orchestrator::LocationTrail};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub category: Category,
    pub locations: Vec<String>,
    pub risk: Option<&'static str>,
}

impl CategorySummary {
    pub fn count(&self) -> usize {
        self.locations.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    /// One entry per category, in deletion order, including empty ones.
    pub categories: Vec<CategorySummary>,
}

pub fn build_preview(trail: &LocationTrail) -> Preview {
    let categories = Category::ALL
        .iter()
        .map(|&category| CategorySummary {
            category,
            locations: trail
                .iter()
                .filter(|occurrence| occurrence.category() == category)
                .map(ToString::to_string)
                .collect(),
            risk: category.risk(),
        })
        .collect();
    Preview { categories }
}

impl Preview {
    pub fn tally(&self, category: Category) -> usize {
        self.categories
            .iter()
            .find(|summary| summary.category == category)
            .map_or(0, CategorySummary::count)
    }

    pub fn total(&self) -> usize {
        self.categories.iter().map(CategorySummary::count).sum()
    }
}

fn items(count: usize) -> &'static str {
    if count == 1 { "item" } else { "items" }
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for summary in &self.categories {
            let count = summary.count();
            write!(f, "{}: {} {}", summary.category, count, items(count))?;
            match summary.risk {
                Some(risk) if count > 0 => writeln!(f, "  [{risk}]")?,
                _ => writeln!(f)?,
            }
            for location in &summary.locations {
                writeln!(f, "    {location}")?;
            }
        }
        write!(f, "total: {} {}", self.total(), items(self.total()))
    }
}
