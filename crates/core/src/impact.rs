//! # Impact Lookup
//!
//! Ordered `(keyword, sentence)` pairs. A product title is matched by
//! scanning the table in its defined order; the first keyword found as a
//! substring of the lowercased title wins.

/// Built-in impact sentences, in lookup order
pub const DEFAULT_IMPACTS: &[(&str, &str)] = &[
    ("bamboo toothbrush", "By choosing a bamboo brush, you prevent ~4 plastic brushes a year from ending in landfills."),
    ("reusable bottle", "One reusable bottle saves ~1,460 plastic bottles a year."),
    ("eco bag", "A single reusable bag replaces ~700 plastic bags annually."),
    ("solar light", "Solar lights cut down ~90kg CO₂ emissions per year."),
    ("compostable plates", "Using compostable plates diverts hundreds of plastic plates from landfills yearly."),
    ("beeswax wrap", "Replacing plastic wrap with beeswax saves ~200 feet of plastic wrap per year."),
    ("stainless steel straw", "One reusable straw prevents ~500 plastic straws from polluting oceans annually."),
    ("reusable coffee cup", "Switching to a reusable cup saves ~400 disposable cups yearly."),
    ("LED bulb", "Using LED bulbs reduces ~150kg CO₂ emissions per year compared to incandescent bulbs."),
    ("bamboo cutlery", "One set of bamboo cutlery prevents ~100 plastic utensils from entering landfills each year."),
    ("recycled notebook", "Using recycled notebooks saves ~12 trees per 100 notebooks produced."),
    ("eco-friendly detergent", "Switching to eco detergent reduces harmful chemicals in water, saving aquatic life."),
    ("solar charger", "Solar chargers reduce dependency on grid electricity, cutting ~100kg CO₂ annually."),
    ("reusable food container", "One container saves ~200 plastic bags and wraps per year."),
    ("water-saving showerhead", "Water-saving showerheads save ~30,000 liters of water annually per household."),
    ("eco soap", "Using biodegradable soap prevents harmful chemicals from entering rivers and oceans."),
    ("bamboo mat", "Bamboo mats reduce plastic and synthetic mat usage, saving the environment."),
    ("recycled toilet paper", "One roll of recycled toilet paper saves ~17 trees compared to virgin paper."),
    ("energy-efficient appliances", "Switching to energy-efficient appliances reduces electricity consumption significantly."),
    ("organic cotton clothing", "Choosing organic cotton avoids ~5,000 liters of water per kg of fabric."),
    ("plant-based cleaning products", "Plant-based cleaners reduce chemical pollution in water systems."),
    ("reusable sandwich wrap", "One wrap replaces hundreds of single-use plastic sandwich bags yearly."),
    ("eco shampoo bar", "Shampoo bars save ~2 plastic bottles per year per person."),
    ("bamboo hairbrush", "Using a bamboo hairbrush prevents plastic brush pollution in landfills."),
    ("recycled packaging", "Products with recycled packaging save trees and reduce plastic waste."),
    ("biodegradable trash bags", "Switching to biodegradable trash bags reduces plastic landfill waste annually."),
    ("solar water heater", "Solar water heaters reduce electricity demand and cut CO₂ emissions."),
    ("compost bin", "Composting kitchen waste reduces methane emissions from landfills."),
    ("eco toothpaste", "Eco toothpaste tubes save ~1 plastic tube per person every month."),
    ("reusable menstrual products", "Reusable pads or cups reduce ~240 disposable items per person per year."),
    ("energy-saving power strip", "Using smart strips prevents phantom energy waste from electronics."),
    ("bamboo kitchenware", "Bamboo utensils replace plastic alternatives, reducing landfill waste."),
    ("eco laundry bag", "Using reusable laundry bags reduces microplastic pollution from synthetic clothes."),
    ("recycled pens", "One recycled pen saves ~5 plastic pens from going to landfill."),
    ("bamboo sunglasses", "Bamboo sunglasses reduce reliance on plastic frames, saving the environment."),
    ("solar backpack", "Solar backpacks charge devices sustainably without electricity."),
    ("eco yoga mat", "Eco-friendly yoga mats reduce PVC usage and chemical pollution."),
    ("compostable cutlery", "Switching prevents hundreds of plastic utensils from polluting landfills."),
    ("biodegradable soap wrapper", "Prevents plastic from entering oceans and decomposes naturally."),
    ("recycled water bottle", "Recycled bottles save energy and reduce plastic production."),
    ("bamboo tissue box", "Bamboo alternatives reduce plastic waste and promote sustainable forestry."),
    ("eco dish brush", "Using a bamboo dish brush prevents plastic waste from entering landfills."),
];

#[derive(Debug, Clone)]
struct ImpactEntry {
    /// Lowercased for matching
    keyword: String,
    sentence: String,
}

/// Ordered keyword → sentence table
#[derive(Debug, Clone)]
pub struct ImpactTable {
    entries: Vec<ImpactEntry>,
}

impl Default for ImpactTable {
    fn default() -> Self {
        Self::new(DEFAULT_IMPACTS.iter().copied())
    }
}

impl ImpactTable {
    /// Build a table; iteration order is the lookup order
    pub fn new<K, S>(entries: impl IntoIterator<Item = (K, S)>) -> Self
    where
        K: AsRef<str>,
        S: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(keyword, sentence)| ImpactEntry {
                keyword: keyword.as_ref().to_lowercase(),
                sentence: sentence.into(),
            })
            .filter(|e| !e.keyword.is_empty())
            .collect();
        Self { entries }
    }

    /// First sentence whose keyword appears in the title
    pub fn lookup(&self, title: &str) -> Option<&str> {
        let title = title.to_lowercase();
        self.entries
            .iter()
            .find(|e| title.contains(&e.keyword))
            .map(|e| e.sentence.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
