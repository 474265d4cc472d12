use serde::{Deserialize, Serialize};

/// Nominal number of words on one page of a generated book.
pub const WORDS_PER_PAGE: u32 = 140;
/// A book is always split into this many parts.
pub const PART_COUNT: usize = 7;
/// Word size of one sub-part used when sizing the core content.
pub const SUBPART_WORDS: u32 = 100;
/// Word target requested from the LLM for one full-size call.
pub const CALL_WORDS: u32 = 190;
/// Reservations up to this many words are generated in a single call.
pub const SINGLE_CALL_THRESHOLD: u32 = 140;
/// Extra words requested on top of a small reservation.
pub const SINGLE_CALL_PADDING: u32 = 50;
/// Line inserted between the core content and the appended extras.
pub const SEPARATOR: &str =
    "--------------------------------------------------------------------------------------------";

/// Optional content blocks a user can add to a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Addon {
    /// Key ideas and analysis.
    #[serde(rename = "an")]
    Analysis,
    /// Quotations from the book.
    #[serde(rename = "qt")]
    Quotes,
    /// Biography of the author.
    #[serde(rename = "bio")]
    Biography,
    /// Critique of the book.
    #[serde(rename = "cr")]
    Critique,
}

impl Addon {
    /// All addons in generation order.
    pub const ALL: [Addon; 4] = [Addon::Analysis, Addon::Quotes, Addon::Biography, Addon::Critique];

    /// Share of the total word budget reserved for this addon, in percent.
    pub fn share_percent(self) -> u32 {
        match self {
            Addon::Analysis | Addon::Critique => 10,
            Addon::Quotes | Addon::Biography => 5,
        }
    }

    /// Front matter is placed before the core content instead of after it.
    pub fn is_front_matter(self) -> bool {
        matches!(self, Addon::Biography)
    }

    fn bit(self) -> u8 {
        match self {
            Addon::Analysis => 1,
            Addon::Quotes => 1 << 1,
            Addon::Biography => 1 << 2,
            Addon::Critique => 1 << 3,
        }
    }
}

/// A set of selected addons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddonSet(u8);

impl AddonSet {
    /// A set with every addon selected.
    pub fn all() -> Self {
        Addon::ALL.into_iter().collect()
    }

    /// Whether `addon` is selected.
    pub fn contains(&self, addon: Addon) -> bool {
        self.0 & addon.bit() != 0
    }

    /// Selects `addon`.
    pub fn insert(&mut self, addon: Addon) {
        self.0 |= addon.bit();
    }

    /// Flips the addon and returns whether it is now selected.
    pub fn toggle(&mut self, addon: Addon) -> bool {
        self.0 ^= addon.bit();
        self.contains(addon)
    }

    /// No addon is selected.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Every addon is selected.
    pub fn is_full(&self) -> bool {
        Addon::ALL.iter().all(|a| self.contains(*a))
    }

    /// Iterates the selected addons in generation order.
    pub fn iter(&self) -> impl Iterator<Item = Addon> + '_ {
        Addon::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl FromIterator<Addon> for AddonSet {
    fn from_iter<I: IntoIterator<Item = Addon>>(iter: I) -> Self {
        let mut set = AddonSet::default();
        for addon in iter {
            set.insert(addon);
        }
        set
    }
}

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Requested length in pages.
    pub page_count: u32,
    /// Selected extras.
    pub addons: AddonSet,
}

/// Words reserved for one addon and the calls that fill them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonBudget {
    /// The addon this budget is for.
    pub addon: Addon,
    /// Share of the total words.
    pub reserved_words: u32,
    /// Word target of each generation call, in order.
    pub calls: Vec<u32>,
}

impl AddonBudget {
    fn new(addon: Addon, total_words: u32) -> Self {
        let reserved_words = total_words * addon.share_percent() / 100;
        let calls = if reserved_words <= SINGLE_CALL_THRESHOLD {
            vec![reserved_words + SINGLE_CALL_PADDING]
        } else {
            vec![CALL_WORDS; (reserved_words / SINGLE_CALL_THRESHOLD) as usize]
        };
        Self { addon, reserved_words, calls }
    }
}

/// Describes how many generation calls to make for a book and how large each
/// one should be. Purely descriptive: building a plan performs no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPlan {
    /// Words the whole book should have.
    pub total_words: u32,
    /// Words left for the seven parts.
    pub core_words: u32,
    /// Sub-parts generated for each part.
    pub part_subpart_counts: [u32; PART_COUNT],
    /// Budgets of the selected addons in generation order.
    pub addon_budgets: Vec<AddonBudget>,
}

impl GenerationPlan {
    /// Builds the plan for `request`.
    pub fn new(request: &GenerationRequest) -> Self {
        let total_words = request.page_count * WORDS_PER_PAGE;
        let addon_budgets: Vec<AddonBudget> =
            request.addons.iter().map(|addon| AddonBudget::new(addon, total_words)).collect();
        let reserved: u32 = addon_budgets.iter().map(|b| b.reserved_words).sum();
        let core_words = total_words - reserved;

        Self {
            total_words,
            core_words,
            part_subpart_counts: split_into_parts(core_words),
            addon_budgets,
        }
    }

    /// Words reserved for all addons together.
    pub fn reserved_words(&self) -> u32 {
        self.addon_budgets.iter().map(|b| b.reserved_words).sum()
    }

    /// Budget of `addon`, if selected.
    pub fn budget(&self, addon: Addon) -> Option<&AddonBudget> {
        self.addon_budgets.iter().find(|b| b.addon == addon)
    }

    /// Number of calls for the seven parts.
    pub fn core_call_count(&self) -> u32 {
        self.part_subpart_counts.iter().sum()
    }

    /// Number of calls for all addons.
    pub fn addon_call_count(&self) -> usize {
        self.addon_budgets.iter().map(|b| b.calls.len()).sum()
    }
}

// The float steps mirror the sizing the bot has always used so that existing
// page counts produce the same number of calls.
fn split_into_parts(core_words: u32) -> [u32; PART_COUNT] {
    let words_per_part = f64::from(core_words) / PART_COUNT as f64;
    let subparts = (words_per_part / f64::from(SUBPART_WORDS)).max(1.0);
    let base = subparts.floor();
    let tenths = ((subparts - base) * 10.0).round_ties_even() as u32;

    let mut counts = [base as u32; PART_COUNT];
    if matches!(tenths, 2 | 4 | 6 | 8) {
        for count in counts.iter_mut().take((tenths / 2) as usize) {
            *count += 1;
        }
    }
    counts
}

/// Collects generated sections and puts them into document order.
#[derive(Debug, Default)]
pub struct Assembly {
    front: Vec<String>,
    core: Vec<String>,
    extras: Vec<String>,
}

impl Assembly {
    /// Creates an empty assembly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the next section of the main text.
    pub fn push_core(&mut self, text: String) {
        self.core.push(text);
    }

    /// Adds a section written for `addon`.
    pub fn push_addon(&mut self, addon: Addon, text: String) {
        if addon.is_front_matter() {
            self.front.push(text);
        } else {
            self.extras.push(text);
        }
    }

    /// Front matter, core, then a single separator before the extras.
    pub fn into_sections(self) -> Vec<String> {
        let mut sections = self.front;
        sections.extend(self.core);
        if !self.extras.is_empty() {
            sections.push(SEPARATOR.to_string());
            sections.extend(self.extras);
        }
        sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(page_count: u32, addons: &[Addon]) -> GenerationPlan {
        GenerationPlan::new(&GenerationRequest {
            page_count,
            addons: addons.iter().copied().collect(),
        })
    }

    #[test]
    fn test_minimum_pages_without_addons() {
        let plan = plan(5, &[]);

        assert_eq!(plan.total_words, 700);
        assert_eq!(plan.core_words, 700);
        assert_eq!(plan.part_subpart_counts, [1; PART_COUNT]);
        assert!(plan.addon_budgets.is_empty());
    }

    #[test]
    fn test_all_addons_reserve_thirty_percent() {
        let plan = plan(50, &Addon::ALL);

        assert_eq!(plan.total_words, 7000);
        assert_eq!(plan.budget(Addon::Analysis).unwrap().reserved_words, 700);
        assert_eq!(plan.budget(Addon::Quotes).unwrap().reserved_words, 350);
        assert_eq!(plan.budget(Addon::Biography).unwrap().reserved_words, 350);
        assert_eq!(plan.budget(Addon::Critique).unwrap().reserved_words, 700);
        assert_eq!(plan.reserved_words(), 2100);
        assert_eq!(plan.core_words, 4900);
        assert_eq!(plan.part_subpart_counts, [7; PART_COUNT]);
    }

    #[test]
    fn test_core_and_reservations_add_up() {
        for page_count in 1..=60 {
            for mask in 0u8..16 {
                let addons: Vec<Addon> = Addon::ALL
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, a)| a)
                    .collect();
                let plan = plan(page_count, &addons);

                assert_eq!(plan.core_words + plan.reserved_words(), plan.total_words);
                assert!(plan.reserved_words() * 100 <= plan.total_words * 30);
                assert_eq!(plan.part_subpart_counts.len(), PART_COUNT);
                assert!(plan.part_subpart_counts.iter().all(|c| *c >= 1));
            }
        }
    }

    #[test]
    fn test_even_tenths_go_to_leading_parts() {
        // 7 pages: 980 words, 1.4 sub-parts per part.
        let plan = plan(7, &[]);
        assert_eq!(plan.part_subpart_counts, [2, 2, 1, 1, 1, 1, 1]);

        // 9 pages: 1.8 sub-parts per part.
        let plan = self::plan(9, &[]);
        assert_eq!(plan.part_subpart_counts, [2, 2, 2, 2, 1, 1, 1]);

        // 20 pages with every addon: 1960 core words, 2.8 per part.
        let plan = self::plan(20, &Addon::ALL);
        assert_eq!(plan.part_subpart_counts, [3, 3, 3, 3, 2, 2, 2]);
    }

    #[test]
    fn test_odd_tenths_are_not_redistributed() {
        // 12 pages with a biography: 1596 core words, 2.28 per part rounds to 3 tenths.
        let plan = plan(12, &[Addon::Biography]);

        assert_eq!(plan.core_words, 1596);
        assert_eq!(plan.part_subpart_counts, [2; PART_COUNT]);
    }

    #[test]
    fn test_small_core_is_clamped_to_one_subpart() {
        let plan = plan(5, &Addon::ALL);

        assert_eq!(plan.core_words, 490);
        assert_eq!(plan.part_subpart_counts, [1; PART_COUNT]);
        assert_eq!(plan.core_call_count(), 7);
    }

    #[test]
    fn test_reservation_at_threshold_uses_single_call() {
        // 10 pages: analysis reserves exactly 140 words.
        let plan = plan(10, &[Addon::Analysis]);
        let budget = plan.budget(Addon::Analysis).unwrap();

        assert_eq!(budget.reserved_words, 140);
        assert_eq!(budget.calls, vec![190]);
        assert_eq!(plan.part_subpart_counts, [2, 2, 2, 2, 1, 1, 1]);
    }

    #[test]
    fn test_large_reservation_is_split_into_full_calls() {
        let plan = plan(50, &[Addon::Analysis, Addon::Quotes]);

        assert_eq!(plan.budget(Addon::Analysis).unwrap().calls, vec![CALL_WORDS; 5]);
        assert_eq!(plan.budget(Addon::Quotes).unwrap().calls, vec![CALL_WORDS; 2]);
        assert_eq!(plan.addon_call_count(), 7);
    }

    #[test]
    fn test_small_reservation_is_padded() {
        let plan = plan(5, &[Addon::Quotes]);
        let budget = plan.budget(Addon::Quotes).unwrap();

        assert_eq!(budget.reserved_words, 35);
        assert_eq!(budget.calls, vec![85]);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let request = GenerationRequest { page_count: 33, addons: AddonSet::all() };

        assert_eq!(GenerationPlan::new(&request), GenerationPlan::new(&request));
    }

    #[test]
    fn test_addon_set_toggle() {
        let mut set = AddonSet::default();
        assert!(set.is_empty());

        assert!(set.toggle(Addon::Quotes));
        assert!(set.contains(Addon::Quotes));
        assert!(!set.toggle(Addon::Quotes));
        assert!(set.is_empty());

        let all = AddonSet::all();
        assert!(all.is_full());
        assert_eq!(all.iter().collect::<Vec<_>>(), Addon::ALL.to_vec());
    }

    #[test]
    fn test_assembly_puts_biography_first() {
        let mut assembly = Assembly::new();
        assembly.push_core("part 1".to_string());
        assembly.push_core("part 2".to_string());
        assembly.push_addon(Addon::Analysis, "analysis".to_string());
        assembly.push_addon(Addon::Biography, "bio 1".to_string());
        assembly.push_addon(Addon::Biography, "bio 2".to_string());
        assembly.push_addon(Addon::Critique, "critique".to_string());

        assert_eq!(
            assembly.into_sections(),
            vec!["bio 1", "bio 2", "part 1", "part 2", SEPARATOR, "analysis", "critique"]
        );
    }

    #[test]
    fn test_assembly_biography_only_has_no_separator() {
        let mut assembly = Assembly::new();
        assembly.push_core("part".to_string());
        assembly.push_addon(Addon::Biography, "bio".to_string());

        assert_eq!(assembly.into_sections(), vec!["bio", "part"]);
    }
}
