use sqlx::{QueryBuilder, Sqlite};

/// Category value that means "every category".
pub const ALL_CATEGORIES: &str = "all";
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 9;

/// Case folding shared by the stored search columns and the search text.
pub fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// Columns a free-text search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Instructor,
}

impl SearchField {
    fn column(&self) -> &'static str {
        match self {
            SearchField::Title => "c.title_folded",
            SearchField::Instructor => "c.instructor_folded",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    /// Any of the fields contains the needle, ignoring case.
    Contains { fields: Vec<SearchField>, needle: String },
    CategoryIs(String),
}

/// Conjunction of course predicates, built clause by clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseFilter {
    clauses: Vec<Clause>,
}

impl CourseFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches title or instructor by case-insensitive substring. Blank input
    /// adds nothing.
    pub fn search(mut self, text: Option<&str>) -> Self {
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            self.clauses.push(Clause::Contains {
                fields: vec![SearchField::Title, SearchField::Instructor],
                needle: fold(text),
            });
        }
        self
    }

    /// Exact category match. Blank input and `"all"` add nothing.
    pub fn category(mut self, category: Option<&str>) -> Self {
        if let Some(category) = category.filter(|c| !c.is_empty() && *c != ALL_CATEGORIES) {
            self.clauses.push(Clause::CategoryIs(category.to_string()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Appends ` WHERE ...` with bound parameters, or nothing for an empty
    /// filter.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        for (i, clause) in self.clauses.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            match clause {
                Clause::Contains { fields, needle } => {
                    qb.push("(");
                    for (j, field) in fields.iter().enumerate() {
                        if j > 0 {
                            qb.push(" OR ");
                        }
                        qb.push("instr(")
                            .push(field.column())
                            .push(", ")
                            .push_bind(needle.clone())
                            .push(") > 0");
                    }
                    qb.push(")");
                }
                Clause::CategoryIs(category) => {
                    qb.push("c.category = ").push_bind(category.clone());
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CourseSort {
    #[default]
    Newest,
    PriceLow,
    PriceHigh,
    Popular,
}

impl CourseSort {
    /// Unknown or missing values fall back to newest first.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("price_low") => CourseSort::PriceLow,
            Some("price_high") => CourseSort::PriceHigh,
            Some("popular") => CourseSort::Popular,
            _ => CourseSort::Newest,
        }
    }

    /// Row id comes last so equal keys keep insertion order and pages never
    /// overlap.
    pub fn order_by(&self) -> &'static str {
        match self {
            CourseSort::Newest => " ORDER BY c.created_at DESC, c.rowid ASC",
            CourseSort::PriceLow => " ORDER BY c.price ASC, c.rowid ASC",
            CourseSort::PriceHigh => " ORDER BY c.price DESC, c.rowid ASC",
            CourseSort::Popular => {
                // TOTAL() sums as a float and cannot overflow.
                " ORDER BY (SELECT TOTAL(json_extract(b.value, '$.currentStudents')) \
                 FROM json_each(c.batches) AS b) DESC, c.created_at DESC, c.rowid ASC"
            }
        }
    }
}

/// One page of an offset-paginated listing. Both fields are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { number: DEFAULT_PAGE, size: DEFAULT_PAGE_SIZE }
    }
}

impl Page {
    /// Lenient parse of the raw query values: anything that is not a positive
    /// integer takes the default, and the size is capped at `max_size`.
    pub fn from_params(page: Option<&str>, limit: Option<&str>, max_size: u32) -> Self {
        let number = positive(page).unwrap_or(DEFAULT_PAGE);
        let size = positive(limit).unwrap_or(DEFAULT_PAGE_SIZE).min(max_size.max(1));
        Self { number, size }
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }

    pub fn total_pages(&self, total_count: u64) -> u64 {
        total_count.div_ceil(u64::from(self.size))
    }

    pub fn push_limit(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" LIMIT ")
            .push_bind(i64::from(self.size))
            .push(" OFFSET ")
            .push_bind(self.skip() as i64);
    }
}

fn positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse::<u32>().ok()).filter(|n| *n > 0)
}
