//! Fake support-case content.
//!
//! Text is drawn from small word pools and salted with the characters that
//! trip naive INSERT parsers: commas, parentheses, semicolons, quotes,
//! backslashes and embedded newlines.

use rand::Rng;

const PRODUCTS: &[&str] = &[
    "ProLiant DL380 Gen10",
    "ProLiant DL360 Gen11",
    "Synergy 480",
    "Nimble HF40",
    "Alletra 6000",
    "StoreOnce 5260",
    "Aruba CX 6300",
    "Apollo 4200",
    "Superdome Flex",
    "SimpliVity 380",
];

const COMPONENTS: &[&str] = &[
    "disk", "fan", "power supply", "DIMM", "NIC", "controller", "iLO", "BIOS", "backplane",
    "fabric module",
];

const SYMPTOMS: &[&str] = &[
    "failed",
    "reports degraded status",
    "is not detected",
    "shows amber LED",
    "throws POST error",
    "drops packets",
    "reboots unexpectedly",
    "overheats under load",
];

const STATUSES: &[&str] = &["New", "In Progress", "Pending Customer", "Resolved", "Closed"];

const SUPPORT_TYPES: &[&str] = &["Warranty", "Contract", "Pay-per-event", "Proactive"];

const ORIGINS: &[&str] = &["Phone", "Web", "Email", "Chat", "Partner"];

const OPERATING_SYSTEMS: &[&str] = &[
    "VMware ESXi",
    "Red Hat Enterprise Linux",
    "SUSE Linux Enterprise",
    "Windows Server",
    "Ubuntu",
];

const WORDS: &[&str] = &[
    "customer", "replaced", "firmware", "updated", "logs", "collected", "verified", "issue",
    "resolved", "after", "reseat", "engineer", "onsite", "remote", "session", "escalated",
    "pending", "parts", "shipped", "server", "array", "volume", "cluster", "node", "path",
];

/// Fragments that must survive a quote-aware parse intact
const TRICKY_FRAGMENTS: &[&str] = &[
    ", see (attached) log",
    "; rebooted twice",
    " (bay 3), (bay 4)",
    " error code 0x1F (",
    " ) stray paren",
    " VALUES (1), (2)",
    " -- not a comment",
    " /* not a comment */",
    " NULL",
];

/// Fake data generator with deterministic RNG
pub struct FakeData<R: Rng> {
    rng: R,
}

impl<R: Rng> FakeData<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Pick a random element from a slice
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.rng.gen_range(0..items.len())]
    }

    pub fn bool_with_probability(&mut self, probability: f64) -> bool {
        self.rng.gen::<f64>() < probability
    }

    pub fn int_range(&mut self, min: i64, max: i64) -> i64 {
        self.rng.gen_range(min..=max)
    }

    pub fn product(&mut self) -> &'static str {
        *self.pick(PRODUCTS)
    }

    pub fn status(&mut self) -> &'static str {
        *self.pick(STATUSES)
    }

    pub fn support_type(&mut self) -> &'static str {
        *self.pick(SUPPORT_TYPES)
    }

    pub fn origin(&mut self) -> &'static str {
        *self.pick(ORIGINS)
    }

    pub fn operating_system(&mut self) -> &'static str {
        *self.pick(OPERATING_SYSTEMS)
    }

    /// Short subject line, e.g. "Synergy 480: fan shows amber LED"
    pub fn subject(&mut self) -> String {
        let product = self.product();
        let component = self.pick(COMPONENTS);
        let symptom = self.pick(SYMPTOMS);
        format!("{}: {} {}", product, component, symptom)
    }

    /// Plain words joined by spaces
    pub fn words(&mut self, count: usize) -> String {
        (0..count)
            .map(|_| *self.pick(WORDS))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Free text that may carry separators, quotes, backslashes and newlines.
    ///
    /// Quotes and backslashes come back already escaped (`\'`, `\\`), the way
    /// a MySQL dump writes them.
    pub fn note(&mut self) -> String {
        let count = self.rng.gen_range(3..12);
        let mut text = self.words(count);

        if self.bool_with_probability(0.5) {
            text.push_str(*self.pick(TRICKY_FRAGMENTS));
        }
        if self.bool_with_probability(0.2) {
            text.push_str(r" customer\'s array");
        }
        if self.bool_with_probability(0.1) {
            text.push_str(r" path C:\\logs\\");
        }
        if self.bool_with_probability(0.15) {
            text.push('\n');
            text.push_str(&self.words(4));
        }
        text
    }

    pub fn serial_number(&mut self) -> String {
        let prefix: String = (0..3)
            .map(|_| self.rng.gen_range(b'A'..=b'Z') as char)
            .collect();
        let num: u32 = self.rng.gen_range(1_000_000..9_999_999);
        format!("{}{}", prefix, num)
    }

    pub fn product_number(&mut self) -> String {
        let num: u32 = self.rng.gen_range(100_000..999_999);
        format!("P{}-B21", num)
    }

    /// Hex-ish internal identifier
    pub fn internal_id(&mut self) -> String {
        let a: u32 = self.rng.gen();
        let b: u16 = self.rng.gen();
        format!("500{:08x}{:04x}", a, b)
    }

    /// "YYYY-MM-DD HH:MM:SS"
    pub fn datetime(&mut self, year_start: i32, year_end: i32) -> String {
        let year = self.rng.gen_range(year_start..=year_end);
        let month = self.rng.gen_range(1..=12);
        let day = self.rng.gen_range(1..=28);
        let hour = self.rng.gen_range(0..24);
        let minute = self.rng.gen_range(0..60);
        let second = self.rng.gen_range(0..60);
        format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            year, month, day, hour, minute, second
        )
    }
}
